//! Record schemas, typed values and schema fingerprints.
//!
//! A [`Schema`] is an ordered list of named, typed fields under a full
//! record name. Its identity on the wire is the [`Fingerprint`]: the
//! CRC-64-AVRO digest of the schema's Parsing Canonical Form, so two
//! schemas with the same field names, order and physical types share a
//! fingerprint no matter how they were constructed.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value as Json};

use crate::{Error, Result};

/// Physical or logical type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Long,
    Double,
    String,
    /// `timestamp-millis` logical type over a `long`.
    TimestampMillis,
}

impl FieldType {
    /// Name of the physical wire type.
    pub fn primitive(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Long | FieldType::TimestampMillis => "long",
            FieldType::Double => "double",
            FieldType::String => "string",
        }
    }

    fn to_json(self) -> Json {
        match self {
            FieldType::TimestampMillis => json!({
                "type": "long",
                "logicalType": "timestamp-millis",
            }),
            other => Json::String(other.primitive().to_string()),
        }
    }

    fn from_json(doc: &Json) -> Result<Self> {
        match doc {
            Json::String(name) => Self::from_primitive(name),
            Json::Object(obj) => {
                let base = obj
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::InvalidSchema("type object without 'type'".to_string()))?;
                match obj.get("logicalType").and_then(Json::as_str) {
                    Some("timestamp-millis") if base == "long" => Ok(FieldType::TimestampMillis),
                    Some(logical) => Err(Error::InvalidSchema(format!(
                        "unsupported logical type '{}' over '{}'",
                        logical, base
                    ))),
                    None => Self::from_primitive(base),
                }
            }
            other => Err(Error::InvalidSchema(format!("unsupported field type {}", other))),
        }
    }

    fn from_primitive(name: &str) -> Result<Self> {
        match name {
            "int" => Ok(FieldType::Int),
            "long" => Ok(FieldType::Long),
            "double" => Ok(FieldType::Double),
            "string" => Ok(FieldType::String),
            other => Err(Error::InvalidSchema(format!("unsupported type '{}'", other))),
        }
    }
}

/// A single typed datum.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    TimestampMillis(DateTime<Utc>),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Long(_) => FieldType::Long,
            Value::Double(_) => FieldType::Double,
            Value::String(_) => FieldType::String,
            Value::TimestampMillis(_) => FieldType::TimestampMillis,
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Value::Int(v) => json!(v),
            Value::Long(v) => json!(v),
            Value::Double(v) => json!(v),
            Value::String(v) => json!(v),
            Value::TimestampMillis(v) => json!(v.timestamp_millis()),
        }
    }

    fn from_json(field_type: FieldType, doc: &Json) -> Option<Self> {
        match field_type {
            FieldType::Int => doc
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int),
            FieldType::Long => doc.as_i64().map(Value::Long),
            FieldType::Double => doc.as_f64().map(Value::Double),
            FieldType::String => doc.as_str().map(|s| Value::String(s.to_string())),
            FieldType::TimestampMillis => doc
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(Value::TimestampMillis),
        }
    }
}

/// One named field of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// 64-bit schema fingerprint carried in every message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

const RABIN_EMPTY: u64 = 0xc15d_213a_a4d7_a795;

static RABIN_TABLE: [u64; 256] = rabin_table();

const fn rabin_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut fp = i as u64;
        let mut bit = 0;
        while bit < 8 {
            fp = (fp >> 1) ^ (RABIN_EMPTY & (fp & 1).wrapping_neg());
            bit += 1;
        }
        table[i] = fp;
        i += 1;
    }
    table
}

/// CRC-64-AVRO over `bytes`.
pub fn rabin64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(RABIN_EMPTY, |fp, &b| {
        (fp >> 8) ^ RABIN_TABLE[((fp ^ u64::from(b)) & 0xff) as usize]
    })
}

/// Immutable record schema. Safe to share across threads once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    full_name: String,
    fields: Vec<Field>,
    canonical: String,
    fingerprint: Fingerprint,
}

impl Schema {
    pub fn new(full_name: impl Into<String>, fields: Vec<Field>) -> Self {
        let full_name = full_name.into();
        let canonical = canonical_form(&full_name, &fields);
        let fingerprint = Fingerprint(rabin64(canonical.as_bytes()));
        Self {
            full_name,
            fields,
            canonical,
            fingerprint,
        }
    }

    /// Parses a registry-style JSON record schema.
    pub fn parse_str(input: &str) -> Result<Self> {
        let doc: Json = serde_json::from_str(input)?;
        let obj = doc
            .as_object()
            .ok_or_else(|| Error::InvalidSchema("schema is not a JSON object".to_string()))?;

        match obj.get("type").and_then(Json::as_str) {
            Some("record") => {}
            other => {
                return Err(Error::InvalidSchema(format!(
                    "expected a record schema, found {:?}",
                    other
                )))
            }
        }

        let name = obj
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::InvalidSchema("record without a name".to_string()))?;
        let full_name = match obj.get("namespace").and_then(Json::as_str) {
            Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
            _ => name.to_string(),
        };

        let raw_fields = obj
            .get("fields")
            .and_then(Json::as_array)
            .ok_or_else(|| Error::InvalidSchema(format!("record '{}' has no fields", full_name)))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field_name = raw
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::InvalidSchema("field without a name".to_string()))?;
            let type_doc = raw.get("type").ok_or_else(|| {
                Error::InvalidSchema(format!("field '{}' has no type", field_name))
            })?;
            let mut field = Field::new(field_name, FieldType::from_json(type_doc)?);
            if let Some(default_doc) = raw.get("default") {
                let default = Value::from_json(field.field_type, default_doc).ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "default for field '{}' is not a valid {}",
                        field_name,
                        field.field_type.primitive()
                    ))
                })?;
                field = field.with_default(default);
            }
            fields.push(field);
        }

        Ok(Self::new(full_name, fields))
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Parsing Canonical Form, the input to [`Schema::fingerprint`].
    pub fn canonical_form(&self) -> &str {
        &self.canonical
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Full schema document, including logical types and defaults.
    pub fn to_json(&self) -> Json {
        let fields: Vec<Json> = self
            .fields
            .iter()
            .map(|field| {
                let mut obj = Map::new();
                obj.insert("name".to_string(), json!(field.name));
                obj.insert("type".to_string(), field.field_type.to_json());
                if let Some(default) = &field.default {
                    obj.insert("default".to_string(), default.to_json());
                }
                Json::Object(obj)
            })
            .collect();

        let mut doc = Map::new();
        doc.insert("type".to_string(), json!("record"));
        doc.insert("name".to_string(), json!(self.name()));
        if let Some(ns) = self.namespace() {
            doc.insert("namespace".to_string(), json!(ns));
        }
        doc.insert("fields".to_string(), Json::Array(fields));
        Json::Object(doc)
    }
}

fn canonical_form(full_name: &str, fields: &[Field]) -> String {
    let fields: Vec<String> = fields
        .iter()
        .map(|f| {
            format!(
                "{{\"name\":{},\"type\":\"{}\"}}",
                quote(&f.name),
                f.field_type.primitive()
            )
        })
        .collect();

    format!(
        "{{\"name\":{},\"type\":\"record\",\"fields\":[{}]}}",
        quote(full_name),
        fields.join(",")
    )
}

fn quote(s: &str) -> String {
    Json::String(s.to_string()).to_string()
}
