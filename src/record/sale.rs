//! The `Sale` record and its field table.
//!
//! [`SALE_FIELDS`] is the single description of the record: the schema,
//! the builder's default resolution and the body encoder all iterate it.
//! Adding a field means adding one entry there plus its accessor.

use std::fmt;

use bytes::{Buf, BytesMut};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::builder::SaleBuilder;
use super::schema::{Field, FieldType, Schema, Value};
use super::wire;
use crate::Result;

/// Full record name. Part of the canonical form, so it must match the
/// name every other producer of these messages registers.
pub const SALE_FULL_NAME: &str = "io.confluent.examples.datacontract.pojo.avro.Sale";

pub const SALE_FIELD_COUNT: usize = 8;

/// Tag for each Sale field, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleField {
    OrderId,
    ProductId,
    CustomerId,
    ConfirmationCode,
    CcNumber,
    Expiration,
    Amount,
    Ts,
}

impl SaleField {
    pub const ALL: [SaleField; SALE_FIELD_COUNT] = [
        SaleField::OrderId,
        SaleField::ProductId,
        SaleField::CustomerId,
        SaleField::ConfirmationCode,
        SaleField::CcNumber,
        SaleField::Expiration,
        SaleField::Amount,
        SaleField::Ts,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn descriptor(self) -> &'static FieldDef {
        &SALE_FIELDS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn field_type(self) -> FieldType {
        self.descriptor().field_type
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SALE_FIELDS.iter().find(|def| def.name == name).map(|def| def.field)
    }
}

/// Static descriptor of one Sale field.
pub struct FieldDef {
    pub field: SaleField,
    pub name: &'static str,
    pub field_type: FieldType,
    /// Schema default, resolved when a builder leaves the field unset.
    pub default: Option<fn() -> Value>,
    /// Target of an external field-level encryption rule.
    pub sensitive: bool,
    encode: fn(&Sale, &mut BytesMut),
}

pub static SALE_FIELDS: [FieldDef; SALE_FIELD_COUNT] = [
    FieldDef {
        field: SaleField::OrderId,
        name: "order_id",
        field_type: FieldType::Int,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_int(buf, sale.order_id),
    },
    FieldDef {
        field: SaleField::ProductId,
        name: "product_id",
        field_type: FieldType::Int,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_int(buf, sale.product_id),
    },
    FieldDef {
        field: SaleField::CustomerId,
        name: "customer_id",
        field_type: FieldType::Int,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_int(buf, sale.customer_id),
    },
    FieldDef {
        field: SaleField::ConfirmationCode,
        name: "confirmation_code",
        field_type: FieldType::String,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_string(buf, &sale.confirmation_code),
    },
    FieldDef {
        field: SaleField::CcNumber,
        name: "cc_number",
        field_type: FieldType::String,
        default: None,
        sensitive: true,
        encode: |sale, buf| wire::put_string(buf, &sale.cc_number),
    },
    FieldDef {
        field: SaleField::Expiration,
        name: "expiration",
        field_type: FieldType::String,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_string(buf, &sale.expiration),
    },
    FieldDef {
        field: SaleField::Amount,
        name: "amount",
        field_type: FieldType::Double,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_double(buf, sale.amount),
    },
    FieldDef {
        field: SaleField::Ts,
        name: "ts",
        field_type: FieldType::TimestampMillis,
        default: None,
        sensitive: false,
        encode: |sale, buf| wire::put_timestamp_millis(buf, &sale.ts),
    },
];

/// Drops everything below the millisecond. Never rounds up.
///
/// A leap second (`23:59:60.xxx`) folds into the following second, the
/// same instant its epoch milliseconds denote on the wire.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or_else(|| ts - Duration::nanoseconds(i64::from(ts.nanosecond() % 1_000_000)))
}

fn deserialize_ts<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    DateTime::<Utc>::deserialize(deserializer).map(truncate_to_millis)
}

/// One purchase event.
///
/// Equality is field by field. `amount` compares by bit pattern, so a NaN
/// amount equals itself and `0.0` differs from `-0.0`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Sale {
    order_id: i32,
    product_id: i32,
    customer_id: i32,
    confirmation_code: String,
    cc_number: String,
    expiration: String,
    amount: f64,
    #[serde(deserialize_with = "deserialize_ts")]
    ts: DateTime<Utc>,
}

impl Sale {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: i32,
        product_id: i32,
        customer_id: i32,
        confirmation_code: impl Into<String>,
        cc_number: impl Into<String>,
        expiration: impl Into<String>,
        amount: f64,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            product_id,
            customer_id,
            confirmation_code: confirmation_code.into(),
            cc_number: cc_number.into(),
            expiration: expiration.into(),
            amount,
            ts: truncate_to_millis(ts),
        }
    }

    /// Builds a fresh copy of the Sale schema from [`SALE_FIELDS`].
    pub fn schema() -> Schema {
        let fields = SALE_FIELDS
            .iter()
            .map(|def| {
                let field = Field::new(def.name, def.field_type);
                match def.default {
                    Some(default) => field.with_default(default()),
                    None => field,
                }
            })
            .collect();
        Schema::new(SALE_FULL_NAME, fields)
    }

    pub fn builder() -> SaleBuilder {
        SaleBuilder::new()
    }

    pub fn to_builder(&self) -> SaleBuilder {
        SaleBuilder::from(self)
    }

    pub fn order_id(&self) -> i32 {
        self.order_id
    }

    pub fn product_id(&self) -> i32 {
        self.product_id
    }

    pub fn customer_id(&self) -> i32 {
        self.customer_id
    }

    pub fn confirmation_code(&self) -> &str {
        &self.confirmation_code
    }

    pub fn cc_number(&self) -> &str {
        &self.cc_number
    }

    pub fn expiration(&self) -> &str {
        &self.expiration
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn set_order_id(&mut self, value: i32) {
        self.order_id = value;
    }

    pub fn set_product_id(&mut self, value: i32) {
        self.product_id = value;
    }

    pub fn set_customer_id(&mut self, value: i32) {
        self.customer_id = value;
    }

    pub fn set_confirmation_code(&mut self, value: impl Into<String>) {
        self.confirmation_code = value.into();
    }

    pub fn set_cc_number(&mut self, value: impl Into<String>) {
        self.cc_number = value.into();
    }

    pub fn set_expiration(&mut self, value: impl Into<String>) {
        self.expiration = value.into();
    }

    pub fn set_amount(&mut self, value: f64) {
        self.amount = value;
    }

    pub fn set_ts(&mut self, value: DateTime<Utc>) {
        self.ts = truncate_to_millis(value);
    }

    /// Value of `field` as a schema datum.
    pub fn get(&self, field: SaleField) -> Value {
        match field {
            SaleField::OrderId => Value::Int(self.order_id),
            SaleField::ProductId => Value::Int(self.product_id),
            SaleField::CustomerId => Value::Int(self.customer_id),
            SaleField::ConfirmationCode => Value::String(self.confirmation_code.clone()),
            SaleField::CcNumber => Value::String(self.cc_number.clone()),
            SaleField::Expiration => Value::String(self.expiration.clone()),
            SaleField::Amount => Value::Double(self.amount),
            SaleField::Ts => Value::TimestampMillis(self.ts),
        }
    }

    /// Writes the record body, fields in schema order, without a header.
    pub fn encode_body(&self, buf: &mut BytesMut) {
        for def in &SALE_FIELDS {
            (def.encode)(self, buf);
        }
    }

    /// Reads a body written with the local schema.
    pub fn decode_body<B: Buf>(cursor: &mut B) -> Result<Self> {
        let mut builder = SaleBuilder::new();
        for def in &SALE_FIELDS {
            builder.set(def.field, wire::get_value(cursor, def.field_type)?)?;
        }
        builder.build()
    }
}

impl PartialEq for Sale {
    fn eq(&self, other: &Self) -> bool {
        self.order_id == other.order_id
            && self.product_id == other.product_id
            && self.customer_id == other.customer_id
            && self.confirmation_code == other.confirmation_code
            && self.cc_number == other.cc_number
            && self.expiration == other.expiration
            && self.amount.to_bits() == other.amount.to_bits()
            && self.ts == other.ts
    }
}

/// Fields flagged `sensitive` in [`SALE_FIELDS`] are masked.
impl fmt::Debug for Sale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Sale");
        for def in &SALE_FIELDS {
            match self.get(def.field) {
                Value::String(v) if def.sensitive => out.field(def.name, &mask(&v)),
                _ if def.sensitive => out.field(def.name, &"****"),
                Value::Int(v) => out.field(def.name, &v),
                Value::Long(v) => out.field(def.name, &v),
                Value::Double(v) => out.field(def.name, &v),
                Value::String(v) => out.field(def.name, &v),
                Value::TimestampMillis(v) => out.field(def.name, &v),
            };
        }
        out.finish()
    }
}

fn mask(value: &str) -> String {
    let skip = value.chars().count().saturating_sub(4);
    format!("****{}", value.chars().skip(skip).collect::<String>())
}
