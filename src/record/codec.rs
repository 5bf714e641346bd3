//! Single-object binary messages carrying one [`Sale`].
//!
//! A message is a 10-byte header followed by the record body:
//!
//! ```text
//! +------+------+---------------------------+-----------------+
//! | 0xC3 | 0x01 | fingerprint (8 bytes, LE) | fields in order |
//! +------+------+---------------------------+-----------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use sale_codec::{Sale, SaleCodec};
//!
//! let codec = SaleCodec::new();
//! let sale = Sale::new(1, 42, 7, "ABC123", "4111111111111111", "12/29", 19.99, Utc::now());
//!
//! let bytes = codec.encode(&sale);
//! assert_eq!(codec.decode(&bytes).unwrap(), sale);
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use super::builder::SaleBuilder;
use super::sale::{Sale, SaleField};
use super::schema::{Fingerprint, Schema, Value};
use super::wire;
use crate::{Error, Result};

/// Single-object encoding marker.
pub const MARKER: [u8; 2] = [0xC3, 0x01];

pub const HEADER_LEN: usize = MARKER.len() + 8;

/// Lookup of writer schemas by fingerprint.
pub trait SchemaStore: Send + Sync {
    fn find_by_fingerprint(&self, fingerprint: Fingerprint) -> Option<Arc<Schema>>;
}

/// A [`SchemaStore`] filled up front and read-only once shared.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaStore {
    schemas: HashMap<Fingerprint, Arc<Schema>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, schema: Schema) -> Fingerprint {
        let fingerprint = schema.fingerprint();
        self.schemas.insert(fingerprint, Arc::new(schema));
        fingerprint
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn find_by_fingerprint(&self, fingerprint: Fingerprint) -> Option<Arc<Schema>> {
        self.schemas.get(&fingerprint).cloned()
    }
}

/// Encoder and decoder bound to the Sale schema.
///
/// Build one at startup and hand out clones or an `Arc`; the schema it
/// holds is never mutated.
#[derive(Debug, Clone)]
pub struct SaleCodec {
    schema: Arc<Schema>,
}

impl Default for SaleCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleCodec {
    pub fn new() -> Self {
        Self {
            schema: Arc::new(Sale::schema()),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.schema.fingerprint()
    }

    pub fn encode(&self, sale: &Sale) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + 64);
        buf.put_slice(&MARKER);
        buf.put_slice(&self.fingerprint().to_le_bytes());
        sale.encode_body(&mut buf);
        trace!(order_id = sale.order_id(), len = buf.len(), "Encoded sale");
        buf.freeze()
    }

    /// Encodes into `writer`. Sink failures surface as [`Error::Io`].
    pub fn encode_to<W: Write>(&self, sale: &Sale, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode(sale))?;
        Ok(())
    }

    /// Decodes a message written with the local schema.
    pub fn decode(&self, payload: &[u8]) -> Result<Sale> {
        self.decode_inner(payload, None)
    }

    /// Decodes a message whose writer schema may only be known to `store`.
    pub fn decode_with(&self, payload: &[u8], store: &dyn SchemaStore) -> Result<Sale> {
        self.decode_inner(payload, Some(store))
    }

    fn decode_inner(&self, payload: &[u8], store: Option<&dyn SchemaStore>) -> Result<Sale> {
        let mut cursor = payload;
        let fingerprint = read_header(&mut cursor)?;

        let sale = if fingerprint == self.fingerprint() {
            Sale::decode_body(&mut cursor)?
        } else {
            let writer = store
                .and_then(|store| store.find_by_fingerprint(fingerprint))
                .ok_or(Error::SchemaNotFound { fingerprint })?;
            debug!(
                fingerprint = %fingerprint,
                writer = writer.full_name(),
                "Decoding with schema from store"
            );
            project(&writer, read_record(&writer, &mut cursor)?)?
        };

        if cursor.has_remaining() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after record",
                cursor.remaining()
            )));
        }

        Ok(sale)
    }
}

/// Reads the marker and fingerprint, leaving `cursor` at the body.
pub fn read_header<B: Buf>(cursor: &mut B) -> Result<Fingerprint> {
    if cursor.remaining() < HEADER_LEN {
        return Err(Error::malformed(format!(
            "header needs {} bytes, got {}",
            HEADER_LEN,
            cursor.remaining()
        )));
    }

    let mut marker = [0u8; 2];
    cursor.copy_to_slice(&mut marker);
    if marker != MARKER {
        return Err(Error::malformed(format!(
            "unrecognized header marker {:02x}{:02x}",
            marker[0], marker[1]
        )));
    }

    let mut fingerprint = [0u8; 8];
    cursor.copy_to_slice(&mut fingerprint);
    Ok(Fingerprint::from_le_bytes(fingerprint))
}

/// Reads a body against an arbitrary writer schema.
pub fn read_record<B: Buf>(schema: &Schema, cursor: &mut B) -> Result<Vec<Value>> {
    schema
        .fields()
        .iter()
        .map(|field| wire::get_value(cursor, field.field_type))
        .collect()
}

/// Maps writer fields onto Sale fields by name. Writer-only fields are
/// dropped; Sale fields the writer lacks fall back to their defaults.
fn project(writer: &Schema, values: Vec<Value>) -> Result<Sale> {
    let mut builder = SaleBuilder::new();
    for (field, value) in writer.fields().iter().zip(values) {
        match SaleField::from_name(&field.name) {
            Some(target) => {
                builder.set(target, value)?;
            }
            None => debug!(field = %field.name, "Skipping field unknown to Sale"),
        }
    }
    builder.build()
}
