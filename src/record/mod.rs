pub mod builder;
pub mod codec;
pub mod sale;
pub mod schema;
pub mod wire;


pub use builder::SaleBuilder;
pub use codec::{InMemorySchemaStore, SaleCodec, SchemaStore};
pub use sale::{truncate_to_millis, Sale, SaleField, SALE_FIELDS, SALE_FULL_NAME};
pub use schema::{Field, FieldType, Fingerprint, Schema, Value};
