pub mod config;
pub mod error;

pub mod kafka;
pub mod record;

pub use config::Config;
pub use error::{Error, Result};
pub use record::{Sale, SaleBuilder, SaleCodec, SaleField, Schema, SchemaStore};
