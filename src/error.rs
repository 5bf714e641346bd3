//! Error types and result handling for sale-codec.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use sale_codec::{Error, Result, SaleCodec};
//!
//! fn read_sale(codec: &SaleCodec, payload: &[u8]) -> Result<()> {
//!     codec.decode(payload)?;
//!     Ok(())
//! }
//!
//! let codec = SaleCodec::new();
//! match read_sale(&codec, &[0xC3, 0x01]) {
//!     Ok(()) => println!("Decoded"),
//!     Err(Error::MalformedPayload { message }) => eprintln!("Discarding: {}", message),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use crate::record::Fingerprint;
use thiserror::Error;

/// The main error type for sale-codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, typically a missing or invalid environment variable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kafka client, producer or admin error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error when reading Sale input or parsing a schema document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from the byte sink an encoder writes into.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A schema document that is not a supported record schema.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The fingerprint in a message header matched neither the local
    /// schema nor anything in the supplied schema store.
    #[error("Schema not found for fingerprint {fingerprint}")]
    SchemaNotFound {
        /// Fingerprint read from the message header
        fingerprint: Fingerprint,
    },

    /// Truncated, structurally invalid or type-mismatched input.
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Description of what was invalid
        message: String,
    },

    /// A builder was finalized while a field without a default was unset.
    #[error("Missing required field: {field}")]
    MissingRequiredField {
        /// Name of the unset field
        field: String,
    },
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedPayload {
            message: message.into(),
        }
    }

    /// Returns `true` when the message may become decodable once the
    /// schema store learns about its fingerprint.
    pub fn is_schema_not_found(&self) -> bool {
        matches!(self, Error::SchemaNotFound { .. })
    }
}

/// A convenient Result type alias for sale-codec operations.
///
/// This is equivalent to `std::result::Result<T, sale_codec::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
