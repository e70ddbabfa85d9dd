//! protobuf
//!
//! Protobuf wire envelope and schema registration.
//!
//! # Architecture
//!
//! Everything here works over `prost_reflect` descriptors. Any message that
//! implements [`ReflectMessage`](prost_reflect::ReflectMessage) (generated
//! types and `DynamicMessage` alike) can be encoded or registered.
//!
//! - Encoding and registration agree on message identity: both locate a
//!   message type by its [`MessageIndexPath`] within its file
//! - Registration submits dependency files before the file that imports them
//! - Nothing here retries; registry errors propagate unchanged
//!
//! # Modules
//!
//! - `varint`: Zigzag base-128 varints
//! - `index`: Message index paths
//! - `deps`: Transitive import collection
//! - `printer`: Descriptor to `.proto` text rendering
//! - `parser`: Multi-file `.proto` parsing
//! - `codec`: Wire envelope encoding and decoding
//! - `registrator`: Schema registration and loading
//! - `export`: Writing registered schemas to disk
//!
//! # Example
//!
//! ```ignore
//! use protoreg::protobuf::{decode_message, encode, SchemaRegistrator};
//!
//! let registrator = SchemaRegistrator::new(client);
//! let id = registrator.register_value("users", &user).await?;
//!
//! let bytes = encode(id, &user)?;
//! let (schema_id, decoded) = decode_message::<User>(&bytes)?;
//! ```

mod codec;
mod deps;
mod export;
mod index;
mod parser;
mod printer;
mod registrator;
pub mod varint;

pub use codec::{decode, decode_dynamic, decode_message, encode, Envelope, MAGIC_BYTE};
pub use deps::collect_dependencies;
pub use export::{export_latest_schema, DEFAULT_SCHEMA_NAME};
pub use index::{message_index_path, MessageIndexPath};
pub use parser::{ProtoxParser, SchemaParser};
pub use printer::{ProtoPrinter, SchemaPrinter};
pub use registrator::SchemaRegistrator;

use std::path::PathBuf;

use prost_reflect::MessageDescriptor;
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors from protobuf encoding, decoding and registration.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The supplied message or argument is not usable for the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Descriptors could not be loaded or parsed.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// A file descriptor could not be rendered to schema text.
    #[error("cannot render schema for '{file}': {message}")]
    SchemaRender {
        /// File being rendered
        file: String,
        /// What could not be rendered
        message: String,
    },

    /// Malformed wire envelope.
    #[error("wire format error: {0}")]
    WireFormat(String),

    /// Message payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Registry call failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Writing an exported schema file failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Destination file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Reject descriptors that cannot stand on their own as a message type.
pub(crate) fn ensure_message_kind(descriptor: &MessageDescriptor) -> Result<(), ProtoError> {
    if descriptor.is_map_entry() {
        return Err(ProtoError::InvalidArgument(format!(
            "'{}' is a map entry, not a message type",
            descriptor.full_name()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_entry_is_rejected() {
        let file = fixtures::file("user.proto", fixtures::USER);
        let entry = fixtures::message(&file, "fixture.User.LabelsEntry");

        let err = ensure_message_kind(&entry).unwrap_err();
        assert!(matches!(err, ProtoError::InvalidArgument(_)));

        let user = fixtures::message(&file, "fixture.User");
        assert!(ensure_message_kind(&user).is_ok());
    }

    #[test]
    fn registry_errors_pass_through() {
        let err: ProtoError = RegistryError::NotFound("Schema 7 not found".into()).into();
        assert_eq!(err.to_string(), "not found: Schema 7 not found");
    }
}
