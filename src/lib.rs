//! Protoreg - Protobuf framing and schema registration for schema registries
//!
//! Protoreg lets producers and consumers exchange protobuf messages whose
//! schemas are governed by a Confluent-compatible schema registry. Every
//! encoded message carries the registry id of its schema and the position
//! of its type within that schema.
//!
//! # Architecture
//!
//! The crate is layered, leaves first:
//!
//! - [`config`] - Client configuration loaded from TOML
//! - [`registry`] - Registry client trait, HTTP client, caching decorator
//! - [`protobuf`] - Wire codec, index paths, dependency walk, registration
//!
//! # Correctness Invariants
//!
//! 1. Encoding and registration locate a message type the same way
//! 2. Dependency schemas are registered before the schema importing them
//! 3. Failures are never cached and never retried
//! 4. Deletes always invalidate the cache entries they may have staled
//!
//! # Example
//!
//! ```ignore
//! use protoreg::protobuf::{decode_message, encode, SchemaRegistrator};
//! use protoreg::registry::ClientBuilder;
//!
//! let client = ClientBuilder::new()
//!     .url("http://schema-registry:8081")
//!     .caching(true)
//!     .build()?;
//!
//! let registrator = SchemaRegistrator::new(client);
//! let id = registrator.register_value("users", &user).await?;
//!
//! let bytes = encode(id, &user)?;
//! let (schema_id, decoded) = decode_message::<User>(&bytes)?;
//! ```

pub mod config;
pub mod protobuf;
pub mod registry;
