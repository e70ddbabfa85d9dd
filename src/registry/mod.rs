//! registry
//!
//! Clients for a Confluent-compatible schema registry.
//!
//! # Architecture
//!
//! The `RegistryClient` trait defines every registry operation. Callers hold
//! an `Arc<dyn RegistryClient>` built by [`ClientBuilder`] rather than naming
//! a concrete client type.
//!
//! - Registry failures surface as [`RegistryError`]; nothing here retries
//! - The caching decorator never caches failures
//! - Deletes always invalidate the affected cache entries
//!
//! # Modules
//!
//! - `traits`: Core `RegistryClient` trait and the schema data model
//! - `http`: Direct client speaking the registry REST API
//! - [`cache`]: Cache tiers and content hashing
//! - `caching`: Caching decorator over any client
//! - [`mock`]: In-memory registry for deterministic testing
//! - `factory`: Client construction from options or configuration
//!
//! # Example
//!
//! ```ignore
//! use protoreg::registry::{ClientBuilder, Schema, SchemaType};
//!
//! let client = ClientBuilder::new()
//!     .url("http://registry:8081")
//!     .caching(true)
//!     .build()?;
//!
//! let created = client
//!     .create_schema(&Schema::new("orders-value", SchemaType::Protobuf, text))
//!     .await?;
//!
//! println!("registered {} v{} as id {}", created.subject, created.version, created.id);
//! ```

pub mod cache;
mod caching;
mod factory;
mod http;
pub mod mock;
mod traits;

pub use caching::{CacheOptions, CachingRegistryClient};
pub use factory::{create_client, ClientBuilder};
pub use http::{HttpRegistryClient, CONTENT_TYPE_VALUE, DEFAULT_URL};
pub use traits::*;
