//! registry::traits
//!
//! Registry client trait definition and the schema data model.
//!
//! # Design
//!
//! The `RegistryClient` trait is async because every registry operation is a
//! network round trip. All methods return `Result` so that failures surface
//! immediately to the caller; nothing in this layer retries.
//!
//! Cancellation and deadlines are whatever the caller wraps around the
//! returned future (for example `tokio::time::timeout`). Dropping the future
//! aborts the request.
//!
//! # Example
//!
//! ```ignore
//! use protoreg::registry::{RegistryClient, Schema, SchemaType};
//!
//! async fn publish(client: &dyn RegistryClient) -> Result<u32, RegistryError> {
//!     let created = client
//!         .create_schema(&Schema::new("orders-value", SchemaType::Protobuf, text))
//!         .await?;
//!     Ok(created.id)
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry answered 404 for the requested resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registry answered with a non-2xx status other than 404.
    #[error("registry error: {status} (code {error_code}) - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Registry-specific error code from the response body
        error_code: i32,
        /// Error message from the response body
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response carried a body that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    /// Check whether this error is the registry's not-found answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

/// Kind of schema text stored under a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    /// Protocol Buffers `.proto` text
    Protobuf,
    /// Avro JSON schema; the registry's default when the type is omitted
    #[default]
    Avro,
    /// JSON Schema
    Json,
}

impl SchemaType {
    /// Wire name used in registry JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Protobuf => "PROTOBUF",
            SchemaType::Avro => "AVRO",
            SchemaType::Json => "JSON",
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pin from one schema to a registered version of another subject.
///
/// For protobuf these are imported files; for JSON schema they are `$ref`
/// targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Import name as it appears in the referencing schema
    pub name: String,
    /// Subject holding the referenced schema
    pub subject: String,
    /// Version of the referenced subject
    pub version: i32,
}

/// One registered (or to-be-registered) schema.
///
/// `id` and `version` are assigned by the registry and stay `0` until the
/// schema has been created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Registry-global numeric id
    #[serde(default)]
    pub id: u32,
    /// Raw schema text
    #[serde(rename = "schema", default)]
    pub text: String,
    /// Subject the schema is stored under
    #[serde(default)]
    pub subject: String,
    /// Version within the subject
    #[serde(default)]
    pub version: i32,
    /// Ordered references to dependency schemas
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Schema kind
    #[serde(rename = "schemaType", default)]
    pub schema_type: SchemaType,
}

impl Schema {
    /// Create an unregistered schema for `subject`.
    pub fn new(subject: impl Into<String>, schema_type: SchemaType, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            schema_type,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attach references, replacing any existing ones.
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    /// Schema text as it is submitted to the registry.
    ///
    /// Avro and JSON schema text is flattened onto one line; protobuf text is
    /// returned verbatim.
    pub fn raw_text(&self) -> String {
        match self.schema_type {
            SchemaType::Avro | SchemaType::Json => {
                self.text.replace("\r\n", " ").replace('\n', " ")
            }
            SchemaType::Protobuf => self.text.clone(),
        }
    }
}

/// A `(subject, version)` pair pointing at a schema id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectVersion {
    /// Subject name
    pub subject: String,
    /// Version within the subject
    pub version: i32,
}

/// The registry client trait.
///
/// Implemented by the direct HTTP client, the caching decorator and the
/// in-memory mock.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; every operation may be invoked by
/// any number of concurrent callers.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Get the client name (e.g., "http", "caching").
    fn name(&self) -> &'static str;

    /// List all non-deleted subjects.
    async fn get_subjects(&self) -> Result<Vec<String>, RegistryError>;

    /// List the non-deleted versions registered under `subject`.
    async fn get_subject_versions(&self, subject: &str) -> Result<Vec<i32>, RegistryError>;

    /// Get a schema by its registry-global id.
    ///
    /// The result carries `id`, text, type and references; subject and
    /// version are unknown for an id lookup and stay unset.
    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, RegistryError>;

    /// Get one version of a subject.
    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
    ) -> Result<Schema, RegistryError>;

    /// Get the latest version of a subject.
    async fn get_latest_schema(&self, subject: &str) -> Result<Schema, RegistryError>;

    /// Resolve every `(subject, version)` currently pointing at `id`.
    ///
    /// One id is shared by all subjects registering identical content.
    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, RegistryError>;

    /// Register `schema` under `schema.subject`.
    ///
    /// The registry is content-idempotent: submitting identical subject, text
    /// and references returns the existing id and version.
    async fn create_schema(&self, schema: &Schema) -> Result<Schema, RegistryError>;

    /// Delete a subject, returning the affected versions.
    ///
    /// Soft deletes hide the versions; permanent deletes purge them.
    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<i32>, RegistryError>;

    /// Delete one version of a subject, returning the deleted version.
    async fn delete_schema_version(
        &self,
        subject: &str,
        version: i32,
        permanent: bool,
    ) -> Result<i32, RegistryError>;

    /// Check `schema` against `schema.subject` at `schema.version`
    /// (latest when the version is unset).
    async fn is_schema_compatible(&self, schema: &Schema) -> Result<bool, RegistryError>;
}

#[async_trait]
impl<T: RegistryClient + ?Sized> RegistryClient for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get_subjects(&self) -> Result<Vec<String>, RegistryError> {
        (**self).get_subjects().await
    }

    async fn get_subject_versions(&self, subject: &str) -> Result<Vec<i32>, RegistryError> {
        (**self).get_subject_versions(subject).await
    }

    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, RegistryError> {
        (**self).get_schema_by_id(id).await
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
    ) -> Result<Schema, RegistryError> {
        (**self).get_schema_by_version(subject, version).await
    }

    async fn get_latest_schema(&self, subject: &str) -> Result<Schema, RegistryError> {
        (**self).get_latest_schema(subject).await
    }

    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, RegistryError> {
        (**self).get_schema_subject_versions(id).await
    }

    async fn create_schema(&self, schema: &Schema) -> Result<Schema, RegistryError> {
        (**self).create_schema(schema).await
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<i32>, RegistryError> {
        (**self).delete_subject(subject, permanent).await
    }

    async fn delete_schema_version(
        &self,
        subject: &str,
        version: i32,
        permanent: bool,
    ) -> Result<i32, RegistryError> {
        (**self).delete_schema_version(subject, version, permanent).await
    }

    async fn is_schema_compatible(&self, schema: &Schema) -> Result<bool, RegistryError> {
        (**self).is_schema_compatible(schema).await
    }
}
