//! protobuf::registrator
//!
//! Registering a message's schema closure and loading it back.
//!
//! # Design
//!
//! `register` walks the message file's imports with
//! [`collect_dependencies`], submits every imported file under a subject
//! named after the file, then submits the message's own file with a
//! reference per import, in walk order. Submissions are sequential so that
//! reference order is deterministic.
//!
//! Registration is not transactional: when a later submission fails, the
//! dependency schemas already created stay registered.
//!
//! Dependency schemas are submitted without references of their own; only
//! the root schema carries the reference list.

use std::collections::HashSet;
use std::sync::Arc;

use prost_reflect::{FileDescriptor, MessageDescriptor, ReflectMessage};
use tracing::debug;

use super::deps::collect_dependencies;
use super::parser::{ProtoxParser, SchemaParser};
use super::printer::{ProtoPrinter, SchemaPrinter};
use super::{ensure_message_kind, ProtoError};
use crate::registry::{Reference, RegistryClient, Schema, SchemaType};

/// Registers protobuf schemas with a registry.
pub struct SchemaRegistrator {
    client: Arc<dyn RegistryClient>,
    printer: Arc<dyn SchemaPrinter>,
    parser: Arc<dyn SchemaParser>,
}

impl std::fmt::Debug for SchemaRegistrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistrator")
            .field("client", &self.client.name())
            .finish_non_exhaustive()
    }
}

impl SchemaRegistrator {
    /// Create a registrator using the default printer and parser.
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            printer: Arc::new(ProtoPrinter::new()),
            parser: Arc::new(ProtoxParser::new()),
        }
    }

    /// Replace the schema printer.
    pub fn with_printer(mut self, printer: Arc<dyn SchemaPrinter>) -> Self {
        self.printer = printer;
        self
    }

    /// Replace the schema parser.
    pub fn with_parser(mut self, parser: Arc<dyn SchemaParser>) -> Self {
        self.parser = parser;
        self
    }

    /// The registry client used for every call.
    pub fn client(&self) -> &Arc<dyn RegistryClient> {
        &self.client
    }

    /// The printer rendering submitted schema text.
    pub fn printer(&self) -> &Arc<dyn SchemaPrinter> {
        &self.printer
    }

    /// Register `message`'s schema as the key schema of `topic`.
    pub async fn register_key<M: ReflectMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<u32, ProtoError> {
        self.register(&format!("{}-key", topic), message).await
    }

    /// Register `message`'s schema as the value schema of `topic`.
    pub async fn register_value<M: ReflectMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<u32, ProtoError> {
        self.register(&format!("{}-value", topic), message).await
    }

    /// Register `message`'s schema under `subject`, returning the schema id.
    pub async fn register<M: ReflectMessage>(
        &self,
        subject: &str,
        message: &M,
    ) -> Result<u32, ProtoError> {
        self.register_descriptor(subject, &message.descriptor()).await
    }

    /// Register the file declaring `descriptor` under `subject`.
    ///
    /// # Errors
    ///
    /// - `ProtoError::InvalidArgument` if `descriptor` is a map entry
    /// - `ProtoError::SchemaRender` if a file cannot be printed
    /// - `ProtoError::Registry` if a create call fails
    pub async fn register_descriptor(
        &self,
        subject: &str,
        descriptor: &MessageDescriptor,
    ) -> Result<u32, ProtoError> {
        ensure_message_kind(descriptor)?;
        let file = descriptor.parent_file();

        let deps = collect_dependencies(&file);
        debug!(
            subject,
            file = file.name(),
            dependencies = deps.len(),
            "registering schema"
        );

        let mut references = Vec::with_capacity(deps.len());
        for dep in &deps {
            let text = self.printer.print(dep)?;
            let created = self
                .client
                .create_schema(&Schema::new(dep.name(), SchemaType::Protobuf, text))
                .await?;

            debug!(
                subject = dep.name(),
                id = created.id,
                version = created.version,
                "registered dependency"
            );
            references.push(Reference {
                name: dep.name().to_string(),
                subject: dep.name().to_string(),
                version: created.version,
            });
        }

        let text = self.printer.print(&file)?;
        let created = self
            .client
            .create_schema(
                &Schema::new(subject, SchemaType::Protobuf, text).with_references(references),
            )
            .await?;

        debug!(subject, id = created.id, version = created.version, "registered schema");
        Ok(created.id)
    }

    /// Load schema `schema_id` and its references as file descriptors.
    ///
    /// The schema itself is named `name`; each reference is named after the
    /// reference's `name`. The root file comes first, followed by the
    /// references in order, each file once.
    pub async fn load(&self, schema_id: u32, name: &str) -> Result<Vec<FileDescriptor>, ProtoError> {
        let schema = self.client.get_schema_by_id(schema_id).await?;

        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut sources = vec![(name.to_string(), schema.text)];

        for reference in &schema.references {
            if !seen.insert(reference.name.clone()) {
                continue;
            }
            let dep = self
                .client
                .get_schema_by_version(&reference.subject, reference.version)
                .await?;
            sources.push((reference.name.clone(), dep.text));
        }

        debug!(schema_id, files = sources.len(), "parsing loaded schema");
        self.parser.parse(&sources)
    }
}
