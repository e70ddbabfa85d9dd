//! registry::caching
//!
//! Caching decorator over any [`RegistryClient`].
//!
//! # Design
//!
//! `CachingRegistryClient` owns the client it wraps and exposes the same
//! operation set. Reads are served from the cache tiers when possible;
//! misses call through and populate the tiers on success only. Failures are
//! never cached.
//!
//! Populated on every successful schema read or create:
//! - schema-by-id (durable) when the id is known
//! - schema-by-version (volatile) when subject and version are known
//! - schema-by-content-hash (durable) when schema-value caching is enabled
//!
//! The latest-schema entry of a subject is only written by
//! `get_latest_schema` itself; an arbitrary version read says nothing about
//! which version is currently the latest.
//!
//! Invalidation:
//! - permanent deletes clear both tiers; ids and versions may shift in ways
//!   no single key describes
//! - soft deletes drop the schema-by-version and latest-schema entries of
//!   the affected subject/version
//!
//! Compatibility checks and id-to-subject resolution always call through.
//!
//! # Example
//!
//! ```ignore
//! use protoreg::registry::{CacheOptions, CachingRegistryClient, HttpRegistryClient};
//!
//! let client = CachingRegistryClient::with_options(
//!     HttpRegistryClient::new(url),
//!     CacheOptions { ttl: Some(Duration::from_secs(60)), schema_value_caching: true },
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::cache::{schema_hash, CacheKey, CacheTier, CacheValue};
use super::traits::{RegistryClient, RegistryError, Schema, SubjectVersion};

/// Options for the caching decorator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Lifetime of volatile entries; `None` keeps them until invalidated
    pub ttl: Option<Duration>,
    /// Short-circuit `create_schema` for content that was already created
    pub schema_value_caching: bool,
}

/// Registry client that caches the results of a wrapped client.
#[derive(Debug)]
pub struct CachingRegistryClient<C> {
    /// Wrapped client all misses call through to
    inner: C,
    /// Entries that can go stale
    volatile: CacheTier,
    /// Entries that never go stale
    durable: CacheTier,
    /// Whether created schemas are cached by content hash
    schema_value_caching: bool,
}

impl<C: RegistryClient> CachingRegistryClient<C> {
    /// Wrap `inner` with default options: no TTL, no schema-value caching.
    pub fn new(inner: C) -> Self {
        Self::with_options(inner, CacheOptions::default())
    }

    /// Wrap `inner` with explicit options.
    pub fn with_options(inner: C, options: CacheOptions) -> Self {
        let volatile = match options.ttl {
            Some(ttl) => CacheTier::with_ttl(ttl),
            None => CacheTier::new(),
        };

        Self {
            inner,
            volatile,
            durable: CacheTier::new(),
            schema_value_caching: options.schema_value_caching,
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The volatile tier.
    pub fn volatile(&self) -> &CacheTier {
        &self.volatile
    }

    /// The durable tier.
    pub fn durable(&self) -> &CacheTier {
        &self.durable
    }

    /// Drop everything from both tiers.
    pub fn invalidate_all(&self) {
        self.volatile.clear();
        self.durable.clear();
    }

    fn cached_schema(tier: &CacheTier, key: &CacheKey) -> Option<Schema> {
        match tier.get(key) {
            Some(CacheValue::Schema(schema)) => {
                trace!(?key, "cache hit");
                Some(schema)
            }
            _ => {
                trace!(?key, "cache miss");
                None
            }
        }
    }

    /// Store `schema` under every key its known fields allow.
    fn cache_schema(&self, schema: &Schema) {
        if schema.id > 0 {
            self.durable
                .insert(CacheKey::SchemaById(schema.id), CacheValue::Schema(schema.clone()));
        }

        if !schema.subject.is_empty() && schema.version > 0 {
            self.volatile.insert(
                CacheKey::SchemaByVersion(schema.subject.clone(), schema.version),
                CacheValue::Schema(schema.clone()),
            );
        }

        if self.schema_value_caching {
            self.durable.insert(
                CacheKey::SchemaByHash(schema_hash(schema)),
                CacheValue::Schema(schema.clone()),
            );
        }
    }

    fn invalidate_subject(&self, subject: &str, permanent: bool) {
        if permanent {
            self.invalidate_all();
            return;
        }

        self.volatile.remove_where(|key| {
            matches!(key, CacheKey::SchemaByVersion(s, _) | CacheKey::LatestSchema(s) if s == subject)
        });
    }

    fn invalidate_version(&self, subject: &str, version: i32, permanent: bool) {
        if permanent {
            self.invalidate_all();
            return;
        }

        self.volatile
            .remove(&CacheKey::SchemaByVersion(subject.to_string(), version));
        self.volatile
            .remove(&CacheKey::LatestSchema(subject.to_string()));
    }
}

#[async_trait]
impl<C: RegistryClient> RegistryClient for CachingRegistryClient<C> {
    fn name(&self) -> &'static str {
        "caching"
    }

    async fn get_subjects(&self) -> Result<Vec<String>, RegistryError> {
        if let Some(CacheValue::Subjects(subjects)) = self.volatile.get(&CacheKey::Subjects) {
            trace!("cache hit: subjects");
            return Ok(subjects);
        }

        let subjects = self.inner.get_subjects().await?;
        self.volatile
            .insert(CacheKey::Subjects, CacheValue::Subjects(subjects.clone()));
        Ok(subjects)
    }

    async fn get_subject_versions(&self, subject: &str) -> Result<Vec<i32>, RegistryError> {
        let key = CacheKey::SubjectVersions(subject.to_string());
        if let Some(CacheValue::Versions(versions)) = self.volatile.get(&key) {
            trace!(subject, "cache hit: versions");
            return Ok(versions);
        }

        let versions = self.inner.get_subject_versions(subject).await?;
        self.volatile
            .insert(key, CacheValue::Versions(versions.clone()));
        Ok(versions)
    }

    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, RegistryError> {
        if let Some(schema) = Self::cached_schema(&self.durable, &CacheKey::SchemaById(id)) {
            return Ok(schema);
        }

        let schema = self.inner.get_schema_by_id(id).await?;
        self.cache_schema(&schema);
        Ok(schema)
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
    ) -> Result<Schema, RegistryError> {
        let key = CacheKey::SchemaByVersion(subject.to_string(), version);
        if let Some(schema) = Self::cached_schema(&self.volatile, &key) {
            return Ok(schema);
        }

        let schema = self.inner.get_schema_by_version(subject, version).await?;
        self.cache_schema(&schema);
        Ok(schema)
    }

    async fn get_latest_schema(&self, subject: &str) -> Result<Schema, RegistryError> {
        let key = CacheKey::LatestSchema(subject.to_string());
        if let Some(schema) = Self::cached_schema(&self.volatile, &key) {
            return Ok(schema);
        }

        let schema = self.inner.get_latest_schema(subject).await?;
        self.volatile.insert(key, CacheValue::Schema(schema.clone()));
        self.cache_schema(&schema);
        Ok(schema)
    }

    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, RegistryError> {
        self.inner.get_schema_subject_versions(id).await
    }

    async fn create_schema(&self, schema: &Schema) -> Result<Schema, RegistryError> {
        let hash_key = self
            .schema_value_caching
            .then(|| CacheKey::SchemaByHash(schema_hash(schema)));

        if let Some(key) = &hash_key {
            if let Some(created) = Self::cached_schema(&self.durable, key) {
                return Ok(created);
            }
        }

        let created = self.inner.create_schema(schema).await?;
        self.cache_schema(&created);
        if let Some(key) = hash_key {
            self.durable.insert(key, CacheValue::Schema(created.clone()));
        }
        Ok(created)
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<i32>, RegistryError> {
        // Invalidate whatever the outcome: a failed delete may still have
        // been applied partially.
        let result = self.inner.delete_subject(subject, permanent).await;
        self.invalidate_subject(subject, permanent);
        result
    }

    async fn delete_schema_version(
        &self,
        subject: &str,
        version: i32,
        permanent: bool,
    ) -> Result<i32, RegistryError> {
        let result = self
            .inner
            .delete_schema_version(subject, version, permanent)
            .await;
        self.invalidate_version(subject, version, permanent);
        result
    }

    async fn is_schema_compatible(&self, schema: &Schema) -> Result<bool, RegistryError> {
        self.inner.is_schema_compatible(schema).await
    }
}
