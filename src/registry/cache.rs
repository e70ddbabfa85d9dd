//! registry::cache
//!
//! In-memory cache tiers backing the caching registry client.
//!
//! # Design
//!
//! Two tiers, chosen by whether the cached data can go stale:
//! - **volatile**: subject lists, version lists, schema-by-version and
//!   latest-schema entries; optionally bounded by a TTL measured from write
//! - **durable**: schema-by-id and schema-by-content-hash entries; these
//!   never expire and are only dropped by an explicit clear
//!
//! Each tier guards its own map, so callers never take an external lock.
//! Expired entries are treated as misses and dropped on read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use super::traits::{Reference, Schema};

/// Key of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// All subjects
    Subjects,
    /// Versions of one subject
    SubjectVersions(String),
    /// One version of a subject
    SchemaByVersion(String, i32),
    /// Latest version of a subject
    LatestSchema(String),
    /// Schema by registry-global id
    SchemaById(u32),
    /// Created schema by content hash (see [`content_hash`])
    SchemaByHash(String),
}

impl CacheKey {
    /// The subject this key belongs to, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            CacheKey::SubjectVersions(s)
            | CacheKey::SchemaByVersion(s, _)
            | CacheKey::LatestSchema(s) => Some(s),
            _ => None,
        }
    }
}

/// Value of one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// A list of subject names
    Subjects(Vec<String>),
    /// A list of versions
    Versions(Vec<i32>),
    /// A schema
    Schema(Schema),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    written_at: Instant,
}

/// One cache tier: a synchronized map with an optional time-to-live.
#[derive(Debug, Default)]
pub struct CacheTier {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Option<Duration>,
}

impl CacheTier {
    /// Create a tier whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tier whose entries expire `ttl` after being written.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::default(),
            ttl: Some(ttl),
        }
    }

    /// Time-to-live applied to entries, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    // A poisoned lock only means a panic elsewhere while holding it; the map
    // itself is always left consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.written_at.elapsed() >= ttl)
    }

    /// Get a live entry.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store an entry, replacing any previous value.
    pub fn insert(&self, key: CacheKey, value: CacheValue) {
        self.lock().insert(
            key,
            CacheEntry {
                value,
                written_at: Instant::now(),
            },
        );
    }

    /// Drop one entry.
    pub fn remove(&self, key: &CacheKey) {
        self.lock().remove(key);
    }

    /// Drop every entry matching `predicate`.
    pub fn remove_where(&self, predicate: impl Fn(&CacheKey) -> bool) {
        self.lock().retain(|key, _| !predicate(key));
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Check if a live entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored entries, including not yet evicted expired ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Stable hash over the fields that make a schema unique for registration:
/// subject, schema text and the ordered references.
///
/// Every component is length-prefixed so that adjacent fields cannot be
/// shifted into each other.
pub fn content_hash(subject: &str, text: &str, references: &[Reference]) -> String {
    fn field(hasher: &mut Sha256, value: &[u8]) {
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value);
    }

    let mut hasher = Sha256::new();
    field(&mut hasher, subject.as_bytes());
    field(&mut hasher, text.as_bytes());
    hasher.update((references.len() as u64).to_be_bytes());
    for reference in references {
        field(&mut hasher, reference.name.as_bytes());
        field(&mut hasher, reference.subject.as_bytes());
        hasher.update(reference.version.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Content hash of a schema (see [`content_hash`]).
pub fn schema_hash(schema: &Schema) -> String {
    content_hash(&schema.subject, &schema.text, &schema.references)
}
