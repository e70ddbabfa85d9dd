//! registry::mock
//!
//! In-memory registry for deterministic testing and offline tooling.
//!
//! # Design
//!
//! The mock keeps subjects, versions and schema contents in memory and
//! follows the registry's observable rules:
//! - creation is content-idempotent per subject
//! - identical content shares one id across subjects
//! - soft deletes hide versions while their ids stay resolvable
//! - permanent deletes purge versions; ids nothing points at any more are
//!   dropped
//!
//! Every call is recorded so tests can assert on the exact backing traffic.
//!
//! # Example
//!
//! ```
//! use protoreg::registry::mock::MockRegistry;
//! use protoreg::registry::{RegistryClient, Schema, SchemaType};
//!
//! # tokio_test::block_on(async {
//! let registry = MockRegistry::new();
//!
//! let created = registry
//!     .create_schema(&Schema::new("user-value", SchemaType::Protobuf, "syntax = \"proto3\";"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(created.id, 1);
//! assert_eq!(created.version, 1);
//!
//! let fetched = registry.get_schema_by_id(1).await.unwrap();
//! assert_eq!(fetched.text, created.text);
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{
    Reference, RegistryClient, RegistryError, Schema, SchemaType, SubjectVersion,
};

/// Mock registry for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRegistry {
    inner: Arc<Mutex<MockRegistryInner>>,
}

/// Stored schema content, shared by every subject version using the id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredContent {
    text: String,
    schema_type: SchemaType,
    references: Vec<Reference>,
}

#[derive(Debug, Clone)]
struct VersionEntry {
    version: i32,
    id: u32,
    deleted: bool,
}

#[derive(Debug)]
struct MockRegistryInner {
    /// Content by id.
    contents: BTreeMap<u32, StoredContent>,
    /// Versions by subject, in registration order.
    subjects: BTreeMap<String, Vec<VersionEntry>>,
    /// Next id to assign.
    next_id: u32,
    /// Answer given to compatibility checks.
    compatible: bool,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_subjects with the given error.
    GetSubjects(RegistryError),
    /// Fail get_subject_versions with the given error.
    GetSubjectVersions(RegistryError),
    /// Fail get_schema_by_id with the given error.
    GetSchemaById(RegistryError),
    /// Fail get_schema_by_version with the given error.
    GetSchemaByVersion(RegistryError),
    /// Fail get_latest_schema with the given error.
    GetLatestSchema(RegistryError),
    /// Fail get_schema_subject_versions with the given error.
    GetSchemaSubjectVersions(RegistryError),
    /// Fail every create_schema with the given error.
    CreateSchema(RegistryError),
    /// Fail create_schema for one subject only.
    CreateSchemaFor(String, RegistryError),
    /// Fail delete_subject with the given error.
    DeleteSubject(RegistryError),
    /// Fail delete_schema_version with the given error.
    DeleteSchemaVersion(RegistryError),
    /// Fail is_schema_compatible with the given error.
    IsSchemaCompatible(RegistryError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetSubjects,
    GetSubjectVersions {
        subject: String,
    },
    GetSchemaById {
        id: u32,
    },
    GetSchemaByVersion {
        subject: String,
        version: i32,
    },
    GetLatestSchema {
        subject: String,
    },
    GetSchemaSubjectVersions {
        id: u32,
    },
    CreateSchema {
        subject: String,
        references: Vec<Reference>,
    },
    DeleteSubject {
        subject: String,
        permanent: bool,
    },
    DeleteSchemaVersion {
        subject: String,
        version: i32,
        permanent: bool,
    },
    IsSchemaCompatible {
        subject: String,
        version: i32,
    },
}

fn subject_not_found(subject: &str) -> RegistryError {
    RegistryError::NotFound(format!("Subject '{}' not found.", subject))
}

fn version_not_found(subject: &str, version: i32) -> RegistryError {
    RegistryError::NotFound(format!(
        "Version {} not found for subject '{}'.",
        version, subject
    ))
}

impl MockRegistryInner {
    fn live_versions(&self, subject: &str) -> Vec<&VersionEntry> {
        self.subjects
            .get(subject)
            .map(|entries| entries.iter().filter(|e| !e.deleted).collect())
            .unwrap_or_default()
    }

    fn schema(&self, subject: &str, entry: &VersionEntry) -> Schema {
        let content = self.contents.get(&entry.id).cloned().unwrap_or(StoredContent {
            text: String::new(),
            schema_type: SchemaType::default(),
            references: Vec::new(),
        });

        Schema {
            id: entry.id,
            text: content.text,
            subject: subject.to_string(),
            version: entry.version,
            references: content.references,
            schema_type: content.schema_type,
        }
    }

    /// Drop contents no subject version points at any more.
    fn collect_ids(&mut self) {
        let subjects = &self.subjects;
        self.contents.retain(|id, _| {
            subjects
                .values()
                .flatten()
                .any(|entry| entry.id == *id)
        });
    }
}

impl MockRegistry {
    /// Create a new empty mock registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRegistryInner {
                contents: BTreeMap::new(),
                subjects: BTreeMap::new(),
                next_id: 1,
                compatible: true,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use protoreg::registry::mock::{FailOn, MockRegistry};
    /// use protoreg::registry::RegistryError;
    ///
    /// let registry = MockRegistry::new()
    ///     .fail_on(FailOn::GetSubjects(RegistryError::Network("down".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Set the answer given to compatibility checks.
    pub fn set_compatible(&self, compatible: bool) {
        self.lock().compatible = compatible;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Count recorded operations matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&MockOperation) -> bool) -> usize {
        self.lock().operations.iter().filter(|op| predicate(op)).count()
    }

    /// Subjects of all recorded create calls, in call order.
    pub fn created_subjects(&self) -> Vec<String> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                MockOperation::CreateSchema { subject, .. } => Some(subject.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Number of distinct schema contents currently stored.
    pub fn schema_count(&self) -> usize {
        self.lock().contents.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockRegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str, subject: Option<&str>) -> Result<(), RegistryError> {
        let inner = self.lock();
        let error = match (&inner.fail_on, expected) {
            (Some(FailOn::GetSubjects(e)), "get_subjects")
            | (Some(FailOn::GetSubjectVersions(e)), "get_subject_versions")
            | (Some(FailOn::GetSchemaById(e)), "get_schema_by_id")
            | (Some(FailOn::GetSchemaByVersion(e)), "get_schema_by_version")
            | (Some(FailOn::GetLatestSchema(e)), "get_latest_schema")
            | (Some(FailOn::GetSchemaSubjectVersions(e)), "get_schema_subject_versions")
            | (Some(FailOn::CreateSchema(e)), "create_schema")
            | (Some(FailOn::DeleteSubject(e)), "delete_subject")
            | (Some(FailOn::DeleteSchemaVersion(e)), "delete_schema_version")
            | (Some(FailOn::IsSchemaCompatible(e)), "is_schema_compatible") => Some(e.clone()),
            (Some(FailOn::CreateSchemaFor(s, e)), "create_schema") if Some(s.as_str()) == subject => {
                Some(e.clone())
            }
            _ => None,
        };

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for MockRegistry {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_subjects(&self) -> Result<Vec<String>, RegistryError> {
        self.record(MockOperation::GetSubjects);
        self.check_fail("get_subjects", None)?;

        let inner = self.lock();
        Ok(inner
            .subjects
            .keys()
            .filter(|subject| !inner.live_versions(subject).is_empty())
            .cloned()
            .collect())
    }

    async fn get_subject_versions(&self, subject: &str) -> Result<Vec<i32>, RegistryError> {
        self.record(MockOperation::GetSubjectVersions {
            subject: subject.to_string(),
        });
        self.check_fail("get_subject_versions", Some(subject))?;

        let inner = self.lock();
        let versions: Vec<i32> = inner
            .live_versions(subject)
            .iter()
            .map(|e| e.version)
            .collect();

        if versions.is_empty() {
            return Err(subject_not_found(subject));
        }
        Ok(versions)
    }

    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, RegistryError> {
        self.record(MockOperation::GetSchemaById { id });
        self.check_fail("get_schema_by_id", None)?;

        let inner = self.lock();
        let content = inner
            .contents
            .get(&id)
            .ok_or_else(|| RegistryError::NotFound(format!("Schema {} not found", id)))?;

        Ok(Schema {
            id,
            text: content.text.clone(),
            references: content.references.clone(),
            schema_type: content.schema_type,
            ..Schema::default()
        })
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
    ) -> Result<Schema, RegistryError> {
        self.record(MockOperation::GetSchemaByVersion {
            subject: subject.to_string(),
            version,
        });
        self.check_fail("get_schema_by_version", Some(subject))?;

        let inner = self.lock();
        let live = inner.live_versions(subject);
        if live.is_empty() {
            return Err(subject_not_found(subject));
        }

        live.iter()
            .find(|e| e.version == version)
            .map(|entry| inner.schema(subject, entry))
            .ok_or_else(|| version_not_found(subject, version))
    }

    async fn get_latest_schema(&self, subject: &str) -> Result<Schema, RegistryError> {
        self.record(MockOperation::GetLatestSchema {
            subject: subject.to_string(),
        });
        self.check_fail("get_latest_schema", Some(subject))?;

        let inner = self.lock();
        inner
            .live_versions(subject)
            .into_iter()
            .max_by_key(|e| e.version)
            .map(|entry| inner.schema(subject, entry))
            .ok_or_else(|| subject_not_found(subject))
    }

    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, RegistryError> {
        self.record(MockOperation::GetSchemaSubjectVersions { id });
        self.check_fail("get_schema_subject_versions", None)?;

        let inner = self.lock();
        if !inner.contents.contains_key(&id) {
            return Err(RegistryError::NotFound(format!("Schema {} not found", id)));
        }

        Ok(inner
            .subjects
            .iter()
            .flat_map(|(subject, entries)| {
                entries
                    .iter()
                    .filter(|e| !e.deleted && e.id == id)
                    .map(move |e| SubjectVersion {
                        subject: subject.clone(),
                        version: e.version,
                    })
            })
            .collect())
    }

    async fn create_schema(&self, schema: &Schema) -> Result<Schema, RegistryError> {
        self.record(MockOperation::CreateSchema {
            subject: schema.subject.clone(),
            references: schema.references.clone(),
        });
        self.check_fail("create_schema", Some(&schema.subject))?;

        let content = StoredContent {
            text: schema.raw_text(),
            schema_type: schema.schema_type,
            references: schema.references.clone(),
        };

        let mut inner = self.lock();
        let existing_id = inner
            .contents
            .iter()
            .find(|(_, stored)| **stored == content)
            .map(|(id, _)| *id);

        let id = match existing_id {
            Some(id) => id,
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.contents.insert(id, content);
                id
            }
        };

        let entries = inner.subjects.entry(schema.subject.clone()).or_default();
        let version = match entries.iter().find(|e| !e.deleted && e.id == id) {
            Some(entry) => entry.version,
            None => {
                let version = entries.iter().map(|e| e.version).max().unwrap_or(0) + 1;
                entries.push(VersionEntry {
                    version,
                    id,
                    deleted: false,
                });
                version
            }
        };

        let mut created = schema.clone();
        created.id = id;
        created.version = version;
        Ok(created)
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<i32>, RegistryError> {
        self.record(MockOperation::DeleteSubject {
            subject: subject.to_string(),
            permanent,
        });
        self.check_fail("delete_subject", Some(subject))?;

        let mut inner = self.lock();
        let entries = inner
            .subjects
            .get_mut(subject)
            .ok_or_else(|| subject_not_found(subject))?;

        let deleted: Vec<i32> = entries
            .iter_mut()
            .filter(|e| !e.deleted)
            .map(|e| {
                e.deleted = true;
                e.version
            })
            .collect();

        if permanent {
            inner.subjects.remove(subject);
            inner.collect_ids();
        } else if deleted.is_empty() {
            return Err(subject_not_found(subject));
        }

        Ok(deleted)
    }

    async fn delete_schema_version(
        &self,
        subject: &str,
        version: i32,
        permanent: bool,
    ) -> Result<i32, RegistryError> {
        self.record(MockOperation::DeleteSchemaVersion {
            subject: subject.to_string(),
            version,
            permanent,
        });
        self.check_fail("delete_schema_version", Some(subject))?;

        let mut inner = self.lock();
        let entries = inner
            .subjects
            .get_mut(subject)
            .ok_or_else(|| subject_not_found(subject))?;

        let position = entries
            .iter()
            .position(|e| e.version == version && (permanent || !e.deleted))
            .ok_or_else(|| version_not_found(subject, version))?;

        if permanent {
            entries.remove(position);
            if entries.is_empty() {
                inner.subjects.remove(subject);
            }
            inner.collect_ids();
        } else {
            entries[position].deleted = true;
        }

        Ok(version)
    }

    async fn is_schema_compatible(&self, schema: &Schema) -> Result<bool, RegistryError> {
        self.record(MockOperation::IsSchemaCompatible {
            subject: schema.subject.clone(),
            version: schema.version,
        });
        self.check_fail("is_schema_compatible", Some(&schema.subject))?;

        let inner = self.lock();
        if inner.live_versions(&schema.subject).is_empty() {
            return Err(subject_not_found(&schema.subject));
        }
        Ok(inner.compatible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proto(subject: &str, text: &str) -> Schema {
        Schema::new(subject, SchemaType::Protobuf, text)
    }

    #[tokio::test]
    async fn create_is_idempotent_per_subject() {
        let registry = MockRegistry::new();

        let first = registry.create_schema(&proto("a", "x")).await.unwrap();
        let second = registry.create_schema(&proto("a", "x")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 1);
        assert_eq!(registry.schema_count(), 1);
    }

    #[tokio::test]
    async fn new_content_gets_new_version() {
        let registry = MockRegistry::new();

        registry.create_schema(&proto("a", "x")).await.unwrap();
        let second = registry.create_schema(&proto("a", "y")).await.unwrap();

        assert_eq!(second.id, 2);
        assert_eq!(second.version, 2);
        assert_eq!(registry.get_subject_versions("a").await.unwrap(), vec![1, 2]);
        assert_eq!(registry.get_latest_schema("a").await.unwrap().text, "y");
    }

    #[tokio::test]
    async fn identical_content_shares_id_across_subjects() {
        let registry = MockRegistry::new();

        let a = registry.create_schema(&proto("a", "x")).await.unwrap();
        let b = registry.create_schema(&proto("b", "x")).await.unwrap();
        assert_eq!(a.id, b.id);

        let aliases = registry.get_schema_subject_versions(a.id).await.unwrap();
        assert_eq!(
            aliases,
            vec![
                SubjectVersion {
                    subject: "a".into(),
                    version: 1
                },
                SubjectVersion {
                    subject: "b".into(),
                    version: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn soft_delete_keeps_id_resolvable() {
        let registry = MockRegistry::new();
        let created = registry.create_schema(&proto("a", "x")).await.unwrap();

        let deleted = registry.delete_subject("a", false).await.unwrap();
        assert_eq!(deleted, vec![1]);

        assert!(registry.get_subjects().await.unwrap().is_empty());
        assert!(registry
            .get_latest_schema("a")
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(registry.get_schema_by_id(created.id).await.unwrap().text, "x");
    }

    #[tokio::test]
    async fn permanent_delete_purges_content() {
        let registry = MockRegistry::new();
        let created = registry.create_schema(&proto("a", "x")).await.unwrap();

        registry.delete_subject("a", true).await.unwrap();

        assert!(registry
            .get_schema_by_id(created.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(registry.schema_count(), 0);
    }

    #[tokio::test]
    async fn delete_version_hides_only_that_version() {
        let registry = MockRegistry::new();
        registry.create_schema(&proto("a", "x")).await.unwrap();
        registry.create_schema(&proto("a", "y")).await.unwrap();

        assert_eq!(registry.delete_schema_version("a", 2, false).await.unwrap(), 2);

        assert_eq!(registry.get_subject_versions("a").await.unwrap(), vec![1]);
        assert_eq!(registry.get_latest_schema("a").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn fail_on_create_for_subject() {
        let registry = MockRegistry::new().fail_on(FailOn::CreateSchemaFor(
            "b".into(),
            RegistryError::Network("down".into()),
        ));

        assert!(registry.create_schema(&proto("a", "x")).await.is_ok());
        assert_eq!(
            registry.create_schema(&proto("b", "x")).await.unwrap_err(),
            RegistryError::Network("down".into())
        );
        assert_eq!(registry.created_subjects(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn fail_on_subject_versions_for_id() {
        let registry = MockRegistry::new();
        let created = registry.create_schema(&proto("a", "x")).await.unwrap();
        let registry = registry.fail_on(FailOn::GetSchemaSubjectVersions(RegistryError::Network(
            "down".into(),
        )));

        assert_eq!(
            registry
                .get_schema_subject_versions(created.id)
                .await
                .unwrap_err(),
            RegistryError::Network("down".into())
        );
        assert_eq!(
            registry.count(|op| matches!(op, MockOperation::GetSchemaSubjectVersions { .. })),
            1
        );

        registry.clear_fail_on();
        let pairs = registry.get_schema_subject_versions(created.id).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].subject, "a");
    }

    #[tokio::test]
    async fn compatibility_answer_is_configurable() {
        let registry = MockRegistry::new();
        registry.create_schema(&proto("a", "x")).await.unwrap();

        assert!(registry.is_schema_compatible(&proto("a", "y")).await.unwrap());
        registry.set_compatible(false);
        assert!(!registry.is_schema_compatible(&proto("a", "y")).await.unwrap());
    }
}
