//! End-to-end tests for schema registration, loading and export.
//!
//! These tests verify:
//! - Imported files are registered before the importing file, in walk order
//! - A registered id round-trips through the wire envelope
//! - Loaded schemas compile back into the registered message types
//! - Exported schemas land on disk under their reference names

mod common;

use std::sync::Arc;

use prost_reflect::{DynamicMessage, ReflectMessage};
use tempfile::TempDir;

use protoreg::protobuf::{
    decode, decode_message, encode, export_latest_schema, ProtoError, ProtoxParser, SchemaParser,
    SchemaRegistrator, DEFAULT_SCHEMA_NAME,
};
use protoreg::registry::mock::{FailOn, MockOperation, MockRegistry};
use protoreg::registry::{
    CacheOptions, CachingRegistryClient, Reference, RegistryClient, RegistryError, Schema, SchemaType,
};

use common::User;

fn registrator(mock: &MockRegistry) -> SchemaRegistrator {
    SchemaRegistrator::new(Arc::new(mock.clone()))
}

fn order() -> DynamicMessage {
    let files = common::order_files();
    DynamicMessage::new(common::message(&files[0], "shop.Order"))
}

fn creates(mock: &MockRegistry) -> Vec<(String, Vec<Reference>)> {
    mock.operations()
        .into_iter()
        .filter_map(|op| match op {
            MockOperation::CreateSchema {
                subject,
                references,
            } => Some((subject, references)),
            _ => None,
        })
        .collect()
}

mod register_tests {
    use super::*;

    #[tokio::test]
    async fn imports_are_registered_first() {
        let mock = MockRegistry::new();

        registrator(&mock)
            .register_value("orders", &order())
            .await
            .unwrap();

        assert_eq!(
            mock.created_subjects(),
            vec![
                "money.proto",
                "currency.proto",
                "customer.proto",
                "orders-value"
            ]
        );

        let creates = creates(&mock);
        let root_refs: Vec<(&str, &str, i32)> = creates[3]
            .1
            .iter()
            .map(|r| (r.name.as_str(), r.subject.as_str(), r.version))
            .collect();
        assert_eq!(
            root_refs,
            vec![
                ("money.proto", "money.proto", 1),
                ("currency.proto", "currency.proto", 1),
                ("customer.proto", "customer.proto", 1),
            ]
        );
    }

    #[tokio::test]
    async fn registering_again_reuses_versions() {
        let mock = MockRegistry::new();
        let registrator = registrator(&mock);

        let first = registrator.register_value("orders", &order()).await.unwrap();
        let second = registrator.register_value("orders", &order()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            mock.get_subject_versions("orders-value").await.unwrap(),
            vec![1]
        );
    }

    #[tokio::test]
    async fn file_without_imports_has_no_references() {
        let mock = MockRegistry::new();

        registrator(&mock)
            .register_value("users", &common::sample_user())
            .await
            .unwrap();

        let creates = creates(&mock);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].0, "users-value");
        assert!(creates[0].1.is_empty());
    }

    #[tokio::test]
    async fn registered_id_roundtrips_through_envelope() {
        let mock = MockRegistry::new();
        let user = common::sample_user();

        let id = registrator(&mock)
            .register_value("users", &user)
            .await
            .unwrap();

        let bytes = encode(id, &user).unwrap();
        let (schema_id, decoded) = decode_message::<User>(&bytes).unwrap();
        assert_eq!(schema_id, id);
        assert_eq!(decoded, user);
    }

    #[tokio::test]
    async fn partial_failure_keeps_created_dependencies() {
        let mock = MockRegistry::new().fail_on(FailOn::CreateSchemaFor(
            "customer.proto".into(),
            RegistryError::Api {
                status: 422,
                error_code: 42201,
                message: "Invalid schema".into(),
            },
        ));

        let err = registrator(&mock)
            .register_value("orders", &order())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtoError::Registry(RegistryError::Api {
                error_code: 42201,
                ..
            })
        ));

        mock.clear_fail_on();
        let mut subjects = mock.get_subjects().await.unwrap();
        subjects.sort();
        assert_eq!(subjects, vec!["currency.proto", "money.proto"]);
    }

    #[tokio::test]
    async fn registers_through_caching_client() {
        let mock = MockRegistry::new();
        let caching = Arc::new(CachingRegistryClient::with_options(
            mock.clone(),
            CacheOptions {
                ttl: None,
                schema_value_caching: true,
            },
        ));
        let registrator = SchemaRegistrator::new(caching);

        let first = registrator.register_value("orders", &order()).await.unwrap();
        let second = registrator.register_value("orders", &order()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            mock.count(|op| matches!(op, MockOperation::CreateSchema { .. })),
            4
        );
    }
}

mod load_tests {
    use super::*;

    #[tokio::test]
    async fn loaded_schema_resolves_index_path() {
        let mock = MockRegistry::new();
        let registrator = registrator(&mock);
        let message = order();

        let id = registrator.register_value("orders", &message).await.unwrap();
        let files = registrator.load(id, "order.proto").await.unwrap();

        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "order.proto",
                "money.proto",
                "currency.proto",
                "customer.proto"
            ]
        );

        let bytes = encode(id, &message).unwrap();
        let envelope = decode(&bytes).unwrap();
        let resolved = envelope.index_path.resolve(&files[0]).unwrap();
        assert_eq!(resolved.full_name(), message.descriptor().full_name());
    }

    #[tokio::test]
    async fn map_declared_before_nested_message_keeps_path() {
        let mock = MockRegistry::new();
        let registrator = registrator(&mock);
        let file = common::compile(&[("labeled.proto", common::LABELED_PROTO)]).remove(0);
        let part = DynamicMessage::new(common::message(&file, "labeled.Item.Part"));

        let id = registrator.register_value("items", &part).await.unwrap();
        let files = registrator.load(id, "labeled.proto").await.unwrap();

        let envelope_bytes = encode(id, &part).unwrap();
        let envelope = decode(&envelope_bytes).unwrap();
        assert_eq!(envelope.index_path.as_slice(), &[0, 1]);

        let resolved = envelope.index_path.resolve(&files[0]).unwrap();
        assert_eq!(resolved.full_name(), "labeled.Item.Part");
    }

    #[tokio::test]
    async fn load_fails_on_missing_reference() {
        let mock = MockRegistry::new();
        let created = mock
            .create_schema(
                &Schema::new(
                    "orders-value",
                    SchemaType::Protobuf,
                    common::ORDER_PROTO,
                )
                .with_references(vec![Reference {
                    name: "money.proto".into(),
                    subject: "money.proto".into(),
                    version: 1,
                }]),
            )
            .await
            .unwrap();

        let err = registrator(&mock)
            .load(created.id, "order.proto")
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::Registry(RegistryError::NotFound(_))));
    }
}

mod export_tests {
    use super::*;

    #[tokio::test]
    async fn writes_schema_and_imports() {
        let mock = MockRegistry::new();
        let registrator = registrator(&mock);
        registrator.register_value("orders", &order()).await.unwrap();

        let dir = TempDir::new().unwrap();
        let written =
            export_latest_schema(&registrator, "orders-value", "order.proto", dir.path())
                .await
                .unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("order.proto"),
                dir.path().join("money.proto"),
                dir.path().join("currency.proto"),
                dir.path().join("customer.proto"),
            ]
        );

        let sources: Vec<(String, String)> = written
            .iter()
            .map(|path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                (name, std::fs::read_to_string(path).unwrap())
            })
            .collect();
        assert!(sources[0].1.contains("message Order {"));

        let reparsed = ProtoxParser::new().parse(&sources).unwrap();
        assert!(reparsed[0]
            .parent_pool()
            .get_message_by_name("shop.Order")
            .is_some());
    }

    #[tokio::test]
    async fn default_name_creates_directories() {
        let mock = MockRegistry::new();
        let registrator = registrator(&mock);
        registrator
            .register_value("users", &common::sample_user())
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("out");
        let written = export_latest_schema(&registrator, "users-value", DEFAULT_SCHEMA_NAME, &dest)
            .await
            .unwrap();

        assert_eq!(written, vec![dest.join(DEFAULT_SCHEMA_NAME)]);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert!(text.contains("message User {"));
        assert!(text.contains("message Address {"));
    }

    #[tokio::test]
    async fn non_protobuf_subject_is_rejected() {
        let mock = MockRegistry::new();
        mock.create_schema(&Schema::new("events-value", SchemaType::Avro, "\"string\""))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let err = export_latest_schema(
            &registrator(&mock),
            "events-value",
            DEFAULT_SCHEMA_NAME,
            dir.path(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProtoError::InvalidArgument(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found() {
        let mock = MockRegistry::new();
        let dir = TempDir::new().unwrap();

        let err = export_latest_schema(&registrator(&mock), "nope", DEFAULT_SCHEMA_NAME, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::Registry(RegistryError::NotFound(_))));
    }
}
