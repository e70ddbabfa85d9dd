//! protobuf::export
//!
//! Writing a subject's registered protobuf schema to disk as `.proto` files.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use super::registrator::SchemaRegistrator;
use super::ProtoError;
use crate::registry::SchemaType;

/// File name given to the subject's own schema when none is chosen.
pub const DEFAULT_SCHEMA_NAME: &str = "schema.proto";

/// Export the latest schema of `subject` into `dest`.
///
/// The schema is written as `name`, and every referenced file under its
/// reference name, all relative to `dest`. Missing directories are created.
/// Returns the written paths, the subject's own file first.
///
/// # Errors
///
/// - `ProtoError::InvalidArgument` if the subject does not hold a protobuf
///   schema, or a file name would leave `dest`
/// - `ProtoError::Registry` / `ProtoError::Descriptor` if loading fails
/// - `ProtoError::Write` if a file cannot be written
pub async fn export_latest_schema(
    registrator: &SchemaRegistrator,
    subject: &str,
    name: &str,
    dest: &Path,
) -> Result<Vec<PathBuf>, ProtoError> {
    let schema = registrator.client().get_latest_schema(subject).await?;
    if schema.schema_type != SchemaType::Protobuf {
        return Err(ProtoError::InvalidArgument(format!(
            "subject '{}' holds a {} schema, not PROTOBUF",
            subject, schema.schema_type
        )));
    }

    let files = registrator.load(schema.id, name).await?;

    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        let path = destination(dest, file.name())?;
        let text = registrator.printer().print(file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ProtoError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&path, text)
            .await
            .map_err(|source| ProtoError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "wrote schema file");
        written.push(path);
    }

    info!(subject, files = written.len(), dest = %dest.display(), "exported schema");
    Ok(written)
}

/// Join `name` onto `dest`, refusing names that escape it.
fn destination(dest: &Path, name: &str) -> Result<PathBuf, ProtoError> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || name.is_empty() {
        return Err(ProtoError::InvalidArgument(format!(
            "schema file name '{}' is not a relative path",
            name
        )));
    }
    Ok(dest.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_joins_relative_names() {
        let dest = Path::new("/out");
        assert_eq!(
            destination(dest, "google/type/date.proto").unwrap(),
            PathBuf::from("/out/google/type/date.proto")
        );
    }

    #[test]
    fn destination_rejects_escaping_names() {
        let dest = Path::new("/out");
        for name in ["../x.proto", "/etc/x.proto", "a/../../x.proto", ""] {
            assert!(
                matches!(destination(dest, name), Err(ProtoError::InvalidArgument(_))),
                "{} was accepted",
                name
            );
        }
    }
}
