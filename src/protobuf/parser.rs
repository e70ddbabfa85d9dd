//! protobuf::parser
//!
//! Parsing a set of named `.proto` sources into descriptors.
//!
//! Imports resolve against the supplied sources first, then against the
//! bundled `google/protobuf/*.proto` well-known types.

use std::collections::HashMap;
use std::path::Path;

use prost_reflect::FileDescriptor;
use protox::file::{File, FileResolver, GoogleFileResolver};
use protox::Compiler;

use super::ProtoError;

/// Parses named schema sources into file descriptors.
pub trait SchemaParser: Send + Sync {
    /// Parse `sources` (file name, text) and return one descriptor per
    /// source, in the same order.
    fn parse(&self, sources: &[(String, String)]) -> Result<Vec<FileDescriptor>, ProtoError>;
}

/// Parser backed by `protox`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoxParser;

impl ProtoxParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }
}

impl SchemaParser for ProtoxParser {
    fn parse(&self, sources: &[(String, String)]) -> Result<Vec<FileDescriptor>, ProtoError> {
        let mut files = HashMap::new();
        for (name, text) in sources {
            files.entry(name.clone()).or_insert_with(|| text.clone());
        }

        let mut compiler = Compiler::with_file_resolver(SourceResolver {
            files,
            google: GoogleFileResolver::new(),
        });
        compiler
            .open_files(sources.iter().map(|(name, _)| name.as_str()))
            .map_err(|e| ProtoError::Descriptor(e.to_string()))?;

        let pool = compiler.descriptor_pool();
        sources
            .iter()
            .map(|(name, _)| {
                pool.get_file_by_name(name).ok_or_else(|| {
                    ProtoError::Descriptor(format!("'{}' missing from parsed descriptors", name))
                })
            })
            .collect()
    }
}

/// Resolves file names against in-memory sources.
struct SourceResolver {
    files: HashMap<String, String>,
    google: GoogleFileResolver,
}

impl FileResolver for SourceResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        let name = path.to_str()?;
        self.files.contains_key(name).then(|| name.to_string())
    }

    fn open_file(&self, name: &str) -> Result<File, protox::Error> {
        match self.files.get(name) {
            Some(text) => File::from_source(name, text),
            None => self.google.open_file(name),
        }
    }
}
