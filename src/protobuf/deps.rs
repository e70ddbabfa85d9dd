//! protobuf::deps
//!
//! Transitive import collection.

use prost_reflect::FileDescriptor;

/// Collect every file transitively imported by `file`.
///
/// Pre-order: each direct import is followed by its own imports before the
/// next direct import. Files reachable along several import paths appear
/// once per path; registration relies on the registry being
/// content-idempotent for those repeats. Import graphs are acyclic.
pub fn collect_dependencies(file: &FileDescriptor) -> Vec<FileDescriptor> {
    let mut deps = Vec::new();
    for dep in file.dependencies() {
        let nested = collect_dependencies(&dep);
        deps.push(dep);
        deps.extend(nested);
    }
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protobuf::fixtures;

    fn names(files: &[FileDescriptor]) -> Vec<&str> {
        files.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn no_imports() {
        let file = fixtures::file("nested.proto", fixtures::NESTED);
        assert!(collect_dependencies(&file).is_empty());
    }

    #[test]
    fn pre_order_walk() {
        let files = fixtures::compile(&[
            (
                "root.proto",
                "syntax = \"proto3\";\nimport \"d1.proto\";\nimport \"d2.proto\";\nmessage Root { D1 a = 1; D2 b = 2; }\n",
            ),
            (
                "d1.proto",
                "syntax = \"proto3\";\nimport \"d3.proto\";\nmessage D1 { D3 c = 1; }\n",
            ),
            ("d2.proto", "syntax = \"proto3\";\nmessage D2 {}\n"),
            ("d3.proto", "syntax = \"proto3\";\nmessage D3 {}\n"),
        ]);

        let deps = collect_dependencies(&files[0]);
        assert_eq!(names(&deps), vec!["d1.proto", "d3.proto", "d2.proto"]);
    }

    #[test]
    fn diamond_repeats_shared_file() {
        let files = fixtures::compile(&[
            (
                "root.proto",
                "syntax = \"proto3\";\nimport \"left.proto\";\nimport \"right.proto\";\nmessage Root { Left l = 1; Right r = 2; }\n",
            ),
            (
                "left.proto",
                "syntax = \"proto3\";\nimport \"base.proto\";\nmessage Left { Base b = 1; }\n",
            ),
            (
                "right.proto",
                "syntax = \"proto3\";\nimport \"base.proto\";\nmessage Right { Base b = 1; }\n",
            ),
            ("base.proto", "syntax = \"proto3\";\nmessage Base {}\n"),
        ]);

        let deps = collect_dependencies(&files[0]);
        assert_eq!(
            names(&deps),
            vec!["left.proto", "base.proto", "right.proto", "base.proto"]
        );
    }
}
