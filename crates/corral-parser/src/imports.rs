//! Extract imported module names from Python source.

use std::collections::BTreeSet;
use std::path::Path;

/// Scan a Python file for the modules it imports.
///
/// Returns the deduplicated set of pre-dot head names. A file that
/// cannot be read or parsed yields an empty set; scanning never fails
/// the caller.
pub fn scan_file(path: &Path) -> BTreeSet<String> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            tracing::warn!("failed to read {}: {err}", path.display());
            return BTreeSet::new();
        }
    };
    scan_source(&String::from_utf8_lossy(&bytes))
}

/// Scan Python source text for the modules it imports.
///
/// Imports are collected from every scope, not just module level: an
/// `import` deferred into a function body is still a runtime dependency
/// of the file. Relative imports (`from .x import y`, `from . import y`)
/// name modules inside the importing package and are skipped. Only the
/// pre-dot head of a dotted path is recorded; aliases are ignored.
pub fn scan_source(source: &str) -> BTreeSet<String> {
    let lang: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(&lang).is_err() {
        return BTreeSet::new();
    }
    let Some(tree) = parser.parse(source.as_bytes(), None) else {
        tracing::warn!("failed to parse Python source, treating as no imports");
        return BTreeSet::new();
    };

    let mut names = BTreeSet::new();
    collect_imports(&tree.root_node(), source, &mut names);
    names
}

/// Recursively collect import names from the AST.
fn collect_imports(node: &tree_sitter::Node, source: &str, names: &mut BTreeSet<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" => {
                // import a.b, c as d: every listed name counts
                let mut inner = child.walk();
                for item in child.children(&mut inner) {
                    match item.kind() {
                        "dotted_name" => add_head(&source[item.byte_range()], names),
                        "aliased_import" => {
                            if let Some(name_node) = item.child_by_field_name("name") {
                                add_head(&source[name_node.byte_range()], names);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                // Only the module side matters; a relative module
                // (`relative_import` node) stays inside its own package
                if let Some(module) = child.child_by_field_name("module_name")
                    && module.kind() == "dotted_name"
                {
                    add_head(&source[module.byte_range()], names);
                }
            }
            _ => collect_imports(&child, source, names),
        }
    }
}

fn add_head(dotted: &str, names: &mut BTreeSet<String>) {
    let head = dotted.split('.').next().unwrap_or("").trim();
    if !head.is_empty() {
        names.insert(head.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_collects_all_import_forms() {
        let source = "\
import foo1
from foo2 import bar
from foo3 import bar as che
import foo4 as boo
import foo5.zoo
from foo6 import *
from . import foo7, foo8
from .foo12 import foo13
from foo9 import foo10, foo11

def do():
    import bar1
    from bar2 import foo
    from bar3 import che as baz
";
        let names = scan_source(source);
        assert_eq!(names.len(), 10);
        for x in 1..7 {
            assert!(names.contains(&format!("foo{x}")), "missing foo{x}");
        }
        assert!(names.contains("foo9"));
        for x in 1..4 {
            assert!(names.contains(&format!("bar{x}")), "missing bar{x}");
        }
    }

    #[test]
    fn test_relative_imports_skipped() {
        let source = "from .foo12 import foo13\nfrom foo14 import foo15\n";
        let names = scan_source(source);
        assert_eq!(names.len(), 1);
        assert!(names.contains("foo14"));
    }

    #[test]
    fn test_comma_import_records_each_name() {
        let names = scan_source("import os, sys\n");
        assert!(names.contains("os"));
        assert!(names.contains("sys"));
    }

    #[test]
    fn test_duplicate_imports_deduplicated() {
        let names = scan_source("import json\nfrom json import loads\nimport json\n");
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_garbage_source_yields_empty() {
        let names = scan_source("}{ this is not (python");
        assert!(names.is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let names = scan_file(Path::new("/nonexistent/handler.py"));
        assert!(names.is_empty());
    }

    #[test]
    fn test_scan_file_reads_source() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mod.py");
        std::fs::write(&path, "import boto3\nimport os\n").unwrap();
        let names = scan_file(&path);
        assert!(names.contains("boto3"));
        assert!(names.contains("os"));
    }
}
