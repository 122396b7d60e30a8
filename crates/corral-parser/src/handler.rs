//! Discover the Lambda entry point in a handler file.

/// A Lambda entry point: the first top-level function taking exactly
/// `(event, context)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub name: String,
    /// Docstring of the function, used as the deployed description.
    pub description: Option<String>,
    /// 1-based line of the definition.
    pub line: usize,
}

/// Find the Lambda entry point in Python source.
///
/// Only module-level definitions are considered; decorated definitions
/// count. Returns `None` when no function matches the signature.
pub fn find_handler(source: &str) -> Option<Handler> {
    let lang: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&lang).ok()?;
    let tree = parser.parse(source.as_bytes(), None)?;
    let root = tree.root_node();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let func = match child.kind() {
            "function_definition" => Some(child),
            "decorated_definition" => child
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(func) = func
            && parameter_names(&func, source) == ["event", "context"]
            && let Some(name_node) = func.child_by_field_name("name")
        {
            return Some(Handler {
                name: source[name_node.byte_range()].to_string(),
                description: docstring(&func, source),
                line: func.start_position().row + 1,
            });
        }
    }
    None
}

fn parameter_names(func: &tree_sitter::Node, source: &str) -> Vec<String> {
    let mut params = Vec::new();
    if let Some(list) = func.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            if child.kind() == "identifier" {
                params.push(source[child.byte_range()].to_string());
            }
        }
    }
    params
}

/// Extract the docstring: a string expression as the first statement of
/// the function body.
fn docstring(func: &tree_sitter::Node, source: &str) -> Option<String> {
    let body = func.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let mut cursor = expr.walk();
    for child in expr.children(&mut cursor) {
        if child.kind() == "string_content" {
            let text = source[child.byte_range()].trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}
