//! Go test declaration extraction using tree-sitter-go.
//!
//! Only top-level function declarations are inspected; methods never count as
//! tests. A declaration is recorded when its name prefix and parameter shape
//! match what `go test` would run:
//!
//! | Kind      | Prefix      | Parameters                    |
//! |-----------|-------------|-------------------------------|
//! | Test      | `Test`      | exactly one, `*<pkg>.T`       |
//! | Example   | `Example`   | none                          |
//! | Benchmark | `Benchmark` | exactly one, `*<pkg>.B`       |
//!
//! Anything else with a matching prefix (`func Testfake()`) is skipped
//! silently.

use std::io::{self, BufRead};

use tree_sitter::Node;

use crate::error::{ModelError, Result};
use crate::ingest::pool::with_go_parser;
use crate::ingest::{Benchmark, Example, SourceUnit, Test};

/// Parse Go source text into the declarations it contains.
///
/// The returned unit has empty `name` and `path`.
///
/// # Errors
/// [`ModelError::Parse`] when the text is not syntactically valid Go or has
/// no package clause. Callers attach the file path with
/// [`ModelError::with_path`].
pub fn parse_source_unit(source: &[u8]) -> Result<SourceUnit> {
    let tree = with_go_parser(|parser| parser.parse(source, None))?
        .ok_or_else(|| ModelError::parse("", "parser returned no syntax tree"))?;
    let root = tree.root_node();

    if root.has_error() {
        return Err(ModelError::parse("", describe_syntax_error(&root)));
    }

    let mut unit = SourceUnit::default();
    let mut has_package = false;
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => has_package = true,
            "function_declaration" => classify_function(&child, source, &mut unit),
            _ => {}
        }
    }

    if !has_package {
        return Err(ModelError::parse("", "expected 'package' clause"));
    }
    Ok(unit)
}

fn classify_function(func: &Node, source: &[u8], unit: &mut SourceUnit) {
    let name = match func
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
    {
        Some(name) => name,
        None => return,
    };

    let params = parameter_declarations(func);

    if name.starts_with("Test") && takes_single_pointer_to(&params, source, "T") {
        unit.tests.push(Test {
            name: name.to_string(),
        });
    } else if name.starts_with("Example") && params.is_empty() {
        unit.examples.push(Example {
            name: name.to_string(),
        });
    } else if name.starts_with("Benchmark") && takes_single_pointer_to(&params, source, "B") {
        unit.benchmarks.push(Benchmark {
            name: name.to_string(),
        });
    }
}

/// Parameter declarations of a function, skipping comments.
///
/// `a, b *testing.T` is one declaration with two names.
fn parameter_declarations<'tree>(func: &Node<'tree>) -> Vec<Node<'tree>> {
    let params = match func.child_by_field_name("parameters") {
        Some(params) => params,
        None => return Vec::new(),
    };
    let mut cursor = params.walk();
    let decls: Vec<Node<'tree>> = params
        .named_children(&mut cursor)
        .filter(|n| {
            matches!(
                n.kind(),
                "parameter_declaration" | "variadic_parameter_declaration"
            )
        })
        .collect();
    decls
}

/// `(x *pkg.<type_name>)`
fn takes_single_pointer_to(params: &[Node], source: &[u8], type_name: &str) -> bool {
    let [param] = params else {
        return false;
    };
    if param.kind() != "parameter_declaration" {
        return false;
    }

    let pointer = match param.child_by_field_name("type") {
        Some(ty) if ty.kind() == "pointer_type" => ty,
        _ => return false,
    };
    let target = match pointer.named_child(0) {
        Some(target) if target.kind() == "qualified_type" => target,
        _ => return false,
    };

    target
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
        .is_some_and(|name| name == type_name)
}

fn first_error_node<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
    children
        .iter()
        .filter(|child| child.has_error())
        .find_map(first_error_node)
}

fn describe_syntax_error(root: &Node) -> String {
    match first_error_node(root) {
        Some(node) => {
            let pos = node.start_position();
            if node.is_missing() {
                format!(
                    "missing '{}' at line {} column {}",
                    node.kind(),
                    pos.row + 1,
                    pos.column + 1
                )
            } else {
                format!("syntax error at line {} column {}", pos.row + 1, pos.column + 1)
            }
        }
        None => "syntax error".to_string(),
    }
}

/// Scan for the first `package <name>` line and return the package name.
///
/// An external test package's `_test` suffix is stripped, so `package foo_test`
/// yields `foo`. Trailing comments after the name are ignored. Returns an
/// empty string when no package line exists.
pub fn detect_package_name(reader: impl BufRead) -> io::Result<String> {
    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("package ") {
            if let Some(name) = rest.split_whitespace().next() {
                return Ok(name.strip_suffix("_test").unwrap_or(name).to_string());
            }
        }
    }
    Ok(String::new())
}
