//! Declaration walker that turns a Go syntax tree into a [`SourceRecord`].
//!
//! Only top-level declarations are visited:
//!
//! ```text
//! source_file
//!   ├── package_clause        → package
//!   ├── import_declaration    → imports (via the import query)
//!   ├── function_declaration  → functions
//!   ├── method_declaration    → functions
//!   ├── var_declaration       → variables
//!   └── const_declaration     → variables
//! ```
//!
//! Type declarations, struct fields and function bodies are not summarized.

use dw_core::{FunctionRecord, SourceRecord, VariableRecord};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, Tree};

use crate::docs::{leading_docs, trailing_docs};
use crate::error::ParseError;
use crate::queries::{CAPTURE_IMPORT_PATH, get_import_query};
use crate::types::{TypeExpr, expand_parameters, result_types};

/// Builds a [`SourceRecord`] from a parsed tree.
///
/// The tree must have been produced from `source`. Declarations appear in the
/// record in source order.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the import query fails to compile.
pub fn extract_record(tree: &Tree, source: &[u8]) -> Result<SourceRecord, ParseError> {
    let root = tree.root_node();
    let mut record = SourceRecord {
        imports: extract_imports(root, source)?,
        ..SourceRecord::default()
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "package_clause" => {
                if let Some(name) = node.named_child(0) {
                    record.package = node_text(name, source);
                }
            }
            "function_declaration" | "method_declaration" => {
                if let Some(function) = extract_function(node, source) {
                    record.functions.push(function);
                }
            }
            "var_declaration" => extract_values(node, "var_spec", source, &mut record.variables),
            "const_declaration" => {
                extract_values(node, "const_spec", source, &mut record.variables);
            }
            _ => {}
        }
    }

    Ok(record)
}

fn extract_imports(root: Node<'_>, source: &[u8]) -> Result<Vec<String>, ParseError> {
    let query = get_import_query()?;
    let mut cursor = QueryCursor::new();
    let mut imports = Vec::new();

    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == CAPTURE_IMPORT_PATH {
                let raw = node_text(capture.node, source);
                imports.push(unquote(&raw).to_owned());
            }
        }
    }

    Ok(imports)
}

fn extract_function(node: Node<'_>, source: &[u8]) -> Option<FunctionRecord> {
    let name = node.child_by_field_name("name")?;
    let mut function =
        FunctionRecord::new(node_text(name, source)).with_docs(leading_docs(node, source));

    if let Some(params) = node.child_by_field_name("parameters") {
        for param in expand_parameters(params, source) {
            function.push_param(param.name, param.ty.render());
        }
    }

    if let Some(result) = node.child_by_field_name("result") {
        function.return_types = result_types(result, source)
            .iter()
            .map(TypeExpr::render)
            .collect();
    }

    Some(function)
}

/// Appends one [`VariableRecord`] per spec in a `var` or `const` declaration.
fn extract_values(decl: Node<'_>, spec_kind: &str, source: &[u8], out: &mut Vec<VariableRecord>) {
    let specs = collect_specs(decl, spec_kind);
    let single = specs.len() == 1 && decl.named_child(0).is_some_and(|n| n.kind() == spec_kind);

    for spec in specs {
        let Some(name) = spec.child_by_field_name("name") else {
            continue;
        };
        let ty = spec
            .child_by_field_name("type")
            .map(|node| TypeExpr::from_node(node, source).render())
            .unwrap_or_default();

        let mut docs = leading_docs(spec, source);
        if docs.is_empty() && single {
            docs = leading_docs(decl, source);
        }
        if docs.is_empty() {
            docs = trailing_docs(spec, source)
                .or_else(|| trailing_docs(decl, source))
                .unwrap_or_default();
        }

        out.push(VariableRecord::new(node_text(name, source), ty, docs));
    }
}

/// Specs may sit directly under the declaration or inside a `*_spec_list`.
fn collect_specs<'tree>(decl: Node<'tree>, spec_kind: &str) -> Vec<Node<'tree>> {
    let list_kind = format!("{spec_kind}_list");
    let mut specs = Vec::new();
    let mut cursor = decl.walk();

    for child in decl.named_children(&mut cursor) {
        if child.kind() == spec_kind {
            specs.push(child);
        } else if child.kind() == list_kind {
            let mut inner = child.walk();
            specs.extend(
                child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == spec_kind),
            );
        }
    }

    specs
}

fn unquote(raw: &str) -> &str {
    raw.trim_matches(|c| c == '"' || c == '`')
}

fn node_text(node: Node<'_>, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoParser;

    fn extract(source: &str) -> SourceRecord {
        let mut parser = GoParser::new().expect("Go grammar should load");
        parser.parse(source).expect("valid Go source").record
    }

    #[test]
    fn test_package_and_imports() {
        let record = extract(
            r#"package server

import "fmt"

import (
	"net/http"
	str "strings"
	_ "embed"
	`raw/path`
)
"#,
        );
        assert_eq!(record.package, "server");
        assert_eq!(
            record.imports,
            ["fmt", "net/http", "strings", "embed", "raw/path"]
        );
    }

    #[test]
    fn test_function_with_grouped_params() {
        let record = extract(
            "package mathx\n\n// Add adds two ints\nfunc Add(x, y int) int { return x + y }\n",
        );
        let add = record.function("Add").expect("Add");
        assert_eq!(add.docs, "Add adds two ints");
        assert_eq!(add.params.as_slice(), ["x", "y"]);
        assert_eq!(add.param_types.as_slice(), ["int", "int"]);
        assert_eq!(add.return_types.as_slice(), ["int"]);
    }

    #[test]
    fn test_method_and_named_results() {
        let record = extract(
            "package p\n\n// Read fills buf.\n// It never blocks.\nfunc (r *Reader) Read(buf []byte) (n int, err error) { return }\n",
        );
        let read = record.function("Read").expect("Read");
        assert_eq!(read.docs, "Read fills buf. It never blocks.");
        assert_eq!(read.params.as_slice(), ["buf"]);
        assert_eq!(read.param_types.as_slice(), ["[]byte"]);
        assert_eq!(read.return_types.as_slice(), ["int", "error"]);
    }

    #[test]
    fn test_unnamed_and_variadic_params() {
        let record = extract("package p\nfunc Log(string, ...interface{}) {}\n");
        let log = record.function("Log").expect("Log");
        assert_eq!(log.params.as_slice(), ["", ""]);
        assert_eq!(log.param_types.as_slice(), ["string", "...interface{}"]);
        assert!(log.return_types.is_empty());
    }

    #[test]
    fn test_docs_separated_by_blank_line_are_dropped() {
        let record = extract("package p\n\n// stray\n\nfunc F() {}\n");
        assert_eq!(record.function("F").map(|f| f.docs.as_str()), Some(""));
    }

    #[test]
    fn test_directives_are_not_docs() {
        let record = extract("package p\n\n// Gen builds things.\n//go:noinline\nfunc Gen() {}\n");
        assert_eq!(
            record.function("Gen").map(|f| f.docs.as_str()),
            Some("Gen builds things.")
        );
    }

    #[test]
    fn test_trailing_comment_of_previous_decl_is_not_doc() {
        let record = extract("package p\n\nvar a = 1 // about a\nfunc F() {}\n");
        assert_eq!(record.function("F").map(|f| f.docs.as_str()), Some(""));
        assert_eq!(
            record.variable("a").map(|v| v.docs.as_str()),
            Some("about a")
        );
    }

    #[test]
    fn test_variables_and_constants() {
        let record = extract(
            r"package p

// Limit caps the total.
var Limit int = 10

var (
	// name is the service name.
	name string
	count = 3 // how many
)

const Pi = 3.14
",
        );

        let names: Vec<_> = record.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Limit", "name", "count", "Pi"]);

        let limit = record.variable("Limit").expect("Limit");
        assert_eq!(limit.ty, "int");
        assert_eq!(limit.docs, "Limit caps the total.");

        let name = record.variable("name").expect("name");
        assert_eq!(name.ty, "string");
        assert_eq!(name.docs, "name is the service name.");

        let count = record.variable("count").expect("count");
        assert_eq!(count.ty, "");
        assert_eq!(count.docs, "how many");

        assert_eq!(record.variable("Pi").map(|v| v.ty.as_str()), Some(""));
    }

    #[test]
    fn test_multi_name_spec_uses_first_name() {
        let record = extract("package p\nvar x, y float64\n");
        assert_eq!(record.variables.len(), 1);
        assert_eq!(record.variables[0].name, "x");
        assert_eq!(record.variables[0].ty, "float64");
    }

    #[test]
    fn test_record_snapshot() {
        let record = extract(
            r#"package mathx

import "fmt"

// Add adds two ints
func Add(x, y int) int { return x + y }

// Scale multiplies every value in place.
func Scale(vals []float64, by float64) {}

// Debug is toggled by tests.
var Debug bool

func show(m map[string]*fmt.Stringer) (string, error) { return "", nil }
"#,
        );
        insta::assert_json_snapshot!(record, @r#"
        {
          "package": "mathx",
          "imports": [
            "fmt"
          ],
          "functions": [
            {
              "name": "Add",
              "docs": "Add adds two ints",
              "params": [
                "x",
                "y"
              ],
              "param_types": [
                "int",
                "int"
              ],
              "return_types": [
                "int"
              ]
            },
            {
              "name": "Scale",
              "docs": "Scale multiplies every value in place.",
              "params": [
                "vals",
                "by"
              ],
              "param_types": [
                "[]float64",
                "float64"
              ],
              "return_types": []
            },
            {
              "name": "show",
              "docs": "",
              "params": [
                "m"
              ],
              "param_types": [
                "map[string]*fmt.Stringer"
              ],
              "return_types": [
                "string",
                "error"
              ]
            }
          ],
          "variables": [
            {
              "name": "Debug",
              "type": "bool",
              "docs": "Debug is toggled by tests."
            }
          ]
        }
        "#);
    }
}
