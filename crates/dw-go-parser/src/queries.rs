//! Pre-compiled tree-sitter queries for Go import extraction.
//!
//! This module provides the [`IMPORT_QUERY`] constant and
//! [`get_import_query`] for lazily compiling and caching it.

use std::sync::OnceLock;

use tree_sitter::{Language, Query};

use crate::error::ParseError;

/// Tree-sitter query for extracting Go import paths.
///
/// Matches both single imports (`import "fmt"`) and grouped imports
/// (`import ( "fmt"; m "math" )`), with interpreted or raw string paths.
///
/// # Capture Names
///
/// - `import.path` - The import path string literal, including its quotes
pub const IMPORT_QUERY: &str = r"
; import spec with optional alias, dot or blank name
(import_spec
  path: (_) @import.path)
";

/// Capture index for `import.path`.
pub const CAPTURE_IMPORT_PATH: u32 = 0;

/// Global cache for the compiled import query.
static COMPILED_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();

/// Returns the compiled import query.
///
/// The query is compiled once and cached for all subsequent calls.
/// This function is thread-safe.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the query fails to compile.
pub fn get_import_query() -> Result<&'static Query, ParseError> {
    if let Some(query) = COMPILED_IMPORT_QUERY.get() {
        return Ok(query);
    }

    let language: Language = tree_sitter_go::LANGUAGE.into();
    let query = compile_query(&language, IMPORT_QUERY)?;

    Ok(COMPILED_IMPORT_QUERY.get_or_init(|| query))
}

/// Compiles a query for the given language.
fn compile_query(language: &Language, source: &str) -> Result<Query, ParseError> {
    Query::new(language, source).map_err(|e| ParseError::QueryCompile {
        offset: e.offset,
        message: e.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_compiles() {
        let result = get_import_query();
        assert!(result.is_ok(), "Query should compile: {result:?}");
    }

    #[test]
    fn test_capture_index_matches_constant() {
        let query = get_import_query().expect("Query should compile");
        assert_eq!(
            query.capture_index_for_name("import.path"),
            Some(CAPTURE_IMPORT_PATH)
        );
    }

    #[test]
    fn test_invalid_query_reports_offset() {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let err = compile_query(&language, "(no_such_node) @x").unwrap_err();
        assert!(matches!(err, ParseError::QueryCompile { .. }));
    }
}
