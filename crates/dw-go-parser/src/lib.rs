//! Go source summarizer using tree-sitter.
//!
//! This crate turns the text of one Go file into a
//! [`SourceRecord`](dw_core::SourceRecord):
//!
//! - the declared package
//! - import paths, unquoted
//! - functions and methods with docs, parameters and result types
//! - top-level `var` and `const` specs with their types and docs
//!
//! # Overview
//!
//! The main entry point is [`GoParser`]:
//!
//! ```
//! use dw_go_parser::GoParser;
//!
//! let mut parser = GoParser::new()?;
//! let source = r#"
//! package server
//!
//! import "net/http"
//!
//! // Handle serves one request.
//! func Handle(w http.ResponseWriter, r *http.Request) {}
//! "#;
//!
//! let record = parser.parse(source)?.record;
//! assert_eq!(record.imports, ["net/http"]);
//!
//! let handle = record.function("Handle").unwrap();
//! assert_eq!(handle.param_types.as_slice(), ["http.ResponseWriter", "*http.Request"]);
//! # Ok::<(), dw_go_parser::ParseError>(())
//! ```
//!
//! # Syntax Errors
//!
//! A file with any syntax error is rejected as a whole with
//! [`ParseError::Syntax`]. Callers treat that as "not ready yet" and retry,
//! since editors frequently save files mid-edit.
//!
//! # Type Rendering
//!
//! Types are rendered through the closed [`TypeExpr`] enum. Shapes outside
//! its set render as [`UNKNOWN_TYPE`] rather than failing.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod docs;
mod error;
mod extract;
mod parser;
mod queries;
mod types;

pub use docs::sanitize_docs;
pub use error::ParseError;
pub use extract::extract_record;
pub use parser::{GoParser, ParseResult};
pub use queries::{CAPTURE_IMPORT_PATH, IMPORT_QUERY, get_import_query};
pub use types::{Param, TypeExpr, UNKNOWN_TYPE, expand_parameters, parameter_types, result_types};
