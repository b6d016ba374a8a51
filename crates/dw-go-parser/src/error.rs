//! Error types for the dw-go-parser crate.
//!
//! This module provides the [`ParseError`] type for errors that can occur
//! while turning Go source text into a syntax tree.

/// Errors that can occur during Go parsing.
///
/// # Examples
///
/// ```
/// use dw_go_parser::ParseError;
///
/// fn handle_error(err: ParseError) {
///     match err {
///         ParseError::LanguageInit => eprintln!("Failed to set Go language"),
///         ParseError::QueryCompile { offset, .. } => {
///             eprintln!("Query compilation failed at offset {offset}");
///         }
///         ParseError::Parse => eprintln!("Failed to parse source code"),
///         ParseError::Syntax { line, column } => {
///             eprintln!("Syntax error at {line}:{column}");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Failed to set the Go language on the parser.
    ///
    /// Happens when the grammar was built for an incompatible tree-sitter ABI.
    #[error("failed to set Go language")]
    LanguageInit,

    /// Failed to compile a tree-sitter query.
    #[error("failed to compile query at offset {offset}: {message}")]
    QueryCompile {
        /// The byte offset in the query string where the error occurred.
        offset: usize,
        /// Description of the query error.
        message: String,
    },

    /// The parser produced no tree (cancelled or out of memory).
    #[error("failed to parse source code")]
    Parse,

    /// The source contains a syntax error.
    ///
    /// Files with syntax errors are skipped rather than partially indexed.
    /// Both positions are 1-based.
    #[error("syntax error at line {line}, column {column}")]
    Syntax {
        /// Line of the first error node.
        line: usize,
        /// Column of the first error node.
        column: usize,
    },
}
