//! Go parser management using tree-sitter.
//!
//! This module provides the [`GoParser`] struct for turning Go source text
//! into a [`SourceRecord`].

use dw_core::SourceRecord;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::ParseError;
use crate::extract::extract_record;

/// Result of parsing a Go file.
///
/// Holds the extracted record together with the syntax tree it came from.
#[derive(Debug)]
pub struct ParseResult {
    /// Documentation record for the file.
    pub record: SourceRecord,

    /// The syntax tree from parsing.
    pub tree: Tree,
}

/// Go parser for extracting documentation records from source files.
///
/// Wraps a tree-sitter parser configured for Go. The parser can be reused for
/// multiple files to avoid repeated initialization.
///
/// # Thread Safety
///
/// `GoParser` is `Send` but not `Sync`. Concurrent extractors keep one parser
/// per thread (see `thread_local!`); the compiled import query is shared.
///
/// # Examples
///
/// ```
/// use dw_go_parser::GoParser;
///
/// let mut parser = GoParser::new()?;
/// let source = "package mathx\n\n// Add adds two ints\nfunc Add(x, y int) int { return x + y }\n";
/// let result = parser.parse(source)?;
///
/// let add = result.record.function("Add").unwrap();
/// assert_eq!(add.docs, "Add adds two ints");
/// assert_eq!(add.param_types.as_slice(), ["int", "int"]);
/// # Ok::<(), dw_go_parser::ParseError>(())
/// ```
pub struct GoParser {
    parser: Parser,
    language: Language,
}

impl GoParser {
    /// Creates a new Go parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the Go grammar cannot be set
    /// on the parser.
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_go::LANGUAGE.into();

        parser
            .set_language(&language)
            .map_err(|_| ParseError::LanguageInit)?;

        Ok(Self { parser, language })
    }

    /// Parses Go source code and extracts its documentation record.
    ///
    /// The whole file is rejected when it contains any syntax error; a
    /// partially valid file never produces a partial record.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Parse`] if tree-sitter produces no tree
    /// - [`ParseError::Syntax`] with the position of the first error node
    /// - [`ParseError::QueryCompile`] if the import query fails to compile
    ///
    /// # Examples
    ///
    /// ```
    /// use dw_go_parser::{GoParser, ParseError};
    ///
    /// let mut parser = GoParser::new()?;
    /// let err = parser.parse("package p\nfunc Broken( {\n").unwrap_err();
    /// assert!(matches!(err, ParseError::Syntax { .. }));
    /// # Ok::<(), ParseError>(())
    /// ```
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, ParseError> {
        let tree = self.parse_tree(source)?;
        let record = extract_record(&tree, source.as_bytes())?;
        Ok(ParseResult { record, tree })
    }

    /// Parses source into a syntax tree, rejecting trees with errors.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Parse`] or [`ParseError::Syntax`].
    pub fn parse_tree(&mut self, source: &str) -> Result<Tree, ParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(ParseError::Parse)?;

        let root = tree.root_node();
        if root.has_error() {
            let node = first_error(root).unwrap_or(root);
            let pos = node.start_position();
            return Err(ParseError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }

        Ok(tree)
    }

    /// Returns the tree-sitter language used by this parser.
    #[inline]
    pub fn language(&self) -> &Language {
        &self.language
    }
}

impl std::fmt::Debug for GoParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoParser")
            .field("language", &"Go")
            .finish_non_exhaustive()
    }
}

/// Depth-first search for the first `ERROR` or missing node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADD: &str = "package mathx\n\n// Add adds two ints\nfunc Add(x, y int) int { return x + y }\n";

    #[test]
    fn test_parser_new() {
        assert!(GoParser::new().is_ok());
    }

    #[test]
    fn test_parse_add() {
        let mut parser = GoParser::new().expect("Parser creation failed");
        let result = parser.parse(ADD).expect("Parse failed");

        assert_eq!(result.record.package, "mathx");
        assert!(result.record.imports.is_empty());
        assert_eq!(result.record.functions.len(), 1);
        assert!(result.record.variables.is_empty());
        assert_eq!(result.tree.root_node().kind(), "source_file");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let mut parser = GoParser::new().expect("Parser creation failed");
        let first = parser.parse(ADD).expect("Parse failed").record;
        let second = parser.parse(ADD).expect("Parse failed").record;
        assert_eq!(first, second);
    }

    #[test]
    fn test_syntax_error_rejects_whole_file() {
        let mut parser = GoParser::new().expect("Parser creation failed");
        let source = "package p\n\nfunc Good() {}\n\nfunc Bad(x int {\n";
        let err = parser.parse(source).unwrap_err();
        match err {
            ParseError::Syntax { line, column } => {
                assert!(line >= 3, "error reported on line {line}");
                assert!(column >= 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_source() {
        let mut parser = GoParser::new().expect("Parser creation failed");
        let result = parser.parse("").expect("Parse failed");
        assert_eq!(result.record, SourceRecord::default());
    }

    #[test]
    fn test_parser_reuse_after_error() {
        let mut parser = GoParser::new().expect("Parser creation failed");
        assert!(parser.parse("package p\nfunc (").is_err());
        assert!(parser.parse(ADD).is_ok());
    }
}
