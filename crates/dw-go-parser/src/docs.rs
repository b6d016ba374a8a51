//! Doc comment collection and cleanup.
//!
//! A declaration's doc comment is the run of comment nodes immediately above
//! it with no blank line in between. Compiler directives (`//go:generate`,
//! `//line`, `//export`, ...) are dropped, comment markers are stripped and
//! the remaining text is collapsed to a single line by [`sanitize_docs`].

use tree_sitter::Node;

/// Collapses comment text into a single line.
///
/// Each line is trimmed, empty lines are removed and the rest are joined with
/// a single space.
///
/// # Examples
///
/// ```
/// use dw_go_parser::sanitize_docs;
///
/// assert_eq!(sanitize_docs("Add adds\n\n  two ints.\n"), "Add adds two ints.");
/// assert_eq!(sanitize_docs("   "), "");
/// ```
#[must_use]
pub fn sanitize_docs(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the sanitized doc comment directly above `node`.
///
/// Walks previous named siblings while they are comments on adjacent rows.
/// A comment that trails code on its own row belongs to that code and ends
/// the walk.
pub(crate) fn leading_docs(node: Node<'_>, source: &[u8]) -> String {
    let mut comments = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(comment) = current {
        if comment.kind() != "comment" || next_row - comment.end_position().row > 1 {
            break;
        }
        if is_trailing(comment) {
            break;
        }
        comments.push(comment);
        next_row = comment.start_position().row;
        current = comment.prev_named_sibling();
    }

    comments.reverse();
    let text: Vec<String> = comments
        .into_iter()
        .filter_map(|comment| comment_text(comment, source))
        .collect();
    sanitize_docs(&text.join("\n"))
}

/// Returns the sanitized comment sharing the last row of `node`, if any.
pub(crate) fn trailing_docs(node: Node<'_>, source: &[u8]) -> Option<String> {
    let next = node.next_named_sibling()?;
    if next.kind() != "comment" || next.start_position().row != node.end_position().row {
        return None;
    }
    comment_text(next, source)
        .map(|text| sanitize_docs(&text))
        .filter(|text| !text.is_empty())
}

/// A comment is trailing when the preceding non-comment sibling ends on the
/// row the comment starts on.
fn is_trailing(comment: Node<'_>) -> bool {
    let row = comment.start_position().row;
    let mut prev = comment.prev_named_sibling();
    while let Some(node) = prev {
        if node.kind() != "comment" {
            return node.end_position().row == row;
        }
        prev = node.prev_named_sibling();
    }
    false
}

/// Strips comment markers. Returns `None` for directives.
fn comment_text(comment: Node<'_>, source: &[u8]) -> Option<String> {
    let raw = comment.utf8_text(source).ok()?;

    if let Some(line) = raw.strip_prefix("//") {
        if is_directive(line) {
            return None;
        }
        return Some(line.strip_prefix(' ').unwrap_or(line).to_owned());
    }

    let body = raw
        .strip_prefix("/*")
        .and_then(|rest| rest.strip_suffix("*/"))
        .unwrap_or(raw);
    Some(body.strip_prefix(' ').unwrap_or(body).to_owned())
}

/// Matches `//go:generate`-style directives and the legacy cgo/line forms.
fn is_directive(line: &str) -> bool {
    if ["line ", "extern ", "export "]
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        return true;
    }

    let Some((tool, rest)) = line.split_once(':') else {
        return false;
    };
    !tool.is_empty()
        && tool
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        && rest
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
