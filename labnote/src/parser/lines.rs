use std::ops::Range;

use crate::directive::Directive;
use crate::line::{Category, Line, LineKind, classify};
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk the source line by line, classify each line, and parse directives
/// and divider labels. All malformed lines are collected before failing so
/// one pass reports every problem.
pub fn parse_lines(source: &str, file_id: usize) -> Result<Vec<Line>, Vec<ParseError>> {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    let mut offset = 0;

    for raw in source.split_inclusive('\n') {
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        let span = offset..offset + content.len();
        offset += raw.len();

        let trimmed = content.trim();
        let kind = match classify(content) {
            Category::Blank => LineKind::Blank,
            Category::Comment => LineKind::Comment,
            Category::Divider => LineKind::Divider {
                label: after_first_token(trimmed).to_string(),
            },
            Category::Directive => match parse_directive(trimmed, span.clone(), file_id) {
                Ok(directive) => LineKind::Directive(directive),
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            },
            Category::Text => LineKind::Text(trimmed.to_string()),
        };

        lines.push(Line { kind, span });
    }

    if errors.is_empty() {
        Ok(lines)
    } else {
        Err(errors)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a directive line: the second whitespace token is the tag name
/// (case-folded), and everything after it is the argument string.
fn parse_directive(
    line: &str,
    span: Range<usize>,
    file_id: usize,
) -> Result<Directive, ParseError> {
    let (_marker, rest) = split_token(line);
    let (name, rest) = split_token(rest.trim_start());

    if name.is_empty() {
        return Err(
            ParseError::error("directive is missing a tag name", span, file_id)
                .with_note("directives have the form '%% <tag> <args...>'"),
        );
    }

    Ok(Directive {
        name: name.to_lowercase(),
        args: rest.trim_start().to_string(),
        span,
    })
}

/// Split off the first whitespace-delimited token. Returns the token and
/// the untrimmed remainder.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], &s[at..]),
        None => (s, ""),
    }
}

/// Everything after the first whitespace token, used for divider labels.
fn after_first_token(s: &str) -> &str {
    let (_, rest) = split_token(s);
    rest.trim_start()
}
