use std::ops::Range;

/// A tag directive parsed from a `%%` line.
///
/// The tag name is case-folded at parse time so handler lookup is
/// case-insensitive. The argument string is everything after the first two
/// whitespace-delimited tokens, with interior whitespace preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub args: String,
    /// Byte span of the directive line for error reporting.
    pub span: Range<usize>,
}
