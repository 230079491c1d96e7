//! Source positions attached to statements.

use std::fmt;

/// A line/column position in the source script.
///
/// Both coordinates are 1-based; the front end that builds the tree is
/// responsible for filling them in. Evaluation never inspects them beyond
/// copying them onto errors.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
