//! Source locations attached to AST nodes and emitted instructions.
//!
//! A [`Location`] is a plain `Copy` value: byte offsets into one source
//! buffer plus the 1-based line/column of both ends. Locations are never
//! mutated; fusing instructions builds a new one with [`Location::merge`].

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Span;

/// Immutable span over source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Location {
    /// Start byte offset (inclusive).
    pub start: u32,
    /// End byte offset (exclusive).
    pub end: u32,
    /// 1-based line of `start`.
    pub line: u32,
    /// 1-based column of `start`.
    pub column: u32,
    /// 1-based line of `end`.
    pub end_line: u32,
    /// 1-based column of `end`.
    pub end_column: u32,
}

impl Location {
    /// Builds a location from its raw parts.
    pub const fn new(start: u32, end: u32, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self { start, end, line, column, end_line, end_column }
    }

    /// Exact source text covered by this location, whitespace included.
    ///
    /// Returns an empty string if the offsets do not fall on the given buffer
    /// (a location used against a different source).
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start as usize..self.end as usize).unwrap_or_default()
    }

    /// Union span: smallest start and largest end, each with its line/column.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let (start, line, column) = if other.start < self.start {
            (other.start, other.line, other.column)
        } else {
            (self.start, self.line, self.column)
        };
        let (end, end_line, end_column) = if other.end > self.end {
            (other.end, other.end_line, other.end_column)
        } else {
            (self.end, self.end_line, self.end_column)
        };
        Self { start, end, line, column, end_line, end_column }
    }

    /// Length in bytes.
    pub const fn len(&self) -> u32 { self.end.saturating_sub(self.start) }

    /// True for a zero-width location.
    pub const fn is_empty(&self) -> bool { self.start >= self.end }

    /// True if `other` lies entirely inside `self`.
    pub const fn contains(&self, other: &Self) -> bool { self.start <= other.start && other.end <= self.end }

    /// Byte span of this location (source id 0).
    pub const fn span(&self) -> Span {
        Span::new(crate::SourceId(0), crate::Pos(self.start), crate::Pos(self.end))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SRC: &str = "contract A() {\n    function f() {\n        require(true);\n    }\n}\n";

    fn at(src: &str, needle: &str, len: usize) -> Location {
        let start = src.find(needle).unwrap();
        let end = start + len;
        let lc = |off: usize| {
            let before = &src[..off];
            let line = before.matches('\n').count() + 1;
            let col = off - before.rfind('\n').map_or(0, |i| i + 1) + 1;
            (line as u32, col as u32)
        };
        let (l1, c1) = lc(start);
        let (l2, c2) = lc(end);
        Location::new(start as u32, end as u32, l1, c1, l2, c2)
    }

    #[test]
    fn text_keeps_newlines_and_indent() {
        let f = at(SRC, "function", "function f() {\n        require(true);\n    }".len());
        assert_eq!(f.text(SRC), "function f() {\n        require(true);\n    }");
        assert_eq!((f.line, f.column, f.end_line), (2, 5, 4));
    }

    #[test]
    fn text_out_of_range_is_empty() {
        let loc = Location::new(10, 500, 1, 11, 1, 501);
        assert_eq!(loc.text("short"), "");
    }

    #[test]
    fn merge_is_union() {
        let a = at(SRC, "require", 7);
        let b = at(SRC, "true", 4);
        let m = a.merge(b);
        assert_eq!(m.text(SRC), "require(true");
        assert_eq!(b.merge(a), m);
        assert!(m.contains(&a) && m.contains(&b));
        assert_eq!(m.len(), 12);
    }

    #[test]
    fn display_is_line_col() {
        let a = at(SRC, "require", 7);
        assert_eq!(a.to_string(), "3:9");
    }
}
