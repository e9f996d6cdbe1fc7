//! Source map: one [`SourceLocation`] per emitted instruction, index-aligned
//! with the disassembled operation sequence.
//!
//! Compact text form (stored in artifacts): entries separated by `;`, fields
//! `start:end:line:column:end_line:end_column:hint`, hint `0` = start and
//! `1` = end. A field equal to the same field of the previous entry is left
//! empty, so runs of instructions from one node collapse to `::::::`.

use core::fmt::Write as _;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Location;

/// Which end of its [`Location`] an instruction is attributed to.
///
/// Operators are emitted after their operands, so they point at the end of
/// their node; leaves point at the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PositionHint {
    /// Start line of the location.
    #[default]
    Start,
    /// End line of the location.
    End,
}

impl PositionHint {
    /// `End` wins when two instructions are fused.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Start, Self::Start) => Self::Start,
            _ => Self::End,
        }
    }

    const fn code(self) -> u32 {
        match self {
            Self::Start => 0,
            Self::End => 1,
        }
    }
}

/// Source location of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceLocation {
    /// Location of the node(s) that produced the instruction.
    pub location: Location,
    /// Line selector.
    pub hint: PositionHint,
}

impl SourceLocation {
    /// Builds an entry.
    pub const fn new(location: Location, hint: PositionHint) -> Self { Self { location, hint } }

    /// Line this instruction is attributed to.
    pub const fn line(&self) -> u32 {
        match self.hint {
            PositionHint::Start => self.location.line,
            PositionHint::End => self.location.end_line,
        }
    }

    /// Union of two entries (fused instructions).
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self { location: self.location.merge(other.location), hint: self.hint.merge(other.hint) }
    }

    const fn fields(&self) -> [u32; 7] {
        let l = &self.location;
        [l.start, l.end, l.line, l.column, l.end_line, l.end_column, self.hint.code()]
    }
}

/// Malformed compact source map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceMapError {
    /// Wrong number of `:`-separated fields.
    #[error("source map entry {entry}: expected 7 fields, found {found}")]
    FieldCount {
        /// Entry index.
        entry: usize,
        /// Fields found.
        found: usize,
    },
    /// Field is not a number, or is empty with no previous entry to inherit from.
    #[error("source map entry {entry}: invalid field {field}")]
    InvalidField {
        /// Entry index.
        entry: usize,
        /// Field index.
        field: usize,
    },
}

/// Ordered per-instruction locations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SourceMap {
    entries: Vec<SourceLocation>,
}

impl SourceMap {
    /// Empty map.
    pub const fn new() -> Self { Self { entries: Vec::new() } }

    /// Appends the entry of the next instruction.
    pub fn push(&mut self, entry: SourceLocation) { self.entries.push(entry); }

    /// Number of entries.
    pub fn len(&self) -> usize { self.entries.len() }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entry of instruction `index`.
    pub fn get(&self, index: usize) -> Option<&SourceLocation> { self.entries.get(index) }

    /// All entries, in instruction order.
    pub fn entries(&self) -> &[SourceLocation] { &self.entries }

    /// Iterator over entries.
    pub fn iter(&self) -> core::slice::Iter<'_, SourceLocation> { self.entries.iter() }

    /// Compact text form.
    pub fn to_compact_string(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<[u32; 7]> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let fields = entry.fields();
            for (f, value) in fields.iter().enumerate() {
                if f > 0 {
                    out.push(':');
                }
                if prev.map_or(true, |p| p[f] != *value) {
                    let _ = write!(out, "{value}");
                }
            }
            prev = Some(fields);
        }
        out
    }

    /// Parses the compact text form.
    pub fn parse_compact(text: &str) -> Result<Self, SourceMapError> {
        let mut entries = Vec::new();
        if text.is_empty() {
            return Ok(Self { entries });
        }
        let mut prev: Option<[u32; 7]> = None;
        for (entry, chunk) in text.split(';').enumerate() {
            let parts: Vec<&str> = chunk.split(':').collect();
            if parts.len() != 7 {
                return Err(SourceMapError::FieldCount { entry, found: parts.len() });
            }
            let mut fields = [0u32; 7];
            for (field, raw) in parts.iter().enumerate() {
                fields[field] = if raw.is_empty() {
                    prev.map(|p| p[field]).ok_or(SourceMapError::InvalidField { entry, field })?
                } else {
                    raw.parse().map_err(|_| SourceMapError::InvalidField { entry, field })?
                };
            }
            let hint = match fields[6] {
                0 => PositionHint::Start,
                1 => PositionHint::End,
                _ => return Err(SourceMapError::InvalidField { entry, field: 6 }),
            };
            let [start, end, line, column, end_line, end_column, _] = fields;
            entries.push(SourceLocation::new(Location::new(start, end, line, column, end_line, end_column), hint));
            prev = Some(fields);
        }
        Ok(Self { entries })
    }
}

impl FromIterator<SourceLocation> for SourceMap {
    fn from_iter<I: IntoIterator<Item = SourceLocation>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a SourceMap {
    type Item = &'a SourceLocation;
    type IntoIter = core::slice::Iter<'a, SourceLocation>;
    fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}

/* ─────────────────────────── Tests ─────────────────────────── */
