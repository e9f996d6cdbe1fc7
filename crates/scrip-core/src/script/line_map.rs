//! Grouping of decoded operations by source line.
//!
//! The operation sequence and the [`SourceMap`] are walked in lockstep; each
//! operation lands in the bucket of its entry's [`SourceLocation::line`].
//! Buckets are ordered by line, and flattening them gives back the operation
//! sequence as long as emission order follows line order, which code
//! generation guarantees through position hints.
//!
//! [`SourceLocation::line`]: crate::SourceLocation::line

use std::collections::BTreeMap;

use thiserror::Error;

use super::encode::ScriptOp;
use crate::SourceMap;

/// Operations and source map out of sync. Always an internal defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Different number of operations and source map entries.
    #[error("source map desynchronized: {opcodes} opcodes but {locations} locations")]
    LengthMismatch {
        /// Decoded operations.
        opcodes: usize,
        /// Source map entries.
        locations: usize,
    },
    /// Entry attributed to line 0 (lines are 1-based).
    #[error("source map entry {index} points to line 0")]
    InvalidLine {
        /// Entry index.
        index: usize,
    },
}

/// Ordered `line → items` buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuckets<T> {
    lines: BTreeMap<u32, Vec<T>>,
}

/// `line → ASM tokens`.
pub type LineToAsmMap = LineBuckets<String>;
/// `line → operations`.
pub type LineToOpcodesMap = LineBuckets<ScriptOp>;

impl<T> Default for LineBuckets<T> {
    fn default() -> Self { Self { lines: BTreeMap::new() } }
}

impl<T> LineBuckets<T> {
    /// Items of one line.
    pub fn get(&self, line: u32) -> Option<&[T]> { self.lines.get(&line).map(Vec::as_slice) }

    /// Lines with at least one item, ascending.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ { self.lines.keys().copied() }

    /// `(line, items)` pairs, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[T])> + '_ {
        self.lines.iter().map(|(l, v)| (*l, v.as_slice()))
    }

    /// Number of non-empty lines.
    pub fn len(&self) -> usize { self.lines.len() }

    /// True if no line has items.
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// All items, buckets concatenated in ascending line order.
    pub fn flatten(&self) -> Vec<&T> { self.lines.values().flatten().collect() }

    fn push(&mut self, line: u32, item: T) { self.lines.entry(line).or_default().push(item); }
}

impl LineToAsmMap {
    /// Buckets joined with single spaces, as a full ASM string.
    pub fn to_asm(&self) -> String {
        self.lines.values().flatten().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

/// Checks that `opcodes` operations can be paired with `map`.
pub fn check_alignment(opcodes: usize, map: &SourceMap) -> Result<(), MappingError> {
    if opcodes != map.len() {
        return Err(MappingError::LengthMismatch { opcodes, locations: map.len() });
    }
    if let Some(index) = map.iter().position(|e| e.line() == 0) {
        return Err(MappingError::InvalidLine { index });
    }
    Ok(())
}

/// Buckets `script` by source line.
pub fn build_line_to_opcodes_map(script: &[ScriptOp], map: &SourceMap) -> Result<LineToOpcodesMap, MappingError> {
    check_alignment(script.len(), map)?;
    let mut out = LineBuckets::default();
    for (op, entry) in script.iter().zip(map) {
        out.push(entry.line(), op.clone());
    }
    Ok(out)
}

/// Buckets the ASM tokens of `script` by source line.
pub fn build_line_to_asm_map(script: &[ScriptOp], map: &SourceMap) -> Result<LineToAsmMap, MappingError> {
    check_alignment(script.len(), map)?;
    let mut out = LineBuckets::default();
    for (op, entry) in script.iter().zip(map) {
        out.push(entry.line(), op.to_string());
    }
    Ok(out)
}

/* ─────────────────────────── Tests ─────────────────────────── */
