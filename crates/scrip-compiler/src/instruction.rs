//! Emitted instructions: one script operation plus where it came from.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use scrip_core::script::ScriptOp;
use scrip_core::{Location, PositionHint, SourceLocation, SourceMap};

/// The `require` (or time check) an instruction concludes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireSite {
    /// Line of the `require` statement.
    pub line: u32,
    /// Optional failure message.
    pub message: Option<String>,
}

/// Debug entry of a `require`: where in the final script it is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RequireInfo {
    /// Index of the checking instruction in the script.
    pub ip: usize,
    /// Line of the `require` statement.
    pub line: u32,
    /// Optional failure message.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub message: Option<String>,
}

/// One script operation tagged with the location of the node(s) that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Operation.
    pub op: ScriptOp,
    /// Originating span (union span after fusion).
    pub location: Location,
    /// Which line of `location` the instruction belongs to.
    pub hint: PositionHint,
    /// Set on the instruction at which a `require` succeeds or fails.
    pub check: Option<RequireSite>,
}

impl Instruction {
    /// New instruction.
    pub const fn new(op: ScriptOp, location: Location, hint: PositionHint) -> Self {
        Self { op, location, hint, check: None }
    }

    /// Source-map entry for this instruction.
    pub const fn source_location(&self) -> SourceLocation { SourceLocation::new(self.location, self.hint) }

    /// Replaces `self` followed by `next` with a single `op`.
    #[must_use]
    pub fn fuse(&self, next: &Self, op: ScriptOp) -> Self {
        let merged = self.source_location().merge(next.source_location());
        let check = self.check.clone().or_else(|| next.check.clone());
        Self { op, location: merged.location, hint: merged.hint, check }
    }
}

/// Operations of an instruction stream, in order.
pub fn script_of(instructions: &[Instruction]) -> Vec<ScriptOp> {
    instructions.iter().map(|i| i.op.clone()).collect()
}

/// Source map of an instruction stream, index-aligned with it.
pub fn source_map_of(instructions: &[Instruction]) -> SourceMap {
    instructions.iter().map(Instruction::source_location).collect()
}

/// `require` debug entries, in script order.
pub fn requires_of(instructions: &[Instruction]) -> Vec<RequireInfo> {
    instructions
        .iter()
        .enumerate()
        .filter_map(|(ip, i)| {
            let site = i.check.as_ref()?;
            Some(RequireInfo { ip, line: site.line, message: site.message.clone() })
        })
        .collect()
}
