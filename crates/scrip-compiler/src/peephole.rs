//! Peephole optimiser: rewrites adjacent instruction pairs until nothing changes.
//!
//! A fused instruction takes the union of both locations; a removed pair takes
//! its two source-map entries with it, so the stream stays index-aligned with
//! its source map.

use scrip_core::script::{Opcode, ScriptOp};
use tracing::trace;

use crate::instruction::Instruction;

/// Outcome of matching one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewrite {
    /// Both instructions become this opcode.
    Fuse(Opcode),
    /// Both instructions disappear.
    Remove,
}

fn rewrite(first: &ScriptOp, second: &ScriptOp) -> Option<Rewrite> {
    let (ScriptOp::Op(a), ScriptOp::Op(b)) = (first, second) else { return None };
    let fused = match (*a, *b) {
        (Opcode::OP_NUMEQUAL, Opcode::OP_VERIFY) => Opcode::OP_NUMEQUALVERIFY,
        (Opcode::OP_EQUAL, Opcode::OP_VERIFY) => Opcode::OP_EQUALVERIFY,
        (Opcode::OP_CHECKSIG, Opcode::OP_VERIFY) => Opcode::OP_CHECKSIGVERIFY,
        (Opcode::OP_CHECKMULTISIG, Opcode::OP_VERIFY) => Opcode::OP_CHECKMULTISIGVERIFY,
        (Opcode::OP_CHECKDATASIG, Opcode::OP_VERIFY) => Opcode::OP_CHECKDATASIGVERIFY,
        (Opcode::OP_NOT, Opcode::OP_IF) => Opcode::OP_NOTIF,
        (Opcode::OP_1, Opcode::OP_ADD) => Opcode::OP_1ADD,
        (Opcode::OP_1, Opcode::OP_SUB) => Opcode::OP_1SUB,
        (Opcode::OP_0, Opcode::OP_PICK) => Opcode::OP_DUP,
        (Opcode::OP_1, Opcode::OP_PICK) => Opcode::OP_OVER,
        (Opcode::OP_0, Opcode::OP_ROLL) => return Some(Rewrite::Remove),
        (Opcode::OP_1, Opcode::OP_ROLL) => Opcode::OP_SWAP,
        (Opcode::OP_2, Opcode::OP_ROLL) => Opcode::OP_ROT,
        (Opcode::OP_DROP | Opcode::OP_NIP, Opcode::OP_DROP) => Opcode::OP_2DROP,
        (Opcode::OP_SWAP, Opcode::OP_DROP) => Opcode::OP_NIP,
        _ => return None,
    };
    Some(Rewrite::Fuse(fused))
}

/// One left-to-right pass. Returns the rewritten stream and whether anything changed.
fn pass(input: Vec<Instruction>) -> (Vec<Instruction>, bool) {
    let mut out: Vec<Instruction> = Vec::with_capacity(input.len());
    let mut changed = false;
    for ins in input {
        let rule = out.last().and_then(|prev| rewrite(&prev.op, &ins.op));
        match (rule, out.pop()) {
            (Some(Rewrite::Fuse(op)), Some(prev)) => {
                trace!(first = %prev.op, second = %ins.op, fused = %op, "peephole fuse");
                out.push(prev.fuse(&ins, ScriptOp::Op(op)));
                changed = true;
            }
            (Some(Rewrite::Remove), Some(prev)) => {
                trace!(first = %prev.op, second = %ins.op, "peephole remove");
                changed = true;
            }
            (_, prev) => {
                out.extend(prev);
                out.push(ins);
            }
        }
    }
    (out, changed)
}

/// Applies the rewrite rules to a fixpoint.
pub fn optimise(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut current = instructions;
    loop {
        let (next, changed) = pass(current);
        if !changed {
            return next;
        }
        current = next;
    }
}
