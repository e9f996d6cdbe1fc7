//! Canonical encoding of script operations.
//!
//! `ScriptOp::push` always picks the shortest push (the consensus minimal
//! push rule). `PushOp::new` can also describe a non-minimal push, which is
//! what the decoder produces when it meets one, so that re-encoding a decoded
//! script reproduces the input bytes.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::opcodes::{Opcode, MAX_DIRECT_PUSH};

/// Push of operand bytes with an explicit push opcode
/// (`OP_PUSHBYTES_n` or `OP_PUSHDATA_1/2/4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PushOp {
    opcode: Opcode,
    data: Vec<u8>,
}

impl PushOp {
    /// Push with a chosen opcode. `None` if the opcode is not a data push or
    /// cannot carry `data.len()` bytes.
    pub fn new(opcode: Opcode, data: Vec<u8>) -> Option<Self> {
        let fits = match opcode.0 {
            n @ 1..=MAX_DIRECT_PUSH => data.len() == n as usize,
            0x4c => data.len() <= 0xff,
            0x4d => data.len() <= 0xffff,
            0x4e => u32::try_from(data.len()).is_ok(),
            _ => false,
        };
        fits.then_some(Self { opcode, data })
    }

    /// Shortest push opcode able to carry `data` (ignoring the small-integer forms).
    #[allow(clippy::cast_possible_truncation)]
    pub fn sized(data: Vec<u8>) -> Self {
        let opcode = match data.len() {
            n @ 1..=75 => Opcode(n as u8),
            0..=0xff => Opcode::OP_PUSHDATA_1,
            0x100..=0xffff => Opcode::OP_PUSHDATA_2,
            _ => Opcode::OP_PUSHDATA_4,
        };
        Self { opcode, data }
    }

    /// Push opcode used.
    pub const fn opcode(&self) -> Opcode { self.opcode }

    /// Operand bytes.
    pub fn data(&self) -> &[u8] { &self.data }

    /// True if no shorter encoding of the same operand exists.
    pub fn is_minimal(&self) -> bool {
        ScriptOp::push(self.data.clone()) == ScriptOp::Push(self.clone())
    }
}

/// One decoded or generated script operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScriptOp {
    /// Operation without operand (small-integer pushes and `OP_0` included).
    Op(Opcode),
    /// Operand push.
    Push(PushOp),
}

impl ScriptOp {
    /// Minimal push of `data`: `OP_0`, `OP_1NEGATE`, `OP_1..OP_16`, or a sized push.
    pub fn push(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        match data.as_slice() {
            [] => Self::Op(Opcode::OP_0),
            [0x81] => Self::Op(Opcode::OP_1NEGATE),
            &[b] => match Opcode::small_int(b) {
                Some(op) => Self::Op(op),
                None => Self::Push(PushOp::sized(data)),
            },
            _ => Self::Push(PushOp::sized(data)),
        }
    }

    /// Minimal push of a script number.
    pub fn int(n: i64) -> Self { Self::push(encode_script_number(n)) }

    /// `OP_1` / `OP_0`.
    pub const fn bool(b: bool) -> Self { Self::Op(if b { Opcode::OP_1 } else { Opcode::OP_0 }) }

    /// Opcode byte of this operation.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Op(op) => *op,
            Self::Push(p) => p.opcode,
        }
    }

    /// Operand bytes, if any.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Op(_) => None,
            Self::Push(p) => Some(&p.data),
        }
    }

    /// True if this is `Op(op)`.
    pub fn is(&self, op: Opcode) -> bool { matches!(self, Self::Op(o) if *o == op) }

    /// Appends the canonical bytes of this operation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Op(op) => out.push(op.0),
            Self::Push(p) => {
                out.push(p.opcode.0);
                let len = p.data.len();
                match p.opcode.length_prefix_size() {
                    1 => out.push(len as u8),
                    2 => out.extend_from_slice(&(len as u16).to_le_bytes()),
                    4 => out.extend_from_slice(&(len as u32).to_le_bytes()),
                    _ => {}
                }
                out.extend_from_slice(&p.data);
            }
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Op(_) => 1,
            Self::Push(p) => 1 + p.opcode.length_prefix_size() + p.data.len(),
        }
    }
}

/// ASM token: mnemonic, or `<0x..>` for minimal data pushes. Non-minimal
/// pushes keep their opcode: `OP_PUSHDATA_1 <0x..>`.
impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op(op) => write!(f, "{op}"),
            Self::Push(p) if p.is_minimal() => write!(f, "<0x{}>", hex::encode(&p.data)),
            Self::Push(p) => write!(f, "{} <0x{}>", p.opcode, hex::encode(&p.data)),
        }
    }
}

/// Minimal script-number encoding: little-endian magnitude, sign in the high
/// bit of the last byte, no redundant bytes. Zero is the empty vector.
pub fn encode_script_number(n: i64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    match out.last_mut() {
        Some(last) if *last & 0x80 != 0 => out.push(if negative { 0x80 } else { 0x00 }),
        Some(last) if negative => *last |= 0x80,
        _ => {}
    }
    out
}

/// Concatenated canonical encoding of `ops`.
pub fn script_to_bytecode(ops: &[ScriptOp]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ops.iter().map(ScriptOp::encoded_len).sum());
    for op in ops {
        op.encode_into(&mut out);
    }
    out
}

/* ─────────────────────────── Tests ─────────────────────────── */
