//! Disassembly: bytecode → `ScriptOp`s → ASM text.
//!
//! Decoding is the exact inverse of [`script_to_bytecode`]: push opcodes are
//! kept as read (non-minimal ones included) so re-encoding is byte-identical.
//!
//! [`script_to_bytecode`]: super::encode::script_to_bytecode

use thiserror::Error;

use super::encode::{PushOp, ScriptOp};
use super::opcodes::Opcode;

/// Failure while decoding bytecode. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode value with no assignment.
    #[error("unknown opcode 0x{byte:02x} at byte {offset}")]
    UnknownOpcode {
        /// Raw opcode byte.
        byte: u8,
        /// Offset of the opcode.
        offset: usize,
    },
    /// `OP_PUSHDATA_*` whose length field runs past the end.
    #[error("truncated push length at byte {offset}: {needed} length bytes needed, {available} available")]
    TruncatedLength {
        /// Offset of the push opcode.
        offset: usize,
        /// Size of the length field.
        needed: usize,
        /// Bytes left after the opcode.
        available: usize,
    },
    /// Push whose declared length exceeds the remaining bytes.
    #[error("push at byte {offset} declares {declared} bytes but only {available} remain")]
    TruncatedPush {
        /// Offset of the push opcode.
        offset: usize,
        /// Declared operand length.
        declared: usize,
        /// Bytes left for the operand.
        available: usize,
    },
    /// Hex string could not be decoded.
    #[error("invalid hex bytecode: {0}")]
    InvalidHex(String),
}

/// Sequential reader over the bytecode (little-endian helpers).
struct Cursor<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    const fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    const fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }
    const fn is_eof(&self) -> bool { self.off >= self.data.len() }

    fn read_u8(&mut self) -> Option<u8> {
        let b = self.data.get(self.off).copied()?;
        self.off += 1;
        Some(b)
    }

    fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let start = self.off;
        self.off += n;
        Some(&self.data[start..self.off])
    }

    /// Length field of `width` bytes (1, 2 or 4), little-endian.
    fn read_len_le(&mut self, width: usize) -> Option<usize> {
        let b = self.read_bytes(width)?;
        let mut raw = [0u8; 4];
        raw[..width].copy_from_slice(b);
        usize::try_from(u32::from_le_bytes(raw)).ok()
    }
}

/// Decodes `bytecode` into operations.
pub fn bytecode_to_script(bytecode: &[u8]) -> Result<Vec<ScriptOp>, DecodeError> {
    let mut cur = Cursor::new(bytecode);
    let mut ops = Vec::new();

    while !cur.is_eof() {
        let offset = cur.off;
        let Some(byte) = cur.read_u8() else { break };
        let opcode = Opcode(byte);

        if !opcode.is_known() {
            return Err(DecodeError::UnknownOpcode { byte, offset });
        }
        if byte == Opcode::OP_0.0 || !opcode.is_push() {
            ops.push(ScriptOp::Op(opcode));
            continue;
        }

        let width = opcode.length_prefix_size();
        let declared = if width == 0 {
            byte as usize
        } else {
            let available = cur.remaining();
            cur.read_len_le(width)
                .ok_or(DecodeError::TruncatedLength { offset, needed: width, available })?
        };
        let available = cur.remaining();
        let data = cur
            .read_bytes(declared)
            .ok_or(DecodeError::TruncatedPush { offset, declared, available })?;

        // Length always fits the opcode it was read for.
        let push = PushOp::new(opcode, data.to_vec())
            .ok_or(DecodeError::TruncatedPush { offset, declared, available })?;
        ops.push(ScriptOp::Push(push));
    }

    Ok(ops)
}

/// Decodes a hex string (as stored in artifacts) into operations.
pub fn hex_to_script(hex_bytecode: &str) -> Result<Vec<ScriptOp>, DecodeError> {
    let bytes = hex::decode(hex_bytecode.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    bytecode_to_script(&bytes)
}

/// ASM rendering of already-decoded operations, single-space separated.
pub fn script_to_asm(ops: &[ScriptOp]) -> String {
    ops.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Decodes and renders `bytecode` as ASM.
pub fn bytecode_to_asm(bytecode: &[u8]) -> Result<String, DecodeError> {
    bytecode_to_script(bytecode).map(|ops| script_to_asm(&ops))
}

/* ─────────────────────────── Tests ─────────────────────────── */
