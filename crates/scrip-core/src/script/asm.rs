//! Minimal assembler: ASM text → operations.
//!
//! Accepts what [`script_to_asm`](super::disasm::script_to_asm) renders:
//! bare mnemonics, `<0x..>` minimal pushes, and `OP_PUSHBYTES_n <0x..>` /
//! `OP_PUSHDATA_n <0x..>` for explicit push opcodes.

use thiserror::Error;

use super::encode::{script_to_bytecode, PushOp, ScriptOp};
use super::opcodes::Opcode;

/// ASM parse failure; `index` is the 0-based token position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Token is neither a mnemonic nor a push literal.
    #[error("unknown mnemonic `{token}` (token {index})")]
    UnknownMnemonic {
        /// Offending token.
        token: String,
        /// Token position.
        index: usize,
    },
    /// `<0x..>` literal with bad hex.
    #[error("invalid push literal `{token}` (token {index})")]
    InvalidPushData {
        /// Offending token.
        token: String,
        /// Token position.
        index: usize,
    },
    /// Explicit push opcode without (or with mismatching) operand.
    #[error("`{mnemonic}` needs a matching `<0x..>` operand (token {index})")]
    BadExplicitPush {
        /// Push mnemonic.
        mnemonic: String,
        /// Token position.
        index: usize,
    },
}

fn push_literal(token: &str) -> Option<Result<Vec<u8>, ()>> {
    let inner = token.strip_prefix("<0x")?.strip_suffix('>')?;
    Some(hex::decode(inner).map_err(|_| ()))
}

/// Parses ASM text.
pub fn asm_to_script(asm: &str) -> Result<Vec<ScriptOp>, AsmError> {
    let mut ops = Vec::new();
    let mut tokens = asm.split_whitespace().enumerate();

    while let Some((index, token)) = tokens.next() {
        if let Some(lit) = push_literal(token) {
            let data = lit.map_err(|()| AsmError::InvalidPushData { token: token.to_owned(), index })?;
            ops.push(ScriptOp::push(data));
            continue;
        }

        let opcode = Opcode::from_mnemonic(token)
            .ok_or_else(|| AsmError::UnknownMnemonic { token: token.to_owned(), index })?;

        if opcode.is_push() && opcode != Opcode::OP_0 {
            let bad = || AsmError::BadExplicitPush { mnemonic: token.to_owned(), index };
            let data = tokens
                .next()
                .and_then(|(_, t)| push_literal(t))
                .and_then(Result::ok)
                .ok_or_else(bad)?;
            let push = PushOp::new(opcode, data).ok_or_else(bad)?;
            ops.push(ScriptOp::Push(push));
        } else {
            ops.push(ScriptOp::Op(opcode));
        }
    }

    Ok(ops)
}

/// Parses ASM text and encodes it.
pub fn asm_to_bytecode(asm: &str) -> Result<Vec<u8>, AsmError> {
    asm_to_script(asm).map(|ops| script_to_bytecode(&ops))
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::disasm::{bytecode_to_script, script_to_asm};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_rendered_asm() {
        let asm = "OP_0 <0x00> <0x00> OP_2 <0x00> <0x00> OP_2 OP_CHECKMULTISIG";
        let ops = asm_to_script(asm).unwrap();
        assert_eq!(ops.len(), 8);
        assert_eq!(script_to_asm(&ops), asm);
        assert_eq!(
            asm_to_bytecode(asm).unwrap(),
            vec![0x00, 0x01, 0x00, 0x01, 0x00, 0x52, 0x01, 0x00, 0x01, 0x00, 0x52, 0xae]
        );
    }

    #[test]
    fn explicit_push_roundtrip() {
        let bytes = vec![0x4c, 0x02, 0xde, 0xad, 0x76];
        let asm = script_to_asm(&bytecode_to_script(&bytes).unwrap());
        assert_eq!(asm, "OP_PUSHDATA_1 <0xdead> OP_DUP");
        assert_eq!(asm_to_bytecode(&asm).unwrap(), bytes);
    }

    #[test]
    fn reports_bad_tokens() {
        assert_eq!(
            asm_to_script("OP_DUP OP_FOO").unwrap_err(),
            AsmError::UnknownMnemonic { token: "OP_FOO".into(), index: 1 }
        );
        assert_eq!(
            asm_to_script("<0xzz>").unwrap_err(),
            AsmError::InvalidPushData { token: "<0xzz>".into(), index: 0 }
        );
        assert_eq!(
            asm_to_script("OP_PUSHBYTES_2 <0xaa>").unwrap_err(),
            AsmError::BadExplicitPush { mnemonic: "OP_PUSHBYTES_2".into(), index: 0 }
        );
    }
}
