//! Script primitives: opcode table, canonical encoding, disassembly and
//! per-line ASM grouping.
//!
//! Everything here is a pure function over in-memory buffers. Tables are
//! immutable statics.

/// Opcode table (`Opcode` newtype and mnemonics).
pub mod opcodes;
/// `ScriptOp` and the canonical byte encoding.
pub mod encode;
/// Bytes → ops → ASM text.
pub mod disasm;
/// ASM text → ops (inverse of the renderer).
pub mod asm;
/// Source-line → ASM buckets, aligned with a `SourceMap`.
pub mod line_map;

pub use asm::{asm_to_bytecode, asm_to_script, AsmError};
pub use disasm::{bytecode_to_asm, bytecode_to_script, hex_to_script, script_to_asm, DecodeError};
pub use encode::{encode_script_number, script_to_bytecode, PushOp, ScriptOp};
pub use line_map::{
    build_line_to_asm_map, build_line_to_opcodes_map, check_alignment, LineBuckets, LineToAsmMap, LineToOpcodesMap,
    MappingError,
};
pub use opcodes::Opcode;
