// src/lib.rs
//! Scrip Compiler - génération de code pile + source map + artefact
//!
//! - Entrée : `scrip_ast::Contract` (ou texte source via `scrip-parser`)
//! - Sortie : script (ops), bytecode, ASM et source map index-alignée
//! - Erreurs : `CodeGenError` localisée, `CompileError` pour tout le pipeline
//! - Passes : génération (`codegen`) puis optimisation à lucarne (`peephole`)
//!
//! Features :
//! - `serde` : (dé)sérialisation de l’`Artifact` et des options
//!
//! API principale :
//! ```
//! use scrip_compiler::{Compiler, CompilerOptions};
//!
//! let src = "contract A() { function f(int a) { require(a == 1); } }";
//! let compiled = Compiler::new(CompilerOptions::default()).compile_source(src).unwrap();
//! assert_eq!(compiled.asm(), "OP_DUP OP_1 OP_NUMEQUAL OP_NIP");
//! ```

#![deny(missing_docs)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scrip_ast::Contract;
use scrip_core::script::{
    build_line_to_asm_map, bytecode_to_script, check_alignment, hex_to_script, script_to_asm, script_to_bytecode,
    DecodeError, LineToAsmMap, MappingError, ScriptOp,
};
use scrip_core::{SourceMap, SourceMapError};

mod codegen;
mod error;
mod instruction;
mod peephole;

pub use codegen::generate;
pub use error::{CodeGenError, CodeGenErrorKind, CompileError, CompileResult};
pub use instruction::{requires_of, script_of, source_map_of, Instruction, RequireInfo, RequireSite};
pub use peephole::optimise;

/// Nom inscrit dans les artefacts.
pub const COMPILER_NAME: &str = "scrip";
/// Version inscrite dans les artefacts.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options du compilateur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompilerOptions {
    /// Appliquer l’optimisation à lucarne
    pub optimize: bool,
    /// Redésassembler le bytecode et vérifier l’alignement de la source map
    pub verify_source_map: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self { Self { optimize: true, verify_source_map: true } }
}

// ─────────────────────────────────────────────────────────────────────────────
// Résultat
// ─────────────────────────────────────────────────────────────────────────────

/// Script compilé, avec sa source map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    /// Instructions localisées (après optimisation si activée)
    pub instructions: Vec<Instruction>,
    /// Opérations, dans l’ordre d’émission
    pub script: Vec<ScriptOp>,
    /// Encodage canonique
    pub bytecode: Vec<u8>,
    /// Une entrée par opération
    pub source_map: SourceMap,
    /// Points de contrôle des `require`, dans l’ordre du script
    pub requires: Vec<RequireInfo>,
}

impl CompiledScript {
    /// Rendu ASM.
    pub fn asm(&self) -> String { script_to_asm(&self.script) }

    /// Bytecode en hexadécimal.
    pub fn bytecode_hex(&self) -> String { hex::encode(&self.bytecode) }

    /// ASM regroupé par ligne source.
    pub fn line_to_asm_map(&self) -> Result<LineToAsmMap, MappingError> {
        build_line_to_asm_map(&self.script, &self.source_map)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Artefact
// ─────────────────────────────────────────────────────────────────────────────

/// Informations de débogage d’un artefact
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DebugInfo {
    /// Bytecode, hexadécimal
    pub bytecode: String,
    /// Source map, forme compacte
    pub source_map: String,
    /// Un `require` par entrée : instruction, ligne, message
    #[cfg_attr(feature = "serde", serde(default))]
    pub requires: Vec<RequireInfo>,
}

/// Identité du compilateur
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompilerInfo {
    /// Nom
    pub name: String,
    /// Version
    pub version: String,
}

/// Artefact de compilation (sérialisable en JSON avec `serde`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Artifact {
    /// Nom du contrat
    pub contract_name: String,
    /// Script en ASM
    pub bytecode: String,
    /// Texte source complet
    pub source: String,
    /// Bytecode brut + source map
    pub debug: DebugInfo,
    /// Compilateur utilisé
    pub compiler: CompilerInfo,
}

impl Artifact {
    /// Rassemble un artefact à partir d’un script compilé.
    pub fn new(contract: &Contract, source: &str, compiled: &CompiledScript) -> Self {
        Self {
            contract_name: contract.name.clone(),
            bytecode: compiled.asm(),
            source: source.to_string(),
            debug: DebugInfo {
                bytecode: compiled.bytecode_hex(),
                source_map: compiled.source_map.to_compact_string(),
                requires: compiled.requires.clone(),
            },
            compiler: CompilerInfo { name: COMPILER_NAME.to_string(), version: COMPILER_VERSION.to_string() },
        }
    }

    /// Redécode le bytecode de débogage.
    pub fn debug_script(&self) -> Result<Vec<ScriptOp>, DecodeError> { hex_to_script(&self.debug.bytecode) }

    /// Relit la source map compacte.
    pub fn source_map(&self) -> Result<SourceMap, SourceMapError> { SourceMap::parse_compact(&self.debug.source_map) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compilateur
// ─────────────────────────────────────────────────────────────────────────────

/// Façade : AST ou texte → script compilé / artefact
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Options actives
    pub options: CompilerOptions,
}

impl Compiler {
    /// Crée un compilateur.
    pub const fn new(options: CompilerOptions) -> Self { Self { options } }

    /// Compile un contrat déjà analysé.
    pub fn compile_contract(&self, contract: &Contract) -> CompileResult<CompiledScript> {
        let mut instructions = generate(contract)?;
        let emitted = instructions.len();
        if self.options.optimize {
            instructions = optimise(instructions);
        }
        let script = script_of(&instructions);
        let bytecode = script_to_bytecode(&script);
        let source_map = source_map_of(&instructions);
        let requires = requires_of(&instructions);

        if self.options.verify_source_map {
            let decoded = bytecode_to_script(&bytecode)?;
            check_alignment(decoded.len(), &source_map)?;
        }
        debug!(
            contract = %contract.name,
            emitted,
            kept = instructions.len(),
            bytes = bytecode.len(),
            requires = requires.len(),
            "contract compiled"
        );
        Ok(CompiledScript { instructions, script, bytecode, source_map, requires })
    }

    /// Compile un texte source.
    pub fn compile_source(&self, source: &str) -> CompileResult<CompiledScript> {
        let file = scrip_parser::parse_code(source)?;
        self.compile_contract(&file.contract)
    }

    /// Compile un texte source en artefact.
    pub fn compile_artifact(&self, source: &str) -> CompileResult<Artifact> {
        let file = scrip_parser::parse_code(source)?;
        let compiled = self.compile_contract(&file.contract)?;
        info!(contract = %file.contract.name, "artifact ready");
        Ok(Artifact::new(&file.contract, source, &compiled))
    }
}

/// Raccourci : compile `source` en artefact avec les options par défaut.
pub fn compile_string(source: &str) -> CompileResult<Artifact> { Compiler::default().compile_artifact(source) }

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scrip_core::script::bytecode_to_asm;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    const SRC: &str = "contract Test(pubkey owner) {
    function spend(sig s) {
        require(checkSig(s, owner));
    }
}";

    #[test]
    fn compile_source_is_consistent() {
        init_tracing();
        let out = Compiler::default().compile_source(SRC).unwrap();
        assert_eq!(out.asm(), "OP_OVER OP_OVER OP_CHECKSIG OP_NIP OP_NIP");
        assert_eq!(out.script.len(), out.source_map.len());
        assert_eq!(bytecode_to_asm(&out.bytecode).unwrap(), out.asm());
        assert_eq!(out.line_to_asm_map().unwrap().to_asm(), out.asm());
        assert_eq!(out.bytecode_hex(), "7878ac7777");
        assert_eq!(out.requires, vec![RequireInfo { ip: 4, line: 3, message: None }]);
    }

    #[test]
    fn unoptimised_keeps_raw_stream() {
        let c = Compiler::new(CompilerOptions { optimize: false, ..CompilerOptions::default() });
        let out = c.compile_source(SRC).unwrap();
        assert_eq!(out.asm(), "OP_1 OP_PICK OP_1 OP_PICK OP_CHECKSIG OP_NIP OP_NIP");
    }

    #[test]
    fn artifact_roundtrips_debug_info() {
        let art = compile_string(SRC).unwrap();
        assert_eq!(art.contract_name, "Test");
        assert_eq!(art.compiler.name, COMPILER_NAME);
        let ops = art.debug_script().unwrap();
        assert_eq!(script_to_asm(&ops), art.bytecode);
        assert_eq!(art.source_map().unwrap().len(), ops.len());
    }

    #[test]
    fn errors_are_wrapped() {
        assert!(matches!(compile_string("contract A() {"), Err(CompileError::Parse(_))));
        assert!(matches!(
            compile_string("contract A() { function f() { require(x); } }"),
            Err(CompileError::CodeGen(CodeGenError { kind: CodeGenErrorKind::UndefinedIdentifier(_), .. }))
        ));
    }
}
