//! Fixtures et helpers partagés par les tests d'intégration Scrip.
//!
//! Les tests eux-mêmes vivent dans `tests/tests/*.rs`.

use anyhow::Context as _;
use scrip_compiler::Artifact;
use scrip_core::script::{build_line_to_asm_map, bytecode_to_asm};

/// Deux fonctions, aucun paramètre de constructeur.
pub const SIMPLE_FUNCTIONS: &str = include_str!("../fixtures/simple_functions.scrip");

/// Paramètres de constructeur, introspection, `if/else`, contrôle temporel.
pub const ESCROW: &str = include_str!("../fixtures/escrow.scrip");

/// Conditions couvrant chaque opérateur, builtin, cast et accès membre.
pub const BLOCKS: &[&str] = &[
    "1 < 1",
    "1 <= 1",
    "1 == 1",
    "1 != 1",
    "1 > 1",
    "1 >= 1",
    "(1 - 1) == 1",
    "(1 + 1) == 1",
    "(1 * 1) == 1",
    "(1 / 1) == 1",
    "(true && true) == true",
    "(true || true) == true",
    "(0x01 & 0x01) == 0x01",
    "(0x01 | 0x01) == 0x01",
    "(0x01 ^ 0x01) == 0x01",
    "\"1\" + \"1\" == \"1\"",
    "\"1\" + \"1\" != \"1\"",
    "\"11\".split(1)[0] == \"1\"",
    "\"11\".split(1)[1] == \"1\"",
    "\"1\".reverse() == \"1\"",
    "\"1\".length == 1",
    "0x01.length == 1",
    "-333 == 1",
    "tx.inputs[0].tokenAmount == 1",
    "this.activeInputIndex == 1",
    "tx.version == 1",
    "abs(-1) == 1",
    "within(1,1,1) == true",
    "bytes(sha256(1)) == bytes(0x01)",
    "checkSig(sig(0x00), pubkey(0x00))",
    "checkMultiSig([sig(0x00), sig(0x00)], [pubkey(0x00), pubkey(0x00)])",
    "checkDataSig(datasig(0x00), 0x00, pubkey(0x00))",
    "tx.time >= 1",
    "tx.age >= 1",
    "bytes(1) == 0x01",
    "int(0x01) == 1",
];

/// Place `code` comme unique condition d'un contrat minimal.
pub fn wrap(code: &str) -> String {
    format!("\ncontract test() {{\n  function test() {{\n    require({code});\n  }}\n}}")
}

/// Même contrat, mais chaque jeton de `code` sur sa propre ligne et chaque
/// parenthèse ouvrante suivie d'un saut de ligne.
pub fn wrap_spread(code: &str) -> String {
    let spread = code.replace(' ', "\n").replace(')', "\n)");
    let wrapped = wrap(&spread).replace("(\n)", "()");
    let mut out = String::with_capacity(wrapped.len() * 2);
    let mut chars = wrapped.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '(' && chars.peek() != Some(&')') {
            out.push('\n');
        }
    }
    out
}

/// ASM reconstruit depuis la carte ligne → ASM, et ASM du bytecode brut.
///
/// Les deux sont égaux tant que l'ordre des lignes suit l'ordre d'émission.
pub fn line_map_asm(artifact: &Artifact) -> anyhow::Result<(String, String)> {
    let script = artifact.debug_script().context("debug bytecode")?;
    let map = artifact.source_map().context("compact source map")?;
    let received = build_line_to_asm_map(&script, &map)?.to_asm();
    let bytes = hex::decode(&artifact.debug.bytecode)?;
    Ok((received, bytecode_to_asm(&bytes)?))
}

/// Active `tracing` une seule fois (filtre via `RUST_LOG`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
