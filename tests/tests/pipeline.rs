//! Pipeline complet : source → artefact → bytecode → ASM.

use pretty_assertions::assert_eq;
use scrip_compiler::{compile_string, Artifact, CodeGenErrorKind, CompileError, Compiler, CompilerOptions};
use scrip_core::script::{asm_to_bytecode, bytecode_to_asm, bytecode_to_script, script_to_bytecode, DecodeError};
use scrip_tests::{wrap, ESCROW, SIMPLE_FUNCTIONS};

#[test]
fn comparison_ignores_layout() {
    let a = compile_string(&wrap("1 < 1")).unwrap();
    let b = compile_string(&wrap("\n1\n<\n1\n")).unwrap();
    assert_eq!(a.debug.bytecode, b.debug.bytecode);
    assert_eq!(a.bytecode, "OP_1 OP_1 OP_LESSTHAN");
}

#[test]
fn multisig_sequence() {
    let art = compile_string(&wrap("checkMultiSig([sig(0x00), sig(0x00)], [pubkey(0x00), pubkey(0x00)])")).unwrap();
    assert_eq!(art.bytecode, "OP_0 <0x00> <0x00> OP_2 <0x00> <0x00> OP_2 OP_CHECKMULTISIG");
    assert_eq!(art.debug.bytecode, "000100010052010001000152ae");
}

#[test]
fn compilation_is_deterministic() {
    for source in [SIMPLE_FUNCTIONS, ESCROW] {
        let first = compile_string(source).unwrap();
        let second = compile_string(source).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn bytecode_survives_disassembly() -> anyhow::Result<()> {
    let compiled = Compiler::default().compile_source(ESCROW)?;
    let script = bytecode_to_script(&compiled.bytecode)?;
    assert_eq!(script, compiled.script);
    assert_eq!(script_to_bytecode(&script), compiled.bytecode);
    assert_eq!(asm_to_bytecode(&bytecode_to_asm(&compiled.bytecode)?)?, compiled.bytecode);
    Ok(())
}

#[test]
fn optimisation_only_shrinks() -> anyhow::Result<()> {
    for source in [SIMPLE_FUNCTIONS, ESCROW] {
        let raw = Compiler::new(CompilerOptions { optimize: false, ..CompilerOptions::default() }).compile_source(source)?;
        let opt = Compiler::default().compile_source(source)?;
        assert!(opt.bytecode.len() < raw.bytecode.len());
        assert_eq!(opt.source_map.len(), opt.script.len());
        assert_eq!(raw.source_map.len(), raw.script.len());
    }
    Ok(())
}

#[test]
fn escrow_shape() -> anyhow::Result<()> {
    let art = compile_string(ESCROW)?;
    assert_eq!(art.contract_name, "Escrow");
    // sélecteur sous les 3 paramètres du constructeur
    assert!(art.bytecode.starts_with("OP_3 OP_PICK OP_0 OP_NUMEQUAL OP_IF"), "{}", art.bytecode);
    assert!(art.bytecode.contains("OP_ELSE OP_3 OP_ROLL OP_1 OP_NUMEQUALVERIFY"), "{}", art.bytecode);
    assert!(art.bytecode.contains("OP_CHECKLOCKTIMEVERIFY OP_DROP"));
    assert!(art.bytecode.contains("OP_TXINPUTCOUNT"));
    assert!(art.bytecode.ends_with("OP_ENDIF"));
    Ok(())
}

#[test]
fn artifact_json_roundtrip() -> anyhow::Result<()> {
    let art = compile_string(SIMPLE_FUNCTIONS)?;
    let json = serde_json::to_value(&art)?;
    assert_eq!(json["contractName"], "Test");
    assert!(json["debug"]["sourceMap"].is_string());
    assert_eq!(json["compiler"]["name"], "scrip");
    let back: Artifact = serde_json::from_value(json)?;
    assert_eq!(back, art);
    assert_eq!(back.source_map()?.len(), back.debug_script()?.len());
    Ok(())
}

#[test]
fn requires_reach_the_artifact() -> anyhow::Result<()> {
    let json = serde_json::to_value(compile_string(SIMPLE_FUNCTIONS)?)?;
    // un NIP final par fonction porte le contrôle
    assert_eq!(json["debug"]["requires"], serde_json::json!([{ "ip": 10, "line": 5 }, { "ip": 17, "line": 9 }]));

    let art = compile_string(ESCROW)?;
    let ops = art.debug_script()?;
    let requires = &art.debug.requires;
    assert_eq!(requires.len(), 7);
    assert!(requires.windows(2).all(|w| w[0].ip < w[1].ip));
    assert!(requires.iter().all(|r| r.ip < ops.len()));

    let op_at = |line: u32| {
        let r = requires.iter().find(|r| r.line == line).expect("require on line");
        (ops[r.ip].to_string(), r.message.clone())
    };
    assert_eq!(op_at(15), ("OP_CHECKSIGVERIFY".to_string(), Some("arbiter only".to_string())));
    assert_eq!(op_at(22), ("OP_CHECKLOCKTIMEVERIFY".to_string(), Some("refund still locked".to_string())));
    assert_eq!(op_at(17).1, None);

    let json = serde_json::to_value(&art)?;
    assert_eq!(json["debug"]["requires"][0]["message"], "arbiter only");
    assert!(json["debug"]["requires"][1].get("message").is_none());
    Ok(())
}

#[test]
fn errors_reach_the_caller() {
    let err = compile_string(&wrap("missing == 1")).unwrap_err();
    let CompileError::CodeGen(cg) = &err else { panic!("unexpected {err}") };
    assert_eq!(cg.kind, CodeGenErrorKind::UndefinedIdentifier("missing".into()));
    assert_eq!(cg.location.map(|l| l.line), Some(4));
    assert!(err.to_string().contains("undefined identifier `missing` at 4:13"));

    assert!(matches!(compile_string("contract A() { function f() { require(1 == ); } }"), Err(CompileError::Parse(_))));
}

#[test]
fn malformed_bytecode_is_rejected() {
    assert_eq!(bytecode_to_script(&[0x4c]), Err(DecodeError::TruncatedLength { offset: 0, needed: 1, available: 0 }));
}
