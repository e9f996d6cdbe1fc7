//! Localisations : texte extrait, attribution ligne par ligne, invariance aux blancs.

use pretty_assertions::assert_eq;
use scrip_compiler::compile_string;
use scrip_tests::{init_tracing, line_map_asm, wrap, wrap_spread, BLOCKS, ESCROW, SIMPLE_FUNCTIONS};

#[test]
fn function_location_text() {
    let file = scrip_parser::parse_code(SIMPLE_FUNCTIONS).unwrap();
    let f = &file.contract.functions[0];
    let loc = f.location.expect("function location");
    assert_eq!(loc.text(SIMPLE_FUNCTIONS), "function hello(sig s, pubkey pk) {\n        require(checkSig(s, pk));\n    }");
    assert_eq!((loc.line, loc.end_line), (4, 6));
}

#[test]
fn spread_layout_moves_tokens_to_own_lines() {
    assert_eq!(
        wrap_spread("abs(-1) == 1"),
        "\ncontract test() {\n  function test() {\n    require(\nabs(\n-1\n)\n==\n1);\n  }\n}"
    );
}

#[test]
fn same_bytecode_in_both_layouts() {
    init_tracing();
    for block in BLOCKS {
        let compact = compile_string(&wrap(block)).unwrap();
        let spread = compile_string(&wrap_spread(block)).unwrap();
        assert_eq!(compact.debug.bytecode, spread.debug.bytecode, "{block}");
        assert_eq!(compact.bytecode, spread.bytecode, "{block}");
    }
}

#[test]
fn line_map_matches_bytecode() {
    for block in BLOCKS {
        for source in [wrap(block), wrap_spread(block)] {
            let artifact = compile_string(&source).unwrap();
            let (received, expected) = line_map_asm(&artifact).unwrap();
            assert_eq!(received, expected, "{source}");
        }
    }
}

#[test]
fn line_map_matches_bytecode_for_contracts() {
    for source in [SIMPLE_FUNCTIONS, ESCROW] {
        let artifact = compile_string(source).unwrap();
        let (received, expected) = line_map_asm(&artifact).unwrap();
        assert_eq!(received, expected);
    }
}

#[test]
fn synthesized_instructions_land_on_closing_lines() {
    let artifact = compile_string(SIMPLE_FUNCTIONS).unwrap();
    let script = artifact.debug_script().unwrap();
    let map = artifact.source_map().unwrap();
    let at = |asm: &str| -> Vec<u32> {
        script.iter().zip(map.iter()).filter(|(op, _)| op.to_string() == asm).map(|(_, e)| e.line()).collect()
    };
    // dispatch : ligne du mot-clé `function` ; ELSE / NIP finaux : `}` de la fonction ; ENDIF : `}` du contrat
    assert_eq!(at("OP_IF"), vec![4]);
    assert_eq!(at("OP_ELSE"), vec![6]);
    assert_eq!(at("OP_NIP"), vec![6, 6, 6, 10]);
    assert_eq!(at("OP_ENDIF"), vec![11]);
}

mod whitespace {
    use super::*;
    use proptest::prelude::*;

    const GAPS: &[&str] = &[" ", "\n", "\t", "  \n    ", "\r\n", " /* c */ "];

    fn respace(block: &str, picks: &[usize]) -> String {
        let mut out = String::new();
        for (i, part) in block.split(' ').enumerate() {
            if i > 0 {
                out.push_str(GAPS[picks[(i - 1) % picks.len()] % GAPS.len()]);
            }
            out.push_str(part);
        }
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn extra_whitespace_keeps_bytecode(index in 0..BLOCKS.len(), picks in prop::collection::vec(0usize..64, 1..8)) {
            let block = BLOCKS[index];
            let base = compile_string(&wrap(block)).unwrap();
            let moved = compile_string(&wrap(&respace(block, &picks))).unwrap();
            prop_assert_eq!(base.debug.bytecode, moved.debug.bytecode);
        }
    }
}
