//! Shared fixtures for integration tests.
#![allow(dead_code)]

use classmatch::graph::{ClassDecl, GraphBuilder, Insn, MethodDecl, Operand, Side};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A short distinctive instruction stream.
pub fn insns(tag: &str, opcodes: &[u16]) -> Vec<Insn> {
    let mut out = vec![Insn::with(18, Operand::Str(tag.to_string()))];
    out.extend(opcodes.iter().map(|&op| Insn::new(op)));
    out
}

/// Declare the same obfuscated class shape on both sides under different
/// names: one string-tagged method plus one int field.
pub fn twin_classes(builder: &mut GraphBuilder, name_a: &str, name_b: &str, tag: &str) {
    for (side, name) in [(Side::A, name_a), (Side::B, name_b)] {
        builder.class(
            side,
            ClassDecl::new(name).obfuscated().method(
                MethodDecl::new("m", "()V")
                    .obfuscated()
                    .insns(insns(tag, &[21, 54, 21, 96, 172])),
            ),
        );
    }
}
