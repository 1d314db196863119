//! Shared classifier primitives: potential equality, similarity helpers
//! and instruction-stream comparison.

use std::collections::HashSet;

use crate::cache::CacheKind;
use crate::graph::{ClassId, Insn, MatchEnv, MethodId, Operand, VarId};

/// Conservative compatibility check on classes.
///
/// Two classes may end up matched iff they are already matched to each
/// other, or both are unmatched, their array dimensions agree, and (for
/// arrays) their elements are potentially equal.
pub fn check_potential_equality(env: &MatchEnv, a: ClassId, b: ClassId) -> bool {
    let ca = env.class(a);
    let cb = env.class(b);

    if let Some(matched) = ca.matched() {
        return matched == b;
    }

    if cb.matched().is_some() {
        return false;
    }

    if ca.array_dims() != cb.array_dims() {
        return false;
    }

    match (ca.element(), cb.element()) {
        (Some(ea), Some(eb)) => check_potential_equality(env, ea, eb),
        (None, None) => true,
        _ => false,
    }
}

/// Potential equality for vars: same kind, potentially-equal types.
pub fn check_var_potential_equality(env: &MatchEnv, a: VarId, b: VarId) -> bool {
    let va = env.var(a);
    let vb = env.var(b);

    if va.is_arg() != vb.is_arg() {
        return false;
    }

    if let Some(matched) = va.matched() {
        return matched == b;
    }

    if vb.matched().is_some() {
        return false;
    }

    check_potential_equality(env, va.var_type(), vb.var_type())
}

/// Match-link consistency for members: unmatched on both sides, or
/// already matched to each other.
pub(crate) fn match_consistent<T: PartialEq + Copy>(
    a_matched: Option<T>,
    b: T,
    b_matched: bool,
) -> bool {
    match a_matched {
        Some(matched) => matched == b,
        None => !b_matched,
    }
}

/// Similarity of two counts: 1.0 when equal, falling off linearly.
pub(crate) fn compare_counts(a: usize, b: usize) -> f64 {
    if a == b {
        return 1.0;
    }

    1.0 - (a as f64 - b as f64).abs() / a.max(b).max(1) as f64
}

/// Jaccard similarity; two empty sets count as identical.
pub(crate) fn compare_sets<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Greedy bipartite overlap of two class lists under potential equality.
pub(crate) fn compare_cls_sets(env: &MatchEnv, a: &[ClassId], b: &[ClassId]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut used = vec![false; b.len()];
    let mut matched = 0;

    for &x in a {
        for (slot, &y) in b.iter().enumerate() {
            if !used[slot] && check_potential_equality(env, x, y) {
                used[slot] = true;
                matched += 1;
                break;
            }
        }
    }

    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Relative-position similarity of a member within its owner.
pub(crate) fn compare_positions(pos_a: u32, len_a: usize, pos_b: u32, len_b: usize) -> f64 {
    if len_a <= 1 && len_b <= 1 {
        return 1.0;
    }

    let rel_a = pos_a as f64 / len_a.max(1) as f64;
    let rel_b = pos_b as f64 / len_b.max(1) as f64;
    1.0 - (rel_a - rel_b).abs()
}

/// Instruction-stream similarity in [0, 1].
///
/// Normalized edit distance where operand equality is insensitive to
/// local-variable slot renumbering; identical streams score 1.0 and
/// fully divergent streams 0.0. Symmetric.
pub fn compare_insns(a: &[Insn], b: &[Insn]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = edit_distance(a, b);
    1.0 - distance as f64 / a.len().max(b.len()) as f64
}

/// Cached per-method-pair instruction similarity.
pub fn method_insn_similarity(env: &MatchEnv, a: MethodId, b: MethodId) -> f64 {
    env.cache()
        .get_or_insert_with(CacheKind::InsnSimilarity, a.raw(), b.raw(), || {
            compare_insns(env.method(a).insns(), env.method(b).insns())
        })
}

fn insn_similar(a: &Insn, b: &Insn) -> bool {
    a.opcode == b.opcode && a.operand.similar(&b.operand)
}

/// Levenshtein distance over instruction slices with loose operand
/// equality. Two rows of DP state; substitution costs 1 like the gaps.
fn edit_distance(a: &[Insn], b: &[Insn]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ia) in a.iter().enumerate() {
        current[0] = i + 1;

        for (j, jb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(!insn_similar(ia, jb));
            current[j + 1] = substitute.min(prev[j + 1] + 1).min(current[j] + 1);
        }

        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// String constants appearing in a method's instruction stream.
pub(crate) fn string_constants<'a>(insns: &'a [Insn], out: &mut HashSet<&'a str>) {
    for insn in insns {
        if let Operand::Str(s) = &insn.operand {
            out.insert(s.as_str());
        }
    }
}

/// Numeric constants appearing in a method's instruction stream.
pub(crate) fn numeric_constants(insns: &[Insn], out: &mut HashSet<i64>) {
    for insn in insns {
        if let Operand::Int(v) = insn.operand {
            out.insert(v);
        }
    }
}

/// Type references appearing in a method's instruction stream, resolved
/// on the method's own side.
pub(crate) fn referenced_types(env: &MatchEnv, m: MethodId, out: &mut Vec<ClassId>) {
    let method = env.method(m);
    let side = env.class(method.class()).side();

    for insn in method.insns() {
        if let Operand::Type(desc) = &insn.operand {
            if let Some(cls) = env.cls_by_id(side, desc) {
                out.push(cls);
            }
        }
    }
}

/// Similarity of two half-open index ranges.
pub(crate) fn compare_ranges(start_a: u32, end_a: u32, start_b: u32, end_b: u32) -> f64 {
    let span = end_a.max(end_b).saturating_sub(start_a.min(start_b));

    if span == 0 {
        return 1.0;
    }

    let start_diff = start_a.abs_diff(start_b);
    let end_diff = end_a.abs_diff(end_b);
    (1.0 - (start_diff + end_diff) as f64 / span as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassDecl, GraphBuilder, Side};

    fn insn(opcode: u16) -> Insn {
        Insn::new(opcode)
    }

    #[test]
    fn identical_streams_score_one() {
        let a = vec![insn(1), insn(2), insn(3)];
        assert_eq!(compare_insns(&a, &a), 1.0);
    }

    #[test]
    fn disjoint_streams_score_zero() {
        let a = vec![insn(1), insn(2), insn(3)];
        let b = vec![insn(7), insn(8), insn(9)];
        assert_eq!(compare_insns(&a, &b), 0.0);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = vec![insn(1), insn(2), insn(3), insn(4)];
        let b = vec![insn(1), insn(2), insn(9)];
        assert_eq!(compare_insns(&a, &b), compare_insns(&b, &a));
    }

    #[test]
    fn var_renames_do_not_degrade_similarity() {
        let a: Vec<Insn> = (0..100)
            .map(|i| Insn::with(21, Operand::VarSlot(i as u16)))
            .collect();
        let b: Vec<Insn> = (0..100)
            .map(|i| Insn::with(21, Operand::VarSlot((i + 3) as u16)))
            .collect();

        assert!(compare_insns(&a, &b) >= 0.99);
    }

    #[test]
    fn count_similarity() {
        assert_eq!(compare_counts(3, 3), 1.0);
        assert_eq!(compare_counts(0, 0), 1.0);
        assert_eq!(compare_counts(0, 4), 0.0);
        assert!(compare_counts(3, 4) > 0.7);
    }

    #[test]
    fn potential_equality_respects_existing_matches() {
        let mut builder = GraphBuilder::new();
        builder.class(Side::A, ClassDecl::new("a").obfuscated());
        builder.class(Side::B, ClassDecl::new("x").obfuscated());
        builder.class(Side::B, ClassDecl::new("y").obfuscated());
        let mut env = builder.build().unwrap();

        let a = env.cls_by_id(Side::A, "La;").unwrap();
        let x = env.cls_by_id(Side::B, "Lx;").unwrap();
        let y = env.cls_by_id(Side::B, "Ly;").unwrap();

        assert!(check_potential_equality(&env, a, x));

        env.set_class_match(a, Some(x));
        env.set_class_match(x, Some(a));

        assert!(check_potential_equality(&env, a, x));
        assert!(!check_potential_equality(&env, a, y));
        assert!(!check_potential_equality(&env, y, x));
    }
}
