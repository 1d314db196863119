//! Method classifier criteria.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::classifier::util::{
    check_potential_equality, compare_counts, compare_positions, compare_sets, match_consistent,
    method_insn_similarity, numeric_constants, referenced_types, string_constants,
};
use crate::classifier::{Classifier, ANY, FULL_UP, INTERMEDIATE_UP};
use crate::graph::{MatchEnv, MethodId};

static CLASSIFIER: Lazy<Classifier<MethodId>> = Lazy::new(build);

pub fn method_classifier() -> &'static Classifier<MethodId> {
    &CLASSIFIER
}

fn build() -> Classifier<MethodId> {
    let mut c = Classifier::new(check);

    c.register("return type", 5.0, ANY, ret_type);
    c.register("arg count", 3.0, ANY, arg_count);
    c.register("arg types", 10.0, ANY, arg_types);
    c.register("position", 2.0, ANY, position);
    c.register("hierarchy size", 2.0, ANY, hierarchy_size);
    c.register("string constants", 5.0, INTERMEDIATE_UP, str_constants);
    c.register("numeric constants", 5.0, INTERMEDIATE_UP, num_constants);
    c.register("class references", 4.0, INTERMEDIATE_UP, class_references);
    c.register("code", 12.0, FULL_UP, code);

    c
}

/// Potential equality for methods: consistent match links and a
/// compatible signature (potentially equal return types, pairwise
/// potentially-equal arg types).
fn check(a: MethodId, b: MethodId, env: &MatchEnv) -> bool {
    let ma = env.method(a);
    let mb = env.method(b);

    if !match_consistent(ma.matched(), b, mb.matched().is_some()) {
        return false;
    }

    if !check_potential_equality(env, ma.ret_type(), mb.ret_type()) {
        return false;
    }

    if ma.args().len() != mb.args().len() {
        return false;
    }

    ma.args().iter().zip(mb.args()).all(|(&va, &vb)| {
        check_potential_equality(env, env.var(va).var_type(), env.var(vb).var_type())
    })
}

fn ret_type(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    // The gate already established potential equality of the return
    // types; the criterion rewards exact descriptor agreement on top.
    if env.class(env.method(a).ret_type()).id() == env.class(env.method(b).ret_type()).id() {
        1.0
    } else {
        0.5
    }
}

fn arg_count(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    compare_counts(env.method(a).args().len(), env.method(b).args().len())
}

/// Exact descriptor agreement over the arg type lists; the gate already
/// guarantees positional potential equality.
fn arg_types(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    let args_a = env.method(a).args();
    let args_b = env.method(b).args();
    let denom = args_a.len().max(args_b.len());

    if denom == 0 {
        return 1.0;
    }

    let total: f64 = args_a
        .iter()
        .zip(args_b)
        .map(|(&va, &vb)| {
            if env.class(env.var(va).var_type()).id() == env.class(env.var(vb).var_type()).id() {
                1.0
            } else {
                0.5
            }
        })
        .sum();

    total / denom as f64
}

fn position(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    let ma = env.method(a);
    let mb = env.method(b);

    compare_positions(
        ma.position(),
        env.class(ma.class()).methods().len(),
        mb.position(),
        env.class(mb.class()).methods().len(),
    )
}

fn hierarchy_size(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    compare_counts(env.hierarchy_members(a).len(), env.hierarchy_members(b).len())
}

fn str_constants(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    let mut set_a = HashSet::new();
    let mut set_b = HashSet::new();
    string_constants(env.method(a).insns(), &mut set_a);
    string_constants(env.method(b).insns(), &mut set_b);
    compare_sets(&set_a, &set_b)
}

fn num_constants(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    let mut set_a = HashSet::new();
    let mut set_b = HashSet::new();
    numeric_constants(env.method(a).insns(), &mut set_a);
    numeric_constants(env.method(b).insns(), &mut set_b);
    compare_sets(&set_a, &set_b)
}

/// Greedy overlap of the type references each body makes, under
/// potential equality.
fn class_references(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    let mut refs_a = Vec::new();
    let mut refs_b = Vec::new();
    referenced_types(env, a, &mut refs_a);
    referenced_types(env, b, &mut refs_b);

    if refs_a.is_empty() && refs_b.is_empty() {
        return 1.0;
    }

    let mut used = vec![false; refs_b.len()];
    let mut matched = 0;

    for x in refs_a.iter() {
        for (slot, y) in refs_b.iter().enumerate() {
            if !used[slot] && check_potential_equality(env, *x, *y) {
                used[slot] = true;
                matched += 1;
                break;
            }
        }
    }

    2.0 * matched as f64 / (refs_a.len() + refs_b.len()) as f64
}

fn code(a: MethodId, b: MethodId, env: &MatchEnv) -> f64 {
    method_insn_similarity(env, a, b)
}
