//! Class classifier criteria.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::cache::CacheKind;
use crate::classifier::util::{
    check_potential_equality, compare_cls_sets, compare_counts, compare_sets,
    method_insn_similarity, numeric_constants, string_constants,
};
use crate::classifier::{Classifier, ANY, FULL_UP, INTERMEDIATE_UP};
use crate::graph::{ClassId, MatchEnv, MethodId};

static CLASSIFIER: Lazy<Classifier<ClassId>> = Lazy::new(build);

pub fn class_classifier() -> &'static Classifier<ClassId> {
    &CLASSIFIER
}

fn build() -> Classifier<ClassId> {
    let mut c = Classifier::new(check);

    c.register("hierarchy depth", 1.0, ANY, hierarchy_depth);
    c.register("parent class", 4.0, ANY, parent_class);
    c.register("child classes", 3.0, ANY, child_classes);
    c.register("interfaces", 3.0, ANY, interfaces);
    c.register("method count", 3.0, ANY, method_count);
    c.register("field count", 3.0, ANY, field_count);
    c.register("similar methods", 10.0, INTERMEDIATE_UP, similar_methods);
    c.register("string constants", 8.0, INTERMEDIATE_UP, str_constants);
    c.register("numeric constants", 6.0, INTERMEDIATE_UP, num_constants);
    c.register("code", 12.0, FULL_UP, code);

    c
}

fn check(a: ClassId, b: ClassId, env: &MatchEnv) -> bool {
    check_potential_equality(env, a, b)
}

fn depth(env: &MatchEnv, cls: ClassId) -> usize {
    let mut current = cls;
    let mut depth = 0;

    while let Some(superclass) = env.class(current).superclass() {
        depth += 1;
        current = superclass;
    }

    depth
}

fn hierarchy_depth(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    compare_counts(depth(env, a), depth(env, b))
}

fn parent_class(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    match (env.class(a).superclass(), env.class(b).superclass()) {
        (None, None) => 1.0,
        (Some(sa), Some(sb)) => {
            if check_potential_equality(env, sa, sb) {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn child_classes(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    compare_cls_sets(env, env.class(a).children(), env.class(b).children())
}

fn interfaces(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    compare_cls_sets(env, env.class(a).interfaces(), env.class(b).interfaces())
}

fn method_count(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    compare_counts(env.class(a).methods().len(), env.class(b).methods().len())
}

fn field_count(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    compare_counts(env.class(a).fields().len(), env.class(b).fields().len())
}

/// Multiset overlap of method shapes, with obfuscated type names erased
/// so the shape survives renaming.
fn similar_methods(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    let shapes_a = method_shapes(env, a);
    let shapes_b = method_shapes(env, b);

    if shapes_a.is_empty() && shapes_b.is_empty() {
        return 1.0;
    }

    let total = shapes_a.len() + shapes_b.len();
    let mut remaining = shapes_b;
    let mut matched = 0;

    for shape in shapes_a {
        if let Some(slot) = remaining.iter().position(|other| *other == shape) {
            remaining.swap_remove(slot);
            matched += 1;
        }
    }

    2.0 * matched as f64 / total as f64
}

fn method_shapes(env: &MatchEnv, cls: ClassId) -> Vec<(usize, String)> {
    env.class(cls)
        .methods()
        .iter()
        .map(|&m| {
            let method = env.method(m);
            let ret = env.class(method.ret_type());
            let ret_shape = if ret.is_name_obfuscated() {
                "*"
            } else {
                ret.id()
            };

            (method.args().len(), ret_shape.to_string())
        })
        .collect()
}

fn str_constants(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    let mut set_a = HashSet::new();
    let mut set_b = HashSet::new();

    for &m in env.class(a).methods() {
        string_constants(env.method(m).insns(), &mut set_a);
    }

    for &m in env.class(b).methods() {
        string_constants(env.method(m).insns(), &mut set_b);
    }

    compare_sets(&set_a, &set_b)
}

fn num_constants(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    let mut set_a = HashSet::new();
    let mut set_b = HashSet::new();

    for &m in env.class(a).methods() {
        numeric_constants(env.method(m).insns(), &mut set_a);
    }

    for &m in env.class(b).methods() {
        numeric_constants(env.method(m).insns(), &mut set_b);
    }

    compare_sets(&set_a, &set_b)
}

/// Aggregate instruction similarity over position-paired real methods.
fn code(a: ClassId, b: ClassId, env: &MatchEnv) -> f64 {
    env.cache()
        .get_or_insert_with(CacheKind::ClassInsnSimilarity, a.raw(), b.raw(), || {
            let methods_a: Vec<_> = real_methods_with_code(env, a);
            let methods_b: Vec<_> = real_methods_with_code(env, b);

            if methods_a.is_empty() && methods_b.is_empty() {
                return 1.0;
            }

            if methods_a.is_empty() || methods_b.is_empty() {
                return 0.0;
            }

            let total: f64 = methods_a
                .iter()
                .zip(&methods_b)
                .map(|(&ma, &mb)| method_insn_similarity(env, ma, mb))
                .sum();

            total / methods_a.len().max(methods_b.len()) as f64
        })
}

fn real_methods_with_code(env: &MatchEnv, cls: ClassId) -> Vec<MethodId> {
    env.class(cls)
        .methods()
        .iter()
        .copied()
        .filter(|&m| env.method(m).is_real() && !env.method(m).insns().is_empty())
        .collect()
}
