//! Method-var classifier criteria.

use once_cell::sync::Lazy;

use crate::classifier::util::{check_var_potential_equality, compare_counts, compare_ranges};
use crate::classifier::{Classifier, ANY, FULL_UP};
use crate::graph::{MatchEnv, VarId};

static CLASSIFIER: Lazy<Classifier<VarId>> = Lazy::new(build);

pub fn var_classifier() -> &'static Classifier<VarId> {
    &CLASSIFIER
}

fn build() -> Classifier<VarId> {
    let mut c = Classifier::new(check);

    c.register("type", 10.0, ANY, var_type);
    c.register("position", 3.0, ANY, position);
    c.register("lv index", 2.0, ANY, lv_index);
    c.register("lifetime", 4.0, FULL_UP, lifetime);

    c
}

fn check(a: VarId, b: VarId, env: &MatchEnv) -> bool {
    check_var_potential_equality(env, a, b)
}

fn var_type(a: VarId, b: VarId, env: &MatchEnv) -> f64 {
    // The gate already established potential equality of the types; the
    // criterion rewards exact descriptor agreement on top of it.
    if env.class(env.var(a).var_type()).id() == env.class(env.var(b).var_type()).id() {
        1.0
    } else {
        0.5
    }
}

fn position(a: VarId, b: VarId, env: &MatchEnv) -> f64 {
    compare_counts(env.var(a).index() as usize, env.var(b).index() as usize)
}

fn lv_index(a: VarId, b: VarId, env: &MatchEnv) -> f64 {
    compare_counts(env.var(a).lv_index() as usize, env.var(b).lv_index() as usize)
}

fn lifetime(a: VarId, b: VarId, env: &MatchEnv) -> f64 {
    let va = env.var(a);
    let vb = env.var(b);

    compare_ranges(
        va.start_insn(),
        va.end_insn(),
        vb.start_insn(),
        vb.end_insn(),
    )
}
