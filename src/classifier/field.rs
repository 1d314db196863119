//! Field classifier criteria.

use once_cell::sync::Lazy;

use crate::classifier::util::{
    check_potential_equality, compare_positions, match_consistent,
};
use crate::classifier::{Classifier, ANY, INTERMEDIATE_UP};
use crate::graph::{FieldId, MatchEnv};

static CLASSIFIER: Lazy<Classifier<FieldId>> = Lazy::new(build);

pub fn field_classifier() -> &'static Classifier<FieldId> {
    &CLASSIFIER
}

fn build() -> Classifier<FieldId> {
    let mut c = Classifier::new(check);

    c.register("type", 10.0, ANY, field_type);
    c.register("position", 3.0, ANY, position);
    c.register("initial value", 7.0, INTERMEDIATE_UP, initial_value);

    c
}

/// Potential equality for fields: consistent match links and
/// potentially-equal types.
fn check(a: FieldId, b: FieldId, env: &MatchEnv) -> bool {
    match_consistent(env.field(a).matched(), b, env.field(b).matched().is_some())
        && check_potential_equality(env, env.field(a).field_type(), env.field(b).field_type())
}

fn field_type(a: FieldId, b: FieldId, env: &MatchEnv) -> f64 {
    // The gate already established potential equality of the types; the
    // criterion rewards exact descriptor agreement on top.
    if env.class(env.field(a).field_type()).id() == env.class(env.field(b).field_type()).id() {
        1.0
    } else {
        0.5
    }
}

fn position(a: FieldId, b: FieldId, env: &MatchEnv) -> f64 {
    let fa = env.field(a);
    let fb = env.field(b);

    compare_positions(
        fa.position(),
        env.class(fa.class()).fields().len(),
        fb.position(),
        env.class(fb.class()).fields().len(),
    )
}

fn initial_value(a: FieldId, b: FieldId, env: &MatchEnv) -> f64 {
    match (env.field(a).value(), env.field(b).value()) {
        (None, None) => 1.0,
        (Some(va), Some(vb)) if va == vb => 1.0,
        _ => 0.0,
    }
}
