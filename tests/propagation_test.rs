//! Name propagation across method hierarchy cliques.

mod common;

use classmatch::graph::{ClassDecl, GraphBuilder, MethodDecl, Side};
use classmatch::parallel::no_progress;
use classmatch::Matcher;
use common::init_logs;

/// Three classes in a chain on side B, each overriding `run(I)V`.
fn hierarchy_matcher() -> Matcher {
    let mut builder = GraphBuilder::new();

    builder.class(
        Side::B,
        ClassDecl::new("c1").obfuscated().method(MethodDecl::new("a", "(I)V").obfuscated()),
    );
    builder.class(
        Side::B,
        ClassDecl::new("c2")
            .obfuscated()
            .extends("c1")
            .method(MethodDecl::new("a", "(I)V").obfuscated()),
    );
    builder.class(
        Side::B,
        ClassDecl::new("c3")
            .obfuscated()
            .extends("c2")
            .method(MethodDecl::new("a", "(I)V").obfuscated()),
    );

    Matcher::new(builder.build().unwrap())
}

#[test]
fn names_spread_to_unnamed_hierarchy_members() {
    init_logs();

    let mut matcher = hierarchy_matcher();
    let env = matcher.env();

    let c1 = env.cls_by_id(Side::B, "Lc1;").unwrap();
    let c2 = env.cls_by_id(Side::B, "Lc2;").unwrap();
    let c3 = env.cls_by_id(Side::B, "Lc3;").unwrap();
    let m1 = env.method_by_id(c1, "a(I)V").unwrap();
    let m2 = env.method_by_id(c2, "a(I)V").unwrap();
    let m3 = env.method_by_id(c3, "a(I)V").unwrap();
    let m1_arg = env.method(m1).args()[0];
    let m2_arg = env.method(m2).args()[0];
    let m3_arg = env.method(m3).args()[0];

    // Only m1 carries the method name; only m2 carries the arg name.
    matcher.set_method_mapped_name(m1, Some("foo".to_string()));
    matcher.set_var_mapped_name(m2_arg, Some("x".to_string()));

    let propagated = matcher.propagate_names(no_progress());
    assert!(propagated);

    let env = matcher.env();
    assert_eq!(env.method_mapped_name(m1), Some("foo"));
    assert_eq!(env.method_mapped_name(m2), Some("foo"));
    assert_eq!(env.method_mapped_name(m3), Some("foo"));
    assert_eq!(env.var_mapped_name(m1_arg), Some("x"));
    assert_eq!(env.var_mapped_name(m2_arg), Some("x"));
    assert_eq!(env.var_mapped_name(m3_arg), Some("x"));
}

#[test]
fn fully_named_cliques_are_left_alone() {
    init_logs();

    let mut matcher = hierarchy_matcher();
    let env = matcher.env();

    let c1 = env.cls_by_id(Side::B, "Lc1;").unwrap();
    let c2 = env.cls_by_id(Side::B, "Lc2;").unwrap();
    let c3 = env.cls_by_id(Side::B, "Lc3;").unwrap();
    let m1 = env.method_by_id(c1, "a(I)V").unwrap();
    let m2 = env.method_by_id(c2, "a(I)V").unwrap();
    let m3 = env.method_by_id(c3, "a(I)V").unwrap();

    for (m, name) in [(m1, "one"), (m2, "two"), (m3, "three")] {
        matcher.set_method_mapped_name(m, Some(name.to_string()));
        let arg = matcher.env().method(m).args()[0];
        matcher.set_var_mapped_name(arg, Some(format!("arg_{name}")));
    }

    let propagated = matcher.propagate_names(no_progress());
    assert!(!propagated, "nothing is missing, nothing to spread");

    let env = matcher.env();
    assert_eq!(env.method_mapped_name(m2), Some("two"), "names untouched");
}

#[test]
fn propagation_without_names_is_a_no_op() {
    init_logs();

    let mut matcher = hierarchy_matcher();
    assert!(!matcher.propagate_names(no_progress()));
}

#[test]
fn singleton_hierarchies_are_skipped() {
    init_logs();

    let mut builder = GraphBuilder::new();
    builder.class(
        Side::B,
        ClassDecl::new("solo").obfuscated().method(MethodDecl::new("a", "()V").obfuscated()),
    );
    builder.class(
        Side::B,
        ClassDecl::new("solo2").obfuscated().method(MethodDecl::new("a", "()V").obfuscated()),
    );

    let mut matcher = Matcher::new(builder.build().unwrap());
    let env = matcher.env();
    let solo = env.cls_by_id(Side::B, "Lsolo;").unwrap();
    let solo2 = env.cls_by_id(Side::B, "Lsolo2;").unwrap();
    let m = env.method_by_id(solo, "a()V").unwrap();
    let other = env.method_by_id(solo2, "a()V").unwrap();

    matcher.set_method_mapped_name(m, Some("named".to_string()));

    // No supertype relationship: same signature alone is not a hierarchy.
    assert!(!matcher.propagate_names(no_progress()));
    assert_eq!(matcher.env().method_mapped_name(other), None);
}
