//! Driver behavior: parallel auto-match passes, sanitize, merge-match
//! and status reporting.

mod common;

use classmatch::graph::{ClassDecl, FieldDecl, GraphBuilder, MethodDecl, Operand, Side};
use classmatch::parallel::no_progress;
use classmatch::{Level, Matcher};
use common::{init_logs, insns, twin_classes};

#[test]
fn conflicting_winners_are_discarded() {
    init_logs();

    // Two indistinguishable subjects both pick the same peer; neither may
    // keep it.
    let mut builder = GraphBuilder::new();
    twin_classes(&mut builder, "a1", "p", "same");
    builder.class(
        Side::A,
        ClassDecl::new("a2").obfuscated().method(
            MethodDecl::new("m", "()V")
                .obfuscated()
                .insns(insns("same", &[21, 54, 21, 96, 172])),
        ),
    );

    let mut matcher = Matcher::new(builder.build().unwrap());
    let matched = matcher
        .auto_match_classes_at(Level::Full, no_progress())
        .unwrap();

    assert!(!matched, "contested peer must not be committed");

    let env = matcher.env();
    let p = env.cls_by_id(Side::B, "Lp;").unwrap();
    assert_eq!(env.class(p).matched(), None);

    let a1 = env.cls_by_id(Side::A, "La1;").unwrap();
    let a2 = env.cls_by_id(Side::A, "La2;").unwrap();
    assert_eq!(env.class(a1).matched(), None);
    assert_eq!(env.class(a2).matched(), None);
}

#[test]
fn auto_match_all_pairs_distinct_classes_and_members() {
    init_logs();

    let mut builder = GraphBuilder::new();

    for (side, one, two) in [(Side::A, "u1", "u2"), (Side::B, "v1", "v2")] {
        builder.class(
            side,
            ClassDecl::new(one)
                .obfuscated()
                .method(
                    MethodDecl::new("p", "()V")
                        .obfuscated()
                        .insns(insns("alpha", &[21, 54, 96, 172])),
                )
                .field(FieldDecl::new("f", "I").obfuscated().value(Operand::Int(42))),
        );
        builder.class(
            side,
            ClassDecl::new(two)
                .obfuscated()
                .method(
                    MethodDecl::new("q", "(I)I")
                        .obfuscated()
                        .insns(insns("beta", &[26, 4, 96, 172])),
                )
                .method(
                    MethodDecl::new("r", "()Ljava/lang/String;")
                        .obfuscated()
                        .insns(insns("gamma", &[18, 176])),
                ),
        );
    }

    let mut matcher = Matcher::new(builder.build().unwrap());
    matcher.auto_match_all(no_progress()).unwrap();

    let env = matcher.env();
    let u1 = env.cls_by_id(Side::A, "Lu1;").unwrap();
    let u2 = env.cls_by_id(Side::A, "Lu2;").unwrap();
    let v1 = env.cls_by_id(Side::B, "Lv1;").unwrap();
    let v2 = env.cls_by_id(Side::B, "Lv2;").unwrap();

    assert_eq!(env.class(u1).matched(), Some(v1));
    assert_eq!(env.class(u2).matched(), Some(v2));

    let status = matcher.status(true);
    assert_eq!(status.total_class_count, 2);
    assert_eq!(status.matched_class_count, 2);
    assert_eq!(status.total_method_count, 3);
    assert_eq!(status.matched_method_count, 3);
    assert_eq!(status.total_field_count, 1);
    assert_eq!(status.matched_field_count, 1);
    assert_eq!(status.total_method_arg_count, 1);
    assert_eq!(status.matched_method_arg_count, 1);
}

fn merge_fixture(with_alternative: bool) -> Matcher {
    let mut builder = GraphBuilder::new();

    builder.class(
        Side::A,
        ClassDecl::new("ca")
            .obfuscated()
            .method(
                MethodDecl::new("m", "()V")
                    .obfuscated()
                    .insns(insns("original", &[21, 54, 21, 96, 172, 21, 54])),
            )
            .method(MethodDecl::new("z", "(J)J").obfuscated()),
    );
    builder.class(
        Side::B,
        ClassDecl::new("cb")
            .obfuscated()
            .method(
                MethodDecl::new("m", "()V")
                    .obfuscated()
                    .insns(insns("rewritten", &[1, 2, 3, 4, 5, 6, 7])),
            )
            .method(MethodDecl::new("z", "(J)J").obfuscated()),
    );

    if with_alternative {
        builder.class(
            Side::B,
            ClassDecl::new("cbalt")
                .obfuscated()
                .method(
                    MethodDecl::new("m", "()V")
                        .obfuscated()
                        .insns(insns("original", &[21, 54, 21, 96, 172, 21, 54])),
                )
                .method(MethodDecl::new("z", "(J)J").obfuscated()),
        );
    }

    let mut matcher = Matcher::new(builder.build().unwrap());
    let env = matcher.env();
    let ca = env.cls_by_id(Side::A, "Lca;").unwrap();
    let cb = env.cls_by_id(Side::B, "Lcb;").unwrap();
    let m_a = env.method_by_id(ca, "m()V").unwrap();
    let m_b = env.method_by_id(cb, "m()V").unwrap();

    matcher.match_classes(ca, cb).unwrap();
    matcher.match_methods(m_a, m_b).unwrap();
    matcher
}

#[test]
fn merge_match_demotes_divergent_bodies() {
    init_logs();

    let mut matcher = merge_fixture(false);
    let matched = matcher.merge_match_classes(no_progress()).unwrap();

    assert!(!matched, "no better peer exists");

    let env = matcher.env();
    let ca = env.cls_by_id(Side::A, "Lca;").unwrap();
    let m_a = env.method_by_id(ca, "m()V").unwrap();

    assert_eq!(env.class(ca).matched(), None, "divergent class demoted");
    assert_eq!(env.method(m_a).matched(), None);
}

#[test]
fn merge_match_reassigns_to_a_better_peer() {
    init_logs();

    let mut matcher = merge_fixture(true);
    let matched = matcher.merge_match_classes(no_progress()).unwrap();

    assert!(matched);

    let env = matcher.env();
    let ca = env.cls_by_id(Side::A, "Lca;").unwrap();
    let cb = env.cls_by_id(Side::B, "Lcb;").unwrap();
    let cbalt = env.cls_by_id(Side::B, "Lcbalt;").unwrap();

    assert_eq!(env.class(ca).matched(), Some(cbalt));
    assert_eq!(env.class(cb).matched(), None);
}

#[test]
fn status_skips_placeholders_and_library_classes() {
    init_logs();

    let mut builder = GraphBuilder::new();
    builder.class(
        Side::A,
        ClassDecl::new("real")
            .obfuscated()
            .method(MethodDecl::new("m", "()V").obfuscated())
            .method(MethodDecl::new("ghost", "()V").obfuscated().placeholder())
            .field(FieldDecl::new("g", "I").obfuscated().placeholder()),
    );
    builder.class(Side::A, ClassDecl::new("lib").library());
    builder.class(Side::B, ClassDecl::new("other").obfuscated());

    let matcher = Matcher::new(builder.build().unwrap());

    let inputs_only = matcher.status(true);
    assert_eq!(inputs_only.total_class_count, 1);
    assert_eq!(inputs_only.total_method_count, 1, "placeholder skipped");
    assert_eq!(inputs_only.total_field_count, 0, "placeholder skipped");

    let everything = matcher.status(false);
    assert!(
        everything.total_class_count > inputs_only.total_class_count,
        "library and synthesized classes count without the filter"
    );
}
