//! Merge-match: demote classes whose matched methods have divergent
//! bodies, then give the expanded unmatched pool another chance.

use log::info;

use crate::classifier::ranker::check_rank;
use crate::classifier::util::method_insn_similarity;
use crate::classifier::class_classifier;
use crate::errors::Result;
use crate::graph::{ClassId, MatchEnv};
use crate::matching::auto::{mismatch_budget, sanitize_matches};
use crate::matching::Matcher;
use crate::parallel::{run_in_parallel, Progress};

/// Instruction similarity below this demotes an otherwise-matched pair.
const MERGE_MATCH_THRESHOLD: f64 = 0.99;

impl Matcher {
    /// Verify partially matched classes against their peers' bytecode and
    /// re-match whatever got demoted. Returns whether anything new was
    /// committed.
    pub fn merge_match_classes(&mut self, progress: Progress) -> Result<bool> {
        let eligible = |env: &MatchEnv, cls: ClassId| {
            let class = env.class(cls);
            class.is_input() && class.is_name_obfuscated() && !env.fully_matched(cls)
        };

        let mut unmatched_pool = Vec::new();
        let mut semi_matched = Vec::new();

        for &cls in self.env.classes_a() {
            if !eligible(&self.env, cls) {
                continue;
            }

            if self.env.class(cls).has_match() {
                semi_matched.push(cls);
            } else {
                unmatched_pool.push(cls);
            }
        }

        let considered = unmatched_pool.len() + semi_matched.len();

        let mismatches: Vec<ClassId> = {
            let env = &self.env;

            run_in_parallel(
                &semi_matched,
                |&cls| Ok(find_content_mismatch(env, cls).then_some(cls)),
                &|fraction| progress(fraction * 0.5),
            )?
            .into_iter()
            .flatten()
            .collect()
        };

        for &cls in &mismatches {
            self.unmatch_class(cls)?;
        }

        unmatched_pool.extend(mismatches);

        let matches = {
            let env = &self.env;
            let level = self.config.auto_match_level;
            let abs = self.config.abs_class_threshold;
            let rel = self.config.rel_class_threshold;
            let classifier = class_classifier();
            let max_score = classifier.max_score(level);
            let max_mismatch = mismatch_budget(abs, rel, max_score);

            let candidates: Vec<ClassId> = env
                .classes_b()
                .iter()
                .copied()
                .filter(|&cls| eligible(env, cls))
                .collect();

            let results = run_in_parallel(
                &unmatched_pool,
                |&cls| {
                    let ranking = classifier.rank(cls, &candidates, level, env, max_mismatch);

                    Ok(check_rank(&ranking, abs, rel, max_score)
                        .then(|| (cls, ranking[0].candidate)))
                },
                &|fraction| progress(0.5 + fraction * 0.5),
            )?;

            sanitize_matches(results.into_iter().flatten().collect())
        };

        for &(a, b) in &matches {
            self.match_classes(a, b)?;
        }

        info!(
            "Merge matched {} classes ({} unmatched, {} total)",
            matches.len(),
            considered - matches.len(),
            self.env.classes_a().len()
        );

        Ok(!matches.is_empty())
    }
}

/// Whether any matched method of the class diverges from its peer's
/// instruction stream.
fn find_content_mismatch(env: &MatchEnv, cls: ClassId) -> bool {
    let mut mismatched = false;

    for &method in env.class(cls).methods() {
        let m = env.method(method);

        if m.insns().is_empty() {
            continue;
        }

        let Some(peer) = m.matched() else {
            continue;
        };

        let closeness = method_insn_similarity(env, method, peer);

        if closeness < MERGE_MATCH_THRESHOLD {
            info!(
                "Method contents mismatch in {}, only matched with {closeness}",
                env.method_display(method)
            );
            mismatched = true;
        }
    }

    mismatched
}
