//! Automatic matching passes.
//!
//! Every pass has the same two-phase shape: score eligible side-A
//! subjects against side-B candidates in parallel, discard ambiguous
//! winners, then commit the survivors serially through the arbiter.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;

use crate::classifier::ranker::{check_rank, raw_from_score};
use crate::classifier::{
    class_classifier, field_classifier, method_classifier, var_classifier, Classifier, Level,
};
use crate::errors::Result;
use crate::graph::{ClassId, MatchEnv, MethodId, VarId};
use crate::matching::Matcher;
use crate::parallel::{run_in_parallel, Progress};

impl Matcher {
    /// Run every automatic pass to a fixed point: classes at Initial,
    /// then each richer level, then args and locals until quiet.
    pub fn auto_match_all(&mut self, progress: Progress) -> Result<()> {
        // One extra Initial pass picks up candidates enabled by the first.
        if self.auto_match_classes_at(Level::Initial, progress)? {
            self.auto_match_classes_at(Level::Initial, progress)?;
        }

        self.auto_match_level(Level::Intermediate, progress)?;
        self.auto_match_level(Level::Full, progress)?;
        self.auto_match_level(Level::Extra, progress)?;

        loop {
            let mut matched_any = self.auto_match_method_args_at(Level::Full, progress)?;
            matched_any |= self.auto_match_method_vars_at(Level::Full, progress)?;

            if !matched_any {
                break;
            }
        }

        self.env.cache().clear();
        Ok(())
    }

    /// Methods and fields to a fixed point, retrying classes whenever the
    /// member passes stall; stop once classes stall twice in a row.
    fn auto_match_level(&mut self, level: Level, progress: Progress) -> Result<()> {
        let mut matched_classes_before = true;

        loop {
            let mut matched_any = self.auto_match_methods_at(level, progress)?;
            matched_any |= self.auto_match_fields_at(level, progress)?;

            if !matched_any && !matched_classes_before {
                break;
            }

            matched_classes_before = self.auto_match_classes_at(level, progress)?;
            matched_any |= matched_classes_before;

            if !matched_any {
                break;
            }
        }

        Ok(())
    }

    pub fn auto_match_classes(&mut self, progress: Progress) -> Result<bool> {
        self.auto_match_classes_at(self.config.auto_match_level, progress)
    }

    pub fn auto_match_classes_at(&mut self, level: Level, progress: Progress) -> Result<bool> {
        let abs = self.config.abs_class_threshold;
        let rel = self.config.rel_class_threshold;

        let eligible = |env: &MatchEnv, cls: ClassId| {
            let class = env.class(cls);
            class.is_input() && class.is_name_obfuscated() && !class.has_match()
        };

        let subjects: Vec<ClassId> = self
            .env
            .classes_a()
            .iter()
            .copied()
            .filter(|&cls| eligible(&self.env, cls))
            .collect();
        let candidates: Vec<ClassId> = self
            .env
            .classes_b()
            .iter()
            .copied()
            .filter(|&cls| eligible(&self.env, cls))
            .collect();

        let matches = {
            let env = &self.env;
            let classifier = class_classifier();
            let max_score = classifier.max_score(level);
            let max_mismatch = mismatch_budget(abs, rel, max_score);

            let results = run_in_parallel(
                &subjects,
                |&cls| {
                    let ranking = classifier.rank(cls, &candidates, level, env, max_mismatch);

                    Ok(check_rank(&ranking, abs, rel, max_score)
                        .then(|| (cls, ranking[0].candidate)))
                },
                progress,
            )?;

            sanitize_matches(results.into_iter().flatten().collect())
        };

        for &(a, b) in &matches {
            self.match_classes(a, b)?;
        }

        info!(
            "Auto matched {} classes ({} unmatched, {} total)",
            matches.len(),
            subjects.len() - matches.len(),
            self.env.classes_a().len()
        );

        Ok(!matches.is_empty())
    }

    pub fn auto_match_methods(&mut self, progress: Progress) -> Result<bool> {
        self.auto_match_methods_at(self.config.auto_match_level, progress)
    }

    pub fn auto_match_methods_at(&mut self, level: Level, progress: Progress) -> Result<bool> {
        let abs = self.config.abs_method_threshold;
        let rel = self.config.rel_method_threshold;

        let (matches, unmatched) = self.rank_members(
            method_classifier(),
            level,
            abs,
            rel,
            |env, cls| env.class(cls).methods().to_vec(),
            |env, m| env.method(m).has_match(),
            progress,
        )?;

        for &(a, b) in &matches {
            self.match_methods(a, b)?;
        }

        info!(
            "Auto matched {} methods ({} unmatched)",
            matches.len(),
            unmatched
        );

        Ok(!matches.is_empty())
    }

    pub fn auto_match_fields(&mut self, progress: Progress) -> Result<bool> {
        self.auto_match_fields_at(self.config.auto_match_level, progress)
    }

    pub fn auto_match_fields_at(&mut self, level: Level, progress: Progress) -> Result<bool> {
        let abs = self.config.abs_field_threshold;
        let rel = self.config.rel_field_threshold;

        let (matches, unmatched) = self.rank_members(
            field_classifier(),
            level,
            abs,
            rel,
            |env, cls| env.class(cls).fields().to_vec(),
            |env, f| env.field(f).has_match(),
            progress,
        )?;

        for &(a, b) in &matches {
            self.match_fields(a, b)?;
        }

        info!(
            "Auto matched {} fields ({} unmatched)",
            matches.len(),
            unmatched
        );

        Ok(!matches.is_empty())
    }

    pub fn auto_match_method_args(&mut self, progress: Progress) -> Result<bool> {
        self.auto_match_method_args_at(self.config.auto_match_level, progress)
    }

    pub fn auto_match_method_args_at(&mut self, level: Level, progress: Progress) -> Result<bool> {
        self.auto_match_vars(true, level, progress)
    }

    pub fn auto_match_method_vars(&mut self, progress: Progress) -> Result<bool> {
        self.auto_match_method_vars_at(self.config.auto_match_level, progress)
    }

    pub fn auto_match_method_vars_at(&mut self, level: Level, progress: Progress) -> Result<bool> {
        self.auto_match_vars(false, level, progress)
    }

    /// Rank unmatched members of matched classes, one work item per
    /// class. Returns sanitized pairs plus the count that failed ranking.
    fn rank_members<T>(
        &self,
        classifier: &Classifier<T>,
        level: Level,
        abs: f64,
        rel: f64,
        members: impl Fn(&MatchEnv, ClassId) -> Vec<T> + Sync,
        is_matched: impl Fn(&MatchEnv, T) -> bool + Sync,
        progress: Progress,
    ) -> Result<(Vec<(T, T)>, usize)>
    where
        T: Copy + Eq + Hash + Send + Sync,
    {
        let env = &self.env;

        let classes: Vec<ClassId> = env
            .classes_a()
            .iter()
            .copied()
            .filter(|&cls| {
                let class = env.class(cls);

                class.is_input()
                    && class.has_match()
                    && members(env, cls)
                        .iter()
                        .any(|&member| !is_matched(env, member))
            })
            .collect();

        if classes.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let max_score = classifier.max_score(level);
        let max_mismatch = mismatch_budget(abs, rel, max_score);
        let total_unmatched = AtomicUsize::new(0);

        let results = run_in_parallel(
            &classes,
            |&cls| {
                let peer = env.class(cls).matched().expect("filtered on match");
                let candidates = members(env, peer);
                let mut found = Vec::new();
                let mut unmatched = 0;

                for member in members(env, cls) {
                    if is_matched(env, member) {
                        continue;
                    }

                    let ranking = classifier.rank(member, &candidates, level, env, max_mismatch);

                    if check_rank(&ranking, abs, rel, max_score) {
                        found.push((member, ranking[0].candidate));
                    } else {
                        unmatched += 1;
                    }
                }

                total_unmatched.fetch_add(unmatched, Ordering::Relaxed);
                Ok(found)
            },
            progress,
        )?;

        let matches = sanitize_matches(results.into_iter().flatten().collect());
        Ok((matches, total_unmatched.load(Ordering::Relaxed)))
    }

    fn auto_match_vars(&mut self, args: bool, level: Level, progress: Progress) -> Result<bool> {
        let abs = self.config.abs_var_threshold;
        let rel = self.config.rel_var_threshold;

        let vars_of = |env: &MatchEnv, m: MethodId| -> Vec<VarId> {
            if args {
                env.method(m).args().to_vec()
            } else {
                env.method(m).locals().to_vec()
            }
        };

        let (matches, unmatched) = {
            let env = &self.env;

            let methods: Vec<MethodId> = env
                .classes_a()
                .iter()
                .filter(|&&cls| env.class(cls).is_input() && env.class(cls).has_match())
                .flat_map(|&cls| env.class(cls).methods().iter().copied())
                .filter(|&m| {
                    env.method(m).has_match()
                        && vars_of(env, m).iter().any(|&v| !env.var(v).has_match())
                })
                .collect();

            if methods.is_empty() {
                (Vec::new(), 0)
            } else {
                let classifier = var_classifier();
                let max_score = classifier.max_score(level);
                let max_mismatch = mismatch_budget(abs, rel, max_score);
                let total_unmatched = AtomicUsize::new(0);

                let results = run_in_parallel(
                    &methods,
                    |&m| {
                        let peer = env.method(m).matched().expect("filtered on match");
                        let candidates = vars_of(env, peer);
                        let mut found = Vec::new();
                        let mut unmatched = 0;

                        for var in vars_of(env, m) {
                            if env.var(var).has_match() {
                                continue;
                            }

                            let ranking =
                                classifier.rank(var, &candidates, level, env, max_mismatch);

                            if check_rank(&ranking, abs, rel, max_score) {
                                found.push((var, ranking[0].candidate));
                            } else {
                                unmatched += 1;
                            }
                        }

                        total_unmatched.fetch_add(unmatched, Ordering::Relaxed);
                        Ok(found)
                    },
                    progress,
                )?;

                (
                    sanitize_matches(results.into_iter().flatten().collect()),
                    total_unmatched.load(Ordering::Relaxed),
                )
            }
        };

        for &(a, b) in &matches {
            self.match_vars(a, b)?;
        }

        info!(
            "Auto matched {} method {}s ({} unmatched)",
            matches.len(),
            if args { "arg" } else { "var" },
            unmatched
        );

        Ok(!matches.is_empty())
    }
}

/// Mismatch budget handed to classifiers: the raw score a candidate may
/// lose before it can no longer clear the acceptance threshold.
pub(crate) fn mismatch_budget(abs: f64, rel: f64, max_score: f64) -> f64 {
    max_score - raw_from_score(abs * (1.0 - rel), max_score)
}

/// Drop every pairing whose peer was claimed by more than one subject.
/// Conflicts are discarded wholesale, never resolved.
pub(crate) fn sanitize_matches<T: Eq + Hash + Copy>(matches: Vec<(T, T)>) -> Vec<(T, T)> {
    let mut claims: HashMap<T, usize> = HashMap::with_capacity(matches.len());

    for &(_, peer) in &matches {
        *claims.entry(peer).or_insert(0) += 1;
    }

    matches
        .into_iter()
        .filter(|(_, peer)| claims[peer] == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_discards_contested_peers() {
        let matches = vec![(1u32, 10u32), (2, 10), (3, 11)];
        let sanitized = sanitize_matches(matches);

        assert_eq!(sanitized, vec![(3, 11)]);
    }

    #[test]
    fn sanitize_keeps_unique_claims() {
        let matches = vec![(1u32, 10u32), (2, 11)];
        assert_eq!(sanitize_matches(matches.clone()), matches);
    }

    #[test]
    fn mismatch_budget_shrinks_with_stricter_thresholds() {
        let lax = mismatch_budget(0.5, 0.085, 10.0);
        let strict = mismatch_budget(0.95, 0.085, 10.0);

        assert!(strict < lax);
        assert!(strict > 0.0);
    }
}
