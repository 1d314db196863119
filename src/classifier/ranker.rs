//! Ranking acceptance and score normalization.

use crate::classifier::RankResult;

/// Normalized score: the squared ratio of raw score to the level's
/// maximum. Squaring widens the gap between good and barely-good
/// pairings.
pub fn get_score(raw_score: f64, max_score: f64) -> f64 {
    let ratio = raw_score / max_score;
    ratio * ratio
}

/// Inverse of [`get_score`]; used once per pass to turn the acceptance
/// threshold into a raw mismatch budget for the classifiers.
pub fn raw_from_score(score: f64, max_score: f64) -> f64 {
    score.sqrt() * max_score
}

/// Accept a ranking iff the top candidate clears `abs_threshold` and the
/// runner-up (if any) trails by at least `rel_threshold`.
pub fn check_rank<T>(
    ranking: &[RankResult<T>],
    abs_threshold: f64,
    rel_threshold: f64,
    max_score: f64,
) -> bool {
    let Some(best) = ranking.first() else {
        return false;
    };

    let score = get_score(best.score, max_score);

    if score < abs_threshold {
        return false;
    }

    match ranking.get(1) {
        None => true,
        Some(next) => get_score(next.score, max_score) < score * (1.0 - rel_threshold),
    }
}
