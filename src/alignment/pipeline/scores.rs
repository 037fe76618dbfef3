//! Score lookup and threshold evaluation (§4.F, §9 Open Question 1).
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! get_match_score` / `_get_match_score` (the original carries two
//! identical copies of this function; here they collapse into one).

use crate::alignment::model::{AlignmentResult, Match};
use crate::err::AlignmentError;

/// Collects, for each of `score_keys`, the score of every match across
/// `results` (one inner `Vec` per key, same order as `score_keys`).
///
/// When `filter_same_query_subject` is set, a match whose subject id
/// equals its alignment's query id is skipped — grounded on
/// `alignment_results_scores`'s default self-hit filter.
pub fn alignment_results_scores(
    results: &[AlignmentResult],
    score_keys: &[&str],
    filter_same_query_subject: bool,
) -> Result<Vec<Vec<f64>>, AlignmentError> {
    let mut collected: Vec<Vec<f64>> = vec![Vec::new(); score_keys.len()];
    for result in results {
        for m in &result.matches {
            if filter_same_query_subject && m.subject == result.query_id {
                continue;
            }
            for (index, score_key) in score_keys.iter().enumerate() {
                collected[index].push(score_of(m, score_key)?);
            }
        }
    }
    Ok(collected)
}

/// Looks up `score_key` on a match, falling back to its first match-part.
///
/// Errors (Open Question 1) when the key is present on neither the match
/// nor its first match-part, rather than silently defaulting.
pub fn score_of(m: &Match, score_key: &str) -> Result<f64, AlignmentError> {
    if let Some(score) = m.scores.get(score_key) {
        return Ok(*score);
    }
    m.match_parts
        .first()
        .and_then(|part| part.scores.get(score_key))
        .copied()
        .ok_or_else(|| AlignmentError::MissingScore(score_key.to_owned()))
}

/// Checks whether a score passes a threshold (§4.F "score-threshold
/// stage with log-tolerance").
///
/// With `log_tolerance` absent, a score is accepted if it clears
/// `min_score` or undercuts `max_score`. With `log_tolerance` present, a
/// score of exactly zero is always accepted against a `max_score`, scores
/// failing `min_score`/`max_score` outright are rejected, and otherwise
/// the score is accepted only if its log10 distance from the best score's
/// log10 is within tolerance.
pub fn score_above_threshold(
    score: f64,
    min_score: Option<f64>,
    max_score: Option<f64>,
    log_tolerance: Option<f64>,
    log_best_score: Option<f64>,
) -> bool {
    match log_tolerance {
        None => {
            if let Some(min_score) = min_score {
                score >= min_score
            } else if let Some(max_score) = max_score {
                score <= max_score
            } else {
                false
            }
        }
        Some(log_tolerance) => {
            if max_score.is_some() && score == 0.0 {
                true
            } else if min_score.is_some_and(|min| score <= min) {
                false
            } else if max_score.is_some_and(|max| score >= max) {
                false
            } else if let Some(log_best_score) = log_best_score {
                (score.log10() - log_best_score).abs() < log_tolerance
            } else {
                false
            }
        }
    }
}
