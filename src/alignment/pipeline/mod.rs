//! Alignment filter pipeline (§4.F): a configurable sequence of stages
//! applied to parsed alignment results, ending in the fixed trio of
//! fix-matches then drop-empty.
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! filter_alignments` / `FILTER_COLLECTION`. The original wraps every
//! configured stage between an explicit `deepcopy` mapper and the
//! `fix_matches`/`filter_empty` tail; here each `AlignmentResult` is
//! already uniquely owned as it flows through the pipeline, so the
//! deep-copy stage has no Rust counterpart and is dropped (see DESIGN.md).

pub mod scores;

use crate::alignment::coverage::LengthFilter;
use crate::alignment::model::{AlignmentResult, Match};
use crate::err::{AlignmentError, ConfigError};

/// Where a stream of `AlignmentResult`s came from, used to reject score
/// keys a source cannot supply (§9 Open Question 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    BlastXml,
    BlastTabular,
    Exonerate,
}

/// One configured pipeline stage.
pub enum Stage {
    /// Keeps match-parts (and, transitively, matches) whose score clears
    /// the configured threshold.
    ScoreThreshold {
        score_key: String,
        min_score: Option<f64>,
        max_score: Option<f64>,
        score_tolerance: Option<f64>,
    },
    /// Keeps matches whose covered length clears a residue count or
    /// percentage threshold.
    MinLength(LengthFilter),
}

impl Stage {
    fn validate(&self, source: SourceKind) -> Result<(), ConfigError> {
        if let Stage::ScoreThreshold { score_key, .. } = self {
            // The tabular parser carries a real per-row `identity` value
            // (blast_tabular.rs), but never a `similarity` value.
            if source == SourceKind::BlastTabular && score_key == "similarity" {
                return Err(ConfigError::UnsupportedScoreKey {
                    score_key: score_key.clone(),
                    source: "tabular blast",
                });
            }
        }
        Ok(())
    }
}

/// A validated, ordered sequence of filter stages for one alignment
/// source.
pub struct Pipeline {
    source: SourceKind,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(source: SourceKind, stages: Vec<Stage>) -> Result<Self, ConfigError> {
        for stage in &stages {
            stage.validate(source)?;
        }
        Ok(Self { source, stages })
    }

    /// Runs every alignment result through the configured stages, then
    /// the fixed fix-matches/drop-empty tail.
    pub fn apply(
        &self,
        alignments: Vec<AlignmentResult>,
    ) -> Result<Vec<AlignmentResult>, AlignmentError> {
        let mut current = alignments;
        for stage in &self.stages {
            current = match stage {
                Stage::ScoreThreshold {
                    score_key,
                    min_score,
                    max_score,
                    score_tolerance,
                } => apply_score_threshold(
                    current,
                    score_key,
                    *min_score,
                    *max_score,
                    *score_tolerance,
                )?,
                Stage::MinLength(filter) => filter.apply(current),
            };
        }
        Ok(fix_matches_and_drop_empty(current))
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }
}

fn apply_score_threshold(
    alignments: Vec<AlignmentResult>,
    score_key: &str,
    min_score: Option<f64>,
    max_score: Option<f64>,
    score_tolerance: Option<f64>,
) -> Result<Vec<AlignmentResult>, AlignmentError> {
    let log_tolerance = score_tolerance.map(f64::log10);

    let mut out = Vec::with_capacity(alignments.len());
    for mut alignment in alignments {
        let log_best_score = match (log_tolerance, alignment.matches.first()) {
            (Some(_), Some(best_match)) => {
                let best_score = scores::score_of(best_match, score_key)?;
                Some(if best_score == 0.0 {
                    0.0
                } else {
                    best_score.log10()
                })
            }
            _ => None,
        };

        let mut filtered_matches = Vec::with_capacity(alignment.matches.len());
        for mut m in alignment.matches.drain(..) {
            m.match_parts.retain(|part| {
                part.scores
                    .get(score_key)
                    .is_some_and(|&score| {
                        scores::score_above_threshold(
                            score,
                            min_score,
                            max_score,
                            log_tolerance,
                            log_best_score,
                        )
                    })
            });
            if m.match_parts.is_empty() {
                continue;
            }
            let match_score = scores::score_of(&m, score_key)?;
            if scores::score_above_threshold(
                match_score,
                min_score,
                max_score,
                log_tolerance,
                log_best_score,
            ) {
                filtered_matches.push(m);
            }
        }
        alignment.matches = filtered_matches;
        out.push(alignment);
    }
    Ok(out)
}

fn fix_matches_and_drop_empty(alignments: Vec<AlignmentResult>) -> Vec<AlignmentResult> {
    alignments
        .into_iter()
        .filter_map(|mut alignment| {
            let fixed: Vec<Match> = alignment
                .matches
                .drain(..)
                .filter(|m| !m.match_parts.is_empty())
                .map(|mut m| {
                    m.fix_coordinates();
                    m
                })
                .collect();
            if fixed.is_empty() {
                None
            } else {
                alignment.matches = fixed;
                Some(alignment)
            }
        })
        .collect()
}
