//! Covered-segment merging and length-based match filtering (§4.F, §8
//! invariant "segment-merge is permutation invariant").
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! _covered_segments` / `_match_length` / `_create_min_length_mapper`.

use crate::alignment::model::{AlignmentResult, MatchPart};
use crate::err::ConfigError;

/// Merges the query (or subject) spans of a list of match-parts into the
/// minimal set of non-overlapping, non-adjacent segments they cover.
///
/// Segments are half-open `[start, end)`; two segments that touch or
/// overlap merge into one. The result is sorted by start and is the same
/// regardless of the input order (§8).
pub fn covered_segments(match_parts: &[MatchPart], in_query: bool) -> Vec<(i64, i64)> {
    let mut spans: Vec<(i64, i64)> = match_parts
        .iter()
        .map(|part| {
            if in_query {
                (part.query_start, part.query_end)
            } else {
                (part.subject_start, part.subject_end)
            }
        })
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Total length covered by a match's match-parts, in the query or the
/// subject.
pub fn match_length(match_parts: &[MatchPart], in_query: bool) -> i64 {
    covered_segments(match_parts, in_query)
        .iter()
        .map(|(start, end)| end - start)
        .sum()
}

/// A match-length filter: keeps matches whose covered length clears a
/// threshold given either as an absolute residue count or as a
/// percentage of the query's (or subject's) length.
///
/// Grounded on `_create_min_length_mapper`'s mutually-exclusive parameter
/// validation.
pub struct LengthFilter {
    length_in_query: bool,
    threshold: LengthThreshold,
}

enum LengthThreshold {
    Residues(i64),
    Percentage { min_percentage: f64, molecule_length: i64 },
}

impl LengthFilter {
    pub fn by_residue_count(length_in_query: bool, min_num_residues: i64) -> Self {
        Self {
            length_in_query,
            threshold: LengthThreshold::Residues(min_num_residues),
        }
    }

    pub fn by_percentage(
        length_in_query: bool,
        min_percentage: f64,
        molecule_length: i64,
    ) -> Self {
        Self {
            length_in_query,
            threshold: LengthThreshold::Percentage {
                min_percentage,
                molecule_length,
            },
        }
    }

    /// Validates that exactly one of `min_num_residues`/`min_percentage`
    /// is supplied, mirroring the original's `ValueError`s.
    pub fn new(
        length_in_query: bool,
        min_num_residues: Option<i64>,
        min_percentage: Option<(f64, i64)>,
    ) -> Result<Self, ConfigError> {
        match (min_num_residues, min_percentage) {
            (None, None) => Err(ConfigError::MissingParameter(
                "min_num_residues or min_percentage",
            )),
            (Some(_), Some(_)) => Err(ConfigError::MutuallyExclusiveOptions(
                "min_num_residues",
                "min_percentage",
            )),
            (Some(residues), None) => Ok(Self::by_residue_count(length_in_query, residues)),
            (None, Some((percentage, molecule_length))) => Ok(Self::by_percentage(
                length_in_query,
                percentage,
                molecule_length,
            )),
        }
    }

    fn passes(&self, match_length: i64, subject_length: i64) -> bool {
        match &self.threshold {
            LengthThreshold::Residues(min) => match_length >= *min,
            LengthThreshold::Percentage {
                min_percentage,
                molecule_length,
            } => {
                let length = if self.length_in_query {
                    *molecule_length
                } else {
                    subject_length
                };
                (match_length as f64 / length as f64) * 100.0 >= *min_percentage
            }
        }
    }

    pub fn apply(&self, alignments: Vec<AlignmentResult>) -> Vec<AlignmentResult> {
        alignments
            .into_iter()
            .map(|mut alignment| {
                alignment.matches.retain(|m| {
                    let length = match_length(&m.match_parts, self.length_in_query);
                    let subject_length = m
                        .match_parts
                        .iter()
                        .map(|p| p.subject_end)
                        .max()
                        .unwrap_or(0);
                    self.passes(length, subject_length)
                });
                alignment
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alignment::model::Match;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn part(qs: i64, qe: i64) -> MatchPart {
        MatchPart {
            query_start: qs,
            query_end: qe,
            query_strand: 1,
            subject_start: qs,
            subject_end: qe,
            subject_strand: 1,
            scores: HashMap::new(),
        }
    }

    #[test]
    fn overlapping_parts_merge_into_one_segment() {
        let parts = vec![part(0, 10), part(5, 15)];
        assert_eq!(covered_segments(&parts, true), vec![(0, 15)]);
    }

    #[test]
    fn disjoint_parts_stay_separate() {
        let parts = vec![part(0, 10), part(20, 30)];
        assert_eq!(covered_segments(&parts, true), vec![(0, 10), (20, 30)]);
    }

    #[rstest]
    #[case(vec![part(0, 10), part(20, 30), part(5, 25)])]
    #[case(vec![part(20, 30), part(5, 25), part(0, 10)])]
    #[case(vec![part(5, 25), part(0, 10), part(20, 30)])]
    fn merge_is_permutation_invariant(#[case] parts: Vec<MatchPart>) {
        assert_eq!(covered_segments(&parts, true), vec![(0, 30)]);
    }

    #[test]
    fn match_length_sums_merged_segments() {
        let parts = vec![part(0, 10), part(5, 15), part(20, 30)];
        assert_eq!(match_length(&parts, true), 25);
    }

    #[test]
    fn new_rejects_both_parameters_given() {
        let err = LengthFilter::new(true, Some(10), Some((50.0, 100))).unwrap_err();
        assert!(matches!(err, ConfigError::MutuallyExclusiveOptions(_, _)));
    }

    #[test]
    fn new_rejects_neither_parameter_given() {
        let err = LengthFilter::new(true, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(_)));
    }

    #[test]
    fn residue_filter_drops_short_matches() {
        let filter = LengthFilter::by_residue_count(true, 15);
        let alignments = vec![{
            let mut a = AlignmentResult::new("q1");
            a.matches.push(Match::new("s1", vec![part(0, 10)]));
            a.matches.push(Match::new("s2", vec![part(0, 20)]));
            a
        }];
        let out = filter.apply(alignments);
        assert_eq!(out[0].matches.len(), 1);
        assert_eq!(out[0].matches[0].subject, "s2");
    }

    #[test]
    fn percentage_filter_uses_query_length_when_in_query() {
        let filter = LengthFilter::by_percentage(true, 50.0, 20);
        let alignments = vec![{
            let mut a = AlignmentResult::new("q1");
            a.matches.push(Match::new("s1", vec![part(0, 9)]));
            a.matches.push(Match::new("s2", vec![part(0, 10)]));
            a
        }];
        let out = filter.apply(alignments);
        assert_eq!(out[0].matches.len(), 1);
        assert_eq!(out[0].matches[0].subject, "s2");
    }
}
