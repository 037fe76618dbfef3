//! Alignment-result data model (§3, §4.F): a query's matches against one or
//! more subjects, each match built from one or more match-parts (HSPs).

use std::collections::HashMap;

/// One high-scoring segment pair within a match.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchPart {
    pub query_start: i64,
    pub query_end: i64,
    pub query_strand: i8,
    pub subject_start: i64,
    pub subject_end: i64,
    pub subject_strand: i8,
    pub scores: HashMap<String, f64>,
}

/// A query-vs-subject hit, built from one or more `MatchPart`s.
///
/// Invariant (§3, §8 invariant 4): after any pipeline step, `start`/`end`/
/// `subject_start`/`subject_end` equal the min/max of the match-parts'
/// corresponding coordinates, and `match_parts` is non-empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Match {
    pub subject: String,
    pub start: i64,
    pub end: i64,
    pub subject_start: i64,
    pub subject_end: i64,
    pub scores: HashMap<String, f64>,
    pub match_parts: Vec<MatchPart>,
}

impl Match {
    pub fn new(subject: impl Into<String>, match_parts: Vec<MatchPart>) -> Self {
        let mut m = Self {
            subject: subject.into(),
            start: 0,
            end: 0,
            subject_start: 0,
            subject_end: 0,
            scores: HashMap::new(),
            match_parts,
        };
        m.fix_coordinates();
        m
    }

    /// Recomputes `start`/`end`/`subject_start`/`subject_end` as the min/max
    /// over `match_parts` (§4.F fix-matches mapper).
    pub fn fix_coordinates(&mut self) {
        if self.match_parts.is_empty() {
            return;
        }
        self.start = self
            .match_parts
            .iter()
            .map(|p| p.query_start)
            .min()
            .unwrap();
        self.end = self.match_parts.iter().map(|p| p.query_end).max().unwrap();
        self.subject_start = self
            .match_parts
            .iter()
            .map(|p| p.subject_start)
            .min()
            .unwrap();
        self.subject_end = self
            .match_parts
            .iter()
            .map(|p| p.subject_end)
            .max()
            .unwrap();
    }
}

/// A query's full set of matches, as produced by an alignment parser.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignmentResult {
    pub query_id: String,
    pub query_length: Option<i64>,
    pub matches: Vec<Match>,
}

impl AlignmentResult {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            query_length: None,
            matches: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn part(qs: i64, qe: i64, ss: i64, se: i64) -> MatchPart {
        MatchPart {
            query_start: qs,
            query_end: qe,
            query_strand: 1,
            subject_start: ss,
            subject_end: se,
            subject_strand: 1,
            scores: HashMap::new(),
        }
    }

    #[test]
    fn new_fixes_coordinates_from_parts() {
        let m = Match::new("chr1", vec![part(10, 20, 100, 110), part(25, 30, 115, 120)]);
        assert_eq!((m.start, m.end), (10, 30));
        assert_eq!((m.subject_start, m.subject_end), (100, 120));
    }
}
