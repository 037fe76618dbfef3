//! 12-column tabular BLAST parser (`-outfmt 6`) (§4.F, §6).
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! _lines_for_every_tab_blast` / `_group_match_parts_by_subject` /
//! `_tabular_blast_parser` / `TabularBlastParser`.
//!
//! Columns: query id, subject id, % identity, alignment length,
//! mismatches, gap opens, q.start, q.end, s.start, s.end, evalue, bit
//! score. Coordinates are 1-based inclusive on the wire; normalised to
//! 0-based half-open here.

use std::collections::HashMap;
use std::io::BufRead;

use crate::alignment::model::{AlignmentResult, Match, MatchPart};

/// Converts a 1-based inclusive `[start, end]` span to 0-based half-open
/// `[start, end)`, reporting strand as ±1.
fn normalize(start: i64, end: i64) -> (i64, i64, i8) {
    if start <= end {
        (start - 1, end, 1)
    } else {
        (end - 1, start, -1)
    }
}

#[derive(serde::Deserialize)]
struct Row {
    query_id: String,
    subject_id: String,
    identity: f64,
    #[serde(rename = "alignment_length")]
    _alignment_length: u32,
    #[serde(rename = "mismatches")]
    _mismatches: u32,
    #[serde(rename = "gap_opens")]
    _gap_opens: u32,
    query_start: i64,
    query_end: i64,
    subject_start: i64,
    subject_end: i64,
    evalue: f64,
    bit_score: f64,
}

/// Parses a complete tabular blast stream, grouping consecutive rows that
/// share a query id into one `AlignmentResult`, and within that, rows
/// sharing a subject id into one `Match`.
pub fn parse<R: BufRead>(input: R) -> anyhow::Result<Vec<AlignmentResult>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(false)
        .from_reader(input);

    let mut results = Vec::new();
    let mut current_query: Option<String> = None;
    let mut by_subject: Vec<(String, Vec<MatchPart>)> = Vec::new();

    for record in csv_reader.deserialize() {
        let row: Row = record?;

        if current_query.as_deref() != Some(row.query_id.as_str()) {
            flush(&mut current_query, &mut by_subject, &mut results);
            current_query = Some(row.query_id.clone());
        }

        let (query_start, query_end, query_strand) = normalize(row.query_start, row.query_end);
        let (subject_start, subject_end, subject_strand) =
            normalize(row.subject_start, row.subject_end);
        let mut scores = HashMap::new();
        scores.insert("identity".to_owned(), row.identity);
        scores.insert("expect".to_owned(), row.evalue);
        scores.insert("score".to_owned(), row.bit_score);

        let part = MatchPart {
            query_start,
            query_end,
            query_strand,
            subject_start,
            subject_end,
            subject_strand,
            scores,
        };

        match by_subject.iter_mut().find(|(s, _)| *s == row.subject_id) {
            Some((_, parts)) => parts.push(part),
            None => by_subject.push((row.subject_id, vec![part])),
        }
    }
    flush(&mut current_query, &mut by_subject, &mut results);

    Ok(results)
}

fn flush(
    current_query: &mut Option<String>,
    by_subject: &mut Vec<(String, Vec<MatchPart>)>,
    results: &mut Vec<AlignmentResult>,
) {
    if let Some(query_id) = current_query.take() {
        let mut result = AlignmentResult::new(query_id);
        for (subject, parts) in by_subject.drain(..) {
            result.matches.push(Match::new(subject, parts));
        }
        if !result.is_empty() {
            results.push(result);
        }
    }
    by_subject.clear();
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_rows_by_query_then_subject() {
        let input = "q1\ts1\t98.0\t50\t1\t0\t1\t50\t10\t59\t1e-20\t90.1\n\
                      q1\ts1\t97.0\t20\t1\t0\t60\t79\t70\t89\t1e-10\t40.0\n\
                      q1\ts2\t95.0\t30\t1\t0\t1\t30\t5\t34\t1e-5\t30.0\n\
                      q2\ts1\t90.0\t10\t0\t0\t1\t10\t1\t10\t1e-2\t10.0\n";
        let results = parse(input.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query_id, "q1");
        assert_eq!(results[0].matches.len(), 2);
        let s1 = results[0]
            .matches
            .iter()
            .find(|m| m.subject == "s1")
            .unwrap();
        assert_eq!(s1.match_parts.len(), 2);
        assert_eq!((s1.start, s1.end), (0, 79));
        assert_eq!(results[1].query_id, "q2");
    }

    #[test]
    fn reverse_strand_match_has_negative_strand_and_normalised_span() {
        let input = "q1\ts1\t98.0\t50\t1\t0\t1\t50\t59\t10\t1e-20\t90.1\n";
        let results = parse(input.as_bytes()).unwrap();
        let part = &results[0].matches[0].match_parts[0];
        assert_eq!(part.subject_strand, -1);
        assert_eq!((part.subject_start, part.subject_end), (9, 59));
    }
}
