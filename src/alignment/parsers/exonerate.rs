//! Exonerate `cigar_like:` output parser (§4.F, §6).
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! ExonerateParser` (`_results_query_from_exonerate` /
//! `_create_structure_result` / `_strand_transform`).
//!
//! A `cigar_like:` line has 12 whitespace-separated fields after the
//! prefix: query id, query start, query end, query strand, subject id,
//! subject start, subject end, subject strand, score, query length,
//! subject length, similarity. Exonerate numbers positions between bases,
//! so `start`/`end` are already 0-based half-open and pass through
//! unchanged.

use std::collections::HashMap;
use std::io::BufRead;

use crate::alignment::model::{AlignmentResult, Match, MatchPart};

fn strand_transform(symbol: &str) -> anyhow::Result<i8> {
    match symbol {
        "-" => Ok(-1),
        "+" => Ok(1),
        other => anyhow::bail!("unknown exonerate strand symbol {other:?}"),
    }
}

struct Line {
    query_id: String,
    query_start: i64,
    query_end: i64,
    query_strand: i8,
    subject_id: String,
    subject_start: i64,
    subject_end: i64,
    subject_strand: i8,
    score: f64,
    similarity: f64,
}

fn parse_line(fields: &str) -> anyhow::Result<Line> {
    let items: Vec<&str> = fields.split_whitespace().collect();
    anyhow::ensure!(
        items.len() >= 12,
        "cigar_like line has {} fields, expected 12: {fields:?}",
        items.len()
    );
    Ok(Line {
        query_id: items[0].to_owned(),
        query_start: items[1].parse()?,
        query_end: items[2].parse()?,
        query_strand: strand_transform(items[3])?,
        subject_id: items[4].to_owned(),
        subject_start: items[5].parse()?,
        subject_end: items[6].parse()?,
        subject_strand: strand_transform(items[7])?,
        score: items[8].parse()?,
        similarity: items[11].parse()?,
    })
}

/// Parses every `cigar_like:` line in the stream, grouping by query id (in
/// first-seen order) and, within a query, by subject id.
pub fn parse<R: BufRead>(input: R) -> anyhow::Result<Vec<AlignmentResult>> {
    let mut order: Vec<String> = Vec::new();
    let mut by_query: HashMap<String, Vec<Line>> = HashMap::new();

    for raw in input.lines() {
        let raw = raw?;
        let Some(rest) = raw.strip_prefix("cigar_like:") else {
            continue;
        };
        let line = parse_line(rest.trim_start())?;
        if !by_query.contains_key(&line.query_id) {
            order.push(line.query_id.clone());
        }
        by_query.entry(line.query_id.clone()).or_default().push(line);
    }

    let mut results = Vec::new();
    for query_id in order {
        let lines = by_query.remove(&query_id).unwrap_or_default();
        let mut result = AlignmentResult::new(query_id);
        let mut by_subject: Vec<(String, Vec<MatchPart>)> = Vec::new();
        for line in lines {
            let mut scores = HashMap::new();
            scores.insert("score".to_owned(), line.score);
            scores.insert("similarity".to_owned(), line.similarity);
            let part = MatchPart {
                query_start: line.query_start,
                query_end: line.query_end,
                query_strand: line.query_strand,
                subject_start: line.subject_start,
                subject_end: line.subject_end,
                subject_strand: line.subject_strand,
                scores,
            };
            match by_subject.iter_mut().find(|(s, _)| *s == line.subject_id) {
                Some((_, parts)) => parts.push(part),
                None => by_subject.push((line.subject_id, vec![part])),
            }
        }
        for (subject, parts) in by_subject {
            result.matches.push(Match::new(subject, parts));
        }
        if !result.is_empty() {
            results.push(result);
        }
    }

    Ok(results)
}
