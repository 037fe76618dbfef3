//! NCBI BLAST XML parser (§4.F, §6 "an XML tree of query/alignment/hsp
//! records").
//!
//! Grounded on `original_source/franklin/alignment_search_result.py::
//! BlastParser`, which wraps Biopython's `NCBIXML.parse`; here the XML is
//! walked directly with `quick-xml` since there is no BioPython equivalent
//! in the Rust ecosystem.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::alignment::model::{AlignmentResult, Match, MatchPart};

#[derive(Default)]
struct HspBuilder {
    query_from: i64,
    query_to: i64,
    hit_from: i64,
    hit_to: i64,
    evalue: f64,
    identity: f64,
    positive: f64,
    align_len: f64,
}

impl HspBuilder {
    fn into_match_part(self) -> MatchPart {
        let (query_start, query_end, query_strand) = normalize(self.query_from, self.query_to);
        let (subject_start, subject_end, subject_strand) = normalize(self.hit_from, self.hit_to);
        let mut scores = HashMap::new();
        scores.insert("expect".to_owned(), self.evalue);
        if self.align_len > 0.0 {
            scores.insert("identity".to_owned(), self.identity * 100.0 / self.align_len);
            scores.insert(
                "similarity".to_owned(),
                self.positive * 100.0 / self.align_len,
            );
        }
        MatchPart {
            query_start,
            query_end,
            query_strand,
            subject_start,
            subject_end,
            subject_strand,
            scores,
        }
    }
}

/// Converts a 1-based inclusive `[from, to]` span to 0-based half-open
/// `[start, end)`, reporting strand as ±1.
fn normalize(from: i64, to: i64) -> (i64, i64, i8) {
    if from <= to {
        (from - 1, to, 1)
    } else {
        (to - 1, from, -1)
    }
}

/// Parses a complete BLAST XML document into one `AlignmentResult` per
/// `Iteration` (query).
pub fn parse<R: BufRead>(input: R) -> anyhow::Result<Vec<AlignmentResult>> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut buf = Vec::new();

    let mut current_tag = String::new();
    let mut query_id = String::new();
    let mut query_length: Option<i64> = None;
    let mut matches_by_subject: Vec<(String, Vec<MatchPart>)> = Vec::new();
    let mut current_hit_subject = String::new();
    let mut current_hit_parts: Vec<MatchPart> = Vec::new();
    let mut hsp = HspBuilder::default();
    let mut in_iteration = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if current_tag == "Iteration" {
                    in_iteration = true;
                    query_id.clear();
                    query_length = None;
                    matches_by_subject.clear();
                }
                if current_tag == "Hit" {
                    current_hit_subject.clear();
                    current_hit_parts.clear();
                }
                if current_tag == "Hsp" {
                    hsp = HspBuilder::default();
                }
            }
            Event::Text(e) => {
                if !in_iteration {
                    continue;
                }
                let text = e.unescape()?.into_owned();
                match current_tag.as_str() {
                    "Iteration_query-def" => query_id = text,
                    "Iteration_query-len" => query_length = text.parse().ok(),
                    "Hit_id" | "Hit_accession" if current_hit_subject.is_empty() => {
                        current_hit_subject = text
                    }
                    "Hsp_query-from" => hsp.query_from = text.parse().unwrap_or_default(),
                    "Hsp_query-to" => hsp.query_to = text.parse().unwrap_or_default(),
                    "Hsp_hit-from" => hsp.hit_from = text.parse().unwrap_or_default(),
                    "Hsp_hit-to" => hsp.hit_to = text.parse().unwrap_or_default(),
                    "Hsp_evalue" => hsp.evalue = text.parse().unwrap_or_default(),
                    "Hsp_identity" => hsp.identity = text.parse().unwrap_or_default(),
                    "Hsp_positive" => hsp.positive = text.parse().unwrap_or_default(),
                    "Hsp_align-len" => hsp.align_len = text.parse().unwrap_or_default(),
                    _ => {}
                }
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if tag == "Hsp" {
                    current_hit_parts.push(std::mem::take(&mut hsp).into_match_part());
                } else if tag == "Hit" {
                    if !current_hit_parts.is_empty() {
                        matches_by_subject.push((
                            std::mem::take(&mut current_hit_subject),
                            std::mem::take(&mut current_hit_parts),
                        ));
                    }
                } else if tag == "Iteration" {
                    let mut result = AlignmentResult::new(std::mem::take(&mut query_id));
                    result.query_length = query_length;
                    for (subject, parts) in matches_by_subject.drain(..) {
                        result.matches.push(Match::new(subject, parts));
                    }
                    if !result.is_empty() {
                        results.push(result);
                    }
                    in_iteration = false;
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(results)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<BlastOutput>
<BlastOutput_iterations>
<Iteration>
<Iteration_query-def>query1</Iteration_query-def>
<Iteration_query-len>100</Iteration_query-len>
<Iteration_hits>
<Hit>
<Hit_id>gi|1|subject1</Hit_id>
<Hit_accession>subject1</Hit_accession>
<Hit_hsps>
<Hsp>
<Hsp_evalue>1e-20</Hsp_evalue>
<Hsp_query-from>1</Hsp_query-from>
<Hsp_query-to>50</Hsp_query-to>
<Hsp_hit-from>10</Hsp_hit-from>
<Hsp_hit-to>59</Hsp_hit-to>
<Hsp_identity>48</Hsp_identity>
<Hsp_positive>49</Hsp_positive>
<Hsp_align-len>50</Hsp_align-len>
</Hsp>
</Hit_hsps>
</Hit>
</Iteration_hits>
</Iteration>
</BlastOutput_iterations>
</BlastOutput>
"#;

    #[test]
    fn parses_one_iteration_one_hit_one_hsp() {
        let results = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.query_id, "query1");
        assert_eq!(result.query_length, Some(100));
        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!(m.match_parts.len(), 1);
        assert_eq!((m.start, m.end), (0, 50));
        assert_eq!((m.subject_start, m.subject_end), (9, 59));
        assert!((m.match_parts[0].scores["expect"] - 1e-20).abs() < 1e-30);
    }
}
