//! Alignment-result parsers (§4.F, §6): one module per wire format, each
//! exposing a `parse` function returning `Vec<AlignmentResult>`.

pub mod blast_tabular;
pub mod blast_xml;
pub mod exonerate;

use std::io::BufRead;

use super::model::AlignmentResult;

/// The wire format an alignment-result stream is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    BlastXml,
    BlastTabular,
    Exonerate,
}

/// Parses a stream of the given kind into its alignment results.
///
/// Grounded on `get_alignment_parser`, which dispatches on an aligner-kind
/// string to the matching parser class.
pub fn parse<R: BufRead>(kind: ParserKind, input: R) -> anyhow::Result<Vec<AlignmentResult>> {
    match kind {
        ParserKind::BlastXml => blast_xml::parse(input),
        ParserKind::BlastTabular => blast_tabular::parse(input),
        ParserKind::Exonerate => exonerate::parse(input),
    }
}
