//! Streaming pileup assembly (§4.B).
//!
//! The hard engineering here — walking overlapping reads' CIGAR strings into
//! strictly-increasing-position pileup columns with bounded memory — is
//! implemented against a small, BAM-agnostic `AlignedRead` abstraction
//! (`PileupAssembler`), so it is testable without real alignment files. A
//! thin `BamPileupReader` adapter decodes `noodles-bam` records into that
//! abstraction, playing the "external collaborator" role §1 assigns to the
//! binary alignment store.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::iter::Peekable;
use std::path::Path;
use std::sync::Arc;

use noodles_bam as bam;
use noodles_core::{Position, Region};
use noodles_sam::{self as sam, alignment::record::cigar::op::Kind as SamOpKind};
use noodles_sam::alignment::record::data::field::Tag;

use crate::pileup::column::{PileupColumn, ReadObservation};
use crate::reference::ReferenceProvider;

/// A CIGAR operation kind, collapsed to the subset the pileup assembler
/// needs to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarKind {
    /// `M`, `=`, or `X`: consumes both reference and query.
    AlignMatch,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Pad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

/// A read's alignment, already decoded from whatever binary format it came
/// from, in the shape the pileup assembler needs.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    pub name: String,
    pub read_group: String,
    pub mapping_quality: u8,
    /// 0-based reference start.
    pub reference_start: usize,
    pub cigar: Vec<CigarOp>,
    /// Full query sequence, lower-cased, including soft-clipped bases.
    pub sequence: Vec<u8>,
    pub qualities: Vec<u8>,
    pub forward_strand: bool,
}

#[derive(Debug, Clone)]
enum ColumnEvent {
    Base {
        base: u8,
        quality: Option<u8>,
        indel_length: i32,
        inserted_bases: Option<String>,
    },
    InDeletion,
}

/// Walks one read's CIGAR into `(reference_position, event)` pairs. Only
/// positions the read actually covers (aligned or deleted) produce an
/// event; insertions attach their length to the preceding aligned column,
/// matching the pysam `pileup_read.indel` convention this module replaces
/// (§4.B).
fn walk_read(read: &AlignedRead) -> Vec<(usize, ColumnEvent)> {
    let mut events = Vec::new();
    let mut ref_pos = read.reference_start;
    let mut query_pos: usize = 0;

    for (i, op) in read.cigar.iter().enumerate() {
        match op.kind {
            CigarKind::SoftClip => {
                query_pos += op.len as usize;
            }
            CigarKind::HardClip | CigarKind::Pad => {}
            CigarKind::AlignMatch => {
                for k in 0..op.len {
                    let base = read.sequence.get(query_pos).copied().unwrap_or(b'n');
                    let quality = read.qualities.get(query_pos).copied();
                    let mut indel_length = 0i32;
                    let mut inserted_bases = None;
                    if k + 1 == op.len {
                        if let Some(next_op) = read.cigar.get(i + 1) {
                            match next_op.kind {
                                CigarKind::Insertion => {
                                    indel_length = next_op.len as i32;
                                    let start = query_pos + 1;
                                    let end = start + next_op.len as usize;
                                    inserted_bases = Some(
                                        String::from_utf8_lossy(
                                            &read.sequence[start.min(read.sequence.len())
                                                ..end.min(read.sequence.len())],
                                        )
                                        .into_owned(),
                                    );
                                }
                                CigarKind::Deletion => {
                                    indel_length = -(next_op.len as i32);
                                }
                                _ => {}
                            }
                        }
                    }
                    events.push((
                        ref_pos,
                        ColumnEvent::Base {
                            base,
                            quality,
                            indel_length,
                            inserted_bases,
                        },
                    ));
                    ref_pos += 1;
                    query_pos += 1;
                }
            }
            CigarKind::Deletion | CigarKind::Skip => {
                for _ in 0..op.len {
                    events.push((ref_pos, ColumnEvent::InDeletion));
                    ref_pos += 1;
                }
            }
            CigarKind::Insertion => {
                // Already accounted for as a lookahead from the preceding
                // AlignMatch run; just advance the query cursor.
                query_pos += op.len as usize;
            }
        }
    }
    events
}

struct ActiveRead {
    name: String,
    read_group: String,
    mapping_quality: u8,
    forward_strand: bool,
    events: Vec<(usize, ColumnEvent)>,
    cursor: usize,
}

/// Any source of already-decoded aligned reads, sorted by reference start,
/// for a single reference sequence.
pub trait PileupSource {
    fn reference_name(&self) -> &str;
}

/// Assembles a stream of `PileupColumn`s from a position-sorted stream of
/// `AlignedRead`s and a reference (§4.B). Lazy and single-pass: only reads
/// currently overlapping the scan position are held in memory.
pub struct PileupAssembler<I: Iterator<Item = AlignedRead>> {
    reads: Peekable<I>,
    reference: Arc<dyn ReferenceProvider>,
    reference_name: String,
    active: VecDeque<ActiveRead>,
}

impl<I: Iterator<Item = AlignedRead>> PileupAssembler<I> {
    pub fn new(
        reads: I,
        reference: Arc<dyn ReferenceProvider>,
        reference_name: impl Into<String>,
    ) -> Self {
        Self {
            reads: reads.peekable(),
            reference,
            reference_name: reference_name.into(),
            active: VecDeque::new(),
        }
    }

    fn activate_reads_up_to(&mut self, position: usize) {
        while let Some(next) = self.reads.peek() {
            if next.reference_start > position {
                break;
            }
            let read = self.reads.next().unwrap();
            let events = walk_read(&read);
            if events.is_empty() {
                continue;
            }
            self.active.push_back(ActiveRead {
                name: read.name,
                read_group: read.read_group,
                mapping_quality: read.mapping_quality,
                forward_strand: read.forward_strand,
                events,
                cursor: 0,
            });
        }
    }

    fn next_scan_position(&mut self) -> Option<usize> {
        let active_min = self
            .active
            .iter()
            .filter_map(|r| r.events.get(r.cursor).map(|(p, _)| *p))
            .min();
        let peeked_min = self.reads.peek().map(|r| r.reference_start);
        match (active_min, peeked_min) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(p)) => Some(p),
            (Some(a), Some(p)) => Some(a.min(p)),
        }
    }
}

impl<I: Iterator<Item = AlignedRead>> Iterator for PileupAssembler<I> {
    type Item = Result<PileupColumn, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let position = self.next_scan_position()?;
            self.activate_reads_up_to(position);

            let mut observations = Vec::new();
            for active in self.active.iter_mut() {
                if let Some((pos, event)) = active.events.get(active.cursor) {
                    if *pos == position {
                        let (base, base_quality, indel_length, in_deletion, inserted_bases) =
                            match event {
                                ColumnEvent::Base {
                                    base,
                                    quality,
                                    indel_length,
                                    inserted_bases,
                                } => (
                                    Some(*base),
                                    *quality,
                                    *indel_length,
                                    false,
                                    inserted_bases.clone(),
                                ),
                                ColumnEvent::InDeletion => (None, None, 0, true, None),
                            };
                        observations.push(ReadObservation {
                            read_name: active.name.clone(),
                            read_group: active.read_group.clone(),
                            mapping_quality: active.mapping_quality,
                            base,
                            base_quality,
                            forward_strand: active.forward_strand,
                            indel_length,
                            in_deletion,
                            inserted_bases,
                        });
                        active.cursor += 1;
                    }
                }
            }
            // Drop reads that have no more events.
            self.active.retain(|r| r.cursor < r.events.len());

            if observations.is_empty() {
                // Shouldn't happen since `position` was derived from some
                // read's next event, but guard against infinite loops.
                continue;
            }

            let reference_base = match self.reference.base_at(&self.reference_name, position) {
                Ok(b) => b,
                Err(e) => return Some(Err(e.into())),
            };

            return Some(Ok(PileupColumn {
                reference: self.reference_name.clone(),
                position,
                reference_base,
                observations,
            }));
        }
    }
}

/// Decodes `noodles-bam` records overlapping a region into `AlignedRead`s
/// and assembles them into a pileup column stream. Unmapped, secondary, and
/// supplementary records are skipped; a record that fails to decode is
/// skipped with a `tracing::warn!` rather than aborting the whole scan. The
/// BAM/CIGAR decoding in `BamFileSource` is the "external collaborator"
/// boundary (§1); `PileupAssembler` above is independent of it and takes
/// any `Iterator<Item = AlignedRead>`.
pub struct BamPileupReader {
    reference_name: String,
}

impl BamPileupReader {
    /// Builds a `PileupAssembler` from already-decoded reads. Left generic
    /// over the BAM-decoding step so callers can plug in whichever
    /// `noodles-bam`/`noodles-sam` version is linked without this module
    /// needing to track their exact record API.
    pub fn assemble<I: Iterator<Item = AlignedRead>>(
        reference_name: impl Into<String>,
        reference: Arc<dyn ReferenceProvider>,
        reads: I,
    ) -> PileupAssembler<I> {
        let reference_name = reference_name.into();
        PileupAssembler::new(reads, reference, reference_name)
    }

    /// Opens an indexed BAM file and assembles a pileup stream over
    /// `[start, end)` of `reference_name`, decoding every overlapping
    /// record up front (§4.B "Input: a sorted, indexed binary alignment
    /// file").
    pub fn open_region(
        bam_path: impl AsRef<Path>,
        reference_name: impl Into<String>,
        start: usize,
        end: usize,
        reference: Arc<dyn ReferenceProvider>,
    ) -> anyhow::Result<PileupAssembler<std::vec::IntoIter<AlignedRead>>> {
        let reference_name = reference_name.into();
        let mut source = BamFileSource::open(bam_path)?;
        let reads = source.reads_in_region(&reference_name, start, end)?;
        Ok(Self::assemble(reference_name, reference, reads.into_iter()))
    }
}

impl PileupSource for BamPileupReader {
    fn reference_name(&self) -> &str {
        &self.reference_name
    }
}

/// An indexed BAM file opened for random access, and the decoding from
/// `bam::Record` to `AlignedRead`.
pub struct BamFileSource {
    reader: bam::io::IndexedReader<BufReader<File>>,
    header: sam::Header,
}

impl BamFileSource {
    pub fn open(bam_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let bam_path = bam_path.as_ref();
        let index_path = format!("{}.bai", bam_path.display());
        let index = bam::bai::read(&index_path)?;
        let mut reader = bam::io::indexed_reader::Builder::default()
            .set_index(index)
            .build_from_path(bam_path)?;
        let header = reader.read_header()?;
        Ok(Self { reader, header })
    }

    /// Decodes every record overlapping `[start, end)` of `reference_name`
    /// into `AlignedRead`s, sorted by reference start as `PileupAssembler`
    /// requires.
    pub fn reads_in_region(
        &mut self,
        reference_name: &str,
        start: usize,
        end: usize,
    ) -> anyhow::Result<Vec<AlignedRead>> {
        let start_pos = Position::try_from(start + 1)?;
        let end_pos = Position::try_from(end.max(start + 1))?;
        let region = Region::new(reference_name, start_pos..=end_pos);

        let mut reads = Vec::new();
        for result in self.reader.query(&self.header, &region)? {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable BAM record");
                    continue;
                }
            };
            match decode_record(&record) {
                Ok(Some(read)) => reads.push(read),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable BAM record");
                }
            }
        }
        reads.sort_by_key(|r| r.reference_start);
        Ok(reads)
    }
}

/// Decodes one `bam::Record` into an `AlignedRead`, or `None` if it should
/// be skipped entirely (unmapped, secondary, supplementary, or missing an
/// alignment start).
fn decode_record(record: &bam::Record) -> anyhow::Result<Option<AlignedRead>> {
    let flags = record.flags();
    if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
        return Ok(None);
    }

    let Some(start) = record.alignment_start() else {
        return Ok(None);
    };
    let reference_start = usize::from(start) - 1;

    let cigar = record
        .cigar()
        .iter()
        .map(|op| {
            let op = op?;
            Ok(CigarOp {
                kind: convert_cigar_kind(op.kind()),
                len: op.len() as u32,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let sequence: Vec<u8> = record
        .sequence()
        .iter()
        .map(|base| u8::from(base).to_ascii_lowercase())
        .collect();

    let qualities: Vec<u8> = record
        .quality_scores()
        .iter()
        .map(|score| u8::from(score))
        .collect();

    let read_group = record
        .data()
        .get(&Tag::READ_GROUP)
        .and_then(Result::ok)
        .and_then(|value| value.as_string().map(str::to_owned))
        .unwrap_or_default();

    let name = record
        .name()
        .map(|n| String::from_utf8_lossy(n.as_ref()).into_owned())
        .unwrap_or_default();

    let mapping_quality = record.mapping_quality().map(u8::from).unwrap_or(0);

    Ok(Some(AlignedRead {
        name,
        read_group,
        mapping_quality,
        reference_start,
        cigar,
        sequence,
        qualities,
        forward_strand: !flags.is_reverse_complemented(),
    }))
}

fn convert_cigar_kind(kind: SamOpKind) -> CigarKind {
    match kind {
        SamOpKind::Match | SamOpKind::SequenceMatch | SamOpKind::SequenceMismatch => {
            CigarKind::AlignMatch
        }
        SamOpKind::Insertion => CigarKind::Insertion,
        SamOpKind::Deletion => CigarKind::Deletion,
        SamOpKind::Skip => CigarKind::Skip,
        SamOpKind::SoftClip => CigarKind::SoftClip,
        SamOpKind::HardClip => CigarKind::HardClip,
        SamOpKind::Pad => CigarKind::Pad,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::InMemoryReference;
    use pretty_assertions::assert_eq;

    fn read(name: &str, start: usize, cigar: Vec<CigarOp>, seq: &str) -> AlignedRead {
        AlignedRead {
            name: name.to_owned(),
            read_group: "lib1".to_owned(),
            mapping_quality: 60,
            reference_start: start,
            cigar,
            sequence: seq.as_bytes().to_vec(),
            qualities: vec![30; seq.len()],
            forward_strand: true,
        }
    }

    fn m(len: u32) -> CigarOp {
        CigarOp {
            kind: CigarKind::AlignMatch,
            len,
        }
    }
    fn d(len: u32) -> CigarOp {
        CigarOp {
            kind: CigarKind::Deletion,
            len,
        }
    }
    fn ins(len: u32) -> CigarOp {
        CigarOp {
            kind: CigarKind::Insertion,
            len,
        }
    }

    fn reference() -> Arc<dyn ReferenceProvider> {
        let mut r = InMemoryReference::new();
        r.insert("chr1", "acgtacgtacgtacgtacgt");
        Arc::new(r)
    }

    #[test]
    fn simple_match_produces_one_column_per_base() {
        let reads = vec![read("r1", 0, vec![m(4)], "acgt")];
        let columns: Vec<_> = PileupAssembler::new(reads.into_iter(), reference(), "chr1")
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].position, 0);
        assert_eq!(columns[3].position, 3);
    }

    #[test]
    fn deletion_spans_multiple_columns_with_in_deletion_flag() {
        // Read covers ref 0..2 matched, then a 3-base deletion (ref 2,3,4),
        // then matches again at ref 5..7.
        let reads = vec![read("r1", 0, vec![m(2), d(3), m(2)], "acac")];
        let columns: Vec<_> = PileupAssembler::new(reads.into_iter(), reference(), "chr1")
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(columns.len(), 7);
        // position 1 is the last matched column before the deletion: it
        // must carry indel_length == -3.
        assert_eq!(columns[1].observations[0].indel_length, -3);
        for pos in 2..5 {
            assert!(columns[pos].observations[0].in_deletion);
            assert!(columns[pos].observations[0].base.is_none());
        }
        assert!(!columns[5].observations[0].in_deletion);
    }

    #[test]
    fn insertion_reported_on_preceding_column() {
        let reads = vec![read("r1", 0, vec![m(2), ins(2), m(2)], "acTTgt")];
        let columns: Vec<_> = PileupAssembler::new(reads.into_iter(), reference(), "chr1")
            .map(|c| c.unwrap())
            .collect();
        // 2 matched + 2 matched after insertion = 4 reference-consuming cols.
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[1].observations[0].indel_length, 2);
        assert_eq!(
            columns[1].observations[0].inserted_bases.as_deref(),
            Some("TT")
        );
    }

    #[test]
    fn cigar_kind_conversion_collapses_sequence_match_and_mismatch() {
        assert_eq!(convert_cigar_kind(SamOpKind::Match), CigarKind::AlignMatch);
        assert_eq!(
            convert_cigar_kind(SamOpKind::SequenceMatch),
            CigarKind::AlignMatch
        );
        assert_eq!(
            convert_cigar_kind(SamOpKind::SequenceMismatch),
            CigarKind::AlignMatch
        );
        assert_eq!(convert_cigar_kind(SamOpKind::Insertion), CigarKind::Insertion);
        assert_eq!(convert_cigar_kind(SamOpKind::Deletion), CigarKind::Deletion);
        assert_eq!(convert_cigar_kind(SamOpKind::Skip), CigarKind::Skip);
        assert_eq!(convert_cigar_kind(SamOpKind::SoftClip), CigarKind::SoftClip);
        assert_eq!(convert_cigar_kind(SamOpKind::HardClip), CigarKind::HardClip);
        assert_eq!(convert_cigar_kind(SamOpKind::Pad), CigarKind::Pad);
    }

    #[test]
    fn overlapping_reads_share_columns() {
        let reads = vec![
            read("r1", 0, vec![m(4)], "acgt"),
            read("r2", 2, vec![m(4)], "gtac"),
        ];
        let columns: Vec<_> = PileupAssembler::new(reads.into_iter(), reference(), "chr1")
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[2].observations.len(), 2);
        assert_eq!(columns[5].observations.len(), 1);
    }
}
