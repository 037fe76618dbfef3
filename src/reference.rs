//! Reference sequence access (§4.A): random access by sequence name over an
//! external FASTA, used as the source of reference bases for variant
//! classification (§6). Full FASTA parsing is out of scope (§1 Non-goals);
//! this module is a thin indexed-random-access adapter over `noodles-fasta`.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use noodles_core::Position;
use noodles_fasta as fasta;

use crate::err::InputShapeError;

/// Random access to reference bases and sequence lengths by name.
pub trait ReferenceProvider {
    fn sequence_len(&self, name: &str) -> Option<usize>;

    /// The base at 0-based position `pos` of sequence `name`, lower-cased.
    fn base_at(&self, name: &str, pos: usize) -> Result<u8, InputShapeError> {
        let s = self.fetch(name, pos, pos + 1)?;
        Ok(s.as_bytes()[0])
    }

    /// The half-open `[start, end)` substring of sequence `name`.
    fn fetch(&self, name: &str, start: usize, end: usize) -> Result<String, InputShapeError>;
}

/// A `noodles-fasta` indexed reader, opened once at pipeline construction
/// and shared read-only thereafter (§5 "read-only process-wide resources
/// created once at pipeline construction").
pub struct IndexedFastaReference {
    reader: std::cell::RefCell<fasta::io::IndexedReader<std::io::BufReader<File>>>,
    lengths: HashMap<String, usize>,
}

impl IndexedFastaReference {
    pub fn open(fasta_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let fasta_path = fasta_path.as_ref();
        let index_path = format!("{}.fai", fasta_path.display());
        let index = fasta::fai::read(&index_path)?;
        let lengths = index
            .iter()
            .map(|record| {
                (
                    String::from_utf8_lossy(record.name()).into_owned(),
                    record.length() as usize,
                )
            })
            .collect();
        let reader = fasta::io::indexed_reader::Builder::default()
            .set_index(index)
            .build_from_path(fasta_path)?;
        Ok(Self {
            reader: std::cell::RefCell::new(reader),
            lengths,
        })
    }
}

impl ReferenceProvider for IndexedFastaReference {
    fn sequence_len(&self, name: &str) -> Option<usize> {
        self.lengths.get(name).copied()
    }

    fn fetch(&self, name: &str, start: usize, end: usize) -> Result<String, InputShapeError> {
        let len = self
            .sequence_len(name)
            .ok_or_else(|| InputShapeError::MissingReferenceSequence(name.to_owned()))?;
        let end = end.min(len);
        let start_pos = Position::try_from(start + 1)
            .map_err(|_| InputShapeError::MissingReferenceSequence(name.to_owned()))?;
        let end_pos = Position::try_from(end.max(start + 1))
            .map_err(|_| InputShapeError::MissingReferenceSequence(name.to_owned()))?;
        let region = noodles_core::Region::new(name, start_pos..=end_pos);
        let mut reader = self.reader.borrow_mut();
        let record = reader
            .query(&region)
            .map_err(|_| InputShapeError::MissingReferenceSequence(name.to_owned()))?;
        Ok(String::from_utf8_lossy(record.sequence().as_ref())
            .to_ascii_lowercase())
    }
}

/// An in-memory reference, used by tests and by callers that already have
/// the reference sequence loaded (e.g. as a `Sequence`).
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    pub sequences: HashMap<String, String>,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bases: impl Into<String>) -> &mut Self {
        self.sequences.insert(name.into(), bases.into());
        self
    }
}

impl ReferenceProvider for InMemoryReference {
    fn sequence_len(&self, name: &str) -> Option<usize> {
        self.sequences.get(name).map(|s| s.len())
    }

    fn fetch(&self, name: &str, start: usize, end: usize) -> Result<String, InputShapeError> {
        let seq = self
            .sequences
            .get(name)
            .ok_or_else(|| InputShapeError::MissingReferenceSequence(name.to_owned()))?;
        let end = end.min(seq.len());
        let start = start.min(end);
        Ok(seq[start..end].to_ascii_lowercase())
    }
}
