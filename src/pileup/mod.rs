//! Pileup reader (§4.B): streams per-column aligned-read observations from
//! a sorted, indexed binary alignment file.

pub mod column;
pub mod reader;

pub use column::{PileupColumn, ReadObservation};
pub use reader::{BamFileSource, BamPileupReader, PileupSource};
