//! The vertical slice of all aligned-read bases covering a single reference
//! position (§4.B, GLOSSARY "Pileup column").

/// One read's observation at a single pileup column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadObservation {
    pub read_name: String,
    pub read_group: String,
    pub mapping_quality: u8,
    /// The read base at this column, lower-cased (`None` while the read is
    /// "inside a deletion" and reports no base here).
    pub base: Option<u8>,
    pub base_quality: Option<u8>,
    /// `true` = forward strand.
    pub forward_strand: bool,
    /// 0 = no indel here; `+n` = insertion of `n` bases right after this
    /// column; `-n` = deletion of `n` bases starting at the next reference
    /// position (§4.B).
    pub indel_length: i32,
    /// True if this read is currently inside an in-progress deletion that
    /// started at an earlier column (§4.B).
    pub in_deletion: bool,
    /// The `indel_length` bases read from the query right after this column,
    /// populated only when `indel_length > 0` (an insertion).
    pub inserted_bases: Option<String>,
}

/// One reference position and every read observation covering it (§4.B).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupColumn {
    pub reference: String,
    /// 0-based reference position.
    pub position: usize,
    /// The reference base at this position, lower-cased.
    pub reference_base: u8,
    pub observations: Vec<ReadObservation>,
}
