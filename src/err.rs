//! Error types for the pipeline core, grouped by the semantic roles laid
//! out in the error-handling design (malformed input, bad configuration,
//! external-tool failure).

/// Errors detected at an input boundary: malformed pileup data, mismatched
/// parallel evidence arrays, or a reference sequence that cannot be found.
#[derive(thiserror::Error, Debug, Clone)]
pub enum InputShapeError {
    #[error("pileup column at {reference}:{position} is malformed: {reason}")]
    MalformedPileupColumn {
        reference: String,
        position: usize,
        reason: String,
    },

    #[error("allele evidence arrays have mismatched lengths for allele {allele:?}: {lengths:?}")]
    InconsistentEvidenceArrays {
        allele: (String, String),
        lengths: Vec<usize>,
    },

    #[error("sequence {name:?} has quality length {qual_len} but base length {seq_len}")]
    SequenceQualityLengthMismatch {
        name: String,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("reference sequence {0:?} not found in FASTA index")]
    MissingReferenceSequence(String),

    #[error("variant at {reference}:{position} has zero supporting observations")]
    EmptyVariant { reference: String, position: usize },
}

/// Errors detected while building a pipeline: mutually exclusive options,
/// missing required parameters, or an unknown filter/score name.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    #[error("options {0} and {1} are mutually exclusive")]
    MutuallyExclusiveOptions(&'static str, &'static str),

    #[error("required parameter {0} was not supplied")]
    MissingParameter(&'static str),

    #[error("unknown filter name {0:?}")]
    UnknownFilter(String),

    #[error("score key {score_key:?} is not available from a {source} source")]
    UnsupportedScoreKey {
        score_key: String,
        source: &'static str,
    },
}

/// Errors surfaced by an invoked external tool (restriction mapper, aligner).
#[derive(thiserror::Error, Debug, Clone)]
#[error("external tool {tool} failed (exit={exit_code:?}): {stderr}")]
pub struct ToolError {
    pub tool: &'static str,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Errors raised while walking or filtering alignment results (§4.F).
#[derive(thiserror::Error, Debug, Clone)]
pub enum AlignmentError {
    #[error("score key {0:?} is present on neither the match nor its first match-part")]
    MissingScore(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
