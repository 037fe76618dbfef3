//! Alignment-result model, parsers, and the filter pipeline (§4.F).

pub mod coverage;
pub mod model;
pub mod parsers;
pub mod pipeline;

pub use model::{AlignmentResult, Match, MatchPart};
pub use pipeline::{Pipeline, SourceKind, Stage};
