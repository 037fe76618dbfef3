//! Sequence, feature, and variant data model (§3, §4.A).

pub mod feature;
pub mod sequence;
pub mod variant;

pub use feature::{Feature, FeatureKind};
pub use sequence::Sequence;
pub use variant::{AlleleEvidence, AlleleKind, AlleleKey, Variant};
