//! The sequence model (§3, §4.A): identifier, bases, optional per-base
//! quality, and an ordered list of features.

use crate::err::InputShapeError;
use crate::model::feature::{Feature, FeatureKind};

/// A named sequence with optional per-base quality and an ordered feature
/// list. Invariant: if `quality` is present its length equals `bases.len()`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub bases: String,
    pub quality: Option<Vec<u8>>,
    pub features: Vec<Feature>,
}

impl Sequence {
    /// Builds a new sequence, validating the quality/base-length invariant.
    pub fn new(
        id: impl Into<String>,
        bases: impl Into<String>,
        quality: Option<Vec<u8>>,
    ) -> Result<Self, InputShapeError> {
        let id = id.into();
        let bases = bases.into();
        if let Some(qual) = &quality {
            if qual.len() != bases.len() {
                return Err(InputShapeError::SequenceQualityLengthMismatch {
                    name: id,
                    seq_len: bases.len(),
                    qual_len: qual.len(),
                });
            }
        }
        Ok(Self {
            id,
            description: None,
            bases,
            quality,
            features: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Features of the given kind, in declaration order.
    pub fn features_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(move |f| f.kind == kind)
    }

    /// A substring `[start, end)` as a new `Sequence`, preserving quality and
    /// locally intersecting (and re-based) features.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let start = start.min(self.bases.len());
        let end = end.min(self.bases.len()).max(start);
        let bases = self.bases[start..end].to_owned();
        let quality = self
            .quality
            .as_ref()
            .map(|q| q[start..end].to_vec());
        let features = self
            .features
            .iter()
            .filter_map(|f| f.intersect(start, end))
            .collect();
        Sequence {
            id: self.id.clone(),
            description: self.description.clone(),
            bases,
            quality,
            features,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::feature::FeatureKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn new_rejects_mismatched_quality_length() {
        let err = Sequence::new("s1", "ACGT", Some(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            InputShapeError::SequenceQualityLengthMismatch { .. }
        ));
    }

    #[test]
    fn new_accepts_matching_quality_length() {
        let seq = Sequence::new("s1", "ACGT", Some(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(seq.len(), 4);
    }

    #[rstest]
    #[case(0, 4, "ACGT")]
    #[case(1, 3, "CG")]
    #[case(4, 4, "")]
    fn slice_preserves_quality_and_features(
        #[case] start: usize,
        #[case] end: usize,
        #[case] expected: &str,
    ) {
        let mut seq = Sequence::new("s1", "ACGT", Some(vec![10, 20, 30, 40])).unwrap();
        seq.features.push(Feature::new(FeatureKind::Orf, 1, 3).unwrap());
        let sliced = seq.slice(start, end);
        assert_eq!(sliced.bases, expected);
        assert_eq!(
            sliced.quality.unwrap().len(),
            expected.len()
        );
    }
}
