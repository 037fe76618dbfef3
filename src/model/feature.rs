//! Sequence features (§3): a kind tag, a half-open `[start, end)` location,
//! and a small typed payload per kind (Design Note: dynamic attribute bags
//! are replaced by a tagged variant over the enumerated feature kinds).

use crate::err::InputShapeError;
use crate::model::variant::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum FeatureKind {
    Snv,
    Orf,
    Intron,
    Microsatellite,
}

/// ORF-specific annotation (reading frame, 0/1/2).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrfInfo {
    pub frame: u8,
}

/// Microsatellite-specific annotation (the repeated motif).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MicrosatelliteInfo {
    pub motif: String,
}

/// A small typed record per feature kind, in place of a free-form attribute
/// bag.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FeaturePayload {
    Snv(Variant),
    Orf(OrfInfo),
    Intron,
    Microsatellite(MicrosatelliteInfo),
}

/// A feature attached to a sequence: kind, half-open location, and payload.
/// Invariant: `0 <= start <= end <= len(parent)` (checked by the caller that
/// owns the parent sequence; `Feature` itself only checks `start <= end`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub kind: FeatureKind,
    pub start: usize,
    pub end: usize,
    pub payload: FeaturePayload,
}

impl Feature {
    /// Builds a feature with a default payload for the given kind (useful
    /// for markers such as introns and ORFs that do not need a `Variant`).
    pub fn new(kind: FeatureKind, start: usize, end: usize) -> Result<Self, InputShapeError> {
        if start > end {
            return Err(InputShapeError::MalformedPileupColumn {
                reference: String::new(),
                position: start,
                reason: format!("feature start {start} > end {end}"),
            });
        }
        let payload = match kind {
            FeatureKind::Orf => FeaturePayload::Orf(OrfInfo { frame: 0 }),
            FeatureKind::Intron => FeaturePayload::Intron,
            FeatureKind::Microsatellite => FeaturePayload::Microsatellite(MicrosatelliteInfo {
                motif: String::new(),
            }),
            FeatureKind::Snv => {
                return Err(InputShapeError::MalformedPileupColumn {
                    reference: String::new(),
                    position: start,
                    reason: "SNV features require Feature::from_variant".to_owned(),
                })
            }
        };
        Ok(Self {
            kind,
            start,
            end,
            payload,
        })
    }

    /// Wraps a discovered `Variant` as an SNV feature at `[variant.position,
    /// variant.position + 1)`.
    pub fn from_variant(variant: Variant) -> Self {
        let start = variant.position;
        Self {
            kind: FeatureKind::Snv,
            start,
            end: start + 1,
            payload: FeaturePayload::Snv(variant),
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match &self.payload {
            FeaturePayload::Snv(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_variant_mut(&mut self) -> Option<&mut Variant> {
        match &mut self.payload {
            FeaturePayload::Snv(v) => Some(v),
            _ => None,
        }
    }

    /// Intersects this feature with `[start, end)`, returning a re-based
    /// copy if the intersection is non-empty.
    pub fn intersect(&self, start: usize, end: usize) -> Option<Feature> {
        let new_start = self.start.max(start);
        let new_end = self.end.min(end);
        if new_start >= new_end {
            return None;
        }
        Some(Feature {
            kind: self.kind,
            start: new_start - start,
            end: new_end - start,
            payload: self.payload.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intersect_outside_range_is_none() {
        let f = Feature::new(FeatureKind::Intron, 10, 20).unwrap();
        assert!(f.intersect(0, 5).is_none());
    }

    #[test]
    fn intersect_rebases_coordinates() {
        let f = Feature::new(FeatureKind::Intron, 10, 20).unwrap();
        let g = f.intersect(5, 15).unwrap();
        assert_eq!((g.start, g.end), (5, 10));
    }
}
