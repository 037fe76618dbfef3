//! SNV filter pipeline (§4.E): a configured list of stages, each a mapper
//! that idempotently annotates a variant's filter-result cache keyed by
//! `(filter_name, threshold)`.
//!
//! Grounded on `original_source/franklin/snv/snv_filters.py`'s
//! `create_*_filter` factories.

pub mod describe;

use std::collections::{HashMap, HashSet};

use crate::err::ConfigError;
use crate::model::feature::FeatureKind;
use crate::model::sequence::Sequence;
use crate::model::variant::{AlleleKind, GroupKind, OrderedF64, ThresholdKey, Variant};
use crate::reference::ReferenceProvider;
use crate::snv::annotation;
use crate::snv::discovery::aggregate_kind;

/// Result of the blast-based uniqueness/contiguity check that
/// `uniq_contiguous` delegates to (§1: blast is a thin external
/// collaborator, not reimplemented here).
pub trait UniqueContiguousEvaluator {
    /// `true` if the window of sequence around a variant is unique and
    /// contiguous in the reference genomic database.
    fn is_unique_contiguous(&self, window_sequence: &str) -> bool;
}

/// Shared read-only context a filter stage needs beyond the sequence itself.
pub struct FilterContext<'a> {
    pub reference: &'a dyn ReferenceProvider,
    pub uniq_contiguous: Option<&'a dyn UniqueContiguousEvaluator>,
}

/// One configured filter stage (§4.E table). Each variant is named after
/// its `FILTER_DESCRIPTIONS` key.
#[derive(Debug, Clone)]
pub enum FilterStage {
    UniqContiguous { distance: usize },
    CloseToIntron { distance: usize },
    HighVariableRegion { max_percent: f64, window: Option<usize> },
    CloseToSnv { distance: usize },
    CloseToLimit { distance: usize },
    Maf { frequency: f64 },
    ByKind { kind: AlleleKind },
    CapEnzymes { all_enzymes: bool },
    IsVariable {
        group_kind: GroupKind,
        groups: Vec<String>,
        in_union: bool,
    },
}

impl FilterStage {
    pub fn name(&self) -> &'static str {
        match self {
            FilterStage::UniqContiguous { .. } => "uniq_contiguous",
            FilterStage::CloseToIntron { .. } => "close_to_intron",
            FilterStage::HighVariableRegion { .. } => "high_variable_region",
            FilterStage::CloseToSnv { .. } => "close_to_snv",
            FilterStage::CloseToLimit { .. } => "close_to_limit",
            FilterStage::Maf { .. } => "maf",
            FilterStage::ByKind { .. } => "by_kind",
            FilterStage::CapEnzymes { .. } => "cap_enzymes",
            FilterStage::IsVariable { .. } => "is_variable",
        }
    }

    fn threshold_key(&self) -> ThresholdKey {
        match self {
            FilterStage::UniqContiguous { distance } => ThresholdKey::Distance(*distance),
            FilterStage::CloseToIntron { distance } => ThresholdKey::Distance(*distance),
            FilterStage::HighVariableRegion { max_percent, window } => ThresholdKey::Window {
                max_percent: OrderedF64(*max_percent),
                window: *window,
            },
            FilterStage::CloseToSnv { distance } => ThresholdKey::Distance(*distance),
            FilterStage::CloseToLimit { distance } => ThresholdKey::Distance(*distance),
            FilterStage::Maf { frequency } => ThresholdKey::Frequency(OrderedF64(*frequency)),
            FilterStage::ByKind { kind } => ThresholdKey::Kind(*kind),
            FilterStage::CapEnzymes { all_enzymes } => ThresholdKey::AllEnzymes(*all_enzymes),
            FilterStage::IsVariable {
                group_kind,
                groups,
                in_union,
            } => ThresholdKey::Variable {
                group_kind: *group_kind,
                groups: groups.clone(),
                in_union: *in_union,
            },
        }
    }

    /// Applies this stage to every `snv` feature of `sequence`, in place.
    /// A mapper that already holds this `(name, threshold)` key in its cache
    /// is a no-op (§4.E, §8 invariant 5).
    pub fn apply(&self, sequence: &mut Sequence, ctx: &FilterContext) -> anyhow::Result<()> {
        let name = self.name();
        let key = self.threshold_key();

        // Snapshot whatever cross-variant context this stage needs before
        // taking mutable borrows of individual features.
        let intron_starts: Vec<usize> = sequence
            .features_of_kind(FeatureKind::Intron)
            .map(|f| f.start)
            .collect();
        let sequence_len = sequence.len();
        let all_variants: Vec<Variant> = sequence
            .features_of_kind(FeatureKind::Snv)
            .filter_map(|f| f.as_variant())
            .cloned()
            .collect();
        let bases = sequence.bases.clone();

        // `CloseToSnv`/`HighVariableRegion` need, per variant, the count of
        // other variants within a fixed window — computed once per stage
        // application via `context::context_iter` rather than rescanning
        // `all_variants` for every individual variant.
        let window_counts: Option<HashMap<(String, usize), usize>> = match self {
            FilterStage::HighVariableRegion { window: Some(w), .. } => {
                Some(annotation::snv_window_counts(&all_variants, *w))
            }
            FilterStage::CloseToSnv { distance } => {
                Some(annotation::snv_window_counts(&all_variants, distance * 2))
            }
            _ => None,
        };

        for feature in sequence.features.iter_mut() {
            let Some(variant) = feature.as_variant_mut() else {
                continue;
            };
            if variant
                .filters
                .get(name)
                .and_then(|cache| cache.get(&key))
                .is_some()
            {
                continue;
            }

            let result = match self {
                FilterStage::UniqContiguous { distance } => match ctx.uniq_contiguous {
                    Some(evaluator) => {
                        let start = variant.position.saturating_sub(*distance);
                        let end = (variant.position + distance).min(sequence_len);
                        let window = &bases[start..end];
                        !evaluator.is_unique_contiguous(window)
                    }
                    None => false,
                },
                FilterStage::CloseToIntron { distance } => intron_starts
                    .iter()
                    .any(|start| (variant.position as i64 - *start as i64).unsigned_abs() < *distance as u64),
                FilterStage::HighVariableRegion { max_percent, window } => {
                    let (snv_num, total_length) = match window {
                        None => (all_variants.len(), sequence_len),
                        Some(w) => (
                            window_counts
                                .as_ref()
                                .and_then(|m| m.get(&(variant.reference.clone(), variant.position)))
                                .copied()
                                .unwrap_or(0),
                            *w,
                        ),
                    };
                    let density = (snv_num as f64 / total_length as f64) * 100.0;
                    density > *max_percent
                }
                FilterStage::CloseToSnv { .. } => {
                    let count = window_counts
                        .as_ref()
                        .and_then(|m| m.get(&(variant.reference.clone(), variant.position)))
                        .copied()
                        .unwrap_or(0);
                    count > 1
                }
                FilterStage::CloseToLimit { distance } => {
                    variant.position < *distance || variant.position + distance > sequence_len
                }
                FilterStage::Maf { frequency } => annotation::maf(variant)? > *frequency,
                FilterStage::ByKind { kind } => {
                    aggregate_kind(variant.alleles.keys().map(|k| k.1)) == *kind
                }
                FilterStage::CapEnzymes { all_enzymes } => {
                    !annotation::cap_enzymes(variant, ctx.reference, *all_enzymes)?.is_empty()
                }
                FilterStage::IsVariable {
                    groups, ..
                } => {
                    let group_set: HashSet<&str> = groups.iter().map(String::as_str).collect();
                    let kinds = variant.allele_kinds_for(|rg| group_set.contains(rg));
                    kinds.len() > 1
                }
            };

            variant
                .filters
                .entry(name.to_owned())
                .or_default()
                .insert(key.clone(), result);
        }
        Ok(())
    }
}

/// Mutually exclusive/required-parameter validation performed at pipeline
/// construction time (§7 "Configuration errors").
pub fn validate(stage: &FilterStage) -> Result<(), ConfigError> {
    if let FilterStage::IsVariable { groups, .. } = stage {
        if groups.is_empty() {
            return Err(ConfigError::MissingParameter("groups"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::feature::Feature;
    use crate::model::variant::AlleleEvidence;
    use crate::reference::InMemoryReference;

    fn sequence_with_variant(position: usize, alleles: &[(&str, AlleleKind, usize)]) -> Sequence {
        let mut seq = Sequence::new("s1", "a".repeat(40), None).unwrap();
        let mut v = Variant::new("s1", position);
        for (base, kind, count) in alleles {
            let mut ev = AlleleEvidence::default();
            for i in 0..*count {
                ev.push(format!("r{i}"), "lib1", true, Some(30), 60);
            }
            v.alleles.insert((base.to_string(), *kind), ev);
        }
        seq.features.push(Feature::from_variant(v));
        seq
    }

    fn ctx(reference: &dyn ReferenceProvider) -> FilterContext<'_> {
        FilterContext {
            reference,
            uniq_contiguous: None,
        }
    }

    #[test]
    fn maf_filter_caches_result_and_is_idempotent() {
        let mut seq = sequence_with_variant(
            10,
            &[("a", AlleleKind::Invariant, 8), ("g", AlleleKind::Snp, 2)],
        );
        let r = InMemoryReference::new();
        let stage = FilterStage::Maf { frequency: 0.5 };
        stage.apply(&mut seq, &ctx(&r)).unwrap();
        let variant = seq.features[0].as_variant().unwrap();
        let cached = variant.filters["maf"][&ThresholdKey::Frequency(OrderedF64(0.5))];
        // major allele frequency 8/10 = 0.8 > 0.5, so the filter fails it.
        assert!(cached);
    }

    #[test]
    fn close_to_limit_flags_variant_near_start() {
        let mut seq = sequence_with_variant(2, &[("a", AlleleKind::Invariant, 1), ("g", AlleleKind::Snp, 1)]);
        let r = InMemoryReference::new();
        let stage = FilterStage::CloseToLimit { distance: 5 };
        stage.apply(&mut seq, &ctx(&r)).unwrap();
        let variant = seq.features[0].as_variant().unwrap();
        assert!(variant.filters["close_to_limit"][&ThresholdKey::Distance(5)]);
    }

    #[test]
    fn close_to_snv_flags_variant_with_a_neighbour_in_range() {
        let mut seq = Sequence::new("s1", "a".repeat(40), None).unwrap();
        for position in [10, 12, 30] {
            let mut v = Variant::new("s1", position);
            v.alleles.insert(
                ("a".to_owned(), AlleleKind::Invariant),
                AlleleEvidence::default(),
            );
            seq.features.push(Feature::from_variant(v));
        }
        let r = InMemoryReference::new();
        let stage = FilterStage::CloseToSnv { distance: 5 };
        stage.apply(&mut seq, &ctx(&r)).unwrap();

        let near = seq.features[0].as_variant().unwrap();
        assert!(near.filters["close_to_snv"][&ThresholdKey::Distance(5)]);
        let far = seq.features[2].as_variant().unwrap();
        assert!(!far.filters["close_to_snv"][&ThresholdKey::Distance(5)]);
    }

    #[test]
    fn by_kind_matches_aggregate_kind() {
        let mut seq = sequence_with_variant(
            10,
            &[("a", AlleleKind::Invariant, 1), ("g", AlleleKind::Snp, 1)],
        );
        let r = InMemoryReference::new();
        let stage = FilterStage::ByKind {
            kind: AlleleKind::Snp,
        };
        stage.apply(&mut seq, &ctx(&r)).unwrap();
        let variant = seq.features[0].as_variant().unwrap();
        assert!(variant.filters["by_kind"][&ThresholdKey::Kind(AlleleKind::Snp)]);
    }
}
