//! The Variant (SNV feature) data model (§3) and its allele evidence.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::context::Located;
use crate::err::InputShapeError;

/// Classification of a single observed allele, or (for `Indel`/`Complex`)
/// the aggregate classification of a whole variant. Per §3, `Indel` and
/// `Complex` are never stored as the kind of an individual allele.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum AlleleKind {
    Snp,
    Insertion,
    Deletion,
    Invariant,
    Indel,
    Complex,
}

/// Key identifying one allele at a variant site: its literal base string
/// (dash-padded by length for deletions, see §4.C) and its kind.
pub type AlleleKey = (String, AlleleKind);

/// Parallel evidence arrays for a single allele. Invariant: all five arrays
/// have equal length, equal to the allele's read count (§3).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlleleEvidence {
    pub read_names: Vec<String>,
    pub read_groups: Vec<String>,
    pub orientations: Vec<bool>,
    pub qualities: Vec<Option<u8>>,
    pub mapping_qualities: Vec<u8>,
}

impl AlleleEvidence {
    pub fn len(&self) -> usize {
        self.read_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_names.is_empty()
    }

    /// Checks the parallel-array invariant (§3, §8 invariant 2).
    pub fn check_consistent(&self) -> Result<(), InputShapeError> {
        let lengths = [
            self.read_names.len(),
            self.read_groups.len(),
            self.orientations.len(),
            self.qualities.len(),
            self.mapping_qualities.len(),
        ];
        if lengths.iter().all(|&l| l == lengths[0]) {
            Ok(())
        } else {
            Err(InputShapeError::InconsistentEvidenceArrays {
                allele: (String::new(), String::new()),
                lengths: lengths.to_vec(),
            })
        }
    }

    /// Appends one observation, keeping the parallel arrays in lock-step.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        read_name: impl Into<String>,
        read_group: impl Into<String>,
        orientation: bool,
        quality: Option<u8>,
        mapping_quality: u8,
    ) {
        self.read_names.push(read_name.into());
        self.read_groups.push(read_group.into());
        self.orientations.push(orientation);
        self.qualities.push(quality);
        self.mapping_qualities.push(mapping_quality);
    }
}

/// A 64-bit float wrapped for use as a hashable, totally-ordered cache key.
/// Threshold parameters are immutable once a filter stage is constructed,
/// so bit-pattern equality is exactly what we want here.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct OrderedF64(pub f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for OrderedF64 {}
impl std::hash::Hash for OrderedF64 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}
impl From<f64> for OrderedF64 {
    fn from(v: f64) -> Self {
        OrderedF64(v)
    }
}

/// Which grouping rule the `is_variable` filter restricts observations to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum GroupKind {
    Libraries,
    ReadGroups,
    Samples,
}

/// Immutable parameter tuple identifying one filter-cache entry (§3
/// "Filter-result cache").
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ThresholdKey {
    Distance(usize),
    Frequency(OrderedF64),
    Window {
        max_percent: OrderedF64,
        window: Option<usize>,
    },
    Kind(AlleleKind),
    AllEnzymes(bool),
    Variable {
        group_kind: GroupKind,
        groups: Vec<String>,
        in_union: bool,
    },
}

/// `filters: map<filter_name, map<threshold_key, boolean>>` (§3). `true`
/// means "failed this filter".
pub type FilterCache = HashMap<String, HashMap<ThresholdKey, bool>>;

/// A sequence variation at a reference position (§3). Created by the
/// discovery engine (§4.C) and immutable thereafter except for the
/// `cap_enzymes`/`filters` annotation caches.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    pub reference: String,
    pub position: usize,
    pub alleles: IndexMap<AlleleKey, AlleleEvidence>,
    /// `None` = not yet computed; `Some(set)` = computed, possibly empty
    /// (§7 recoverable-condition rule distinguishes the two).
    pub cap_enzymes: Option<std::collections::BTreeSet<String>>,
    #[serde(default)]
    pub filters: FilterCache,
    /// Cached sorted-allele order; populated on first `sorted_alleles` call
    /// and read thereafter (§5 ordering guarantee).
    #[serde(default)]
    pub sorted_order: Option<Vec<AlleleKey>>,
}

impl Located for Variant {
    fn reference(&self) -> &str {
        &self.reference
    }

    fn location(&self) -> i64 {
        self.position as i64
    }
}

impl Variant {
    pub fn new(reference: impl Into<String>, position: usize) -> Self {
        Self {
            reference: reference.into(),
            position,
            alleles: IndexMap::new(),
            cap_enzymes: None,
            filters: HashMap::new(),
            sorted_order: None,
        }
    }

    /// Total number of observations across all alleles.
    pub fn total_reads(&self) -> usize {
        self.alleles.values().map(AlleleEvidence::len).sum()
    }

    /// Number of distinct `(allele, kind)` keys recorded at this site.
    pub fn allele_key_count(&self) -> usize {
        self.alleles.len()
    }

    /// Validates §8 invariant 2 for every allele in this variant.
    pub fn check_consistent(&self) -> Result<(), InputShapeError> {
        for (key, ev) in &self.alleles {
            ev.check_consistent().map_err(|_| {
                InputShapeError::InconsistentEvidenceArrays {
                    allele: (key.0.clone(), key.1.to_string()),
                    lengths: vec![
                        ev.read_names.len(),
                        ev.read_groups.len(),
                        ev.orientations.len(),
                        ev.qualities.len(),
                        ev.mapping_qualities.len(),
                    ],
                }
            })?;
        }
        Ok(())
    }

    /// Reads restricted to the given predicate over an allele's read-group
    /// list, producing the subset of alleles (by kind) actually observed.
    pub fn allele_kinds_for<'a>(
        &'a self,
        mut read_group_matches: impl FnMut(&str) -> bool,
    ) -> std::collections::HashSet<AlleleKind> {
        let mut kinds = std::collections::HashSet::new();
        for (key, evidence) in &self.alleles {
            if evidence
                .read_groups
                .iter()
                .any(|rg| read_group_matches(rg.as_str()))
            {
                kinds.insert(key.1);
            }
        }
        kinds
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn evidence_push_keeps_arrays_in_lockstep() {
        let mut ev = AlleleEvidence::default();
        ev.push("r1", "lib1", true, Some(30), 60);
        ev.push("r2", "lib1", false, None, 40);
        assert_eq!(ev.len(), 2);
        ev.check_consistent().unwrap();
    }

    #[test]
    fn inconsistent_arrays_detected() {
        let mut ev = AlleleEvidence::default();
        ev.read_names.push("r1".to_owned());
        assert!(ev.check_consistent().is_ok());
        ev.read_groups.push("lib1".to_owned());
        ev.read_groups.push("lib1".to_owned());
        assert!(ev.check_consistent().is_err());
    }

    #[test]
    fn ordered_f64_equal_by_bits() {
        let a: OrderedF64 = 0.5.into();
        let b: OrderedF64 = 0.5.into();
        assert_eq!(a, b);
    }
}
