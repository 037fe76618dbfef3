//! SNV discovery engine (§4.C): turns a pileup column stream into a stream
//! of multi-allelic `Variant`s, tracking in-progress deletions per read
//! across columns.
//!
//! Grounded on `original_source/biolib/src/biolib/snv/snv.py::_snvs_in_bam`
//! (the `current_deletions` bookkeeping there is `in_progress_deletions`
//! here) and `calculate_kind` for the aggregate-kind fold rule.

use std::collections::HashMap;

use crate::err::InputShapeError;
use crate::model::variant::{AlleleKind, Variant};
use crate::pileup::{PileupColumn, ReadObservation};

struct PendingDeletion {
    length: usize,
    remaining: usize,
    report_pending: bool,
}

/// Consumes a pileup column stream, yielding one `Variant` per position with
/// more than one distinct allele key (§4.C).
pub struct DiscoveryEngine<I: Iterator<Item = Result<PileupColumn, anyhow::Error>>> {
    columns: I,
    in_progress_deletions: HashMap<String, PendingDeletion>,
}

impl<I: Iterator<Item = Result<PileupColumn, anyhow::Error>>> DiscoveryEngine<I> {
    pub fn new(columns: I) -> Self {
        Self {
            columns,
            in_progress_deletions: HashMap::new(),
        }
    }

    fn process_column(
        &mut self,
        column: PileupColumn,
    ) -> Result<Option<Variant>, InputShapeError> {
        let mut variant = Variant::new(column.reference.clone(), column.position);
        for obs in &column.observations {
            self.record_observation(&mut variant, &column, obs);
        }
        variant.check_consistent()?;
        Ok((variant.allele_key_count() > 1).then_some(variant))
    }

    fn record_observation(&mut self, variant: &mut Variant, column: &PileupColumn, obs: &ReadObservation) {
        if let Some(pending) = self.in_progress_deletions.get_mut(&obs.read_name) {
            if pending.report_pending {
                let key = ("-".repeat(pending.length), AlleleKind::Deletion);
                variant.alleles.entry(key).or_default().push(
                    &obs.read_name,
                    &obs.read_group,
                    obs.forward_strand,
                    None,
                    obs.mapping_quality,
                );
                pending.report_pending = false;
            }
            pending.remaining -= 1;
            if pending.remaining == 0 {
                self.in_progress_deletions.remove(&obs.read_name);
            }
        } else if let Some(base) = obs.base {
            let allele = (base as char).to_string();
            let kind = if base != column.reference_base {
                AlleleKind::Snp
            } else {
                AlleleKind::Invariant
            };
            variant.alleles.entry((allele, kind)).or_default().push(
                &obs.read_name,
                &obs.read_group,
                obs.forward_strand,
                obs.base_quality,
                obs.mapping_quality,
            );
        }

        if obs.indel_length < 0 {
            let length = (-obs.indel_length) as usize;
            self.in_progress_deletions.insert(
                obs.read_name.clone(),
                PendingDeletion {
                    length,
                    remaining: length,
                    report_pending: true,
                },
            );
        } else if obs.indel_length > 0 {
            if let Some(bases) = &obs.inserted_bases {
                variant
                    .alleles
                    .entry((bases.clone(), AlleleKind::Insertion))
                    .or_default()
                    .push(
                        &obs.read_name,
                        &obs.read_group,
                        obs.forward_strand,
                        obs.base_quality,
                        obs.mapping_quality,
                    );
            }
        }
    }
}

impl<I: Iterator<Item = Result<PileupColumn, anyhow::Error>>> Iterator for DiscoveryEngine<I> {
    type Item = Result<Variant, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let column = match self.columns.next()? {
                Ok(c) => c,
                Err(e) => return Some(Err(e)),
            };
            match self.process_column(column) {
                Ok(Some(v)) => return Some(Ok(v)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Folds a variant's set of allele kinds into one aggregate kind (§4.C).
pub fn aggregate_kind(kinds: impl IntoIterator<Item = AlleleKind>) -> AlleleKind {
    let mut iter = kinds.into_iter();
    let first = match iter.next() {
        Some(k) => k,
        None => return AlleleKind::Invariant,
    };
    iter.fold(first, fold_pair)
}

fn fold_pair(a: AlleleKind, b: AlleleKind) -> AlleleKind {
    use AlleleKind::*;
    if a == b {
        a
    } else if a == Invariant {
        b
    } else if b == Invariant {
        a
    } else if matches!(a, Snp | Complex) || matches!(b, Snp | Complex) {
        Complex
    } else {
        Indel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pileup::ReadObservation;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn obs(name: &str, base: Option<u8>, indel_length: i32, in_deletion: bool) -> ReadObservation {
        ReadObservation {
            read_name: name.to_owned(),
            read_group: "lib1".to_owned(),
            mapping_quality: 60,
            base,
            base_quality: base.map(|_| 30),
            forward_strand: true,
            indel_length,
            in_deletion,
            inserted_bases: None,
        }
    }

    fn column(position: usize, reference_base: u8, observations: Vec<ReadObservation>) -> PileupColumn {
        PileupColumn {
            reference: "chr1".to_owned(),
            position,
            reference_base,
            observations,
        }
    }

    #[test]
    fn single_allele_column_yields_no_variant() {
        let columns = vec![Ok(column(
            0,
            b'a',
            vec![obs("r1", Some(b'a'), 0, false), obs("r2", Some(b'a'), 0, false)],
        ))];
        let variants: Vec<_> = DiscoveryEngine::new(columns.into_iter())
            .map(|v| v.unwrap())
            .collect();
        assert!(variants.is_empty());
    }

    #[test]
    fn snp_against_invariant_yields_variant() {
        let columns = vec![Ok(column(
            0,
            b'a',
            vec![obs("r1", Some(b'a'), 0, false), obs("r2", Some(b'g'), 0, false)],
        ))];
        let variants: Vec<_> = DiscoveryEngine::new(columns.into_iter())
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].allele_key_count(), 2);
    }

    #[test]
    fn deletion_carried_across_columns_emits_once() {
        let mut del_obs = obs("r1", Some(b'a'), -2, false);
        del_obs.indel_length = -2;
        let columns = vec![
            Ok(column(0, b'a', vec![del_obs, obs("r2", Some(b'a'), 0, false)])),
            Ok(column(
                1,
                b'c',
                vec![
                    obs("r1", None, 0, true),
                    obs("r2", Some(b'c'), 0, false),
                ],
            )),
            Ok(column(
                2,
                b'g',
                vec![
                    obs("r1", None, 0, true),
                    obs("r2", Some(b'g'), 0, false),
                ],
            )),
        ];
        let variants: Vec<_> = DiscoveryEngine::new(columns.into_iter())
            .map(|v| v.unwrap())
            .collect();
        // Position 1: r1 reports the deletion allele once, r2 an invariant
        // base -> 2 distinct alleles.
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].position, 1);
        assert!(variants[0]
            .alleles
            .contains_key(&("--".to_owned(), AlleleKind::Deletion)));
        // Position 2 has r1 still consuming the deletion with no new report,
        // plus r2's invariant base -> only 1 distinct allele, no variant.
    }

    #[rstest]
    #[case(vec![AlleleKind::Invariant, AlleleKind::Invariant], AlleleKind::Invariant)]
    #[case(vec![AlleleKind::Snp, AlleleKind::Invariant], AlleleKind::Snp)]
    #[case(vec![AlleleKind::Insertion, AlleleKind::Deletion], AlleleKind::Indel)]
    #[case(vec![AlleleKind::Snp, AlleleKind::Insertion], AlleleKind::Complex)]
    #[case(vec![AlleleKind::Indel, AlleleKind::Insertion], AlleleKind::Indel)]
    fn aggregate_kind_matches_fold_rule(#[case] kinds: Vec<AlleleKind>, #[case] expected: AlleleKind) {
        assert_eq!(aggregate_kind(kinds), expected);
    }
}
