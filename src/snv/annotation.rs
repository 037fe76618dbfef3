//! SNV annotation calculators (§4.D): derived statistics over a `Variant`'s
//! allele evidence, plus the cap-enzyme calculator that delegates to the
//! restriction-mapper external collaborator (`restriction`).
//!
//! Grounded on `original_source/franklin/snv/snv_annotation.py::
//! sorted_alleles`, `calculate_maf_frequency`, `calculate_snv_variability`,
//! `calculate_cap_enzymes`.

pub mod pic;

use std::collections::{BTreeSet, HashMap};

use crate::context::context_iter;
use crate::err::InputShapeError;
use crate::model::feature::FeatureKind;
use crate::model::sequence::Sequence;
use crate::model::variant::{AlleleEvidence, AlleleKey, Variant};
use crate::reference::ReferenceProvider;
use crate::restriction;

/// One allele with its evidence, as returned by `sorted_alleles`.
#[derive(Debug, Clone)]
pub struct SortedAllele<'a> {
    pub seq: &'a str,
    pub kind: crate::model::variant::AlleleKind,
    pub evidence: &'a AlleleEvidence,
}

/// Alleles sorted by descending read count, ties broken by first-appearance
/// (insertion) order. Caches the resulting key order on the variant so
/// repeated calls are stable and cheap (§5 ordering guarantee).
pub fn sorted_alleles(variant: &mut Variant) -> Vec<SortedAllele<'_>> {
    if variant.sorted_order.is_none() {
        let mut keys: Vec<AlleleKey> = variant.alleles.keys().cloned().collect();
        keys.sort_by_key(|k| std::cmp::Reverse(variant.alleles[k].len()));
        variant.sorted_order = Some(keys);
    }
    let order = variant.sorted_order.as_ref().unwrap();
    order
        .iter()
        .map(|key| SortedAllele {
            seq: key.0.as_str(),
            kind: key.1,
            evidence: &variant.alleles[key],
        })
        .collect()
}

/// Major allele frequency: reads of the most-observed allele over total
/// reads. Errors if the variant has zero observations (§4.D).
pub fn maf(variant: &Variant) -> Result<f64, InputShapeError> {
    let total = variant.total_reads();
    if total == 0 {
        return Err(InputShapeError::EmptyVariant {
            reference: variant.reference.clone(),
            position: variant.position,
        });
    }
    let major = variant
        .alleles
        .values()
        .map(AlleleEvidence::len)
        .max()
        .unwrap_or(0);
    Ok(major as f64 / total as f64)
}

/// SNV density of a sequence: number of SNV features per base.
pub fn variability(seq: &Sequence) -> f64 {
    let n_snvs = seq.features_of_kind(FeatureKind::Snv).count();
    n_snvs as f64 / seq.len() as f64
}

/// Counts `others` whose position lies in `[v.position - window/2, v.position
/// + window/2)` (half-open, §4.D). `v` itself is counted if present in
/// `others`.
pub fn snvs_in_window(variant: &Variant, others: &[&Variant], window: usize) -> usize {
    let half = (window / 2) as i64;
    let center = variant.position as i64;
    others
        .iter()
        .filter(|o| {
            o.reference == variant.reference
                && (o.position as i64) >= center - half
                && (o.position as i64) < center + half
        })
        .count()
}

/// Computes, for every variant in `variants`, the count of variants
/// (including itself) within `window` of its position on the same
/// reference — one linear pass over `context::context_iter` rather than a
/// quadratic rescan per variant (used by `snv::filters` for the
/// `close_to_snv`/`high_variable_region` stages).
pub fn snv_window_counts(variants: &[Variant], window: usize) -> HashMap<(String, usize), usize> {
    let mut sorted: Vec<Variant> = variants.to_vec();
    sorted.sort_by(|a, b| (a.reference.as_str(), a.position).cmp(&(b.reference.as_str(), b.position)));
    context_iter(sorted.into_iter(), Some(window as i64))
        .map(|(head, context)| ((head.reference.clone(), head.position), context.len()))
        .collect()
}

/// Restriction enzymes whose cut-sites differ between some pair of alleles
/// (§4.D). Reconstructs each allele's hypothetical reference sequence,
/// delegates to the external restriction-mapper, and unions the symmetric
/// differences across all allele pairs. On tool failure the cache is left
/// unset rather than set to `Some(∅)` (§7 recoverable-condition rule).
pub fn cap_enzymes(
    variant: &mut Variant,
    reference: &dyn ReferenceProvider,
    all_enzymes: bool,
) -> anyhow::Result<&BTreeSet<String>> {
    if variant.cap_enzymes.is_none() {
        let keys: Vec<AlleleKey> = variant.alleles.keys().cloned().collect();
        let mut enzymes = BTreeSet::new();
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                let seq1 = hypothetical_sequence(&keys[i], variant, reference)?;
                let seq2 = hypothetical_sequence(&keys[j], variant, reference)?;
                let cuts1: BTreeSet<String> = match restriction::cutting_enzymes(&seq1, all_enzymes) {
                    Ok(cuts) => cuts.into_iter().collect(),
                    Err(e) => {
                        tracing::warn!(
                            reference = %variant.reference,
                            position = variant.position,
                            error = %e,
                            "cap-enzyme computation failed for an allele pair"
                        );
                        return Err(e.into());
                    }
                };
                let cuts2: BTreeSet<String> = match restriction::cutting_enzymes(&seq2, all_enzymes) {
                    Ok(cuts) => cuts.into_iter().collect(),
                    Err(e) => {
                        tracing::warn!(
                            reference = %variant.reference,
                            position = variant.position,
                            error = %e,
                            "cap-enzyme computation failed for an allele pair"
                        );
                        return Err(e.into());
                    }
                };
                enzymes.extend(cuts1.symmetric_difference(&cuts2).cloned());
            }
        }
        variant.cap_enzymes = Some(enzymes);
    }
    Ok(variant.cap_enzymes.as_ref().unwrap())
}

/// Builds the hypothetical full-reference-length sequence carrying one
/// allele, the unit `calculate_cap_enzymes` diffs pairwise.
fn hypothetical_sequence(
    key: &AlleleKey,
    variant: &Variant,
    reference: &dyn ReferenceProvider,
) -> anyhow::Result<String> {
    use crate::model::variant::AlleleKind::*;
    let len = reference
        .sequence_len(&variant.reference)
        .ok_or_else(|| InputShapeError::MissingReferenceSequence(variant.reference.clone()))?;
    let whole = reference.fetch(&variant.reference, 0, len)?;
    let loc = variant.position;
    let (allele, kind) = key;
    let seq = match kind {
        Invariant => whole,
        Snp => format!(
            "{}{}{}",
            &whole[..loc],
            allele,
            &whole[(loc + 1).min(whole.len())..]
        ),
        Deletion => {
            let del_len = allele.len();
            format!(
                "{}{}",
                &whole[..=loc.min(whole.len().saturating_sub(1))],
                &whole[(loc + del_len + 1).min(whole.len())..]
            )
        }
        Insertion => format!("{}{}{}", &whole[..loc], allele, &whole[loc..]),
        Indel | Complex => whole,
    };
    Ok(seq)
}
