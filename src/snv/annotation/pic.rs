//! Polymorphism Information Content (Botstein 1980), a peer annotation of
//! MAF that the original keeps alongside it in `SVN_ANNOTATION_CALCULATORS`
//! (§2 Additions).
//!
//! Grounded on
//! `original_source/biolib/src/biolib/snv/snv.py::_pic_for_alleles_in_lib`.

use crate::err::InputShapeError;
use crate::model::variant::{AlleleEvidence, Variant};

/// `1 - Σp_i² - 2·Σ_{i<j} p_i²p_j²`, where `p_i` is allele `i`'s read
/// frequency. Errors if the variant has zero observations, matching `maf`.
pub fn pic(variant: &Variant) -> Result<f64, InputShapeError> {
    let total = variant.total_reads();
    if total == 0 {
        return Err(InputShapeError::EmptyVariant {
            reference: variant.reference.clone(),
            position: variant.position,
        });
    }
    let frequencies: Vec<f64> = variant
        .alleles
        .values()
        .map(AlleleEvidence::len)
        .map(|n| (n as f64 / total as f64).powi(2))
        .collect();

    let sum_1: f64 = frequencies.iter().sum();
    let mut sum_2 = 0.0;
    for i in 0..frequencies.len() {
        for j in (i + 1)..frequencies.len() {
            sum_2 += frequencies[i] * frequencies[j];
        }
    }
    Ok(1.0 - sum_1 - 2.0 * sum_2)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::variant::AlleleKind;
    use float_cmp::approx_eq;

    #[test]
    fn two_equally_frequent_alleles_give_pic_one_half() {
        let mut v = Variant::new("chr1", 5);
        let mut a = AlleleEvidence::default();
        a.push("r1", "lib1", true, Some(30), 60);
        let mut b = AlleleEvidence::default();
        b.push("r2", "lib1", true, Some(30), 60);
        v.alleles.insert(("a".to_owned(), AlleleKind::Invariant), a);
        v.alleles.insert(("g".to_owned(), AlleleKind::Snp), b);
        let value = pic(&v).unwrap();
        assert!(approx_eq!(f64, value, 0.5, epsilon = 1e-9));
    }

    #[test]
    fn single_allele_has_zero_pic() {
        let mut v = Variant::new("chr1", 5);
        let mut a = AlleleEvidence::default();
        a.push("r1", "lib1", true, Some(30), 60);
        v.alleles.insert(("a".to_owned(), AlleleKind::Invariant), a);
        assert!(approx_eq!(f64, pic(&v).unwrap(), 0.0, epsilon = 1e-9));
    }

    #[test]
    fn empty_variant_errors() {
        let v = Variant::new("chr1", 5);
        assert!(pic(&v).is_err());
    }
}
