//! Filter short-name/description registry (§2 Additions), used by
//! downstream reporting to render a compact per-filter tag (e.g. `maf0.30`)
//! alongside a human-readable description.
//!
//! Grounded on `original_source/franklin/snv/snv_filters.py::
//! FILTER_DESCRIPTIONS` / `get_filter_description`.

use crate::model::variant::{AlleleKind, GroupKind};

use super::FilterStage;

/// Returns `(short_id, description)` for a configured filter stage.
pub fn describe(stage: &FilterStage) -> (String, String) {
    match stage {
        FilterStage::UniqContiguous { .. } => (
            "UCR".to_owned(),
            "A blast in the near region gave several matches".to_owned(),
        ),
        FilterStage::CloseToIntron { distance } => (
            format!("I{distance:02}"),
            format!("An intron is located closer than {distance} base pairs"),
        ),
        FilterStage::HighVariableRegion { max_percent, .. } => (
            format!("HVR{max_percent:02}"),
            format!("The snv is in a region with more than {max_percent}% of variability"),
        ),
        FilterStage::CloseToSnv { distance } => (
            format!("cs{distance:02}"),
            format!("The snv is closer than {distance} nucleotides to another snv"),
        ),
        FilterStage::CloseToLimit { distance } => (
            format!("cs{distance:02}"),
            format!("The snv is closer than {distance} nucleotides to sequence limit"),
        ),
        FilterStage::Maf { frequency } => (
            format!("maf{frequency:.2}"),
            format!("The more frequent alleles is more frequent than {frequency:.2}"),
        ),
        FilterStage::ByKind { kind } => {
            let name = kind_name(*kind);
            (
                format!("vk{}", &name[..1]),
                format!("It filters if it is of kind: {name}"),
            )
        }
        FilterStage::CapEnzymes { all_enzymes } => {
            let (enzymes, tag) = if *all_enzymes {
                ("All", 't')
            } else {
                ("Most Comercial", 'f')
            };
            (
                format!("ce{tag}"),
                format!("Enzymes that recognize different snp alleles: {enzymes}"),
            )
        }
        FilterStage::IsVariable {
            group_kind,
            groups,
            in_union,
        } => (
            format!("v{}", group_tag(*group_kind)),
            format!(
                "Filters by {group_kind} with those items: {groups:?}. Aggregated:{in_union}"
            ),
        ),
    }
}

fn kind_name(kind: AlleleKind) -> String {
    kind.to_string()
}

fn group_tag(group_kind: GroupKind) -> &'static str {
    match group_kind {
        GroupKind::Libraries => "lb",
        GroupKind::ReadGroups => "rg",
        GroupKind::Samples => "sm",
    }
}
