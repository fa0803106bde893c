//! Facet picker lists
//!
//! Options are grouped as selected, then available, then everything else
//! (explicitly excluded or unreachable), each group in alphabetical order.
//! Unreachable values stay listed so a dead end can still be seen and undone.

use super::text_cmp;
use crate::facet::{FacetSet, FacetValue};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Selected,
    Available,
    Excluded,
    Unavailable,
}

impl PickStatus {
    fn rank(self) -> u8 {
        match self {
            PickStatus::Selected => 0,
            PickStatus::Available => 1,
            PickStatus::Excluded | PickStatus::Unavailable => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerEntry {
    pub value: FacetValue,
    pub status: PickStatus,
    /// Reachable under the other facets, whatever the status
    pub available: bool,
}

/// Build the ordered option list for one facet.
///
/// `options` is the facet's option universe; selected and excluded values
/// missing from it (e.g. beyond the production cut-off) are appended so they
/// can always be cleared. `search` keeps entries whose label contains it,
/// ignoring case.
pub fn build_picker(
    options: &[FacetValue],
    set: &FacetSet,
    available: &BTreeSet<FacetValue>,
    search: Option<&str>,
) -> Vec<PickerEntry> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut seen: BTreeSet<&FacetValue> = BTreeSet::new();
    let pinned = set.selected().to_values();
    let pinned_excluded = set.excluded().to_values();

    let mut entries: Vec<PickerEntry> = options
        .iter()
        .chain(pinned.iter())
        .chain(pinned_excluded.iter())
        .filter(|value| seen.insert(*value))
        .filter(|value| match &needle {
            Some(n) => value.to_string().to_lowercase().contains(n.as_str()),
            None => true,
        })
        .map(|value| {
            let v = value.as_value_ref();
            let reachable = available.contains(value);
            let status = if set.is_selected(v) {
                PickStatus::Selected
            } else if set.is_excluded(v) {
                PickStatus::Excluded
            } else if reachable {
                PickStatus::Available
            } else {
                PickStatus::Unavailable
            };
            PickerEntry {
                value: value.clone(),
                status,
                available: reachable,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| value_cmp(&a.value, &b.value))
    });
    entries
}

fn value_cmp(a: &FacetValue, b: &FacetValue) -> Ordering {
    match (a, b) {
        (FacetValue::Text(x), FacetValue::Text(y)) => text_cmp(x, y),
        _ => a.cmp(b),
    }
}
