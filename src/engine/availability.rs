//! Availability Engine
//!
//! For one target facet, which values could a record still take if every
//! *other* constraint stayed in place? The picker uses the answer to grey out
//! dead ends without hiding them.
//!
//! Each call is a single scan over the store. [`AvailabilityCache`] memoises
//! results keyed by a fingerprint of the other facets, which pays off during
//! drag gestures where only the target facet keeps changing.

use super::evaluate::{passes, Except};
use crate::dataset::Dataset;
use crate::facet::{Facet, FacetState, FacetValue, NumericFacet, ValueRef};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Values of `target` reachable under every other active constraint.
pub fn available(dataset: &Dataset, state: &FacetState, target: Facet) -> BTreeSet<FacetValue> {
    let mut reachable: BTreeSet<ValueRef<'_>> = BTreeSet::new();
    for record in dataset.records() {
        if passes(record, state, Except::Facet(target)) {
            reachable.extend(record.values(target));
        }
    }
    reachable.into_iter().map(ValueRef::to_value).collect()
}

/// Reachable values for every facet at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Availability {
    pub genre: BTreeSet<FacetValue>,
    pub production: BTreeSet<FacetValue>,
    pub title: BTreeSet<FacetValue>,
    pub year: BTreeSet<FacetValue>,
    pub note: BTreeSet<FacetValue>,
}

impl Availability {
    pub fn get(&self, facet: Facet) -> &BTreeSet<FacetValue> {
        match facet {
            Facet::Genre => &self.genre,
            Facet::Production => &self.production,
            Facet::Title => &self.title,
            Facet::Year => &self.year,
            Facet::Note => &self.note,
        }
    }

    fn slot(&mut self, facet: Facet) -> &mut BTreeSet<FacetValue> {
        match facet {
            Facet::Genre => &mut self.genre,
            Facet::Production => &mut self.production,
            Facet::Title => &mut self.title,
            Facet::Year => &mut self.year,
            Facet::Note => &mut self.note,
        }
    }

    pub fn is_available(&self, facet: Facet, value: &FacetValue) -> bool {
        self.get(facet).contains(value)
    }
}

/// Compute every facet's availability, one facet per rayon task.
pub fn available_all(dataset: &Dataset, state: &FacetState) -> Availability {
    let computed: Vec<(Facet, BTreeSet<FacetValue>)> = Facet::ALL
        .par_iter()
        .map(|&facet| (facet, available(dataset, state, facet)))
        .collect();

    let mut all = Availability::default();
    for (facet, values) in computed {
        *all.slot(facet) = values;
    }
    all
}

/// Smallest and largest value of a numeric field among records that pass
/// every constraint except the one on that field.
pub fn numeric_extent(dataset: &Dataset, state: &FacetState, facet: NumericFacet) -> Option<(f64, f64)> {
    dataset
        .records()
        .iter()
        .filter(|r| passes(r, state, Except::Numeric(facet)))
        .filter_map(|r| r.numeric(facet))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

// ============================================================================
// Memoisation
// ============================================================================

/// Bounded memo of [`available`] results.
///
/// The key ignores the target facet's own selections, so toggling values in
/// one picker reuses that picker's availability. When full, the cache is
/// emptied rather than evicting piecemeal.
#[derive(Debug)]
pub struct AvailabilityCache {
    entries: HashMap<(Facet, u64), BTreeSet<FacetValue>>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new(64)
    }
}

impl AvailabilityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(Facet::ALL.len()),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_compute(&mut self, dataset: &Dataset, state: &FacetState, facet: Facet) -> BTreeSet<FacetValue> {
        let key = (facet, state.fingerprint(Some(facet)));
        if let Some(values) = self.entries.get(&key) {
            self.hits += 1;
            return values.clone();
        }

        self.misses += 1;
        let values = available(dataset, state, facet);
        if self.entries.len() >= self.capacity {
            tracing::trace!(capacity = self.capacity, "availability cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, values.clone());
        values
    }

    /// All facets. Cache misses are computed together, one rayon task each.
    pub fn all(&mut self, dataset: &Dataset, state: &FacetState) -> Availability {
        let mut all = Availability::default();
        let mut missing = Vec::new();
        for facet in Facet::ALL {
            let key = (facet, state.fingerprint(Some(facet)));
            match self.entries.get(&key) {
                Some(values) => {
                    self.hits += 1;
                    *all.slot(facet) = values.clone();
                }
                None => missing.push(key),
            }
        }
        if missing.is_empty() {
            return all;
        }

        self.misses += missing.len() as u64;
        let computed: Vec<((Facet, u64), BTreeSet<FacetValue>)> = missing
            .into_par_iter()
            .map(|key| (key, available(dataset, state, key.0)))
            .collect();

        if self.entries.len() + computed.len() > self.capacity {
            tracing::trace!(capacity = self.capacity, "availability cache full, clearing");
            self.entries.clear();
        }
        for (key, values) in computed {
            *all.slot(key.0) = values.clone();
            self.entries.insert(key, values);
        }
        all
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
