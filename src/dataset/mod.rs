//! Dataset Store: the immutable set of movie records
//!
//! Records are parsed once at startup (see [`loader`]) and never mutated.
//! Everything downstream borrows from the store; filtered views are slices of
//! references in the store's original order.

pub mod loader;
pub mod parse;

pub use loader::{load_csv, resolve_dataset_path};

use crate::facet::{Facet, FacetValue, NumericFacet, Rating, ValueRef, YearRange};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One dataset row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieRecord {
    /// Natural key. Not guaranteed unique in source data.
    pub title: String,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub year: Option<i32>,
    pub vote_average: Option<f64>,
    pub popularity: Option<f64>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub runtime: Option<u32>,
}

impl MovieRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Rating used by the note facet. A zero average means "not rated".
    pub fn rating(&self) -> Option<Rating> {
        self.vote_average
            .filter(|v| *v != 0.0)
            .and_then(Rating::from_f64)
    }

    /// The list behind a multi-valued facet; empty for the others.
    pub fn list(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Genre => &self.genres,
            Facet::Production => &self.production_companies,
            _ => &[],
        }
    }

    /// The single value behind a single-valued facet.
    pub fn single(&self, facet: Facet) -> Option<ValueRef<'_>> {
        match facet {
            Facet::Title => Some(ValueRef::Text(&self.title)),
            Facet::Year => self.year.map(ValueRef::Year),
            Facet::Note => self.rating().map(ValueRef::Note),
            Facet::Genre | Facet::Production => None,
        }
    }

    /// Every value this record contributes to `facet`.
    pub fn values(&self, facet: Facet) -> RecordValues<'_> {
        if facet.is_multi_valued() {
            RecordValues::List(self.list(facet).iter())
        } else {
            RecordValues::One(self.single(facet))
        }
    }

    pub fn numeric(&self, facet: NumericFacet) -> Option<f64> {
        match facet {
            NumericFacet::Popularity => self.popularity.filter(|v| v.is_finite()),
            NumericFacet::Budget => self.budget.map(|v| v as f64),
            NumericFacet::Revenue => self.revenue.map(|v| v as f64),
        }
    }
}

pub enum RecordValues<'a> {
    List(std::slice::Iter<'a, String>),
    One(Option<ValueRef<'a>>),
}

impl<'a> Iterator for RecordValues<'a> {
    type Item = ValueRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordValues::List(it) => it.next().map(|s| ValueRef::Text(s)),
            RecordValues::One(v) => v.take(),
        }
    }
}

/// Read-only record store shared by every view.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<MovieRecord>,
}

impl Dataset {
    pub fn new(records: Vec<MovieRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest known year, if any record has one.
    pub fn year_bounds(&self) -> Option<YearRange> {
        let mut years = self.records.iter().filter_map(|r| r.year);
        let first = years.next()?;
        let (min, max) = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(YearRange { min, max })
    }

    /// Distinct values of a facet across the whole store.
    pub fn facet_values(&self, facet: Facet) -> BTreeSet<FacetValue> {
        let refs: BTreeSet<ValueRef<'_>> = self.records.iter().flat_map(|r| r.values(facet)).collect();
        refs.into_iter().map(ValueRef::to_value).collect()
    }

    /// Picker options: distinct values by descending frequency (ties by
    /// value order), truncated to `limit`.
    pub fn facet_options(&self, facet: Facet, limit: Option<usize>) -> Vec<FacetValue> {
        let mut freq: HashMap<ValueRef<'_>, usize> = HashMap::new();
        for record in &self.records {
            for value in record.values(facet) {
                *freq.entry(value).or_insert(0) += 1;
            }
        }
        let mut counted: Vec<(ValueRef<'_>, usize)> = freq.into_iter().collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            counted.truncate(limit);
        }
        counted.into_iter().map(|(v, _)| v.to_value()).collect()
    }

    pub fn unique_titles(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.title.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

impl From<Vec<MovieRecord>> for Dataset {
    fn from(records: Vec<MovieRecord>) -> Self {
        Self::new(records)
    }
}
