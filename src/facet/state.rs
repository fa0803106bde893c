//! Mutable filter state: facet selections, numeric constraints and year range
//!
//! `FacetState` is the only place selections change. Every mutator keeps the
//! invariant that a value is never both selected and excluded for the same
//! facet: putting a value on one side always takes it off the other.
//!
//! History snapshots are the caller's job (see [`crate::history`]), so that a
//! drag across several picker items can be recorded as a single undo step.

use super::{Facet, FacetSet, FacetValue, NumericFacet, NumericFilter, ValuePredicate, ValueRef};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Inclusive year bounds. Always satisfies `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const UNBOUNDED: YearRange = YearRange {
        min: i32::MIN,
        max: i32::MAX,
    };

    /// Crossed bounds are accepted and reordered.
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }
}

/// Everything a history entry captures: facet sets, strict flags and numeric
/// constraints. The year range is view state and lives outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Selections {
    facets: [FacetSet; 5],
    numeric: [Option<NumericFilter>; 3],
}

impl Default for Selections {
    fn default() -> Self {
        Self {
            facets: Facet::ALL.map(|f| FacetSet::new(f.kind())),
            numeric: [None; 3],
        }
    }
}

impl Selections {
    pub fn facet(&self, facet: Facet) -> &FacetSet {
        &self.facets[facet.index()]
    }

    pub fn numeric_filter(&self, facet: NumericFacet) -> Option<NumericFilter> {
        self.numeric[facet.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.facets.iter().all(|f| !f.is_active() && !f.strict)
            && self.numeric.iter().all(Option::is_none)
    }
}

/// The live filter state driven by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetState {
    selections: Selections,
    year_range: YearRange,
    year_bounds: YearRange,
}

impl Default for FacetState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FacetState {
    /// `year_bounds` is the full span of years in the dataset; `clear_all`
    /// resets the range to it.
    pub fn new(year_bounds: Option<YearRange>) -> Self {
        let bounds = year_bounds.unwrap_or(YearRange::UNBOUNDED);
        Self {
            selections: Selections::default(),
            year_range: bounds,
            year_bounds: bounds,
        }
    }

    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self::new(dataset.year_bounds())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn facet(&self, facet: Facet) -> &FacetSet {
        self.selections.facet(facet)
    }

    pub fn numeric_filter(&self, facet: NumericFacet) -> Option<NumericFilter> {
        self.selections.numeric_filter(facet)
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    pub fn year_bounds(&self) -> YearRange {
        self.year_bounds
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// True when any constraint would drop at least one conceivable record.
    pub fn is_filtering(&self) -> bool {
        self.selections.facets.iter().any(FacetSet::is_active)
            || self.selections.numeric.iter().any(Option::is_some)
            || self.year_range != self.year_bounds
    }

    // ------------------------------------------------------------------
    // Discrete facet mutators
    // ------------------------------------------------------------------

    pub fn select(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        check_kind(facet, value)?;
        let set = self.facet_mut(facet);
        set.excluded.remove(value.as_value_ref());
        set.selected.insert(value);
        Ok(())
    }

    pub fn deselect(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        check_kind(facet, value)?;
        self.facet_mut(facet).selected.remove(value.as_value_ref());
        Ok(())
    }

    /// Left-click semantics: a selected value is deselected, any other selected.
    pub fn toggle_select(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        if self.facet(facet).is_selected(value.as_value_ref()) {
            self.deselect(facet, value)
        } else {
            self.select(facet, value)
        }
    }

    pub fn exclude(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        check_kind(facet, value)?;
        let set = self.facet_mut(facet);
        set.selected.remove(value.as_value_ref());
        set.excluded.insert(value);
        Ok(())
    }

    pub fn unexclude(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        check_kind(facet, value)?;
        self.facet_mut(facet).excluded.remove(value.as_value_ref());
        Ok(())
    }

    pub fn toggle_exclude(&mut self, facet: Facet, value: &FacetValue) -> Result<()> {
        if self.facet(facet).is_excluded(value.as_value_ref()) {
            self.unexclude(facet, value)
        } else {
            self.exclude(facet, value)
        }
    }

    /// Replace the selected set of a year or note facet with every value of
    /// `universe` satisfying `predicate`. Returns how many were selected.
    pub fn select_matching<I>(&mut self, facet: Facet, predicate: ValuePredicate, universe: I) -> Result<usize>
    where
        I: IntoIterator<Item = FacetValue>,
    {
        if facet.kind() == super::ValueKind::Text {
            return Err(Error::NotNumeric(facet));
        }
        let set = self.facet_mut(facet);
        set.selected.clear();
        let mut count = 0;
        for value in universe {
            let Some(n) = value.as_f64() else { continue };
            if value.kind() != facet.kind() || !predicate.matches(n) {
                continue;
            }
            set.excluded.remove(value.as_value_ref());
            if set.selected.insert(&value) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Only genre and production honour strict mode; other facets ignore it.
    pub fn set_strict(&mut self, facet: Facet, strict: bool) {
        if !facet.is_multi_valued() {
            tracing::debug!(%facet, "strict mode ignored for single-valued facet");
            return;
        }
        self.facet_mut(facet).strict = strict;
    }

    // ------------------------------------------------------------------
    // Numeric and range mutators
    // ------------------------------------------------------------------

    pub fn set_numeric_filter(&mut self, facet: NumericFacet, filter: NumericFilter) {
        self.selections.numeric[facet.index()] = Some(filter.normalized());
    }

    pub fn clear_numeric_filter(&mut self, facet: NumericFacet) {
        self.selections.numeric[facet.index()] = None;
    }

    pub fn set_year_range(&mut self, a: i32, b: i32) {
        self.year_range = YearRange::new(a, b);
    }

    pub fn clear_all(&mut self) {
        self.selections = Selections::default();
        self.year_range = self.year_bounds;
    }

    /// Replace every selection with a snapshot (undo/redo).
    pub fn restore(&mut self, selections: Selections) {
        self.selections = selections;
    }

    /// Hash of every constraint except the ones on `except`. Two states with
    /// the same fingerprint yield the same availability for `except`.
    pub fn fingerprint(&self, except: Option<Facet>) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.year_range.hash(&mut hasher);
        for facet in Facet::ALL {
            if Some(facet) == except {
                continue;
            }
            facet.hash(&mut hasher);
            self.facet(facet).hash(&mut hasher);
        }
        for facet in NumericFacet::ALL {
            match self.numeric_filter(facet) {
                Some(filter) => filter.hash_bits(&mut hasher),
                None => 0xffu8.hash(&mut hasher),
            }
        }
        hasher.finish()
    }

    fn facet_mut(&mut self, facet: Facet) -> &mut FacetSet {
        &mut self.selections.facets[facet.index()]
    }
}

fn check_kind(facet: Facet, value: &FacetValue) -> Result<()> {
    if facet.kind() == value.kind() {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            facet,
            value: value.to_string(),
        })
    }
}

/// Values present on both sides of one facet. Always empty.
pub fn overlapping(state: &FacetState, facet: Facet) -> Vec<FacetValue> {
    let set = state.facet(facet);
    set.selected()
        .iter()
        .filter(|v: &ValueRef<'_>| set.excluded().contains(*v))
        .map(ValueRef::to_value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::Rating;

    fn text(s: &str) -> FacetValue {
        FacetValue::Text(s.to_string())
    }

    fn assert_disjoint(state: &FacetState) {
        for facet in Facet::ALL {
            assert!(overlapping(state, facet).is_empty(), "{} overlaps", facet);
        }
    }

    // ==========================================================================
    // SELECT / EXCLUDE TESTS
    // ==========================================================================
    //
    // Left click selects, right click excludes. A value moves between the two
    // sides but is never on both at once.
    // ==========================================================================

    #[test]
    fn test_select_is_idempotent() {
        let mut state = FacetState::default();
        state.select(Facet::Genre, &text("Action")).unwrap();
        let after_first = state.clone();
        state.select(Facet::Genre, &text("Action")).unwrap();
        assert_eq!(state, after_first);
        assert_eq!(state.facet(Facet::Genre).selected().len(), 1);
    }

    #[test]
    fn test_exclude_is_idempotent() {
        let mut state = FacetState::default();
        state.exclude(Facet::Production, &text("Pixar")).unwrap();
        let after_first = state.clone();
        state.exclude(Facet::Production, &text("Pixar")).unwrap();
        assert_eq!(state, after_first);
    }

    #[test]
    fn test_exclude_clears_selection() {
        let mut state = FacetState::default();
        state.select(Facet::Genre, &text("Drama")).unwrap();
        state.exclude(Facet::Genre, &text("Drama")).unwrap();
        let set = state.facet(Facet::Genre);
        assert!(!set.is_selected(ValueRef::Text("Drama")));
        assert!(set.is_excluded(ValueRef::Text("Drama")));
    }

    #[test]
    fn test_select_clears_exclusion() {
        let mut state = FacetState::default();
        state.exclude(Facet::Year, &FacetValue::Year(1999)).unwrap();
        state.select(Facet::Year, &FacetValue::Year(1999)).unwrap();
        let set = state.facet(Facet::Year);
        assert!(set.is_selected(ValueRef::Year(1999)));
        assert!(!set.is_excluded(ValueRef::Year(1999)));
    }

    #[test]
    fn test_toggle_exclude_round_trip() {
        let mut state = FacetState::default();
        state.select(Facet::Title, &text("Alien")).unwrap();
        state.toggle_exclude(Facet::Title, &text("Alien")).unwrap();
        assert!(state.facet(Facet::Title).is_excluded(ValueRef::Text("Alien")));
        assert!(!state.facet(Facet::Title).is_selected(ValueRef::Text("Alien")));
        state.toggle_exclude(Facet::Title, &text("Alien")).unwrap();
        assert!(!state.facet(Facet::Title).is_active());
    }

    #[test]
    fn test_toggle_select() {
        let mut state = FacetState::default();
        state.toggle_select(Facet::Genre, &text("Comedy")).unwrap();
        assert!(state.facet(Facet::Genre).is_selected(ValueRef::Text("Comedy")));
        state.toggle_select(Facet::Genre, &text("Comedy")).unwrap();
        assert!(!state.facet(Facet::Genre).is_active());
    }

    #[test]
    fn test_deselect_and_unexclude_are_idempotent() {
        let mut state = FacetState::default();
        state.deselect(Facet::Genre, &text("Horror")).unwrap();
        state.unexclude(Facet::Genre, &text("Horror")).unwrap();
        assert_eq!(state, FacetState::default());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut state = FacetState::default();
        let err = state.select(Facet::Year, &text("2000")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { facet: Facet::Year, .. }));
        assert!(!state.is_filtering());
    }

    #[test]
    fn test_mutual_exclusivity_over_mixed_sequence() {
        let mut state = FacetState::default();
        let values = ["A", "B", "C"];
        for (i, v) in values.iter().cycle().take(30).enumerate() {
            let v = text(v);
            match i % 5 {
                0 => state.select(Facet::Genre, &v).unwrap(),
                1 => state.exclude(Facet::Genre, &v).unwrap(),
                2 => state.toggle_exclude(Facet::Genre, &v).unwrap(),
                3 => state.toggle_select(Facet::Genre, &v).unwrap(),
                _ => state.deselect(Facet::Genre, &v).unwrap(),
            }
            assert_disjoint(&state);
        }
    }

    // ==========================================================================
    // STRICT, NUMERIC AND RANGE TESTS
    // ==========================================================================

    #[test]
    fn test_strict_only_on_multi_valued_facets() {
        let mut state = FacetState::default();
        state.set_strict(Facet::Genre, true);
        state.set_strict(Facet::Production, true);
        state.set_strict(Facet::Year, true);
        assert!(state.facet(Facet::Genre).is_strict());
        assert!(state.facet(Facet::Production).is_strict());
        assert!(!state.facet(Facet::Year).is_strict());
    }

    #[test]
    fn test_numeric_filter_replaces_previous() {
        let mut state = FacetState::default();
        state.set_numeric_filter(NumericFacet::Budget, NumericFilter::Gte { v1: 1.0 });
        state.set_numeric_filter(NumericFacet::Budget, NumericFilter::Lte { v1: 9.0 });
        assert_eq!(
            state.numeric_filter(NumericFacet::Budget),
            Some(NumericFilter::Lte { v1: 9.0 })
        );
        state.clear_numeric_filter(NumericFacet::Budget);
        assert_eq!(state.numeric_filter(NumericFacet::Budget), None);
    }

    #[test]
    fn test_set_numeric_filter_normalizes_between() {
        let mut a = FacetState::default();
        let mut b = FacetState::default();
        a.set_numeric_filter(
            NumericFacet::Budget,
            NumericFilter::Between { v1: 5_000_000.0, v2: 1_000_000.0 },
        );
        b.set_numeric_filter(
            NumericFacet::Budget,
            NumericFilter::Between { v1: 1_000_000.0, v2: 5_000_000.0 },
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_year_range_crossed_bounds() {
        let mut state = FacetState::new(Some(YearRange::new(1950, 2020)));
        state.set_year_range(2010, 1990);
        assert_eq!(state.year_range(), YearRange { min: 1990, max: 2010 });
        assert!(state.is_filtering());
    }

    #[test]
    fn test_clear_all_resets_everything() {
        let mut state = FacetState::new(Some(YearRange::new(1950, 2020)));
        state.select(Facet::Genre, &text("Action")).unwrap();
        state.exclude(Facet::Note, &FacetValue::Note(Rating::from_tenths(50))).unwrap();
        state.set_strict(Facet::Genre, true);
        state.set_numeric_filter(NumericFacet::Revenue, NumericFilter::Gte { v1: 1.0 });
        state.set_year_range(1990, 2000);

        state.clear_all();

        assert!(!state.is_filtering());
        assert!(state.selections().is_empty());
        assert_eq!(state.year_range(), YearRange::new(1950, 2020));
    }

    #[test]
    fn test_select_matching_replaces_selection() {
        let mut state = FacetState::default();
        state.select(Facet::Year, &FacetValue::Year(1980)).unwrap();
        state.exclude(Facet::Year, &FacetValue::Year(2005)).unwrap();
        let universe = (1995..=2010).map(FacetValue::Year);

        let n = state
            .select_matching(Facet::Year, ValuePredicate::Between { v1: 2006.0, v2: 2004.0 }, universe)
            .unwrap();

        assert_eq!(n, 3);
        let set = state.facet(Facet::Year);
        assert!(!set.is_selected(ValueRef::Year(1980)));
        assert!(set.is_selected(ValueRef::Year(2005)));
        assert!(!set.is_excluded(ValueRef::Year(2005)));
        assert_disjoint(&state);
    }

    #[test]
    fn test_select_matching_rejects_text_facets() {
        let mut state = FacetState::default();
        let err = state
            .select_matching(Facet::Genre, ValuePredicate::Gte { v1: 1.0 }, Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::NotNumeric(Facet::Genre)));
    }

    // ==========================================================================
    // FINGERPRINT TESTS
    // ==========================================================================

    #[test]
    fn test_fingerprint_ignores_excepted_facet() {
        let mut a = FacetState::default();
        let b = FacetState::default();
        a.select(Facet::Genre, &text("Action")).unwrap();
        assert_eq!(a.fingerprint(Some(Facet::Genre)), b.fingerprint(Some(Facet::Genre)));
        assert_ne!(a.fingerprint(Some(Facet::Production)), b.fingerprint(Some(Facet::Production)));
        assert_ne!(a.fingerprint(None), b.fingerprint(None));
    }

    #[test]
    fn test_fingerprint_sees_numeric_and_range() {
        let mut a = FacetState::default();
        let base = a.fingerprint(Some(Facet::Genre));
        a.set_numeric_filter(NumericFacet::Popularity, NumericFilter::Gte { v1: 20.0 });
        let with_numeric = a.fingerprint(Some(Facet::Genre));
        assert_ne!(base, with_numeric);
        a.set_year_range(1990, 1991);
        assert_ne!(with_numeric, a.fingerprint(Some(Facet::Genre)));
    }
}
