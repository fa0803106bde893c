//! Filter Evaluator
//!
//! A record passes when it satisfies every active constraint at once (AND
//! across facets). Within a list facet, selected values combine with OR, or
//! with AND under strict mode. Exclusions always win over selections.
//!
//! The same predicate backs the Availability Engine, which re-runs it with
//! one constraint switched off.

use crate::dataset::{Dataset, MovieRecord};
use crate::facet::{Facet, FacetSet, FacetState, NumericFacet, ValueRef};

/// Which constraint to ignore while testing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Except {
    Nothing,
    Facet(Facet),
    Numeric(NumericFacet),
}

impl Except {
    fn facet(self, facet: Facet) -> bool {
        self == Except::Facet(facet)
    }

    fn numeric(self, facet: NumericFacet) -> bool {
        self == Except::Numeric(facet)
    }
}

/// Records satisfying every active constraint, in dataset order.
pub fn evaluate<'d>(dataset: &'d Dataset, state: &FacetState) -> Vec<&'d MovieRecord> {
    dataset
        .records()
        .iter()
        .filter(|record| passes(record, state, Except::Nothing))
        .collect()
}

/// Whether one record survives the full filter.
pub fn matches(record: &MovieRecord, state: &FacetState) -> bool {
    passes(record, state, Except::Nothing)
}

pub(crate) fn passes(record: &MovieRecord, state: &FacetState, except: Except) -> bool {
    // 1. Year range; unknown years are wildcards
    if let Some(year) = record.year {
        if !state.year_range().contains(year) {
            return false;
        }
    }

    // 2-4. Single-valued facets
    for facet in [Facet::Year, Facet::Note, Facet::Title] {
        if !except.facet(facet) && !single_passes(state.facet(facet), record.single(facet)) {
            return false;
        }
    }

    // 5-6. List exclusions
    for facet in [Facet::Genre, Facet::Production] {
        if !except.facet(facet) && !list_clear_of_exclusions(state.facet(facet), record.list(facet)) {
            return false;
        }
    }

    // 7-8. List inclusions
    for facet in [Facet::Genre, Facet::Production] {
        if !except.facet(facet) && !list_includes(state.facet(facet), record.list(facet)) {
            return false;
        }
    }

    // 9. Numeric constraints; an absent field never satisfies one
    for facet in NumericFacet::ALL {
        if except.numeric(facet) {
            continue;
        }
        if let Some(filter) = state.numeric_filter(facet) {
            match record.numeric(facet) {
                Some(value) if filter.matches(value) => {}
                _ => return false,
            }
        }
    }

    true
}

fn single_passes(set: &FacetSet, value: Option<ValueRef<'_>>) -> bool {
    if let Some(v) = value {
        if set.is_excluded(v) {
            return false;
        }
    }
    if set.selected().is_empty() {
        return true;
    }
    value.map_or(false, |v| set.is_selected(v))
}

fn list_clear_of_exclusions(set: &FacetSet, values: &[String]) -> bool {
    set.excluded().is_empty() || !values.iter().any(|v| set.is_excluded(ValueRef::Text(v)))
}

fn list_includes(set: &FacetSet, values: &[String]) -> bool {
    let selected = set.selected();
    if selected.is_empty() {
        return true;
    }
    if set.is_strict() {
        // An empty list can never contain the selection
        !values.is_empty()
            && selected
                .iter()
                .all(|wanted| values.iter().any(|v| ValueRef::Text(v) == wanted))
    } else {
        values.iter().any(|v| selected.contains(ValueRef::Text(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{movie, sample};
    use crate::facet::{FacetValue, NumericFilter, Rating, YearRange};

    fn text(s: &str) -> FacetValue {
        FacetValue::Text(s.to_string())
    }

    fn titles(records: &[&MovieRecord]) -> Vec<String> {
        records.iter().map(|r| r.title.clone()).collect()
    }

    /// The two-record dataset used throughout the behavioural description.
    fn two_movies() -> Dataset {
        let mut a = movie("A", Some(2000), &["Action"], &[]);
        a.popularity = Some(10.0);
        let mut b = movie("B", Some(2010), &["Drama"], &[]);
        b.popularity = Some(50.0);
        Dataset::new(vec![a, b])
    }

    // ==========================================================================
    // SCENARIO TESTS
    // ==========================================================================

    #[test]
    fn test_select_genre_keeps_matching_record() {
        let ds = two_movies();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &text("Action")).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["A"]);
    }

    #[test]
    fn test_exclude_genre_drops_record() {
        let ds = two_movies();
        let mut state = FacetState::for_dataset(&ds);
        state.exclude(Facet::Genre, &text("Action")).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["B"]);
    }

    #[test]
    fn test_popularity_gte() {
        let ds = two_movies();
        let mut state = FacetState::for_dataset(&ds);
        state.set_numeric_filter(NumericFacet::Popularity, NumericFilter::Gte { v1: 20.0 });
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["B"]);
    }

    #[test]
    fn test_no_constraints_returns_everything_in_order() {
        let ds = sample();
        let state = FacetState::for_dataset(&ds);
        let all = evaluate(&ds, &state);
        assert_eq!(all.len(), ds.len());
        assert_eq!(titles(&all), titles(&ds.records().iter().collect::<Vec<_>>()));
    }

    #[test]
    fn test_evaluate_is_pure() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &text("Drama")).unwrap();
        state.set_numeric_filter(NumericFacet::Budget, NumericFilter::Gte { v1: 1.0 });
        assert_eq!(evaluate(&ds, &state), evaluate(&ds, &state));
    }

    // ==========================================================================
    // STRICT MODE TESTS
    // ==========================================================================
    //
    // Non-strict: at least one selected genre on the record (OR).
    // Strict: every selected genre on the record (AND). A record without any
    // genre fails strict mode outright.
    // ==========================================================================

    #[test]
    fn test_strict_and_semantics() {
        let ds = Dataset::new(vec![movie("Solo", None, &["Action"], &[])]);
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &text("Action")).unwrap();
        state.select(Facet::Genre, &text("Drama")).unwrap();

        state.set_strict(Facet::Genre, true);
        assert!(evaluate(&ds, &state).is_empty());

        state.set_strict(Facet::Genre, false);
        assert_eq!(evaluate(&ds, &state).len(), 1);
    }

    #[test]
    fn test_strict_passes_superset() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &text("Action")).unwrap();
        state.select(Facet::Genre, &text("Drama")).unwrap();
        state.set_strict(Facet::Genre, true);
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Heat"]);
    }

    #[test]
    fn test_empty_list_fails_strict_mode() {
        let ds = Dataset::new(vec![movie("Bare", Some(2001), &[], &[])]);
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Production, &text("Pixar")).unwrap();
        state.set_strict(Facet::Production, true);
        assert!(evaluate(&ds, &state).is_empty());
        // Strict with nothing selected is a no-op
        state.deselect(Facet::Production, &text("Pixar")).unwrap();
        assert_eq!(evaluate(&ds, &state).len(), 1);
    }

    #[test]
    fn test_strict_production_and() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Production, &text("20th Century Fox")).unwrap();
        state.select(Facet::Production, &text("Brandywine")).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Alien", "Aliens"]);
        state.set_strict(Facet::Production, true);
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Alien"]);
    }

    // ==========================================================================
    // SINGLE-VALUED FACET TESTS
    // ==========================================================================

    #[test]
    fn test_year_exclusion_beats_range_and_selection() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.set_year_range(1990, 2000);
        state.select(Facet::Year, &FacetValue::Year(1995)).unwrap();
        state.exclude(Facet::Year, &FacetValue::Year(2009)).unwrap();
        // Heat and Toy Story are 1995; Up (2009) is out of range and excluded
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Toy Story", "Heat"]);

        // Excluding 1995 drops it from the selection too; only the undated record is left
        state.exclude(Facet::Year, &FacetValue::Year(1995)).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Untitled"]);
    }

    #[test]
    fn test_year_range_treats_missing_year_as_wildcard() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.set_year_range(2005, 2010);
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Up", "Untitled"]);
    }

    #[test]
    fn test_year_selection_rejects_missing_year() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Year, &FacetValue::Year(2009)).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Up"]);
    }

    #[test]
    fn test_note_facet_uses_one_decimal() {
        let mut r = movie("Rounded", Some(2000), &[], &[]);
        r.vote_average = Some(7.74);
        let ds = Dataset::new(vec![r]);
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Note, &FacetValue::Note(Rating::from_tenths(77))).unwrap();
        assert_eq!(evaluate(&ds, &state).len(), 1);
        state.exclude(Facet::Note, &FacetValue::Note(Rating::from_tenths(77))).unwrap();
        assert!(evaluate(&ds, &state).is_empty());
    }

    #[test]
    fn test_title_facet_exact_match() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Title, &text("Alien")).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Alien"]);
        state.select(Facet::Title, &text("Up")).unwrap();
        state.exclude(Facet::Title, &text("Alien")).unwrap();
        assert_eq!(titles(&evaluate(&ds, &state)), vec!["Up"]);
    }

    // ==========================================================================
    // NUMERIC CONSTRAINT TESTS
    // ==========================================================================

    #[test]
    fn test_numeric_absent_field_fails() {
        let ds = Dataset::new(vec![movie("NoBudget", Some(2000), &[], &[])]);
        let mut state = FacetState::for_dataset(&ds);
        state.set_numeric_filter(NumericFacet::Budget, NumericFilter::Lte { v1: 1e12 });
        assert!(evaluate(&ds, &state).is_empty());
    }

    #[test]
    fn test_between_either_order_same_result() {
        let ds = sample();
        let mut a = FacetState::for_dataset(&ds);
        let mut b = FacetState::for_dataset(&ds);
        a.set_numeric_filter(NumericFacet::Budget, NumericFilter::Between { v1: 5e6, v2: 3e7 });
        b.set_numeric_filter(NumericFacet::Budget, NumericFilter::Between { v1: 3e7, v2: 5e6 });
        assert_eq!(evaluate(&ds, &a), evaluate(&ds, &b));
        assert_eq!(titles(&evaluate(&ds, &a)), vec!["Alien", "Aliens", "Toy Story"]);
    }

    #[test]
    fn test_contradiction_yields_empty_not_error() {
        let ds = sample();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &text("Animation")).unwrap();
        state.select(Facet::Production, &text("Warner Bros.")).unwrap();
        assert!(evaluate(&ds, &state).is_empty());
    }

    #[test]
    fn test_matches_agrees_with_evaluate() {
        let ds = sample();
        let mut state = FacetState::new(Some(YearRange::new(1980, 2000)));
        state.exclude(Facet::Genre, &text("Comedy")).unwrap();
        let kept = evaluate(&ds, &state);
        for record in ds.records() {
            assert_eq!(matches(record, &state), kept.contains(&record));
        }
    }
}
