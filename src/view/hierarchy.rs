//! Group → film hierarchy behind the bubble chart
//!
//! A film appears once under every genre (or company) it lists, sized by the
//! chosen metric. Films without a positive size are left out. Only the
//! largest groups are kept, and each group only its largest films.

use super::SizeMetric;
use crate::dataset::MovieRecord;
use crate::error::{Error, Result};
use crate::facet::{Facet, FacetState, ValueRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    Genre,
    Production,
}

impl GroupMode {
    pub fn facet(self) -> Facet {
        match self {
            GroupMode::Genre => Facet::Genre,
            GroupMode::Production => Facet::Production,
        }
    }
}

impl FromStr for GroupMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genre" | "genres" => Ok(GroupMode::Genre),
            "production" | "prod" | "company" => Ok(GroupMode::Production),
            _ => Err(Error::Unknown {
                kind: "group mode",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    pub title: String,
    pub value: f64,
    pub year: Option<i32>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub name: String,
    pub total: f64,
    pub children: Vec<Leaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy {
    pub mode: GroupMode,
    pub metric: SizeMetric,
    pub groups: Vec<Group>,
    /// Distinct titles across every kept leaf
    pub visualized_titles: usize,
}

/// Caps applied while building.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyLimits {
    pub top_groups: usize,
    pub max_films_per_group: usize,
}

impl Default for HierarchyLimits {
    fn default() -> Self {
        Self {
            top_groups: 18,
            max_films_per_group: 250,
        }
    }
}

pub fn build_hierarchy(
    records: &[&MovieRecord],
    mode: GroupMode,
    metric: SizeMetric,
    state: &FacetState,
    limits: HierarchyLimits,
) -> Hierarchy {
    let facet = mode.facet();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, Vec<(&MovieRecord, f64)>)> = Vec::new();

    for &record in records {
        let Some(size) = metric.value(record).filter(|v| *v > 0.0) else {
            continue;
        };
        for name in record.list(facet) {
            if name.is_empty() {
                continue;
            }
            let slot = *index.entry(name.as_str()).or_insert_with(|| {
                buckets.push((name.as_str(), Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push((record, size));
        }
    }

    // Strict mode with a selection shows only the selected groups
    let set = state.facet(facet);
    let only_selected = set.is_strict() && !set.selected().is_empty();

    let mut groups: Vec<Group> = buckets
        .into_iter()
        .filter(|(name, _)| !only_selected || set.is_selected(ValueRef::Text(name)))
        .map(|(name, mut films)| {
            films.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            films.truncate(limits.max_films_per_group);
            let children: Vec<Leaf> = films
                .into_iter()
                .map(|(r, value)| Leaf {
                    title: r.title.clone(),
                    value,
                    year: r.year,
                    vote_average: r.vote_average,
                })
                .collect();
            Group {
                name: name.to_string(),
                total: children.iter().map(|l| l.value).sum(),
                children,
            }
        })
        .filter(|g| g.total > 0.0)
        .collect();

    groups.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    groups.truncate(limits.top_groups);

    let visualized_titles = groups
        .iter()
        .flat_map(|g| g.children.iter().map(|l| l.title.as_str()))
        .collect::<HashSet<_>>()
        .len();

    Hierarchy {
        mode,
        metric,
        groups,
        visualized_titles,
    }
}

/// Reference sizes for the bubble legend: the 20th, 50th and 90th percentile
/// of the positive sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeLegend {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

pub fn size_legend(records: &[&MovieRecord], metric: SizeMetric) -> Option<SizeLegend> {
    let mut values: Vec<f64> = records
        .iter()
        .filter_map(|r| metric.value(r))
        .filter(|v| *v > 0.0)
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let last = values.len() - 1;
    let quantile = |p: f64| values[((p * last as f64).floor() as usize).min(last)];
    Some(SizeLegend {
        small: quantile(0.2),
        medium: quantile(0.5),
        large: quantile(0.9),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{movie, sample};
    use crate::facet::FacetValue;

    fn group_names(h: &Hierarchy) -> Vec<&str> {
        h.groups.iter().map(|g| g.name.as_str()).collect()
    }

    // ==========================================================================
    // HIERARCHY TESTS
    // ==========================================================================

    #[test]
    fn test_groups_sorted_by_total() {
        let ds = sample();
        let rows: Vec<&MovieRecord> = ds.records().iter().collect();
        let state = FacetState::for_dataset(&ds);
        let h = build_hierarchy(&rows, GroupMode::Production, SizeMetric::Popularity, &state, HierarchyLimits::default());

        assert_eq!(group_names(&h), vec!["Pixar", "20th Century Fox", "Warner Bros.", "Brandywine"]);
        let pixar = &h.groups[0];
        assert!((pixar.total - 165.8).abs() < 1e-9);
        assert_eq!(pixar.children[0].title, "Up");
        assert_eq!(h.visualized_titles, 5);
    }

    #[test]
    fn test_non_positive_sizes_are_skipped() {
        let ds = sample();
        let rows: Vec<&MovieRecord> = ds.records().iter().collect();
        let state = FacetState::for_dataset(&ds);
        let mut zero = movie("Zero", Some(2000), &["Drama"], &[]);
        zero.budget = Some(0);
        let mut rows_with_zero = rows.clone();
        rows_with_zero.push(&zero);

        let h = build_hierarchy(&rows_with_zero, GroupMode::Genre, SizeMetric::Budget, &state, HierarchyLimits::default());
        let drama = h.groups.iter().find(|g| g.name == "Drama").unwrap();
        assert!(drama.children.iter().all(|l| l.title != "Zero"));
    }

    #[test]
    fn test_limits_cap_groups_and_films() {
        let ds = sample();
        let rows: Vec<&MovieRecord> = ds.records().iter().collect();
        let state = FacetState::for_dataset(&ds);
        let limits = HierarchyLimits {
            top_groups: 2,
            max_films_per_group: 1,
        };
        let h = build_hierarchy(&rows, GroupMode::Genre, SizeMetric::Popularity, &state, limits);
        assert_eq!(h.groups.len(), 2);
        assert!(h.groups.iter().all(|g| g.children.len() == 1));
        // Animation keeps Up (92.2) and Drama keeps Up too
        assert_eq!(group_names(&h), vec!["Animation", "Drama"]);
        assert_eq!(h.visualized_titles, 1);
    }

    #[test]
    fn test_strict_mode_keeps_only_selected_groups() {
        let ds = sample();
        let rows: Vec<&MovieRecord> = ds.records().iter().collect();
        let mut state = FacetState::for_dataset(&ds);
        state.select(Facet::Genre, &FacetValue::Text("Drama".into())).unwrap();
        let loose = build_hierarchy(&rows, GroupMode::Genre, SizeMetric::Popularity, &state, HierarchyLimits::default());
        assert!(loose.groups.len() > 1);

        state.set_strict(Facet::Genre, true);
        let strict = build_hierarchy(&rows, GroupMode::Genre, SizeMetric::Popularity, &state, HierarchyLimits::default());
        assert_eq!(group_names(&strict), vec!["Drama"]);
    }

    // ==========================================================================
    // LEGEND TESTS
    // ==========================================================================

    #[test]
    fn test_size_legend_quantiles() {
        let records: Vec<MovieRecord> = (1..=11)
            .map(|i| {
                let mut r = movie(&format!("M{}", i), None, &[], &[]);
                r.popularity = Some(i as f64);
                r
            })
            .collect();
        let rows: Vec<&MovieRecord> = records.iter().collect();
        let legend = size_legend(&rows, SizeMetric::Popularity).unwrap();
        assert_eq!(legend, SizeLegend { small: 3.0, medium: 6.0, large: 10.0 });
    }

    #[test]
    fn test_size_legend_none_without_positive_values() {
        let r = movie("Empty", None, &[], &[]);
        assert_eq!(size_legend(&[&r], SizeMetric::Budget), None);
    }
}
