//! Session controller
//!
//! A `Session` owns the live [`FacetState`] for one user, records history
//! around every filter action and answers the view queries. The dataset is
//! shared read-only, so several sessions can sit on one load.
//!
//! Drag gestures are bracketed by [`Session::begin_gesture`] and
//! [`Session::end_gesture`]: however many values a drag touches, it produces
//! one undo step.

use crate::config::Config;
use crate::dataset::{Dataset, MovieRecord};
use crate::engine::{self, Availability, AvailabilityCache};
use crate::error::{Error, Result};
use crate::facet::{
    Facet, FacetSet, FacetState, FacetValue, NumericFacet, NumericFilter, Selections, ValueKind, ValuePredicate,
    YearRange,
};
use crate::history::History;
use crate::report::Summary;
use crate::view::{self, GroupMode, Hierarchy, HierarchyLimits, Page, PickerEntry, SizeLegend, SizeMetric, TableQuery};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A user action as sent by the presentation layer.
///
/// Values travel as strings in their facet encoding (`"2009"`, `"7.5"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Select { facet: Facet, value: String },
    Deselect { facet: Facet, value: String },
    ToggleSelect { facet: Facet, value: String },
    Exclude { facet: Facet, value: String },
    Unexclude { facet: Facet, value: String },
    ToggleExclude { facet: Facet, value: String },
    SelectMatching { facet: Facet, predicate: ValuePredicate },
    SetNumeric { facet: NumericFacet, filter: NumericFilter },
    ClearNumeric { facet: NumericFacet },
    SetStrict { facet: Facet, strict: bool },
    SetYearRange { min: i32, max: i32 },
    ClearAll,
}

impl Action {
    /// The year slider is view state and stays out of history.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Action::SetYearRange { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Select { facet, value } => write!(f, "select {}={}", facet, value),
            Action::Deselect { facet, value } => write!(f, "deselect {}={}", facet, value),
            Action::ToggleSelect { facet, value } => write!(f, "toggle {}={}", facet, value),
            Action::Exclude { facet, value } => write!(f, "exclude {}={}", facet, value),
            Action::Unexclude { facet, value } => write!(f, "unexclude {}={}", facet, value),
            Action::ToggleExclude { facet, value } => write!(f, "toggle exclude {}={}", facet, value),
            Action::SelectMatching { facet, .. } => write!(f, "select matching {}", facet),
            Action::SetNumeric { facet, filter } => write!(f, "{} {}", facet, filter),
            Action::ClearNumeric { facet } => write!(f, "clear {}", facet),
            Action::SetStrict { facet, strict } => {
                write!(f, "strict {} {}", facet, if *strict { "on" } else { "off" })
            }
            Action::SetYearRange { min, max } => write!(f, "years {}-{}", min, max),
            Action::ClearAll => f.write_str("clear all"),
        }
    }
}

/// Serializable snapshot of the controls, for the UI to redraw from.
#[derive(Debug, Serialize)]
pub struct StateView<'a> {
    pub facets: BTreeMap<Facet, &'a FacetSet>,
    pub numeric: BTreeMap<NumericFacet, Option<NumericFilter>>,
    pub year_range: YearRange,
    pub year_bounds: YearRange,
    pub can_undo: bool,
    pub can_redo: bool,
    pub history: Vec<&'a str>,
    pub matched: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct Gesture {
    active: bool,
    recorded: bool,
}

pub struct Session {
    dataset: Arc<Dataset>,
    state: FacetState,
    history: History,
    gesture: Gesture,
    cache: AvailabilityCache,
    /// Picker option universe per facet, by descending frequency
    options: [Vec<FacetValue>; 5],
    config: Config,
}

impl Session {
    pub fn new(dataset: Arc<Dataset>, config: Config) -> Self {
        let options = Facet::ALL.map(|facet| {
            let limit = (facet == Facet::Production).then_some(config.production_options);
            dataset.facet_options(facet, limit)
        });
        Self {
            state: FacetState::for_dataset(&dataset),
            history: History::with_limit(config.history_limit),
            gesture: Gesture::default(),
            cache: AvailabilityCache::new(config.cache_capacity),
            options,
            dataset,
            config,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn state(&self) -> &FacetState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn options(&self, facet: Facet) -> &[FacetValue] {
        &self.options[facet.index()]
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Apply one action, recording an undo step when the selections change.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        let label = action.to_string();
        let before = self.state.selections().clone();

        match &action {
            Action::Select { facet, value } => self.state.select(*facet, &facet.parse_value(value)?)?,
            Action::Deselect { facet, value } => self.state.deselect(*facet, &facet.parse_value(value)?)?,
            Action::ToggleSelect { facet, value } => {
                self.state.toggle_select(*facet, &facet.parse_value(value)?)?
            }
            Action::Exclude { facet, value } => self.state.exclude(*facet, &facet.parse_value(value)?)?,
            Action::Unexclude { facet, value } => self.state.unexclude(*facet, &facet.parse_value(value)?)?,
            Action::ToggleExclude { facet, value } => {
                self.state.toggle_exclude(*facet, &facet.parse_value(value)?)?
            }
            Action::SelectMatching { facet, predicate } => {
                if facet.kind() == ValueKind::Text {
                    return Err(Error::NotNumeric(*facet));
                }
                let universe = self.available(*facet);
                let count = self.state.select_matching(*facet, *predicate, universe)?;
                tracing::debug!(%facet, count, "bulk selection");
            }
            Action::SetNumeric { facet, filter } => self.state.set_numeric_filter(*facet, *filter),
            Action::ClearNumeric { facet } => self.state.clear_numeric_filter(*facet),
            Action::SetStrict { facet, strict } => self.state.set_strict(*facet, *strict),
            Action::SetYearRange { min, max } => self.state.set_year_range(*min, *max),
            Action::ClearAll => self.state.clear_all(),
        }

        debug_assert!(Facet::ALL
            .iter()
            .all(|&f| crate::facet::state::overlapping(&self.state, f).is_empty()));

        if action.is_recorded() && self.state.selections() != &before {
            self.checkpoint(before, label.clone());
        }
        tracing::debug!(action = %label, "applied");
        Ok(())
    }

    fn checkpoint(&mut self, before: Selections, label: String) {
        if self.gesture.active {
            if self.gesture.recorded {
                return;
            }
            self.gesture.recorded = true;
        }
        self.history.push(before, label);
    }

    pub fn begin_gesture(&mut self) {
        self.gesture = Gesture {
            active: true,
            recorded: false,
        };
    }

    pub fn end_gesture(&mut self) {
        self.gesture = Gesture::default();
    }

    pub fn undo(&mut self) -> bool {
        self.end_gesture();
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> bool {
        self.end_gesture();
        self.history.redo(&mut self.state)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_labels(&self) -> Vec<&str> {
        self.history.labels()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn filtered(&self) -> Vec<&MovieRecord> {
        engine::evaluate(&self.dataset, &self.state)
    }

    pub fn available(&mut self, facet: Facet) -> BTreeSet<FacetValue> {
        self.cache.get_or_compute(&self.dataset, &self.state, facet)
    }

    pub fn availability(&mut self) -> Availability {
        self.cache.all(&self.dataset, &self.state)
    }

    pub fn numeric_extent(&self, facet: NumericFacet) -> Option<(f64, f64)> {
        engine::numeric_extent(&self.dataset, &self.state, facet)
    }

    pub fn picker(&mut self, facet: Facet, search: Option<&str>) -> Vec<PickerEntry> {
        let available = self.available(facet);
        view::build_picker(&self.options[facet.index()], self.state.facet(facet), &available, search)
    }

    /// `per_page` of zero falls back to the configured page size.
    pub fn table(&self, query: &TableQuery) -> Page<'_> {
        let query = TableQuery {
            per_page: if query.per_page == 0 {
                self.config.items_per_page
            } else {
                query.per_page
            },
            ..*query
        };
        view::build_table(&self.filtered(), &query)
    }

    pub fn hierarchy(&self, mode: GroupMode, metric: SizeMetric) -> Hierarchy {
        let limits = HierarchyLimits {
            top_groups: self.config.top_groups,
            max_films_per_group: self.config.max_films_per_group,
        };
        view::build_hierarchy(&self.filtered(), mode, metric, &self.state, limits)
    }

    pub fn size_legend(&self, metric: SizeMetric) -> Option<SizeLegend> {
        view::size_legend(&self.filtered(), metric)
    }

    /// Distinct values of `facet` among the filtered rows, for column dropdowns.
    pub fn column_values(&self, facet: Facet) -> Vec<FacetValue> {
        view::column_values(&self.filtered(), facet)
    }

    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.filtered())
    }

    pub fn state_view(&self) -> StateView<'_> {
        StateView {
            facets: Facet::ALL.iter().map(|&f| (f, self.state.facet(f))).collect(),
            numeric: NumericFacet::ALL
                .iter()
                .map(|&f| (f, self.state.numeric_filter(f)))
                .collect(),
            year_range: self.state.year_range(),
            year_bounds: self.state.year_bounds(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            history: self.history_labels(),
            matched: self.filtered().len(),
            total: self.dataset.len(),
        }
    }
}
