//! Read-only projections of the filtered records for the presentation layer
//!
//! - [`table`]: deduplicated, sorted, paginated rows
//! - [`picker`]: per-facet option lists with selection status
//! - [`hierarchy`]: group → film tree sized by a metric, plus a size legend

pub mod hierarchy;
pub mod picker;
pub mod table;

pub use hierarchy::{build_hierarchy, size_legend, GroupMode, Hierarchy, HierarchyLimits, SizeLegend};
pub use picker::{build_picker, PickStatus, PickerEntry};
pub use table::{
    build_table, column_values, dedup_by_title, paginate, sort_rows, Page, SortColumn, SortOrder, TableQuery,
};

use crate::dataset::MovieRecord;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The measure used to size hierarchy leaves and to break title collisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMetric {
    #[default]
    Popularity,
    Budget,
    Revenue,
    VoteAverage,
}

impl SizeMetric {
    pub fn name(self) -> &'static str {
        match self {
            SizeMetric::Popularity => "popularity",
            SizeMetric::Budget => "budget",
            SizeMetric::Revenue => "revenue",
            SizeMetric::VoteAverage => "vote_average",
        }
    }

    pub fn value(self, record: &MovieRecord) -> Option<f64> {
        let v = match self {
            SizeMetric::Popularity => record.popularity,
            SizeMetric::Budget => record.budget.map(|b| b as f64),
            SizeMetric::Revenue => record.revenue.map(|r| r as f64),
            SizeMetric::VoteAverage => record.vote_average,
        };
        v.filter(|v| v.is_finite())
    }
}

impl fmt::Display for SizeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SizeMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popularity" => Ok(SizeMetric::Popularity),
            "budget" => Ok(SizeMetric::Budget),
            "revenue" => Ok(SizeMetric::Revenue),
            "vote_average" | "note" | "rating" => Ok(SizeMetric::VoteAverage),
            _ => Err(Error::Unknown {
                kind: "size metric",
                name: s.to_string(),
            }),
        }
    }
}

/// Case-insensitive text order with a byte-wise tiebreak, standing in for a
/// locale collation.
pub(crate) fn text_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
