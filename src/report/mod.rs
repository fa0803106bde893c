//! Report generation for filtered movie lists
//!
//! This module writes the records behind the current filter in two formats:
//!
//! - **JSON**: summary plus every record, for programmatic consumption
//! - **CSV**: one row per record, list columns JSON-encoded like the input
//!
//! # Usage
//!
//! ```ignore
//! use cinefacet::report;
//!
//! // Automatically picks format based on extension
//! report::generate("pixar.json", &records)?;  // JSON
//! report::generate("pixar.csv", &records)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::dataset::MovieRecord;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, records: &[&MovieRecord]) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, records)?,
        _ => csv::write(&mut file, records)?,
    }
    tracing::info!(path = %path.display(), records = records.len(), "report written");
    Ok(())
}

/// Summary statistics for a set of records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub distinct_titles: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Mean vote average over rated records
    pub mean_rating: Option<f64>,
    pub mean_popularity: Option<f64>,
}

impl Summary {
    pub fn from_records(records: &[&MovieRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            distinct_titles: records.iter().map(|r| r.title.as_str()).collect::<HashSet<_>>().len(),
            ..Self::default()
        };

        for year in records.iter().filter_map(|r| r.year) {
            summary.year_min = Some(summary.year_min.map_or(year, |m| m.min(year)));
            summary.year_max = Some(summary.year_max.map_or(year, |m| m.max(year)));
        }
        summary.mean_rating = mean(records.iter().filter_map(|r| r.rating().map(|n| n.as_f64())));
        summary.mean_popularity = mean(records.iter().filter_map(|r| r.popularity));

        summary
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
