//! Tabular view of the filtered records
//!
//! Titles are treated as identities here: when two records share a title,
//! only the one with the larger size metric is shown. Titles are not unique
//! in real exports, so this is a known approximation and is kept as-is.

use super::{text_cmp, SizeMetric};
use crate::dataset::MovieRecord;
use crate::error::{Error, Result};
use crate::facet::{Facet, FacetValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Title,
    #[default]
    Year,
    #[serde(alias = "rating")]
    Note,
    Popularity,
    Budget,
    Revenue,
    Runtime,
    Genres,
    Productions,
}

impl FromStr for SortColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortColumn::Title),
            "year" => Ok(SortColumn::Year),
            "note" | "rating" | "vote_average" => Ok(SortColumn::Note),
            "popularity" => Ok(SortColumn::Popularity),
            "budget" => Ok(SortColumn::Budget),
            "revenue" => Ok(SortColumn::Revenue),
            "runtime" => Ok(SortColumn::Runtime),
            "genres" | "genre" => Ok(SortColumn::Genres),
            "productions" | "production" => Ok(SortColumn::Productions),
            _ => Err(Error::Unknown {
                kind: "sort column",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::Unknown {
                kind: "sort order",
                name: s.to_string(),
            }),
        }
    }
}

/// What the table should show. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableQuery {
    pub sort: SortColumn,
    pub order: SortOrder,
    pub page: usize,
    pub per_page: usize,
    /// Tiebreak for duplicate titles
    pub metric: SizeMetric,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            sort: SortColumn::Year,
            order: SortOrder::Desc,
            page: 1,
            per_page: 10,
            metric: SizeMetric::Popularity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<'a> {
    pub rows: Vec<&'a MovieRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

/// Keep one record per title: the one with the larger `metric` (absent counts
/// as 0). Rows stay in first-occurrence order.
pub fn dedup_by_title<'a>(records: &[&'a MovieRecord], metric: SizeMetric) -> Vec<&'a MovieRecord> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<&'a MovieRecord> = Vec::with_capacity(records.len());

    for &record in records {
        match slots.get(record.title.as_str()) {
            Some(&i) => {
                let current = metric.value(kept[i]).unwrap_or(0.0);
                if metric.value(record).unwrap_or(0.0) > current {
                    kept[i] = record;
                }
            }
            None => {
                slots.insert(record.title.as_str(), kept.len());
                kept.push(record);
            }
        }
    }
    kept
}

enum SortKey<'a> {
    Num(f64),
    Text(&'a str),
}

fn sort_key(record: &MovieRecord, column: SortColumn) -> SortKey<'_> {
    match column {
        SortColumn::Title => SortKey::Text(&record.title),
        SortColumn::Year => SortKey::Num(record.year.unwrap_or(0) as f64),
        SortColumn::Note => SortKey::Num(record.vote_average.unwrap_or(0.0)),
        SortColumn::Popularity => SortKey::Num(record.popularity.unwrap_or(0.0)),
        SortColumn::Budget => SortKey::Num(record.budget.unwrap_or(0) as f64),
        SortColumn::Revenue => SortKey::Num(record.revenue.unwrap_or(0) as f64),
        SortColumn::Runtime => SortKey::Num(record.runtime.unwrap_or(0) as f64),
        SortColumn::Genres => SortKey::Text(record.genres.first().map(String::as_str).unwrap_or("")),
        SortColumn::Productions => {
            SortKey::Text(record.production_companies.first().map(String::as_str).unwrap_or(""))
        }
    }
}

fn compare(a: &MovieRecord, b: &MovieRecord, column: SortColumn) -> Ordering {
    match (sort_key(a, column), sort_key(b, column)) {
        (SortKey::Num(x), SortKey::Num(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (SortKey::Text(x), SortKey::Text(y)) => text_cmp(x, y),
        _ => Ordering::Equal,
    }
}

/// Stable sort; missing numbers sort as 0 and missing text as "".
pub fn sort_rows(rows: &mut [&MovieRecord], column: SortColumn, order: SortOrder) {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, column);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Slice out one page. Out-of-range pages are clamped.
pub fn paginate<'a>(rows: &[&'a MovieRecord], page: usize, per_page: usize) -> Page<'a> {
    let per_page = per_page.max(1);
    let total_rows = rows.len();
    let total_pages = total_rows.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_rows);

    Page {
        rows: rows.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
        page,
        total_pages,
        total_rows,
    }
}

/// Dedup, sort and paginate in one go.
pub fn build_table<'a>(records: &[&'a MovieRecord], query: &TableQuery) -> Page<'a> {
    let mut rows = dedup_by_title(records, query.metric);
    sort_rows(&mut rows, query.sort, query.order);
    paginate(&rows, query.page, query.per_page)
}

/// Distinct values shown in a column's filter dropdown: years and notes
/// numerically descending, text alphabetically.
pub fn column_values(rows: &[&MovieRecord], facet: Facet) -> Vec<FacetValue> {
    let distinct: BTreeSet<ValueRef<'_>> = rows.iter().flat_map(|r| r.values(facet)).collect();
    let mut values: Vec<FacetValue> = distinct.into_iter().map(ValueRef::to_value).collect();
    match facet.kind() {
        crate::facet::ValueKind::Text => values.sort_by(|a, b| text_cmp(&a.to_string(), &b.to_string())),
        _ => values.reverse(),
    }
    values
}
