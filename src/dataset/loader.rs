//! CSV loading for the movie dataset
//!
//! Columns are located by header name, so extra columns (overview,
//! vote_count, ...) and any column order are accepted. Only `title` is
//! required; every other column degrades to "absent" when missing or
//! malformed, which the filter engine treats as a match sentinel.

use super::parse::{parse_amount, parse_f64, parse_list_field, parse_minutes, parse_year};
use super::{Dataset, MovieRecord};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Header positions resolved once per file.
#[derive(Debug)]
struct Columns {
    title: usize,
    original_title: Option<usize>,
    genres: Option<usize>,
    production_companies: Option<usize>,
    year: Option<usize>,
    vote_average: Option<usize>,
    popularity: Option<usize>,
    budget: Option<usize>,
    revenue: Option<usize>,
    runtime: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        let title = find("title").ok_or_else(|| Error::MissingColumn("title".to_string()))?;
        Ok(Self {
            title,
            original_title: find("original_title"),
            genres: find("genres"),
            production_companies: find("production_companies"),
            year: find("year"),
            vote_average: find("vote_average"),
            popularity: find("popularity"),
            budget: find("budget"),
            revenue: find("revenue"),
            runtime: find("runtime"),
        })
    }

    fn record(&self, row: &csv::StringRecord) -> Option<MovieRecord> {
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

        let mut title = cell(Some(self.title)).trim();
        if title.is_empty() {
            title = cell(self.original_title).trim();
        }
        if title.is_empty() {
            return None;
        }

        Some(MovieRecord {
            title: title.to_string(),
            genres: parse_list_field(cell(self.genres)),
            production_companies: parse_list_field(cell(self.production_companies)),
            year: parse_year(cell(self.year)),
            vote_average: parse_f64(cell(self.vote_average)),
            popularity: parse_f64(cell(self.popularity)).filter(|v| *v >= 0.0),
            budget: parse_amount(cell(self.budget)),
            revenue: parse_amount(cell(self.revenue)),
            runtime: parse_minutes(cell(self.runtime)),
        })
    }
}

/// Load a dataset file from disk.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = from_reader(file, |_| {})?;
    tracing::info!(path = %path.display(), records = dataset.len(), "dataset loaded");
    Ok(dataset)
}

/// Parse CSV from any reader. `progress` receives the byte offset after each row.
pub fn from_reader<R: Read>(reader: R, mut progress: impl FnMut(u64)) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    let mut row = csv::StringRecord::new();
    loop {
        match rdr.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed CSV row");
                skipped += 1;
                continue;
            }
        }
        match columns.record(&row) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
        progress(row.position().map(|p| p.byte()).unwrap_or(0));
    }

    if skipped > 0 {
        tracing::debug!(skipped, "rows without a usable title or malformed");
    }
    Ok(Dataset::new(records))
}

/// A file path is used as-is; a directory resolves to its first `.csv` file
/// (sorted by path).
pub fn resolve_dataset_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(Error::NoDataset(path.display().to_string()));
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoDataset(path.display().to_string()))
}
