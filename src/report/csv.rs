//! CSV report generation

use crate::dataset::MovieRecord;
use crate::error::Result;
use std::io::Write;

const HEADER: [&str; 9] = [
    "title",
    "year",
    "vote_average",
    "popularity",
    "budget",
    "revenue",
    "runtime",
    "genres",
    "production_companies",
];

pub fn write<W: Write>(writer: &mut W, records: &[&MovieRecord]) -> Result<()> {
    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;

    for r in records {
        out.write_record([
            r.title.clone(),
            opt(r.year),
            opt(r.vote_average),
            opt(r.popularity),
            opt(r.budget),
            opt(r.revenue),
            opt(r.runtime),
            serde_json::to_string(&r.genres)?,
            serde_json::to_string(&r.production_companies)?,
        ])?;
    }

    out.flush()?;
    Ok(())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
