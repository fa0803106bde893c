//! JSON report generation

use super::Summary;
use crate::dataset::MovieRecord;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    summary: Summary,
    movies: &'a [&'a MovieRecord],
}

pub fn write<W: Write>(writer: &mut W, records: &[&MovieRecord]) -> Result<()> {
    let report = Report {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_records(records),
        movies: records,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}
