use crate::detectors::stalta::EventSummary;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Read one numeric column (by header name) from a delimited file.
pub fn read_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_column_from(file, column, delimiter).with_context(|| format!("in {}", path.display()))
}

pub fn read_column_from<R: Read>(reader: R, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let idx = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| anyhow!("column `{}` not found (have: {:?})", column, headers))?;

    let mut out = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        let field = record
            .get(idx)
            .ok_or_else(|| anyhow!("row {} has no `{}` field", row + 1, column))?;
        let value: f64 = field
            .parse()
            .with_context(|| format!("row {} `{}` is not f64: {}", row + 1, column, field))?;
        if !value.is_finite() {
            anyhow::bail!("row {} `{}` is not a finite sample: {}", row + 1, column, field);
        }
        out.push(value);
    }
    Ok(out)
}

/// Write one row per event, with a header.
pub fn write_summaries<W: Write>(writer: W, summaries: &[EventSummary]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for summary in summaries {
        writer.serialize(summary).context("writing event row")?;
    }
    writer.flush().context("flushing event table")?;
    Ok(())
}

pub fn write_summaries_to_path(path: &Path, summaries: &[EventSummary]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_summaries(file, summaries)
}
