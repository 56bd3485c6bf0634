//! CSV ingestion of `key,data[,aux]` rows

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use pagetree::{Key, Payload};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read rows from the CSV file at `path`
pub fn read_rows_from_path(path: &Path, has_headers: bool) -> Result<Vec<(Key, Payload)>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_rows(file, has_headers).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read rows of `key,data[,aux]`; a missing `aux` column reads as zero
pub fn read_rows<R: Read>(reader: R, has_headers: bool) -> Result<Vec<(Key, Payload)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(parse_record(&record)?);
    }

    debug!(rows = rows.len(), "Read CSV rows");
    Ok(rows)
}

fn parse_record(record: &StringRecord) -> Result<(Key, Payload)> {
    let line = record.position().map_or(0, csv::Position::line);
    if !(2..=3).contains(&record.len()) {
        bail!(
            "line {line}: expected `key,data[,aux]`, got {} fields",
            record.len()
        );
    }

    let field = |idx: usize, name: &str| -> Result<u64> {
        match record.get(idx) {
            Some(value) => value
                .parse()
                .with_context(|| format!("line {line}: invalid {name} {value:?}")),
            None => Ok(0),
        }
    };

    Ok((
        field(0, "key")?,
        Payload::new(field(1, "data")?, field(2, "aux")?),
    ))
}
