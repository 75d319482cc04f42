//! Staging artifacts
//!
//! Two hand-off files let the pipeline resume at transform or load without
//! re-fetching: the raw accumulation as a JSON array, and the cleaned
//! dataset as CSV. The CSV header is the sorted union of all columns; nulls
//! are empty cells. Values come back from CSV as text — the splitter
//! re-coerces identity and typed fields, so the round trip is lossless where
//! it matters.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde_json::Value;
use tracing::info;

use fip_common::{FipError, Result};

use crate::record::{FlatRecord, Scalar};

/// Write the raw-record accumulation to a JSON array file.
pub fn write_raw(records: &[Value], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, records)?;

    info!(records = records.len(), path = %path.display(), "raw data staged");
    Ok(())
}

/// Read a previously staged raw-record file.
pub fn read_raw(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    let records: Vec<Value> = serde_json::from_reader(file)?;

    info!(records = records.len(), path = %path.display(), "raw data loaded");
    Ok(records)
}

/// Write the cleaned dataset to a CSV file.
pub fn write_cleaned(records: &[FlatRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let columns = column_union(records);
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FipError::Staging(format!("cannot open {}: {}", path.display(), e)))?;

    // A zero-field record is an error in the csv crate; an empty dataset
    // stages as an empty file.
    if !columns.is_empty() {
        writer
            .write_record(&columns)
            .map_err(|e| FipError::Staging(e.to_string()))?;
    }

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|col| record.get(col).map(Scalar::to_csv_field).unwrap_or_default())
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| FipError::Staging(e.to_string()))?;
    }
    writer.flush()?;

    info!(
        rows = records.len(),
        columns = columns.len(),
        path = %path.display(),
        "cleaned data staged"
    );
    Ok(())
}

/// Read a previously staged cleaned-dataset CSV.
pub fn read_cleaned(path: impl AsRef<Path>) -> Result<Vec<FlatRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FipError::Staging(format!("cannot open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| FipError::Staging(e.to_string()))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| FipError::Staging(e.to_string()))?;
        let mut record = FlatRecord::new();
        for (column, field) in headers.iter().zip(row.iter()) {
            let value = if field.is_empty() {
                Scalar::Null
            } else {
                Scalar::Text(field.to_string())
            };
            record.insert(column.to_string(), value);
        }
        records.push(record);
    }

    info!(rows = records.len(), path = %path.display(), "cleaned data loaded");
    Ok(records)
}

/// Sorted union of all column names in the dataset.
fn column_union(records: &[FlatRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}
