//! Record cleaning
//!
//! Two-phase clean over the flattened record set:
//!
//! 1. Row-wise: exact-row deduplication, coerce-or-null typing of known date
//!    and numeric fields, and dropping rows without an `inspection_id`.
//! 2. Dataset-wide: eliminate the nested geocoordinate columns when they are
//!    value-identical to their top-level counterparts across every retained
//!    row.
//!
//! Field-level parse failures degrade to `Null` and are only surfaced as
//! aggregate counts; `inspection_id` is the one field load-bearing enough to
//! reject a row.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::record::{coerce_date, coerce_int, coerce_number, FlatRecord, Scalar};

/// Fields parsed to calendar dates when present.
const DATE_FIELDS: &[&str] = &["inspection_date", "license_start_date", "license_end_date"];

/// Fields parsed to floating-point numbers when present.
const FLOAT_FIELDS: &[&str] = &[
    "latitude",
    "longitude",
    "location_latitude",
    "location_longitude",
];

/// Fields parsed to integers when present (identity and code fields).
const INT_FIELDS: &[&str] = &["inspection_id", "license_", "zip"];

/// Redundant nested column and its top-level counterpart.
const REDUNDANT_COLUMNS: &[(&str, &str)] = &[
    ("location_latitude", "latitude"),
    ("location_longitude", "longitude"),
];

/// Aggregate counts from a cleaning pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub duplicate_rows_removed: usize,
    pub rows_missing_identity: usize,
    pub date_coercion_failures: usize,
    pub numeric_coercion_failures: usize,
    pub columns_eliminated: Vec<String>,
    pub output_rows: usize,
}

/// Clean a flattened record set.
pub fn clean(records: Vec<FlatRecord>) -> (Vec<FlatRecord>, CleanReport) {
    let mut report = CleanReport {
        input_rows: records.len(),
        ..CleanReport::default()
    };

    // Phase 1: row-wise pass.
    let mut seen = BTreeSet::new();
    let mut cleaned: Vec<FlatRecord> = Vec::with_capacity(records.len());

    for record in records {
        // Exact-row dedup happens before coercion, so two rows that differ
        // only in raw formatting are not collapsed.
        let fingerprint = format!("{:?}", record);
        if !seen.insert(fingerprint) {
            report.duplicate_rows_removed += 1;
            continue;
        }

        let record = coerce_row(record, &mut report);

        match record.get("inspection_id") {
            Some(Scalar::Number(_)) => cleaned.push(record),
            _ => report.rows_missing_identity += 1,
        }
    }

    // Phase 2: dataset-wide column elimination.
    for (redundant, canonical) in REDUNDANT_COLUMNS {
        if column_is_redundant(&cleaned, redundant, canonical) {
            for record in &mut cleaned {
                record.remove(*redundant);
            }
            report.columns_eliminated.push((*redundant).to_string());
        }
    }

    report.output_rows = cleaned.len();

    if cleaned.is_empty() {
        warn!("cleaning produced no rows");
    }
    info!(
        input = report.input_rows,
        output = report.output_rows,
        duplicates = report.duplicate_rows_removed,
        missing_identity = report.rows_missing_identity,
        columns_eliminated = report.columns_eliminated.len(),
        "clean complete"
    );

    (cleaned, report)
}

/// Coerce the known typed fields of one row in place.
fn coerce_row(mut record: FlatRecord, report: &mut CleanReport) -> FlatRecord {
    for field in DATE_FIELDS {
        if let Some(value) = record.get(*field) {
            if value.is_null() {
                continue;
            }
            match coerce_date(value) {
                Some(d) => {
                    record.insert((*field).to_string(), Scalar::Date(d));
                },
                None => {
                    report.date_coercion_failures += 1;
                    record.insert((*field).to_string(), Scalar::Null);
                },
            }
        }
    }

    for field in FLOAT_FIELDS {
        if let Some(value) = record.get(*field) {
            if value.is_null() {
                continue;
            }
            match coerce_number(value) {
                Some(n) => {
                    record.insert((*field).to_string(), Scalar::Number(n));
                },
                None => {
                    report.numeric_coercion_failures += 1;
                    record.insert((*field).to_string(), Scalar::Null);
                },
            }
        }
    }

    for field in INT_FIELDS {
        if let Some(value) = record.get(*field) {
            if value.is_null() {
                continue;
            }
            match coerce_int(value) {
                Some(n) => {
                    record.insert((*field).to_string(), Scalar::Number(n as f64));
                },
                None => {
                    report.numeric_coercion_failures += 1;
                    record.insert((*field).to_string(), Scalar::Null);
                },
            }
        }
    }

    record
}

/// A redundant column may be dropped only when it exists somewhere in the
/// dataset and matches its counterpart on every row (absent counts as Null
/// on both sides). This is a dataset-wide decision, not row-wise.
fn column_is_redundant(records: &[FlatRecord], redundant: &str, canonical: &str) -> bool {
    let exists = records.iter().any(|r| r.contains_key(redundant));
    if !exists {
        return false;
    }

    records.iter().all(|record| {
        let a = record.get(redundant).unwrap_or(&Scalar::Null);
        let b = record.get(canonical).unwrap_or(&Scalar::Null);
        a == b
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn row(v: serde_json::Value) -> FlatRecord {
        flatten(&v)
    }

    #[test]
    fn exact_duplicates_collapse() {
        let records = vec![
            row(json!({"inspection_id": "1", "results": "Pass"})),
            row(json!({"inspection_id": "1", "results": "Pass"})),
            row(json!({"inspection_id": "2", "results": "Fail"})),
        ];
        let (cleaned, report) = clean(records);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(report.duplicate_rows_removed, 1);
    }

    #[test]
    fn rows_without_identity_are_dropped() {
        let records = vec![
            row(json!({"inspection_id": "1"})),
            row(json!({"inspection_id": null})),
            row(json!({"results": "Pass"})),
            row(json!({"inspection_id": "garbage"})),
        ];
        let (cleaned, report) = clean(records);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(report.rows_missing_identity, 3);
    }

    #[test]
    fn date_and_numeric_fields_coerce_or_null() {
        let records = vec![row(json!({
            "inspection_id": "1",
            "inspection_date": "2024-01-01T00:00:00.000",
            "license_start_date": "never",
            "zip": "60601",
            "latitude": "not a number"
        }))];
        let (cleaned, report) = clean(records);
        let rec = &cleaned[0];

        assert!(matches!(rec["inspection_date"], Scalar::Date(_)));
        assert_eq!(rec["license_start_date"], Scalar::Null);
        assert_eq!(rec["zip"], Scalar::Number(60601.0));
        assert_eq!(rec["latitude"], Scalar::Null);
        assert_eq!(report.date_coercion_failures, 1);
        assert_eq!(report.numeric_coercion_failures, 1);
    }

    #[test]
    fn redundant_columns_dropped_when_identical_everywhere() {
        let records = vec![
            row(json!({
                "inspection_id": "1",
                "latitude": "41.8", "longitude": "-87.6",
                "location": {"latitude": "41.8", "longitude": "-87.6"}
            })),
            row(json!({
                "inspection_id": "2",
                "latitude": "41.9", "longitude": "-87.7",
                "location": {"latitude": "41.9", "longitude": "-87.7"}
            })),
        ];
        let (cleaned, report) = clean(records);
        assert!(report.columns_eliminated.contains(&"location_latitude".to_string()));
        assert!(report.columns_eliminated.contains(&"location_longitude".to_string()));
        for rec in &cleaned {
            assert!(!rec.contains_key("location_latitude"));
            assert!(!rec.contains_key("location_longitude"));
        }
    }

    #[test]
    fn single_differing_row_retains_column() {
        let records = vec![
            row(json!({
                "inspection_id": "1",
                "latitude": "41.8",
                "location": {"latitude": "41.8"}
            })),
            row(json!({
                "inspection_id": "2",
                "latitude": "41.9",
                "location": {"latitude": "42.0"}
            })),
        ];
        let (cleaned, report) = clean(records);
        assert!(report.columns_eliminated.is_empty());
        assert!(cleaned.iter().any(|r| r.contains_key("location_latitude")));
    }

    #[test]
    fn absent_column_is_not_eliminated() {
        let records = vec![row(json!({"inspection_id": "1", "latitude": "41.8"}))];
        let (_, report) = clean(records);
        assert!(report.columns_eliminated.is_empty());
    }

    #[test]
    fn coercion_happens_before_redundancy_check() {
        // One side nested-text, other side already numeric text; after
        // coercion both are Number(41.8) so the column is redundant.
        let records = vec![row(json!({
            "inspection_id": "1",
            "latitude": "41.80",
            "location": {"latitude": "41.8"}
        }))];
        let (cleaned, report) = clean(records);
        assert_eq!(report.columns_eliminated, vec!["location_latitude".to_string()]);
        assert!(!cleaned[0].contains_key("location_latitude"));
    }
}
