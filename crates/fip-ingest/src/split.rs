//! Entity splitting
//!
//! Projects the cleaned dataset into the two relational entities. Facilities
//! are keyed by `license_number` with a keep-first policy; inspections carry
//! a defensive keep-first dedup by `inspection_id`. Identity and typed
//! fields are re-coerced here so the splitter also works on the
//! staging-resume path, where values arrive back from CSV as text.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::record::{coerce_date, coerce_int, coerce_number, coerce_text, FlatRecord, Scalar};

/// A food-service facility, identity = `license_number`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub license_number: i64,
    pub dba_name: Option<String>,
    pub aka_name: Option<String>,
    pub facility_type: Option<String>,
    pub risk: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<String>,
}

/// A single inspection event, identity = `inspection_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub inspection_id: i64,
    pub license_number: Option<i64>,
    pub inspection_date: Option<NaiveDate>,
    pub inspection_type: Option<String>,
    pub risk: Option<String>,
    pub results: Option<String>,
    pub violations: Option<String>,
}

/// Result of splitting the cleaned dataset.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub facilities: Vec<Facility>,
    pub inspections: Vec<Inspection>,
    /// Rows whose facility projection was discarded as a later duplicate.
    pub duplicate_facilities: usize,
    /// Rows discarded by the defensive inspection-identity check.
    pub duplicate_inspections: usize,
}

/// Split cleaned records into facility and inspection streams.
pub fn split(records: &[FlatRecord]) -> SplitOutcome {
    let mut outcome = SplitOutcome::default();
    let mut seen_licenses: BTreeSet<i64> = BTreeSet::new();
    let mut seen_inspections: BTreeSet<i64> = BTreeSet::new();

    for record in records {
        let license_number = get(record, "license_").and_then(|v| coerce_int(&v));

        // Facility projection: first occurrence of a license number wins.
        // Rows with no parsable license number have no facility identity.
        if let Some(license) = license_number {
            if seen_licenses.insert(license) {
                outcome.facilities.push(Facility {
                    license_number: license,
                    dba_name: text(record, "dba_name"),
                    aka_name: text(record, "aka_name"),
                    facility_type: text(record, "facility_type"),
                    risk: text(record, "risk"),
                    address: text(record, "address"),
                    city: text(record, "city"),
                    state: text(record, "state"),
                    zip: get(record, "zip").and_then(|v| coerce_int(&v)),
                    latitude: get(record, "latitude").and_then(|v| coerce_number(&v)),
                    longitude: get(record, "longitude").and_then(|v| coerce_number(&v)),
                    location: text(record, "location_human_address"),
                });
            } else {
                outcome.duplicate_facilities += 1;
            }
        }

        // Inspection projection. Upstream cleaning guarantees the identity
        // is present, but re-verify rather than assume.
        let Some(inspection_id) = get(record, "inspection_id").and_then(|v| coerce_int(&v)) else {
            continue;
        };
        if !seen_inspections.insert(inspection_id) {
            outcome.duplicate_inspections += 1;
            continue;
        }

        outcome.inspections.push(Inspection {
            inspection_id,
            license_number,
            inspection_date: get(record, "inspection_date").and_then(|v| coerce_date(&v)),
            inspection_type: text(record, "inspection_type"),
            risk: text(record, "risk"),
            results: text(record, "results"),
            violations: text(record, "violations"),
        });
    }

    if outcome.duplicate_inspections > 0 {
        warn!(
            duplicates = outcome.duplicate_inspections,
            "dropped inspections with repeated inspection_id"
        );
    }
    info!(
        facilities = outcome.facilities.len(),
        inspections = outcome.inspections.len(),
        "split complete"
    );

    outcome
}

fn get(record: &FlatRecord, field: &str) -> Option<Scalar> {
    record.get(field).cloned().filter(|v| !v.is_null())
}

fn text(record: &FlatRecord, field: &str) -> Option<String> {
    get(record, field).and_then(|v| coerce_text(&v))
}
