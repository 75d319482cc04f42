//! Flat record representation and coerce-or-null typing
//!
//! The source feed is loosely typed; every value lands here as a [`Scalar`]
//! and the coercion helpers convert best-effort, yielding `None` instead of
//! failing on malformed input. Coercion is deterministic: the same input
//! always produces the same output and never panics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single flattened value from the source feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
    /// Arrays and other non-scalar shapes pass through opaquely.
    Raw(serde_json::Value),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Render for the CSV staging artifact; `Null` becomes an empty cell.
    pub fn to_csv_field(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Date(d) => d.to_string(),
            Scalar::Text(s) => s.clone(),
            Scalar::Raw(v) => v.to_string(),
        }
    }
}

/// A flattened record: canonical field name to scalar value.
///
/// A `BTreeMap` keeps column order deterministic across the run, which the
/// cleaning stage and the CSV staging artifact both rely on.
pub type FlatRecord = BTreeMap<String, Scalar>;

/// Best-effort numeric coercion.
pub fn coerce_number(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) if n.is_finite() => Some(*n),
        Scalar::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        },
        _ => None,
    }
}

/// Best-effort integer coercion.
///
/// The feed renders integer identities both as plain integers and as
/// float-formatted text ("100.0"); a fractional part rejects the value.
pub fn coerce_int(value: &Scalar) -> Option<i64> {
    let n = coerce_number(value)?;
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Best-effort calendar-date coercion.
///
/// Accepts ISO dates and the Socrata floating timestamp
/// (`2024-01-01T00:00:00.000`).
pub fn coerce_date(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Date(d) => Some(*d),
        Scalar::Text(s) => {
            let trimmed = s.trim();
            if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                return Some(d);
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, fmt) {
                    return Some(dt.date());
                }
            }
            None
        },
        _ => None,
    }
}

/// Best-effort text extraction; numbers and dates render to their canonical
/// string form, opaque raw values are not treated as text.
pub fn coerce_text(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Text(s) => Some(s.clone()),
        Scalar::Number(n) => Some(format_number(*n)),
        Scalar::Date(d) => Some(d.to_string()),
        Scalar::Null | Scalar::Raw(_) => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
