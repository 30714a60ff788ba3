//! Core types for the EEG event decoder library
//!
//! This module defines the records the decoder reads out of a recording's event
//! tracks and the annotations it emits. Raw events are immutable once parsed; the
//! annotation builder only reads them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Condition-cell identifier → human-readable condition label
pub type ConditionMap = BTreeMap<u32, String>;

/// Raw event code → stimulus-type label (e.g. "img+" → "image")
pub type EventCodeMap = BTreeMap<String, String>;

/// Key name carrying the condition-cell identifier in vendor event records
pub const CELL_KEY: &str = "cel#";

/// Event code of the condition legend entries
pub const LEGEND_CODE: &str = "CELL";

/// Housekeeping event codes that never become annotations
pub const EXCLUDED_CODES: [&str; 5] = ["bgin", "TRSP", "SESS", "CELL", "Isi+"];

/// Returns true if `code` is one of the housekeeping codes
pub fn is_excluded_code(code: &str) -> bool {
    EXCLUDED_CODES.contains(&code)
}

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("No event tracks found in recording: {0:?}")]
    MissingEvents(PathBuf),

    #[error("Unresolved condition for event '{code}': cell {}", display_cell(.cell))]
    UnresolvedCondition { code: String, cell: Option<u32> },

    #[error("Multiple event tracks carry a condition legend: {0:?}")]
    AmbiguousLegend(Vec<PathBuf>),

    #[error("Failed to parse recording file: {0}")]
    LogParseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown montage: {0}")]
    UnknownMontage(String),

    #[error("Lab server not mounted at {0:?}")]
    ServerNotMounted(PathBuf),

    #[error("Lab server location is not known for platform '{0}'; configure it explicitly")]
    UnsupportedPlatform(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn display_cell(cell: &Option<u32>) -> String {
    cell.map(|c| c.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

impl From<csv::Error> for DecoderError {
    fn from(err: csv::Error) -> Self {
        DecoderError::Manifest(err.to_string())
    }
}

/// One record from a vendor event track
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Short event code token (e.g. "img+", "CELL", "bgin")
    pub code: String,
    /// Wall-clock begin time in the vendor's local timezone
    pub begin_time: NaiveDateTime,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Free-text label (legend entries carry the condition name here)
    pub label: Option<String>,
    /// Auxiliary key/value fields
    pub keys: BTreeMap<String, String>,
    /// The `cel#` key, normalized to an integer
    pub cell: Option<u32>,
}

impl RawEvent {
    /// Build an event, validating the fields downstream code relies on
    pub fn new(
        code: impl Into<String>,
        begin_time: NaiveDateTime,
        duration_ms: f64,
        label: Option<String>,
        keys: BTreeMap<String, String>,
    ) -> Result<Self> {
        let code = code.into();
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(DecoderError::InvalidData(format!(
                "event '{}' has invalid duration {}",
                code, duration_ms
            )));
        }

        let cell = match keys.get(CELL_KEY) {
            Some(raw) => Some(parse_cell(raw).ok_or_else(|| {
                DecoderError::InvalidData(format!(
                    "event '{}' has non-integer {} value '{}'",
                    code, CELL_KEY, raw
                ))
            })?),
            None => None,
        };

        Ok(Self {
            code,
            begin_time,
            duration_ms,
            label,
            keys,
            cell,
        })
    }

    /// Duration converted to seconds
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms / 1000.0
    }

    /// True for condition legend entries
    pub fn is_legend(&self) -> bool {
        self.code == LEGEND_CODE
    }
}

/// Parse a condition-cell identifier ("1", " 2 ", "3.0") into its integer form
pub fn parse_cell(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u32>() {
        return Some(v);
    }
    // Some exports write integral floats
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            Some(f as u32)
        }
        _ => None,
    }
}

/// A labelled interval relative to the recording start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Seconds since the measurement start
    pub onset: f64,
    /// Seconds
    pub duration: f64,
    pub description: String,
}

impl Annotation {
    pub fn new(onset: f64, duration: f64, description: impl Into<String>) -> Self {
        Self {
            onset,
            duration,
            description: description.into(),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10.3}s  {:>7.3}s  {}",
            self.onset, self.duration, self.description
        )
    }
}

/// A parsed recording with its derived annotations
#[derive(Debug, Clone)]
pub struct Recording {
    /// Recording directory
    pub path: PathBuf,
    /// Normalized measurement start (t = 0)
    pub meas_date: Timestamp,
    /// Standard montage name, when the recording declares one
    pub montage: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_cell_key_normalized_to_integer() {
        let mut keys = BTreeMap::new();
        keys.insert(CELL_KEY.to_string(), " 2 ".to_string());
        let event = RawEvent::new("img+", t0(), 500.0, None, keys).unwrap();
        assert_eq!(event.cell, Some(2));
    }

    #[test]
    fn test_non_integer_cell_rejected() {
        let mut keys = BTreeMap::new();
        keys.insert(CELL_KEY.to_string(), "two".to_string());
        let result = RawEvent::new("img+", t0(), 500.0, None, keys);
        assert!(matches!(result, Err(DecoderError::InvalidData(_))));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result = RawEvent::new("img+", t0(), -1.0, None, BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_duration_scaling() {
        let event = RawEvent::new("snd+", t0(), 1500.0, None, BTreeMap::new()).unwrap();
        assert_eq!(event.duration_seconds(), 1.5);
    }

    #[test]
    fn test_parse_cell_variants() {
        assert_eq!(parse_cell("7"), Some(7));
        assert_eq!(parse_cell("3.0"), Some(3));
        assert_eq!(parse_cell("3.5"), None);
        assert_eq!(parse_cell("-1"), None);
        assert_eq!(parse_cell(""), None);
    }

    #[test]
    fn test_excluded_codes() {
        for code in ["bgin", "TRSP", "SESS", "CELL", "Isi+"] {
            assert!(is_excluded_code(code));
        }
        assert!(!is_excluded_code("img+"));
        assert!(!is_excluded_code("cell"));
    }
}
