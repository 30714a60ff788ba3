//! Timestamp normalization
//!
//! Vendor event tracks record wall-clock times of the acquisition machine. Every
//! instant (the recording start as well as each event) is re-anchored to the same
//! fixed source offset and converted to UTC before offsets are taken, so relative
//! onsets do not depend on the zone the file claims.

use crate::types::{DecoderError, Result, Timestamp};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Parse a "+HH:MM" / "-HHMM" / "Z" offset
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    raw.parse::<FixedOffset>()
        .map_err(|e| DecoderError::InvalidData(format!("invalid UTC offset '{}': {}", raw, e)))
}

/// Parse a vendor timestamp into its wall-clock part
///
/// MFF files write RFC 3339 times with an offset; any offset present is
/// discarded and the local wall-clock reading is kept.
pub fn parse_wall_clock(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| DecoderError::LogParseError(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Attach the source offset to a wall-clock time and convert to UTC
pub fn normalize_instant(wall_clock: NaiveDateTime, source: FixedOffset) -> Result<Timestamp> {
    source
        .from_local_datetime(&wall_clock)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            DecoderError::InvalidData(format!(
                "cannot place {} in offset {}",
                wall_clock, source
            ))
        })
}

/// Seconds from `meas_start` to `instant` (negative if the event precedes it)
pub fn relative_seconds(instant: Timestamp, meas_start: Timestamp) -> f64 {
    let delta = instant - meas_start;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Onset in seconds of a wall-clock event time relative to the recording start
pub fn onset_seconds(
    wall_clock: NaiveDateTime,
    meas_start: Timestamp,
    source: FixedOffset,
) -> Result<f64> {
    Ok(relative_seconds(normalize_instant(wall_clock, source)?, meas_start))
}
