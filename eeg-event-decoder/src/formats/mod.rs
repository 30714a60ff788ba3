//! Recording container readers
//!
//! This module contains readers for vendor recording containers. A reader yields
//! the recording's measurement start, its declared montage and its event tracks.

use crate::types::{RawEvent, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub mod mff;

// Re-export reader types
pub use mff::MffReader;

/// One event-track file of a recording
#[derive(Debug, Clone)]
pub struct EventTrack {
    /// Track file
    pub path: PathBuf,
    /// Track name (e.g. "ECI TCP-IP 55513")
    pub name: String,
    /// Events in file order
    pub events: Vec<RawEvent>,
}

/// Common trait for recording container readers
pub trait RecordingReader: Sized {
    /// Open a recording
    fn open(path: &Path) -> Result<Self>;

    /// Wall-clock measurement start as written by the acquisition machine
    fn start_time(&self) -> Result<NaiveDateTime>;

    /// Vendor montage name, if the recording declares one
    fn montage_name(&self) -> Result<Option<String>>;

    /// All event tracks, in a stable order
    fn event_tracks(&self) -> Result<Vec<EventTrack>>;
}
