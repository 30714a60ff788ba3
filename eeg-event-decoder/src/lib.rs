//! EEG Event Decoder Library
//!
//! A stateless, reusable library for turning vendor EEG recordings (EGI MFF) into
//! time-aligned annotation sequences.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on event decoding:
//! - Parses a recording's metadata and event tracks
//! - Normalizes event times against the measurement start
//! - Derives or applies a condition legend
//! - Emits an ordered, filtered annotation sequence
//!
//! Alongside that it carries the lab's file plumbing: server paths, the
//! recording manifest, BIDS-style output naming and Semantics file grouping.
//!
//! The library does NOT:
//! - Decode sample data
//! - Filter, clean or epoch signals
//! - Produce full BIDS datasets
//!
//! Batch orchestration is in the application layer (eeg-event-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use eeg_event_decoder::{AnnotationConfig, Decoder};
//! use std::path::Path;
//!
//! let decoder = Decoder::new();
//! let config = AnnotationConfig::new()
//!     .map_code("img+", "image")
//!     .map_code("snd+", "word");
//!
//! let recording = decoder
//!     .read_recording(Path::new("2031_semantics.mff"), &config)
//!     .unwrap();
//!
//! println!("t=0 at {}", recording.meas_date);
//! for annotation in &recording.annotations {
//!     println!("{}", annotation);
//! }
//! ```

// Public modules
pub mod bids;
pub mod config;
pub mod decoder;
pub mod formats;
pub mod legend;
pub mod manifest;
pub mod montage;
pub mod paths;
pub mod studies;
pub mod timestamps;
pub mod types;

// Re-export main types for convenience
pub use bids::{listen_event_ids, write_events_tsv, BidsPath, EventIdMap};
pub use config::AnnotationConfig;
pub use decoder::{build_annotations, AnnotationIterator, Decoder};
pub use formats::{EventTrack, MffReader, RecordingReader};
pub use legend::{extract_condition_map, resolve_condition_map};
pub use manifest::{generate_manifest, read_manifest, write_manifest, ManifestRow, Task};
pub use montage::MontageResolver;
pub use paths::LabPaths;
pub use types::{
    Annotation, ConditionMap, DecoderError, EventCodeMap, RawEvent, Recording, Result,
    Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
