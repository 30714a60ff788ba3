//! Main decoder API
//!
//! This module provides the primary interface for the decoder library. The
//! Decoder reads a recording's metadata and event tracks and turns the raw
//! events into an ordered annotation sequence.

use crate::config::AnnotationConfig;
use crate::formats::{MffReader, RecordingReader};
use crate::legend::resolve_condition_map;
use crate::montage::MontageResolver;
use crate::timestamps::{normalize_instant, onset_seconds};
use crate::types::{
    is_excluded_code, Annotation, ConditionMap, DecoderError, RawEvent, Recording, Result,
    Timestamp,
};
use chrono::FixedOffset;
use std::path::Path;

/// The main decoder struct - entry point for reading recordings
pub struct Decoder {
    montages: MontageResolver,
}

impl Decoder {
    /// Create a new decoder with the built-in montage table
    pub fn new() -> Self {
        Self {
            montages: MontageResolver::new(),
        }
    }

    /// Create a decoder with a custom montage table
    pub fn with_montages(montages: MontageResolver) -> Self {
        Self { montages }
    }

    /// Read a recording and derive its annotations
    ///
    /// # Example
    /// ```no_run
    /// use eeg_event_decoder::{AnnotationConfig, Decoder};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// let config = AnnotationConfig::listen_semantics();
    /// let recording = decoder
    ///     .read_recording(Path::new("2031_semantics.mff"), &config)
    ///     .unwrap();
    /// for annotation in &recording.annotations {
    ///     println!("{}", annotation);
    /// }
    /// ```
    pub fn read_recording(&self, path: &Path, config: &AnnotationConfig) -> Result<Recording> {
        log::info!("Reading recording: {:?}", path);

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("mff") => {
                log::debug!("Detected MFF recording");
                let reader = MffReader::open(path)?;
                self.read_with(&reader, path, config)
            }
            _ => Err(DecoderError::LogParseError(format!(
                "Unsupported recording format: {:?}",
                extension
            ))),
        }
    }

    fn read_with<R: RecordingReader>(
        &self,
        reader: &R,
        path: &Path,
        config: &AnnotationConfig,
    ) -> Result<Recording> {
        let offset = config.offset()?;
        let meas_date = normalize_instant(reader.start_time()?, offset)?;
        log::debug!("Measurement start: {}", meas_date);

        let montage = match reader.montage_name()? {
            Some(name) => Some(self.montages.resolve(&name)?.to_string()),
            None => None,
        };

        let tracks = reader.event_tracks()?;
        let conditions = resolve_condition_map(config, &tracks)?;

        // File-then-event order; no merge by timestamp
        let events = tracks.iter().flat_map(|t| t.events.iter());
        let annotations =
            AnnotationIterator::new(events, meas_date, offset, config, &conditions)
                .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Built {} annotations from {} tracks",
            annotations.len(),
            tracks.len()
        );

        Ok(Recording {
            path: path.to_path_buf(),
            meas_date,
            montage,
            annotations,
        })
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the annotation sequence for already-parsed events
///
/// Stops at the first unresolvable condition.
pub fn build_annotations(
    events: &[RawEvent],
    meas_start: Timestamp,
    config: &AnnotationConfig,
    conditions: &ConditionMap,
) -> Result<Vec<Annotation>> {
    let offset = config.offset()?;
    AnnotationIterator::new(events.iter(), meas_start, offset, config, conditions).collect()
}

/// Iterator that turns raw events into annotations
///
/// For each event:
/// 1. Housekeeping codes are dropped
/// 2. Mapped codes become `<stimulus>_<condition>`; the condition must resolve
/// 3. Anything else keeps its raw code
pub struct AnnotationIterator<'a, I>
where
    I: Iterator<Item = &'a RawEvent>,
{
    events: I,
    meas_start: Timestamp,
    offset: FixedOffset,
    config: &'a AnnotationConfig,
    conditions: &'a ConditionMap,
}

impl<'a, I> AnnotationIterator<'a, I>
where
    I: Iterator<Item = &'a RawEvent>,
{
    pub fn new(
        events: I,
        meas_start: Timestamp,
        offset: FixedOffset,
        config: &'a AnnotationConfig,
        conditions: &'a ConditionMap,
    ) -> Self {
        Self {
            events,
            meas_start,
            offset,
            config,
            conditions,
        }
    }

    /// Process a single event; `Ok(None)` means the event is excluded
    fn process_event(&self, event: &RawEvent) -> Result<Option<Annotation>> {
        let onset = onset_seconds(event.begin_time, self.meas_start, self.offset)?;
        let duration = event.duration_seconds();

        if is_excluded_code(&event.code) {
            log::trace!("Dropping housekeeping event '{}'", event.code);
            return Ok(None);
        }

        let description = match self.config.mapped_code(&event.code) {
            Some(stimulus) => {
                let condition = event
                    .cell
                    .and_then(|cell| self.conditions.get(&cell))
                    .ok_or_else(|| DecoderError::UnresolvedCondition {
                        code: event.code.clone(),
                        cell: event.cell,
                    })?;
                format!("{}_{}", stimulus, condition)
            }
            None => event.code.clone(),
        };

        Ok(Some(Annotation::new(onset, duration, description)))
    }
}

impl<'a, I> Iterator for AnnotationIterator<'a, I>
where
    I: Iterator<Item = &'a RawEvent>,
{
    type Item = Result<Annotation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = self.events.next()?;
            match self.process_event(event) {
                Ok(Some(annotation)) => return Some(Ok(annotation)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
