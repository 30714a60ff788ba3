//! Annotation configuration types
//!
//! This module defines the configuration the annotation builder needs: optional
//! code and condition mappings, the vendor's source timezone and an optional
//! legend track selection. Batch-level concerns (paths, manifests, overwrite
//! policy) live in the application layer.

use crate::timestamps::parse_offset;
use crate::types::{ConditionMap, EventCodeMap, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// UTC offset of the acquisition machines' wall clock (Pacific standard time)
pub const DEFAULT_SOURCE_OFFSET: &str = "-08:00";

/// Configuration for building annotations from a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Optional raw code → stimulus-type label mapping
    #[serde(default)]
    pub event_codes: Option<EventCodeMap>,

    /// Explicit condition legend; when absent it is derived from the event tracks
    #[serde(default)]
    pub conditions: Option<ConditionMap>,

    /// Fixed UTC offset attached to vendor wall-clock times ("+HH:MM")
    #[serde(default = "default_source_offset")]
    pub source_offset: String,

    /// Event track holding the condition legend (e.g. "ECI TCP-IP 55513")
    #[serde(default)]
    pub legend_track: Option<String>,
}

fn default_source_offset() -> String {
    DEFAULT_SOURCE_OFFSET.to_string()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            event_codes: None,
            conditions: None,
            source_offset: default_source_offset(),
            legend_track: None,
        }
    }
}

impl AnnotationConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a code → stimulus-type mapping
    pub fn map_code(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.event_codes
            .get_or_insert_with(EventCodeMap::new)
            .insert(code.into(), label.into());
        self
    }

    /// Builder method: add a condition legend entry
    pub fn map_condition(mut self, cell: u32, label: impl Into<String>) -> Self {
        self.conditions
            .get_or_insert_with(ConditionMap::new)
            .insert(cell, label.into());
        self
    }

    /// Builder method: replace the condition legend
    pub fn with_conditions(mut self, conditions: ConditionMap) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Builder method: set the source offset ("+HH:MM")
    pub fn with_source_offset(mut self, offset: impl Into<String>) -> Self {
        self.source_offset = offset.into();
        self
    }

    /// Builder method: select the legend track by name
    pub fn with_legend_track(mut self, track: impl Into<String>) -> Self {
        self.legend_track = Some(track.into());
        self
    }

    /// Parsed source offset
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.source_offset)
    }

    /// Stimulus-type label for a raw code, if a code map is configured and matches
    pub fn mapped_code(&self, code: &str) -> Option<&str> {
        self.event_codes
            .as_ref()
            .and_then(|m| m.get(code))
            .map(String::as_str)
    }

    /// Mapping used by the Listen study's semantics task
    pub fn listen_semantics() -> Self {
        Self::new()
            .map_code("img+", "image")
            .map_code("snd+", "word")
            .map_condition(1, "match")
            .map_condition(2, "mismatch")
    }
}
