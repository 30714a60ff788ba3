//! Condition legend extraction
//!
//! Event tracks list the experiment's condition legend once, as a run of `CELL`
//! records ahead of the stimuli. Each `CELL` maps a condition-cell id to a label.

use crate::config::AnnotationConfig;
use crate::formats::EventTrack;
use crate::types::{ConditionMap, DecoderError, RawEvent, Result};

/// Derive a condition map from the first contiguous run of `CELL` events
///
/// Scanning starts at the first `CELL` and stops at the first non-`CELL` event
/// after it. Later `CELL` events are ignored. Legend entries missing a cell id
/// or a label contribute nothing.
pub fn extract_condition_map<'a, I>(events: I) -> ConditionMap
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    let mut map = ConditionMap::new();
    let mut collecting = false;

    for event in events {
        if !event.is_legend() {
            if collecting {
                break;
            }
            continue;
        }
        collecting = true;

        match (event.cell, event.label.as_deref()) {
            (Some(cell), Some(label)) => {
                map.insert(cell, label.to_string());
            }
            _ => log::warn!(
                "Legend entry at {} lacks a cell id or label, ignoring",
                event.begin_time
            ),
        }
    }

    map
}

/// Pick the condition map for a recording
///
/// An explicit map in the configuration wins. Otherwise a configured legend
/// track is used, and failing that the single track containing `CELL` events.
/// Several candidate tracks without a selection is an error.
pub fn resolve_condition_map(
    config: &AnnotationConfig,
    tracks: &[EventTrack],
) -> Result<ConditionMap> {
    if let Some(conditions) = &config.conditions {
        log::debug!("Using {} configured conditions", conditions.len());
        return Ok(conditions.clone());
    }

    if let Some(name) = &config.legend_track {
        let track = tracks.iter().find(|t| &t.name == name).ok_or_else(|| {
            DecoderError::InvalidData(format!("legend track '{}' not found", name))
        })?;
        log::debug!("Reading condition legend from track '{}'", track.name);
        return Ok(extract_condition_map(&track.events));
    }

    let candidates: Vec<&EventTrack> = tracks
        .iter()
        .filter(|t| t.events.iter().any(RawEvent::is_legend))
        .collect();

    match candidates.as_slice() {
        [] => {
            log::debug!("No condition legend found in {} tracks", tracks.len());
            Ok(ConditionMap::new())
        }
        [track] => {
            log::debug!("Reading condition legend from track '{}'", track.name);
            Ok(extract_condition_map(&track.events))
        }
        many => Err(DecoderError::AmbiguousLegend(
            many.iter().map(|t| t.path.clone()).collect(),
        )),
    }
}
