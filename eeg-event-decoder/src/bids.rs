//! BIDS-style output naming and events export
//!
//! Builds `sub-<id>/ses-<nn>/<datatype>/sub-<id>_ses-<nn>_task-<t>_<suffix>`
//! paths and writes annotation tables as `*_events.tsv`. Dataset-level BIDS
//! sidecars are left to the external exporter.

use crate::manifest::pad_session;
use crate::types::{Annotation, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Description → integer event id used when exporting events
pub type EventIdMap = BTreeMap<String, i64>;

/// Event ids of the Listen export
pub fn listen_event_ids() -> EventIdMap {
    [
        ("BAD_ACQ_SKIP", 0),
        ("image_match", 1),
        ("image_mismatch", 2),
        ("word_match", 3),
        ("word_mismatch", 4),
        ("net", 5),
        ("DIN6", 56),
        ("DIN8", 58),
        ("bgin", 60),
        ("CELL", 61),
        ("SESS", 62),
        ("TRSP", 63),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Location of one recording inside a BIDS tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidsPath {
    pub root: PathBuf,
    pub subject: String,
    pub session: String,
    pub task: String,
    pub datatype: String,
    pub suffix: String,
}

impl BidsPath {
    /// EEG recording path; the session is zero-padded to two digits
    pub fn new(
        root: impl Into<PathBuf>,
        subject: impl Into<String>,
        session: &str,
        task: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            subject: subject.into(),
            session: pad_session(session),
            task: task.into(),
            datatype: "eeg".to_string(),
            suffix: "eeg".to_string(),
        }
    }

    /// Same entities, different suffix (e.g. "events", "channels")
    pub fn with_suffix(&self, suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..self.clone()
        }
    }

    /// `sub-<id>_ses-<nn>_task-<t>`
    pub fn basename(&self) -> String {
        format!(
            "sub-{}_ses-{}_task-{}",
            self.subject, self.session, self.task
        )
    }

    /// Directory holding the files of this recording
    pub fn directory(&self) -> PathBuf {
        self.root
            .join(format!("sub-{}", self.subject))
            .join(format!("ses-{}", self.session))
            .join(&self.datatype)
    }

    /// Full file path with the given extension (".edf", ".tsv", ...)
    pub fn file_path(&self, extension: &str) -> PathBuf {
        self.directory()
            .join(format!("{}_{}{}", self.basename(), self.suffix, extension))
    }

    /// Output location under `<root>/../derivatives/<pipeline>/sub-<id>/ses-<nn>/`
    pub fn derivative_path(&self, pipeline: &str, desc: &str, extension: &str) -> PathBuf {
        derivatives_root(&self.root, pipeline)
            .join(format!("sub-{}", self.subject))
            .join(format!("ses-{}", self.session))
            .join(format!(
                "{}_desc-{}_{}{}",
                self.basename(),
                desc,
                self.suffix,
                extension
            ))
    }
}

/// `<bids root>/../derivatives/<pipeline>`
pub fn derivatives_root(bids_root: &Path, pipeline: &str) -> PathBuf {
    bids_root
        .parent()
        .unwrap_or(bids_root)
        .join("derivatives")
        .join(pipeline)
}

/// Event entry for *_events.tsv
#[derive(Serialize)]
struct EventEntry<'a> {
    onset: String,
    duration: String,
    trial_type: &'a str,
    value: String,
}

/// Write annotations as a tab-separated events table
pub fn write_events_tsv(
    path: &Path,
    annotations: &[Annotation],
    event_ids: &EventIdMap,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    for annotation in annotations {
        let value = event_ids
            .get(&annotation.description)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        writer.serialize(EventEntry {
            onset: format!("{:.6}", annotation.onset),
            duration: format!("{:.6}", annotation.duration),
            trial_type: &annotation.description,
            value,
        })?;
    }
    writer.flush()?;

    log::info!("Wrote {} events to {:?}", annotations.len(), path);
    Ok(())
}
