//! Recording manifest (`eeg_list.csv`)
//!
//! The manifest lists every recording found on the lab share together with the
//! subject, session and task inferred from its path. Batch jobs iterate over it.

use crate::types::{DecoderError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Experimental task of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Resting,
    Semantics,
    Phonemes,
    #[serde(rename = "auditoryoddball")]
    AuditoryOddball,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Resting => "resting",
            Task::Semantics => "semantics",
            Task::Phonemes => "phonemes",
            Task::AuditoryOddball => "auditoryoddball",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Task {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "resting" => Ok(Task::Resting),
            "semantics" => Ok(Task::Semantics),
            "phonemes" => Ok(Task::Phonemes),
            "auditoryoddball" => Ok(Task::AuditoryOddball),
            other => Err(DecoderError::InvalidData(format!("unknown task '{}'", other))),
        }
    }
}

/// One manifest row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub sourcefile: PathBuf,
    pub subject: String,
    pub session: String,
    /// Empty when the task could not be inferred
    #[serde(default)]
    pub task: Option<Task>,
    /// Optional explicit output location
    #[serde(default)]
    pub destfile: Option<PathBuf>,
}

impl ManifestRow {
    /// Session zero-padded to two digits
    pub fn session_label(&self) -> String {
        pad_session(&self.session)
    }
}

/// Zero-pad a session id to two digits ("2" → "02")
pub fn pad_session(session: &str) -> String {
    let trimmed = session.trim();
    format!("{:0>2}", trimmed)
}

fn subject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"20\d{2}").expect("subject pattern is valid"))
}

/// Participant number (first `20xx` in the path)
pub fn subject_from_path(path: &Path) -> Option<String> {
    subject_pattern()
        .find(&path.to_string_lossy())
        .map(|m| m.as_str().to_string())
}

/// Task inferred from the recording path, tolerant of known filename typos
pub fn task_from_path(path: &Path) -> Option<Task> {
    let name = path.to_string_lossy().to_lowercase();
    if name.contains("resting") {
        Some(Task::Resting)
    } else if ["semantics", "sematics", "sematincs"]
        .iter()
        .any(|t| name.contains(t))
    {
        Some(Task::Semantics)
    } else if name.contains("phonemes") {
        Some(Task::Phonemes)
    } else if name.contains("auditoryoddbal") {
        Some(Task::AuditoryOddball)
    } else {
        None
    }
}

/// Session inferred from the recording path
pub fn session_from_path(path: &Path, subject: &str) -> String {
    let name = path.to_string_lossy().to_lowercase();
    let second_day = name.contains("day 2")
        || name.contains("_2_")
        // Participant 2023's second visit is only identifiable by its date
        || (subject == "2023" && name.contains("20231115"));
    let session = if second_day { "02" } else { "01" };
    session.to_string()
}

/// Find `.mff` recordings below `root` and classify them
pub fn generate_manifest(root: &Path) -> Result<Vec<ManifestRow>> {
    log::info!("Scanning for recordings under {:?}", root);
    crate::paths::check_directory(root)?;

    let mut rows = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "__MACOSX");

    for entry in walker {
        let entry = entry.map_err(|e| DecoderError::Manifest(e.to_string()))?;
        let path = entry.path();
        let is_mff = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mff"))
            .unwrap_or(false);
        if !is_mff {
            continue;
        }

        // Participant number from below the scan root, else from the nearest
        // enclosing folder of the root
        let relative = path.strip_prefix(root).unwrap_or(path);
        let subject = subject_from_path(relative).or_else(|| {
            root.ancestors()
                .filter_map(|dir| dir.file_name())
                .find_map(|name| subject_from_path(Path::new(name)))
        });
        let Some(subject) = subject else {
            log::warn!("No participant number in {:?}, skipping", path);
            continue;
        };
        let task = task_from_path(path);
        if task.is_none() {
            log::warn!("Could not determine task for {:?}", path);
        }
        let session = session_from_path(path, &subject);

        rows.push(ManifestRow {
            sourcefile: path.to_path_buf(),
            subject,
            session,
            task,
            destfile: None,
        });
    }

    rows.sort_by(|a, b| {
        (&a.subject, &a.session, task_sort_key(a.task))
            .cmp(&(&b.subject, &b.session, task_sort_key(b.task)))
    });
    log::info!("Found {} recordings", rows.len());
    Ok(rows)
}

/// Task names sort alphabetically; rows without a task come last
fn task_sort_key(task: Option<Task>) -> (bool, &'static str) {
    match task {
        Some(task) => (false, task.as_str()),
        None => (true, ""),
    }
}

/// Read a manifest CSV
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    log::debug!("Reading manifest: {:?}", path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<ManifestRow>().enumerate() {
        let row: ManifestRow = record.map_err(|e| {
            DecoderError::Manifest(format!("{:?} row {}: {}", path, i + 1, e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write a manifest CSV
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} manifest rows to {:?}", rows.len(), path);
    Ok(())
}
