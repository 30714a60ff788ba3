//! Semantics study file layout
//!
//! Epoch files live in one flat folder, one file per subject and condition:
//! `<nn>s..SnMa.set` (match) and `<nn>s..SnMi.set` (mismatch).

use crate::types::{DecoderError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Event id given to every bad-segment marker when conditions are merged
pub const BAD_EVENT_ID: i64 = 999;

/// Marker label of bad segments in the Semantics epochs
pub const BAD_EVENT_LABEL: &str = "BAD+";

/// Condition of a Semantics epoch file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Match,
    Mismatch,
}

impl Condition {
    /// Event id the merged epochs use for this condition
    pub fn event_id(&self) -> i64 {
        match self {
            Condition::Match => 100,
            Condition::Mismatch => 200,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Match => "match",
            Condition::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Condition from an epoch file's stem suffix
pub fn condition_from_filename(path: &Path) -> Result<Condition> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if stem.ends_with("SnMa") {
        Ok(Condition::Match)
    } else if stem.ends_with("SnMi") {
        Ok(Condition::Mismatch)
    } else {
        Err(DecoderError::InvalidData(format!(
            "Could not determine condition from filename: {:?}",
            path
        )))
    }
}

/// Event id of an epoch label once a file's stimulus labels are merged
///
/// Bad-segment labels collapse to one id; every other label takes the
/// file's condition id.
pub fn merged_event_id(label: &str, condition: Condition) -> i64 {
    if label.contains(BAD_EVENT_LABEL) {
        BAD_EVENT_ID
    } else {
        condition.event_id()
    }
}

/// Match and mismatch files of one subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectFiles {
    pub matched: Option<PathBuf>,
    pub mismatched: Option<PathBuf>,
}

impl SubjectFiles {
    pub fn get(&self, condition: Condition) -> Option<&Path> {
        match condition {
            Condition::Match => self.matched.as_deref(),
            Condition::Mismatch => self.mismatched.as_deref(),
        }
    }
}

/// `sub-<nn>` key from a file name: the part before the first `s`, padded to 2
pub fn subject_key(file_name: &str) -> String {
    let number = file_name.split('s').next().unwrap_or_default();
    format!("sub-{:0>2}", number)
}

/// Group the `*.set` files of a directory by subject
pub fn group_subject_files(dir: &Path) -> Result<BTreeMap<String, SubjectFiles>> {
    crate::paths::check_directory(dir)?;

    let mut subjects: BTreeMap<String, SubjectFiles> = BTreeMap::new();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    files.sort();

    for path in files {
        let is_set = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("set"))
            .unwrap_or(false);
        if !is_set {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let key = subject_key(name);
        if name.contains("SnMa") {
            subjects.entry(key).or_default().matched = Some(path.clone());
        } else if name.contains("SnMi") {
            subjects.entry(key).or_default().mismatched = Some(path.clone());
        } else {
            log::debug!("Ignoring {:?}: no condition marker", path);
        }
    }

    log::info!("Found {} Semantics subjects in {:?}", subjects.len(), dir);
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_from_filename() {
        assert_eq!(
            condition_from_filename(Path::new("/x/3sem_SnMa.set")).unwrap(),
            Condition::Match
        );
        assert_eq!(
            condition_from_filename(Path::new("3sem_SnMi.set")).unwrap(),
            Condition::Mismatch
        );
        assert!(condition_from_filename(Path::new("3sem.set")).is_err());
        assert_eq!(Condition::Mismatch.event_id(), 200);
    }

    #[test]
    fn test_merged_event_id() {
        assert_eq!(merged_event_id("BAD+/img", Condition::Match), 999);
        assert_eq!(merged_event_id("img+/cel1", Condition::Match), 100);
        assert_eq!(merged_event_id("snd+", Condition::Mismatch), 200);
    }

    #[test]
    fn test_subject_key() {
        assert_eq!(subject_key("3sem_SnMa.set"), "sub-03");
        assert_eq!(subject_key("3027sem_SnMi.set"), "sub-3027");
    }

    #[test]
    fn test_group_subject_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "3sem_SnMa.set",
            "3sem_SnMi.set",
            "12sem_SnMa.set",
            "12sem_SnMa.fdt",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let subjects = group_subject_files(dir.path()).unwrap();
        assert_eq!(subjects.len(), 2);
        let three = &subjects["sub-03"];
        assert!(three.get(Condition::Match).is_some());
        assert!(three.get(Condition::Mismatch).is_some());
        let twelve = &subjects["sub-12"];
        assert!(twelve.matched.is_some());
        assert!(twelve.mismatched.is_none());
    }
}
