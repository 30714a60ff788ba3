//! Lab server path configuration
//!
//! Paths on the shared lab filesystem are resolved once from a `LabPaths` value
//! and passed explicitly to whatever needs them.

use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mount point of the lab share on macOS workstations
pub const MACOS_SERVER_ROOT: &str = "/Volumes/neurology_share";

/// Locations of the study folders on the lab server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabPaths {
    /// Mount point of the lab share
    pub server_root: PathBuf,
    /// Listen participant folders, relative to the server root
    #[serde(default = "default_listen_subdir")]
    pub listen_subdir: PathBuf,
    /// Semantics data, relative to the server root
    #[serde(default = "default_semantics_subdir")]
    pub semantics_subdir: PathBuf,
}

fn default_listen_subdir() -> PathBuf {
    PathBuf::from("LISTEN").join("Participant Files")
}

fn default_semantics_subdir() -> PathBuf {
    PathBuf::from("charlotte_semantics_data")
}

impl LabPaths {
    /// Paths under an explicit server root
    pub fn new(server_root: impl Into<PathBuf>) -> Self {
        Self {
            server_root: server_root.into(),
            listen_subdir: default_listen_subdir(),
            semantics_subdir: default_semantics_subdir(),
        }
    }

    /// Paths for the current platform's known mount point
    pub fn for_platform() -> Result<Self> {
        Self::for_os(std::env::consts::OS)
    }

    fn for_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Self::new(MACOS_SERVER_ROOT)),
            other => Err(DecoderError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Fail unless the server root is reachable
    pub fn ensure_mounted(&self) -> Result<()> {
        if self.server_root.exists() {
            Ok(())
        } else {
            Err(DecoderError::ServerNotMounted(self.server_root.clone()))
        }
    }

    /// Listen participant folders
    pub fn listen_dir(&self) -> PathBuf {
        self.server_root.join(&self.listen_subdir)
    }

    /// Listen derived data (`data/` next to the participant folders)
    pub fn listen_data_dir(&self) -> PathBuf {
        parent_or_self(&self.listen_dir()).join("data")
    }

    /// BIDS root for Listen exports
    pub fn bids_root(&self) -> PathBuf {
        self.listen_data_dir().join("bids")
    }

    /// Recording manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.listen_data_dir().join("eeg_list.csv")
    }

    /// Semantics study folder
    pub fn semantics_dir(&self) -> PathBuf {
        self.server_root.join(&self.semantics_subdir)
    }

    /// Semantics epoch files (`*.set`)
    pub fn semantics_epochs_dir(&self) -> PathBuf {
        self.semantics_dir().join("sem_esrp")
    }
}

fn parent_or_self(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

/// Check that a directory exists and return it
pub fn check_directory(directory: &Path) -> Result<&Path> {
    if directory.is_dir() {
        Ok(directory)
    } else {
        Err(DecoderError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory {:?} does not exist", directory),
        )))
    }
}
