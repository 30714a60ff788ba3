//! Configuration loading and parsing

use anyhow::{Context, Result};
use eeg_event_decoder::types::parse_cell;
use eeg_event_decoder::{AnnotationConfig, ConditionMap, EventIdMap, LabPaths, MontageResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub annotations: AnnotationsConfig,
    /// Extra vendor → standard montage names
    #[serde(default)]
    pub montages: BTreeMap<String, String>,
    #[serde(default)]
    pub bids: BidsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Lab share mount point; platform default when unset
    pub server_root: Option<PathBuf>,
    pub listen_subdir: Option<PathBuf>,
    pub semantics_subdir: Option<PathBuf>,
    /// Overrides for derived locations
    pub bids_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnotationsConfig {
    /// Raw code → stimulus type
    #[serde(default)]
    pub event_codes: BTreeMap<String, String>,
    /// Condition cell id → label; TOML keys are strings
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
    #[serde(default = "default_source_offset")]
    pub source_offset: String,
    pub legend_track: Option<String>,
}

fn default_source_offset() -> String {
    eeg_event_decoder::config::DEFAULT_SOURCE_OFFSET.to_string()
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            event_codes: BTreeMap::new(),
            conditions: BTreeMap::new(),
            source_offset: default_source_offset(),
            legend_track: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BidsConfig {
    /// Trial type → event id for events.tsv; Listen table when empty
    #[serde(default)]
    pub event_ids: BTreeMap<String, i64>,
    #[serde(default)]
    pub overwrite: bool,
}

impl AppConfig {
    /// Resolve lab paths once, from config or the platform default
    pub fn lab_paths(&self) -> Result<LabPaths> {
        let mut paths = match &self.paths.server_root {
            Some(root) => LabPaths::new(root),
            None => LabPaths::for_platform()
                .context("No [paths] server_root configured")?,
        };
        if let Some(sub) = &self.paths.listen_subdir {
            paths.listen_subdir = sub.clone();
        }
        if let Some(sub) = &self.paths.semantics_subdir {
            paths.semantics_subdir = sub.clone();
        }
        Ok(paths)
    }

    pub fn bids_root(&self, paths: &LabPaths) -> PathBuf {
        self.paths
            .bids_root
            .clone()
            .unwrap_or_else(|| paths.bids_root())
    }

    pub fn manifest_path(&self, paths: &LabPaths) -> PathBuf {
        self.paths
            .manifest
            .clone()
            .unwrap_or_else(|| paths.manifest_path())
    }

    /// Annotation settings; condition keys are normalized to integers here
    pub fn annotation_config(&self) -> Result<AnnotationConfig> {
        let section = &self.annotations;
        let mut config = AnnotationConfig::new().with_source_offset(section.source_offset.clone());
        config.offset().context("Invalid [annotations] source_offset")?;

        if !section.event_codes.is_empty() {
            config.event_codes = Some(section.event_codes.clone());
        }
        if !section.conditions.is_empty() {
            config.conditions = Some(parse_conditions(
                section.conditions.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )?);
        }
        if let Some(track) = &section.legend_track {
            config = config.with_legend_track(track.clone());
        }
        Ok(config)
    }

    pub fn montage_resolver(&self) -> MontageResolver {
        MontageResolver::new().with_entries(self.montages.clone())
    }

    pub fn event_ids(&self) -> EventIdMap {
        if self.bids.event_ids.is_empty() {
            eeg_event_decoder::listen_event_ids()
        } else {
            self.bids.event_ids.clone()
        }
    }
}

/// Build a condition map from string pairs ("1" → "match")
pub fn parse_conditions<'a, I>(pairs: I) -> Result<ConditionMap>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut map = ConditionMap::new();
    for (key, label) in pairs {
        let cell = parse_cell(key)
            .with_context(|| format!("Condition key '{}' is not an integer cell id", key))?;
        map.insert(cell, label.to_string());
    }
    Ok(map)
}

/// Parse "1=match,2=mismatch"
pub fn parse_condition_list(raw: &str) -> Result<ConditionMap> {
    let pairs = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .with_context(|| format!("Expected CELL=LABEL, got '{}'", pair))
        })
        .collect::<Result<Vec<_>>>()?;
    parse_conditions(pairs)
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
