//! Vendor montage name resolution
//!
//! Recordings declare their sensor net by the vendor's name. Downstream tooling
//! wants the standard layout name instead.

use crate::types::{DecoderError, Result};
use std::collections::BTreeMap;

/// Built-in vendor → standard layout names
const BUILTIN: &[(&str, &str)] = &[("HydroCel GSN 128 1.0", "GSN-HydroCel-129")];

/// Maps vendor montage names to standard layout names
#[derive(Debug, Clone)]
pub struct MontageResolver {
    names: BTreeMap<String, String>,
}

impl MontageResolver {
    /// Resolver with the built-in table
    pub fn new() -> Self {
        Self {
            names: BUILTIN
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Add or override an entry
    pub fn insert(&mut self, vendor: impl Into<String>, standard: impl Into<String>) {
        self.names.insert(vendor.into(), standard.into());
    }

    /// Extend with extra entries
    pub fn with_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in entries {
            self.insert(k, v);
        }
        self
    }

    pub fn resolve(&self, vendor: &str) -> Result<&str> {
        self.names
            .get(vendor.trim())
            .map(String::as_str)
            .ok_or_else(|| DecoderError::UnknownMontage(vendor.to_string()))
    }
}

impl Default for MontageResolver {
    fn default() -> Self {
        Self::new()
    }
}
