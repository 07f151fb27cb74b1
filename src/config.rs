// ⚙️ Pipeline Configuration
// Loaded from JSON; every field has a default so an empty object is valid.

use crate::classifier::DEFAULT_PREFIX_WINDOW;
use crate::rules::VendorPrefixTable;
use crate::schema::Ipv4Policy;
use crate::trie::MatchPolicy;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("prefix_window must be at least 1, got {0}")]
    PrefixWindow(usize),
    #[error("vendor prefix table: {0}")]
    VendorTable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Leading card-number digits passed to the trie
    pub prefix_window: usize,

    /// First-match (shorter prefixes shadow longer ones) or longest-match
    pub match_policy: MatchPolicy,

    /// Reject or warn on records with an invalid IPv4 address
    pub ipv4_policy: Ipv4Policy,

    /// Replaces the built-in vendor table when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_prefixes: Option<VendorPrefixTable>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            prefix_window: DEFAULT_PREFIX_WINDOW,
            match_policy: MatchPolicy::FirstMatch,
            ipv4_policy: Ipv4Policy::Reject,
            vendor_prefixes: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// The configured vendor table, or the built-in one.
    pub fn prefix_table(&self) -> VendorPrefixTable {
        self.vendor_prefixes
            .clone()
            .unwrap_or_else(VendorPrefixTable::standard)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix_window == 0 {
            return Err(ConfigError::PrefixWindow(self.prefix_window));
        }

        if let Some(table) = &self.vendor_prefixes {
            let problems = table.problems();
            if !problems.is_empty() {
                return Err(ConfigError::VendorTable(problems.join("; ")));
            }
        }

        let max_len = self.prefix_table().max_prefix_len();
        if self.prefix_window < max_len {
            tracing::warn!(
                prefix_window = self.prefix_window,
                max_prefix_len = max_len,
                "prefix window is shorter than the longest vendor prefix"
            );
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
