// 🏷️ Vendor Prefix Rules - Rules as Data
// Card-issuing vendors and the card-number prefixes that identify them

use crate::trie::{PatternError, PrefixPattern, Trie};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// ============================================================================
// VENDOR ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRule {
    /// Vendor label attached to classified transactions (e.g. "visa")
    pub vendor: String,

    /// Prefix patterns, digits plus `#`/`%` wildcards
    pub prefixes: Vec<PrefixPattern>,
}

impl VendorRule {
    pub fn new(vendor: impl Into<String>, prefixes: &[&str]) -> Result<Self, PatternError> {
        Ok(VendorRule {
            vendor: vendor.into(),
            prefixes: prefixes
                .iter()
                .map(|p| PrefixPattern::parse(p))
                .collect::<Result<_, _>>()?,
        })
    }
}

// ============================================================================
// VENDOR PREFIX TABLE
// ============================================================================

/// Ordered vendor → prefixes table. Immutable once built.
///
/// Serialized as a JSON array so the insertion order survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorPrefixTable {
    rules: Vec<VendorRule>,
}

const STANDARD_PREFIXES: &[(&str, &[&str])] = &[
    ("maestro", &["5018", "5020", "5038", "56##"]),
    ("mastercard", &["51", "52", "54", "55", "222%"]),
    ("visa", &["4"]),
    ("amex", &["34", "37"]),
    ("discover", &["6011", "65"]),
    ("diners", &["300", "301", "304", "305", "36", "38"]),
    ("jcb16", &["35"]),
    ("jcb15", &["2131", "1800"]),
];

impl VendorPrefixTable {
    pub fn from_rules(rules: Vec<VendorRule>) -> Self {
        VendorPrefixTable { rules }
    }

    /// The built-in table of known card vendors.
    pub fn standard() -> Self {
        let rules = STANDARD_PREFIXES
            .iter()
            .map(|(vendor, prefixes)| VendorRule {
                vendor: vendor.to_string(),
                prefixes: prefixes
                    .iter()
                    .filter_map(|p| match PrefixPattern::parse(p) {
                        Ok(pattern) => Some(pattern),
                        Err(err) => {
                            tracing::error!(vendor = *vendor, %err, "dropping built-in prefix");
                            None
                        }
                    })
                    .collect(),
            })
            .collect();
        VendorPrefixTable { rules }
    }

    /// Load a table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read vendor prefix file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse vendor prefix JSON")
    }

    pub fn rules(&self) -> &[VendorRule] {
        &self.rules
    }

    /// Vendor names in table order
    pub fn vendors(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.vendor.as_str())
    }

    pub fn contains_vendor(&self, vendor: &str) -> bool {
        self.rules.iter().any(|r| r.vendor == vendor)
    }

    /// Every (vendor, pattern) pair in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrefixPattern)> {
        self.rules
            .iter()
            .flat_map(|r| r.prefixes.iter().map(move |p| (r.vendor.as_str(), p)))
    }

    pub fn pattern_count(&self) -> usize {
        self.rules.iter().map(|r| r.prefixes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count() == 0
    }

    /// Longest pattern length; a classifier window shorter than this can never
    /// reach the longer patterns.
    pub fn max_prefix_len(&self) -> usize {
        self.iter().map(|(_, p)| p.len()).max().unwrap_or(0)
    }

    /// Build a trie with every pattern inserted in table order.
    pub fn build_trie(&self) -> Trie {
        let mut trie = Trie::new();
        for (vendor, pattern) in self.iter() {
            trie.insert(pattern, vendor);
        }
        trie
    }

    /// Structural problems: empty vendor names, duplicate vendors, vendors without prefixes.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        if self.rules.is_empty() {
            problems.push("vendor prefix table is empty".to_string());
        }

        for rule in &self.rules {
            if rule.vendor.trim().is_empty() {
                problems.push("vendor name must not be empty".to_string());
            } else if !seen.insert(rule.vendor.as_str()) {
                problems.push(format!("vendor '{}' is listed more than once", rule.vendor));
            }
            if rule.prefixes.is_empty() {
                problems.push(format!("vendor '{}' has no prefixes", rule.vendor));
            }
        }

        problems
    }
}

impl Default for VendorPrefixTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// TESTS
// ============================================================================
