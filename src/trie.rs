// 🌳 Vendor Prefix Trie - Card prefixes as a tree
// Maps variable-length digit prefixes (some with wildcard positions) to a vendor.
//
// Wildcard markers are stored as their own branch, keyed by the marker
// character. A digit never follows a wildcard branch; only the same marker
// character in the key does, so "56##" matches the key "56##" but not "5612".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// PREFIX SYMBOLS & PATTERNS
// ============================================================================

/// One position of a prefix pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrefixSymbol {
    /// Literal digit 0-9
    Digit(u8),
    /// Wildcard position, `#` or `%` in the prefix table
    Wildcard(char),
}

impl PrefixSymbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(PrefixSymbol::Digit(c as u8 - b'0')),
            '#' | '%' => Some(PrefixSymbol::Wildcard(c)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("prefix pattern is empty")]
    Empty,
    #[error("invalid character '{ch}' at position {position} in prefix pattern '{pattern}'")]
    InvalidChar {
        pattern: String,
        ch: char,
        position: usize,
    },
}

/// A parsed prefix pattern such as `"5018"` or `"222%"`.
///
/// Keeps the source text so the table can be written back out unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrefixPattern {
    source: String,
    symbols: Vec<PrefixSymbol>,
}

impl PrefixPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let symbols = pattern
            .chars()
            .enumerate()
            .map(|(position, ch)| {
                PrefixSymbol::from_char(ch).ok_or_else(|| PatternError::InvalidChar {
                    pattern: pattern.to_string(),
                    ch,
                    position,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PrefixPattern {
            source: pattern.to_string(),
            symbols,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn symbols(&self) -> &[PrefixSymbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.symbols
            .iter()
            .any(|s| matches!(s, PrefixSymbol::Wildcard(_)))
    }
}

impl FromStr for PrefixPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrefixPattern::parse(s)
    }
}

impl TryFrom<String> for PrefixPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PrefixPattern::parse(&value)
    }
}

impl From<PrefixPattern> for String {
    fn from(pattern: PrefixPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for PrefixPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// MATCH POLICY
// ============================================================================

/// How a lookup resolves a key that passes through several terminal nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Stop at the first terminal node on the path (shorter prefix shadows longer)
    #[default]
    FirstMatch,
    /// Keep walking and return the deepest terminal node on the path
    LongestMatch,
}

// ============================================================================
// TRIE
// ============================================================================

/// A node is terminal iff it carries a vendor.
#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    children: BTreeMap<PrefixSymbol, TrieNode>,
    vendor: Option<String>,
}

impl TrieNode {
    pub fn is_terminal(&self) -> bool {
        self.vendor.is_some()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn child(&self, symbol: PrefixSymbol) -> Option<&TrieNode> {
        self.children.get(&symbol)
    }

    pub fn children(&self) -> impl Iterator<Item = (&PrefixSymbol, &TrieNode)> {
        self.children.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    pub fn new() -> Self {
        Trie::default()
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Register `pattern` for `vendor`.
    ///
    /// Re-inserting an existing pattern overwrites its vendor (last write wins).
    pub fn insert(&mut self, pattern: &PrefixPattern, vendor: impl Into<String>) {
        let mut node = &mut self.root;
        for symbol in pattern.symbols() {
            node = node.children.entry(*symbol).or_default();
        }
        node.vendor = Some(vendor.into());
    }

    /// First-match lookup: returns the vendor of the first terminal node on the path.
    ///
    /// ```
    /// use fraud_recon::{PrefixPattern, Trie};
    ///
    /// let mut trie = Trie::new();
    /// trie.insert(&PrefixPattern::parse("4").unwrap(), "visa");
    /// assert_eq!(trie.lookup("4111"), Some("visa"));
    /// assert_eq!(trie.lookup("9999"), None);
    /// ```
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.child(Self::key_symbol(ch)?)?;
            if let Some(vendor) = node.vendor() {
                return Some(vendor);
            }
        }
        None
    }

    /// Longest-match lookup: returns the vendor of the deepest terminal node on the path.
    pub fn lookup_longest(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        let mut best = None;
        for ch in key.chars() {
            let Some(next) = Self::key_symbol(ch).and_then(|s| node.child(s)) else {
                break;
            };
            node = next;
            if let Some(vendor) = node.vendor() {
                best = Some(vendor);
            }
        }
        best
    }

    pub fn lookup_with(&self, key: &str, policy: MatchPolicy) -> Option<&str> {
        match policy {
            MatchPolicy::FirstMatch => self.lookup(key),
            MatchPolicy::LongestMatch => self.lookup_longest(key),
        }
    }

    /// Number of terminal nodes (distinct registered patterns)
    pub fn len(&self) -> usize {
        fn count(node: &TrieNode) -> usize {
            usize::from(node.is_terminal()) + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Key characters match branch labels literally, wildcard markers included.
    fn key_symbol(ch: char) -> Option<PrefixSymbol> {
        PrefixSymbol::from_char(ch)
    }
}

// ============================================================================
// TESTS
// ============================================================================
