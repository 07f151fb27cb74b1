// 📄 Records - raw input rows and the typed records built from them
//
// Lifecycle:
//   RawTransaction → Transaction (validated) → ClassifiedTransaction (vendor)
//   → TransactionRecord (fraud flag + fraud region, final)
//   RawFraudRecord → FraudRecord (validated)

use serde::{Deserialize, Serialize};

// ============================================================================
// RAW INPUT (as read from the source files, untyped)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFraudRecord {
    pub credit_card_number: String,
    pub ipv4: String,
    /// Absent when the source row omitted the trailing column
    #[serde(default)]
    pub state: Option<String>,
    /// 1-based line in the source file (0 when not read from a file)
    #[serde(default)]
    pub line: usize,
}

impl RawFraudRecord {
    pub fn new(credit_card_number: impl Into<String>, ipv4: impl Into<String>, state: Option<&str>) -> Self {
        RawFraudRecord {
            credit_card_number: credit_card_number.into(),
            ipv4: ipv4.into(),
            state: state.map(str::to_string),
            line: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub credit_card_number: String,
    pub ipv4: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub line: usize,
}

impl RawTransaction {
    pub fn new(credit_card_number: impl Into<String>, ipv4: impl Into<String>, state: Option<&str>) -> Self {
        RawTransaction {
            credit_card_number: credit_card_number.into(),
            ipv4: ipv4.into(),
            state: state.map(str::to_string),
            line: 0,
        }
    }
}

// ============================================================================
// VALIDATED RECORDS
// ============================================================================

/// A known-fraud entry. Read-only once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudRecord {
    pub credit_card_number: u64,
    pub ipv4: String,
    pub state: Option<String>,
}

impl FraudRecord {
    pub fn key(&self) -> JoinKey<'_> {
        JoinKey {
            credit_card_number: self.credit_card_number,
            ipv4: &self.ipv4,
        }
    }
}

/// A validated transaction, not yet classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub credit_card_number: u64,
    pub ipv4: String,
    pub state: String,
}

impl Transaction {
    pub fn new(credit_card_number: u64, ipv4: impl Into<String>, state: impl Into<String>) -> Self {
        Transaction {
            credit_card_number,
            ipv4: ipv4.into(),
            state: state.into(),
        }
    }
}

/// A transaction with a vendor attached by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub credit_card_number: u64,
    pub ipv4: String,
    pub state: String,
    pub vendor: String,
}

impl ClassifiedTransaction {
    pub fn key(&self) -> JoinKey<'_> {
        JoinKey {
            credit_card_number: self.credit_card_number,
            ipv4: &self.ipv4,
        }
    }
}

/// Final reconciled transaction. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub credit_card_number: u64,
    pub ipv4: String,
    pub state: String,
    pub vendor: String,
    pub is_fraudulent: bool,
    /// Region reported by the matching fraud record, if any
    pub fraudulent_state: Option<String>,
}

// ============================================================================
// JOIN KEY
// ============================================================================

/// Composite (card number, network address) key used by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinKey<'a> {
    pub credit_card_number: u64,
    pub ipv4: &'a str,
}
