// 📊 Aggregation - group reconciled transactions by a column and count
// Output is sorted by count, descending. Equal counts keep the order in which
// their keys were first seen.

use crate::records::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    CreditCardNumber,
    Ipv4,
    State,
    Vendor,
    IsFraudulent,
    FraudulentState,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::CreditCardNumber,
        Column::Ipv4,
        Column::State,
        Column::Vendor,
        Column::IsFraudulent,
        Column::FraudulentState,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::CreditCardNumber => "credit_card_number",
            Column::Ipv4 => "ipv4",
            Column::State => "state",
            Column::Vendor => "vendor",
            Column::IsFraudulent => "is_fraudulent",
            Column::FraudulentState => "fraudulent_state",
        }
    }

    /// The record's value in this column; `None` for a null fraud region.
    pub fn value(&self, record: &TransactionRecord) -> Option<String> {
        match self {
            Column::CreditCardNumber => Some(record.credit_card_number.to_string()),
            Column::Ipv4 => Some(record.ipv4.clone()),
            Column::State => Some(record.state.clone()),
            Column::Vendor => Some(record.vendor.clone()),
            Column::IsFraudulent => Some(record.is_fraudulent.to_string()),
            Column::FraudulentState => record.fraudulent_state.clone(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column '{0}' (expected one of: credit_card_number, ipv4, state, vendor, is_fraudulent, fraudulent_state)")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

// ============================================================================
// AGGREGATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// `None` groups the records whose value is null
    pub key: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub column: Column,
    pub rows: Vec<GroupCount>,
}

impl AggregationResult {
    /// Sum of all counts; equals the number of aggregated records.
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn count_for(&self, key: Option<&str>) -> Option<usize> {
        self.rows
            .iter()
            .find(|r| r.key.as_deref() == key)
            .map(|r| r.count)
    }

    pub fn pairs(&self) -> Vec<(Option<&str>, usize)> {
        self.rows.iter().map(|r| (r.key.as_deref(), r.count)).collect()
    }
}

// ============================================================================
// GROUP COUNT
// ============================================================================

pub fn group_count<'a, I>(records: I, column: Column) -> AggregationResult
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut positions: HashMap<Option<String>, usize> = HashMap::new();
    let mut rows: Vec<GroupCount> = Vec::new();

    for record in records {
        let key = column.value(record);
        match positions.get(&key) {
            Some(&pos) => rows[pos].count += 1,
            None => {
                positions.insert(key.clone(), rows.len());
                rows.push(GroupCount { key, count: 1 });
            }
        }
    }

    // Stable: ties stay in first-seen order
    rows.sort_by(|a, b| b.count.cmp(&a.count));

    AggregationResult { column, rows }
}

/// Group count over fraudulent records only.
pub fn fraud_counts(records: &[TransactionRecord], column: Column) -> AggregationResult {
    group_count(records.iter().filter(|r| r.is_fraudulent), column)
}

// ============================================================================
// TESTS
// ============================================================================
