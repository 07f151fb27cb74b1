// ⚖️ Reconciliation Engine - Match transactions against known fraud
// Left join of classified transactions with fraud records on
// (credit_card_number, ipv4).
//
// Every transaction comes out exactly once. The fraud side is deduplicated on
// the join key first (first occurrence wins), so duplicate fraud rows can
// never multiply a transaction.

use crate::records::{ClassifiedTransaction, FraudRecord, JoinKey, TransactionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub records: Vec<TransactionRecord>,
    /// Distinct fraud keys used for matching
    pub fraud_keys: usize,
    /// Fraud rows skipped because their key was already seen
    pub duplicate_fraud_keys: usize,
    pub fraudulent_count: usize,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn transaction_count(&self) -> usize {
        self.records.len()
    }

    pub fn fraudulent(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter(|r| r.is_fraudulent)
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} transactions, {} fraudulent, {} fraud keys ({} duplicates skipped)",
            self.transaction_count(),
            self.fraudulent_count,
            self.fraud_keys,
            self.duplicate_fraud_keys
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Reconcile transactions against the fraud list
    ///
    /// Example:
    /// ```
    /// use fraud_recon::{ClassifiedTransaction, FraudRecord, ReconciliationEngine};
    ///
    /// let fraud = vec![FraudRecord {
    ///     credit_card_number: 111,
    ///     ipv4: "1.2.3.4".to_string(),
    ///     state: Some("CA".to_string()),
    /// }];
    /// let transactions = vec![ClassifiedTransaction {
    ///     credit_card_number: 111,
    ///     ipv4: "1.2.3.4".to_string(),
    ///     state: "NY".to_string(),
    ///     vendor: "visa".to_string(),
    /// }];
    ///
    /// let report = ReconciliationEngine::new().reconcile(transactions, &fraud);
    /// assert!(report.records[0].is_fraudulent);
    /// assert_eq!(report.records[0].fraudulent_state.as_deref(), Some("CA"));
    /// ```
    pub fn reconcile(
        &self,
        transactions: Vec<ClassifiedTransaction>,
        fraud: &[FraudRecord],
    ) -> ReconciliationReport {
        let (index, duplicate_fraud_keys) = Self::index_fraud(fraud);
        if duplicate_fraud_keys > 0 {
            tracing::debug!(duplicate_fraud_keys, "skipped duplicate fraud keys");
        }

        let records: Vec<TransactionRecord> = transactions
            .into_iter()
            .map(|tx| {
                let matched = index.get(&tx.key()).copied();
                TransactionRecord {
                    is_fraudulent: matched.is_some(),
                    fraudulent_state: matched.and_then(|f| f.state.clone()),
                    credit_card_number: tx.credit_card_number,
                    ipv4: tx.ipv4,
                    state: tx.state,
                    vendor: tx.vendor,
                }
            })
            .collect();

        let fraudulent_count = records.iter().filter(|r| r.is_fraudulent).count();

        ReconciliationReport {
            records,
            fraud_keys: index.len(),
            duplicate_fraud_keys,
            fraudulent_count,
            reconciled_at: Utc::now(),
        }
    }

    /// Fraud records by join key, first occurrence wins.
    fn index_fraud(fraud: &[FraudRecord]) -> (HashMap<JoinKey<'_>, &FraudRecord>, usize) {
        let mut index = HashMap::with_capacity(fraud.len());
        let mut duplicates = 0;

        for record in fraud {
            if index.contains_key(&record.key()) {
                duplicates += 1;
            } else {
                index.insert(record.key(), record);
            }
        }

        (index, duplicates)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fraud(card: u64, ipv4: &str, state: Option<&str>) -> FraudRecord {
        FraudRecord {
            credit_card_number: card,
            ipv4: ipv4.to_string(),
            state: state.map(str::to_string),
        }
    }

    fn classified(card: u64, ipv4: &str) -> ClassifiedTransaction {
        ClassifiedTransaction {
            credit_card_number: card,
            ipv4: ipv4.to_string(),
            state: "TX".to_string(),
            vendor: "visa".to_string(),
        }
    }

    #[test]
    fn test_left_join_flags_matches() {
        let engine = ReconciliationEngine::new();
        let fraud_list = vec![fraud(111, "1.2.3.4", Some("CA"))];
        let transactions = vec![classified(111, "1.2.3.4"), classified(222, "5.6.7.8")];

        let report = engine.reconcile(transactions, &fraud_list);

        assert_eq!(report.transaction_count(), 2);
        assert_eq!(report.fraudulent_count, 1);

        assert_eq!(report.records[0].credit_card_number, 111);
        assert!(report.records[0].is_fraudulent);
        assert_eq!(report.records[0].fraudulent_state.as_deref(), Some("CA"));

        assert_eq!(report.records[1].credit_card_number, 222);
        assert!(!report.records[1].is_fraudulent);
        assert_eq!(report.records[1].fraudulent_state, None);
    }

    #[test]
    fn test_key_requires_both_card_and_address() {
        let engine = ReconciliationEngine::new();
        let fraud_list = vec![fraud(111, "1.2.3.4", Some("CA"))];
        let transactions = vec![classified(111, "9.9.9.9"), classified(999, "1.2.3.4")];

        let report = engine.reconcile(transactions, &fraud_list);
        assert_eq!(report.fraudulent_count, 0);
        assert!(report.records.iter().all(|r| !r.is_fraudulent));
    }

    #[test]
    fn test_null_fraud_region_stays_null() {
        let engine = ReconciliationEngine::new();
        let fraud_list = vec![fraud(111, "1.2.3.4", None)];

        let report = engine.reconcile(vec![classified(111, "1.2.3.4")], &fraud_list);
        assert!(report.records[0].is_fraudulent);
        assert_eq!(report.records[0].fraudulent_state, None);
        // Transaction's own state is untouched
        assert_eq!(report.records[0].state, "TX");
    }

    #[test]
    fn test_duplicate_fraud_keys_do_not_fan_out() {
        let engine = ReconciliationEngine::new();
        let fraud_list = vec![
            fraud(111, "1.2.3.4", Some("CA")),
            fraud(111, "1.2.3.4", Some("NV")),
            fraud(111, "1.2.3.4", None),
            fraud(222, "5.6.7.8", None),
        ];
        let transactions = vec![
            classified(111, "1.2.3.4"),
            classified(111, "1.2.3.4"),
            classified(333, "1.1.1.1"),
        ];

        let report = engine.reconcile(transactions, &fraud_list);

        assert_eq!(report.transaction_count(), 3);
        assert_eq!(report.fraud_keys, 2);
        assert_eq!(report.duplicate_fraud_keys, 2);
        assert_eq!(report.fraudulent().count(), 2);
        assert!(report
            .fraudulent()
            .all(|r| r.fraudulent_state.as_deref() == Some("CA")));
    }

    #[test]
    fn test_length_preserved_for_any_fraud_table() {
        let engine = ReconciliationEngine::new();
        let transactions: Vec<_> = (1..=20).map(|n| classified(n, "10.0.0.1")).collect();

        for fraud_size in [0u64, 1, 5, 40] {
            let fraud_list: Vec<_> = (0..fraud_size)
                .map(|n| fraud(n % 7 + 1, "10.0.0.1", Some("WA")))
                .collect();
            let report = engine.reconcile(transactions.clone(), &fraud_list);
            assert_eq!(report.transaction_count(), transactions.len());
        }
    }

    #[test]
    fn test_order_preserved() {
        let engine = ReconciliationEngine::new();
        let transactions = vec![classified(3, "1.1.1.1"), classified(1, "1.1.1.1"), classified(2, "1.1.1.1")];

        let report = engine.reconcile(transactions, &[fraud(1, "1.1.1.1", None)]);
        let cards: Vec<u64> = report.records.iter().map(|r| r.credit_card_number).collect();
        assert_eq!(cards, vec![3, 1, 2]);
        assert!(report.summary().contains("3 transactions, 1 fraudulent"));
    }
}
