// 🔁 Fraud Pipeline - validate → classify → reconcile → validate
// Builds the vendor table and trie once and runs whole batches through them.

use crate::aggregation::{fraud_counts, group_count, AggregationResult, Column};
use crate::classifier::Classifier;
use crate::config::{ConfigError, PipelineConfig};
use crate::reconciliation::ReconciliationEngine;
use crate::records::{RawFraudRecord, RawTransaction, TransactionRecord};
use crate::rules::VendorPrefixTable;
use crate::schema::{SchemaValidator, ValidationError, ValidationFailure};
use crate::trie::Trie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub fraud_records: usize,
    pub duplicate_fraud_keys: usize,
    pub input_transactions: usize,
    /// Dropped because no vendor prefix matched
    pub unmatched_transactions: usize,
    pub reconciled_transactions: usize,
    pub fraudulent_transactions: usize,
    /// Violations kept as warnings by the IPv4 policy
    pub warnings: Vec<ValidationError>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} transactions in, {} unmatched, {} reconciled, {} fraudulent ({} fraud records, {} duplicate keys, {} warnings)",
            self.input_transactions,
            self.unmatched_transactions,
            self.reconciled_transactions,
            self.fraudulent_transactions,
            self.fraud_records,
            self.duplicate_fraud_keys,
            self.warnings.len()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub records: Vec<TransactionRecord>,
    pub report: RunReport,
}

impl PipelineOutput {
    pub fn group_count(&self, column: Column) -> AggregationResult {
        group_count(&self.records, column)
    }

    pub fn fraud_counts(&self, column: Column) -> AggregationResult {
        fraud_counts(&self.records, column)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct FraudPipeline {
    config: PipelineConfig,
    table: VendorPrefixTable,
    trie: Trie,
}

impl FraudPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let table = config.prefix_table();
        let trie = table.build_trie();

        Ok(FraudPipeline { config, table, trie })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn table(&self) -> &VendorPrefixTable {
        &self.table
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(&self.trie)
            .with_prefix_window(self.config.prefix_window)
            .with_policy(self.config.match_policy)
    }

    /// Run one batch. Transaction batches are classified in order and
    /// concatenated. Any validation error in any input fails the whole run,
    /// reporting every violation found.
    pub fn run(
        &self,
        fraud: &[RawFraudRecord],
        transaction_batches: &[Vec<RawTransaction>],
    ) -> Result<PipelineOutput, PipelineError> {
        let validator = SchemaValidator::new(&self.table, self.config.ipv4_policy);

        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        let fraud_records = match validator.validate_fraud_records("fraud", fraud) {
            Ok(validated) => {
                warnings.extend(validated.warnings);
                validated.records
            }
            Err(failure) => {
                failures.push(failure);
                Vec::new()
            }
        };

        let mut transactions = Vec::new();
        for (batch, raw) in transaction_batches.iter().enumerate() {
            let context = format!("transactions#{}", batch + 1);
            match validator.validate_transactions(&context, raw) {
                Ok(validated) => {
                    warnings.extend(validated.warnings);
                    transactions.extend(validated.records);
                }
                Err(failure) => failures.push(failure),
            }
        }

        if let Some(failure) = ValidationFailure::merge(failures) {
            tracing::error!(errors = failure.errors.len(), "input validation failed");
            return Err(failure.into());
        }

        let input_transactions = transactions.len();
        let classification = self.classifier().classify(transactions);
        info!(
            classified = classification.classified.len(),
            unmatched = classification.unmatched,
            "classified transactions"
        );

        let reconciliation = ReconciliationEngine::new().reconcile(classification.classified, &fraud_records);
        info!("{}", reconciliation.summary());

        validator.validate_reconciled("reconciled", &reconciliation.records)?;

        let report = RunReport {
            fraud_records: fraud_records.len(),
            duplicate_fraud_keys: reconciliation.duplicate_fraud_keys,
            input_transactions,
            unmatched_transactions: classification.unmatched,
            reconciled_transactions: reconciliation.records.len(),
            fraudulent_transactions: reconciliation.fraudulent_count,
            warnings,
            completed_at: Utc::now(),
        };

        Ok(PipelineOutput {
            records: reconciliation.records,
            report,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
