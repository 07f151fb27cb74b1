// Fraud Reconciliation - Core Library
// Exposes the classifier, validator and reconciliation pipeline for the CLI and tests

pub mod trie;           // Vendor prefix trie
pub mod rules;          // Vendor prefix table (rules as data)
pub mod records;        // Raw and typed records
pub mod schema;         // Shape layer - batch schema validation
pub mod classifier;     // Card number → vendor
pub mod reconciliation; // Left join against the fraud list
pub mod aggregation;    // Group-by counts
pub mod config;         // Pipeline configuration
pub mod parser;         // CSV and zip ingestion
pub mod pipeline;       // End-to-end run

// Re-export commonly used types
pub use trie::{MatchPolicy, PatternError, PrefixPattern, PrefixSymbol, Trie, TrieNode};
pub use rules::{VendorPrefixTable, VendorRule};
pub use records::{
    ClassifiedTransaction, FraudRecord, JoinKey, RawFraudRecord, RawTransaction,
    Transaction, TransactionRecord,
};
pub use schema::{
    check_card_number, check_ipv4, check_region, check_vendor,
    Ipv4Policy, SchemaValidator, Validated, ValidationError, ValidationFailure,
};
pub use classifier::{Classification, Classifier, DEFAULT_PREFIX_WINDOW};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport};
pub use aggregation::{
    fraud_counts, group_count, AggregationResult, Column, GroupCount, UnknownColumn,
};
pub use config::{ConfigError, PipelineConfig};
pub use parser::{
    load_data_dir, load_fraud, load_fraud_archive, load_fraud_csv, load_transactions,
    load_transactions_archive, load_transactions_csv, parse_archive, CsvParser, FraudParser,
    TransactionParser,
};
pub use pipeline::{FraudPipeline, PipelineError, PipelineOutput, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
