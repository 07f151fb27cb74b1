// 📐 Shape Layer - Schema Validation
// Validates fraud, transaction and reconciled records before they move on.
//
// Every check is a pure predicate. The validator runs all of them over the
// whole batch and returns every violation at once instead of stopping at the
// first bad row.

use crate::records::{FraudRecord, RawFraudRecord, RawTransaction, Transaction, TransactionRecord};
use crate::rules::VendorPrefixTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Which input the record came from (e.g. "fraud", "transactions#2")
    pub context: String,
    /// 0-based position of the record within its input
    pub record: usize,
    /// 1-based source line, 0 when unknown
    pub line: usize,
    pub field: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "[{} #{} line {}] {}: {}",
                self.context, self.record, self.line, self.field, self.message
            )
        } else {
            write!(f, "[{} #{}] {}: {}", self.context, self.record, self.field, self.message)
        }
    }
}

/// Every violation found in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed with {} error(s)", .errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    pub fn merge(failures: impl IntoIterator<Item = ValidationFailure>) -> Option<ValidationFailure> {
        let errors: Vec<ValidationError> = failures.into_iter().flat_map(|f| f.errors).collect();
        if errors.is_empty() {
            None
        } else {
            Some(ValidationFailure { errors })
        }
    }

    /// Distinct (context, record) pairs that failed
    pub fn failed_records(&self) -> usize {
        let mut seen: Vec<(&str, usize)> = self
            .errors
            .iter()
            .map(|e| (e.context.as_str(), e.record))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

/// Records that passed, plus violations downgraded to warnings by policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
    pub records: Vec<T>,
    pub warnings: Vec<ValidationError>,
}

// ============================================================================
// POLICY
// ============================================================================

/// What to do with a record whose network address is not a valid IPv4 address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv4Policy {
    /// Count it as a validation error (the batch fails)
    #[default]
    Reject,
    /// Keep the record and report a warning
    Warn,
}

// ============================================================================
// FIELD PREDICATES
// ============================================================================

/// Card number must be an integer strictly greater than zero.
pub fn check_card_number(raw: &str) -> Result<u64, String> {
    let value = raw.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{raw}' is not an integer"));
    }
    if negative || digits.bytes().all(|b| b == b'0') {
        return Err(format!("must be greater than 0, got {value}"));
    }

    digits
        .parse::<u64>()
        .map_err(|_| format!("'{value}' is too large for a card number"))
}

/// Dotted-quad IPv4, four octets 0-255, nothing before or after.
pub fn check_ipv4(raw: &str) -> Result<Ipv4Addr, String> {
    raw.parse::<Ipv4Addr>()
        .map_err(|_| format!("'{raw}' is not a valid IPv4 address"))
}

/// Region codes are exactly two characters.
pub fn check_region(raw: &str) -> Result<(), String> {
    let len = raw.chars().count();
    if len == 2 {
        Ok(())
    } else {
        Err(format!("must be exactly 2 characters, got {len} ('{raw}')"))
    }
}

pub fn check_vendor(vendor: &str, table: &VendorPrefixTable) -> Result<(), String> {
    if vendor.is_empty() {
        Err("vendor is required".to_string())
    } else if !table.contains_vendor(vendor) {
        Err(format!("'{vendor}' is not a known vendor"))
    } else {
        Ok(())
    }
}

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

pub struct SchemaValidator<'a> {
    vendors: &'a VendorPrefixTable,
    ipv4_policy: Ipv4Policy,
}

/// Violations for one record, split by severity.
struct RecordCheck<'c> {
    context: &'c str,
    record: usize,
    line: usize,
    ipv4_policy: Ipv4Policy,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl<'c> RecordCheck<'c> {
    fn new(context: &'c str, record: usize, line: usize, ipv4_policy: Ipv4Policy) -> Self {
        RecordCheck {
            context,
            record,
            line,
            ipv4_policy,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn violation(&self, field: &str, value: &str, message: String) -> ValidationError {
        ValidationError {
            context: self.context.to_string(),
            record: self.record,
            line: self.line,
            field: field.to_string(),
            value: value.to_string(),
            message,
        }
    }

    fn fail(&mut self, field: &str, value: &str, message: String) {
        let violation = self.violation(field, value, message);
        self.errors.push(violation);
    }

    fn card_number(&mut self, raw: &str) -> Option<u64> {
        check_card_number(raw)
            .map_err(|msg| self.fail("credit_card_number", raw, msg))
            .ok()
    }

    fn ipv4(&mut self, raw: &str) {
        if let Err(msg) = check_ipv4(raw) {
            let violation = self.violation("ipv4", raw, msg);
            match self.ipv4_policy {
                Ipv4Policy::Reject => self.errors.push(violation),
                Ipv4Policy::Warn => {
                    tracing::warn!(context = self.context, record = self.record, "{violation}");
                    self.warnings.push(violation);
                }
            }
        }
    }

    fn region(&mut self, field: &str, raw: &str) {
        if let Err(msg) = check_region(raw) {
            self.fail(field, raw, msg);
        }
    }

    fn required_region(&mut self, field: &str, raw: Option<&str>) {
        match raw {
            Some(value) => self.region(field, value),
            None => self.fail(field, "", "field is required".to_string()),
        }
    }
}

/// Collects per-record results into the batch outcome.
struct BatchCheck<T> {
    records: Vec<T>,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl<T> BatchCheck<T> {
    fn with_capacity(capacity: usize) -> Self {
        BatchCheck {
            records: Vec::with_capacity(capacity),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn absorb(&mut self, check: RecordCheck<'_>, record: Option<T>) {
        let clean = check.errors.is_empty();
        self.errors.extend(check.errors);
        self.warnings.extend(check.warnings);
        if let (true, Some(record)) = (clean, record) {
            self.records.push(record);
        }
    }

    fn finish(self) -> Result<Validated<T>, ValidationFailure> {
        if self.errors.is_empty() {
            Ok(Validated {
                records: self.records,
                warnings: self.warnings,
            })
        } else {
            Err(ValidationFailure { errors: self.errors })
        }
    }
}

impl<'a> SchemaValidator<'a> {
    pub fn new(vendors: &'a VendorPrefixTable, ipv4_policy: Ipv4Policy) -> Self {
        SchemaValidator { vendors, ipv4_policy }
    }

    pub fn ipv4_policy(&self) -> Ipv4Policy {
        self.ipv4_policy
    }

    /// Fraud schema: card number > 0, IPv4, optional 2-character state.
    pub fn validate_fraud_records(
        &self,
        context: &str,
        raw: &[RawFraudRecord],
    ) -> Result<Validated<FraudRecord>, ValidationFailure> {
        let mut batch = BatchCheck::with_capacity(raw.len());

        for (index, row) in raw.iter().enumerate() {
            let mut check = RecordCheck::new(context, index, row.line, self.ipv4_policy);

            let card = check.card_number(&row.credit_card_number);
            check.ipv4(&row.ipv4);
            if let Some(state) = row.state.as_deref() {
                check.region("state", state);
            }

            let record = card.map(|credit_card_number| FraudRecord {
                credit_card_number,
                ipv4: row.ipv4.clone(),
                state: row.state.clone(),
            });
            batch.absorb(check, record);
        }

        batch.finish()
    }

    /// Transaction schema: card number > 0, IPv4, mandatory 2-character state.
    pub fn validate_transactions(
        &self,
        context: &str,
        raw: &[RawTransaction],
    ) -> Result<Validated<Transaction>, ValidationFailure> {
        let mut batch = BatchCheck::with_capacity(raw.len());

        for (index, row) in raw.iter().enumerate() {
            let mut check = RecordCheck::new(context, index, row.line, self.ipv4_policy);

            let card = check.card_number(&row.credit_card_number);
            check.ipv4(&row.ipv4);
            check.required_region("state", row.state.as_deref());

            let record = match (card, &row.state) {
                (Some(credit_card_number), Some(state)) => {
                    Some(Transaction::new(credit_card_number, row.ipv4.clone(), state.clone()))
                }
                _ => None,
            };
            batch.absorb(check, record);
        }

        batch.finish()
    }

    /// Reconciled schema: the transaction fields plus a known vendor and a
    /// 2-character fraud region when one is present.
    ///
    /// Address warnings were already raised when the inputs were validated,
    /// so under `Ipv4Policy::Warn` the address is not re-checked here.
    pub fn validate_reconciled(
        &self,
        context: &str,
        records: &[TransactionRecord],
    ) -> Result<(), ValidationFailure> {
        let mut batch: BatchCheck<()> = BatchCheck::with_capacity(0);

        for (index, record) in records.iter().enumerate() {
            let mut check = RecordCheck::new(context, index, 0, self.ipv4_policy);

            if record.credit_card_number == 0 {
                check.fail(
                    "credit_card_number",
                    "0",
                    "must be greater than 0, got 0".to_string(),
                );
            }
            if self.ipv4_policy == Ipv4Policy::Reject {
                check.ipv4(&record.ipv4);
            }
            check.region("state", &record.state);
            if let Err(msg) = check_vendor(&record.vendor, self.vendors) {
                check.fail("vendor", &record.vendor, msg);
            }
            if let Some(region) = record.fraudulent_state.as_deref() {
                check.region("fraudulent_state", region);
            }

            batch.absorb(check, None);
        }

        batch.finish().map(|_| ())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VendorPrefixTable {
        VendorPrefixTable::standard()
    }

    fn reconciled(card: u64, ipv4: &str, state: &str, vendor: &str) -> TransactionRecord {
        TransactionRecord {
            credit_card_number: card,
            ipv4: ipv4.to_string(),
            state: state.to_string(),
            vendor: vendor.to_string(),
            is_fraudulent: false,
            fraudulent_state: None,
        }
    }

    #[test]
    fn test_card_number_predicate() {
        assert_eq!(check_card_number("4111111111111111"), Ok(4111111111111111));
        assert_eq!(check_card_number(" 42 "), Ok(42));
        assert!(check_card_number("0").unwrap_err().contains("greater than 0"));
        assert!(check_card_number("-17").unwrap_err().contains("greater than 0"));
        assert!(check_card_number("abc").unwrap_err().contains("not an integer"));
        assert!(check_card_number("").unwrap_err().contains("not an integer"));
        assert!(check_card_number("12.5").is_err());
        assert!(check_card_number("99999999999999999999999").unwrap_err().contains("too large"));
    }

    #[test]
    fn test_ipv4_predicate() {
        assert!(check_ipv4("1.2.3.4").is_ok());
        assert!(check_ipv4("255.255.255.255").is_ok());
        assert!(check_ipv4("256.1.1.1").is_err());
        assert!(check_ipv4("1.2.3").is_err());
        assert!(check_ipv4("1.2.3.4.5").is_err());
        assert!(check_ipv4(" 1.2.3.4").is_err());
        assert!(check_ipv4("1.2.3.4x").is_err());
        assert!(check_ipv4("").is_err());
    }

    #[test]
    fn test_region_and_vendor_predicates() {
        assert!(check_region("CA").is_ok());
        assert!(check_region("C").is_err());
        assert!(check_region("CAL").is_err());
        assert!(check_region("").is_err());

        let table = table();
        assert!(check_vendor("visa", &table).is_ok());
        assert!(check_vendor("", &table).unwrap_err().contains("required"));
        assert!(check_vendor("unionpay", &table).unwrap_err().contains("not a known vendor"));
    }

    #[test]
    fn test_fraud_records_valid() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Reject);
        let raw = vec![
            RawFraudRecord::new("111", "1.2.3.4", Some("CA")),
            RawFraudRecord::new("222", "5.6.7.8", None),
        ];

        let validated = validator.validate_fraud_records("fraud", &raw).unwrap();
        assert_eq!(validated.records.len(), 2);
        assert!(validated.warnings.is_empty());
        assert_eq!(validated.records[0].state.as_deref(), Some("CA"));
        assert_eq!(validated.records[1].state, None);
    }

    #[test]
    fn test_batch_collects_every_violation() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Reject);
        let raw = vec![
            RawFraudRecord::new("0", "1.2.3.4", Some("CA")),
            RawFraudRecord::new("333", "1.2.3.4", None),
            RawFraudRecord::new("abc", "999.1.1.1", Some("CAL")),
        ];

        let failure = validator.validate_fraud_records("fraud", &raw).unwrap_err();
        assert_eq!(failure.errors.len(), 4);
        assert_eq!(failure.failed_records(), 2);

        let fields: Vec<&str> = failure.fields().collect();
        assert_eq!(fields, vec!["credit_card_number", "credit_card_number", "ipv4", "state"]);
        assert_eq!(failure.errors[0].record, 0);
        assert!(failure.errors.iter().skip(1).all(|e| e.record == 2));
        assert_eq!(failure.to_string(), "validation failed with 4 error(s)");
    }

    #[test]
    fn test_ipv4_warn_policy_keeps_record() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Warn);
        let raw = vec![RawTransaction::new("4111", "not-an-ip", Some("NY"))];

        let validated = validator.validate_transactions("transactions#1", &raw).unwrap();
        assert_eq!(validated.records.len(), 1);
        assert_eq!(validated.warnings.len(), 1);
        assert_eq!(validated.warnings[0].field, "ipv4");
    }

    #[test]
    fn test_ipv4_reject_policy_fails_batch() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Reject);
        let raw = vec![RawTransaction::new("4111", "not-an-ip", Some("NY"))];

        let failure = validator.validate_transactions("transactions#1", &raw).unwrap_err();
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].field, "ipv4");
        assert_eq!(failure.errors[0].value, "not-an-ip");
    }

    #[test]
    fn test_transaction_state_is_mandatory() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Reject);
        let mut raw = vec![
            RawTransaction::new("4111", "1.2.3.4", None),
            RawTransaction::new("4112", "1.2.3.4", Some("N")),
        ];
        raw[1].line = 3;

        let failure = validator.validate_transactions("transactions#1", &raw).unwrap_err();
        assert_eq!(failure.errors.len(), 2);
        assert!(failure.errors[0].message.contains("required"));
        assert_eq!(
            failure.errors[1].to_string(),
            "[transactions#1 #1 line 3] state: must be exactly 2 characters, got 1 ('N')"
        );
    }

    #[test]
    fn test_reconciled_schema() {
        let table = table();
        let validator = SchemaValidator::new(&table, Ipv4Policy::Reject);

        let good = vec![reconciled(4111, "1.2.3.4", "CA", "visa")];
        assert!(validator.validate_reconciled("reconciled", &good).is_ok());

        let mut bad_region = reconciled(4111, "1.2.3.4", "CA", "visa");
        bad_region.fraudulent_state = Some("XYZ".to_string());
        let bad = vec![
            reconciled(0, "1.2.3.4", "CA", "unionpay"),
            bad_region,
            reconciled(4111, "1.2.3.4", "CAL", "visa"),
        ];

        let failure = validator.validate_reconciled("reconciled", &bad).unwrap_err();
        let fields: Vec<&str> = failure.fields().collect();
        assert_eq!(
            fields,
            vec!["credit_card_number", "vendor", "fraudulent_state", "state"]
        );
        assert_eq!(failure.failed_records(), 3);
        assert_eq!(failure.errors[3].record, 2);
        assert_eq!(failure.errors[3].value, "CAL");
    }

    #[test]
    fn test_merge_failures() {
        let one = ValidationFailure {
            errors: vec![ValidationError {
                context: "fraud".into(),
                record: 0,
                line: 2,
                field: "ipv4".into(),
                value: "x".into(),
                message: "bad".into(),
            }],
        };
        let empty = ValidationFailure { errors: vec![] };

        assert!(ValidationFailure::merge(vec![empty.clone()]).is_none());
        let merged = ValidationFailure::merge(vec![one.clone(), empty, one]).unwrap();
        assert_eq!(merged.errors.len(), 2);
    }
}
