// 📥 CSV Parsers - fraud list and transaction files → raw records
//
// Inputs are plain CSV files or zip archives holding one CSV member each.
//
// The fraud file's header has no `state` column, and rows only carry a state
// when one was reported. Reading it with flexible record lengths and a
// positional fallback for `state` gives the same rows as rewriting the file
// with a padded header.

use crate::records::{RawFraudRecord, RawTransaction};
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const CARD_COLUMN: &str = "credit_card_number";
const IPV4_COLUMN: &str = "ipv4";
const STATE_COLUMN: &str = "state";

// ============================================================================
// PARSER TRAIT
// ============================================================================

pub trait CsvParser {
    type Record;

    /// Short name used in error messages
    fn name(&self) -> &str;

    /// Parse records from any reader. `source` names the input for errors.
    fn parse_reader<R: Read>(&self, reader: R, source: &str) -> Result<Vec<Self::Record>>;

    /// Parse records from a file on disk
    fn parse(&self, file_path: &Path) -> Result<Vec<Self::Record>> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open {} file: {}", self.name(), file_path.display()))?;

        let source = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
            .to_string();

        self.parse_reader(file, &source)
    }
}

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

struct Columns {
    card: usize,
    ipv4: usize,
    state: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, source: &str, state_fallback: Option<usize>) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let Some(card) = find(CARD_COLUMN) else {
            bail!("{}: missing column '{}'", source, CARD_COLUMN);
        };
        let Some(ipv4) = find(IPV4_COLUMN) else {
            bail!("{}: missing column '{}'", source, IPV4_COLUMN);
        };

        Ok(Columns {
            card,
            ipv4,
            state: find(STATE_COLUMN).or(state_fallback),
        })
    }

    fn field(record: &StringRecord, index: usize) -> String {
        record.get(index).unwrap_or("").to_string()
    }

    fn optional(record: &StringRecord, index: Option<usize>) -> Option<String> {
        index
            .and_then(|i| record.get(i))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn read_rows<R: Read, T>(
    reader: R,
    source: &str,
    state_fallback: Option<usize>,
    build: impl Fn(&StringRecord, &Columns, usize) -> T,
) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {source}"))?
        .clone();
    let columns = Columns::from_headers(&headers, source, state_fallback)?;

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            format!("Failed to parse CSV line {} in {}", index + 2, source)
        })?;

        // +2 because: 1-indexed + header row
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        rows.push(build(&record, &columns, line));
    }

    tracing::debug!(source, rows = rows.len(), "parsed CSV");
    Ok(rows)
}

// ============================================================================
// FRAUD PARSER
// ============================================================================

/// `credit_card_number,ipv4[,state]`
pub struct FraudParser;

impl CsvParser for FraudParser {
    type Record = RawFraudRecord;

    fn name(&self) -> &str {
        "fraud"
    }

    fn parse_reader<R: Read>(&self, reader: R, source: &str) -> Result<Vec<RawFraudRecord>> {
        // State is the unnamed third column when the header omits it
        read_rows(reader, source, Some(2), |record, columns, line| RawFraudRecord {
            credit_card_number: Columns::field(record, columns.card),
            ipv4: Columns::field(record, columns.ipv4),
            state: Columns::optional(record, columns.state),
            line,
        })
    }
}

// ============================================================================
// TRANSACTION PARSER
// ============================================================================

/// `credit_card_number,ipv4,state`
pub struct TransactionParser;

impl CsvParser for TransactionParser {
    type Record = RawTransaction;

    fn name(&self) -> &str {
        "transaction"
    }

    fn parse_reader<R: Read>(&self, reader: R, source: &str) -> Result<Vec<RawTransaction>> {
        read_rows(reader, source, None, |record, columns, line| RawTransaction {
            credit_card_number: Columns::field(record, columns.card),
            ipv4: Columns::field(record, columns.ipv4),
            state: Columns::optional(record, columns.state),
            line,
        })
    }
}

pub fn load_fraud_csv(path: &Path) -> Result<Vec<RawFraudRecord>> {
    FraudParser.parse(path)
}

pub fn load_transactions_csv(path: &Path) -> Result<Vec<RawTransaction>> {
    TransactionParser.parse(path)
}

// ============================================================================
// ZIP ARCHIVES
// ============================================================================

const FRAUD_ARCHIVE: &str = "fraud.zip";
const TRANSACTION_ARCHIVE_PREFIX: &str = "transaction-";

/// Parse the CSV member of a zip archive without extracting it.
///
/// The member whose file stem matches the archive stem is read
/// (`fraud.zip` → `fraud` or `fraud.csv`). An archive holding a single file
/// is read whatever that file is called.
pub fn parse_archive<P: CsvParser>(parser: &P, archive_path: &Path) -> Result<Vec<P::Record>> {
    let file = File::open(archive_path).with_context(|| {
        format!("Failed to open {} archive: {}", parser.name(), archive_path.display())
    })?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive: {}", archive_path.display()))?;

    let stem = archive_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let index = archive_member(&mut archive, stem)
        .with_context(|| format!("No CSV member to read in {}", archive_path.display()))?;

    let member = archive.by_index(index)?;
    let source = format!("{}:{}", archive_path.display(), member.name());
    parser.parse_reader(member, &source)
}

fn archive_member<R: Read + Seek>(archive: &mut ZipArchive<R>, stem: &str) -> Result<usize> {
    let mut files = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        // Entries escaping the archive root are never read
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        files.push((index, name));
    }

    if let Some((index, _)) = files.iter().find(|(_, name)| name == stem) {
        return Ok(*index);
    }
    match files.as_slice() {
        [(index, _)] => Ok(*index),
        [] => bail!("archive has no files"),
        _ => bail!("{} files and none named '{}'", files.len(), stem),
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

pub fn load_fraud_archive(path: &Path) -> Result<Vec<RawFraudRecord>> {
    parse_archive(&FraudParser, path)
}

pub fn load_transactions_archive(path: &Path) -> Result<Vec<RawTransaction>> {
    parse_archive(&TransactionParser, path)
}

/// Fraud list from a `.zip` archive or a plain CSV file
pub fn load_fraud(path: &Path) -> Result<Vec<RawFraudRecord>> {
    if is_archive(path) {
        load_fraud_archive(path)
    } else {
        load_fraud_csv(path)
    }
}

/// Transactions from a `.zip` archive or a plain CSV file
pub fn load_transactions(path: &Path) -> Result<Vec<RawTransaction>> {
    if is_archive(path) {
        load_transactions_archive(path)
    } else {
        load_transactions_csv(path)
    }
}

/// Load a data directory laid out as `fraud.zip` plus `transaction-*.zip`.
/// Transaction archives are returned as batches in file name order.
pub fn load_data_dir(dir: &Path) -> Result<(Vec<RawFraudRecord>, Vec<Vec<RawTransaction>>)> {
    let fraud = load_fraud_archive(&dir.join(FRAUD_ARCHIVE))?;

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory: {}", dir.display()))?;
    let mut archives: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_transactions = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(TRANSACTION_ARCHIVE_PREFIX));
        if is_transactions && is_archive(&path) {
            archives.push(path);
        }
    }
    archives.sort();

    if archives.is_empty() {
        bail!("{}: no {}*.zip archives", dir.display(), TRANSACTION_ARCHIVE_PREFIX);
    }

    let batches = archives
        .iter()
        .map(|path| load_transactions_archive(path))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        dir = %dir.display(),
        fraud = fraud.len(),
        batches = batches.len(),
        "loaded data directory"
    );
    Ok((fraud, batches))
}

// ============================================================================
// TESTS
// ============================================================================
