//! Life-history ledger
//!
//! The ledger is a long-lived, append-only table shared with other
//! consumers. Its columns are fixed by a pre-existing schema: this crate
//! never inserts, removes or reorders columns. Event fields are mapped to
//! columns by name once (see [`LedgerWriter::resolve`]) and every append is
//! a single batch, so a cycle is either fully recorded or not at all.

pub mod writer;

pub use writer::{normalize_column, LedgerField, LedgerWriter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Ledger has no column for field '{field}'")]
    SchemaMismatch { field: String },

    #[error("Ledger schema changed since the writer was resolved")]
    SchemaChanged,

    #[error("Row has {actual} cells, ledger has {expected} columns")]
    RowWidth { expected: usize, actual: usize },

    #[error("Ledger store error: {0}")]
    Store(String),
}

/// One positional ledger row; width always equals the schema width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerRow(pub Vec<String>);

impl LedgerRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Persisted ledger collaborator
pub trait LedgerStore {
    /// Column names, in storage order
    fn schema(&self) -> Vec<String>;

    /// Append all rows or none.
    fn append_rows(&mut self, rows: Vec<LedgerRow>) -> Result<(), LedgerError>;
}

/// Column layout used by fresh in-memory ledgers and the CLI.
pub const DEFAULT_COLUMNS: [&str; 11] = [
    "Event ID",
    "Cycle",
    "POPID",
    "Category",
    "Outcome",
    "Month",
    "Season",
    "Cause",
    "Cascade Depth",
    "Transition",
    "Notes",
];

/// In-memory ledger store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    columns: Vec<String>,
    rows: Vec<LedgerRow>,
    #[serde(skip)]
    fail_next_append: Option<String>,
}

impl InMemoryLedger {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            fail_next_append: None,
        }
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn standard() -> Self {
        Self::with_columns(&DEFAULT_COLUMNS)
    }

    /// Make the next append fail with `message` (simulates a store outage).
    pub fn fail_next_append(&mut self, message: impl Into<String>) {
        self.fail_next_append = Some(message.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the named column, one per row
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.0[index].as_str()).collect())
    }
}

impl LedgerStore for InMemoryLedger {
    fn schema(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn append_rows(&mut self, rows: Vec<LedgerRow>) -> Result<(), LedgerError> {
        if let Some(message) = self.fail_next_append.take() {
            return Err(LedgerError::Store(message));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != self.columns.len()) {
            return Err(LedgerError::RowWidth {
                expected: self.columns.len(),
                actual: bad.len(),
            });
        }
        self.rows.extend(rows);
        Ok(())
    }
}
