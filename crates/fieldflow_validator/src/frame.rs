//! In-memory tabular content: raw CSV text and the coerced, typed frame the
//! checks run against.

use crate::outcome::{codes, ErrorKind, RowError};
use crate::ruleset::{ColumnKind, Ruleset};
use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;

/// Frame loading errors.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Date formats tried in order; day-first conventions win over ISO.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Parse a date with the day-first convention, ISO as fallback.
///
/// Returns `None` for anything unparseable; a bad date coerces to null
/// rather than failing the load.
pub fn parse_date_dayfirst(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Canonical text form for distinct-value comparisons.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Float(f) => Some(f.to_bits().to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Raw tabular content as read from disk: a header and string cells.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a CSV file with headers into a [`RawFrame`].
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<RawFrame, FrameError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    Ok(RawFrame { columns, rows })
}

/// Typed tabular content: one column per ruleset entry, values coerced to
/// the declared kind.
///
/// Coercion is forgiving by design: empty cells and unparseable dates become
/// null; an unparseable number becomes null *and* records a row-scoped
/// coercion error that the engine folds into its outcome.
#[derive(Debug, Clone)]
pub struct TableFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    coercion_errors: Vec<RowError>,
}

impl TableFrame {
    /// Coerce a raw frame against a ruleset.
    ///
    /// Columns follow the ruleset's declaration order; raw columns the
    /// ruleset does not know are dropped. A ruleset column absent from the
    /// raw header (callers normally gate on the structural check first)
    /// yields null for every row.
    pub fn from_raw(raw: &RawFrame, rules: &Ruleset) -> Self {
        let columns: Vec<String> = rules.columns.iter().map(|c| c.name.clone()).collect();
        let raw_index: Vec<Option<usize>> = rules
            .columns
            .iter()
            .map(|c| raw.columns.iter().position(|h| h == &c.name))
            .collect();

        let mut rows = Vec::with_capacity(raw.rows.len());
        let mut coercion_errors = Vec::new();

        for (row_index, raw_row) in raw.rows.iter().enumerate() {
            let mut row = Vec::with_capacity(rules.columns.len());
            for (rule, idx) in rules.columns.iter().zip(raw_index.iter()) {
                let raw_value = idx
                    .and_then(|i| raw_row.get(i))
                    .map(|s| s.trim())
                    .unwrap_or("");
                row.push(coerce(raw_value, rule.kind, row_index, &rule.name, &mut coercion_errors));
            }
            rows.push(row);
        }

        Self {
            columns,
            rows,
            coercion_errors,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row and column name; null when the column is unknown.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).map(|r| &r[c]))
            .unwrap_or(&Value::Null)
    }

    /// Coercion errors discovered while building the frame.
    pub fn coercion_errors(&self) -> &[RowError] {
        &self.coercion_errors
    }
}

fn coerce(
    raw: &str,
    kind: ColumnKind,
    row_index: usize,
    column: &str,
    errors: &mut Vec<RowError>,
) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }

    match kind {
        ColumnKind::Text => Value::Text(raw.to_string()),
        ColumnKind::Date => parse_date_dayfirst(raw).map(Value::Date).unwrap_or(Value::Null),
        ColumnKind::Float => match raw.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => {
                errors.push(RowError {
                    row_index,
                    field_name: column.to_string(),
                    kind: ErrorKind::Row,
                    code: codes::INVALID_NUMBER,
                });
                Value::Null
            }
        },
    }
}
