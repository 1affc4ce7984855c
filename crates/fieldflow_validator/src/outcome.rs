//! The result shape every check lowers into.

use std::collections::HashSet;

/// Error codes emitted by the engine. The store's error catalog maps these
/// to human-readable messages and severities.
pub mod codes {
    pub const MISSING_REQUIRED_VALUE: &str = "missing_required_value";
    pub const INVALID_NUMBER: &str = "invalid_number";
    pub const INVALID_FORMAT: &str = "invalid_format";
    pub const FUTURE_DISCOVERY_DATE: &str = "future_discovery_date";
    pub const INCONSISTENT_FIELD_DATA: &str = "inconsistent_field_data";
    pub const INCOMPLETE_GEOMETRY: &str = "incomplete_geometry";
    pub const GEOMETRY_NOT_CLOSED: &str = "geometry_not_closed";
}

/// Whether an error concerns one row's own value or a whole key group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Row,
    Group,
}

/// One row-addressed validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    /// Column name for row-scoped checks, the group key value for
    /// group-scoped checks.
    pub field_name: String,
    pub kind: ErrorKind,
    pub code: &'static str,
}

/// Per-row verdict: failed iff the row has at least one error of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Passed,
    Failed,
}

/// Everything one validation call produced. Owned by the caller; the engine
/// keeps no state between calls.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Exactly one entry per input row, in row order.
    pub row_status: Vec<RowStatus>,
    pub errors: Vec<RowError>,
}

impl ValidationOutcome {
    /// Indices of rows with at least one error.
    pub fn failed_rows(&self) -> HashSet<usize> {
        self.errors.iter().map(|e| e.row_index).collect()
    }

    /// Errors recorded for one row.
    pub fn errors_for_row(&self, row_index: usize) -> Vec<&RowError> {
        self.errors
            .iter()
            .filter(|e| e.row_index == row_index)
            .collect()
    }
}
