//! Types for the Fieldflow store entities.
//!
//! These types are the single source of truth for file lifecycle status and
//! validation result records. All crates should use these rather than raw
//! status strings.

use chrono::NaiveDate;

// ============================================================================
// File Registry Types
// ============================================================================

/// Lifecycle status of a registered file.
///
/// `Processed` and `Error` are terminal. A file left at `Processing` by a
/// crashed run is picked up again and carried to completion without
/// re-checking columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "PROCESSED" => Some(Self::Processed),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether this status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Legal edges: PENDING -> PROCESSING, PENDING -> ERROR (column
    /// mismatch), PROCESSING -> PROCESSED.
    pub fn can_transition(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Error)
                | (Self::Processing, Self::Processed)
        )
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file known to the registry.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub datatype: String,
    pub checksum: String,
    pub remarks: Option<String>,
    pub status: FileStatus,
    /// RFC 3339 registration timestamp.
    pub registered_at: String,
}

// ============================================================================
// Validation Result Types
// ============================================================================

/// Per-row validation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Passed,
    Failed,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Passed" => Some(Self::Passed),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scope of a validation error: a single row's value, or a whole key group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    RowValidation,
    GroupValidation,
}

impl ErrorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RowValidation => "row_validation",
            Self::GroupValidation => "group_validation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "row_validation" => Some(Self::RowValidation),
            "group_validation" => Some(Self::GroupValidation),
            _ => None,
        }
    }
}

/// One validated input row, ready for bulk insertion.
///
/// Field values are the coerced values the validator saw, not the raw file
/// text.
#[derive(Debug, Clone)]
pub struct BronzeRow {
    /// Position of the row within the source file.
    pub row_index: i64,
    pub status: RowStatus,
    pub field_name: Option<String>,
    pub field_type: Option<String>,
    pub discovery_date: Option<NaiveDate>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub crs: Option<String>,
    pub source: Option<String>,
    pub parent_field_name: Option<String>,
}

/// One discovered validation error, ready for bulk insertion.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub row_index: i64,
    /// Column name for row-scoped checks, the group key for group-scoped
    /// checks.
    pub field_name: String,
    pub scope: ErrorScope,
    pub error_code: String,
}

/// One row of the joined validation report.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: i64,
    pub row_index: i64,
    pub file_id: i64,
    pub validation_status: String,
    pub field_name: Option<String>,
    pub field_type: Option<String>,
    pub discovery_date: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub crs: Option<String>,
    pub source: Option<String>,
    pub parent_field_name: Option<String>,
    pub validation_timestamp: String,
    /// All error messages for the row, `", "` separated. Empty when clean.
    pub error_message: String,
    /// `ERROR` if any error-severity finding, else `WARNING` if any
    /// warning-severity finding, else empty.
    pub error_severity: String,
}
