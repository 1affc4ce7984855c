//! Schema creation for all Fieldflow tables.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::FieldflowDb;
use tracing::info;

/// Error catalog seeded at schema creation: code, human message, severity.
///
/// The report join resolves codes through this table; row severity is the
/// maximum severity among the row's errors.
const ERROR_CATALOG: &[(&str, &str, &str)] = &[
    (
        "missing_required_value",
        "Required value is missing",
        "ERROR",
    ),
    ("invalid_number", "Value is not a valid number", "ERROR"),
    (
        "invalid_format",
        "Value does not match the required format",
        "ERROR",
    ),
    (
        "future_discovery_date",
        "DiscoveryDate is in the future",
        "WARNING",
    ),
    (
        "inconsistent_field_data",
        "Inconsistent FieldType or DiscoveryDate within field",
        "ERROR",
    ),
    (
        "incomplete_geometry",
        "Incomplete polygon data: X, Y and CRS must all be present or all be absent",
        "ERROR",
    ),
    (
        "geometry_not_closed",
        "Polygon not closed: first and last coordinates differ",
        "WARNING",
    ),
];

impl FieldflowDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // WAL mode for concurrent watcher/poller access
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&self.pool)
            .await?;

        self.create_registry_tables().await?;
        self.create_result_tables().await?;
        self.seed_error_catalog().await?;

        info!("Database schema verified");
        Ok(())
    }

    /// Registered files and their lifecycle status.
    ///
    /// Ids are assigned by the registry, not by the database, so the table
    /// has no AUTOINCREMENT. Append-only apart from status/remarks updates.
    async fn create_registry_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY,
                filename TEXT NOT NULL,
                filepath TEXT NOT NULL,
                datatype TEXT NOT NULL,
                checksum TEXT NOT NULL,
                remarks TEXT,
                status TEXT NOT NULL,
                registered_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_status ON files(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Per-row statuses and per-error detail, plus the error catalog.
    async fn create_result_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS field_bronze_results (
                id INTEGER PRIMARY KEY,
                row_index INTEGER NOT NULL,
                file_id INTEGER NOT NULL REFERENCES files(id),
                validation_status TEXT NOT NULL,
                field_name TEXT,
                field_type TEXT,
                discovery_date TEXT,
                x REAL,
                y REAL,
                crs TEXT,
                source TEXT,
                parent_field_name TEXT,
                validation_timestamp TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS validation_errors (
                error_id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id),
                row_index INTEGER NOT NULL,
                field_name TEXT NOT NULL,
                error_type TEXT NOT NULL,
                error_code TEXT NOT NULL,
                created_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS error_messages (
                error_code TEXT PRIMARY KEY,
                error_message TEXT NOT NULL,
                error_severity TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_results_file_row ON field_bronze_results(file_id, row_index)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_errors_file_row ON validation_errors(file_id, row_index)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn seed_error_catalog(&self) -> Result<()> {
        for (code, message, severity) in ERROR_CATALOG {
            sqlx::query(
                r#"INSERT INTO error_messages (error_code, error_message, error_severity)
                   VALUES (?, ?, ?)
                   ON CONFLICT(error_code) DO NOTHING"#,
            )
            .bind(code)
            .bind(message)
            .bind(severity)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}
