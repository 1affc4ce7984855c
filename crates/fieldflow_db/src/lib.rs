//! Unified store layer for Fieldflow.
//!
//! This crate is the single source of truth for all database operations:
//! the file registry with its lifecycle state machine, the per-row
//! validation result store, and the joined report query.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fieldflow_db::{FieldflowDb, FileStatus, Result};
//!
//! let db = FieldflowDb::open("~/.fieldflow/fieldflow.sqlite3").await?;
//!
//! // Registry operations
//! let file_id = db.register_file(path, "FIELD", "").await?;
//! let next = db.next_pending().await?;
//!
//! // Result store operations
//! db.persist_results(file_id, &rows, &errors).await?;
//! let report = db.build_report(file_id).await?;
//! ```

mod error;
mod schema;
mod types;

// Method implementations organized by domain
pub mod checksum;
pub mod dev;
mod registry;
mod results;

pub use error::{DbError, Result};
pub use types::*;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Unified handle for all Fieldflow store operations.
///
/// This is the only way to access the database; no other crate issues raw
/// SQL.
#[derive(Clone)]
pub struct FieldflowDb {
    pool: SqlitePool,
}

impl FieldflowDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables and seeds the error catalog if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::NotFound(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool (escape hatch for ad-hoc queries).
    ///
    /// Prefer the typed methods.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Current time as an RFC 3339 string, the stored timestamp format.
    pub fn now_rfc3339() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.db");

        let db = FieldflowDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        db.close().await;
    }

    #[tokio::test]
    async fn test_open_existing_fails_if_not_exists() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nonexistent.db");

        let result = FieldflowDb::open_existing(&db_path).await;
        assert!(result.is_err());
    }
}
