//! File registry operations: registration, pickup ordering, status updates.

use crate::checksum;
use crate::error::{DbError, Result};
use crate::types::{FileRecord, FileStatus};
use crate::FieldflowDb;
use sqlx::Row;
use std::path::Path;
use tracing::info;

impl FieldflowDb {
    /// Register a newly observed file with initial status `PENDING`.
    ///
    /// Derives the filename, fingerprints the content, and assigns the next
    /// sequential id inside one transaction. Callers treat registration as
    /// best-effort: on failure, log and rely on the watcher's next re-scan.
    /// Duplicate content is allowed; each registration is a new logical
    /// submission.
    pub async fn register_file(
        &self,
        filepath: impl AsRef<Path>,
        datatype: &str,
        remarks: &str,
    ) -> Result<i64> {
        let filepath = filepath.as_ref();
        let filepath_str = filepath.to_string_lossy().to_string();
        let filename = filepath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| filepath_str.clone());
        let checksum = checksum::sha256_file(filepath)?;

        let mut tx = self.pool.begin().await?;

        let last_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM files")
            .fetch_one(&mut *tx)
            .await?;
        let id = last_id.unwrap_or(0) + 1;

        sqlx::query(
            r#"
            INSERT INTO files (id, filename, filepath, datatype, checksum, remarks, status, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&filename)
        .bind(&filepath_str)
        .bind(datatype)
        .bind(&checksum)
        .bind(remarks)
        .bind(FileStatus::Pending.as_str())
        .bind(Self::now_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(file_id = id, filename = %filename, checksum = %checksum, "File registered");
        Ok(id)
    }

    /// Return the single next file to process, or `None`.
    ///
    /// Eligible statuses are `PENDING` and `PROCESSING`; a file left
    /// mid-pipeline by a crashed run is finished before new files are
    /// started, and within a status the oldest id wins.
    pub async fn next_pending(&self) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, filepath, datatype, checksum, remarks, status, registered_at
            FROM files
            WHERE status IN ('PENDING', 'PROCESSING')
            ORDER BY CASE status WHEN 'PROCESSING' THEN 0 ELSE 1 END, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_file(&row)?)),
            None => Ok(None),
        }
    }

    /// Fetch a file by id.
    pub async fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, filepath, datatype, checksum, remarks, status, registered_at
            FROM files WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_file(&row)?)),
            None => Ok(None),
        }
    }

    /// Update a file's status, enforcing only legal transitions.
    ///
    /// When `remarks` is `None` the existing remarks are preserved.
    pub async fn set_status(
        &self,
        id: i64,
        status: FileStatus,
        remarks: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = current.ok_or_else(|| DbError::not_found(format!("file id {}", id)))?;
        let current = FileStatus::parse(&current)
            .ok_or_else(|| DbError::invalid_state(format!("Unknown file status: {}", current)))?;

        if !current.can_transition(status) {
            return Err(DbError::invalid_state(format!(
                "Illegal status transition for file {}: {} -> {}",
                id, current, status
            )));
        }

        match remarks {
            Some(remarks) => {
                sqlx::query("UPDATE files SET status = ?, remarks = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(remarks)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE files SET status = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(file_id = id, status = %status, "File status updated");
        Ok(())
    }
}

fn row_to_file(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord> {
    let status_str: String = row.get("status");
    let status = FileStatus::parse(&status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown file status: {}", status_str)))?;

    Ok(FileRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        filepath: row.get("filepath"),
        datatype: row.get("datatype"),
        checksum: row.get("checksum"),
        remarks: row.get("remarks"),
        status,
        registered_at: row.get("registered_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct TestEnv {
        _tmp: TempDir,
        db: FieldflowDb,
        data_dir: std::path::PathBuf,
    }

    async fn setup() -> TestEnv {
        let tmp = TempDir::new().unwrap();
        let db = FieldflowDb::open(tmp.path().join("test.db")).await.unwrap();
        let data_dir = tmp.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        TestEnv {
            _tmp: tmp,
            db,
            data_dir,
        }
    }

    fn write_csv(env: &TestEnv, name: &str) -> std::path::PathBuf {
        let path = env.data_dir.join(name);
        std::fs::write(&path, "FieldName,X,Y\nF1,1.0,2.0\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let env = setup().await;
        let a = write_csv(&env, "a.csv");
        let b = write_csv(&env, "b.csv");

        let id_a = env.db.register_file(&a, "FIELD", "").await.unwrap();
        let id_b = env.db.register_file(&b, "FIELD", "").await.unwrap();

        assert_eq!(id_a, 1);
        assert_eq!(id_b, 2);

        let rec = env.db.get_file(id_a).await.unwrap().unwrap();
        assert_eq!(rec.filename, "a.csv");
        assert_eq!(rec.datatype, "FIELD");
        assert_eq!(rec.status, FileStatus::Pending);
        assert_eq!(rec.checksum.len(), 64);
    }

    #[tokio::test]
    async fn test_register_missing_file_fails() {
        let env = setup().await;
        let result = env
            .db
            .register_file(env.data_dir.join("ghost.csv"), "FIELD", "")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_next_pending_empty() {
        let env = setup().await;
        assert!(env.db.next_pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_pending_prefers_mid_pipeline_files() {
        let env = setup().await;
        let a = write_csv(&env, "a.csv");
        let b = write_csv(&env, "b.csv");

        let id_a = env.db.register_file(&a, "FIELD", "").await.unwrap();
        let id_b = env.db.register_file(&b, "FIELD", "").await.unwrap();

        // Oldest pending first
        let next = env.db.next_pending().await.unwrap().unwrap();
        assert_eq!(next.id, id_a);

        // A file already mid-pipeline wins over an older pending one
        env.db
            .set_status(id_b, FileStatus::Processing, None)
            .await
            .unwrap();
        let next = env.db.next_pending().await.unwrap().unwrap();
        assert_eq!(next.id, id_b);

        // Terminal files are never picked
        env.db
            .set_status(id_b, FileStatus::Processed, None)
            .await
            .unwrap();
        env.db
            .set_status(id_a, FileStatus::Error, Some("Columns do not match"))
            .await
            .unwrap();
        assert!(env.db.next_pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_status_preserves_remarks() {
        let env = setup().await;
        let a = write_csv(&env, "a.csv");
        let id = env.db.register_file(&a, "FIELD", "initial note").await.unwrap();

        env.db
            .set_status(id, FileStatus::Processing, None)
            .await
            .unwrap();

        let rec = env.db.get_file(id).await.unwrap().unwrap();
        assert_eq!(rec.status, FileStatus::Processing);
        assert_eq!(rec.remarks.as_deref(), Some("initial note"));
    }

    #[tokio::test]
    async fn test_set_status_rejects_illegal_transition() {
        let env = setup().await;
        let a = write_csv(&env, "a.csv");
        let id = env.db.register_file(&a, "FIELD", "").await.unwrap();

        let result = env.db.set_status(id, FileStatus::Processed, None).await;
        assert!(matches!(result, Err(DbError::InvalidState(_))));

        // Status is unchanged after the rejected update
        let rec = env.db.get_file(id).await.unwrap().unwrap();
        assert_eq!(rec.status, FileStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_status_unknown_file() {
        let env = setup().await;
        let result = env.db.set_status(99, FileStatus::Processing, None).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
