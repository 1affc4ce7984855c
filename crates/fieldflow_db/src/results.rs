//! Result/error store: bulk persistence and the joined report query.

use crate::error::Result;
use crate::types::{BronzeRow, ErrorRecord, ReportRow};
use crate::FieldflowDb;
use sqlx::Row;
use tracing::info;

impl FieldflowDb {
    /// Bulk-insert row statuses and error records for one processing pass.
    ///
    /// Record ids continue from the current maximum of each table, assigned
    /// here rather than by the database. One transaction; the poller's
    /// one-file-at-a-time discipline is what keeps the id assignment safe.
    pub async fn persist_results(
        &self,
        file_id: i64,
        rows: &[BronzeRow],
        errors: &[ErrorRecord],
    ) -> Result<()> {
        let now = Self::now_rfc3339();
        let mut tx = self.pool.begin().await?;

        let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM field_bronze_results")
            .fetch_one(&mut *tx)
            .await?;
        let mut next_id = max_id.unwrap_or(0) + 1;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO field_bronze_results (
                    id, row_index, file_id, validation_status,
                    field_name, field_type, discovery_date, x, y, crs, source, parent_field_name,
                    validation_timestamp
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(next_id)
            .bind(row.row_index)
            .bind(file_id)
            .bind(row.status.as_str())
            .bind(&row.field_name)
            .bind(&row.field_type)
            .bind(row.discovery_date.map(|d| d.format("%Y-%m-%d").to_string()))
            .bind(row.x)
            .bind(row.y)
            .bind(&row.crs)
            .bind(&row.source)
            .bind(&row.parent_field_name)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            next_id += 1;
        }

        let max_err_id: Option<i64> =
            sqlx::query_scalar("SELECT MAX(error_id) FROM validation_errors")
                .fetch_one(&mut *tx)
                .await?;
        let mut next_err_id = max_err_id.unwrap_or(0) + 1;

        for err in errors {
            sqlx::query(
                r#"
                INSERT INTO validation_errors (
                    error_id, file_id, row_index, field_name, error_type, error_code, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(next_err_id)
            .bind(file_id)
            .bind(err.row_index)
            .bind(&err.field_name)
            .bind(err.scope.as_str())
            .bind(&err.error_code)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            next_err_id += 1;
        }

        tx.commit().await?;

        info!(
            file_id,
            rows = rows.len(),
            errors = errors.len(),
            "Validation results persisted"
        );
        Ok(())
    }

    /// Build the joined per-row report for one file.
    ///
    /// Left-joins row statuses to their errors and the error catalog,
    /// concatenating messages per row and deriving the row severity
    /// (ERROR over WARNING over empty). Ordered by result id ascending.
    pub async fn build_report(&self, file_id: i64) -> Result<Vec<ReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT
                r.id,
                r.row_index,
                r.file_id,
                r.validation_status,
                r.field_name,
                r.field_type,
                r.discovery_date,
                r.x,
                r.y,
                r.crs,
                r.source,
                r.parent_field_name,
                r.validation_timestamp,
                GROUP_CONCAT(m.error_message, ', ') AS error_message,
                CASE
                    WHEN SUM(CASE WHEN m.error_severity = 'ERROR' THEN 1 ELSE 0 END) > 0 THEN 'ERROR'
                    WHEN SUM(CASE WHEN m.error_severity = 'WARNING' THEN 1 ELSE 0 END) > 0 THEN 'WARNING'
                    ELSE ''
                END AS error_severity
            FROM field_bronze_results r
            LEFT JOIN validation_errors e
                ON e.row_index = r.row_index AND e.file_id = r.file_id
            LEFT JOIN error_messages m
                ON m.error_code = e.error_code
            WHERE r.file_id = ?
            GROUP BY r.id
            ORDER BY r.id ASC
            "#,
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ReportRow {
                id: row.get("id"),
                row_index: row.get("row_index"),
                file_id: row.get("file_id"),
                validation_status: row.get("validation_status"),
                field_name: row.get("field_name"),
                field_type: row.get("field_type"),
                discovery_date: row.get("discovery_date"),
                x: row.get("x"),
                y: row.get("y"),
                crs: row.get("crs"),
                source: row.get("source"),
                parent_field_name: row.get("parent_field_name"),
                validation_timestamp: row.get("validation_timestamp"),
                error_message: row
                    .get::<Option<String>, _>("error_message")
                    .unwrap_or_default(),
                error_severity: row.get("error_severity"),
            })
            .collect())
    }
}
