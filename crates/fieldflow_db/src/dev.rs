//! Maintenance helpers for tests and local experiments.

use crate::error::Result;
use crate::FieldflowDb;

impl FieldflowDb {
    /// Delete all rows from every Fieldflow table except the error catalog.
    ///
    /// Not used by the pipeline; test and playground scaffolding only.
    pub async fn truncate_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM validation_errors")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM field_bronze_results")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM files").execute(&self.pool).await?;
        Ok(())
    }
}
