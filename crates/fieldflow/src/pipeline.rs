//! The per-file processing pass driven by the table poller.
//!
//! One pass advances exactly one file through its lifecycle: structural
//! check, validation, result persistence, report export, status update.
//! Failures inside a pass never kill the poll loop; the file is left at its
//! current status so the next tick reconsiders it.

use crate::report;
use anyhow::{Context, Result};
use fieldflow_db::{BronzeRow, ErrorRecord, ErrorScope, FieldflowDb, FileRecord, FileStatus, RowStatus};
use fieldflow_validator::{
    frame, Engine, ErrorKind, RulesetRegistry, TableFrame, ValidationOutcome,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Drives registered files through validation, one per call.
pub struct Pipeline {
    db: FieldflowDb,
    engines: HashMap<String, Engine>,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Compile one engine per configured datatype up front, so a bad rule
    /// pattern fails at startup instead of mid-pass.
    pub fn new(db: FieldflowDb, registry: RulesetRegistry, output_dir: PathBuf) -> Result<Self> {
        let mut engines = HashMap::new();
        for rules in registry.iter() {
            let datatype = rules.datatype.clone();
            let engine = Engine::new(rules.clone())
                .with_context(|| format!("Invalid ruleset for datatype {}", datatype))?;
            engines.insert(datatype, engine);
        }

        Ok(Self {
            db,
            engines,
            output_dir,
        })
    }

    /// One poll tick: pick the next pending file, if any, and advance it.
    ///
    /// Returns `Ok(false)` when nothing was eligible.
    pub async fn process_next(&self) -> Result<bool> {
        let Some(file) = self.db.next_pending().await? else {
            debug!("No files to process");
            return Ok(false);
        };

        info!(
            file_id = file.id,
            filepath = %file.filepath,
            status = %file.status,
            "Processing file"
        );
        self.process_file(file).await?;
        Ok(true)
    }

    async fn process_file(&self, file: FileRecord) -> Result<()> {
        let Some(engine) = self.engines.get(&file.datatype) else {
            // No rule table for the declared datatype: terminal, like a
            // structural mismatch.
            warn!(file_id = file.id, datatype = %file.datatype, "Unknown datatype");
            self.db
                .set_status(
                    file.id,
                    FileStatus::Error,
                    Some(&format!("Error: no ruleset for datatype {}", file.datatype)),
                )
                .await?;
            return Ok(());
        };

        let raw = frame::read_csv_path(&file.filepath)
            .with_context(|| format!("Failed to load {}", file.filepath))?;

        match file.status {
            FileStatus::Pending => {
                let missing = engine.rules().missing_columns(&raw.columns);
                if !missing.is_empty() {
                    warn!(file_id = file.id, missing = ?missing, "Column validation failed");
                    self.db
                        .set_status(
                            file.id,
                            FileStatus::Error,
                            Some(&format!(
                                "Error: Columns do not match (missing: {})",
                                missing.join(", ")
                            )),
                        )
                        .await?;
                    return Ok(());
                }
                self.db
                    .set_status(file.id, FileStatus::Processing, None)
                    .await?;
            }
            FileStatus::Processing => {
                // Columns were already validated before the previous run
                // crashed; carry the file straight to validation.
                info!(file_id = file.id, "Resuming mid-pipeline file");
            }
            other => {
                warn!(file_id = file.id, status = %other, "File not in a processable status");
                return Ok(());
            }
        }

        let typed = TableFrame::from_raw(&raw, engine.rules());
        let outcome = engine.validate(&typed);

        let (rows, errors) = lower_outcome(&typed, &outcome);
        self.db.persist_results(file.id, &rows, &errors).await?;

        let report_rows = self.db.build_report(file.id).await?;
        let report_path = report::write_report(&self.output_dir, &file.filename, &report_rows)?;

        self.db
            .set_status(file.id, FileStatus::Processed, None)
            .await?;

        info!(
            file_id = file.id,
            rows = rows.len(),
            errors = errors.len(),
            report = %report_path.display(),
            "Validation completed"
        );
        Ok(())
    }
}

/// Lower a validation outcome into store records.
fn lower_outcome(
    frame: &TableFrame,
    outcome: &ValidationOutcome,
) -> (Vec<BronzeRow>, Vec<ErrorRecord>) {
    let rows = outcome
        .row_status
        .iter()
        .enumerate()
        .map(|(row, status)| BronzeRow {
            row_index: row as i64,
            status: match status {
                fieldflow_validator::RowStatus::Passed => RowStatus::Passed,
                fieldflow_validator::RowStatus::Failed => RowStatus::Failed,
            },
            field_name: frame.value(row, "FieldName").as_text().map(str::to_string),
            field_type: frame.value(row, "FieldType").as_text().map(str::to_string),
            discovery_date: frame.value(row, "DiscoveryDate").as_date(),
            x: frame.value(row, "X").as_float(),
            y: frame.value(row, "Y").as_float(),
            crs: frame.value(row, "CRS").as_text().map(str::to_string),
            source: frame.value(row, "Source").as_text().map(str::to_string),
            parent_field_name: frame
                .value(row, "ParentFieldName")
                .as_text()
                .map(str::to_string),
        })
        .collect();

    let errors = outcome
        .errors
        .iter()
        .map(|e| ErrorRecord {
            row_index: e.row_index as i64,
            field_name: e.field_name.clone(),
            scope: match e.kind {
                ErrorKind::Row => ErrorScope::RowValidation,
                ErrorKind::Group => ErrorScope::GroupValidation,
            },
            error_code: e.code.to_string(),
        })
        .collect();

    (rows, errors)
}
