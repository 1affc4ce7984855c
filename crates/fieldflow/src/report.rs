//! CSV export of the joined validation report.

use anyhow::{Context, Result};
use fieldflow_db::ReportRow;
use std::path::{Path, PathBuf};

const REPORT_HEADER: &[&str] = &[
    "id",
    "row_index",
    "file_id",
    "validation_status",
    "FieldName",
    "FieldType",
    "DiscoveryDate",
    "X",
    "Y",
    "CRS",
    "Source",
    "ParentFieldName",
    "validation_timestamp",
    "error_message",
    "error_severity",
];

/// Write one report CSV named after the source file.
///
/// Returns the path written: `<output_dir>/<stem>_validation_results.csv`.
pub fn write_report(
    output_dir: &Path,
    source_filename: &str,
    rows: &[ReportRow],
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let stem = Path::new(source_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source_filename.to_string());
    let path = output_dir.join(format!("{}_validation_results.csv", stem));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;

    writer.write_record(REPORT_HEADER)?;
    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.row_index.to_string(),
            row.file_id.to_string(),
            row.validation_status.clone(),
            row.field_name.clone().unwrap_or_default(),
            row.field_type.clone().unwrap_or_default(),
            row.discovery_date.clone().unwrap_or_default(),
            row.x.map(|v| v.to_string()).unwrap_or_default(),
            row.y.map(|v| v.to_string()).unwrap_or_default(),
            row.crs.clone().unwrap_or_default(),
            row.source.clone().unwrap_or_default(),
            row.parent_field_name.clone().unwrap_or_default(),
            row.validation_timestamp.clone(),
            row.error_message.clone(),
            row.error_severity.clone(),
        ])?;
    }
    writer.flush()?;

    Ok(path)
}
