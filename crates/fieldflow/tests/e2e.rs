//! End-to-end tests for the Fieldflow pipeline.
//!
//! These drive single poll ticks against a real SQLite store and real files
//! on disk: registration, structural gating, validation, persistence, and
//! report export.

use fieldflow::config::FieldflowConfig;
use fieldflow::Pipeline;
use fieldflow_db::{FieldflowDb, FileStatus};
use fieldflow_watcher::{DirWatcher, WatcherConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const HEADER: &str = "FieldName,FieldType,DiscoveryDate,X,Y,CRS,Source,ParentFieldName";

/// Create a test environment with temp directories.
struct TestEnv {
    /// Temp directory (cleaned up on drop)
    _temp: TempDir,
    /// Directory incoming files are dropped into
    pub watch_dir: PathBuf,
    /// Directory reports are exported to
    pub output_dir: PathBuf,
    pub db: FieldflowDb,
}

impl TestEnv {
    async fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let watch_dir = temp.path().join("uploads");
        let output_dir = temp.path().join("output");
        fs::create_dir_all(&watch_dir).expect("Failed to create watch dir");

        let db = FieldflowDb::open(temp.path().join("fieldflow.sqlite3"))
            .await
            .expect("Failed to open database");

        Self {
            _temp: temp,
            watch_dir,
            output_dir,
            db,
        }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.watch_dir.join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.db.clone(),
            FieldflowConfig::default().build_registry(),
            self.output_dir.clone(),
        )
        .expect("Failed to build pipeline")
    }

    fn report_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_validation_results.csv", stem))
    }
}

#[tokio::test]
async fn test_clean_file_reaches_processed_with_report() {
    let env = TestEnv::new().await;
    let path = env.write_file(
        "fields.csv",
        &format!(
            "{HEADER}\n\
             F1,string,2020-01-01,1.0,2.0,Projected:EPSG::32633,survey,\n\
             F1,string,2020-01-01,1.0,2.0,Projected:EPSG::32633,survey,\n"
        ),
    );

    let file_id = env.db.register_file(&path, "FIELD", "").await.unwrap();
    let processed = env.pipeline().process_next().await.unwrap();
    assert!(processed);

    let record = env.db.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Processed);

    let report = fs::read_to_string(env.report_path("fields")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Passed"));
    assert!(lines[2].contains("Passed"));
    assert!(!report.contains("Failed"));
}

#[tokio::test]
async fn test_missing_column_is_terminal_with_no_records() {
    let env = TestEnv::new().await;
    let path = env.write_file("broken.csv", "FieldName,FieldType\nF1,string\n");

    let file_id = env.db.register_file(&path, "FIELD", "").await.unwrap();
    env.pipeline().process_next().await.unwrap();

    let record = env.db.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Error);
    let remarks = record.remarks.unwrap();
    assert!(remarks.contains("Columns do not match"));
    assert!(remarks.contains("DiscoveryDate"));

    // No row-level work happened
    assert!(env.db.build_report(file_id).await.unwrap().is_empty());
    assert!(!env.report_path("broken").exists());

    // Terminal: the file is never picked again
    assert!(!env.pipeline().process_next().await.unwrap());
}

#[tokio::test]
async fn test_failing_rows_are_reported_with_severity() {
    let env = TestEnv::new().await;
    let path = env.write_file(
        "mixed.csv",
        &format!(
            "{HEADER}\n\
             F1,string,2020-01-01,,,,survey,\n\
             F2,string,2999-01-01,,,,survey,\n"
        ),
    );

    let file_id = env.db.register_file(&path, "FIELD", "").await.unwrap();
    env.pipeline().process_next().await.unwrap();

    let report = env.db.build_report(file_id).await.unwrap();
    assert_eq!(report.len(), 2);

    assert_eq!(report[0].validation_status, "Passed");
    assert_eq!(report[0].error_message, "");
    assert_eq!(report[0].error_severity, "");

    assert_eq!(report[1].validation_status, "Failed");
    assert!(report[1].error_message.contains("DiscoveryDate is in the future"));
    assert_eq!(report[1].error_severity, "WARNING");
}

#[tokio::test]
async fn test_mid_pipeline_file_is_resumed() {
    let env = TestEnv::new().await;
    let path = env.write_file(
        "resume.csv",
        &format!("{HEADER}\nF1,string,2020-01-01,,,,survey,\n"),
    );

    let file_id = env.db.register_file(&path, "FIELD", "").await.unwrap();
    // Simulate a run that crashed after the structural check
    env.db
        .set_status(file_id, FileStatus::Processing, None)
        .await
        .unwrap();

    env.pipeline().process_next().await.unwrap();

    let record = env.db.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Processed);
    assert_eq!(env.db.build_report(file_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_file_per_tick() {
    let env = TestEnv::new().await;
    let row = format!("{HEADER}\nF1,string,2020-01-01,,,,survey,\n");
    let a = env.write_file("a.csv", &row);
    let b = env.write_file("b.csv", &row);

    let id_a = env.db.register_file(&a, "FIELD", "").await.unwrap();
    let id_b = env.db.register_file(&b, "FIELD", "").await.unwrap();

    let pipeline = env.pipeline();
    pipeline.process_next().await.unwrap();

    assert_eq!(
        env.db.get_file(id_a).await.unwrap().unwrap().status,
        FileStatus::Processed
    );
    assert_eq!(
        env.db.get_file(id_b).await.unwrap().unwrap().status,
        FileStatus::Pending
    );

    pipeline.process_next().await.unwrap();
    assert_eq!(
        env.db.get_file(id_b).await.unwrap().unwrap().status,
        FileStatus::Processed
    );
    assert!(!pipeline.process_next().await.unwrap());
}

#[tokio::test]
async fn test_unreadable_file_leaves_status_for_retry() {
    let env = TestEnv::new().await;
    let path = env.write_file(
        "vanishing.csv",
        &format!("{HEADER}\nF1,string,2020-01-01,,,,survey,\n"),
    );

    let file_id = env.db.register_file(&path, "FIELD", "").await.unwrap();
    fs::remove_file(&path).unwrap();

    let result = env.pipeline().process_next().await;
    assert!(result.is_err());

    // Status untouched; the next poll will reconsider the file
    let record = env.db.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Pending);
}

#[tokio::test]
async fn test_unknown_datatype_is_terminal() {
    let env = TestEnv::new().await;
    let path = env.write_file(
        "odd.csv",
        &format!("{HEADER}\nF1,string,2020-01-01,,,,survey,\n"),
    );

    let file_id = env.db.register_file(&path, "SEISMIC", "").await.unwrap();
    env.pipeline().process_next().await.unwrap();

    let record = env.db.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Error);
    assert!(record.remarks.unwrap().contains("no ruleset"));
}

#[tokio::test]
async fn test_watcher_feeds_registry() {
    let env = TestEnv::new().await;
    env.write_file(
        "dropped.csv",
        &format!("{HEADER}\nF1,string,2020-01-01,,,,survey,\n"),
    );
    env.write_file("ignored.txt", "not tabular");

    let mut watcher = DirWatcher::new(WatcherConfig::new(&env.watch_dir));
    let new_files = watcher.scan_once().unwrap();
    assert_eq!(new_files.len(), 1);

    for path in new_files {
        env.db.register_file(&path, "FIELD", "").await.unwrap();
    }

    env.pipeline().process_next().await.unwrap();
    let record = env.db.get_file(1).await.unwrap().unwrap();
    assert_eq!(record.filename, "dropped.csv");
    assert_eq!(record.status, FileStatus::Processed);

    // Re-scan registers nothing new
    assert!(watcher.scan_once().unwrap().is_empty());
}
