//! Fieldflow Watcher - file discovery for the ingestion pipeline.
//!
//! Watches one directory (no recursion) for files with a configured
//! extension and invokes a registration callback exactly once per newly
//! observed file. The seen set lives in process memory only; it is a
//! debounce, not a dedup mechanism - a restart forgets history and already
//! registered files will be re-registered as new submissions.

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch. Subdirectories are not scanned.
    pub dir: PathBuf,
    /// File extension to consider, without the leading dot.
    pub extension: String,
    /// Fixed polling interval.
    pub interval: Duration,
}

impl WatcherConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "csv".to_string(),
            interval: Duration::from_secs(5),
        }
    }
}

/// Polls a directory and reports files not seen before in this process.
pub struct DirWatcher {
    config: WatcherConfig,
    seen: HashSet<PathBuf>,
}

impl DirWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
        }
    }

    /// One polling tick: enumerate candidates, diff against the seen set,
    /// and return the newly observed files.
    ///
    /// New files are added to the seen set before the caller gets them, so
    /// a failing registration is not retried; the file counts as observed.
    pub fn scan_once(&mut self) -> std::io::Result<Vec<PathBuf>> {
        let mut new_files = Vec::new();

        for entry in std::fs::read_dir(&self.config.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            let matches = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(&self.config.extension))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            if self.seen.insert(path.clone()) {
                new_files.push(path);
            }
        }

        Ok(new_files)
    }

    /// Run forever, invoking `on_new_file` once per newly observed file.
    ///
    /// A failed tick (directory unreadable, permissions) is logged and the
    /// next tick retries; the loop never terminates on its own.
    pub async fn run<F, Fut>(mut self, mut on_new_file: F)
    where
        F: FnMut(PathBuf) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(
            dir = %self.config.dir.display(),
            extension = %self.config.extension,
            interval_secs = self.config.interval.as_secs(),
            "Watching directory for new files"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        loop {
            ticker.tick().await;

            match self.scan_once() {
                Ok(new_files) => {
                    for path in new_files {
                        info!(path = %path.display(), "New file detected");
                        on_new_file(path).await;
                    }
                }
                Err(e) => {
                    warn!(dir = %self.config.dir.display(), error = %e, "Polling tick failed");
                }
            }

            debug!("Watcher tick complete");
        }
    }
}
