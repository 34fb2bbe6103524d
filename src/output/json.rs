//! JSON output
//!
//! Writes the crawl result as a pretty-printed JSON document:
//! `{ "metadata": { ... }, "records": [ ... ] }`.

use crate::output::traits::{CrawlResult, OutputHandler, OutputResult};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes crawl results to a JSON file
#[derive(Debug, Clone)]
pub struct JsonOutputHandler {
    path: PathBuf,
}

impl JsonOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `path` when given, otherwise a timestamped file in the working directory
    pub fn from_option(path: Option<&str>) -> Self {
        match path {
            Some(path) => Self::new(path),
            None => Self::new(default_output_path(&Local::now())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for JsonOutputHandler {
    fn write(&self, result: &CrawlResult) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, result)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::info!(
            "Wrote {} records to {}",
            result.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Default output file name, e.g. `harvest_20240131_154500.json`
pub fn default_output_path(time: &DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("harvest_{}.json", time.format("%Y%m%d_%H%M%S")))
}
