//! CSV sink for samples, one file per cycle.
//!
//! The header goes out as soon as the file is created, so even a cycle
//! interrupted before its first poll leaves a well-formed file. Each row is
//! flushed when appended; a file closed early holds only complete rows.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use tracing::debug;

use super::sample::{Sample, CSV_HEADER};

/// Appends [`Sample`] rows to an open CSV file.
pub struct SampleLogger {
    writer: Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl SampleLogger {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: impl AsRef<Path>) -> csv::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        debug!("Opened sample log {}", path.display());

        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    pub fn append(&mut self, sample: &Sample) -> csv::Result<()> {
        self.writer.serialize(sample)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the file.
    pub fn close(mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        debug!("Closed {} after {} rows", self.path.display(), self.rows);
        Ok(())
    }
}
