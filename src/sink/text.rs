//! Plain-text record sink
//!
//! Each record is appended as a block of `Label: value` lines followed by a
//! rule of dashes, with product information rows indented under their own
//! heading. The file is only ever appended to.

use crate::queue::DetailRecord;
use crate::sink::{RecordSink, RunStatus, SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const RECORD_SEPARATOR: &str = "--------------------------------------------------";

/// Appends records to a text file
pub struct TextFileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TextFileSink {
    /// Opens `path` for appending, creating it and its parent directories
    pub fn open(path: &Path) -> SinkResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Formats a record the way it appears in the text file
pub fn format_record(record: &DetailRecord) -> String {
    let mut out = format!(
        "Title: {}\nPrice: {}\nAvailability: {}\nRating: {}\nCategory: {}\nImage: {}\nDescription: {}\nURL: {}\n",
        record.title,
        record.price,
        record.availability,
        record.rating,
        record.category,
        record.image_url,
        record.description,
        record.url,
    );

    if !record.product_information.is_empty() {
        out.push_str("Product Information:\n");
        for (name, value) in &record.product_information {
            out.push_str(&format!("  {}: {}\n", name, value));
        }
    }

    out.push_str(RECORD_SEPARATOR);
    out.push('\n');
    out
}

impl RecordSink for TextFileSink {
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(format_record(record).as_bytes())?;
        // Flush per record so a killed run keeps everything stored so far.
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            tracing::debug!(
                "Closed record file {} ({})",
                self.path.display(),
                status.to_db_string()
            );
        }
        Ok(())
    }
}
