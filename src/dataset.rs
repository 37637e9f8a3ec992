//! Append-only CSV log of generated images.

use log::debug;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{parse_image_index, ImageRecord};

pub const LOG_FILE_NAME: &str = "rendered_data.csv";
const HEADER: [&str; 3] = ["ImageName", "Violation", "Distance"];

#[derive(Debug, Clone)]
pub struct DatasetLog {
    path: PathBuf,
}

impl DatasetLog {
    /// Log at `<output_dir>/rendered_data.csv`
    pub fn in_dir(output_dir: impl AsRef<Path>) -> Self {
        Self::at(output_dir.as_ref().join(LOG_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index embedded in the last data row, if any. A last row without an
    /// image index is an error: continuing from the fallback would reuse
    /// names already on disk.
    pub fn last_index(&self) -> Result<Option<u64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut last = None;
        for row in reader.records() {
            let row = row?;
            if let Some(name) = row.get(0) {
                last = Some(name.to_string());
            }
        }
        match last {
            None => Ok(None),
            Some(name) => parse_image_index(&name).map(Some).ok_or_else(|| {
                Error::DatasetLog(format!(
                    "{}: last row `{}` carries no image index",
                    self.path.display(),
                    name
                ))
            }),
        }
    }

    /// Continues after the last logged image, or starts at `fallback` for a
    /// fresh log
    pub fn next_index(&self, fallback: u64) -> Result<u64> {
        Ok(self.last_index()?.map_or(fallback, |last| last + 1))
    }

    pub fn append(&self, record: &ImageRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record([
            record.image_name(),
            u8::from(record.safety_violation).to_string(),
            record.min_distance.to_string(),
        ])?;
        writer.flush()?;
        debug!("Logged {} to {:?}", record.image_name(), self.path);
        Ok(())
    }
}
