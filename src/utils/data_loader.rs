//! Loading observation tables from disk and writing results back

use crate::error::{EnergyError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
}

impl FileFormat {
    /// Detect the format from the file extension; unknown extensions read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "tsv" => FileFormat::Tsv,
            "json" => FileFormat::Json,
            "jsonl" | "ndjson" => FileFormat::JsonLines,
            _ => FileFormat::Csv,
        }
    }
}

/// Data loader for observation files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for CSV schema inference; `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>, separator: u8) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;

        let parse_opts = CsvParseOptions::default().with_separator(separator);
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| EnergyError::Data(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Load a JSON array of records or newline-delimited JSON
    pub fn load_json(&self, path: impl AsRef<Path>, format: JsonFormat) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;

        JsonReader::new(file)
            .with_json_format(format)
            .finish()
            .map_err(|e| EnergyError::Data(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Detect the format from the extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        let df = match FileFormat::from_path(path) {
            FileFormat::Csv => self.load_csv(path, b',')?,
            FileFormat::Tsv => self.load_csv(path, b'\t')?,
            FileFormat::Json => self.load_json(path, JsonFormat::Json)?,
            FileFormat::JsonLines => self.load_json(path, JsonFormat::JsonLines)?,
        };

        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded observations"
        );
        Ok(df)
    }
}

/// Writes frames to disk
pub struct DataSaver;

impl DataSaver {
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file).finish(df)?;
        Ok(())
    }
}
