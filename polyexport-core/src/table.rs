//! CSV tables and the file writer that exports them

use crate::error::{ExportError, ExportResult};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rectangular table: a header row plus data rows of the same width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Create an empty table with the given header
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row
    ///
    /// Rows must have exactly as many cells as the header.
    pub fn push_row(&mut self, row: Vec<String>) -> ExportResult<()> {
        if row.len() != self.header.len() {
            return Err(ExportError::internal(format!(
                "row has {} cells, header has {}",
                row.len(),
                self.header.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (header excluded)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize to CSV text
    ///
    /// Rows are separated by `\n` with no trailing newline. Cells holding a
    /// comma, quote or line break are quoted with inner quotes doubled; every
    /// other cell is written verbatim.
    pub fn to_csv(&self) -> ExportResult<String> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());

        for record in std::iter::once(&self.header).chain(self.rows.iter()) {
            writer
                .write_record(record)
                .map_err(|e| ExportError::internal(format!("Failed to encode CSV row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::internal(format!("Failed to flush CSV: {}", e)))?;
        let mut text = String::from_utf8(bytes)
            .map_err(|e| ExportError::internal(format!("CSV is not UTF-8: {}", e)))?;

        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

/// Kind of export file, used as the filename prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Markets,
    Kline,
}

impl ExportKind {
    fn prefix(&self) -> &'static str {
        match self {
            ExportKind::Markets => "markets",
            ExportKind::Kline => "kline",
        }
    }

    /// `{prefix}_{slug}_{epochMillis}.csv`
    pub fn filename(&self, slug: &str, epoch_millis: i64) -> String {
        format!("{}_{}_{}.csv", self.prefix(), slug, epoch_millis)
    }
}

/// Writes CSV tables as files into an output directory
#[derive(Debug, Clone)]
pub struct CsvWriter {
    out_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Serialize `table` and save it as `filename` in the output directory
    ///
    /// The file is written to a `.part` sibling first and renamed into place,
    /// so a partially written export never carries the final name.
    pub fn download(&self, filename: &str, table: &CsvTable) -> ExportResult<PathBuf> {
        let text = table.to_csv()?;

        fs::create_dir_all(&self.out_dir)
            .map_err(|e| ExportError::io(self.out_dir.display().to_string(), e.to_string()))?;

        let path = self.out_dir.join(filename);
        let staging = self.out_dir.join(format!("{}.part", filename));
        debug!("Writing {} bytes to {}", text.len(), staging.display());

        fs::write(&staging, text.as_bytes())
            .map_err(|e| ExportError::io(staging.display().to_string(), e.to_string()))?;
        fs::rename(&staging, &path)
            .map_err(|e| ExportError::io(path.display().to_string(), e.to_string()))?;

        info!("Saved {} ({} rows)", path.display(), table.len());
        Ok(path)
    }
}
