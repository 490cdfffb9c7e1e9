// 📂 Table Loader - CSV ⇄ in-memory row/column table
//
// Every stage of the pipeline consumes and produces a `Table`. Cells are
// kept as optional text; typing happens in the stage that needs it.

use crate::error::PipelineError;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Cell values read as missing (the usual spreadsheet/pandas NA markers)
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "n/a", "NA", "<NA>", "NULL", "null", "NaN", "-NaN", "nan",
    "-nan", "None",
];

/// Tag bytes for hashed cells; present cells are followed by a length prefix
const FINGERPRINT_MISSING: u8 = 0;
const FINGERPRINT_PRESENT: u8 = 1;

pub fn is_missing(raw: &str) -> bool {
    NA_VALUES.contains(&raw)
}

/// Lenient numeric coercion: non-numeric text becomes `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Render a number the way the cleaned files expect: integral values
/// without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals. Missing cells are `None`.
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.into_iter().map(|c| c.map(str::to_string)).collect());
        }
        table
    }

    /// Append a row, padding short rows with missing cells and dropping
    /// cells beyond the header width.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Read CSV with a header line from any reader
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(headers);

        for result in rdr.records() {
            let record = result?;
            let row = record
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }

    /// Load a CSV file. Every way the file can fail to be read maps to an
    /// error for which `is_read_failure()` is true.
    pub fn load_csv(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }

        let file = fs::File::open(path).map_err(|source| PipelineError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Table::from_reader(file).map_err(|source| PipelineError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(PipelineError::NoHeader(path.to_path_buf()));
        }

        debug!(
            "Loaded {}: {} rows, {} columns",
            path.display(),
            table.len(),
            table.width()
        );
        Ok(table)
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the table as CSV, creating parent directories as needed
    pub fn write_csv(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::File::create(path)?;
        self.to_writer(file).map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Indices of columns whose header starts with `prefix`, in table order
    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_deref())
    }

    // ========================================================================
    // DEDUPLICATION
    // ========================================================================

    /// SHA-256 over every cell of the row; equal rows (missing == missing)
    /// produce equal fingerprints. Each cell is tagged and length-prefixed,
    /// so the encoding is unambiguous for any cell text.
    pub fn row_fingerprint(row: &[Option<String>]) -> String {
        let mut hasher = Sha256::new();
        for cell in row {
            match cell {
                Some(value) => {
                    hasher.update([FINGERPRINT_PRESENT]);
                    hasher.update((value.len() as u64).to_le_bytes());
                    hasher.update(value.as_bytes());
                }
                None => hasher.update([FINGERPRINT_MISSING]),
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Drop exact duplicate rows, keeping the first occurrence
    pub fn drop_duplicates(&self) -> Table {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(Table::row_fingerprint(row)))
            .cloned()
            .collect();

        Table {
            headers: self.headers.clone(),
            rows,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
