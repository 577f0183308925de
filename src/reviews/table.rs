//! Uploaded review tables.
//!
//! Cells are kept exactly as they were read so that every original field can
//! be written back out unchanged. Type information (numeric vs text columns,
//! missing values) is derived on demand.

use std::collections::HashMap;
use std::io::Read;

use serde::Serialize;

use crate::core::{Result, SentimentError};

/// Cell values treated as missing, matching what spreadsheet and dataframe
/// tools write for empty or not-a-number entries.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_marker(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell)
}

fn is_numeric(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty() && (cell.parse::<i64>().is_ok() || cell.parse::<f64>().is_ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every non-missing cell is a number.
    Numeric,
    /// At least one non-missing cell is not a number.
    Text,
    /// Every cell is missing.
    Empty,
}

/// One row of an uploaded table, aligned with the table's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    cells: Vec<String>,
}

impl ReviewRecord {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Raw cell text at `index`, or `None` past the end of the row.
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// Cell at `index` with missing markers mapped to `None`.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.raw(index).filter(|cell| !is_null_marker(cell))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewTable {
    headers: Vec<String>,
    rows: Vec<ReviewRecord>,
}

impl ReviewTable {
    /// Build a table from headers and rows. Short rows are padded with empty
    /// cells; long rows are rejected.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(SentimentError::EmptyTable);
        }
        let headers = dedupe_headers(headers);
        let width = headers.len();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut cells)| {
                if cells.len() > width {
                    return Err(SentimentError::MalformedCsv {
                        line: index as u64 + 2,
                        message: format!("expected {width} fields, saw {}", cells.len()),
                    });
                }
                cells.resize(width, String::new());
                Ok(ReviewRecord::new(cells))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, rows })
    }

    /// Parse CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.to_string()
            })
            .collect();
        if headers.is_empty() {
            return Err(SentimentError::EmptyTable);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                let line = record.position().map_or(0, |p| p.line());
                return Err(SentimentError::MalformedCsv {
                    line,
                    message: format!("expected {} fields, saw {}", headers.len(), record.len()),
                });
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Self::new(headers, rows)?;
        tracing::debug!(
            rows = table.len(),
            columns = table.headers.len(),
            "parsed review table"
        );
        Ok(table)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[ReviewRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column_kind(&self, index: usize) -> ColumnKind {
        let mut values = self.rows.iter().filter_map(|row| row.value(index)).peekable();
        if values.peek().is_none() {
            return ColumnKind::Empty;
        }
        if values.all(is_numeric) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    /// Columns that may hold review text, in header order.
    pub fn text_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| self.column_kind(*i) == ColumnKind::Text)
            .map(|(_, h)| h.as_str())
            .collect()
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[ReviewRecord] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Rename repeated headers to `name.1`, `name.2`, ... skipping names that are
/// already taken.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: std::collections::HashSet<String> = headers.iter().cloned().collect();
    let mut out = Vec::with_capacity(headers.len());

    for header in headers {
        let count = seen.entry(header.clone()).or_insert(0);
        if *count == 0 {
            *count = 1;
            out.push(header);
            continue;
        }
        let mut candidate = format!("{header}.{count}");
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{header}.{count}");
        }
        *count += 1;
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
