//! # Dataset profiling
//!
//! The chart variant prompts a model to write code against a dataframe it
//! cannot see. The profile built here is what the model gets instead: column
//! names, inferred kinds, and row count, read straight from the CSV so the
//! prompt never describes columns that do not exist.

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How many data rows are sampled for kind inference
pub const SAMPLE_ROWS: usize = 200;

/// Inferred kind of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Every sampled value parsed as an integer
    Integer,
    /// Every sampled value parsed as a number, not all integral
    Number,
    /// Every sampled value looked like an ISO date (YYYY-MM-DD...)
    Date,
    /// Anything else
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Number => "number",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        }
    }
}

/// Profile of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Empty cells seen while sampling
    pub nulls: usize,
}

/// Read-only description of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    /// Profile a CSV file: header names plus kinds inferred from the first
    /// [`SAMPLE_ROWS`] records. The full file is scanned for the row count.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            error::dataset_invalid(format!("cannot open {}: {}", path.display(), e))
                .with_operation("dataset::from_csv")
                .set_source(e)
        })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| {
                error::dataset_invalid(format!("cannot read header row: {}", e))
                    .with_operation("dataset::from_csv")
                    .set_source(e)
            })?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            return Err(error::dataset_invalid("dataset has no header row")
                .with_operation("dataset::from_csv")
                .with_context("path", path.display().to_string()));
        }

        let mut trackers: Vec<KindTracker> = headers.iter().map(|_| KindTracker::new()).collect();
        let mut rows = 0usize;
        for record in reader.records() {
            let record = record.map_err(|e| {
                error::dataset_invalid(format!("malformed record: {}", e))
                    .with_operation("dataset::from_csv")
                    .with_context("row", (rows + 1).to_string())
                    .set_source(e)
            })?;
            if rows < SAMPLE_ROWS {
                for (i, tracker) in trackers.iter_mut().enumerate() {
                    tracker.observe(record.get(i).unwrap_or(""));
                }
            }
            rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(trackers)
            .map(|(name, tracker)| ColumnProfile {
                name,
                kind: tracker.resolve(),
                nulls: tracker.nulls,
            })
            .collect();

        Ok(Self { path, rows, columns })
    }

    /// The dataset's file name for display and prompts
    pub fn source_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Render the profile as the schema section of a prompt, one column per
    /// line: `- price (number)`.
    pub fn schema_block(&self) -> String {
        let mut out = String::new();
        for column in &self.columns {
            out.push_str("- ");
            out.push_str(&column.name);
            out.push_str(" (");
            out.push_str(column.kind.as_str());
            if column.nulls > 0 {
                out.push_str(", sometimes empty");
            }
            out.push_str(")\n");
        }
        out
    }
}

/// Per-column observation state. Kinds only ever widen: integer -> number ->
/// text; date holds only while every value matches.
#[derive(Debug, Clone, Copy)]
struct KindTracker {
    saw_value: bool,
    all_integer: bool,
    all_number: bool,
    all_date: bool,
    nulls: usize,
}

impl KindTracker {
    fn new() -> Self {
        Self {
            saw_value: false,
            all_integer: true,
            all_number: true,
            all_date: true,
            nulls: 0,
        }
    }

    fn observe(&mut self, cell: &str) {
        let cell = cell.trim();
        if cell.is_empty() {
            self.nulls += 1;
            return;
        }
        self.saw_value = true;
        if cell.parse::<i64>().is_err() {
            self.all_integer = false;
        }
        if cell.parse::<f64>().is_err() {
            self.all_number = false;
        }
        if !is_date_like(cell) {
            self.all_date = false;
        }
    }

    fn resolve(&self) -> ColumnKind {
        if !self.saw_value {
            return ColumnKind::Text;
        }
        if self.all_integer {
            ColumnKind::Integer
        } else if self.all_number {
            ColumnKind::Number
        } else if self.all_date {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    }
}

/// `YYYY-MM-DD` prefix check, tolerant of trailing time components
fn is_date_like(cell: &str) -> bool {
    let bytes = cell.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_profile_kinds() {
        let file = write_csv(
            "date,coffee_name,price,quantity\n\
             2024-03-01,Latte,38.7,2\n\
             2024-03-02,Americano,28.9,1\n\
             2024-03-02,Latte,38.7,3\n",
        );
        let profile = DatasetProfile::from_csv(file.path()).unwrap();

        assert_eq!(profile.rows, 3);
        assert_eq!(profile.columns.len(), 4);
        assert_eq!(profile.columns[0].kind, ColumnKind::Date);
        assert_eq!(profile.columns[1].kind, ColumnKind::Text);
        assert_eq!(profile.columns[2].kind, ColumnKind::Number);
        assert_eq!(profile.columns[3].kind, ColumnKind::Integer);
    }

    #[test]
    fn test_mixed_column_widens_to_text() {
        let file = write_csv("v\n1\ntwo\n3\n");
        let profile = DatasetProfile::from_csv(file.path()).unwrap();
        assert_eq!(profile.columns[0].kind, ColumnKind::Text);
    }

    #[test]
    fn test_nulls_counted() {
        let file = write_csv("card\nANON-1\n\nANON-2\n");
        let profile = DatasetProfile::from_csv(file.path()).unwrap();
        assert_eq!(profile.columns[0].nulls, 1);
        assert!(profile.schema_block().contains("sometimes empty"));
    }

    #[test]
    fn test_schema_block_format() {
        let file = write_csv("price,coffee_name\n38.7,Latte\n");
        let profile = DatasetProfile::from_csv(file.path()).unwrap();
        let block = profile.schema_block();
        assert!(block.contains("- price (number)"));
        assert!(block.contains("- coffee_name (text)"));
    }

    #[test]
    fn test_missing_file() {
        let err = DatasetProfile::from_csv("/nonexistent/sales.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DatasetInvalid);
    }

    #[test]
    fn test_headers_only() {
        let file = write_csv("a,b\n");
        let profile = DatasetProfile::from_csv(file.path()).unwrap();
        assert_eq!(profile.rows, 0);
        // a column with no samples stays text
        assert_eq!(profile.columns[0].kind, ColumnKind::Text);
    }
}
