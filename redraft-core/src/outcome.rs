//! # Execution outcomes
//!
//! What running an artifact produced. A success carries [`Evidence`] - the
//! material reflection is grounded on - and a failure carries the captured
//! error text. Runners never crash the process over a bad artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A tabular result set with every cell rendered to text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Append a row. Row length is the caller's responsibility.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a markdown pipe table (header, rule, rows).
    ///
    /// This is the form embedded into reflection prompts and printed by the
    /// CLI. An empty result still renders its header so the model can see
    /// which columns came back; a result with no columns at all (a query
    /// that matched nothing) renders as a note instead.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return "(empty result set)\n".to_string();
        }
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(&self.columns.join(" | "));
        out.push_str(" |\n| ");
        out.push_str(&vec!["---"; self.columns.len()].join(" | "));
        out.push_str(" |\n");
        for row in &self.rows {
            out.push_str("| ");
            out.push_str(&row.join(" | "));
            out.push_str(" |\n");
        }
        out
    }
}

/// The success payload of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Evidence {
    /// A query produced rows
    Table(ResultTable),
    /// A script persisted a file (the saved chart)
    File(PathBuf),
}

impl Evidence {
    /// One-line description for progress output
    pub fn describe(&self) -> String {
        match self {
            Evidence::Table(table) => {
                format!("{} row(s), {} column(s)", table.len(), table.columns.len())
            }
            Evidence::File(path) => format!("saved {}", path.display()),
        }
    }
}

/// How one artifact execution ended, as recorded in the run aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Success(Evidence),
    Failure(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// The evidence, when the execution succeeded
    pub fn evidence(&self) -> Option<&Evidence> {
        match self {
            ExecutionOutcome::Success(evidence) => Some(evidence),
            ExecutionOutcome::Failure(_) => None,
        }
    }

    /// The captured error, when the execution failed
    pub fn failure(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success(_) => None,
            ExecutionOutcome::Failure(reason) => Some(reason),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success(evidence) => write!(f, "ok: {}", evidence.describe()),
            ExecutionOutcome::Failure(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new(vec!["color".to_string(), "total".to_string()]);
        table.push_row(vec!["red".to_string(), "1200.5".to_string()]);
        table.push_row(vec!["blue".to_string(), "890.0".to_string()]);
        table
    }

    #[test]
    fn test_markdown_rendering() {
        let md = sample_table().to_markdown();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| color | total |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| red | 1200.5 |");
        assert_eq!(lines[3], "| blue | 890.0 |");
    }

    #[test]
    fn test_markdown_empty_table_keeps_header() {
        let table = ResultTable::new(vec!["id".to_string()]);
        let md = table.to_markdown();
        assert!(md.starts_with("| id |"));
        assert_eq!(md.lines().count(), 2);
    }

    #[test]
    fn test_markdown_no_columns() {
        assert_eq!(ResultTable::default().to_markdown(), "(empty result set)\n");
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = ExecutionOutcome::Success(Evidence::Table(sample_table()));
        assert!(ok.is_success());
        assert!(ok.evidence().is_some());
        assert!(ok.failure().is_none());

        let failed = ExecutionOutcome::Failure("no such column: colr".to_string());
        assert!(!failed.is_success());
        assert_eq!(failed.failure(), Some("no such column: colr"));
    }

    #[test]
    fn test_describe() {
        let evidence = Evidence::Table(sample_table());
        assert_eq!(evidence.describe(), "2 row(s), 2 column(s)");

        let evidence = Evidence::File(PathBuf::from("chart_v1.png"));
        assert!(evidence.describe().contains("chart_v1.png"));
    }
}
