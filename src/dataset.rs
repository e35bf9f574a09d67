//! # Dataset Port
//!
//! The core only needs three things from the spreadsheet collaborator:
//! enumerate columns, enumerate rows by stable 0-based index, and read a
//! named column's value (missing reads as the empty string).
//!
//! [`MemoryTable`] is the bundled implementation; it loads a JSON array of
//! flat objects, which is the structured hand-off format the surrounding
//! application exports its spreadsheet into.

use crate::error::PlacardError;
use chrono::NaiveTime;
use indexmap::IndexMap;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read-only tabular dataset.
pub trait DataTable {
    /// Column headers, whitespace-trimmed.
    fn columns(&self) -> &[String];

    /// Number of rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of `column` for `row`. Missing column, missing row, or missing
    /// cell all read as the empty string.
    fn value(&self, row: usize, column: &str) -> String;
}

/// Case-insensitive "header contains alias" lookup.
///
/// Returns the first column whose header contains any alias, or `None` —
/// a normal outcome, not an error.
pub fn find_column<'a>(table: &'a dyn DataTable, aliases: &[&str]) -> Option<&'a str> {
    for column in table.columns() {
        let lower = column.to_lowercase();
        for alias in aliases {
            if lower.contains(&alias.to_lowercase()) {
                return Some(column);
            }
        }
    }
    None
}

/// Normalize a raw dataset value for drawing.
///
/// Missing-value markers become the empty string, and date-times with a
/// zero time-of-day keep only the date portion (spreadsheet date cells
/// commonly export as "2024-05-01 00:00:00").
pub fn normalize_value(raw: &str) -> String {
    let value = raw.trim_end();
    if value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("nat") {
        return String::new();
    }
    if let Some((date, time)) = value.split_once(' ') {
        let midnight = NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S%.f"))
            .is_ok_and(|t| t == NaiveTime::MIN);
        if midnight {
            return date.to_string();
        }
    }
    value.to_string()
}

/// In-memory dataset.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MemoryTable {
    /// Build from headers and rows. Headers are trimmed; short rows read
    /// as empty in the missing cells.
    pub fn new<C, R, V>(columns: C, rows: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = V>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|c| c.into().trim().to_string())
                .collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Load a JSON array of flat objects. Column order is first-seen order
    /// across the records; scalar values stringify, null reads as empty.
    pub fn from_json_reader(reader: impl Read) -> Result<Self, PlacardError> {
        let records: Vec<IndexMap<String, Value>> = serde_json::from_reader(reader)?;

        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                let trimmed = key.trim();
                if !columns.iter().any(|c| c == trimmed) {
                    columns.push(trimmed.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| {
                        record
                            .iter()
                            .find(|(k, _)| k.trim() == column)
                            .map(|(_, v)| scalar_to_string(v))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlacardError> {
        let file = File::open(path.as_ref())
            .map_err(|e| PlacardError::Dataset(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json_reader(BufReader::new(file))
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl DataTable for MemoryTable {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, column: &str) -> String {
        let Some(col_idx) = self.columns.iter().position(|c| c == column) else {
            return String::new();
        };
        self.rows
            .get(row)
            .and_then(|r| r.get(col_idx))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryTable {
        MemoryTable::new(
            ["Full Name", "Gender", "CCCD Number"],
            vec![
                vec!["An", "F", "0123"],
                vec!["Binh", "M", ""],
                vec!["Chi"], // short row
            ],
        )
    }

    #[test]
    fn test_missing_reads_as_empty() {
        let table = sample();
        assert_eq!(table.value(1, "CCCD Number"), "");
        assert_eq!(table.value(2, "Gender"), "");
        assert_eq!(table.value(99, "Full Name"), "");
        assert_eq!(table.value(0, "No Such Column"), "");
    }

    #[test]
    fn test_find_column_is_case_insensitive_contains() {
        let table = sample();
        assert_eq!(find_column(&table, &["cccd", "CMND"]), Some("CCCD Number"));
        assert_eq!(find_column(&table, &["name"]), Some("Full Name"));
        assert_eq!(find_column(&table, &["area"]), None);
    }

    #[test]
    fn test_headers_are_trimmed() {
        let table = MemoryTable::new(["  Name  "], vec![vec!["An"]]);
        assert_eq!(table.columns(), ["Name"]);
        assert_eq!(table.value(0, "Name"), "An");
    }

    #[test]
    fn test_normalize_missing_markers() {
        assert_eq!(normalize_value("nan"), "");
        assert_eq!(normalize_value("NaN"), "");
        assert_eq!(normalize_value("NaT"), "");
        assert_eq!(normalize_value("An"), "An");
    }

    #[test]
    fn test_normalize_keeps_date_of_midnight_timestamps() {
        assert_eq!(normalize_value("2024-05-01 00:00:00"), "2024-05-01");
        assert_eq!(normalize_value("01/05/2024 00:00:00.000"), "01/05/2024");
        // Non-midnight timestamps pass through untouched
        assert_eq!(normalize_value("2024-05-01 08:30:00"), "2024-05-01 08:30:00");
        // Plain values with spaces pass through
        assert_eq!(normalize_value("Khu A"), "Khu A");
    }

    #[test]
    fn test_from_json_preserves_column_order_and_types() {
        let json = r#"[
            {"Name": "An", "Age": 30, "Area": null},
            {"Name": "Binh", "Age": 25, "Extra": "x"}
        ]"#;
        let table = MemoryTable::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Name", "Age", "Area", "Extra"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "Age"), "30");
        assert_eq!(table.value(0, "Area"), "");
        assert_eq!(table.value(0, "Extra"), "");
        assert_eq!(table.value(1, "Extra"), "x");
    }
}
