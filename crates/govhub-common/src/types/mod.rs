//! Core data model shared by acquisition and integration
//!
//! Upstream government exports are loosely typed, so the unit of exchange is
//! a [`Record`]: an ordered column-name → raw-string mapping. A missing
//! column and an empty value are distinct states and both survive the whole
//! pipeline; nothing is collapsed to a default.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;

/// Expected payload kind of one endpoint.
///
/// Serde tags match the `format` field of the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Flat tabular file served directly (format: "csv")
    Csv,
    /// ZIP archive wrapping one or more tabular members (format: "zip")
    Zip,
    /// Offset-paginated JSON API (format: "json")
    Json,
}

/// One alternative access path for a logical source.
///
/// Endpoints are immutable and ordered within a source; they are tried in
/// declared order and the first success wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub format: PayloadKind,
    #[serde(default)]
    pub description: String,
}

/// A logical dataset with its ordered endpoint alternatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default)]
    pub urls: Vec<EndpointSpec>,
}

/// A single row: column name → raw string value, order-irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a column; `None` means the column is absent from this row,
    /// which is not the same as an empty value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Record {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// An ordered sequence of records sharing one column set.
///
/// Rows may be ragged (columns varying per row) until the join stage; the
/// loader does not require rectangularity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with a fixed column order.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, registering any columns not seen before.
    pub fn push_row(&mut self, record: Record) {
        for column in record.columns() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all columns ever seen across rows, sorted for stable output.
    pub fn union_columns(&self) -> Vec<String> {
        let mut all: BTreeSet<String> = self.columns.iter().cloned().collect();
        for row in &self.rows {
            for column in row.columns() {
                all.insert(column.to_string());
            }
        }
        all.into_iter().collect()
    }

    /// Write the table as UTF-8 CSV with the table's column order.
    ///
    /// Cells absent from a row are written as empty values.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        self.write_csv_with_columns(path, &self.columns)
    }

    /// Write the table as UTF-8 CSV with an explicit column order.
    pub fn write_csv_with_columns(&self, path: &Path, columns: &[String]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(columns)?;
        for row in &self.rows {
            let cells: Vec<&str> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(""))
                .collect();
            writer.write_record(&cells)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut table = Table::new();
        for record in iter {
            table.push_row(record);
        }
        table
    }
}
