//! Multi-encoding, multi-delimiter table loading
//!
//! Government exports are inconsistently encoded and delimited, so the
//! loader evaluates an ordered candidate list — encodings × delimiters —
//! lazily, first acceptable parse wins. This is graceful degradation, not
//! strict validation: individual malformed rows are skipped, and only a
//! file no candidate can decode is an error.

use encoding_rs::Encoding;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{IntegrateError, Result};
use govhub_common::types::{Record, Table};

/// Candidate encodings, in trial order. latin-1, cp1252 and iso-8859-1 all
/// resolve to windows-1252 under WHATWG labels; the list keeps the
/// configured order anyway.
const ENCODING_LABELS: [&str; 4] = ["utf-8", "latin-1", "cp1252", "iso-8859-1"];

/// Candidate delimiters, in trial order.
const DELIMITERS: [u8; 2] = [b';', b','];

/// Loads delimited files by trying candidate (encoding, delimiter) pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLoader {
    max_rows: Option<usize>,
}

impl TableLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of data rows loaded per file.
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows: Some(max_rows),
        }
    }

    /// Load a delimited file with the first candidate that parses.
    ///
    /// A candidate is rejected on a decode error. A candidate yielding a
    /// single column is deferred in favor of one yielding two or more —
    /// with the wrong delimiter a file still "parses", as one wide column —
    /// and used only when every candidate is single-column.
    pub fn load(&self, path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path)?;
        let mut fallback: Option<Table> = None;

        for label in ENCODING_LABELS {
            let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
                continue;
            };
            let Some(text) = decode_strict(encoding, &bytes) else {
                debug!(encoding = label, "decode failed, trying next encoding");
                continue;
            };

            for delimiter in DELIMITERS {
                let table = self.parse_delimited(&text, delimiter);
                if table.columns().len() >= 2 {
                    info!(
                        path = %path.display(),
                        encoding = label,
                        delimiter = delimiter as char,
                        records = table.len(),
                        "file loaded"
                    );
                    return Ok(table);
                }
                if fallback.is_none() {
                    fallback = Some(table);
                }
            }
        }

        match fallback {
            // Legitimate single-column file
            Some(table) => {
                info!(path = %path.display(), records = table.len(), "file loaded (single column)");
                Ok(table)
            },
            None => Err(IntegrateError::Decode(format!(
                "no encoding/delimiter candidate parsed {}",
                path.display()
            ))),
        }
    }

    /// Parse decoded text with one delimiter, skipping malformed rows.
    fn parse_delimited(&self, text: &str, delimiter: u8) -> Table {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(headers) => headers.iter().map(|h| h.to_string()).collect(),
            Err(_) => return Table::new(),
        };

        let mut table = Table::with_columns(headers.clone());
        for row in reader.records() {
            if let Some(cap) = self.max_rows {
                if table.len() >= cap {
                    break;
                }
            }
            match row {
                Ok(fields) => {
                    // Rows shorter than the header leave trailing columns
                    // missing; extra fields are dropped.
                    let record: Record = headers
                        .iter()
                        .zip(fields.iter())
                        .map(|(h, f)| (h.as_str(), f))
                        .collect();
                    table.push_row(record);
                },
                Err(e) => {
                    warn!(error = %e, "skipping malformed row");
                },
            }
        }
        table
    }
}

/// Decode without replacement characters; `None` means the bytes are not
/// valid in this encoding.
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|cow| cow.into_owned())
}

// ============================================================================
// Tests
// ============================================================================
