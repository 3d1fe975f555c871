//! Key-indexed lookup over a secondary table
//!
//! Built once per secondary table before the join, then read-only; lookups
//! are O(1) and safe to share across tasks.

use std::collections::HashMap;
use tracing::info;

use govhub_common::types::{Record, Table};

/// Join-key → record lookup structure.
///
/// On duplicate keys the *last* record observed wins; this tie-break is
/// part of the contract, not an accident of iteration order.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex {
    entries: HashMap<String, Record>,
}

impl JoinIndex {
    /// Index `table` by `key_column`.
    ///
    /// Rows with a missing or empty key are not indexed.
    pub fn build(table: &Table, key_column: &str) -> Self {
        let mut entries = HashMap::new();
        for row in table.rows() {
            match row.get(key_column) {
                Some(key) if !key.is_empty() => {
                    entries.insert(key.to_string(), row.clone());
                },
                _ => {},
            }
        }
        info!(key = key_column, entries = entries.len(), "join index built");
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_last_write_wins_on_duplicate_keys() {
        let mut table = Table::new();
        table.push_row(record(&[("uasg", "153978"), ("objeto", "primeiro")]));
        table.push_row(record(&[("uasg", "153978"), ("objeto", "segundo")]));

        let index = JoinIndex::build(&table, "uasg");
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("153978").unwrap().get("objeto"), Some("segundo"));
    }

    #[test]
    fn test_missing_and_empty_keys_skipped() {
        let mut table = Table::new();
        table.push_row(record(&[("uasg", ""), ("objeto", "vazio")]));
        table.push_row(record(&[("objeto", "sem chave")]));
        table.push_row(record(&[("uasg", "154357"), ("objeto", "ok")]));

        let index = JoinIndex::build(&table, "uasg");
        assert_eq!(index.len(), 1);
        assert!(index.get("").is_none());
        assert!(index.get("154357").is_some());
    }

    #[test]
    fn test_empty_table_builds_empty_index() {
        let index = JoinIndex::build(&Table::new(), "uasg");
        assert!(index.is_empty());
    }
}
