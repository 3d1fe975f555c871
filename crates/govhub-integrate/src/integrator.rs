//! Left-outer record linkage from the primary table
//!
//! Every primary row produces exactly one output row, matched or not;
//! unmatched secondary rows are not emitted. Matched secondary columns are
//! merged under a `{source}_` prefix, which doubles as the provenance tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::index::JoinIndex;
use crate::Result;
use govhub_common::types::Table;

/// Counts describing how the join went: records per source, matches per
/// secondary, total integrated rows. Read-only once computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub source_counts: BTreeMap<String, usize>,
    pub match_counts: BTreeMap<String, usize>,
    pub total_integrated: usize,
}

impl MatchStatistics {
    /// Match rate of one secondary against the primary record count.
    pub fn match_rate(&self, primary: &str, secondary: &str) -> f64 {
        let primary_count = self.source_counts.get(primary).copied().unwrap_or(0);
        let matches = self.match_counts.get(secondary).copied().unwrap_or(0);
        if primary_count == 0 {
            0.0
        } else {
            matches as f64 / primary_count as f64 * 100.0
        }
    }

    /// Persist the statistics as a JSON artifact for the reporting layer.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(govhub_common::GovError::Serialization)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Join secondary tables onto the primary by their declared key columns.
///
/// The primary row's `primary_key` value is looked up in each secondary's
/// [`JoinIndex`]; on a hit the secondary's columns are merged in with the
/// source name as prefix and that pair's match counter is incremented.
/// Cardinality is preserved: `output.len() == primary.len()` regardless of
/// secondary contents.
pub fn integrate(
    primary_name: &str,
    primary: &Table,
    primary_key: &str,
    secondaries: &BTreeMap<String, Table>,
    join_keys: &BTreeMap<String, String>,
) -> (Table, MatchStatistics) {
    let mut stats = MatchStatistics::default();
    stats
        .source_counts
        .insert(primary_name.to_string(), primary.len());

    // Index phase: one read-only index per secondary
    let mut indexes: BTreeMap<&str, JoinIndex> = BTreeMap::new();
    for (name, table) in secondaries {
        stats.source_counts.insert(name.clone(), table.len());
        stats.match_counts.insert(name.clone(), 0);
        match join_keys.get(name) {
            Some(key_column) => {
                indexes.insert(name.as_str(), JoinIndex::build(table, key_column));
            },
            None => {
                warn!(source = %name, "no join key declared, source contributes no matches");
            },
        }
    }

    // Join phase
    let mut output = Table::new();
    for row in primary.rows() {
        let mut integrated = row.clone();
        let key_value = row.get(primary_key).unwrap_or("");

        if !key_value.is_empty() {
            for (name, index) in &indexes {
                if let Some(matched) = index.get(key_value) {
                    for (column, value) in matched.iter() {
                        integrated.insert(format!("{}_{}", name, column), value);
                    }
                    if let Some(count) = stats.match_counts.get_mut(*name) {
                        *count += 1;
                    }
                }
            }
        }

        output.push_row(integrated);
        stats.total_integrated += 1;
    }

    info!(
        total = stats.total_integrated,
        matches = ?stats.match_counts,
        "integration complete"
    );
    (output, stats)
}

/// Write the integrated table with the sorted union of all columns.
///
/// Rows lacking a column get an empty cell, keeping the artifact
/// rectangular even though matches vary per row.
pub fn write_integrated_csv(table: &Table, path: &Path) -> Result<()> {
    let columns = table.union_columns();
    table.write_csv_with_columns(path, &columns)?;
    info!(path = %path.display(), records = table.len(), "integrated data saved");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use govhub_common::types::Record;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn table(rows: &[&[(&str, &str)]]) -> Table {
        rows.iter().map(|pairs| record(pairs)).collect()
    }

    fn keys(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_end_to_end_join_scenario() {
        let primary = table(&[
            &[("codigo_ug", "1"), ("v", "10")],
            &[("codigo_ug", "2"), ("v", "20")],
        ]);
        let mut secondaries = BTreeMap::new();
        secondaries.insert(
            "A".to_string(),
            table(&[&[("codigo_ug", "1"), ("x", "A1")]]),
        );
        secondaries.insert("B".to_string(), Table::new());
        let join_keys = keys(&[("A", "codigo_ug"), ("B", "codigo_ug")]);

        let (output, stats) = integrate("primary", &primary, "codigo_ug", &secondaries, &join_keys);

        assert_eq!(output.len(), 2);
        assert_eq!(output.rows()[0].get("A_x"), Some("A1"));
        assert_eq!(output.rows()[1].get("A_x"), None);

        assert_eq!(stats.source_counts["primary"], 2);
        assert_eq!(stats.source_counts["A"], 1);
        assert_eq!(stats.source_counts["B"], 0);
        assert_eq!(stats.match_counts["A"], 1);
        assert_eq!(stats.match_counts["B"], 0);
        assert_eq!(stats.total_integrated, 2);
    }

    #[test]
    fn test_cardinality_is_primary_length() {
        let primary = table(&[
            &[("codigo_ug", "1")],
            &[("codigo_ug", "1")],
            &[("codigo_ug", "9")],
            &[("outro", "x")],
        ]);
        let mut secondaries = BTreeMap::new();
        secondaries.insert(
            "compras".to_string(),
            table(&[
                &[("uasg", "1"), ("valor_total", "10")],
                &[("uasg", "2"), ("valor_total", "20")],
            ]),
        );
        let join_keys = keys(&[("compras", "uasg")]);

        let (output, stats) = integrate("siafi", &primary, "codigo_ug", &secondaries, &join_keys);

        // One output row per primary row, no multiplication, no drops
        assert_eq!(output.len(), primary.len());
        assert_eq!(stats.total_integrated, 4);
        // Both "1" rows matched
        assert_eq!(stats.match_counts["compras"], 2);
    }

    #[test]
    fn test_prefixed_columns_carry_provenance() {
        let primary = table(&[&[("codigo_ug", "153978"), ("valor_empenhado", "150000.00")]]);
        let mut secondaries = BTreeMap::new();
        secondaries.insert(
            "transferegov".to_string(),
            table(&[&[("codigo_siafi", "153978"), ("uf", "SP")]]),
        );
        let join_keys = keys(&[("transferegov", "codigo_siafi")]);

        let (output, _) = integrate("siafi", &primary, "codigo_ug", &secondaries, &join_keys);

        let row = &output.rows()[0];
        assert_eq!(row.get("transferegov_codigo_siafi"), Some("153978"));
        assert_eq!(row.get("transferegov_uf"), Some("SP"));
        // Original primary columns intact
        assert_eq!(row.get("valor_empenhado"), Some("150000.00"));
    }

    #[test]
    fn test_missing_join_key_declaration_contributes_nothing() {
        let primary = table(&[&[("codigo_ug", "1")]]);
        let mut secondaries = BTreeMap::new();
        secondaries.insert(
            "compras".to_string(),
            table(&[&[("uasg", "1"), ("x", "y")]]),
        );
        // No join key declared for "compras"
        let join_keys = BTreeMap::new();

        let (output, stats) = integrate("siafi", &primary, "codigo_ug", &secondaries, &join_keys);
        assert_eq!(output.len(), 1);
        assert_eq!(output.rows()[0].get("compras_x"), None);
        assert_eq!(stats.match_counts["compras"], 0);
    }

    #[test]
    fn test_match_rate() {
        let mut stats = MatchStatistics::default();
        stats.source_counts.insert("siafi".to_string(), 4);
        stats.match_counts.insert("compras".to_string(), 1);
        assert_eq!(stats.match_rate("siafi", "compras"), 25.0);
        assert_eq!(stats.match_rate("nao_existe", "compras"), 0.0);
    }

    #[test]
    fn test_write_integrated_csv_union_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("integrated.csv");

        let primary = table(&[
            &[("codigo_ug", "1"), ("v", "10")],
            &[("codigo_ug", "2"), ("v", "20")],
        ]);
        let mut secondaries = BTreeMap::new();
        secondaries.insert(
            "A".to_string(),
            table(&[&[("codigo_ug", "1"), ("x", "A1")]]),
        );
        let join_keys = keys(&[("A", "codigo_ug")]);

        let (output, _) = integrate("p", &primary, "codigo_ug", &secondaries, &join_keys);
        write_integrated_csv(&output, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        // Sorted union of all columns across rows
        assert_eq!(lines.next(), Some("A_codigo_ug,A_x,codigo_ug,v"));
        assert_eq!(lines.next(), Some("1,A1,1,10"));
        // Unmatched row keeps the full schema with empty cells
        assert_eq!(lines.next(), Some(",,2,20"));
    }
}
