//! End-to-end integration pipeline: discover → load → index → join → emit
//!
//! Linear, with no partial-failure recovery mid-join. The primary table is
//! the only hard requirement; a secondary that is missing or unloadable is
//! logged and contributes zero matches.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::discover::discover_latest_files;
use crate::integrator::{integrate, write_integrated_csv, MatchStatistics};
use crate::loader::TableLoader;
use crate::{IntegrateError, Result};
use govhub_common::config::{AppConfig, IntegrationSettings};
use govhub_common::types::Table;

/// Filename of the integrated artifact.
pub const INTEGRATED_FILENAME: &str = "integrated_poc_data.csv";

/// Filename of the statistics artifact.
pub const STATS_FILENAME: &str = "integration_stats.json";

/// Runs the whole integration stage against the acquired artifacts.
pub struct IntegrationPipeline {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
    settings: IntegrationSettings,
    loader: TableLoader,
}

impl IntegrationPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            raw_dir: config.file_settings.raw_data_dir.clone(),
            processed_dir: config.file_settings.processed_data_dir.clone(),
            settings: config.integration_settings.clone(),
            loader: TableLoader::new(),
        }
    }

    /// Cap the rows loaded per table (useful for very large SIAFI dumps).
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.loader = TableLoader::with_max_rows(max_rows);
        self
    }

    /// Execute discovery, loading, the join and artifact emission.
    ///
    /// Fails only when the primary table is unavailable; everything else
    /// degrades to zero matches.
    pub fn execute(&self) -> Result<MatchStatistics> {
        info!("=== starting data integration ===");

        let primary_name = self.settings.primary_source.as_str();
        let mut wanted: Vec<&str> = vec![primary_name];
        wanted.extend(self.settings.secondary_keys.keys().map(String::as_str));

        let discovered = discover_latest_files(&self.raw_dir, &wanted);

        let primary_path = discovered
            .get(primary_name)
            .and_then(|p| p.clone())
            .ok_or_else(|| {
                IntegrateError::InputMissing(format!(
                    "no artifact found for primary source '{}'",
                    primary_name
                ))
            })?;
        let primary = self.loader.load(&primary_path)?;
        info!(source = %primary_name, records = primary.len(), "primary table loaded");

        let mut secondaries: BTreeMap<String, Table> = BTreeMap::new();
        for name in self.settings.secondary_keys.keys() {
            let table = match discovered.get(name).and_then(|p| p.clone()) {
                Some(path) => match self.loader.load(&path) {
                    Ok(table) => table,
                    Err(e) => {
                        warn!(source = %name, error = %e, "secondary table unloadable, zero matches");
                        Table::new()
                    },
                },
                None => {
                    warn!(source = %name, "secondary artifact missing, zero matches");
                    Table::new()
                },
            };
            secondaries.insert(name.clone(), table);
        }

        let (integrated, stats) = integrate(
            primary_name,
            &primary,
            &self.settings.primary_key,
            &secondaries,
            &self.settings.secondary_keys,
        );

        write_integrated_csv(&integrated, &self.processed_dir.join(INTEGRATED_FILENAME))?;
        stats.write_json(&self.processed_dir.join(STATS_FILENAME))?;

        info!("=== integration finished ===");
        Ok(stats)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use govhub_common::config::{DownloadSettings, FileSettings};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> AppConfig {
        AppConfig {
            data_sources: BTreeMap::new(),
            download_settings: DownloadSettings::default(),
            file_settings: FileSettings {
                raw_data_dir: dir.path().join("raw"),
                processed_data_dir: dir.path().join("processed"),
                temp_dir: dir.path().join("temp"),
            },
            integration_settings: IntegrationSettings::default(),
        }
    }

    fn write_raw(dir: &TempDir, name: &str, contents: &str) {
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::write(raw.join(name), contents).unwrap();
    }

    #[test]
    fn test_full_pipeline_produces_artifacts() {
        let dir = TempDir::new().unwrap();
        write_raw(
            &dir,
            "siafi_2025-08-07.csv",
            "codigo_ug,valor_empenhado\n153978,150000.00\n154357,200000.00\n",
        );
        write_raw(
            &dir,
            "contratos_2025-08-07.csv",
            "uasg,objeto_contrato\n153978,Consultoria\n",
        );

        let pipeline = IntegrationPipeline::new(&test_config(&dir));
        let stats = pipeline.execute().unwrap();

        assert_eq!(stats.total_integrated, 2);
        assert_eq!(stats.source_counts["siafi"], 2);
        assert_eq!(stats.match_counts["compras"], 1);
        // TransfereGov had no artifact at all
        assert_eq!(stats.match_counts["transferegov"], 0);

        let integrated = dir.path().join("processed").join(INTEGRATED_FILENAME);
        assert!(integrated.exists());
        let contents = std::fs::read_to_string(&integrated).unwrap();
        assert!(contents.contains("compras_objeto_contrato"));

        let stats_json = dir.path().join("processed").join(STATS_FILENAME);
        let loaded: MatchStatistics =
            serde_json::from_str(&std::fs::read_to_string(&stats_json).unwrap()).unwrap();
        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_missing_primary_is_input_missing() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "contratos_2025-08-07.csv", "uasg,x\n1,2\n");

        let pipeline = IntegrationPipeline::new(&test_config(&dir));
        let err = pipeline.execute().unwrap_err();
        assert!(matches!(err, IntegrateError::InputMissing(_)));
    }

    #[test]
    fn test_unloadable_secondary_contributes_zero_matches() {
        let dir = TempDir::new().unwrap();
        write_raw(
            &dir,
            "siafi_2025-08-07.csv",
            "codigo_ug,valor\n153978,10\n",
        );
        // An empty artifact loads as an empty table
        write_raw(&dir, "contratos_2025-08-07.csv", "");

        let pipeline = IntegrationPipeline::new(&test_config(&dir));
        let stats = pipeline.execute().unwrap();
        assert_eq!(stats.total_integrated, 1);
        assert_eq!(stats.match_counts["compras"], 0);
    }
}
