//! Raw artifact discovery
//!
//! Acquisition stamps every artifact with its date, so the lexicographically
//! greatest matching filename is also the newest. Discovery is
//! pattern-based because archive members keep their own stems (a SIAFI dump
//! may extract as `despesas_2025-08-07.csv`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Filename patterns recognized for the well-known sources; anything else
/// matches on the source name itself.
fn patterns_for(source: &str) -> Vec<&str> {
    match source {
        "siafi" => vec!["siafi", "despesas", "orcament"],
        "compras" => vec!["compras", "contrato", "licitac"],
        "transferegov" => vec!["transferegov", "transfere", "convenio"],
        other => vec![other],
    }
}

/// Find the newest raw CSV per source.
///
/// Returns an entry for every requested source; `None` means no artifact
/// was found, which downstream treats as "contributes no matches".
pub fn discover_latest_files(
    raw_dir: &Path,
    sources: &[&str],
) -> BTreeMap<String, Option<PathBuf>> {
    let mut found: BTreeMap<String, Option<PathBuf>> =
        sources.iter().map(|s| (s.to_string(), None)).collect();

    let entries = match std::fs::read_dir(raw_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %raw_dir.display(), error = %e, "raw data directory not readable");
            return found;
        },
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let lower = filename.to_lowercase();
        if !lower.ends_with(".csv") {
            continue;
        }

        for source in sources {
            if !patterns_for(source).iter().any(|p| lower.contains(p)) {
                continue;
            }
            let current = found.get_mut(*source);
            if let Some(slot) = current {
                // Date-stamped names sort chronologically
                let newer = match slot {
                    Some(existing) => {
                        existing
                            .file_name()
                            .and_then(|n| n.to_str())
                            .map(|e| lower > e.to_lowercase())
                            .unwrap_or(true)
                    },
                    None => true,
                };
                if newer {
                    *slot = Some(path.clone());
                }
            }
            break;
        }
    }

    for (source, path) in &found {
        match path {
            Some(path) => info!(source = %source, file = %path.display(), "artifact discovered"),
            None => warn!(source = %source, "no artifact found"),
        }
    }
    found
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), "a,b\n1,2\n").unwrap();
    }

    #[test]
    fn test_newest_artifact_wins() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "siafi_2025-08-01.csv");
        touch(&dir, "siafi_2025-08-07.csv");
        touch(&dir, "contratos_2025-08-05.csv");

        let found = discover_latest_files(dir.path(), &["siafi", "compras"]);
        assert_eq!(
            found["siafi"].as_ref().unwrap().file_name().unwrap(),
            "siafi_2025-08-07.csv"
        );
        assert_eq!(
            found["compras"].as_ref().unwrap().file_name().unwrap(),
            "contratos_2025-08-05.csv"
        );
    }

    #[test]
    fn test_synthetic_artifacts_are_discoverable() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "transferegov_amostra_2025-08-07.csv");

        let found = discover_latest_files(dir.path(), &["transferegov"]);
        assert!(found["transferegov"].is_some());
    }

    #[test]
    fn test_missing_source_yields_none() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "siafi_2025-08-07.csv");
        touch(&dir, "notas.txt");

        let found = discover_latest_files(dir.path(), &["siafi", "compras"]);
        assert!(found["siafi"].is_some());
        assert!(found["compras"].is_none());
    }

    #[test]
    fn test_unreadable_dir_yields_all_none() {
        let found =
            discover_latest_files(Path::new("nao/existe"), &["siafi"]);
        assert!(found["siafi"].is_none());
    }
}
