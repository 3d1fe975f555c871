//! Per-source acquisition orchestration
//!
//! A source is an ordered list of endpoint alternatives. They are tried
//! strictly in declared order, first non-empty artifact wins, with a
//! politeness pause between attempts. When every alternative is exhausted
//! the source degrades to a synthetic sample; the run itself never halts on
//! an unreachable upstream.

use chrono::Local;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::archive::ArchiveFetcher;
use crate::paginate::PaginatedCollector;
use crate::sample;
use crate::transport::TransportClient;
use crate::Result;
use govhub_common::config::{AppConfig, DownloadSettings, FileSettings};
use govhub_common::types::{EndpointSpec, PayloadKind, SourceSpec};

/// How a source's artifact came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStatus {
    /// At least one live endpoint produced data
    Live,
    /// Every endpoint failed; the artifact is synthetic sample data
    Degraded,
}

/// Outcome of acquiring one source.
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub source: String,
    pub status: AcquisitionStatus,
    pub files: Vec<PathBuf>,
}

impl AcquisitionReport {
    pub fn is_live(&self) -> bool {
        self.status == AcquisitionStatus::Live
    }
}

/// Drives acquisition for every configured source.
#[derive(Debug, Clone)]
pub struct SourceAcquirer {
    transport: TransportClient,
    settings: DownloadSettings,
    files: FileSettings,
}

impl SourceAcquirer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.file_settings.ensure_dirs()?;
        let transport = TransportClient::new(&config.download_settings)?;
        Ok(Self {
            transport,
            settings: config.download_settings.clone(),
            files: config.file_settings.clone(),
        })
    }

    /// Acquire one source, falling back to synthetic data on exhaustion.
    pub async fn acquire(&self, source: &SourceSpec) -> AcquisitionReport {
        info!(source = %source.name, endpoints = source.urls.len(), "acquiring source");

        for (i, endpoint) in source.urls.iter().enumerate() {
            info!(
                source = %source.name,
                attempt = i + 1,
                description = %endpoint.description,
                url = %endpoint.url,
                "trying endpoint"
            );

            let result = match endpoint.format {
                PayloadKind::Json => self.acquire_paginated(source, endpoint).await,
                PayloadKind::Csv | PayloadKind::Zip => self.acquire_file(source, endpoint).await,
            };

            match result {
                Ok(files) if !files.is_empty() => {
                    info!(source = %source.name, files = files.len(), "endpoint succeeded");
                    return AcquisitionReport {
                        source: source.name.clone(),
                        status: AcquisitionStatus::Live,
                        files,
                    };
                },
                Ok(_) => {
                    warn!(source = %source.name, attempt = i + 1, "endpoint produced no data");
                },
                Err(e) => {
                    warn!(source = %source.name, attempt = i + 1, error = %e, "endpoint failed");
                },
            }

            if i + 1 < source.urls.len() {
                tokio::time::sleep(self.settings.rate_limit_delay()).await;
            }
        }

        warn!(
            source = %source.name,
            "all endpoints exhausted, generating sample data"
        );
        match sample::write_sample(&source.name, &self.files.raw_data_dir) {
            Ok(path) => AcquisitionReport {
                source: source.name.clone(),
                status: AcquisitionStatus::Degraded,
                files: vec![path],
            },
            Err(e) => {
                // Even the fallback failed (disk trouble); report degraded
                // with no artifact rather than aborting the run.
                error!(source = %source.name, error = %e, "sample generation failed");
                AcquisitionReport {
                    source: source.name.clone(),
                    status: AcquisitionStatus::Degraded,
                    files: Vec::new(),
                }
            },
        }
    }

    /// Acquire every source sequentially, in configuration order.
    pub async fn acquire_all(
        &self,
        sources: &BTreeMap<String, SourceSpec>,
    ) -> BTreeMap<String, AcquisitionReport> {
        let mut reports = BTreeMap::new();
        for (name, source) in sources {
            let report = self.acquire(source).await;
            reports.insert(name.clone(), report);
        }
        self.log_summary(&reports);
        reports
    }

    /// Acquire sources concurrently.
    ///
    /// Endpoint order and politeness delays stay per-source; only
    /// independent sources overlap. Artifact names are source-specific, so
    /// concurrent writers cannot collide.
    pub async fn acquire_all_parallel(
        &self,
        sources: &BTreeMap<String, SourceSpec>,
    ) -> BTreeMap<String, AcquisitionReport> {
        let mut tasks = JoinSet::new();
        for (name, source) in sources {
            let acquirer = self.clone();
            let name = name.clone();
            let source = source.clone();
            tasks.spawn(async move {
                let report = acquirer.acquire(&source).await;
                (name, report)
            });
        }

        let mut reports = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, report)) => {
                    reports.insert(name, report);
                },
                Err(e) => error!(error = %e, "acquisition task panicked"),
            }
        }
        self.log_summary(&reports);
        reports
    }

    async fn acquire_paginated(
        &self,
        source: &SourceSpec,
        endpoint: &EndpointSpec,
    ) -> Result<Vec<PathBuf>> {
        let collector = PaginatedCollector::from_settings(&self.transport, &self.settings);
        let table = collector.collect_all(endpoint).await;

        if table.is_empty() {
            return Ok(Vec::new());
        }

        let stamp = Local::now().format("%Y-%m-%d");
        let path = self
            .files
            .raw_data_dir
            .join(format!("{}_{}.csv", source.name, stamp));
        table.write_csv(&path)?;
        info!(
            source = %source.name,
            records = table.len(),
            path = %path.display(),
            "paginated data saved"
        );
        Ok(vec![path])
    }

    async fn acquire_file(
        &self,
        source: &SourceSpec,
        endpoint: &EndpointSpec,
    ) -> Result<Vec<PathBuf>> {
        let fetcher = ArchiveFetcher::new(&self.transport, &self.settings, &self.files);
        fetcher.download(endpoint, &source.name).await
    }

    fn log_summary(&self, reports: &BTreeMap<String, AcquisitionReport>) {
        let total = reports.len();
        let live = reports.values().filter(|r| r.is_live()).count();

        info!("=== acquisition summary ===");
        for (name, report) in reports {
            match report.status {
                AcquisitionStatus::Live => info!(source = %name, "LIVE"),
                AcquisitionStatus::Degraded => warn!(source = %name, "DEGRADED (sample data)"),
            }
        }
        if total > 0 {
            info!(
                live,
                total,
                rate = live as f64 / total as f64 * 100.0,
                "success rate"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(dir: &TempDir, sources: BTreeMap<String, SourceSpec>) -> AppConfig {
        AppConfig {
            data_sources: sources,
            download_settings: DownloadSettings {
                timeout_secs: 5,
                max_retries: 1,
                retry_delay_secs: 0,
                rate_limit_delay_secs: 0,
                ..DownloadSettings::default()
            },
            file_settings: FileSettings {
                raw_data_dir: dir.path().join("raw"),
                processed_data_dir: dir.path().join("processed"),
                temp_dir: dir.path().join("temp"),
            },
            integration_settings: Default::default(),
        }
    }

    fn endpoint(url: String, format: PayloadKind) -> EndpointSpec {
        EndpointSpec {
            url,
            headers: BTreeMap::new(),
            format,
            description: "test endpoint".to_string(),
        }
    }

    fn source(name: &str, urls: Vec<EndpointSpec>) -> SourceSpec {
        SourceSpec {
            name: name.to_string(),
            urls,
        }
    }

    #[tokio::test]
    async fn test_first_endpoint_success_stops_iteration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"codigo_ug": "1", "valor": "10"}
            ])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let spec = source(
            "siafi",
            vec![
                endpoint(format!("{}/a", server.uri()), PayloadKind::Json),
                endpoint(format!("{}/b", server.uri()), PayloadKind::Json),
            ],
        );
        let config = test_config(&dir, BTreeMap::new());
        let acquirer = SourceAcquirer::new(&config).unwrap();

        let report = acquirer.acquire(&spec).await;
        assert!(report.is_live());
        assert_eq!(report.files.len(), 1);
        // Second endpoint never contacted
        let hits: Vec<_> = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == "/b")
            .collect();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_to_next_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/good"))
            .respond_with(ResponseTemplate::new(200).set_body_string("codigo_ug;valor\n1;10\n"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let spec = source(
            "siafi",
            vec![
                endpoint(format!("{}/bad", server.uri()), PayloadKind::Csv),
                endpoint(format!("{}/good", server.uri()), PayloadKind::Csv),
            ],
        );
        let config = test_config(&dir, BTreeMap::new());
        let acquirer = SourceAcquirer::new(&config).unwrap();

        let report = acquirer.acquire(&spec).await;
        assert!(report.is_live());
        assert_eq!(report.files.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_source_degrades_to_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let spec = source(
            "siafi",
            vec![
                endpoint(format!("{}/x", server.uri()), PayloadKind::Csv),
                endpoint(format!("{}/y", server.uri()), PayloadKind::Csv),
            ],
        );
        let config = test_config(&dir, BTreeMap::new());
        let acquirer = SourceAcquirer::new(&config).unwrap();

        let report = acquirer.acquire(&spec).await;
        assert_eq!(report.status, AcquisitionStatus::Degraded);
        assert_eq!(report.files.len(), 1);

        let name = report.files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("siafi_amostra_"));
        // Synthetic artifact has a non-zero, schema-consistent row count
        let contents = std::fs::read_to_string(&report.files[0]).unwrap();
        assert!(contents.lines().count() > 1);
    }

    #[tokio::test]
    async fn test_acquire_all_reports_every_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live"))
            .respond_with(ResponseTemplate::new(200).set_body_string("uasg,valor\n1,2\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dead"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut sources = BTreeMap::new();
        sources.insert(
            "compras".to_string(),
            source(
                "compras",
                vec![endpoint(format!("{}/live", server.uri()), PayloadKind::Csv)],
            ),
        );
        sources.insert(
            "transferegov".to_string(),
            source(
                "transferegov",
                vec![endpoint(format!("{}/dead", server.uri()), PayloadKind::Csv)],
            ),
        );

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, sources.clone());
        let acquirer = SourceAcquirer::new(&config).unwrap();

        let reports = acquirer.acquire_all(&sources).await;
        assert_eq!(reports.len(), 2);
        assert!(reports["compras"].is_live());
        assert_eq!(reports["transferegov"].status, AcquisitionStatus::Degraded);
    }

    #[tokio::test]
    async fn test_acquire_all_parallel_matches_sequential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut sources = BTreeMap::new();
        for name in ["siafi", "compras"] {
            sources.insert(
                name.to_string(),
                source(name, vec![endpoint(server.uri(), PayloadKind::Csv)]),
            );
        }

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, sources.clone());
        let acquirer = SourceAcquirer::new(&config).unwrap();

        let reports = acquirer.acquire_all_parallel(&sources).await;
        assert_eq!(reports.len(), 2);
        for report in reports.values() {
            assert_eq!(report.status, AcquisitionStatus::Degraded);
        }
    }
}
