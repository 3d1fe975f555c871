//! Streamed downloads with ZIP detection and extraction
//!
//! Portal dumps run to hundreds of megabytes, so the body is streamed to a
//! temp file chunk by chunk, never fully buffered. ZIP payloads are detected
//! by Content-Type or URL suffix, extracted on a blocking task, and their
//! tabular members renamed into the raw-data directory with a date stamp.
//!
//! A corrupt archive is an endpoint failure, not a retryable one:
//! corruption does not resolve on retry.

use chrono::Local;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::retry::RetryPolicy;
use crate::transport::{FetchOutcome, TransportClient};
use crate::{AcquireError, Result};
use govhub_common::config::{DownloadSettings, FileSettings};
use govhub_common::types::EndpointSpec;

/// Extensions treated as tabular when selecting archive members.
const TABULAR_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Downloads one endpoint to disk, extracting archives along the way.
pub struct ArchiveFetcher<'a> {
    transport: &'a TransportClient,
    retry: RetryPolicy,
    chunk_size: usize,
    raw_dir: PathBuf,
    temp_dir: PathBuf,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(
        transport: &'a TransportClient,
        settings: &DownloadSettings,
        files: &FileSettings,
    ) -> Self {
        Self {
            transport,
            retry: RetryPolicy::from_settings(settings),
            chunk_size: settings.chunk_size,
            raw_dir: files.raw_data_dir.clone(),
            temp_dir: files.temp_dir.clone(),
        }
    }

    /// Download an endpoint and return the tabular artifacts it produced.
    ///
    /// Flat payloads land directly in the raw-data directory as
    /// `{stem}_{date}.csv`; archives are extracted and each tabular member
    /// becomes `{member_stem}_{date}.{ext}`.
    pub async fn download(&self, endpoint: &EndpointSpec, stem: &str) -> Result<Vec<PathBuf>> {
        let outcome = self
            .retry
            .run(|| self.transport.fetch(&endpoint.url, &endpoint.headers, None))
            .await;

        let response = match outcome {
            FetchOutcome::Success(response) => response,
            failed => return Err(AcquireError::Endpoint(failed.reason())),
        };

        let stamp = Local::now().format("%Y-%m-%d").to_string();
        let is_archive = is_zip_payload(&endpoint.url, &response);

        let target = if is_archive {
            self.temp_dir.join(format!("{}_{}.zip", stem, stamp))
        } else {
            self.raw_dir.join(format!("{}_{}.csv", stem, stamp))
        };

        self.stream_to_file(response, &target).await?;

        if is_archive {
            let extracted = self.extract_archive(target.clone(), stamp).await?;
            info!(members = extracted.len(), "archive extracted");
            Ok(extracted)
        } else {
            Ok(vec![target])
        }
    }

    /// Stream the response body to `target` in chunks.
    async fn stream_to_file(&self, response: reqwest::Response, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::with_template(
                "{msg} [{wide_bar}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message(format!(
            "Downloading {}",
            target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        ));

        info!(target = %target.display(), "starting download");

        let file = std::fs::File::create(target)?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        writer.flush()?;

        pb.finish_and_clear();
        info!(
            target = %target.display(),
            size_mb = downloaded as f64 / (1024.0 * 1024.0),
            "download complete"
        );
        Ok(())
    }

    /// Extract tabular members from a downloaded ZIP and delete it.
    async fn extract_archive(&self, archive_path: PathBuf, stamp: String) -> Result<Vec<PathBuf>> {
        let raw_dir = self.raw_dir.clone();
        let chunk_size = self.chunk_size;

        let extracted = tokio::task::spawn_blocking(move || {
            extract_tabular_members(&archive_path, &raw_dir, &stamp, chunk_size)
        })
        .await??;

        if extracted.is_empty() {
            return Err(AcquireError::Archive(
                "archive contains no tabular members".to_string(),
            ));
        }
        Ok(extracted)
    }
}

/// Archive iff Content-Type mentions zip or the URL path ends in `.zip`.
fn is_zip_payload(url: &str, response: &reqwest::Response) -> bool {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    content_type.contains("zip") || url.to_lowercase().ends_with(".zip")
}

/// Blocking extraction of every tabular member into `raw_dir`.
fn extract_tabular_members(
    archive_path: &Path,
    raw_dir: &Path,
    stamp: &str,
    chunk_size: usize,
) -> Result<Vec<PathBuf>> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| AcquireError::Archive(format!("corrupt archive: {}", e)))?;

    std::fs::create_dir_all(raw_dir)?;

    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .map_err(|e| AcquireError::Archive(format!("unreadable archive entry {}: {}", i, e)))?;

        if member.is_dir() {
            continue;
        }

        // Member paths may carry directories; only the filename part counts.
        let name = member.name().to_string();
        let filename = name.rsplit('/').next().unwrap_or(&name).to_string();
        let Some((member_stem, ext)) = filename.rsplit_once('.') else {
            continue;
        };
        let ext = ext.to_lowercase();
        if !TABULAR_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let target = raw_dir.join(format!("{}_{}.{}", member_stem, stamp, ext));
        let out = std::fs::File::create(&target)?;
        let mut writer = BufWriter::with_capacity(chunk_size, out);
        std::io::copy(&mut member, &mut writer)?;
        writer.flush()?;

        info!(member = %filename, target = %target.display(), "tabular member extracted");
        extracted.push(target);
    }

    // The archive itself is temporary scaffolding
    if let Err(e) = std::fs::remove_file(archive_path) {
        warn!(error = %e, "could not remove downloaded archive");
    }

    Ok(extracted)
}

// ============================================================================
// Tests
// ============================================================================
