//! Gov-Hub Acquisition Engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Resilient acquisition of tabular datasets from unreliable government
//! portals.
//!
//! The engine is layered bottom-up:
//!
//! - [`transport`]: one HTTP request, classified into a [`FetchOutcome`]
//! - [`retry`]: bounded constant-delay retries around the transport
//! - [`paginate`]: offset-paginated JSON collection into a `Table`
//! - [`archive`]: streamed downloads with ZIP detection and extraction
//! - [`acquirer`]: per-source orchestration over ordered endpoint
//!   alternatives, degrading to [`sample`] data when every endpoint fails
//!
//! A source acquisition never aborts the run: endpoint failures fall
//! through to the next alternative and total exhaustion produces a
//! deterministic synthetic artifact, reported as [`AcquisitionStatus::Degraded`].
//!
//! # Example
//!
//! ```no_run
//! use govhub_acquire::SourceAcquirer;
//! use govhub_common::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_file("config/config.json")?;
//!     let acquirer = SourceAcquirer::new(&config)?;
//!     let reports = acquirer.acquire_all(&config.data_sources).await;
//!     for (source, report) in &reports {
//!         println!("{}: {:?}", source, report.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod acquirer;
pub mod archive;
pub mod paginate;
pub mod retry;
pub mod sample;
pub mod transport;

// Re-export main types
pub use acquirer::{AcquisitionReport, AcquisitionStatus, SourceAcquirer};
pub use archive::ArchiveFetcher;
pub use paginate::PaginatedCollector;
pub use retry::RetryPolicy;
pub use transport::{FetchOutcome, TransportClient};

/// Result type for acquisition operations
pub type Result<T> = std::result::Result<T, AcquireError>;

/// Error types for acquisition
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Endpoint failed: {0}")]
    Endpoint(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error(transparent)]
    Common(#[from] govhub_common::GovError),
}

impl From<tokio::task::JoinError> for AcquireError {
    fn from(err: tokio::task::JoinError) -> Self {
        AcquireError::Task(err.to_string())
    }
}
