//! Gov-Hub Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, configuration and error handling for the Gov-Hub workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Gov-Hub
//! workspace members:
//!
//! - **Error Handling**: the workspace-wide [`GovError`] and `Result` alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Configuration**: the typed schema consumed by acquisition and
//!   integration (`data_sources`, `download_settings`, `file_settings`,
//!   `integration_settings`)
//! - **Types**: the `Record`/`Table` data model and source descriptors
//!
//! # Example
//!
//! ```no_run
//! use govhub_common::{AppConfig, Result};
//!
//! fn load(path: &str) -> Result<AppConfig> {
//!     let config = AppConfig::from_file(path)?;
//!     config.validate()?;
//!     Ok(config)
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DownloadSettings, FileSettings, IntegrationSettings};
pub use error::{GovError, Result};
pub use types::{EndpointSpec, PayloadKind, Record, SourceSpec, Table};
