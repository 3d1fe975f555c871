//! Gov-Hub Record-Linkage Integrator
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Links acquired tables across sources by shared business keys.
//!
//! - [`loader`]: multi-encoding, multi-delimiter CSV loading
//! - [`discover`]: newest raw artifact per source
//! - [`index`]: key-indexed lookup over secondary tables
//! - [`integrator`]: left-outer join from the primary table with match
//!   statistics
//! - [`pipeline`]: discover → load → index → join → emit, end to end
//!
//! The pipeline is linear with no partial-failure recovery mid-join: a
//! secondary table that cannot be loaded contributes zero matches instead
//! of aborting the run.

pub mod discover;
pub mod index;
pub mod integrator;
pub mod loader;
pub mod pipeline;

// Re-export main types
pub use index::JoinIndex;
pub use integrator::{integrate, MatchStatistics};
pub use loader::TableLoader;
pub use pipeline::IntegrationPipeline;

/// Result type for integration operations
pub type Result<T> = std::result::Result<T, IntegrateError>;

/// Error types for integration
#[derive(Debug, thiserror::Error)]
pub enum IntegrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Integration input missing: {0}")]
    InputMissing(String),

    #[error(transparent)]
    Common(#[from] govhub_common::GovError),
}
