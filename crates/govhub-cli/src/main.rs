//! Gov-Hub - government data acquisition and integration tool

use anyhow::Result;
use clap::Parser;
use govhub_acquire::SourceAcquirer;
use govhub_common::logging::{init_logging, LogConfig, LogLevel};
use govhub_common::types::SourceSpec;
use govhub_common::AppConfig;
use govhub_integrate::IntegrationPipeline;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "govhub")]
#[command(author, version, about = "Gov-Hub data acquisition and integration tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config/config.json")]
    config: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Acquire data from the configured sources
    Acquire {
        /// Restrict acquisition to one source
        #[arg(short, long)]
        source: Option<String>,

        /// Acquire independent sources concurrently
        #[arg(long)]
        parallel: bool,
    },

    /// Integrate previously acquired data
    Integrate {
        /// Cap the rows loaded per table
        #[arg(long)]
        max_rows: Option<usize>,
    },

    /// Acquire everything, then integrate
    Run {
        /// Acquire independent sources concurrently
        #[arg(long)]
        parallel: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    log_config.log_file_prefix = "govhub".to_string();
    init_logging(&log_config)?;

    let config = AppConfig::from_file(&cli.config)?;

    match cli.command {
        Command::Acquire { source, parallel } => {
            acquire(&config, source.as_deref(), parallel).await?;
        },
        Command::Integrate { max_rows } => {
            integrate(&config, max_rows)?;
        },
        Command::Run { parallel } => {
            acquire(&config, None, parallel).await?;
            integrate(&config, None)?;
        },
    }

    Ok(())
}

async fn acquire(config: &AppConfig, only: Option<&str>, parallel: bool) -> Result<()> {
    let sources: BTreeMap<String, SourceSpec> = match only {
        Some(name) => {
            let source = config
                .data_sources
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("unknown source: {}", name))?;
            BTreeMap::from([(name.to_string(), source.clone())])
        },
        None => config.data_sources.clone(),
    };

    let acquirer = SourceAcquirer::new(config)?;
    let reports = if parallel {
        acquirer.acquire_all_parallel(&sources).await
    } else {
        acquirer.acquire_all(&sources).await
    };

    let degraded: Vec<&str> = reports
        .values()
        .filter(|r| !r.is_live())
        .map(|r| r.source.as_str())
        .collect();
    if degraded.is_empty() {
        info!("acquisition finished with live data for every source");
    } else {
        warn!(sources = ?degraded, "acquisition degraded to sample data");
    }

    Ok(())
}

fn integrate(config: &AppConfig, max_rows: Option<usize>) -> Result<()> {
    let mut pipeline = IntegrationPipeline::new(config);
    if let Some(cap) = max_rows {
        pipeline = pipeline.with_max_rows(cap);
    }

    let stats = pipeline.execute()?;

    info!(
        total = stats.total_integrated,
        "integration finished"
    );
    for (source, matches) in &stats.match_counts {
        info!(
            source = %source,
            matches,
            rate = stats.match_rate(&config.integration_settings.primary_source, source),
            "match summary"
        );
    }

    Ok(())
}
