use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use failwatch::{FileSource, GroupOutcome, Monitor, MonitorConfig, ReferenceTable};

#[derive(Parser, Debug)]
#[command(name = "failwatch")]
#[command(about = "Detect excessive failover traffic reaching server groups")]
struct Args {
    /// Path to the configuration file (TOML, JSON or YAML)
    #[arg(short, long, default_value = "failwatch.toml")]
    config: PathBuf,

    /// Directory instance statistics paths are resolved against
    /// (defaults to the configuration file's directory)
    #[arg(short, long)]
    stats_dir: Option<PathBuf>,

    /// Run time as a UTC epoch, instead of the current time
    #[arg(long)]
    now: Option<i64>,

    /// Rows kept per (group, site, relay) key in the reduced record
    #[arg(short, long)]
    ranks: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = MonitorConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(ranks) = args.ranks {
        config.reduced_ranks = ranks;
    }

    let reference = match &config.reference_file {
        Some(path) => ReferenceTable::load(path)
            .with_context(|| format!("Failed to load reference table {}", path.display()))?,
        None => {
            warn!("no reference_file configured, every host is classified as unknown");
            ReferenceTable::new()
        }
    };

    let stats_dir = args.stats_dir.clone().unwrap_or_else(|| {
        args.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    });
    let source = Box::new(FileSource::new(stats_dir));

    let now = args.now.unwrap_or_else(|| chrono::Utc::now().timestamp());

    let mut monitor = Monitor::new(config, source, reference)?;
    let summary = monitor.run(now)?;

    for (group, outcome) in &summary.outcomes {
        match outcome {
            GroupOutcome::Checked { flagged } => info!(group = %group, flagged, "checked"),
            GroupOutcome::NoBaseline => info!(group = %group, "baseline recorded"),
            GroupOutcome::Failed(reason) => warn!(group = %group, reason = %reason, "failed"),
        }
    }

    let failed: Vec<_> = summary.failed_groups().collect();
    if !failed.is_empty() {
        warn!(groups = ?failed, "some groups were left out of the record");
    }

    Ok(())
}
