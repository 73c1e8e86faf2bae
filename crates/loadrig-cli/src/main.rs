//! loadrig — horizontal scaling experiment driver.

use anyhow::Context;
use clap::{Parser, Subcommand};
use loadrig_controller::{Experiment, Outcome};
use loadrig_core::{Credentials, RigConfig};
use loadrig_provider::HttpProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadrig", about = "Horizontal scaling experiment driver", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one experiment end-to-end: provision, drive load, scale, tear down.
    Run {
        /// Path to the experiment config.
        #[arg(short, long, default_value = "loadrig.toml")]
        config: PathBuf,
        /// Override the directory throughput logs are mirrored into.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Write a loadrig.toml scaffold.
    Init {
        #[arg(short, long, default_value = "loadrig.toml")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,loadrig=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, data_dir } => run(config, data_dir).await,
        Commands::Init { path, force } => init(&path, force),
    }
}

async fn run(config_path: PathBuf, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = RigConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(dir) = data_dir {
        config.run.data_dir = dir;
    }
    std::fs::create_dir_all(&config.run.data_dir)
        .with_context(|| format!("creating data dir {}", config.run.data_dir.display()))?;
    let credentials = Credentials::from_env(&config.harness)?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("building http client")?;
    let provider = Arc::new(HttpProvider::with_client(
        http.clone(),
        config.provider.base_url.clone(),
    ));

    info!(
        config = %config_path.display(),
        provider = %config.provider.base_url,
        target = config.experiment.rps_target,
        "starting experiment"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received; cancelling experiment");
            let _ = signal_tx.send(true);
        }
    });

    let experiment = Experiment::new(provider, http, config, credentials);
    let report = experiment.run(shutdown_rx).await;

    info!(
        scale_ups = report.scale_ups,
        session = report.session_id.as_deref().unwrap_or("-"),
        terminated = report.teardown.terminated.len(),
        groups_deleted = report.teardown.deleted_groups.len(),
        "experiment finished"
    );
    for (id, reason) in &report.teardown.failed_instances {
        warn!(%id, %reason, "instance left running; clean up manually");
    }
    for (group, reason) in &report.teardown.failed_groups {
        warn!(%group, %reason, "security group left behind; clean up manually");
    }

    match report.outcome {
        Outcome::Completed(completion) => {
            info!(%completion, "experiment succeeded");
            if report.teardown.clean() {
                Ok(())
            } else {
                anyhow::bail!("experiment completed but teardown left resources behind")
            }
        }
        Outcome::Cancelled => anyhow::bail!("experiment cancelled before completion"),
        Outcome::Failed(e) => Err(e.into()),
    }
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = RigConfig::scaffold();
    std::fs::write(path, config.to_toml_string()?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "scaffold written; fill in [provider] before running");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_a_loadable_scaffold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadrig.toml");

        init(&path, false).unwrap();
        let config = RigConfig::from_file(&path).unwrap();
        assert_eq!(config.experiment.rps_target, 50.0);

        // refuses to clobber without --force
        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
    }
}
