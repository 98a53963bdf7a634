//! Metrics Export and Collection Loop
//!
//! Renders the Prometheus text exposition after each scrape of the hub, either
//! to stdout or to a file that a node exporter textfile collector picks up.
//!
//! # Collection
//!
//! Each scrape opens a fresh connection, fetches all devices, updates the
//! metrics and closes the connection. `zha_up` is 1 after a successful scrape
//! and 0 after a failed one.
//!
//! # Error Handling
//!
//! A failed scrape is logged and skipped; in watch mode the loop carries on
//! with the next tick. Only output failures end the loop.

use crate::collectors::{self, CollectionContext, CollectionStatus};
use crate::config::Config;
use crate::metrics::MetricsCollector;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Where rendered metrics go.
#[derive(Debug, Clone)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

/// Scrape once and write the rendered metrics.
pub async fn run_once(config: &Config, output: &Output) -> anyhow::Result<CollectionStatus> {
    let metrics = MetricsCollector::new()?;
    let status = collect_metrics(config, &metrics).await?;
    write_output(output, &metrics.render()?).await?;
    Ok(status)
}

/// Scrape every `scrape_interval_seconds` until interrupted.
pub async fn run_loop(config: &Config, output: &Output) -> anyhow::Result<()> {
    let metrics = MetricsCollector::new()?;
    let mut ticker = interval(Duration::from_secs(
        config.metrics.scrape_interval_seconds.max(1),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping collection loop");
                return Ok(());
            }
        }

        // Dropping the scrape future on Ctrl-C drops its connection, closing the socket.
        let status = tokio::select! {
            status = collect_metrics(config, &metrics) => status?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted during scrape, stopping collection loop");
                return Ok(());
            }
        };

        if status == CollectionStatus::Failed {
            error!("Scrape failed; keeping previous device metrics");
        }
        write_output(output, &metrics.render()?).await?;
    }
}

/// Run all collectors against the hub and update `zha_up`.
pub async fn collect_metrics(
    config: &Config,
    metrics: &MetricsCollector,
) -> anyhow::Result<CollectionStatus> {
    info!("Collecting metrics from {}", config.homeassistant.websocket_url());

    let ctx = CollectionContext {
        config: &config.homeassistant,
        metrics,
    };

    let status = collectors::collect_device_metrics(&ctx).await?;
    metrics.up.set(match status {
        CollectionStatus::Success => 1.0,
        CollectionStatus::Failed => 0.0,
    });

    Ok(status)
}

async fn write_output(output: &Output, rendered: &str) -> anyhow::Result<()> {
    match output {
        Output::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Output::File(path) => write_atomically(path, rendered).await,
    }
}

/// Write to a sibling temp file and rename it over `path`, so readers never
/// see a partial exposition.
pub async fn write_atomically(path: &Path, contents: &str) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move metrics into {}", path.display()))?;
    Ok(())
}
