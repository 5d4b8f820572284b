use std::time::Duration;

use finmanager_core::config::{AppConfig, SyncEngineConfig};
use finmanager_core::{DrainOutcome, DrainReport, EntityStore, SyncError};
use tokio::time::Instant;

use crate::commands::common::Context;
use crate::error::CliError;

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

pub async fn run_sync(offline: bool, watch: bool, ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    if watch {
        return watch_sync(store, offline, ctx).await;
    }

    let engine = ctx.sync_engine(store, !offline).await?;

    let outcome = engine.spawn_drain().await?;
    if matches!(outcome, DrainOutcome::Skipped(SyncError::NotAuthenticated)) {
        return Err(CliError::NotSignedIn);
    }

    for line in describe_outcome(&outcome) {
        println!("{line}");
    }
    Ok(())
}

/// Period between scheduled drains (and connectivity checks) while watching.
pub fn watch_interval(config: &AppConfig) -> Duration {
    config
        .sync_engine_config()
        .sync_interval
        .unwrap_or(Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS))
}

/// Keep draining until Ctrl-C: at startup, when the network comes back and
/// on every interval tick.
async fn watch_sync(
    store: EntityStore,
    offline: bool,
    ctx: &Context,
) -> Result<(), CliError> {
    let period = watch_interval(&ctx.config);
    let engine_config = SyncEngineConfig {
        sync_interval: Some(period),
        ..ctx.config.sync_engine_config()
    };
    let engine = ctx.sync_engine_with(store, !offline, engine_config).await?;

    println!(
        "Watching the sync queue every {}s; press Ctrl-C to stop.",
        period.as_secs()
    );
    let triggers = engine.spawn_trigger_loop();
    let mut checks = tokio::time::interval_at(Instant::now() + period, period);

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal,
            _ = checks.tick(), if !offline => {
                let online = engine.remote().probe().await;
                engine.connectivity().set_online(online);
            }
        }
    };

    triggers.abort();
    tracing::info!("Stopped watching the sync queue");
    result.map_err(CliError::from)
}

pub fn describe_outcome(outcome: &DrainOutcome) -> Vec<String> {
    match outcome {
        DrainOutcome::Skipped(reason) => vec![format!("Sync skipped: {reason}")],
        DrainOutcome::Finished(report) => describe_report(report),
    }
}

fn describe_report(report: &DrainReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.delivered == 0 && report.remaining == 0 && report.rejected.is_empty() {
        lines.push("Nothing to sync.".to_string());
        return lines;
    }

    lines.push(format!("Delivered {} change(s)", report.delivered));
    for rejection in &report.rejected {
        lines.push(format!("Rejected: {rejection}"));
    }
    if let Some(reason) = &report.aborted {
        lines.push(format!("Stopped early: {reason}"));
    }
    if report.remaining > 0 {
        lines.push(format!("{} change(s) still queued", report.remaining));
    }
    lines
}
