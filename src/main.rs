//! Geofence monitor - directional speed and turn alerts along a corridor
//!
//! Replays a location trace through the monitoring engine with simulated
//! device collaborators.
//!
//! Module structure:
//! - `domain/` - Core types (fixes, zones, alerts, status reports)
//! - `io/` - Collaborator stand-ins (trace replay, geofencing, notifications, display)
//! - `services/` - Monitoring logic (Monitor, processors, geofence manager)
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use geofence_monitor::domain::GeofenceCatalog;
use geofence_monitor::infra::{Config, Metrics};
use geofence_monitor::io::{
    create_alert_channel, create_geofencer, load_trace, run_display, NotificationWorker,
    TraceReplay,
};
use geofence_monitor::services::{GeofencingProvider, Monitor};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Geofence monitor - directional speed and turn alerts
#[derive(Parser, Debug)]
#[command(name = "geofence-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// JSONL location trace to replay (overrides `[location] trace_file`)
    #[arg(short, long)]
    trace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity; default INFO, debug shows every fix
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("geofence-monitor starting");

    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config);
    if let Some(trace) = args.trace {
        config = config.with_trace_file(trace);
    }

    let catalog = Arc::new(GeofenceCatalog::from_config(&config)?);

    info!(
        config_file = %config.config_file(),
        trace_file = %config.trace_file().unwrap_or("-"),
        update_interval_ms = %config.location_update_interval_ms(),
        zones = %catalog.len(),
        within_zone_speed_kmh = %config.within_zone_thresholds().speed_kmh,
        outside_zone_speed_kmh = %config.outside_zone_thresholds().speed_kmh,
        proximity_radius_m = %config.proximity_radius_m(),
        proximity_cooldown_ms = %config.proximity_cooldown_ms(),
        "config_loaded"
    );

    let trace_path = config
        .trace_file()
        .context("No location trace configured (use --trace or [location] trace_file)")?;
    let records = load_trace(trace_path)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    // Fixes and geofence transitions share one bounded inbound channel
    let (event_tx, event_rx) = mpsc::channel(config.event_queue_size());

    // Simulated platform geofencing provider
    let (geofencer, geofencer_worker) = create_geofencer(&config, event_tx.clone(), metrics.clone());
    tokio::spawn(geofencer_worker.run());

    // Notifications
    let (alerts, alert_rx) = create_alert_channel(config.notification_queue_size(), metrics.clone());
    let notifier = NotificationWorker::new(alert_rx, config.notifications_file());
    let notifier_handle = tokio::spawn(notifier.run());

    // Display
    let (status_tx, status_rx) = watch::channel(None);
    let display_handle = tokio::spawn(run_display(status_rx));

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Location source: stops the monitor once the trace is exhausted
    let replay = TraceReplay::new(
        records,
        config.location_update_interval_ms(),
        event_tx,
        Some(geofencer.clone()),
    );
    let replay_shutdown = shutdown_rx.clone();
    let replay_done = shutdown_tx.clone();
    let settle = std::time::Duration::from_millis(config.location_update_interval_ms());
    tokio::spawn(async move {
        replay.run(replay_shutdown).await;
        // let the provider report transitions for the final fixes
        tokio::time::sleep(settle).await;
        let _ = replay_done.send(true);
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    let provider: Arc<dyn GeofencingProvider> = Arc::new(geofencer);
    let mut monitor = Monitor::new(&config, catalog, provider, metrics.clone(), alerts, status_tx);
    monitor.run(event_rx, shutdown_rx).await;

    // Dropping the monitor closes the alert and status channels
    drop(monitor);
    if notifier_handle.await.is_err() {
        warn!("notification_worker_panicked");
    }
    if display_handle.await.is_err() {
        warn!("display_panicked");
    }

    metrics.report().log();
    info!("geofence-monitor shutdown complete");
    Ok(())
}
