//! smhi-poller: SMHI point-forecast poller.
//!
//! Single-binary Tokio application that:
//! 1. Loads items and home settings from the config file
//! 2. Polls the SMHI point-forecast API once per refresh interval
//! 3. Publishes the current value of each item's parameter

mod config;
mod host;
mod journal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use chrono::{DateTime, Utc};
use refresh::{RefreshEngine, TickClock};
use serde_json::json;
use smhi_client::SmhiClient;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::host::ConfigHost;
use crate::journal::{now_iso, PublishJournal, SharedJournal};

/// SMHI forecast poller
#[derive(Parser)]
#[command(name = "smhi-poller", about = "Polls SMHI point forecasts and publishes item values")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "smhi.toml")]
    config: PathBuf,

    /// Run a single refresh cycle and exit.
    #[arg(long)]
    once: bool,

    /// Append every publish and cycle summary to this JSON-lines file.
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "smhi_poller=info,smhi_client=info,refresh=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("SMHI poller starting up...");

    let cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let publish_journal: Option<SharedJournal> = match cli.journal {
        Some(path) => match PublishJournal::open(path) {
            Ok(j) => {
                info!("Journal path: {}", j.path().display());
                Some(Arc::new(Mutex::new(j)))
            }
            Err(e) => {
                error!("Failed to open journal: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let host = match ConfigHost::from_config(&cfg, publish_journal.clone()) {
        Ok(h) => h,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let client = match SmhiClient::new(&cfg.http) {
        Ok(c) => c,
        Err(e) => {
            error!("HTTP client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = RefreshEngine::new(client);
    if let Err(e) = engine.configure(&cfg.binding) {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Items: {:?}", host.item_names());
    info!(
        "Home: {}, refresh={}ms, timeout={}ms",
        engine.home(),
        engine.refresh_interval_ms(),
        cfg.http.timeout_ms
    );
    journal::write_event(
        publish_journal.as_ref(),
        json!({
            "ts": now_iso(),
            "kind": "service_start",
            "mode": if cli.once { "once" } else { "loop" },
            "items": host.item_names(),
            "refresh_ms": engine.refresh_interval_ms(),
            "timeout_ms": cfg.http.timeout_ms
        }),
    )
    .await;

    if cli.once {
        run_refresh_cycle(&mut engine, &host, publish_journal.as_ref(), 1, Utc::now()).await;
        return;
    }

    // Cycles are stamped with their scheduled tick time, so consecutive ticks
    // are exactly one refresh interval apart. An overrunning cycle delays the
    // next tick rather than overlapping it.
    let clock = TickClock::new();
    let mut interval = tokio::time::interval(Duration::from_millis(engine.refresh_interval_ms()));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("SMHI poller is running. Press Ctrl+C to stop.");

    let mut cycle_id: u64 = 0;
    let shutdown_reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break "ctrl_c";
            }
            tick = interval.tick() => {
                cycle_id = cycle_id.saturating_add(1);
                let now = clock.cycle_time(tick);
                run_refresh_cycle(&mut engine, &host, publish_journal.as_ref(), cycle_id, now).await;
            }
        }
    };

    journal::write_event(
        publish_journal.as_ref(),
        json!({
            "ts": now_iso(),
            "kind": "service_shutdown",
            "reason": shutdown_reason
        }),
    )
    .await;

    info!("SMHI poller shut down.");
}

async fn run_refresh_cycle(
    engine: &mut RefreshEngine<SmhiClient>,
    host: &ConfigHost,
    publish_journal: Option<&SharedJournal>,
    cycle_id: u64,
    now: DateTime<Utc>,
) {
    let event = match engine.run_cycle_at(host, now).await {
        Ok(report) => json!({
            "ts": now_iso(),
            "kind": "cycle",
            "cycle_id": cycle_id,
            "status": "ok",
            "due": report.due,
            "fresh": report.fresh,
            "fetches": report.fetches,
            "published": report.published,
            "skipped": report.skipped
        }),
        Err(e) => {
            // Already logged by the engine; the next tick retries.
            debug!("Cycle {} aborted: {}", cycle_id, e);
            json!({
                "ts": now_iso(),
                "kind": "cycle",
                "cycle_id": cycle_id,
                "status": "error",
                "error": e.to_string()
            })
        }
    };
    journal::write_event(publish_journal, event).await;
}
