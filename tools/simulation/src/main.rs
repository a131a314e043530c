//! Energy market demo
//!
//! Boots the clearing engine in the configured mode, spawns a participant
//! fleet, runs for a fixed number of ticks, and logs the market summary
//! from the observer side channel.
//!
//! Usage: `simulation [config.json]` — the file overrides any subset of
//! [`SimConfig`].

use std::time::Duration;

use anyhow::Context;
use clearing_engine::{
    spawn_ticker, ClearingMode, EngineService, FanOut, MarketConfig, MarketEvent,
};
use serde::{Deserialize, Serialize};
use simulation::metrics::MarketMetrics;
use simulation::participants::{backup, consumer, producer, storage, trader};
use tokio::sync::broadcast;
use tracing::info;
use types::ids::ParticipantId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SimConfig {
    market: MarketConfig,
    /// How many engine ticks to run before stopping.
    run_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig {
                tick_interval_ms: 250,
                ..MarketConfig::default()
            },
            run_ticks: 24,
        }
    }
}

fn load_config() -> anyhow::Result<SimConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {path}"))
        }
        None => Ok(SimConfig::default()),
    }
}

/// Collect observer events until the engine goes down, then return the
/// aggregated metrics.
async fn collect_metrics(mut observer: broadcast::Receiver<MarketEvent>) -> MarketMetrics {
    let mut metrics = MarketMetrics::new();
    loop {
        match observer.recv().await {
            Ok(event) => metrics.record(&event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "observer lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    metrics
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    info!(mode = ?config.market.mode, ticks = config.run_ticks, "starting market simulation");

    let period = Duration::from_millis(config.market.tick_interval_ms);
    let mut fanout = FanOut::new();
    let observer = fanout.observe();

    // Every mailbox must be registered before the engine takes the fan-out.
    let solar = ParticipantId::new("solar");
    let wind = ParticipantId::new("wind");
    let household = ParticipantId::new("household");
    let solar_inbox = fanout.register(&solar);
    let wind_inbox = fanout.register(&wind);
    let household_inbox = fanout.register(&household);

    // Mode-specific fleet members: backup supply and a trading desk make
    // sense on a continuous book, a battery lives off the auction awards.
    let mut extras = Vec::new();
    match config.market.mode {
        ClearingMode::Continuous => {
            let grid = ParticipantId::new("grid");
            let desk = ParticipantId::new("desk");
            let grid_inbox = fanout.register(&grid);
            let desk_inbox = fanout.register(&desk);
            extras.push(Extra::Backup(grid, grid_inbox));
            extras.push(Extra::Trader(desk, desk_inbox));
        }
        ClearingMode::Batch => {
            let battery = ParticipantId::new("battery");
            let battery_inbox = fanout.register(&battery);
            extras.push(Extra::Storage(battery, battery_inbox));
        }
    }

    let (service, handle) = EngineService::new(&config.market, fanout);
    let engine = tokio::spawn(service.run());
    let ticker = spawn_ticker(handle.clone(), period);
    let metrics_task = tokio::spawn(collect_metrics(observer));

    let mut fleet = vec![
        tokio::spawn(producer::run(
            producer::Producer::new(producer::ProducerConfig::default()),
            solar,
            handle.clone(),
            solar_inbox,
            period,
        )),
        tokio::spawn(producer::run(
            producer::Producer::new(producer::ProducerConfig {
                seed: 21,
                ..producer::ProducerConfig::default()
            }),
            wind,
            handle.clone(),
            wind_inbox,
            period,
        )),
        tokio::spawn(consumer::run(
            consumer::Consumer::new(consumer::ConsumerConfig::default()),
            household,
            handle.clone(),
            household_inbox,
            period,
        )),
    ];
    for extra in extras {
        fleet.push(match extra {
            Extra::Backup(id, inbox) => tokio::spawn(backup::run(
                backup::Backup::new(backup::BackupConfig::default()),
                id,
                handle.clone(),
                inbox,
                period,
            )),
            Extra::Trader(id, inbox) => tokio::spawn(trader::run(
                trader::Trader::new(trader::TraderConfig::default()),
                id,
                handle.clone(),
                inbox,
                period,
            )),
            Extra::Storage(id, inbox) => tokio::spawn(storage::run(
                storage::Storage::new(storage::StorageConfig::default()),
                id,
                handle.clone(),
                inbox,
                period,
            )),
        });
    }

    tokio::time::sleep(period * u32::try_from(config.run_ticks).unwrap_or(u32::MAX)).await;

    // Stop the fleet and the clock, then let the engine drain and exit.
    for task in &fleet {
        task.abort();
    }
    ticker.abort();
    drop(handle);
    engine.await?;

    let metrics = metrics_task.await?;
    info!("{}", metrics.summary());
    if let Some(vwap) = metrics.vwap() {
        info!(%vwap, "volume-weighted average price");
    }

    Ok(())
}

/// Mode-specific fleet member, held until the engine handle exists.
enum Extra {
    Backup(
        ParticipantId,
        tokio::sync::mpsc::UnboundedReceiver<clearing_engine::Envelope>,
    ),
    Trader(
        ParticipantId,
        tokio::sync::mpsc::UnboundedReceiver<clearing_engine::Envelope>,
    ),
    Storage(
        ParticipantId,
        tokio::sync::mpsc::UnboundedReceiver<clearing_engine::Envelope>,
    ),
}
