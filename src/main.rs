// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! PitWatch - Mine-Site Real-Time Monitoring & Incident Detection Engine
//!
//! Drives the site simulation loop, evaluates safety thresholds, accumulates
//! carbon metrics, and records every incident through the two-phase audit log.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pitwatch::{
    audit::{AuditLogger, HttpLedgerClient, LedgerClient},
    roster::{DemoRoster, HttpRosterProvider, RosterProvider},
    Config, Database, EventBus, SimulationEngine, StreamingManager, VERSION,
};

/// PitWatch - Mine-Site Real-Time Monitoring & Incident Detection Engine
#[derive(Parser, Debug)]
#[command(name = "pitwatch")]
#[command(author = "PitWatch Project")]
#[command(version = VERSION)]
#[command(about = "Real-time mine-site simulation, incident detection, and audit logging")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site identifier to monitor
    #[arg(short, long, default_value = "demo-site")]
    site: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a generated roster
    #[arg(long)]
    demo: bool,

    /// Tick interval override in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// WebSocket server port
    #[arg(long, default_value = "8765")]
    ws_port: u16,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("PitWatch v{} - Mine-Site Monitoring Engine", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir.clone() {
        config.data_dir = data_dir;
    }
    config.streaming.websocket_port = args.ws_port;
    if let Some(tick_ms) = args.tick_ms {
        config.simulation.tick_interval_secs = tick_ms as f64 / 1000.0;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.site))
}

async fn run(config: Config, site_id: String) -> Result<()> {
    use tokio::sync::broadcast;

    let config = Arc::new(config);

    // Primary store
    let mut db_config = config.database.clone();
    db_config.path = config.data_dir.join("pitwatch.db");
    let db = Arc::new(Database::open(&db_config)?);

    // Collaborator boundaries: roster source and ledger client
    let roster: Arc<dyn RosterProvider> = if config.demo_mode {
        Arc::new(DemoRoster)
    } else {
        Arc::new(HttpRosterProvider::new(&config.roster)?)
    };
    let ledger: Option<Arc<dyn LedgerClient>> = if config.audit.anchor_enabled {
        Some(Arc::new(HttpLedgerClient::new(&config.audit)?))
    } else {
        None
    };

    let bus = Arc::new(EventBus::new(1024));
    let audit = Arc::new(AuditLogger::new(Arc::clone(&db), ledger));

    // Push channel for subscribers
    let (shutdown_tx, _) = broadcast::channel(1);
    let streaming = StreamingManager::new(&config.streaming);
    streaming.start(Arc::clone(&bus), shutdown_tx.subscribe()).await?;

    let mut engine = SimulationEngine::new(
        Arc::clone(&config),
        Arc::clone(&db),
        roster,
        audit,
        Arc::clone(&bus),
    );

    let tick = Duration::from_secs_f64(config.simulation.tick_interval_secs);
    engine.start_simulation(&site_id, Some(tick)).await?;

    info!("Monitoring site {} - press Ctrl+C to shutdown", site_id);
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, stopping simulation...");
    engine.stop_simulation().await?;
    let _ = shutdown_tx.send(());

    if let Some(snapshot) = engine.snapshot() {
        info!(
            "Final state: tick {}, {:.2} kg CO2e, {} recent incidents",
            snapshot.tick,
            snapshot.carbon_total_kg,
            snapshot.recent_incidents.len()
        );
    }

    info!("PitWatch shutdown complete");
    Ok(())
}
