// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! PitWatch - Mine-Site Real-Time Monitoring & Incident Detection Engine
//!
//! A Rust engine that periodically advances the state of workers, equipment,
//! and environmental sensors at an operational site, evaluates safety
//! thresholds, accumulates carbon-emission metrics, and durably records every
//! incident through a two-phase audit log (SQLite store + external ledger
//! anchor).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PitWatch Engine                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌─────────────┐  │
//! │  │ Entity  │→ │  State   │→ │ Threshold │→ │   Audit     │  │
//! │  │ Store   │  │ Updaters │  │ Evaluator │  │   Logger    │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └─────────────┘  │
//! │       ↑            ↓             ↓               ↓           │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Simulation Clock (tick loop)             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       ↓            ↓             ↓               ↓           │
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌─────────────┐  │
//! │  │ Roster  │  │ Carbon   │  │ Event Bus │  │  Database   │  │
//! │  │ Provider│  │ Counter  │  │ + WS push │  │   (SQLite)  │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └─────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod core;
pub mod site;
pub mod sim;
pub mod detection;
pub mod emissions;
pub mod audit;
pub mod roster;
pub mod streaming;
pub mod config;
pub mod db;

// Re-exports for convenience
pub use config::Config;
pub use self::core::{EventBus, SimulationClock, SimulationEngine, SiteSnapshot};
pub use site::{Equipment, EntityStore, Sensor, SiteRoster, Worker};
pub use detection::{Incident, IncidentType, Severity, ThresholdEvaluator};
pub use emissions::CarbonAccumulator;
pub use audit::{AnchorState, AuditLogger, HttpLedgerClient, LedgerClient, LogRecord};
pub use roster::{DemoRoster, HttpRosterProvider, RosterProvider};
pub use streaming::StreamingManager;
pub use db::Database;

/// PitWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PitWatch name
pub const NAME: &str = "PitWatch";
