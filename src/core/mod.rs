//! Core module - simulation clock, event bus, and the engine

mod clock;
mod engine;
mod event_bus;

pub use clock::SimulationClock;
pub use engine::SimulationEngine;
pub use event_bus::{Event, EventBus, EventPayload, EventType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::Incident;
use crate::site::{Equipment, Sensor, Worker};

/// Immutable copy of the simulation state for external readers.
///
/// Produced at the end of each successful tick; readers never observe the
/// live store mid-update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub site_id: String,
    pub tick: u64,
    pub taken_at: DateTime<Utc>,
    pub workers: Vec<Worker>,
    pub equipment: Vec<Equipment>,
    pub sensors: Vec<Sensor>,
    /// Session carbon total in kg CO2e
    pub carbon_total_kg: f64,
    pub recent_incidents: Vec<Incident>,
}

impl SiteSnapshot {
    pub fn empty(site_id: &str) -> Self {
        Self {
            site_id: site_id.to_string(),
            tick: 0,
            taken_at: Utc::now(),
            workers: Vec::new(),
            equipment: Vec::new(),
            sensors: Vec::new(),
            carbon_total_kg: 0.0,
            recent_incidents: Vec::new(),
        }
    }
}
