// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Site entities and the in-memory entity store

use std::collections::VecDeque;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 2D site coordinate in meters from the site datum
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Worker role on site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerRole {
    Operator,
    Supervisor,
    Technician,
    Surveyor,
    Blaster,
}

/// Personal protective equipment flags
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PpeStatus {
    pub helmet: bool,
    pub vest: bool,
    pub mask: bool,
}

impl Default for PpeStatus {
    fn default() -> Self {
        Self {
            helmet: true,
            vest: true,
            mask: true,
        }
    }
}

impl PpeStatus {
    pub fn compliant(&self) -> bool {
        self.helmet && self.vest && self.mask
    }
}

/// A worker on the active site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub role: WorkerRole,
    pub position: Position,
    pub ppe: PpeStatus,
}

/// Equipment fuel type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Diesel,
    Electric,
    Biodiesel,
}

/// Equipment operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Operational,
    Idle,
    Maintenance,
    Offline,
}

/// Heavy equipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentKind {
    HaulTruck,
    Excavator,
    Drill,
    Loader,
    Crusher,
    Conveyor,
}

/// A piece of heavy equipment on the active site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub kind: EquipmentKind,
    pub fuel: FuelType,
    pub status: EquipmentStatus,
    /// Cumulative engine hours. Non-decreasing while Operational.
    pub runtime_hours: f64,
    /// Fuel or energy consumption in unit/hour
    pub consumption_rate: f64,
    pub position: Position,
}

/// Environmental sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    AirQuality,
    GasLeak,
    Temperature,
    Vibration,
}

/// Sensor operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    Online,
    Degraded,
    Offline,
}

/// Kind-specific reading payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReadingPayload {
    /// CO and NO2 concentrations in ppm
    AirQuality { co: f64, no2: f64 },
    /// Methane concentration in percent by volume
    GasLeak { methane: f64 },
    /// Ambient temperature in °C
    Temperature { value: f64 },
    /// Ground vibration amplitude in mm/s
    Vibration { amplitude: f64 },
}

/// A single timestamped sensor reading. Never mutated after append.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub taken_at: DateTime<Utc>,
    pub payload: ReadingPayload,
}

/// An environmental sensor on the active site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub kind: SensorKind,
    pub site_id: String,
    pub location: Position,
    pub status: SensorStatus,
    pub last_reading: Option<Reading>,
    /// Bounded reading history for charting, oldest first
    pub history: VecDeque<Reading>,
}

impl Sensor {
    /// Append a reading, evicting the oldest entry beyond `capacity`.
    pub fn push_reading(&mut self, reading: Reading, capacity: usize) {
        self.history.push_back(reading);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
        self.last_reading = Some(reading);
    }
}

/// Roster for one site as returned by the configuration collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRoster {
    pub site_id: String,
    pub workers: Vec<Worker>,
    pub equipment: Vec<Equipment>,
    pub sensors: Vec<Sensor>,
}

/// In-memory, site-scoped holder of live entity state.
///
/// Exclusively owned and mutated by the tick executor for the duration of a
/// running session. External readers only ever see cloned snapshots.
#[derive(Debug, Default)]
pub struct EntityStore {
    site_id: String,
    pub workers: Vec<Worker>,
    pub equipment: Vec<Equipment>,
    pub sensors: Vec<Sensor>,
}

impl EntityStore {
    pub fn from_roster(roster: SiteRoster) -> Self {
        Self {
            site_id: roster.site_id,
            workers: roster.workers,
            equipment: roster.equipment,
            sensors: roster.sensors,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Replace the store contents with another site's roster.
    /// The clock must be stopped before calling this.
    pub fn replace(&mut self, roster: SiteRoster) {
        *self = Self::from_roster(roster);
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty() && self.equipment.is_empty() && self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(methane: f64) -> Reading {
        Reading {
            taken_at: Utc::now(),
            payload: ReadingPayload::GasLeak { methane },
        }
    }

    fn gas_sensor() -> Sensor {
        Sensor {
            id: "gas-1".to_string(),
            kind: SensorKind::GasLeak,
            site_id: "site-1".to_string(),
            location: Position::new(10.0, 20.0),
            status: SensorStatus::Online,
            last_reading: None,
            history: VecDeque::new(),
        }
    }

    #[test]
    fn test_history_bounded_fifo() {
        let mut sensor = gas_sensor();

        for i in 0..60 {
            sensor.push_reading(reading(i as f64 / 100.0), 50);
        }

        assert_eq!(sensor.history.len(), 50);
        // Oldest 10 evicted first
        let first = sensor.history.front().unwrap();
        assert_eq!(first.payload, ReadingPayload::GasLeak { methane: 0.10 });
        let last = sensor.history.back().unwrap();
        assert_eq!(last.payload, ReadingPayload::GasLeak { methane: 0.59 });
    }

    #[test]
    fn test_last_reading_tracks_append() {
        let mut sensor = gas_sensor();
        assert!(sensor.last_reading.is_none());

        sensor.push_reading(reading(0.12), 50);
        sensor.push_reading(reading(0.34), 50);

        let last = sensor.last_reading.unwrap();
        assert_eq!(last.payload, ReadingPayload::GasLeak { methane: 0.34 });
    }

    #[test]
    fn test_store_replace_swaps_site() {
        let mut store = EntityStore::from_roster(SiteRoster {
            site_id: "site-1".to_string(),
            workers: vec![],
            equipment: vec![],
            sensors: vec![gas_sensor()],
        });
        assert_eq!(store.site_id(), "site-1");
        assert_eq!(store.sensors.len(), 1);

        store.replace(SiteRoster {
            site_id: "site-2".to_string(),
            ..Default::default()
        });
        assert_eq!(store.site_id(), "site-2");
        assert!(store.sensors.is_empty());
    }
}
