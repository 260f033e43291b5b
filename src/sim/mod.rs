// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! State updaters - advance entity state one tick at a time

mod workers;
mod equipment;
mod sensors;

pub use workers::WorkerUpdater;
pub use equipment::{EquipmentTick, EquipmentUpdater};
pub use sensors::SensorUpdater;

use crate::site::{Position, PpeStatus, Reading, SensorKind};

/// Intermediate signal produced by a state updater.
///
/// Consumed only by the threshold evaluator within the same tick; never
/// persisted directly.
#[derive(Debug, Clone)]
pub enum RawEvent {
    /// PPE check result for one worker
    PpeCheck {
        worker_id: String,
        worker_name: String,
        position: Position,
        ppe: PpeStatus,
    },
    /// An operational unit was flagged maintenance-needed this tick
    MaintenanceNeeded {
        equipment_id: String,
        equipment_name: String,
        position: Position,
    },
    /// A fresh sensor reading
    SensorSample {
        sensor_id: String,
        kind: SensorKind,
        location: Position,
        reading: Reading,
    },
}
