// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Worker mover / PPE updater

use rand::Rng;
use std::f64::consts::TAU;

use super::RawEvent;
use crate::config::SimulationConfig;
use crate::site::Worker;

/// Advances worker positions and PPE state one tick at a time.
pub struct WorkerUpdater {
    max_step: f64,
    ppe_failure_probability: f64,
}

impl WorkerUpdater {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            max_step: config.max_worker_step,
            ppe_failure_probability: config.ppe_failure_probability,
        }
    }

    /// Perturb the worker's position by a bounded random vector and roll the
    /// per-tick helmet check. Returns the PPE check raw event.
    pub fn update<R: Rng>(&self, worker: &mut Worker, rng: &mut R) -> RawEvent {
        let heading = rng.gen_range(0.0..TAU);
        let step = rng.gen_range(0.0..=self.max_step);
        worker.position.x += step * heading.cos();
        worker.position.y += step * heading.sin();

        // Helmet state is re-derived every tick: dropped with the configured
        // probability, worn otherwise.
        worker.ppe.helmet = rng.gen::<f64>() >= self.ppe_failure_probability;

        RawEvent::PpeCheck {
            worker_id: worker.id.clone(),
            worker_name: worker.name.clone(),
            position: worker.position,
            ppe: worker.ppe,
        }
    }
}
