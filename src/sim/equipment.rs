// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Equipment runtime / fuel updater

use rand::Rng;

use super::RawEvent;
use crate::config::{EmissionsConfig, SimulationConfig};
use crate::site::{Equipment, EquipmentStatus, FuelType};

/// Result of updating one unit for one tick
#[derive(Debug, Clone)]
pub struct EquipmentTick {
    /// Emission delta in kg CO2e. Zero unless the unit was Operational.
    pub emission_delta: f64,
    /// Maintenance flag raised this tick, if any
    pub raw: Option<RawEvent>,
}

/// Advances equipment runtime, computes per-tick emission deltas, and rolls
/// the maintenance-needed check.
pub struct EquipmentUpdater {
    tick_hours: f64,
    maintenance_probability: f64,
    emissions: EmissionsConfig,
}

impl EquipmentUpdater {
    pub fn new(config: &SimulationConfig, emissions: &EmissionsConfig) -> Self {
        Self {
            tick_hours: config.tick_interval_secs / 3600.0,
            maintenance_probability: config.maintenance_probability,
            emissions: emissions.clone(),
        }
    }

    pub fn emission_factor(&self, fuel: FuelType) -> f64 {
        match fuel {
            FuelType::Diesel => self.emissions.diesel_factor,
            FuelType::Electric => self.emissions.electric_factor,
            FuelType::Biodiesel => self.emissions.biodiesel_factor,
        }
    }

    /// Update one unit. Non-Operational units are left untouched with a zero
    /// delta. A unit flagged maintenance-needed still accrues the runtime and
    /// emissions for the tick it was operating, then flips to Maintenance.
    pub fn update<R: Rng>(&self, unit: &mut Equipment, rng: &mut R) -> EquipmentTick {
        if unit.status != EquipmentStatus::Operational {
            return EquipmentTick {
                emission_delta: 0.0,
                raw: None,
            };
        }

        unit.runtime_hours += self.tick_hours;
        let emission_delta =
            unit.consumption_rate * self.tick_hours * self.emission_factor(unit.fuel);

        let raw = if rng.gen::<f64>() < self.maintenance_probability {
            unit.status = EquipmentStatus::Maintenance;
            Some(RawEvent::MaintenanceNeeded {
                equipment_id: unit.id.clone(),
                equipment_name: unit.name.clone(),
                position: unit.position,
            })
        } else {
            None
        };

        EquipmentTick {
            emission_delta,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{EquipmentKind, Position};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unit(status: EquipmentStatus, fuel: FuelType) -> Equipment {
        Equipment {
            id: "eq-1".to_string(),
            name: "Haul Truck 07".to_string(),
            kind: EquipmentKind::HaulTruck,
            fuel,
            status,
            runtime_hours: 120.0,
            consumption_rate: 60.0,
            position: Position::new(250.0, 80.0),
        }
    }

    fn updater(maintenance_probability: f64) -> EquipmentUpdater {
        let config = SimulationConfig {
            tick_interval_secs: 2.0,
            maintenance_probability,
            ..SimulationConfig::default()
        };
        EquipmentUpdater::new(&config, &EmissionsConfig::default())
    }

    #[test]
    fn test_non_operational_unchanged() {
        let updater = updater(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for status in [
            EquipmentStatus::Idle,
            EquipmentStatus::Maintenance,
            EquipmentStatus::Offline,
        ] {
            let mut eq = unit(status, FuelType::Diesel);
            let tick = updater.update(&mut eq, &mut rng);
            assert_eq!(eq.runtime_hours, 120.0);
            assert_eq!(eq.status, status);
            assert_eq!(tick.emission_delta, 0.0);
            assert!(tick.raw.is_none());
        }
    }

    #[test]
    fn test_operational_accrues_runtime_and_emissions() {
        let updater = updater(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut eq = unit(EquipmentStatus::Operational, FuelType::Diesel);

        let tick = updater.update(&mut eq, &mut rng);

        let hours = 2.0 / 3600.0;
        assert!((eq.runtime_hours - (120.0 + hours)).abs() < 1e-12);
        assert!((tick.emission_delta - 60.0 * hours * 2.68).abs() < 1e-12);
    }

    #[test]
    fn test_emission_factors_per_fuel() {
        let updater = updater(0.0);
        assert_eq!(updater.emission_factor(FuelType::Diesel), 2.68);
        assert_eq!(updater.emission_factor(FuelType::Electric), 0.82);
        assert_eq!(updater.emission_factor(FuelType::Biodiesel), 2.45);
    }

    #[test]
    fn test_maintenance_flag_transitions_and_still_accrues() {
        let updater = updater(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut eq = unit(EquipmentStatus::Operational, FuelType::Electric);

        let tick = updater.update(&mut eq, &mut rng);

        assert_eq!(eq.status, EquipmentStatus::Maintenance);
        assert!(eq.runtime_hours > 120.0);
        assert!(tick.emission_delta > 0.0);
        assert!(matches!(
            tick.raw,
            Some(RawEvent::MaintenanceNeeded { ref equipment_id, .. }) if equipment_id == "eq-1"
        ));

        // Next tick the unit is no longer operational
        let tick = updater.update(&mut eq, &mut rng);
        assert_eq!(tick.emission_delta, 0.0);
    }

    #[test]
    fn test_runtime_monotonic_while_operational() {
        let updater = updater(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut eq = unit(EquipmentStatus::Operational, FuelType::Biodiesel);

        let mut last = eq.runtime_hours;
        for _ in 0..50 {
            updater.update(&mut eq, &mut rng);
            assert!(eq.runtime_hours > last);
            last = eq.runtime_hours;
        }
    }
}
