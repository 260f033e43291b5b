// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Roster provider - entity rosters from the site configuration collaborator

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::info;

use crate::config::RosterConfig;
use crate::site::{
    Equipment, EquipmentKind, EquipmentStatus, FuelType, Position, PpeStatus, Sensor, SensorKind,
    SensorStatus, SiteRoster, Worker, WorkerRole,
};

/// Read-only boundary to the external CRUD API that owns site configuration.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Fetch the current worker/equipment/sensor roster for a site.
    async fn fetch(&self, site_id: &str) -> Result<SiteRoster>;
}

/// HTTP roster provider
pub struct HttpRosterProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRosterProvider {
    pub fn new(config: &RosterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build roster HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RosterProvider for HttpRosterProvider {
    async fn fetch(&self, site_id: &str) -> Result<SiteRoster> {
        let url = format!("{}/sites/{}/roster", self.base_url, site_id);

        let roster: SiteRoster = self
            .client
            .get(&url)
            .send()
            .await
            .context("roster request failed")?
            .error_for_status()
            .context("roster API rejected the request")?
            .json()
            .await
            .context("malformed roster response")?;

        Ok(roster)
    }
}

/// Generated demo roster for running without the roster API.
pub struct DemoRoster;

impl DemoRoster {
    pub fn generate(site_id: &str) -> SiteRoster {
        info!("Generating demo roster for site {}", site_id);

        let worker_specs = [
            ("Dana Reyes", WorkerRole::Operator, 120.0, 80.0),
            ("Sam Okafor", WorkerRole::Operator, 140.0, 95.0),
            ("Priya Nair", WorkerRole::Supervisor, 60.0, 40.0),
            ("Marcus Webb", WorkerRole::Technician, 210.0, 150.0),
            ("Ines Castillo", WorkerRole::Surveyor, 300.0, 220.0),
            ("Tomas Lindqvist", WorkerRole::Blaster, 420.0, 310.0),
        ];

        let workers = worker_specs
            .iter()
            .enumerate()
            .map(|(i, (name, role, x, y))| Worker {
                id: format!("{site_id}-w{}", i + 1),
                name: (*name).to_string(),
                role: *role,
                position: Position::new(*x, *y),
                ppe: PpeStatus::default(),
            })
            .collect();

        let equipment_specs = [
            ("Haul Truck 07", EquipmentKind::HaulTruck, FuelType::Diesel, EquipmentStatus::Operational, 60.0, 250.0, 80.0),
            ("Haul Truck 12", EquipmentKind::HaulTruck, FuelType::Diesel, EquipmentStatus::Operational, 58.0, 265.0, 120.0),
            ("Excavator 02", EquipmentKind::Excavator, FuelType::Diesel, EquipmentStatus::Operational, 45.0, 180.0, 60.0),
            ("Loader 05", EquipmentKind::Loader, FuelType::Biodiesel, EquipmentStatus::Operational, 38.0, 90.0, 200.0),
            ("Drill Rig 01", EquipmentKind::Drill, FuelType::Electric, EquipmentStatus::Idle, 120.0, 400.0, 300.0),
            ("Crusher 01", EquipmentKind::Crusher, FuelType::Electric, EquipmentStatus::Operational, 300.0, 50.0, 50.0),
            ("Conveyor A", EquipmentKind::Conveyor, FuelType::Electric, EquipmentStatus::Maintenance, 90.0, 70.0, 90.0),
        ];

        let equipment = equipment_specs
            .iter()
            .enumerate()
            .map(|(i, (name, kind, fuel, status, rate, x, y))| Equipment {
                id: format!("{site_id}-eq{}", i + 1),
                name: (*name).to_string(),
                kind: *kind,
                fuel: *fuel,
                status: *status,
                runtime_hours: 100.0 + 40.0 * i as f64,
                consumption_rate: *rate,
                position: Position::new(*x, *y),
            })
            .collect();

        let sensor_specs = [
            (SensorKind::AirQuality, 100.0, 100.0),
            (SensorKind::AirQuality, 350.0, 250.0),
            (SensorKind::GasLeak, 150.0, 90.0),
            (SensorKind::GasLeak, 410.0, 305.0),
            (SensorKind::Temperature, 200.0, 140.0),
            (SensorKind::Vibration, 50.0, 45.0),
        ];

        let sensors = sensor_specs
            .iter()
            .enumerate()
            .map(|(i, (kind, x, y))| Sensor {
                id: format!("{site_id}-s{}", i + 1),
                kind: *kind,
                site_id: site_id.to_string(),
                location: Position::new(*x, *y),
                status: SensorStatus::Online,
                last_reading: None,
                history: VecDeque::new(),
            })
            .collect();

        SiteRoster {
            site_id: site_id.to_string(),
            workers,
            equipment,
            sensors,
        }
    }
}

#[async_trait]
impl RosterProvider for DemoRoster {
    async fn fetch(&self, site_id: &str) -> Result<SiteRoster> {
        Ok(Self::generate(site_id))
    }
}
