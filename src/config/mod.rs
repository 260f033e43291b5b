// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::streaming::StreamingConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (generated roster instead of the roster API)
    pub demo_mode: bool,

    /// Simulation configuration
    pub simulation: SimulationConfig,

    /// Safety threshold configuration
    pub thresholds: ThresholdConfig,

    /// Emissions configuration
    pub emissions: EmissionsConfig,

    /// Roster source configuration
    pub roster: RosterConfig,

    /// Audit log configuration
    pub audit: AuditConfig,

    /// Streaming configuration
    pub streaming: StreamingConfig,

    /// Database configuration
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "PitWatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: true,
            simulation: SimulationConfig::default(),
            thresholds: ThresholdConfig::default(),
            emissions: EmissionsConfig::default(),
            roster: RosterConfig::default(),
            audit: AuditConfig::default(),
            streaming: StreamingConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pitwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Tick period in seconds
    pub tick_interval_secs: f64,

    /// Maximum worker step per tick in meters
    pub max_worker_step: f64,

    /// Probability per worker per tick of a dropped helmet
    pub ppe_failure_probability: f64,

    /// Probability per operational unit per tick of a maintenance flag
    pub maintenance_probability: f64,

    /// Sensor reading history capacity per sensor
    pub sensor_history_capacity: usize,

    /// Fixed RNG seed for reproducible runs; entropy-seeded when unset
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 2.0,
            max_worker_step: 1.5,
            ppe_failure_probability: 0.05,
            maintenance_probability: 0.20,
            sensor_history_capacity: 50,
            seed: None,
        }
    }
}

/// Safety threshold configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Methane alert level in percent by volume
    pub methane_alert_level: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            methane_alert_level: 0.45,
        }
    }
}

/// Emissions configuration
///
/// Factors are kg CO2e per consumption unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionsConfig {
    pub diesel_factor: f64,
    pub electric_factor: f64,
    pub biodiesel_factor: f64,
}

impl Default for EmissionsConfig {
    fn default() -> Self {
        Self {
            diesel_factor: 2.68,
            electric_factor: 0.82,
            biodiesel_factor: 2.45,
        }
    }
}

/// Roster source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Base URL of the site configuration API
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable the external ledger anchor phase
    pub anchor_enabled: bool,

    /// Ledger endpoint URL
    pub ledger_url: String,

    /// Anchor request timeout in seconds
    pub anchor_timeout_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            anchor_enabled: true,
            ledger_url: "http://localhost:8545/anchor".to_string(),
            anchor_timeout_secs: 15,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Retention period in days
    pub retention_days: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/pitwatch.db"),
            retention_days: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.simulation.tick_interval_secs = 0.5;
        config.thresholds.methane_alert_level = 0.4;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.simulation.tick_interval_secs, 0.5);
        assert_eq!(loaded.thresholds.methane_alert_level, 0.4);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.simulation.sensor_history_capacity, 50);
        assert_eq!(config.emissions.diesel_factor, 2.68);
    }
}
