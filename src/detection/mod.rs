//! Detection module - threshold evaluation and incident generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::sim::RawEvent;
use crate::site::{Position, ReadingPayload};

/// Incident category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentType {
    PpeViolation,
    DangerZoneEntry,
    EquipmentMalfunction,
    HazardReport,
    NearMiss,
    EnvironmentalSpill,
}

/// Severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentStatus {
    Reported,
    Investigating,
    Resolved,
}

/// A safety incident.
///
/// Type, description, and location are immutable after creation; only the
/// status and resolution notes may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub site_id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub description: String,
    pub location: Position,
    pub worker_id: Option<String>,
    pub equipment_id: Option<String>,
    pub sensor_id: Option<String>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Incident {
    fn draft(
        site_id: &str,
        incident_type: IncidentType,
        severity: Severity,
        description: String,
        location: Position,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            site_id: site_id.to_string(),
            incident_type,
            severity,
            status: IncidentStatus::Reported,
            description,
            location,
            worker_id: None,
            equipment_id: None,
            sensor_id: None,
            resolution_notes: None,
            created_at: Utc::now(),
        }
    }
}

/// Applies the fixed threshold rules to one tick's raw events.
///
/// Exactly three rules exist. The evaluator never invents a rule beyond them,
/// and rules run in a fixed order so ties resolve deterministically:
/// PPE checks, then gas-leak readings, then maintenance flags.
pub struct ThresholdEvaluator {
    methane_alert_level: f64,
}

impl ThresholdEvaluator {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            methane_alert_level: config.methane_alert_level,
        }
    }

    /// Pure function of the tick's raw events. Returns incident drafts in
    /// rule order; within a rule, in event order.
    pub fn evaluate(&self, site_id: &str, events: &[RawEvent]) -> Vec<Incident> {
        let mut incidents = Vec::new();

        // Rule 1: missing PPE
        for event in events {
            if let RawEvent::PpeCheck {
                worker_id,
                worker_name,
                position,
                ppe,
            } = event
            {
                if !ppe.compliant() {
                    let mut incident = Incident::draft(
                        site_id,
                        IncidentType::PpeViolation,
                        Severity::Medium,
                        format!("Worker {worker_name} detected without required PPE (helmet)"),
                        *position,
                    );
                    incident.worker_id = Some(worker_id.clone());
                    incidents.push(incident);
                }
            }
        }

        // Rule 2: methane above the alert level
        for event in events {
            if let RawEvent::SensorSample {
                sensor_id,
                location,
                reading,
                ..
            } = event
            {
                if let ReadingPayload::GasLeak { methane } = reading.payload {
                    if methane > self.methane_alert_level {
                        let mut incident = Incident::draft(
                            site_id,
                            IncidentType::EnvironmentalSpill,
                            Severity::High,
                            format!(
                                "Methane level {methane:.2}% exceeds alert level {:.2}% at ({:.1}, {:.1})",
                                self.methane_alert_level, location.x, location.y
                            ),
                            *location,
                        );
                        incident.sensor_id = Some(sensor_id.clone());
                        incidents.push(incident);
                    }
                }
            }
        }

        // Rule 3: maintenance-needed flags
        for event in events {
            if let RawEvent::MaintenanceNeeded {
                equipment_id,
                equipment_name,
                position,
            } = event
            {
                let mut incident = Incident::draft(
                    site_id,
                    IncidentType::EquipmentMalfunction,
                    Severity::Medium,
                    format!("{equipment_name} flagged maintenance-needed during operation"),
                    *position,
                );
                incident.equipment_id = Some(equipment_id.clone());
                incidents.push(incident);
            }
        }

        incidents
    }
}
