// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Event bus for inter-component communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::SiteSnapshot;
use crate::detection::Incident;

/// Event types in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventType {
    Incident,
    Snapshot,
    Alert,
    SystemStatus,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Incident(Incident),
    Snapshot(SiteSnapshot),
    Alert { level: String, message: String },
    Status { key: String, value: String },
    Error { code: u32, message: String },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    incident_tx: broadcast::Sender<Incident>,
    snapshot_tx: broadcast::Sender<SiteSnapshot>,
    event_tx: broadcast::Sender<Event>,
    event_counter: std::sync::atomic::AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (incident_tx, _) = broadcast::channel(capacity);
        let (snapshot_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            incident_tx,
            snapshot_tx,
            event_tx,
            event_counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn publish_incident(&self, incident: Incident) {
        let _ = self.incident_tx.send(incident.clone());
        self.publish_event(EventType::Incident, EventPayload::Incident(incident));
    }

    pub fn publish_snapshot(&self, snapshot: SiteSnapshot) {
        let _ = self.snapshot_tx.send(snapshot.clone());
        self.publish_event(EventType::Snapshot, EventPayload::Snapshot(snapshot));
    }

    pub fn publish_alert(&self, level: &str, message: &str) {
        self.publish_event(
            EventType::Alert,
            EventPayload::Alert {
                level: level.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn publish_error(&self, code: u32, message: &str) {
        self.publish_event(
            EventType::Error,
            EventPayload::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self
            .event_counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_incidents(&self) -> broadcast::Receiver<Incident> {
        self.incident_tx.subscribe()
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<SiteSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}
