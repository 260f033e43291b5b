// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Audit logger - two-phase durable event recording
//!
//! Phase 1 persists the record to the primary store synchronously; failure is
//! a hard error surfaced to the caller. Phase 2 anchors a content hash to the
//! external ledger as a detached background task; failure leaves the record
//! valid and unanchored. Failed anchors are never retried.

mod ledger;

pub use ledger::{HttpLedgerClient, LedgerClient};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::Database;
use crate::detection::Incident;

/// Anchor lifecycle per record:
/// Unanchored → Anchoring → Anchored | AnchorFailed (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorState {
    Unanchored,
    Anchoring,
    Anchored,
    AnchorFailed,
}

impl AnchorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorState::Unanchored => "unanchored",
            AnchorState::Anchoring => "anchoring",
            AnchorState::Anchored => "anchored",
            AnchorState::AnchorFailed => "anchor_failed",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "anchoring" => AnchorState::Anchoring,
            "anchored" => AnchorState::Anchored,
            "anchor_failed" => AnchorState::AnchorFailed,
            _ => AnchorState::Unanchored,
        }
    }
}

/// One audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub category: String,
    pub source: String,
    pub payload: serde_json::Value,
    /// SHA-256 of the serialized payload, hex encoded
    pub payload_hash: String,
    /// Ledger transaction reference; null until the anchor is confirmed
    pub anchor_ref: Option<String>,
    pub anchor_state: AnchorState,
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(category: &str, source: &str, payload: serde_json::Value) -> Self {
        let payload_hash = content_hash(&payload);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.to_string(),
            source: source.to_string(),
            payload,
            payload_hash,
            anchor_ref: None,
            anchor_state: AnchorState::Unanchored,
            created_at: Utc::now(),
        }
    }
}

fn content_hash(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Audit failure taxonomy
#[derive(Debug, Error)]
pub enum AuditError {
    /// Primary persistence unreachable or the write failed. Local-fatal:
    /// surfaced immediately to the caller.
    #[error("primary persist failed: {0}")]
    Persist(anyhow::Error),

    /// The lookup itself failed (store unreachable), as opposed to NotFound.
    #[error("audit lookup failed: {0}")]
    Lookup(anyhow::Error),
}

/// Two-phase audit writer. Owns the write sequence for log records;
/// no other component mutates them.
pub struct AuditLogger {
    db: Arc<Database>,
    ledger: Option<Arc<dyn LedgerClient>>,
}

impl AuditLogger {
    pub fn new(db: Arc<Database>, ledger: Option<Arc<dyn LedgerClient>>) -> Self {
        Self { db, ledger }
    }

    /// Record an incident through the two-phase write. Returns once phase 1
    /// has durably persisted the record; the anchor attempt continues in the
    /// background and never blocks the caller.
    pub fn record_incident(&self, incident: &Incident) -> Result<LogRecord, AuditError> {
        let payload = serde_json::to_value(incident)
            .map_err(|e| AuditError::Persist(anyhow::Error::new(e)))?;
        self.record("incident", "threshold-evaluator", payload)
    }

    /// Record an arbitrary structured payload.
    pub fn record(
        &self,
        category: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<LogRecord, AuditError> {
        let record = LogRecord::new(category, source, payload);

        // Phase 1: primary persist, synchronous, hard error on failure
        self.db.insert_log(&record).map_err(AuditError::Persist)?;

        // Phase 2: detached anchor attempt
        if let Some(ledger) = &self.ledger {
            self.spawn_anchor(record.clone(), Arc::clone(ledger));
        }

        Ok(record)
    }

    /// Lookup by primary id. Always succeeds once phase 1 completed.
    pub fn log_by_id(&self, id: &str) -> Result<Option<LogRecord>, AuditError> {
        self.db.find_log(id).map_err(AuditError::Lookup)
    }

    /// Lookup by anchor reference. Unconfirmed references are NotFound
    /// (`Ok(None)`), not an error.
    pub fn log_by_anchor_ref(&self, anchor_ref: &str) -> Result<Option<LogRecord>, AuditError> {
        self.db.find_log_by_anchor(anchor_ref).map_err(AuditError::Lookup)
    }

    fn spawn_anchor(&self, record: LogRecord, ledger: Arc<dyn LedgerClient>) {
        let db = Arc::clone(&self.db);

        tokio::spawn(async move {
            if let Err(e) = db.set_anchor_state(&record.id, AnchorState::Anchoring) {
                warn!("Failed to mark record {} anchoring: {}", record.id, e);
            }

            match ledger.anchor(&record.id, &record.payload_hash).await {
                Ok(tx_ref) => match db.confirm_anchor(&record.id, &tx_ref) {
                    Ok(true) => {
                        debug!("Anchored audit record {} as {}", record.id, tx_ref);
                    }
                    Ok(false) => {
                        warn!("Record {} already carries an anchor, ignoring {}", record.id, tx_ref);
                    }
                    Err(e) => {
                        warn!("Failed to store anchor ref for {}: {}", record.id, e);
                    }
                },
                Err(e) => {
                    // Terminal: the record stays valid and queryable by id
                    warn!("Anchor attempt failed for record {}: {}", record.id, e);
                    if let Err(e) = db.set_anchor_state(&record.id, AnchorState::AnchorFailed) {
                        warn!("Failed to mark record {} anchor-failed: {}", record.id, e);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedLedger {
        tx_ref: Option<String>,
    }

    #[async_trait]
    impl LedgerClient for FixedLedger {
        async fn anchor(&self, _record_id: &str, _payload_hash: &str) -> Result<String> {
            match &self.tx_ref {
                Some(tx_ref) => Ok(tx_ref.clone()),
                None => Err(anyhow!("ledger unavailable")),
            }
        }
    }

    fn incident() -> Incident {
        use crate::detection::{IncidentStatus, IncidentType, Severity};
        use crate::site::Position;

        Incident {
            id: "inc-1".to_string(),
            site_id: "site-1".to_string(),
            incident_type: IncidentType::EnvironmentalSpill,
            severity: Severity::High,
            status: IncidentStatus::Reported,
            description: "Methane level 0.47% exceeds alert level".to_string(),
            location: Position::new(12.0, 34.0),
            worker_id: None,
            equipment_id: None,
            sensor_id: Some("gas-3".to_string()),
            resolution_notes: None,
            created_at: Utc::now(),
        }
    }

    async fn wait_for_state(
        logger: &AuditLogger,
        id: &str,
        terminal: &[AnchorState],
    ) -> LogRecord {
        for _ in 0..100 {
            let record = logger.log_by_id(id).unwrap().unwrap();
            if terminal.contains(&record.anchor_state) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("record {id} never reached a terminal anchor state");
    }

    #[test]
    fn test_content_hash_stable() {
        let payload = serde_json::json!({"a": 1, "b": "two"});
        let h1 = content_hash(&payload);
        let h2 = content_hash(&payload);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_record_without_ledger_persists_unanchored() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let logger = AuditLogger::new(Arc::clone(&db), None);

        let record = logger.record_incident(&incident()).unwrap();

        let found = logger.log_by_id(&record.id).unwrap().unwrap();
        assert_eq!(found.anchor_state, AnchorState::Unanchored);
        assert!(found.anchor_ref.is_none());
        assert_eq!(found.category, "incident");
        assert_eq!(found.payload_hash, record.payload_hash);
    }

    #[tokio::test]
    async fn test_successful_anchor_roundtrip() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = Arc::new(FixedLedger {
            tx_ref: Some("0xfeed01".to_string()),
        });
        let logger = AuditLogger::new(Arc::clone(&db), Some(ledger));

        let record = logger.record_incident(&incident()).unwrap();
        let anchored = wait_for_state(&logger, &record.id, &[AnchorState::Anchored]).await;
        assert_eq!(anchored.anchor_ref.as_deref(), Some("0xfeed01"));

        let by_ref = logger.log_by_anchor_ref("0xfeed01").unwrap().unwrap();
        assert_eq!(by_ref.id, record.id);
    }

    #[tokio::test]
    async fn test_anchor_failure_leaves_record_valid() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = Arc::new(FixedLedger { tx_ref: None });
        let logger = AuditLogger::new(Arc::clone(&db), Some(ledger));

        // No error surfaces to the caller for an anchor failure
        let record = logger.record_incident(&incident()).unwrap();

        let failed = wait_for_state(&logger, &record.id, &[AnchorState::AnchorFailed]).await;
        assert!(failed.anchor_ref.is_none());

        // Still queryable by primary id; fabricated ref is NotFound
        assert!(logger.log_by_id(&record.id).unwrap().is_some());
        assert!(logger.log_by_anchor_ref("0xnope").unwrap().is_none());
    }
}
