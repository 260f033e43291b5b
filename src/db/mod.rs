// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Database module for persistent storage

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::audit::{AnchorState, LogRecord};
use crate::config::DatabaseConfig;
use crate::detection::Incident;

/// Database manager
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        // Create parent directories
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        // Configure SQLite for performance
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.create_tables()?;

        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    /// In-memory database, used by tests and demo runs without persistence
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_tables()?;
        Ok(db)
    }

    /// Create database tables
    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Audit trail
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                source TEXT NOT NULL,
                payload TEXT NOT NULL,
                payload_hash TEXT NOT NULL,
                anchor_ref TEXT UNIQUE,
                anchor_state TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_created ON audit_log(created_at);

            -- Incidents
            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL,
                incident_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                status TEXT NOT NULL,
                description TEXT NOT NULL,
                location_x REAL NOT NULL,
                location_y REAL NOT NULL,
                worker_id TEXT,
                equipment_id TEXT,
                sensor_id TEXT,
                created_at TEXT NOT NULL,
                data BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_incidents_created ON incidents(created_at);
            CREATE INDEX IF NOT EXISTS idx_incidents_site ON incidents(site_id);

            -- Simulation sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                tick_count INTEGER DEFAULT 0,
                incident_count INTEGER DEFAULT 0
            );
        "#,
        )?;

        Ok(())
    }

    /// Insert an audit log record (phase 1 of the two-phase write)
    pub fn insert_log(&self, record: &LogRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"INSERT INTO audit_log
               (id, category, source, payload, payload_hash, anchor_ref, anchor_state, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                record.id,
                record.category,
                record.source,
                record.payload.to_string(),
                record.payload_hash,
                record.anchor_ref,
                record.anchor_state.as_str(),
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Look up an audit record by primary id. `Ok(None)` means not found;
    /// `Err` means the lookup itself failed.
    pub fn find_log(&self, id: &str) -> Result<Option<LogRecord>> {
        let conn = self.conn.lock().unwrap();

        let record = conn
            .query_row(
                r#"SELECT id, category, source, payload, payload_hash, anchor_ref, anchor_state, created_at
                   FROM audit_log WHERE id = ?1"#,
                params![id],
                row_to_log,
            )
            .optional()?;

        Ok(record)
    }

    /// Look up an audit record by its anchor transaction reference.
    /// Unconfirmed or fabricated references return `Ok(None)`.
    pub fn find_log_by_anchor(&self, anchor_ref: &str) -> Result<Option<LogRecord>> {
        let conn = self.conn.lock().unwrap();

        let record = conn
            .query_row(
                r#"SELECT id, category, source, payload, payload_hash, anchor_ref, anchor_state, created_at
                   FROM audit_log WHERE anchor_ref = ?1"#,
                params![anchor_ref],
                row_to_log,
            )
            .optional()?;

        Ok(record)
    }

    /// Record an anchor state transition without touching the reference.
    pub fn set_anchor_state(&self, id: &str, state: AnchorState) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE audit_log SET anchor_state = ?2 WHERE id = ?1",
            params![id, state.as_str()],
        )?;
        Ok(())
    }

    /// Confirm an anchor: store the transaction reference and mark the record
    /// Anchored. Refuses to overwrite an existing reference - an anchored
    /// record is never re-anchored.
    pub fn confirm_anchor(&self, id: &str, tx_ref: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE audit_log SET anchor_ref = ?2, anchor_state = ?3
             WHERE id = ?1 AND anchor_ref IS NULL",
            params![id, tx_ref, AnchorState::Anchored.as_str()],
        )?;
        Ok(updated == 1)
    }

    /// Store an incident
    pub fn store_incident(&self, incident: &Incident) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let data = bincode::serialize(incident)?;

        conn.execute(
            r#"INSERT INTO incidents
               (id, site_id, incident_type, severity, status, description,
                location_x, location_y, worker_id, equipment_id, sensor_id, created_at, data)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                incident.id,
                incident.site_id,
                format!("{:?}", incident.incident_type),
                format!("{:?}", incident.severity),
                format!("{:?}", incident.status),
                incident.description,
                incident.location.x,
                incident.location.y,
                incident.worker_id,
                incident.equipment_id,
                incident.sensor_id,
                incident.created_at.to_rfc3339(),
                data,
            ],
        )?;

        Ok(())
    }

    /// Most recent incidents for a site, newest first
    pub fn recent_incidents(&self, site_id: &str, limit: usize) -> Result<Vec<Incident>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT data FROM incidents WHERE site_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![site_id, limit as i64], |row| {
            row.get::<_, Vec<u8>>(0)
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(bincode::deserialize(&row?)?);
        }

        Ok(results)
    }

    /// Open a simulation session row
    pub fn insert_session(&self, id: &str, site_id: &str, start: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (id, site_id, start_time) VALUES (?1, ?2, ?3)",
            params![id, site_id, start.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Finalize a simulation session row on stop
    pub fn finalize_session(
        &self,
        id: &str,
        end: DateTime<Utc>,
        tick_count: u64,
        incident_count: u64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET end_time = ?2, tick_count = ?3, incident_count = ?4 WHERE id = ?1",
            params![id, end.to_rfc3339(), tick_count as i64, incident_count as i64],
        )?;
        Ok(())
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn.lock().unwrap();

        let log_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;

        let incident_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?;

        let size_bytes: i64 = conn
            .query_row(
                "SELECT page_count * page_size as size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        Ok(DatabaseStats {
            log_count: log_count as usize,
            incident_count: incident_count as usize,
            size_bytes: size_bytes as u64,
        })
    }

    /// Cleanup old data
    pub fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);

        let deleted_logs = conn.execute(
            "DELETE FROM audit_log WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;

        let deleted_incidents = conn.execute(
            "DELETE FROM incidents WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;

        conn.execute("VACUUM", [])?;

        info!(
            "Cleaned up {} audit records and {} incidents older than {} days",
            deleted_logs, deleted_incidents, retention_days
        );

        Ok(deleted_logs + deleted_incidents)
    }
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRecord> {
    let payload: String = row.get(3)?;
    let created_at: String = row.get(7)?;
    let anchor_state: String = row.get(6)?;

    Ok(LogRecord {
        id: row.get(0)?,
        category: row.get(1)?,
        source: row.get(2)?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        payload_hash: row.get(4)?,
        anchor_ref: row.get(5)?,
        anchor_state: AnchorState::from_str_or_default(&anchor_state),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub log_count: usize,
    pub incident_count: usize,
    pub size_bytes: u64,
}
