//! Simulation engine - owns the entity store and drives the tick cycle

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use super::{EventBus, SimulationClock, SiteSnapshot};
use crate::audit::{AuditError, AuditLogger, LogRecord};
use crate::config::Config;
use crate::db::Database;
use crate::detection::{Incident, ThresholdEvaluator};
use crate::emissions::CarbonAccumulator;
use crate::roster::RosterProvider;
use crate::sim::{EquipmentUpdater, RawEvent, SensorUpdater, WorkerUpdater};
use crate::site::{EntityStore, SiteRoster};

/// In-memory incident ring exposed through snapshots
const RECENT_INCIDENTS_CAP: usize = 100;

/// Everything one tick needs, shared with the clock's worker task.
struct TickContext {
    store: Mutex<EntityStore>,
    rng: Mutex<ChaCha8Rng>,
    workers: WorkerUpdater,
    equipment: EquipmentUpdater,
    sensors: SensorUpdater,
    evaluator: ThresholdEvaluator,
    carbon: CarbonAccumulator,
    recent: Mutex<VecDeque<Incident>>,
    snapshot: RwLock<SiteSnapshot>,
    tick_count: AtomicU64,
    incident_count: AtomicU64,
    audit: Arc<AuditLogger>,
    db: Arc<Database>,
    bus: Arc<EventBus>,
}

impl TickContext {
    fn new(
        config: &Config,
        roster: SiteRoster,
        audit: Arc<AuditLogger>,
        db: Arc<Database>,
        bus: Arc<EventBus>,
    ) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let site_id = roster.site_id.clone();

        Self {
            store: Mutex::new(EntityStore::from_roster(roster)),
            rng: Mutex::new(rng),
            workers: WorkerUpdater::new(&config.simulation),
            equipment: EquipmentUpdater::new(&config.simulation, &config.emissions),
            sensors: SensorUpdater::new(&config.simulation),
            evaluator: ThresholdEvaluator::new(&config.thresholds),
            carbon: CarbonAccumulator::new(),
            recent: Mutex::new(VecDeque::new()),
            snapshot: RwLock::new(SiteSnapshot::empty(&site_id)),
            tick_count: AtomicU64::new(0),
            incident_count: AtomicU64::new(0),
            audit,
            db,
            bus,
        }
    }
}

/// Drives the monitoring cycle for one site at a time.
///
/// Owns the entity store for the running session. The control surface is
/// idempotent: starting while running switches sites (stop, replace store,
/// start), and stopping twice is a no-op. Snapshots expose the last
/// successfully computed state only.
pub struct SimulationEngine {
    config: Arc<Config>,
    db: Arc<Database>,
    bus: Arc<EventBus>,
    audit: Arc<AuditLogger>,
    roster: Arc<dyn RosterProvider>,
    clock: SimulationClock,
    ctx: Option<Arc<TickContext>>,
    session_id: Option<String>,
}

impl SimulationEngine {
    pub fn new(
        config: Arc<Config>,
        db: Arc<Database>,
        roster: Arc<dyn RosterProvider>,
        audit: Arc<AuditLogger>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            db,
            bus,
            audit,
            roster,
            clock: SimulationClock::new(),
            ctx: None,
            session_id: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Start monitoring a site. A running session is stopped first, so this
    /// doubles as the site-switch operation. The carbon total and tick
    /// counter restart from zero for the new session.
    pub async fn start_simulation(
        &mut self,
        site_id: &str,
        tick_interval: Option<Duration>,
    ) -> Result<()> {
        if self.clock.is_running() {
            info!("Simulation already running, restarting for site {}", site_id);
            self.stop_simulation().await?;
        }

        let roster = self
            .roster
            .fetch(site_id)
            .await
            .with_context(|| format!("failed to fetch roster for site {site_id}"))?;
        info!(
            "Roster for {}: {} workers, {} equipment, {} sensors",
            site_id,
            roster.workers.len(),
            roster.equipment.len(),
            roster.sensors.len()
        );

        let ctx = Arc::new(TickContext::new(
            &self.config,
            roster,
            Arc::clone(&self.audit),
            Arc::clone(&self.db),
            Arc::clone(&self.bus),
        ));

        let session_id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.db.insert_session(&session_id, site_id, Utc::now()) {
            warn!("Failed to record session start: {}", e);
        }

        let period = tick_interval.unwrap_or(Duration::from_secs_f64(
            self.config.simulation.tick_interval_secs,
        ));

        let tick_ctx = Arc::clone(&ctx);
        self.clock.start(period, move || {
            let ctx = Arc::clone(&tick_ctx);
            async move { run_tick(ctx) }
        });

        self.ctx = Some(ctx);
        self.session_id = Some(session_id);
        info!("Simulation started for site {} at {:?} per tick", site_id, period);
        Ok(())
    }

    /// Stop the running session. Idempotent; no tick starts after this
    /// returns. In-flight ledger anchors are left to complete on their own.
    pub async fn stop_simulation(&mut self) -> Result<()> {
        self.clock.stop().await;

        if let Some(session_id) = self.session_id.take() {
            if let Some(ctx) = &self.ctx {
                let ticks = ctx.tick_count.load(Ordering::SeqCst);
                let incidents = ctx.incident_count.load(Ordering::SeqCst);
                if let Err(e) =
                    self.db
                        .finalize_session(&session_id, Utc::now(), ticks, incidents)
                {
                    warn!("Failed to finalize session {}: {}", session_id, e);
                }
                info!(
                    "Simulation stopped after {} ticks, {} incidents",
                    ticks, incidents
                );
            }
        }

        Ok(())
    }

    /// Last successfully computed snapshot, if a session has ever run.
    /// Stale-but-consistent: a failed tick leaves the previous snapshot.
    pub fn snapshot(&self) -> Option<SiteSnapshot> {
        self.ctx.as_ref().map(|ctx| ctx.snapshot.read().clone())
    }

    pub fn carbon_total(&self) -> f64 {
        self.ctx.as_ref().map_or(0.0, |ctx| ctx.carbon.total())
    }

    /// Audit lookup surface
    pub fn log_by_anchor_ref(&self, anchor_ref: &str) -> Result<Option<LogRecord>, AuditError> {
        self.audit.log_by_anchor_ref(anchor_ref)
    }
}

/// One tick: updaters, evaluator, audit, metrics, publish. Any error is
/// caught here so the clock keeps running; the snapshot is only replaced on
/// success.
fn run_tick(ctx: Arc<TickContext>) {
    if let Err(e) = execute_tick(&ctx) {
        error!("Tick failed, keeping previous state for this cycle: {:#}", e);
    }
}

fn execute_tick(ctx: &TickContext) -> Result<()> {
    let mut store = ctx.store.lock();
    let mut rng = ctx.rng.lock();

    let mut events: Vec<RawEvent> = Vec::new();
    let mut emission_delta = 0.0;

    // The three updaters touch disjoint collections
    for worker in &mut store.workers {
        events.push(ctx.workers.update(worker, &mut *rng));
    }
    for unit in &mut store.equipment {
        let outcome = ctx.equipment.update(unit, &mut *rng);
        emission_delta += outcome.emission_delta;
        if let Some(raw) = outcome.raw {
            events.push(raw);
        }
    }
    for sensor in &mut store.sensors {
        events.push(ctx.sensors.update(sensor, &mut *rng));
    }
    drop(rng);

    // Evaluator runs only after all updaters completed for this tick
    let incidents = ctx.evaluator.evaluate(store.site_id(), &events);

    for incident in &incidents {
        // An audit failure for one incident never halts the simulation
        if let Err(e) = ctx.audit.record_incident(incident) {
            error!("Audit write failed for incident {}: {}", incident.id, e);
        }
        if let Err(e) = ctx.db.store_incident(incident) {
            error!("Incident persist failed for {}: {}", incident.id, e);
        }
        ctx.bus.publish_incident(incident.clone());
    }

    let carbon_total = ctx.carbon.add(emission_delta);
    let tick = ctx.tick_count.fetch_add(1, Ordering::SeqCst) + 1;
    ctx.incident_count
        .fetch_add(incidents.len() as u64, Ordering::SeqCst);

    let recent_incidents = {
        let mut recent = ctx.recent.lock();
        for incident in &incidents {
            recent.push_back(incident.clone());
        }
        while recent.len() > RECENT_INCIDENTS_CAP {
            recent.pop_front();
        }
        // Newest first for consumers
        recent.iter().rev().cloned().collect()
    };

    let snapshot = SiteSnapshot {
        site_id: store.site_id().to_string(),
        tick,
        taken_at: Utc::now(),
        workers: store.workers.clone(),
        equipment: store.equipment.clone(),
        sensors: store.sensors.clone(),
        carbon_total_kg: carbon_total,
        recent_incidents,
    };
    drop(store);

    *ctx.snapshot.write() = snapshot.clone();
    ctx.bus.publish_snapshot(snapshot);

    debug!(
        "Tick {} complete: {} raw events, {} incidents",
        tick,
        events.len(),
        incidents.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::IncidentType;
    use crate::roster::DemoRoster;
    use crate::site::EquipmentStatus;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        // Deterministic: no PPE drops, no maintenance flags
        config.simulation.ppe_failure_probability = 0.0;
        config.simulation.maintenance_probability = 0.0;
        config.simulation.seed = Some(42);
        config
    }

    fn context(config: &Config, site_id: &str) -> (Arc<TickContext>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let audit = Arc::new(AuditLogger::new(Arc::clone(&db), None));
        let bus = Arc::new(EventBus::new(64));
        let ctx = Arc::new(TickContext::new(
            config,
            DemoRoster::generate(site_id),
            audit,
            Arc::clone(&db),
            bus,
        ));
        (ctx, db)
    }

    #[test]
    fn test_carbon_total_sums_operational_deltas() {
        let config = quiet_config();
        let (ctx, _db) = context(&config, "site-1");

        let roster = DemoRoster::generate("site-1");
        let hours = config.simulation.tick_interval_secs / 3600.0;
        let updater = EquipmentUpdater::new(&config.simulation, &config.emissions);
        let per_tick: f64 = roster
            .equipment
            .iter()
            .filter(|e| e.status == EquipmentStatus::Operational)
            .map(|e| e.consumption_rate * hours * updater.emission_factor(e.fuel))
            .sum();

        for _ in 0..10 {
            execute_tick(&ctx).unwrap();
        }

        let expected = per_tick * 10.0;
        let total = ctx.carbon.total();
        assert!(
            (total - expected).abs() < 1e-9,
            "carbon total {total} != expected {expected}"
        );
        assert!(total > 0.0);
    }

    #[test]
    fn test_snapshot_reflects_ticks_and_site() {
        let config = quiet_config();
        let (ctx, _db) = context(&config, "north-pit");

        execute_tick(&ctx).unwrap();
        execute_tick(&ctx).unwrap();

        let snapshot = ctx.snapshot.read().clone();
        assert_eq!(snapshot.site_id, "north-pit");
        assert_eq!(snapshot.tick, 2);
        assert!(!snapshot.workers.is_empty());
        assert!(snapshot
            .sensors
            .iter()
            .all(|s| s.last_reading.is_some() && s.history.len() == 2));
    }

    #[test]
    fn test_forced_ppe_violations_recorded_and_persisted() {
        let mut config = quiet_config();
        config.simulation.ppe_failure_probability = 1.0;
        // Keep gas readings below the alert surface so counts are exact
        config.thresholds.methane_alert_level = 1.0;
        let (ctx, db) = context(&config, "site-1");

        let mut incident_rx = ctx.bus.subscribe_incidents();
        execute_tick(&ctx).unwrap();

        let worker_count = DemoRoster::generate("site-1").workers.len();
        let snapshot = ctx.snapshot.read().clone();
        let violations = snapshot
            .recent_incidents
            .iter()
            .filter(|i| i.incident_type == IncidentType::PpeViolation)
            .count();
        assert_eq!(violations, worker_count);

        // Broadcast and primary store both carry the incidents
        assert!(incident_rx.try_recv().is_ok());
        assert_eq!(db.get_stats().unwrap().incident_count, worker_count);
        assert_eq!(db.get_stats().unwrap().log_count, worker_count);
        assert_eq!(db.recent_incidents("site-1", 50).unwrap().len(), worker_count);
    }

    #[tokio::test]
    async fn test_engine_lifecycle_start_switch_stop() {
        let config = Arc::new(quiet_config());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let audit = Arc::new(AuditLogger::new(Arc::clone(&db), None));
        let bus = Arc::new(EventBus::new(64));
        let mut engine = SimulationEngine::new(
            Arc::clone(&config),
            db,
            Arc::new(DemoRoster),
            audit,
            bus,
        );

        assert!(engine.snapshot().is_none());

        engine
            .start_simulation("site-1", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(engine.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let snapshot = engine.snapshot().unwrap();
        assert!(snapshot.tick > 0);
        assert_eq!(snapshot.site_id, "site-1");

        // Site switch: start while running stops, replaces the store, restarts
        engine
            .start_simulation("south-pit", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.site_id, "south-pit");
        // Session-scoped counters restarted
        assert!(snapshot.tick < 10);

        engine.stop_simulation().await.unwrap();
        assert!(!engine.is_running());
        let tick_at_stop = engine.snapshot().unwrap().tick;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(engine.snapshot().unwrap().tick, tick_at_stop);

        // Idempotent
        engine.stop_simulation().await.unwrap();
    }
}
