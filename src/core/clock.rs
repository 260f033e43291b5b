// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Simulation clock - cancellable periodic tick scheduler

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Fires ticks at a fixed period on a single worker task.
///
/// At most one tick executes at any instant: the tick future runs inline in
/// the worker loop, and ticks that come due while one is still executing are
/// skipped rather than queued. `stop` is idempotent and returns only after
/// the worker task has exited, so no further ticks run afterwards. A tick
/// that has started always completes; stopping only prevents new ticks.
pub struct SimulationClock {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self {
            handle: None,
            shutdown_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Begin firing ticks at `period`. The first tick fires immediately.
    /// Callers must `stop` a running clock before starting it again.
    pub fn start<F, Fut>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        assert!(
            self.handle.is_none(),
            "clock already running; stop it before restarting"
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Simulation clock stopping");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
    }

    /// Stop the clock. Idempotent; waits for the worker task to exit, so a
    /// tick in flight completes before this returns.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticks_fire_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut clock = SimulationClock::new();

        let c = Arc::clone(&count);
        clock.start(Duration::from_millis(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        clock.stop().await;

        let at_stop = count.load(Ordering::SeqCst);
        assert!(at_stop >= 2, "expected several ticks, got {at_stop}");

        // No further ticks after stop returns
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test]
    async fn test_stop_twice_is_noop() {
        let mut clock = SimulationClock::new();
        clock.start(Duration::from_millis(10), || async {});

        clock.stop().await;
        clock.stop().await;
        assert!(!clock.is_running());

        // And stopping a never-started clock is fine too
        let mut idle = SimulationClock::new();
        idle.stop().await;
    }

    #[tokio::test]
    async fn test_slow_ticks_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let mut clock = SimulationClock::new();

        let f = Arc::clone(&in_flight);
        let m = Arc::clone(&max_seen);
        let r = Arc::clone(&runs);
        // Tick takes 25ms against a 5ms period
        clock.start(Duration::from_millis(5), move || {
            let f = Arc::clone(&f);
            let m = Arc::clone(&m);
            let r = Arc::clone(&r);
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(25)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        clock.stop().await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1, "ticks overlapped");
        // Missed ticks are skipped, not queued: far fewer runs than period slots
        let total = runs.load(Ordering::SeqCst);
        assert!(total <= 10, "expected skipped ticks, got {total} runs");
    }

    #[tokio::test]
    async fn test_inflight_tick_completes_before_stop_returns() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut clock = SimulationClock::new();

        let f = Arc::clone(&finished);
        clock.start(Duration::from_millis(5), move || {
            let f = Arc::clone(&f);
            async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Let the first tick start, then stop mid-tick
        tokio::time::sleep(Duration::from_millis(10)).await;
        clock.stop().await;
        assert!(finished.load(Ordering::SeqCst) >= 1);
    }
}
