//! Monitor service — the hexagonal core.
//!
//! [`MonitorService`] owns the reading log, the shared window cache and the
//! broadcast gate.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  SamplePort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │     MonitorService      │
//!      Clock ──▶  │   log · cache · gate    │ ──▶ BroadcastSink
//!                 └────────────────────────┘
//! ```
//!
//! One call to [`tick`](MonitorService::tick) is one monitoring cycle:
//! sample, append, rescan, maybe push.  Pacing between cycles belongs to
//! the caller (hardware timer on device, a sleep loop on the host).

use log::{info, warn};

use crate::cache::HistoryCache;
use crate::config::SystemConfig;
use crate::storage::ReadingLog;

use super::events::{AppEvent, StorageOp};
use super::gate::BroadcastGate;
use super::ports::{BroadcastSink, Clock, EventSink, SamplePort};

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

/// Orchestrates one measurement pipeline per tick.
///
/// The service is the sole writer of both the log and the cache; HTTP
/// handlers only ever read the cache through their own cloned handle.
pub struct MonitorService {
    config: SystemConfig,
    log: ReadingLog,
    cache: HistoryCache,
    gate: BroadcastGate,
    tick_count: u64,
}

impl MonitorService {
    /// Construct the service around an existing log and a cache handle.
    ///
    /// The cache handle is meant to be cloned out to readers before or
    /// after this call; the snapshot stays empty until the first tick.
    pub fn new(config: SystemConfig, log: ReadingLog, cache: HistoryCache) -> Self {
        Self {
            config,
            log,
            cache,
            gate: BroadcastGate::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            max_items: self.config.max_items,
        });
        info!(
            "MonitorService started: window={} items, tick={} ms, push={} ms",
            self.config.max_items, self.config.tick_interval_ms, self.config.broadcast_interval_ms
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full monitoring cycle.
    ///
    /// Degraded stages warn and carry on — a tick never aborts partway.
    /// A lost append loses that one measurement; a failed scan leaves the
    /// cached window from the previous tick in place.
    pub fn tick(
        &mut self,
        sensor: &impl SamplePort,
        clock: &impl Clock,
        sink: &mut impl EventSink,
        push: &mut impl BroadcastSink,
    ) {
        self.tick_count += 1;

        // 1. Sample via SamplePort.  A faulted sensor records the NaN
        //    sentinel so the outage shows up in the log as a gap, not as
        //    a silently shorter history.
        let value = match sensor.sample(self.config.unit) {
            Ok(value) => {
                sink.emit(&AppEvent::SampleRecorded {
                    value,
                    unit: self.config.unit,
                });
                value
            }
            Err(e) => {
                warn!("Sensor fault: {} — recording sentinel", e);
                sink.emit(&AppEvent::SensorFault);
                f32::NAN
            }
        };

        // 2. Append the measurement to the reading log.
        if let Err(err) = self.log.append(value) {
            warn!("Measurement lost, append failed: {}", err);
            sink.emit(&AppEvent::StorageDegraded {
                op: StorageOp::Append,
                err,
            });
        }

        // 3. Recompute the window and swap it into the cache.  Readers
        //    keep the stale window if the scan fails.
        match self.log.window(usize::from(self.config.max_items)) {
            Ok(window) => {
                let lines = window.lines().count();
                let bytes = window.len();
                self.cache.replace(window);
                sink.emit(&AppEvent::WindowRefreshed { lines, bytes });
            }
            Err(err) => {
                warn!("Window scan failed, serving stale cache: {}", err);
                sink.emit(&AppEvent::StorageDegraded {
                    op: StorageOp::Scan,
                    err,
                });
            }
        }

        // 4. Push the cached window on the slow cadence.
        if self
            .gate
            .poll(clock.now_ms(), self.config.broadcast_interval_ms)
        {
            let clients = push.broadcast(&self.cache.snapshot());
            sink.emit(&AppEvent::BroadcastSent { clients });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// A second handle to the shared window cache, for HTTP readers.
    pub fn cache_handle(&self) -> HistoryCache {
        self.cache.clone()
    }

    /// Total monitoring cycles executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TempUnit;
    use crate::error::SensorError;

    struct FixedSensor(f32);
    impl SamplePort for FixedSensor {
        fn sample(&self, _unit: TempUnit) -> Result<f32, SensorError> {
            Ok(self.0)
        }
    }

    struct FixedClock(u64);
    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    struct NullSink;
    impl EventSink for NullSink {
        fn emit(&mut self, _event: &AppEvent) {}
    }

    struct NullPush;
    impl BroadcastSink for NullPush {
        fn broadcast(&mut self, _payload: &str) -> usize {
            0
        }
    }

    fn scratch_log(name: &str) -> ReadingLog {
        let mut path = std::env::temp_dir();
        path.push(format!("templog-svc-{}-{}.txt", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        ReadingLog::new(path)
    }

    #[test]
    fn one_tick_fills_the_cache() {
        let log = scratch_log("one-tick");
        let path = log.path().to_path_buf();
        let mut svc = MonitorService::new(SystemConfig::default(), log, HistoryCache::new());
        let cache = svc.cache_handle();
        assert_eq!(cache.snapshot(), "");

        svc.tick(&FixedSensor(21.5), &FixedClock(0), &mut NullSink, &mut NullPush);

        assert_eq!(cache.snapshot(), "21.50\n");
        assert_eq!(svc.tick_count(), 1);
        let _ = std::fs::remove_file(path);
    }
}
