//! Broadcast cadence gate.
//!
//! Sampling runs every tick; pushing the window to websocket clients runs
//! on its own, slower cadence.  This module is the whole of that policy: a
//! pure elapsed-time comparison plus one remembered instant.  Keeping the
//! two intervals separate lets either be retuned without touching the other
//! (the defaults broadcast once per six ticks).

/// `true` once `interval_ms` has elapsed since `last_fired_ms`.
///
/// Strictly earlier instants stay `false`; the boundary instant fires.
/// A clock that stalls or reports an instant before `last_fired_ms` must
/// not fire early, hence the saturating subtraction.
pub fn should_fire(now_ms: u64, last_fired_ms: u64, interval_ms: u32) -> bool {
    now_ms.saturating_sub(last_fired_ms) >= u64::from(interval_ms)
}

/// Stateful wrapper the tick loop polls once per tick.
///
/// The gate starts disarmed: the first poll fires, so clients see a window
/// as soon as one exists rather than waiting out a full interval after boot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastGate {
    last_fired_ms: Option<u64>,
}

impl BroadcastGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a broadcast is due at `now_ms`.  Re-arms itself when it is.
    pub fn poll(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        let due = match self.last_fired_ms {
            None => true,
            Some(last) => should_fire(now_ms, last, interval_ms),
        };
        if due {
            self.last_fired_ms = Some(now_ms);
        }
        due
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }
}
