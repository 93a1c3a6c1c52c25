//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them — log to serial, count,
//! record in a test harness.

use crate::config::TempUnit;
use crate::error::StorageError;

/// Structured events emitted by the monitoring core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The monitor service has started (carries the configured window size).
    Started { max_items: u16 },

    /// A measurement was taken and handed to the log.
    SampleRecorded { value: f32, unit: TempUnit },

    /// The sensor could not produce a reading; the NaN sentinel was
    /// recorded in its place.
    SensorFault,

    /// A storage operation failed.  The tick carries on: a failed append
    /// loses that one measurement, a failed scan leaves the cached window
    /// as it was.
    StorageDegraded { op: StorageOp, err: StorageError },

    /// The historical window was recomputed and swapped into the cache.
    WindowRefreshed { lines: usize, bytes: usize },

    /// The cached window was pushed to connected clients.
    BroadcastSent { clients: usize },
}

/// Which storage operation inside a tick degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    /// Appending the fresh measurement.
    Append,
    /// Scanning the tail of the log for the window.
    Scan,
}
