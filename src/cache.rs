//! Shared snapshot of the historical window.
//!
//! The tick loop is the only writer; HTTP handlers and the websocket push
//! path read it.  Readers always see a complete window from some past tick,
//! never a half-written one, and the snapshot survives storage outages: on a
//! failed scan the loop simply does not replace it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to the last successfully computed window.
///
/// Starts empty; an empty snapshot means no window has been computed yet.
#[derive(Clone, Default)]
pub struct HistoryCache {
    inner: Arc<Mutex<String>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A poisoned window is still a complete window from some past tick.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a freshly computed window.
    pub fn replace(&self, window: String) {
        *self.lock() = window;
    }

    /// Clone out the current window.  Empty until the first successful scan.
    pub fn snapshot(&self) -> String {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert_eq!(HistoryCache::new().snapshot(), "");
    }

    #[test]
    fn replace_then_snapshot() {
        let cache = HistoryCache::new();
        cache.replace("20.10\n20.50\n".to_string());
        assert_eq!(cache.snapshot(), "20.10\n20.50\n");
    }

    #[test]
    fn clones_share_the_same_window() {
        let writer = HistoryCache::new();
        let reader = writer.clone();
        writer.replace("21.00\n".to_string());
        assert_eq!(reader.snapshot(), "21.00\n");
    }

    #[test]
    fn reader_keeps_old_window_until_replaced() {
        let cache = HistoryCache::new();
        cache.replace("19.80\n".to_string());
        let before = cache.snapshot();
        cache.replace("19.80\n22.20\n".to_string());
        assert_eq!(before, "19.80\n");
        assert_eq!(cache.snapshot(), "19.80\n22.20\n");
    }
}
