//! Property tests for the window scan and the broadcast gate.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use templog::app::gate::BroadcastGate;
use templog::storage::ReadingLog;
use templog::storage::tail::tail_lines;

// ── Reverse tail scan ≡ forward reference ─────────────────────

/// The obvious forward implementation the block scan must agree with:
/// split on `\n`, take the last `max_items` records, terminate each.
fn forward_window(content: &str, max_items: usize) -> String {
    if max_items == 0 || content.is_empty() {
        return String::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    let records: Vec<&str> = body.split('\n').collect();
    let start = records.len().saturating_sub(max_items);
    records[start..].iter().map(|r| format!("{r}\n")).collect()
}

/// Printable-ASCII lines (no `\n` inside a record), optionally missing
/// the final terminator.  Lengths are chosen so that larger cases cross
/// several 512-byte scan blocks.
fn arb_log_content() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec("[ -~]{0,40}", 0..=120),
        any::<bool>(),
    )
        .prop_map(|(lines, terminated)| {
            let mut s = lines.join("\n");
            if !s.is_empty() && terminated {
                s.push('\n');
            }
            s
        })
}

proptest! {
    #[test]
    fn tail_scan_matches_forward_reference(
        content in arb_log_content(),
        max_items in 0usize..=150,
    ) {
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        let scanned = tail_lines(&mut cursor, max_items).unwrap();
        prop_assert_eq!(scanned, forward_window(&content, max_items));
    }

    /// Every produced window is fully line-terminated and never holds
    /// more than `max_items` records.
    #[test]
    fn tail_scan_output_is_terminated_and_bounded(
        content in arb_log_content(),
        max_items in 1usize..=150,
    ) {
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        let scanned = tail_lines(&mut cursor, max_items).unwrap();

        prop_assert!(scanned.is_empty() || scanned.ends_with('\n'));
        prop_assert!(scanned.split('\n').count().saturating_sub(1) <= max_items);
    }
}

// ── Append/window law on a real log file ──────────────────────

static CASE: AtomicUsize = AtomicUsize::new(0);

fn scratch_path() -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "templog-prop-{}-{}.txt",
        std::process::id(),
        CASE.fetch_add(1, Ordering::Relaxed)
    ));
    p
}

proptest! {
    /// After any sequence of appends, the window equals the formatted
    /// tail of the appended values: last `max_items`, oldest first.
    #[test]
    fn appended_values_come_back_as_the_window(
        raw in proptest::collection::vec(-9999i32..=9999, 1..=60),
        max_items in 1usize..=20,
    ) {
        let path = scratch_path();
        let log = ReadingLog::new(path.clone());

        let values: Vec<f32> = raw.iter().map(|v| *v as f32 / 100.0).collect();
        for v in &values {
            log.append(*v).unwrap();
        }

        let expected: String = values
            [values.len().saturating_sub(max_items)..]
            .iter()
            .map(|v| format!("{v:.2}\n"))
            .collect();
        let window = log.window(max_items).unwrap();
        let _ = std::fs::remove_file(&path);

        prop_assert_eq!(window, expected);
    }
}

// ── Broadcast gate cadence ────────────────────────────────────

proptest! {
    /// Over any monotonic clock sequence, two consecutive fires are never
    /// closer together than the interval, and the first poll always fires.
    #[test]
    fn gate_fires_are_spaced_by_at_least_the_interval(
        deltas in proptest::collection::vec(0u64..=10_000, 1..=100),
        interval_ms in 1u32..=30_000,
    ) {
        let mut gate = BroadcastGate::new();
        let mut now: u64 = 0;
        let mut fires: Vec<u64> = Vec::new();

        for (i, delta) in deltas.iter().enumerate() {
            now += delta;
            let fired = gate.poll(now, interval_ms);
            if i == 0 {
                prop_assert!(fired, "first poll must fire");
            }
            if fired {
                fires.push(now);
            }
        }

        for pair in fires.windows(2) {
            prop_assert!(
                pair[1] - pair[0] >= u64::from(interval_ms),
                "fires at {} and {} violate a {} ms interval",
                pair[0], pair[1], interval_ms
            );
        }
    }

    /// The gate never goes quiet: once the interval has fully elapsed
    /// since the last fire, the next poll fires.
    #[test]
    fn gate_never_misses_an_elapsed_interval(
        deltas in proptest::collection::vec(0u64..=10_000, 1..=100),
        interval_ms in 1u32..=30_000,
    ) {
        let mut gate = BroadcastGate::new();
        let mut now: u64 = 0;
        let mut last_fire: Option<u64> = None;

        for delta in &deltas {
            now += delta;
            let due = match last_fire {
                None => true,
                Some(at) => now - at >= u64::from(interval_ms),
            };
            let fired = gate.poll(now, interval_ms);
            prop_assert_eq!(fired, due, "poll at {} disagrees", now);
            if fired {
                last_fire = Some(now);
            }
        }
    }
}
