//! Fuzz target: `storage::tail::tail_lines`
//!
//! Drives arbitrary byte content through the backward block scan and
//! asserts that it never panics, always returns a line-terminated
//! window, and yields exactly `min(lines, max_items)` lines no matter
//! where the terminators fall.
//!
//! cargo fuzz run fuzz_tail_window

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use templog::storage::tail::tail_lines;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the window size, the rest is log content. Keeping
    // the bound above the 512-byte block size exercises multi-block scans.
    let max_items = usize::from(data[0] % 96);
    let content = &data[1..];

    let mut src = Cursor::new(content.to_vec());
    let window = tail_lines(&mut src, max_items).expect("in-memory scan cannot fail");

    // Every non-empty window ends in a terminator, even when the source
    // content does not.
    assert!(
        window.is_empty() || window.ends_with('\n'),
        "window missing trailing terminator"
    );

    // Lines in the window: replacement characters introduced by lossy
    // decoding never contain a newline, so counting terminators is exact.
    let got = window.matches('\n').count();
    let total = if content.is_empty() {
        0
    } else {
        let terminators = content.iter().filter(|b| **b == b'\n').count();
        if content.ends_with(b"\n") {
            terminators
        } else {
            terminators + 1
        }
    };
    assert_eq!(got, total.min(max_items), "wrong line count in window");

    // A zero-sized window is always empty.
    let mut src = Cursor::new(content.to_vec());
    assert!(tail_lines(&mut src, 0).expect("scan").is_empty());
});
