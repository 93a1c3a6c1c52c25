//! Bounded reverse tail scan over newline-delimited logs.
//!
//! The reading log grows without bound, so the historical window must be
//! computed from the end of the file backward: seek to EOF, read fixed-size
//! blocks in reverse, and count newline boundaries until enough line starts
//! have been found.  Cost is proportional to the window size in bytes, never
//! to the file size.
//!
//! ```text
//!   file: ....|20.1\n20.5\n|21.0\n19.8\n|
//!                           ◀── block ──┘
//!              ◀── block ──┘   (stop: max_items boundaries found)
//! ```
//!
//! Scanning operates on raw bytes; non-UTF-8 content passes through the
//! lossy conversion at the end rather than failing the scan.

use std::io::{Read, Seek, SeekFrom};

/// Reverse scan granularity.  One block is the most that is read beyond
/// the window itself.
const SCAN_BLOCK: u64 = 512;

/// Return the last `max_items` newline-delimited records of `src`, in
/// original (oldest-first) order, each terminated by `\n`.
///
/// - An empty source yields an empty string.
/// - A source with fewer records than `max_items` yields all of them.
/// - A final record without a trailing newline is still captured, and gains
///   one in the output.
/// - `max_items == 0` yields an empty string without touching `src`.
///
/// The caller decides what an I/O error means; this function only reports it.
pub fn tail_lines<R: Read + Seek>(src: &mut R, max_items: usize) -> std::io::Result<String> {
    if max_items == 0 {
        return Ok(String::new());
    }

    let len = src.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(String::new());
    }

    // A trailing newline terminates the final record; it must not count as
    // a boundary, so the scan stops just before it.
    let mut last = [0u8; 1];
    src.seek(SeekFrom::Start(len - 1))?;
    src.read_exact(&mut last)?;
    let scan_end = if last[0] == b'\n' { len - 1 } else { len };

    // Walk backward block by block.  `start` is the resolved offset of the
    // oldest line in the window; it stays 0 (start of file) when fewer than
    // `max_items` boundaries exist.
    let mut pos = scan_end;
    let mut found = 0usize;
    let mut start = 0u64;
    let mut resolved = false;
    let mut blocks: Vec<Vec<u8>> = Vec::new();

    while pos > 0 && !resolved {
        let block_start = pos.saturating_sub(SCAN_BLOCK);
        let mut block = vec![0u8; (pos - block_start) as usize];
        src.seek(SeekFrom::Start(block_start))?;
        src.read_exact(&mut block)?;

        for (i, byte) in block.iter().enumerate().rev() {
            if *byte == b'\n' {
                found += 1;
                if found == max_items {
                    start = block_start + i as u64 + 1;
                    resolved = true;
                    break;
                }
            }
        }

        blocks.push(block);
        pos = block_start;
    }

    // Blocks were read newest-first and cover [pos, scan_end); reassemble
    // in file order and trim everything before the window start.
    let mut bytes = Vec::with_capacity((scan_end - start) as usize + 1);
    for block in blocks.iter().rev() {
        bytes.extend_from_slice(block);
    }
    let trim = (start - pos) as usize;

    // The final record's terminator was excluded from the scan range (or
    // never existed), so the window always gains exactly one here.
    let mut window = String::from_utf8_lossy(&bytes[trim..]).into_owned();
    window.push('\n');
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tail(content: &str, max_items: usize) -> String {
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        tail_lines(&mut cursor, max_items).unwrap()
    }

    #[test]
    fn empty_file_yields_empty_window() {
        assert_eq!(tail("", 50), "");
    }

    #[test]
    fn zero_max_items_yields_empty_window() {
        assert_eq!(tail("20.1\n20.5\n", 0), "");
        assert_eq!(tail("", 0), "");
    }

    #[test]
    fn fewer_lines_than_max_returns_all() {
        assert_eq!(tail("20.1\n20.5\n", 50), "20.1\n20.5\n");
    }

    #[test]
    fn exactly_max_lines_returns_all() {
        assert_eq!(tail("20.1\n20.5\n21.0\n", 3), "20.1\n20.5\n21.0\n");
    }

    #[test]
    fn more_lines_than_max_returns_last_max_oldest_first() {
        assert_eq!(tail("20.1\n20.5\n21.0\n19.8\n", 2), "21.0\n19.8\n");
    }

    #[test]
    fn single_line_window() {
        assert_eq!(tail("20.1\n20.5\n21.0\n19.8\n", 1), "19.8\n");
    }

    #[test]
    fn unterminated_final_line_is_captured() {
        assert_eq!(tail("20.1\n20.5\n21.0", 2), "20.5\n21.0\n");
        assert_eq!(tail("21.0", 5), "21.0\n");
    }

    #[test]
    fn lone_newline_is_one_empty_record() {
        assert_eq!(tail("\n", 5), "\n");
    }

    #[test]
    fn empty_records_are_preserved() {
        assert_eq!(tail("\n\n", 2), "\n\n");
        assert_eq!(tail("\n\n", 1), "\n");
        assert_eq!(tail("20.1\n\n20.5\n", 3), "20.1\n\n20.5\n");
    }

    #[test]
    fn carriage_returns_pass_through() {
        // Boundaries are \n only; a \r\n log keeps its \r bytes verbatim.
        assert_eq!(tail("20.1\r\n20.5\r\n", 1), "20.5\r\n");
    }

    #[test]
    fn non_utf8_bytes_do_not_fail_the_scan() {
        let mut content = b"20.1\n".to_vec();
        content.extend_from_slice(&[0xFF, 0xFE]);
        content.extend_from_slice(b"\n20.5\n");
        let mut cursor = Cursor::new(content);
        let window = tail_lines(&mut cursor, 3).unwrap();
        assert!(window.starts_with("20.1\n"));
        assert!(window.ends_with("20.5\n"));
        assert_eq!(window.lines().count(), 3);
    }

    #[test]
    fn idempotent_on_unchanged_source() {
        let mut cursor = Cursor::new(b"20.1\n20.5\n21.0\n19.8\n".to_vec());
        let first = tail_lines(&mut cursor, 3).unwrap();
        let second = tail_lines(&mut cursor, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn window_spanning_multiple_blocks_matches_forward_reference() {
        // Lines are padded wide enough that 50 of them cross the 512-byte
        // block size, forcing the multi-block reassembly path.
        let lines: Vec<String> = (0..200).map(|i| format!("{i:0>20}")).collect();
        let content = lines.join("\n") + "\n";

        let expected: String = lines[150..].iter().map(|l| format!("{l}\n")).collect();
        assert_eq!(tail(&content, 50), expected);
    }

    #[test]
    fn whole_file_window_when_max_exceeds_line_count() {
        let lines: Vec<String> = (0..30).map(|i| format!("{i:0>20}")).collect();
        let content = lines.join("\n") + "\n";
        assert_eq!(tail(&content, 1000), content);
    }
}
