//! Offset / hex / ASCII dump of a byte buffer for diagnostics.

/// Widest row the dump produces.
pub const MAX_COLUMNS: usize = 16;

/// Render `buf` as rows of `columns` bytes (clamped to 1..=16).
///
/// Each row is `OFFS | hex cells | ascii |`; cells past the end of the
/// buffer show as `..` and non-printable bytes as `.` in the ASCII column.
/// With a `header`, a column-index row and a rule are added above the rows
/// and repeated below them.
pub fn hexdump(buf: &[u8], columns: usize, header: Option<&str>) -> String {
    let columns = columns.clamp(1, MAX_COLUMNS);
    let label_width = header.map_or(5, |h| (h.len() + 1).max(5));
    let mut lines = Vec::new();

    if let Some(header) = header {
        let indices: Vec<String> = (0..columns).map(|i| format!("{i:02x}")).collect();
        let nibbles: String = (0..columns).map(|i| format!("{i:x}")).collect();
        lines.push(format!(
            "{header:<width$} | {} | {nibbles} |",
            indices.join(" "),
            width = label_width - 1
        ));
        lines.push(format!(
            "{}|{}|{}|",
            "-".repeat(label_width),
            "-".repeat(3 * columns + 1),
            "-".repeat(columns + 2)
        ));
    }

    let indent = " ".repeat(label_width - 5);
    for (row, segment) in buf.chunks(columns).enumerate() {
        let missing = columns - segment.len();
        let hex: Vec<String> = segment.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = segment
            .iter()
            .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
            .collect();
        lines.push(format!(
            "{indent}{:04x} | {}{} | {ascii}{} |",
            row * columns,
            hex.join(" "),
            " ..".repeat(missing),
            " ".repeat(missing)
        ));
    }

    if header.is_some() {
        let rule = lines[1].clone();
        let title = lines[0].clone();
        lines.push(rule);
        lines.push(title);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_row_is_padded() {
        assert_eq!(hexdump(b"123", 4, None), "0000 | 31 32 33 .. | 123  |");
    }

    #[test]
    fn exact_row() {
        assert_eq!(hexdump(b"1234", 4, None), "0000 | 31 32 33 34 | 1234 |");
    }

    #[test]
    fn wraps_into_rows() {
        assert_eq!(
            hexdump(b"12345", 4, None),
            "0000 | 31 32 33 34 | 1234 |\n0004 | 35 .. .. .. | 5    |"
        );
    }

    #[test]
    fn non_printable_bytes_show_as_dots() {
        assert_eq!(hexdump(&[0x00, 0x7F, 0x41], 3, None), "0000 | 00 7f 41 | ..A |");
    }

    #[test]
    fn columns_are_clamped() {
        let wide = hexdump(&[0u8; 20], 64, None);
        assert_eq!(wide.lines().count(), 2);
        assert!(wide.lines().nth(1).unwrap().starts_with("0010 | "));
    }

    #[test]
    fn empty_buffer_renders_nothing() {
        assert_eq!(hexdump(&[], 16, None), "");
    }

    #[test]
    fn header_and_trailer() {
        let dump = hexdump(b"AB", 2, Some("frame"));
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "frame | 00 01 | 01 |");
        assert_eq!(lines[1], "------|-------|----|");
        assert_eq!(lines[2], " 0000 | 41 42 | AB |");
        assert_eq!(lines[3], lines[1]);
        assert_eq!(lines[4], lines[0]);
    }
}
