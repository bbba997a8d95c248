use memchr::memchr_iter;

/// One physical line as a byte span of the input, line terminator excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanLine {
    pub start: usize,
    pub end: usize,
    pub is_blank: bool,
}

/// Split `input` on `\n`, dropping a `\r` before it. A trailing newline does
/// not produce an extra empty line.
pub fn scan_lines(input: &str) -> Vec<ScanLine> {
    let bytes = input.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    for idx in memchr_iter(b'\n', bytes) {
        let mut end = idx;
        if end > start && bytes[end - 1] == b'\r' {
            end -= 1;
        }
        lines.push(build_line(bytes, start, end));
        start = idx + 1;
    }

    if start < bytes.len() {
        let mut end = bytes.len();
        if end > start && bytes[end - 1] == b'\r' {
            end -= 1;
        }
        lines.push(build_line(bytes, start, end));
    }
    lines
}

fn build_line(bytes: &[u8], start: usize, end: usize) -> ScanLine {
    let is_blank = bytes[start..end].iter().all(u8::is_ascii_whitespace);
    ScanLine {
        start,
        end,
        is_blank,
    }
}
