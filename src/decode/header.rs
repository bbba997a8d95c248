use memchr::memchr;

use crate::constants::{is_valid_block_name, HEADER_MARKER, MANIFEST_NAME};
use crate::{Error, Result};

/// A decoded block header line: `#name` or `#name{metadata}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a str,
    /// Text between the first `{` and the last `}`; empty when absent.
    pub metadata_raw: &'a str,
}

impl Header<'_> {
    pub fn is_manifest(&self) -> bool {
        self.name == MANIFEST_NAME
    }
}

/// Whether a line opens a block, before checking the header grammar.
///
/// Headers start at column 1 with `#` and carry no trailing whitespace. A
/// comma before the first `{` marks CSV data such as `#1,foo`, not a header.
pub fn is_header_candidate(line: &str) -> bool {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&HEADER_MARKER) {
        return false;
    }
    if line.chars().next_back().is_some_and(char::is_whitespace) {
        return false;
    }
    let name_end = memchr(b'{', bytes).unwrap_or(bytes.len());
    memchr(b',', &bytes[..name_end]).is_none()
}

/// Parse a header line. `line_no` is the 1-based line used in errors.
pub fn parse_header(line: &str, line_no: usize) -> Result<Header<'_>> {
    let Some(rest) = line.strip_prefix('#') else {
        return Err(Error::malformed_header(line_no, "expected `#`"));
    };
    let (name, metadata_raw) = match rest.find('{') {
        None => (rest, ""),
        Some(open) => {
            let close = rest
                .rfind('}')
                .filter(|&close| close > open)
                .ok_or_else(|| Error::malformed_header(line_no, "missing closing `}`"))?;
            if close + 1 != rest.len() {
                return Err(Error::malformed_header(
                    line_no,
                    "unexpected content after closing `}`",
                ));
            }
            (&rest[..open], &rest[open + 1..close])
        }
    };
    if !is_valid_block_name(name) {
        return Err(Error::malformed_header(
            line_no,
            format!("invalid block name `{name}`, expected [A-Za-z0-9_]+"),
        ));
    }
    Ok(Header { name, metadata_raw })
}
