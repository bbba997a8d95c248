use crate::error::MetadataError;

/// Bytes that end a bare metadata token or change its meaning.
#[inline]
pub fn is_structural_byte(byte: u8) -> bool {
    matches!(byte, b',' | b'"' | b'[' | b']' | b'{' | b'}' | b'\\')
}

/// A metadata key: non-empty, no whitespace, no structural bytes, no `=`.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.chars().all(|ch| {
            !ch.is_whitespace() && !(ch.is_ascii() && is_structural_byte(ch as u8)) && ch != '='
        })
}

/// Whether a scalar must be written as a quoted string to decode back unchanged.
pub fn needs_quoting(value: &str) -> bool {
    // The decoder trims with `str::trim`, so any Unicode whitespace counts.
    let (Some(first), Some(last)) = (value.chars().next(), value.chars().next_back()) else {
        return true;
    };
    if first.is_whitespace() || last.is_whitespace() {
        return true;
    }
    value
        .as_bytes()
        .iter()
        .any(|&byte| is_structural_byte(byte) || matches!(byte, b'\n' | b'\r' | b'\t'))
}

pub fn escape_string_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
}

/// Decode the body of a quoted string that starts right after the opening
/// quote. Returns the value and the byte length consumed including the
/// closing quote.
pub fn unescape_quoted(input: &str) -> Result<(String, usize), MetadataError> {
    let mut value = String::with_capacity(input.len());
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if escaped {
            match ch {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                '"' => value.push('"'),
                '\\' => value.push('\\'),
                other => return Err(MetadataError::InvalidEscape(other)),
            }
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Ok((value, idx + 1));
        } else {
            value.push(ch);
        }
    }
    Err(MetadataError::UnterminatedQuote)
}
