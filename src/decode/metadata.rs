use smallvec::SmallVec;

use crate::document::{MetaValue, Metadata};
use crate::error::MetadataError;
use crate::text::string::{is_structural_byte, is_valid_key, unescape_quoted};

type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Decode the text between a header's braces.
///
/// `key=value` pairs are separated by top-level commas. A value is a bare
/// token, a double-quoted string (escapes `\"`, `\\`, `\n`, `\r`, `\t`) or a
/// one-level list `[item,...]` of such scalars. Surrounding whitespace of
/// keys, values and list items is ignored.
pub fn decode_metadata(input: &str) -> Result<Metadata, MetadataError> {
    let mut metadata = Metadata::new();
    if input.trim().is_empty() {
        return Ok(metadata);
    }
    for segment in split_top_level(input)? {
        let Some((key, raw)) = segment.split_once('=') else {
            return Err(MetadataError::MissingEquals(segment.trim().to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(MetadataError::EmptyKey);
        }
        if !is_valid_key(key) {
            return Err(MetadataError::InvalidKey(key.to_string()));
        }
        let value = parse_value(key, raw)?;
        if !metadata.try_insert(key, value) {
            return Err(MetadataError::DuplicateKey(key.to_string()));
        }
    }
    Ok(metadata)
}

/// Split on commas outside `[...]` and `"..."`.
fn split_top_level(input: &str) -> Result<Segments<'_>, MetadataError> {
    let bytes = input.as_bytes();
    let mut segments = Segments::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (idx, &byte) in bytes.iter().enumerate() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_quotes = false;
            }
            continue;
        }
        match byte {
            b'"' => in_quotes = true,
            b'[' => {
                depth += 1;
                if depth > 1 {
                    return Err(MetadataError::NestedList);
                }
            }
            b']' => {
                if depth == 0 {
                    return Err(MetadataError::UnbalancedBrackets);
                }
                depth -= 1;
            }
            b',' if depth == 0 => {
                segments.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(MetadataError::UnterminatedQuote);
    }
    if depth != 0 {
        return Err(MetadataError::UnbalancedBrackets);
    }
    segments.push(&input[start..]);
    Ok(segments)
}

fn parse_value(key: &str, raw: &str) -> Result<MetaValue, MetadataError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MetadataError::MissingValue(key.to_string()));
    }
    let Some(rest) = raw.strip_prefix('[') else {
        return parse_scalar(key, raw).map(MetaValue::Scalar);
    };
    let Some(inner) = rest.strip_suffix(']') else {
        return Err(MetadataError::TrailingContent(key.to_string()));
    };
    if inner.trim().is_empty() {
        return Ok(MetaValue::List(Vec::new()));
    }
    let mut items = Vec::new();
    for item in split_top_level(inner)? {
        let item = item.trim();
        if item.is_empty() {
            return Err(MetadataError::EmptyListItem(key.to_string()));
        }
        items.push(parse_scalar(key, item)?);
    }
    Ok(MetaValue::List(items))
}

fn parse_scalar(key: &str, raw: &str) -> Result<String, MetadataError> {
    if let Some(body) = raw.strip_prefix('"') {
        let (value, consumed) = unescape_quoted(body)?;
        if !body[consumed..].trim().is_empty() {
            return Err(MetadataError::TrailingContent(key.to_string()));
        }
        return Ok(value);
    }
    if let Some(found) = raw
        .bytes()
        .find(|&byte| is_structural_byte(byte) && byte != b'{' && byte != b'}')
    {
        return Err(MetadataError::UnexpectedCharacter {
            key: key.to_string(),
            found: found as char,
        });
    }
    Ok(raw.to_string())
}
