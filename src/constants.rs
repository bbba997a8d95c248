pub const MANIFEST_NAME: &str = "manifest";

pub const MANIFEST_COLUMNS: &[&str] = &["table", "start_line", "description"];

pub const KEY_DTYPES: &str = "dtypes";
pub const KEY_COMMENT: &str = "comment";
pub const KEY_CREATED: &str = "created";
pub const KEY_VERSION: &str = "version";
pub const KEY_REFS: &str = "refs";

pub const HEADER_MARKER: u8 = b'#';

#[inline]
pub fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// `[A-Za-z0-9_]+`
#[inline]
pub fn is_valid_block_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_name_byte)
}
