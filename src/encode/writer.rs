use crate::constants::{is_valid_block_name, HEADER_MARKER};
use crate::document::{MetaValue, Metadata};
use crate::text::string::{escape_string_into, is_valid_key, needs_quoting};
use crate::{Error, Result};

pub(crate) struct Writer {
    buffer: String,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    pub fn finish(self) -> String {
        self.buffer
    }

    pub fn write_str(&mut self, s: &str) {
        self.buffer.push_str(s);
    }

    pub fn write_char(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    pub fn write_newline(&mut self) {
        self.buffer.push('\n');
    }

    /// `#name` or `#name{key=value,...}`, newline included. Braces are
    /// omitted for empty metadata.
    pub fn write_header(&mut self, name: &str, metadata: &Metadata) -> Result<()> {
        if !is_valid_block_name(name) {
            return Err(Error::Encode(format!("invalid block name `{name}`")));
        }
        self.write_char(HEADER_MARKER as char);
        self.write_str(name);
        if !metadata.is_empty() {
            self.write_char('{');
            for (idx, (key, value)) in metadata.iter().enumerate() {
                if !is_valid_key(key) {
                    return Err(Error::Encode(format!(
                        "block `{name}`: invalid metadata key `{key}`"
                    )));
                }
                if idx > 0 {
                    self.write_char(',');
                }
                self.write_str(key);
                self.write_char('=');
                self.write_value(value);
            }
            self.write_char('}');
        }
        self.write_newline();
        Ok(())
    }

    pub fn write_value(&mut self, value: &MetaValue) {
        match value {
            MetaValue::Scalar(scalar) => self.write_scalar(scalar),
            MetaValue::List(items) => {
                self.write_char('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        self.write_char(',');
                    }
                    self.write_scalar(item);
                }
                self.write_char(']');
            }
        }
    }

    pub fn write_scalar(&mut self, value: &str) {
        if needs_quoting(value) {
            self.write_quoted_string(value);
        } else {
            self.write_str(value);
        }
    }

    pub fn write_quoted_string(&mut self, s: &str) {
        self.buffer.push('"');
        escape_string_into(&mut self.buffer, s);
        self.buffer.push('"');
    }
}
