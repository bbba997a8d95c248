pub mod constants;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod options;
pub mod tabular;
pub mod text;

use std::io::{Read, Write};

pub use crate::decode::header::{parse_header, Header};
pub use crate::decode::manifest::ManifestEntry;
pub use crate::decode::metadata::decode_metadata;
pub use crate::decode::resolve::resolve_references;
pub use crate::document::{Cell, Document, MetaValue, Metadata, Reference, Row, Table};
pub use crate::error::{Error, ErrorKind, MetadataError};
pub use crate::options::{ParseOptions, SerializeOptions};
pub use crate::tabular::{parse_csv, write_csv};

pub type Result<T> = std::result::Result<T, Error>;

/// Parse JCSV text with default options: strict, manifest-indexed, with
/// references resolved.
///
/// Reference failures do not fail the parse; they are collected on
/// [`Document::errors`].
///
/// ```
/// let text = "#orders{refs=[order]}\nid,order\n1,order_1\n\n#order_1\nitem\nDell\n";
/// let document = jcsv::parse(text)?;
/// let orders = document.get("orders").unwrap();
/// let link = orders.cell(0, "order").unwrap().as_reference().unwrap();
/// assert_eq!(link.table().cell(0, "item").unwrap().as_str(), "Dell");
/// # Ok::<(), jcsv::Error>(())
/// ```
pub fn parse(input: &str) -> Result<Document> {
    parse_with_options(input, &ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<Document> {
    decode::parse(input, options)
}

pub fn from_slice(input: &[u8]) -> Result<Document> {
    from_slice_with_options(input, &ParseOptions::default())
}

pub fn from_slice_with_options(input: &[u8], options: &ParseOptions) -> Result<Document> {
    decode::from_slice(input, options)
}

pub fn from_reader<R: Read>(reader: R) -> Result<Document> {
    from_reader_with_options(reader, &ParseOptions::default())
}

pub fn from_reader_with_options<R: Read>(reader: R, options: &ParseOptions) -> Result<Document> {
    decode::from_reader(reader, options)
}

/// Parse and return the first problem found, including the diagnostics a
/// plain parse only collects.
pub fn validate_str(input: &str) -> Result<()> {
    validate_str_with_options(input, &ParseOptions::default())
}

pub fn validate_str_with_options(input: &str, options: &ParseOptions) -> Result<()> {
    decode::validate_str(input, options)
}

/// Canonical text without a manifest.
pub fn to_string(document: &Document) -> Result<String> {
    to_string_with_options(document, &SerializeOptions::default())
}

pub fn to_string_with_options(document: &Document, options: &SerializeOptions) -> Result<String> {
    encode::to_string(document, options)
}

pub fn to_writer<W: Write>(writer: W, document: &Document) -> Result<()> {
    to_writer_with_options(writer, document, &SerializeOptions::default())
}

pub fn to_writer_with_options<W: Write>(
    writer: W,
    document: &Document,
    options: &SerializeOptions,
) -> Result<()> {
    encode::to_writer(writer, document, options)
}
