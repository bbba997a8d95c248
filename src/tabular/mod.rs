//! CSV bodies. Quoting, escaping and record splitting are delegated to the
//! `csv` crate; this module only adapts it to block bodies and rows.

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use serde::de::DeserializeOwned;

use crate::constants::HEADER_MARKER;
use crate::decode::header::is_header_candidate;
use crate::document::Cell;
use crate::{Error, Result};

/// Failure reported by the CSV reader, with a 1-based line relative to the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFailure {
    pub line: Option<usize>,
    pub message: String,
}

pub type CsvResult<T> = std::result::Result<T, CsvFailure>;

/// Parse a block body into rows. The header row is returned as row 0.
/// Rows of unequal length are rejected.
pub fn parse_csv(body: &str) -> CsvResult<Vec<Vec<String>>> {
    parse_csv_lines(body).map(|rows| rows.into_iter().map(|(_, row)| row).collect())
}

/// Like [`parse_csv`], pairing each row with the 1-based body line it starts on.
pub fn parse_csv_lines(body: &str) -> CsvResult<Vec<(usize, Vec<String>)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(body.as_bytes());
    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                let line = record.position().map_or(0, |pos| pos.line() as usize);
                rows.push((line, record.iter().map(str::to_string).collect()));
            }
            Ok(false) => break,
            Err(err) => {
                return Err(CsvFailure {
                    line: err.position().map(|pos| pos.line() as usize),
                    message: err.to_string(),
                })
            }
        }
    }
    Ok(rows)
}

/// Render rows as `\n`-terminated CSV lines.
///
/// A row whose first field starts with `#` is written fully quoted so the
/// line can never be read back as a block header. A multi-line cell whose
/// continuation line would read as a header cannot be written at all.
pub fn write_csv(block: &str, rows: &[Vec<Cell>]) -> Result<String> {
    let width = rows.first().map_or(0, Vec::len);
    let mut out = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(Error::Encode(format!(
                "table `{block}` row {idx} has {} fields, header has {width}",
                row.len()
            )));
        }
        let guarded = row
            .first()
            .is_some_and(|cell| cell.as_str().as_bytes().first() == Some(&HEADER_MARKER));
        let style = if guarded {
            QuoteStyle::Always
        } else {
            QuoteStyle::Necessary
        };
        let start = out.len();
        write_record_into(&mut out, row, style)
            .map_err(|err| Error::Encode(format!("table `{block}`: {err}")))?;
        if continues_with_header(&out[start..]) {
            return Err(Error::Encode(format!(
                "table `{block}` row {idx} has a line break followed by `#` that would read as a block header"
            )));
        }
    }
    String::from_utf8(out).map_err(|err| Error::Encode(format!("invalid utf-8: {err}")))
}

/// Whether any line after the first of a rendered record looks like a header.
fn continues_with_header(record: &[u8]) -> bool {
    let record = record.strip_suffix(b"\n").unwrap_or(record);
    record.split(|&byte| byte == b'\n').skip(1).any(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        std::str::from_utf8(line).is_ok_and(is_header_candidate)
    })
}

fn write_record_into(out: &mut Vec<u8>, row: &[Cell], style: QuoteStyle) -> csv::Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(style)
        .buffer_capacity(256)
        .from_writer(out);
    writer.write_record(row.iter().map(Cell::as_str))?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn deserialize_rows<T: DeserializeOwned>(
    block: &str,
    rows: &[Vec<Cell>],
) -> Result<Vec<T>> {
    let Some((header, records)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let header: StringRecord = header.iter().map(Cell::as_str).collect();
    records
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let record: StringRecord = row.iter().map(Cell::as_str).collect();
            record
                .deserialize(Some(&header))
                .map_err(|err| Error::CsvParse {
                    block: block.into(),
                    line: None,
                    message: format!("row {idx}: {err}"),
                })
        })
        .collect()
}
