pub mod blocks;
pub mod header;
pub mod manifest;
pub mod metadata;
pub mod parallel;
pub mod resolve;
pub mod scan;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::document::{Cell, Document, Metadata, Table};
use crate::tabular::parse_csv;
use crate::{Error, ParseOptions, Result};

use self::blocks::{BlockScanner, RawBlock};
use self::metadata::decode_metadata;
use self::parallel::map_blocks;
use self::resolve::resolve_references;
use self::scan::scan_lines;

pub fn parse(input: &str, options: &ParseOptions) -> Result<Document> {
    let lines = scan_lines(input);
    let located = BlockScanner::new(input, &lines, options.strict).locate(options.use_manifest)?;
    tracing::debug!(blocks = located.blocks.len(), "located blocks");
    check_duplicates(&located.blocks)?;

    let strict = options.strict;
    let built = map_blocks(&located.blocks, |block| materialize(block, strict));

    let mut document = Document::new();
    document.extend_errors(located.errors);
    for (block, outcome) in located.blocks.iter().zip(built) {
        let Built { table, errors } = outcome?;
        for error in errors {
            tracing::warn!(%error, "lenient parse");
            document.push_error(error);
        }
        let Some(table) = table else {
            continue;
        };
        document
            .push(Arc::new(table))
            .map_err(|name| Error::DuplicateBlockName {
                name,
                line: Some(block.line_no()),
                first_line: None,
            })?;
    }
    for (name, description) in located.descriptions {
        if document.contains(&name) {
            document.set_description(&name, description);
        }
    }

    if options.resolve_refs {
        resolve_references(&mut document);
    }
    Ok(document)
}

pub fn from_slice(input: &[u8], options: &ParseOptions) -> Result<Document> {
    let text =
        std::str::from_utf8(input).map_err(|err| Error::Io(format!("invalid utf-8: {err}")))?;
    parse(text, options)
}

pub fn from_reader<R: Read>(mut reader: R, options: &ParseOptions) -> Result<Document> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map_err(|err| Error::Io(err.to_string()))?;
    parse(&buf, options)
}

/// Parse and fail on the first diagnostic, fatal or not.
pub fn validate_str(input: &str, options: &ParseOptions) -> Result<()> {
    let document = parse(input, options)?;
    match document.errors().first() {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

fn check_duplicates(blocks: &[RawBlock<'_>]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(blocks.len());
    for block in blocks {
        if let Some(&first_line) = seen.get(block.name) {
            return Err(Error::DuplicateBlockName {
                name: SmolStr::new(block.name),
                line: Some(block.line_no()),
                first_line: Some(first_line),
            });
        }
        seen.insert(block.name, block.line_no());
    }
    Ok(())
}

/// Outcome of decoding one block. `table` is `None` when a lenient parse
/// dropped the block; `errors` holds what lenient mode downgraded.
struct Built {
    table: Option<Table>,
    errors: Vec<Error>,
}

fn materialize(block: &RawBlock<'_>, strict: bool) -> Result<Built> {
    let mut errors = Vec::new();
    let name = SmolStr::new(block.name);

    let metadata = match decode_metadata(block.metadata_raw) {
        Ok(metadata) => metadata,
        Err(source) => {
            let error = Error::MalformedMetadata {
                block: name.clone(),
                line: block.line_no(),
                source,
            };
            if strict {
                return Err(error);
            }
            errors.push(error);
            Metadata::new()
        }
    };

    let rows = match parse_csv(block.body) {
        Ok(rows) => rows,
        Err(failure) => {
            let error = Error::CsvParse {
                block: name,
                line: failure.line.map(|line| block.body_line + line - 1),
                message: failure.message,
            };
            if strict {
                return Err(error);
            }
            errors.push(error);
            return Ok(Built {
                table: None,
                errors,
            });
        }
    };
    tracing::trace!(block = block.name, rows = rows.len(), "materialized block");

    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(Cell::Text).collect())
        .collect();
    Ok(Built {
        table: Some(Table::from_rows(name, metadata, rows)),
        errors,
    })
}
