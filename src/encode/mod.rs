mod writer;

use std::io::Write;

use memchr::memchr_iter;

use crate::constants::{MANIFEST_COLUMNS, MANIFEST_NAME};
use crate::document::{Cell, Document, Metadata, Table};
use crate::tabular::write_csv;
use crate::{Error, Result, SerializeOptions};

use self::writer::Writer;

/// Render a document as canonical JCSV text.
///
/// Blocks are written in document order, separated by one blank line, every
/// line ending in `\n`. Reference cells are written as their target name.
/// With `emit_manifest` a `#manifest` block comes first and each
/// `start_line` is the line of that table's header in the returned text.
pub fn to_string(document: &Document, options: &SerializeOptions) -> Result<String> {
    let blocks = document
        .tables()
        .map(|table| render_block(table))
        .collect::<Result<Vec<_>>>()?;

    let manifest = if options.emit_manifest {
        Some(render_manifest(document, &blocks)?)
    } else {
        None
    };

    let capacity = blocks.iter().map(|block| block.len() + 1).sum::<usize>()
        + manifest.as_ref().map_or(0, |manifest| manifest.len() + 1);
    let mut out = String::with_capacity(capacity);
    for block in manifest.iter().chain(&blocks) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(block);
    }
    tracing::debug!(
        tables = blocks.len(),
        manifest = options.emit_manifest,
        bytes = out.len(),
        "serialized document"
    );
    Ok(out)
}

pub fn to_writer<W: Write>(
    mut writer: W,
    document: &Document,
    options: &SerializeOptions,
) -> Result<()> {
    let text = to_string(document, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|err| Error::Io(err.to_string()))
}

fn render_block(table: &Table) -> Result<String> {
    let mut writer = Writer::new();
    writer.write_header(table.name(), table.metadata())?;
    writer.write_str(&write_csv(table.name(), table.rows())?);
    Ok(writer.finish())
}

fn render_manifest(document: &Document, blocks: &[String]) -> Result<String> {
    // Start numbers never change how many lines the manifest spans, so a
    // first pass with placeholders fixes where the tables begin.
    let draft = manifest_text(document, &vec![0; blocks.len()])?;
    let mut next = line_count(&draft) + 2;
    let mut starts = Vec::with_capacity(blocks.len());
    for block in blocks {
        starts.push(next);
        next += line_count(block) + 1;
    }
    manifest_text(document, &starts)
}

fn manifest_text(document: &Document, starts: &[usize]) -> Result<String> {
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(starts.len() + 1);
    rows.push(MANIFEST_COLUMNS.iter().map(|&column| Cell::from(column)).collect());
    for (table, &start) in document.tables().zip(starts) {
        let description = document
            .description(table.name())
            .or_else(|| table.metadata().comment())
            .unwrap_or_default();
        rows.push(vec![
            Cell::from(table.name()),
            Cell::from(itoa::Buffer::new().format(start)),
            Cell::from(description),
        ]);
    }

    let mut writer = Writer::with_capacity(64 * rows.len());
    writer.write_header(MANIFEST_NAME, &Metadata::new())?;
    writer.write_str(&write_csv(MANIFEST_NAME, &rows)?);
    Ok(writer.finish())
}

fn line_count(text: &str) -> usize {
    memchr_iter(b'\n', text.as_bytes()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MetaValue;
    use crate::{parse_with_options as parse, ParseOptions};

    fn sample() -> Document {
        let mut document = Document::new();
        let metadata: Metadata = [("refs", MetaValue::list(["order"]))].into_iter().collect();
        document
            .insert(Table::new(
                "orders",
                metadata,
                [vec!["id", "order"], vec!["1", "order_1"]],
            ))
            .unwrap();
        let metadata: Metadata = [("comment", MetaValue::scalar("Line items"))]
            .into_iter()
            .collect();
        document
            .insert(Table::new(
                "order_1",
                metadata,
                [vec!["item", "note"], vec!["Dell", "a\nb"]],
            ))
            .unwrap();
        document
    }

    #[rstest::rstest]
    fn test_canonical_layout() {
        let text = to_string(&sample(), &SerializeOptions::default()).unwrap();
        assert_eq!(
            text,
            "#orders{refs=[order]}\nid,order\n1,order_1\n\n#order_1{comment=Line items}\nitem,note\nDell,\"a\nb\"\n"
        );
    }

    #[rstest::rstest]
    fn test_manifest_start_lines_point_at_headers() {
        let options = SerializeOptions::default().with_manifest(true);
        let text = to_string(&sample(), &options).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0], "#manifest");
        assert_eq!(lines[1], "table,start_line,description");
        assert_eq!(lines[2], "orders,6,");
        assert_eq!(lines[3], "order_1,10,Line items");
        assert_eq!(lines[5], "#orders{refs=[order]}");
        assert_eq!(lines[9], "#order_1{comment=Line items}");
    }

    #[rstest::rstest]
    fn test_manifest_round_trip_is_idempotent() {
        let options = SerializeOptions::default().with_manifest(true);
        let first = to_string(&sample(), &options).unwrap();
        let document = parse(&first, &ParseOptions::default()).unwrap();
        assert!(document.errors().is_empty(), "{:?}", document.errors());
        assert_eq!(document.description("order_1"), Some("Line items"));
        assert_eq!(to_string(&document, &options).unwrap(), first);

        let raw = parse(&first, &ParseOptions::default().with_resolve_refs(false)).unwrap();
        assert!(raw.same_content(&sample()));
    }

    #[rstest::rstest]
    fn test_references_render_as_names() {
        let document = parse(
            "#orders{refs=[order]}\norder\norder_1\n\n#order_1\nitem\nDell\n",
            &ParseOptions::default(),
        )
        .unwrap();
        let text = to_string(&document, &SerializeOptions::default()).unwrap();
        assert_eq!(text, "#orders{refs=[order]}\norder\norder_1\n\n#order_1\nitem\nDell\n");
    }

    #[rstest::rstest]
    fn test_hash_first_cell_is_quoted() {
        let mut document = Document::new();
        document
            .insert(Table::new("tags", Metadata::new(), [vec!["id"], vec!["#a"]]))
            .unwrap();
        let text = to_string(&document, &SerializeOptions::default()).unwrap();
        assert_eq!(text, "#tags\nid\n\"#a\"\n");
        let back = parse(&text, &ParseOptions::default()).unwrap();
        assert!(back.same_content(&document));
    }

    #[rstest::rstest]
    fn test_empty_document() {
        assert_eq!(to_string(&Document::new(), &SerializeOptions::default()).unwrap(), "");
        let options = SerializeOptions::default().with_manifest(true);
        assert_eq!(
            to_string(&Document::new(), &options).unwrap(),
            "#manifest\ntable,start_line,description\n"
        );
    }

    #[rstest::rstest]
    fn test_to_writer() {
        let mut out = Vec::new();
        to_writer(&mut out, &sample(), &SerializeOptions::default()).unwrap();
        assert!(out.starts_with(b"#orders"));
    }
}
