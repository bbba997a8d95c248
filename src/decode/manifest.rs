use std::collections::HashMap;

use smol_str::SmolStr;

use crate::constants::{is_valid_block_name, MANIFEST_NAME};
use crate::tabular::parse_csv_lines;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub table: SmolStr,
    /// 1-based line of the table's header, if the manifest gives one.
    pub start_line: Option<usize>,
    pub description: String,
    /// 1-based line of this manifest row.
    pub line: usize,
}

/// Table name to manifest entry, in manifest order.
#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
    entries: Vec<ManifestEntry>,
    by_table: HashMap<SmolStr, usize>,
}

impl ManifestIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, table: &str) -> Option<&ManifestEntry> {
        self.by_table.get(table).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn push(&mut self, entry: ManifestEntry) {
        self.by_table.insert(entry.table.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Build the index from the manifest block body.
///
/// `first_line` is the 1-based file line the body starts on and
/// `header_line` the line of `#manifest`. Every inconsistency is returned as
/// a diagnostic; the affected entries lose their `start_line` or are dropped
/// so that those tables are found by scanning.
pub fn build_manifest_index(
    body: &str,
    first_line: usize,
    header_line: usize,
) -> (ManifestIndex, Vec<Error>) {
    let mut index = ManifestIndex::default();
    let mut errors = Vec::new();

    let rows = match parse_csv_lines(body) {
        Ok(rows) => rows,
        Err(failure) => {
            let line = failure
                .line
                .map_or(header_line, |line| first_line + line - 1);
            errors.push(Error::manifest(
                None,
                line,
                format!("body is not valid CSV: {}", failure.message),
            ));
            return (index, errors);
        }
    };

    let Some(((_, header), records)) = rows.split_first() else {
        errors.push(Error::manifest(None, header_line, "missing header row"));
        return (index, errors);
    };
    let column = |name: &str| header.iter().position(|column| column.trim() == name);
    let (Some(table_col), Some(description_col)) = (column("table"), column("description")) else {
        errors.push(Error::manifest(
            None,
            header_line,
            "header must contain `table` and `description` columns",
        ));
        return (index, errors);
    };
    let start_col = column("start_line");

    for (body_line, row) in records {
        let line = first_line + body_line - 1;
        let table = row.get(table_col).map_or("", |value| value.trim());
        if table.is_empty() {
            errors.push(Error::manifest(None, line, "row has no `table` value"));
            continue;
        }
        if !is_valid_block_name(table) || table == MANIFEST_NAME {
            errors.push(Error::manifest(
                Some(table),
                line,
                format!("invalid table name `{table}`"),
            ));
            continue;
        }

        let raw_start = start_col
            .and_then(|col| row.get(col))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());
        let start_line = match raw_start.map(str::parse::<usize>) {
            None => None,
            Some(Ok(start)) if start >= 1 => Some(start),
            Some(_) => {
                errors.push(Error::manifest(
                    Some(table),
                    line,
                    format!(
                        "start_line `{}` is not a positive integer",
                        raw_start.unwrap_or_default()
                    ),
                ));
                None
            }
        };

        if let Some(&existing) = index.by_table.get(table) {
            errors.push(Error::manifest(
                Some(table),
                line,
                format!("duplicate entry for table `{table}`"),
            ));
            index.entries[existing].start_line = None;
            continue;
        }

        index.push(ManifestEntry {
            table: SmolStr::new(table),
            start_line,
            description: row.get(description_col).cloned().unwrap_or_default(),
            line,
        });
    }
    (index, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[rstest::rstest]
    fn test_build_index() {
        let body = "table,start_line,description\nusers,6,\"Core users, active\"\norders,,Orders";
        let (index, errors) = build_manifest_index(body, 2, 1);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(index.len(), 2);
        let users = index.get("users").unwrap();
        assert_eq!(users.start_line, Some(6));
        assert_eq!(users.description, "Core users, active");
        assert_eq!(users.line, 3);
        assert_eq!(index.get("orders").unwrap().start_line, None);
    }

    #[rstest::rstest]
    fn test_start_line_column_is_optional() {
        let (index, errors) = build_manifest_index("table,description\nusers,People", 2, 1);
        assert!(errors.is_empty());
        assert_eq!(index.get("users").unwrap().start_line, None);
    }

    #[rstest::rstest]
    fn test_missing_required_column() {
        let (index, errors) = build_manifest_index("table,start_line\nusers,4", 2, 1);
        assert!(index.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::ManifestInconsistency);
        assert_eq!(errors[0].line(), Some(1));
    }

    #[rstest::rstest]
    fn test_duplicate_entry_drops_start_line() {
        let body = "table,start_line,description\nusers,6,a\nusers,9,b";
        let (index, errors) = build_manifest_index(body, 2, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), Some(4));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("users").unwrap().start_line, None);
    }

    #[rstest::rstest]
    #[case("0")]
    #[case("-3")]
    #[case("six")]
    fn test_bad_start_line(#[case] start: &str) {
        let body = format!("table,start_line,description\nusers,{start},a");
        let (index, errors) = build_manifest_index(&body, 2, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(index.get("users").unwrap().start_line, None);
    }

    #[rstest::rstest]
    fn test_row_without_table() {
        let body = "table,start_line,description\n,4,orphan\nusers,6,a";
        let (index, errors) = build_manifest_index(body, 2, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(index.len(), 1);
    }
}
