pub mod json;
pub mod metadata;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use smol_str::SmolStr;

use crate::constants::{is_valid_block_name, MANIFEST_NAME};
use crate::{tabular, Error, Result};

pub use metadata::{MetaValue, Metadata};

pub type Row = Vec<Cell>;

/// A cell of a table row: plain text, or a link to another table once
/// references have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Reference(Reference),
}

impl Cell {
    /// The textual value. References yield their target name.
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Text(text) => text,
            Cell::Reference(reference) => reference.target(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            Cell::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Cell::Text(_) => None,
            Cell::Reference(reference) => Some(reference),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Cell::Reference(_))
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Shared link to a resolved table. Cloning never copies table data.
#[derive(Debug, Clone)]
pub struct Reference {
    target: SmolStr,
    table: Arc<Table>,
}

impl Reference {
    pub(crate) fn new(target: SmolStr, table: Arc<Table>) -> Self {
        Self { target, table }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && (Arc::ptr_eq(&self.table, &other.table) || *self.table == *other.table)
    }
}

/// A named block. The first row is the column header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: SmolStr,
    metadata: Metadata,
    rows: Vec<Row>,
}

impl Table {
    pub fn new<I, R, S>(name: impl Into<SmolStr>, metadata: Metadata, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| Cell::Text(cell.into())).collect())
            .collect();
        Self::from_rows(name.into(), metadata, rows)
    }

    pub(crate) fn from_rows(name: SmolStr, metadata: Metadata, rows: Vec<Row>) -> Self {
        Self {
            name,
            metadata,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_key(&self) -> &SmolStr {
        &self.name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// All rows, header first.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.rows
            .first()
            .into_iter()
            .flat_map(|header| header.iter().map(Cell::as_str))
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns().position(|name| name == column)
    }

    /// Data rows, header excluded.
    pub fn records(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.records().len()
    }

    /// Cell of data row `row` (0-based, header excluded) in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.records().get(row)?.get(idx)
    }

    /// Deserialize every data row into `T`, keyed by the header row.
    /// Reference cells deserialize as their target name.
    pub fn deserialize_records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        tabular::deserialize_rows(&self.name, &self.rows)
    }
}

/// Ordered set of uniquely named tables plus the diagnostics collected
/// while building it.
#[derive(Debug, Clone, Default)]
pub struct Document {
    tables: Vec<Arc<Table>>,
    index: HashMap<SmolStr, usize>,
    descriptions: HashMap<SmolStr, String>,
    errors: Vec<Error>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Table>> {
        self.index.get(name).map(|&idx| &self.tables[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name())
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.iter()
    }

    /// Non-fatal diagnostics: manifest fallbacks, reference failures and
    /// spans skipped by a lenient parse.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(String::as_str)
    }

    pub fn set_description(&mut self, name: &str, description: impl Into<String>) {
        self.descriptions
            .insert(SmolStr::new(name), description.into());
    }

    pub fn insert(&mut self, table: Table) -> Result<()> {
        if !is_valid_block_name(table.name()) {
            return Err(Error::InvalidBlockName {
                name: table.name.clone(),
                reason: "expected [A-Za-z0-9_]+".to_string(),
            });
        }
        if table.name() == MANIFEST_NAME {
            return Err(Error::InvalidBlockName {
                name: table.name.clone(),
                reason: "reserved for the manifest block".to_string(),
            });
        }
        self.push(Arc::new(table)).map_err(|name| Error::DuplicateBlockName {
            name,
            line: None,
            first_line: None,
        })
    }

    pub(crate) fn push(&mut self, table: Arc<Table>) -> std::result::Result<(), SmolStr> {
        let name = table.name_key().clone();
        if self.index.contains_key(&name) {
            return Err(name);
        }
        self.index.insert(name, self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    pub(crate) fn push_error(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub(crate) fn extend_errors(&mut self, errors: impl IntoIterator<Item = Error>) {
        self.errors.extend(errors);
    }

    pub(crate) fn retain_errors(&mut self, keep: impl FnMut(&Error) -> bool) {
        self.errors.retain(keep);
    }

    /// Replaces tables positionally; names and order must be unchanged.
    pub(crate) fn replace_tables(&mut self, tables: Vec<Arc<Table>>) {
        debug_assert_eq!(tables.len(), self.tables.len());
        self.tables = tables;
    }

    /// Name-wise comparison of metadata and rows, ignoring order,
    /// descriptions and diagnostics.
    pub fn same_content(&self, other: &Document) -> bool {
        self.len() == other.len()
            && self.tables.iter().all(|table| {
                other
                    .get(table.name())
                    .is_some_and(|theirs| **theirs == **table)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new(
            "users",
            Metadata::new(),
            [vec!["id", "name"], vec!["1", "Ada"], vec!["2", "Grace"]],
        )
    }

    #[rstest::rstest]
    fn test_table_accessors() {
        let table = users();
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.record_count(), 2);
        assert_eq!(table.cell(1, "name").map(Cell::as_str), Some("Grace"));
        assert_eq!(table.cell(2, "name"), None);
        assert_eq!(table.cell(0, "missing"), None);
    }

    #[rstest::rstest]
    fn test_empty_table_has_no_columns() {
        let table = Table::new("empty", Metadata::new(), Vec::<Vec<String>>::new());
        assert_eq!(table.column_count(), 0);
        assert!(table.records().is_empty());
    }

    #[rstest::rstest]
    fn test_insert_rejects_duplicates_and_bad_names() {
        let mut document = Document::new();
        document.insert(users()).unwrap();
        let err = document.insert(users()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DuplicateBlockName);

        let bad = Table::new("bad name", Metadata::new(), Vec::<Vec<String>>::new());
        assert!(matches!(
            document.insert(bad),
            Err(Error::InvalidBlockName { .. })
        ));
        let manifest = Table::new("manifest", Metadata::new(), Vec::<Vec<String>>::new());
        assert!(document.insert(manifest).is_err());
        assert_eq!(document.names().collect::<Vec<_>>(), vec!["users"]);
    }

    #[rstest::rstest]
    fn test_reference_shares_table() {
        let target = Arc::new(users());
        let cell = Cell::Reference(Reference::new("users".into(), Arc::clone(&target)));
        let copy = cell.clone();
        let reference = copy.as_reference().unwrap();
        assert!(Arc::ptr_eq(reference.table(), &target));
        assert_eq!(cell.as_str(), "users");
        assert_eq!(cell, copy);
    }

    #[rstest::rstest]
    fn test_deserialize_records() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct User {
            id: u32,
            name: String,
        }
        let users: Vec<User> = users().deserialize_records().unwrap();
        assert_eq!(
            users,
            vec![
                User {
                    id: 1,
                    name: "Ada".into()
                },
                User {
                    id: 2,
                    name: "Grace".into()
                },
            ]
        );
    }
}
