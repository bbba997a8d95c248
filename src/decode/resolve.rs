use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::document::{Cell, Document, Reference, Table};
use crate::Error;

/// Replace every `refs` cell with a shared link to its target table.
///
/// Targets are resolved before the tables pointing at them, so a link always
/// leads to an already resolved table. Failures are recorded on the
/// document per cell; the failing cell stays plain text.
///
/// Links are always rebuilt from cell text and earlier reference errors are
/// replaced, so resolving an already resolved document gives the same result.
pub fn resolve_references(document: &mut Document) {
    let raw: Vec<Arc<Table>> = document.tables().cloned().collect();
    let mut resolver = Resolver::new(&raw);
    for idx in 0..raw.len() {
        resolver.resolve(idx, &mut Vec::new());
    }
    let Resolver {
        resolved, errors, ..
    } = resolver;
    tracing::debug!(
        tables = raw.len(),
        errors = errors.len(),
        "resolved references"
    );
    let tables = resolved
        .into_iter()
        .zip(raw)
        .map(|(resolved, raw)| resolved.unwrap_or(raw))
        .collect();
    document.replace_tables(tables);
    document.retain_errors(|error| !error.is_reference_error());
    document.extend_errors(errors);
}

struct Resolver<'a> {
    raw: &'a [Arc<Table>],
    index: HashMap<&'a str, usize>,
    resolved: Vec<Option<Arc<Table>>>,
    errors: Vec<Error>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a [Arc<Table>]) -> Self {
        let index = raw
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name(), idx))
            .collect();
        Self {
            raw,
            index,
            resolved: vec![None; raw.len()],
            errors: Vec::new(),
        }
    }

    /// `path` holds the tables currently being resolved, outermost first.
    fn resolve(&mut self, idx: usize, path: &mut Vec<usize>) -> Arc<Table> {
        if let Some(done) = &self.resolved[idx] {
            return Arc::clone(done);
        }
        let raw = Arc::clone(&self.raw[idx]);
        let Some(refs) = raw.metadata().refs() else {
            self.resolved[idx] = Some(Arc::clone(&raw));
            return raw;
        };

        let mut columns = Vec::with_capacity(refs.len());
        for column in refs {
            match raw.column_index(column) {
                Some(col) => columns.push((col, SmolStr::new(column))),
                None => self.errors.push(Error::UnknownReferenceColumn {
                    table: SmolStr::new(raw.name()),
                    column: SmolStr::new(column),
                }),
            }
        }

        path.push(idx);
        let mut rows = raw.rows().to_vec();
        for (row_idx, row) in rows.iter_mut().enumerate().skip(1) {
            for (col, column) in &columns {
                let Some(cell) = row.get_mut(*col) else {
                    continue;
                };
                if cell.as_str().is_empty() {
                    continue;
                }
                let target = SmolStr::new(cell.as_str());
                if cell.is_reference() {
                    *cell = Cell::from(target.as_str());
                }
                let Some(&target_idx) = self.index.get(target.as_str()) else {
                    self.errors.push(Error::UnknownReferenceTarget {
                        table: SmolStr::new(raw.name()),
                        row: row_idx - 1,
                        column: column.clone(),
                        target,
                    });
                    continue;
                };
                if path.contains(&target_idx) {
                    let mut cycle: Vec<SmolStr> = path
                        .iter()
                        .map(|&idx| SmolStr::new(self.raw[idx].name()))
                        .collect();
                    cycle.push(target);
                    self.errors.push(Error::CyclicReference {
                        table: SmolStr::new(raw.name()),
                        row: row_idx - 1,
                        column: column.clone(),
                        path: cycle,
                    });
                    continue;
                }
                let table = self.resolve(target_idx, path);
                *cell = Cell::Reference(Reference::new(target, table));
            }
        }
        path.pop();

        let table = Arc::new(Table::from_rows(
            SmolStr::new(raw.name()),
            raw.metadata().clone(),
            rows,
        ));
        self.resolved[idx] = Some(Arc::clone(&table));
        table
    }
}
