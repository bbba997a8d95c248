use serde_json::{Map, Value};

use super::{Cell, Document, Table};

impl Document {
    /// JSON view keyed by table name. With `expand_refs`, reference cells
    /// are replaced by the target table's rows.
    pub fn to_json(&self, expand_refs: bool) -> Value {
        let mut map = Map::with_capacity(self.len());
        for table in self.tables() {
            map.insert(table.name().to_string(), table.to_json(expand_refs));
        }
        Value::Object(map)
    }
}

impl Table {
    pub fn to_json(&self, expand_refs: bool) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert("metadata".to_string(), self.metadata().to_json());
        map.insert(
            "columns".to_string(),
            Value::Array(
                self.columns()
                    .map(|column| Value::String(column.to_string()))
                    .collect(),
            ),
        );
        map.insert("rows".to_string(), records_json(self, expand_refs));
        Value::Object(map)
    }
}

fn records_json(table: &Table, expand_refs: bool) -> Value {
    let columns: Vec<&str> = table.columns().collect();
    let rows = table
        .records()
        .iter()
        .map(|row| {
            let mut object = Map::with_capacity(columns.len());
            for (column, cell) in columns.iter().zip(row) {
                object.insert(column.to_string(), cell_json(cell, expand_refs));
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

fn cell_json(cell: &Cell, expand_refs: bool) -> Value {
    match cell {
        Cell::Reference(reference) if expand_refs => records_json(reference.table(), true),
        other => Value::String(other.as_str().to_string()),
    }
}
