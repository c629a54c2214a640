//! Uniform tabular shape for result data shown to the user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column names plus rows of cells, one cell per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularData {
    /// Normalize arbitrary result data into a table.
    ///
    /// - `{"columns": [..], "rows": [[..]]}` → taken as is, rows padded or
    ///   cut to the column count
    /// - array of objects → union of keys (first-seen order), missing cells null
    /// - array of arrays  → `col_1..col_n`
    /// - array of scalars → single `value` column
    /// - table → columns mapping (object of string arrays) → `table`, `columns`
    /// - any other object → one row keyed by its fields
    /// - scalar           → single `value` cell
    ///
    /// Returns `None` for `null`.
    pub fn normalize(data: &Value) -> Option<Self> {
        match data {
            Value::Null => None,
            Value::Array(items) => Some(Self::from_array(items)),
            Value::Object(map) if is_column_table(map) => Some(Self::from_column_table(map)),
            Value::Object(map) if is_schema_mapping(map) => Some(Self {
                columns: vec!["table".to_string(), "columns".to_string()],
                rows: map
                    .iter()
                    .map(|(table, cols)| vec![Value::String(table.clone()), cols.clone()])
                    .collect(),
            }),
            Value::Object(map) => Some(Self {
                columns: map.keys().cloned().collect(),
                rows: vec![map.values().cloned().collect()],
            }),
            scalar => Some(Self {
                columns: vec!["value".to_string()],
                rows: vec![vec![scalar.clone()]],
            }),
        }
    }

    fn from_column_table(map: &Map<String, Value>) -> Self {
        let columns: Vec<String> = map["columns"]
            .as_array()
            .map(|cols| cols.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        let rows = map["rows"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_array)
                    .map(|row| {
                        let mut cells = row.clone();
                        cells.resize(columns.len(), Value::Null);
                        cells
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { columns, rows }
    }

    fn from_array(items: &[Value]) -> Self {
        if !items.is_empty() && items.iter().all(Value::is_object) {
            let mut columns: Vec<String> = Vec::new();
            for item in items {
                if let Value::Object(map) = item {
                    for key in map.keys() {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
            }
            let rows = items
                .iter()
                .map(|item| {
                    columns
                        .iter()
                        .map(|c| item.get(c).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect();
            return Self { columns, rows };
        }

        if !items.is_empty() && items.iter().all(Value::is_array) {
            let width = items
                .iter()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let columns = (1..=width).map(|i| format!("col_{i}")).collect();
            let rows = items
                .iter()
                .filter_map(Value::as_array)
                .map(|row| {
                    let mut cells = row.clone();
                    cells.resize(width, Value::Null);
                    cells
                })
                .collect();
            return Self { columns, rows };
        }

        Self {
            columns: vec!["value".to_string()],
            rows: items.iter().map(|v| vec![v.clone()]).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Exactly `columns` (strings) and `rows` (arrays).
fn is_column_table(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map
            .get("columns")
            .and_then(Value::as_array)
            .is_some_and(|cols| cols.iter().all(Value::is_string))
        && map
            .get("rows")
            .and_then(Value::as_array)
            .is_some_and(|rows| rows.iter().all(Value::is_array))
}

fn is_schema_mapping(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.values().all(|v| {
            v.as_array()
                .map(|cols| cols.iter().all(Value::is_string))
                .unwrap_or(false)
        })
}
