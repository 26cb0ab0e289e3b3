//! Flattening: nested JSON → [`FlatTable`].
//!
//! Objects expand to `parent.child` columns and arrays to `parent.<index>`
//! columns, so `{"items":[{"item_description":"A"}]}` becomes the single
//! column `items.0.item_description`. Empty objects/arrays are kept as leaf
//! cells (`{}` / `[]`) so every key in the reply has a column.

use crate::config::RowLayout;
use crate::error::DocExtractError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fmt;

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Column names plus rows of cells; every row has `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl FlatTable {
    /// Value of `column` in row `row`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Align keyed rows on the union of their keys, in first-seen order.
    fn from_keyed_rows(keyed: Vec<Vec<(String, Cell)>>) -> Self {
        let keyed: Vec<_> = keyed.into_iter().map(disambiguate).collect();
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &keyed {
            for (k, _) in row {
                if seen.insert(k.clone()) {
                    columns.push(k.clone());
                }
            }
        }

        let rows = keyed
            .into_iter()
            .map(|row| {
                let mut cells = vec![Cell::Empty; columns.len()];
                for (k, v) in row {
                    if let Some(i) = columns.iter().position(|c| *c == k) {
                        cells[i] = v;
                    }
                }
                cells
            })
            .collect();

        FlatTable { columns, rows }
    }
}

/// Rename repeated paths within one row to `path#2`, `path#3`, …
///
/// `{"a.b": 1, "a": {"b": 2}}` yields the path `a.b` twice; both values keep
/// a column.
fn disambiguate(row: Vec<(String, Cell)>) -> Vec<(String, Cell)> {
    let mut used = HashSet::new();
    row.into_iter()
        .map(|(path, cell)| {
            let mut name = path.clone();
            let mut n = 1;
            while !used.insert(name.clone()) {
                n += 1;
                name = format!("{path}#{n}");
            }
            (name, cell)
        })
        .collect()
}

/// Flatten an extraction result according to `layout`.
///
/// * object → one row (or one row per element of the exploded array)
/// * array  → one row per element
/// * scalar → [`DocExtractError::NotTabular`]
pub fn flatten(value: &Value, layout: &RowLayout) -> Result<FlatTable, DocExtractError> {
    let keyed = match value {
        Value::Object(map) => match layout {
            RowLayout::Explode { key } => explode_rows(map, key),
            RowLayout::SingleRow => vec![flatten_row(value)],
        },
        Value::Array(items) if !items.is_empty() => items.iter().map(flatten_row).collect(),
        Value::Array(_) => {
            return Err(DocExtractError::NotTabular("top-level array is empty".into()));
        }
        other => {
            return Err(DocExtractError::NotTabular(format!(
                "expected a JSON object, got {}",
                kind_name(other)
            )));
        }
    };
    Ok(FlatTable::from_keyed_rows(keyed))
}

/// One row per element of `map[key]`, parent leaves repeated on each.
/// Falls back to a single row when `key` is absent, not an array, or empty.
fn explode_rows(map: &Map<String, Value>, key: &str) -> Vec<Vec<(String, Cell)>> {
    let items = match map.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            tracing::debug!("Explode key '{}' not a non-empty array; using a single row", key);
            let mut row = Vec::new();
            flatten_into(None, &Value::Object(map.clone()), &mut row);
            return vec![row];
        }
    };

    let mut parent = Vec::new();
    for (k, v) in map.iter().filter(|(k, _)| k.as_str() != key) {
        flatten_into(Some(k.as_str()), v, &mut parent);
    }

    items
        .iter()
        .map(|item| {
            let mut row = parent.clone();
            flatten_into(Some(key), item, &mut row);
            row
        })
        .collect()
}

fn flatten_row(value: &Value) -> Vec<(String, Cell)> {
    let mut row = Vec::new();
    flatten_into(None, value, &mut row);
    row
}

fn flatten_into(prefix: Option<&str>, value: &Value, out: &mut Vec<(String, Cell)>) {
    let join = |k: &str| match prefix {
        Some(p) => format!("{p}.{k}"),
        None => k.to_string(),
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(Some(&join(k)), v, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(Some(&join(&i.to_string())), v, out);
            }
        }
        leaf => {
            let path = prefix.unwrap_or("value").to_string();
            out.push((path, leaf_cell(leaf)));
        }
    }
}

fn leaf_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => Cell::Number(n.clone()),
        Value::String(s) => Cell::Text(s.clone()),
        Value::Array(_) => Cell::Text("[]".into()),
        Value::Object(_) => Cell::Text("{}".into()),
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_row_dotted_and_indexed_paths() {
        let v = json!({"total_amount": 100, "items": [{"item_description": "A"}]});
        let t = flatten(&v, &RowLayout::SingleRow).unwrap();
        assert_eq!(t.columns, vec!["total_amount", "items.0.item_description"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.get(0, "total_amount").unwrap().to_string(), "100");
        assert_eq!(t.get(0, "items.0.item_description"), Some(&Cell::Text("A".into())));
    }

    #[test]
    fn one_column_per_leaf() {
        let v = json!({
            "supplier": {"name": "ACME", "address": {"city": "Oslo"}},
            "items": [
                {"item_description": "A", "item_quantity": 2},
                {"item_description": "B", "item_quantity": 1}
            ],
            "paid": false,
            "notes": null
        });
        let t = flatten(&v, &RowLayout::SingleRow).unwrap();
        assert_eq!(
            t.columns,
            vec![
                "supplier.name",
                "supplier.address.city",
                "items.0.item_description",
                "items.0.item_quantity",
                "items.1.item_description",
                "items.1.item_quantity",
                "paid",
                "notes",
            ]
        );
        assert_eq!(t.get(0, "paid"), Some(&Cell::Bool(false)));
        assert_eq!(t.get(0, "notes"), Some(&Cell::Empty));
    }

    #[test]
    fn empty_containers_are_leaves() {
        let t = flatten(&json!({"items": [], "meta": {}}), &RowLayout::SingleRow).unwrap();
        assert_eq!(t.columns, vec!["items", "meta"]);
        assert_eq!(t.rows[0], vec![Cell::Text("[]".into()), Cell::Text("{}".into())]);
    }

    #[test]
    fn explode_items_into_rows() {
        let v = json!({
            "purchase_order_number": "PO-7",
            "items": [
                {"item_description": "A", "item_price": 1.5},
                {"item_description": "B"}
            ],
            "total_amount": 3
        });
        let layout = RowLayout::Explode { key: "items".into() };
        let t = flatten(&v, &layout).unwrap();
        assert_eq!(
            t.columns,
            vec![
                "purchase_order_number",
                "total_amount",
                "items.item_description",
                "items.item_price",
            ]
        );
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.get(1, "purchase_order_number").unwrap().to_string(), "PO-7");
        assert_eq!(t.get(1, "items.item_description").unwrap().to_string(), "B");
        assert_eq!(t.get(1, "items.item_price"), Some(&Cell::Empty));
    }

    #[test]
    fn explode_missing_key_falls_back_to_single_row() {
        let v = json!({"a": 1, "items": "none"});
        let t = flatten(&v, &RowLayout::Explode { key: "items".into() }).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.columns, vec!["a", "items"]);
    }

    #[test]
    fn top_level_array_is_one_row_per_element() {
        let t = flatten(&json!([{"a": 1}, {"b": 2}]), &RowLayout::SingleRow).unwrap();
        assert_eq!(t.columns, vec!["a", "b"]);
        assert_eq!(t.rows[0], vec![Cell::Number(1.into()), Cell::Empty]);
        assert_eq!(t.rows[1], vec![Cell::Empty, Cell::Number(2.into())]);
    }

    #[test]
    fn colliding_paths_keep_both_columns() {
        let t = flatten(&json!({"a.b": 1, "a": {"b": 2}}), &RowLayout::SingleRow).unwrap();
        assert_eq!(t.columns, vec!["a.b", "a.b#2"]);
        assert_eq!(t.rows[0], vec![Cell::Number(1.into()), Cell::Number(2.into())]);
    }

    #[test]
    fn scalar_is_not_tabular() {
        assert!(matches!(
            flatten(&json!("hello"), &RowLayout::SingleRow),
            Err(DocExtractError::NotTabular(_))
        ));
        assert!(flatten(&json!([]), &RowLayout::SingleRow).is_err());
    }
}
