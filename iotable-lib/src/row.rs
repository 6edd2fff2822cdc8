//! Row records and the local row store.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::value::Value;

static NULL: Value = Value::Null;

/// An open-ended keyed record: `column id -> raw value`.
///
/// A `status` cell, when numeric, doubles as the row's status code, which the
/// grid maps to a display class through the configured status mapping. It
/// stays an ordinary cell, so a `status` column shows and searches it like
/// any other:
///
/// ```json
/// { "id": 1, "name": "alice", "status": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    /// Cell values by column id.
    pub cells: BTreeMap<String, Value>,
}

impl Row {
    /// Cell key read as the status code.
    pub const STATUS_KEY: &'static str = "status";

    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style cell setter.
    pub fn with(mut self, column_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cells.insert(column_id.into(), value.into());
        self
    }

    /// Builder-style status setter; writes the `status` cell.
    pub fn with_status(self, status: i64) -> Self {
        self.with(Self::STATUS_KEY, status)
    }

    /// The status code: the `status` cell when it holds an integral number,
    /// or text that parses as one.
    pub fn status(&self) -> Option<i64> {
        match self.cells.get(Self::STATUS_KEY)? {
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value for a column, or `Null` when the cell is absent.
    pub fn get(&self, column_id: &str) -> &Value {
        self.cells.get(column_id).unwrap_or(&NULL)
    }

    /// Sets a cell value.
    pub fn insert(&mut self, column_id: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column_id.into(), value.into());
    }
}

/// In-memory row storage used in local mode.
///
/// Preserves insertion order. When an identifier column is configured, the
/// identifier value is unique across the store.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Row>,
    identifier: Option<String>,
}

impl RowStore {
    /// Creates an empty store keyed by the given identifier column.
    pub fn new(identifier: Option<String>) -> Self {
        Self {
            rows: Vec::new(),
            identifier,
        }
    }

    /// Returns the identifier column id, if any.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Appends a row at the end.
    ///
    /// Returns `false` (and leaves the store untouched) if an identifier
    /// column exists and a row with the same identifier is already present.
    pub fn append(&mut self, row: Row) -> bool {
        if let Some(id_column) = &self.identifier {
            let id = row.get(id_column);
            if self.rows.iter().any(|r| r.get(id_column) == id) {
                log::debug!("Rejected duplicate row identifier {id:?}");
                return false;
            }
        }
        self.rows.push(row);
        true
    }

    /// Appends many rows, returning the ones that were accepted.
    pub fn append_all(&mut self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        rows.into_iter()
            .filter_map(|row| self.append(row.clone()).then_some(row))
            .collect()
    }

    /// Removes at most one row per id (first match).
    ///
    /// Without an identifier column this is a no-op.
    pub fn remove_by_ids(&mut self, ids: &[Value]) -> Vec<Row> {
        let Some(id_column) = self.identifier.clone() else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        for id in ids {
            if let Some(pos) = self.rows.iter().position(|r| r.get(&id_column) == id) {
                removed.push(self.rows.remove(pos));
            }
        }
        removed
    }

    /// Empties the store, returning its prior contents.
    pub fn clear(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.rows)
    }

    /// Read-only view of every row in insertion order.
    pub fn all(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, name: &str) -> Row {
        Row::new().with("id", id).with("name", name)
    }

    #[test]
    fn test_append_rejects_duplicate_identifier() {
        let mut store = RowStore::new(Some("id".into()));
        assert!(store.append(row(1, "a")));
        assert!(!store.append(row(1, "other")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].get("name"), &Value::from("a"));
    }

    #[test]
    fn test_append_without_identifier_accepts_everything() {
        let mut store = RowStore::new(None);
        assert!(store.append(row(1, "a")));
        assert!(store.append(row(1, "a")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_all_reports_accepted_rows() {
        let mut store = RowStore::new(Some("id".into()));
        let accepted = store.append_all(vec![row(1, "a"), row(2, "b"), row(1, "c")]);
        assert_eq!(accepted, vec![row(1, "a"), row(2, "b")]);
    }

    #[test]
    fn test_remove_by_ids_first_match_only() {
        let mut store = RowStore::new(Some("id".into()));
        store.append_all(vec![row(1, "a"), row(2, "b"), row(3, "c")]);
        let removed = store.remove_by_ids(&[Value::from(2), Value::from(9)]);
        assert_eq!(removed, vec![row(2, "b")]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_without_identifier_is_noop() {
        let mut store = RowStore::new(None);
        store.append(row(1, "a"));
        assert!(store.remove_by_ids(&[Value::from(1)]).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_returns_prior_contents() {
        let mut store = RowStore::new(Some("id".into()));
        store.append_all(vec![row(1, "a"), row(2, "b")]);
        let removed = store.clear();
        assert_eq!(removed.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_row_serde_flattens_cells() {
        let row: Row = serde_json::from_str(r#"{"id": 4, "name": "d", "status": 3}"#).unwrap();
        assert_eq!(row.status(), Some(3));
        assert_eq!(row.get("status"), &Value::from(3));
        assert_eq!(row.get("id"), &Value::from(4));
        assert_eq!(row.get("missing"), &Value::Null);
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!({"id": 4, "name": "d", "status": 3})
        );
    }

    #[test]
    fn test_text_status_is_kept_as_a_cell() {
        let row: Row = serde_json::from_str(r#"{"id": 1, "status": "active"}"#).unwrap();
        assert_eq!(row.get("status"), &Value::from("active"));
        assert_eq!(row.status(), None);

        let row: Row = serde_json::from_str(r#"{"id": 2, "status": "1"}"#).unwrap();
        assert_eq!(row.status(), Some(1));
        assert_eq!(Row::new().with("status", 2.5).status(), None);
        assert_eq!(Row::new().with_status(3).get("status"), &Value::from(3));
    }
}
