//! Grouping of fetched child rows by their fold key, ready to attach under
//! each parent's `_` object.

use std::collections::HashMap;

use serde_json::Value;

use crate::driver::Row;
use crate::spec_parser::RelationKind;

/// String form of a join-key cell. `None` never folds anywhere, so rows and
/// parents with a NULL key stay unmatched.
pub(crate) fn key_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Child rows grouped by fold key. `One` keeps a single row per key (later
/// rows win), `Many` keeps all of them in fetch order.
pub(crate) enum FoldedRows {
    One(HashMap<String, Value>),
    Many(HashMap<String, Vec<Value>>),
}

impl FoldedRows {
    pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
        match self {
            FoldedRows::One(map) => map.get(key).cloned(),
            FoldedRows::Many(map) => map.get(key).map(|rows| Value::Array(rows.clone())),
        }
    }

    /// The value attached when no child row matched the parent.
    pub(crate) fn missing(&self) -> Value {
        match self {
            FoldedRows::One(_) => Value::Object(Row::new()),
            FoldedRows::Many(_) => Value::Array(Vec::new()),
        }
    }
}

/// Folds rows by `fold_key`, dropping the key column itself when `strip_key`
/// is set (bridge relations carry it only for grouping).
pub(crate) fn fold_rows(rows: Vec<Row>, kind: RelationKind, fold_key: &str, strip_key: bool) -> FoldedRows {
    match kind {
        RelationKind::BelongsTo => {
            let mut map = HashMap::new();
            for mut row in rows {
                let key = key_string(row.get(fold_key));
                if strip_key {
                    row.remove(fold_key);
                }
                if let Some(key) = key {
                    map.insert(key, Value::Object(row));
                }
            }
            FoldedRows::One(map)
        }
        RelationKind::HasMany | RelationKind::ManyToMany => {
            let mut map: HashMap<String, Vec<Value>> = HashMap::new();
            for mut row in rows {
                let key = key_string(row.get(fold_key));
                if strip_key {
                    row.remove(fold_key);
                }
                if let Some(key) = key {
                    map.entry(key).or_default().push(Value::Object(row));
                }
            }
            FoldedRows::Many(map)
        }
    }
}
