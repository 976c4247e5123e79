//! Purpose: Evaluate query filter clauses against row JSON.
//! Exports: `Filter`, `matches_all`, `compare_values`.
//! Role: The closed filter language of the query builder; all clauses AND together.
//! Invariants: Clause evaluation never errors; a clause that cannot apply is "no match".
//! Invariants: `compare_values` is a total order so sorting heterogeneous columns never fails.

use std::cmp::Ordering;

use serde_json::Value;

use crate::core::row::Row;

#[derive(Clone, Debug)]
pub enum Filter {
    Eq { column: String, value: Value },
    Neq { column: String, value: Value },
    Gt { column: String, value: Value },
    Gte { column: String, value: Value },
    Lt { column: String, value: Value },
    Lte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    IsNull { column: String },
    /// Equality against a nested field addressed by a dot path, e.g. `meta.owner.id`.
    PathEq { path: String, value: Value },
    /// Containment for array- and object-valued fields; see `contains_value`.
    Contains { column: String, value: Value },
}

impl Filter {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq { column, value } => row.get(column) == Some(value),
            Self::Neq { column, value } => row.get(column).unwrap_or(&Value::Null) != value,
            Self::Gt { column, value } => ordered(row.get(column), value, Ordering::is_gt),
            Self::Gte { column, value } => ordered(row.get(column), value, Ordering::is_ge),
            Self::Lt { column, value } => ordered(row.get(column), value, Ordering::is_lt),
            Self::Lte { column, value } => ordered(row.get(column), value, Ordering::is_le),
            Self::In { column, values } => row
                .get(column)
                .map(|field| values.contains(field))
                .unwrap_or(false),
            Self::IsNull { column } => matches!(row.get(column), None | Some(Value::Null)),
            Self::PathEq { path, value } => resolve_path(row, path) == Some(value),
            Self::Contains { column, value } => row
                .get(column)
                .map(|field| contains_value(field, value))
                .unwrap_or(false),
        }
    }
}

pub fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

fn ordered(field: Option<&Value>, bound: &Value, accept: fn(Ordering) -> bool) -> bool {
    let Some(field) = field else {
        return false;
    };
    // Range clauses only apply within one JSON kind; a number is never
    // greater than a string, it just fails the clause.
    if kind_rank(field) != kind_rank(bound) {
        return false;
    }
    accept(compare_values(field, bound))
}

fn resolve_path<'a>(row: &'a Row, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = row.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Containment, split by the kind of the stored field value:
/// an array field contains an array argument when every argument element is
/// present (superset), and a scalar argument when it is a member; an object
/// field contains an object argument when every argument entry matches
/// (shallow subset). Any other pairing degrades to plain equality.
fn contains_value(field: &Value, needle: &Value) -> bool {
    match (field, needle) {
        (Value::Array(items), Value::Array(wanted)) => {
            wanted.iter().all(|item| items.contains(item))
        }
        (Value::Array(items), scalar) => items.contains(scalar),
        (Value::Object(entries), Value::Object(wanted)) => wanted
            .iter()
            .all(|(key, value)| entries.get(key) == Some(value)),
        (field, needle) => field == needle,
    }
}

/// Total order over JSON values: kinds rank null < bool < number < string <
/// array < object, and values of one kind compare within it. Numbers compare
/// by `f64::total_cmp`, arrays and objects element-wise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ka, kb) = (kind_rank(a), kind_rank(b));
    if ka != kb {
        return ka.cmp(&kb);
    }
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().unwrap_or(0.0).total_cmp(&b.as_f64().unwrap_or(0.0))
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                let ord = ka.cmp(kb);
                if ord != Ordering::Equal {
                    return ord;
                }
                let ord = compare_values(va, vb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => Ordering::Equal,
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
