//! Purpose: Hold all in-memory backend state: tables and storage buckets.
//! Exports: `Store`.
//! Role: The single shared-state object behind every client handle.
//! Invariants: All access goes through the one internal mutex; no copies leak out mutably.
//! Invariants: Tables appear implicitly on first write and read as empty before that.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::core::error::Error;
use crate::core::row::{self, Row};

#[derive(Default)]
struct StoreState {
    tables: HashMap<String, Vec<Row>>,
    buckets: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

/// Process-lifetime backend state. Construct one per logical backend and hand
/// it to every `Client` that should observe the same rows; there is no hidden
/// global instance.
#[derive(Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert fixture rows, with the same id/`created_at` injection as a
    /// query-builder insert. Returns how many rows the table now holds.
    pub fn seed(&self, table: &str, rows: Vec<Value>) -> Result<usize, Error> {
        let mut prepared = Vec::with_capacity(rows.len());
        for value in rows {
            prepared.push(row::prepare_insert(value, table)?);
        }
        let mut state = self.lock();
        let rows = state.tables.entry(table.to_string()).or_default();
        rows.extend(prepared);
        Ok(rows.len())
    }

    /// Drop every table and bucket. Explicit test isolation instead of
    /// process restarts.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.tables.clear();
        state.buckets.clear();
    }

    /// Current table contents as one JSON object, for debugging and fixture
    /// capture. Row order matches insertion order.
    pub fn snapshot(&self) -> Value {
        let state = self.lock();
        let mut tables = Map::new();
        for (name, rows) in &state.tables {
            let rows = rows.iter().cloned().map(Value::Object).collect();
            tables.insert(name.clone(), Value::Array(rows));
        }
        Value::Object(tables)
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.lock().tables.get(table).map(Vec::len).unwrap_or(0)
    }

    /// Clone the current rows of a table; absent tables read as empty without
    /// being created.
    pub(crate) fn read_table(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Run `f` against the live row sequence of a table, creating the table
    /// if needed. Mutations are visible to every later query.
    pub(crate) fn with_table_mut<R>(&self, table: &str, f: impl FnOnce(&mut Vec<Row>) -> R) -> R {
        let mut state = self.lock();
        f(state.tables.entry(table.to_string()).or_default())
    }

    pub(crate) fn put_object(&self, bucket: &str, path: &str, bytes: Vec<u8>) {
        let mut state = self.lock();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), bytes);
    }

    pub(crate) fn get_object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(path))
            .cloned()
    }

    pub(crate) fn list_objects(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // A panicked holder leaves plain data; carry on with it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Store")
            .field("tables", &state.tables.len())
            .field("buckets", &state.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use serde_json::json;

    #[test]
    fn absent_tables_read_as_empty() {
        let store = Store::new();
        assert!(store.read_table("nothing").is_empty());
        assert_eq!(store.table_len("nothing"), 0);
    }

    #[test]
    fn seed_then_read_shares_state() {
        let store = Store::new();
        let len = store
            .seed("projects", vec![json!({"name": "A"}), json!({"name": "B"})])
            .expect("seed");
        assert_eq!(len, 2);
        let rows = store.read_table("projects");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("A")));
    }

    #[test]
    fn reset_clears_tables_and_buckets() {
        let store = Store::new();
        store.seed("t", vec![json!({"x": 1})]).expect("seed");
        store.put_object("avatars", "a.png", vec![1, 2, 3]);
        store.reset();
        assert_eq!(store.table_len("t"), 0);
        assert!(store.get_object("avatars", "a.png").is_none());
    }

    #[test]
    fn snapshot_lists_rows_in_insertion_order() {
        let store = Store::new();
        store
            .seed("t", vec![json!({"n": 1}), json!({"n": 2})])
            .expect("seed");
        let snapshot = store.snapshot();
        let rows = snapshot
            .get("t")
            .and_then(|v| v.as_array())
            .expect("table array");
        assert_eq!(rows[0].get("n"), Some(&json!(1)));
        assert_eq!(rows[1].get("n"), Some(&json!(2)));
    }

    #[test]
    fn bucket_objects_round_trip() {
        let store = Store::new();
        store.put_object("docs", "plans/a.pdf", b"pdf".to_vec());
        assert_eq!(store.get_object("docs", "plans/a.pdf"), Some(b"pdf".to_vec()));
        assert_eq!(store.list_objects("docs"), vec!["plans/a.pdf".to_string()]);
        assert!(store.list_objects("empty").is_empty());
    }
}
