//! Purpose: Implement the chainable query stages over one table.
//! Exports: `TableQuery`, `SingleQuery`, `MaybeSingleQuery`, `InsertOne`,
//! `InsertMany`, `UpdateQuery`, `DeleteQuery`, `Direction`.
//! Role: The fluent read/mutate surface resolved by awaiting the final stage.
//! Invariants: Filters AND together; reads evaluate filter, then order, then
//! bounds, then cardinality. Mutation stages expose no ordering or bounds.
//! Invariants: Inserts land in the table at call time; awaiting only reports them.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::core::defer;
use crate::core::error::{Error, ErrorKind};
use crate::core::filter::{self, Filter};
use crate::core::row::{self, Row};
use crate::core::store::Store;

pub type QueryResult<T> = Result<T, Error>;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Filter state shared by every stage that still accepts clauses.
#[derive(Clone, Debug)]
struct QueryCore {
    store: Arc<Store>,
    table: String,
    filters: Vec<Filter>,
}

impl QueryCore {
    fn matching_rows(&self) -> Vec<Row> {
        self.store
            .read_table(&self.table)
            .into_iter()
            .filter(|row| filter::matches_all(&self.filters, row))
            .collect()
    }
}

/// The read stage: accumulate filters, ordering, and bounds, then await for
/// the matching rows, or step into a mutation / cardinality stage.
#[derive(Clone, Debug)]
pub struct TableQuery {
    core: QueryCore,
    order: Option<(String, Direction)>,
    offset: usize,
    limit: Option<usize>,
}

impl TableQuery {
    pub(crate) fn new(store: Arc<Store>, table: impl Into<String>) -> Self {
        Self {
            core: QueryCore {
                store,
                table: table.into(),
                filters: Vec::new(),
            },
            order: None,
            offset: 0,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Neq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn gt(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Gt {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Gte {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn lt(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Lt {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Lte {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn in_list(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.core.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.core.filters.push(Filter::IsNull {
            column: column.into(),
        });
        self
    }

    /// Equality against a nested field, addressed by a dot path such as
    /// `meta.owner.id`.
    pub fn eq_path(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::PathEq {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Contains {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Order results by one column. Only one ordering is active per query;
    /// the last call wins.
    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Inclusive index range over the ordered result, translated into an
    /// offset and limit. An inverted range reads as empty, not an error.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = from;
        self.limit = Some(if to >= from { to - from + 1 } else { 0 });
        self
    }

    /// Require exactly one matching row; zero is `NotFound`, several is
    /// `NonUnique`.
    pub fn single(self) -> SingleQuery {
        SingleQuery { inner: self }
    }

    /// Allow zero or one matching row; zero resolves to `None`.
    pub fn maybe_single(self) -> MaybeSingleQuery {
        MaybeSingleQuery { inner: self }
    }

    /// Append one row now, generating `id` and `created_at` when absent.
    /// Awaiting the returned stage yields the row as stored.
    pub fn insert(self, value: Value) -> InsertOne {
        let table = self.core.table;
        let result = row::prepare_insert(value, &table).map(|prepared| {
            self.core.store.with_table_mut(&table, |rows| {
                rows.push(prepared.clone());
            });
            tracing::debug!(table = %table, "insert");
            prepared
        });
        InsertOne { result }
    }

    /// Append a batch of rows now. The batch is all-or-nothing: one bad row
    /// fails the whole call and nothing is appended.
    pub fn insert_many(self, values: Vec<Value>) -> InsertMany {
        let table = self.core.table;
        let result = values
            .into_iter()
            .map(|value| row::prepare_insert(value, &table))
            .collect::<QueryResult<Vec<Row>>>()
            .map(|prepared| {
                self.core.store.with_table_mut(&table, |rows| {
                    rows.extend(prepared.iter().cloned());
                });
                tracing::debug!(table = %table, count = prepared.len(), "insert_many");
                prepared
            });
        InsertMany { result }
    }

    /// Record a shallow-merge patch for every row the filters match. Further
    /// filter clauses may still be added on the returned stage.
    pub fn update(self, patch: Value) -> UpdateQuery {
        let patch = match patch {
            Value::Object(map) => Ok(map),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("update patch must be a JSON object")
                .with_table(&self.core.table)),
        };
        UpdateQuery {
            core: self.core,
            patch,
        }
    }

    /// Record removal of every row the filters match.
    pub fn delete(self) -> DeleteQuery {
        DeleteQuery { core: self.core }
    }

    fn run(self) -> Vec<Row> {
        let mut rows = self.core.matching_rows();
        if let Some((column, direction)) = &self.order {
            rows.sort_by(|a, b| {
                let left = a.get(column).unwrap_or(&Value::Null);
                let right = b.get(column).unwrap_or(&Value::Null);
                let ord = filter::compare_values(left, right);
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        let bounded: Vec<Row> = match self.limit {
            Some(limit) => rows.into_iter().skip(self.offset).take(limit).collect(),
            None => rows.into_iter().skip(self.offset).collect(),
        };
        tracing::debug!(table = %self.core.table, matched = bounded.len(), "select");
        bounded
    }
}

impl IntoFuture for TableQuery {
    type Output = QueryResult<Vec<Row>>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            Ok(self.run())
        })
    }
}

pub struct SingleQuery {
    inner: TableQuery,
}

impl IntoFuture for SingleQuery {
    type Output = QueryResult<Row>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            let table = self.inner.core.table.clone();
            let mut rows = self.inner.run();
            match rows.len() {
                0 => Err(Error::new(ErrorKind::NotFound)
                    .with_message("expected exactly one row, found none")
                    .with_table(table)),
                1 => Ok(rows.remove(0)),
                found => Err(Error::new(ErrorKind::NonUnique)
                    .with_message(format!("expected exactly one row, found {found}"))
                    .with_table(table)
                    .with_hint("Tighten the filters or use maybe_single().")),
            }
        })
    }
}

pub struct MaybeSingleQuery {
    inner: TableQuery,
}

impl IntoFuture for MaybeSingleQuery {
    type Output = QueryResult<Option<Row>>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            let table = self.inner.core.table.clone();
            let mut rows = self.inner.run();
            match rows.len() {
                0 => Ok(None),
                1 => Ok(Some(rows.remove(0))),
                found => Err(Error::new(ErrorKind::NonUnique)
                    .with_message(format!("expected at most one row, found {found}"))
                    .with_table(table)),
            }
        })
    }
}

pub struct InsertOne {
    result: QueryResult<Row>,
}

impl IntoFuture for InsertOne {
    type Output = QueryResult<Row>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            self.result
        })
    }
}

pub struct InsertMany {
    result: QueryResult<Vec<Row>>,
}

impl IntoFuture for InsertMany {
    type Output = QueryResult<Vec<Row>>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            self.result
        })
    }
}

/// Mutation stage for updates. Deliberately has no ordering or bounding: a
/// patch applies to every matching row.
pub struct UpdateQuery {
    core: QueryCore,
    patch: QueryResult<Row>,
}

impl UpdateQuery {
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Neq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn in_list(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.core.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.core.filters.push(Filter::IsNull {
            column: column.into(),
        });
        self
    }

    pub fn contains(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Contains {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    fn run(self) -> QueryResult<Vec<Row>> {
        let patch = self.patch?;
        let updated = self.core.store.with_table_mut(&self.core.table, |rows| {
            let mut updated = Vec::new();
            for row in rows.iter_mut() {
                if filter::matches_all(&self.core.filters, row) {
                    row::shallow_merge(row, &patch);
                    updated.push(row.clone());
                }
            }
            updated
        });
        tracing::debug!(table = %self.core.table, matched = updated.len(), "update");
        Ok(updated)
    }
}

impl IntoFuture for UpdateQuery {
    type Output = QueryResult<Vec<Row>>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            self.run()
        })
    }
}

/// Mutation stage for deletes. Same rules as `UpdateQuery`.
pub struct DeleteQuery {
    core: QueryCore,
}

impl DeleteQuery {
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Neq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn in_list(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.core.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.core.filters.push(Filter::IsNull {
            column: column.into(),
        });
        self
    }

    pub fn contains(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.core.filters.push(Filter::Contains {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    fn run(self) -> Vec<Row> {
        let removed = self.core.store.with_table_mut(&self.core.table, |rows| {
            let matched: Vec<Row> = rows
                .iter()
                .filter(|row| filter::matches_all(&self.core.filters, row))
                .cloned()
                .collect();
            // Removal keys off row identity, not a re-run of the filters.
            let removed_ids: Vec<Value> = matched
                .iter()
                .filter_map(|row| row::row_id(row).cloned())
                .collect();
            rows.retain(|row| {
                row::row_id(row)
                    .map(|id| !removed_ids.contains(id))
                    .unwrap_or(true)
            });
            matched
        });
        tracing::debug!(table = %self.core.table, matched = removed.len(), "delete");
        removed
    }
}

impl IntoFuture for DeleteQuery {
    type Output = QueryResult<Vec<Row>>;
    type IntoFuture = BoxFuture<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            defer().await;
            Ok(self.run())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, TableQuery};
    use crate::core::error::ErrorKind;
    use crate::core::store::Store;
    use serde_json::json;
    use std::sync::Arc;

    fn seeded_store() -> Arc<Store> {
        let store = Arc::new(Store::new());
        store
            .seed(
                "tasks",
                vec![
                    json!({"id": "t1", "name": "A", "score": 3, "status": "open"}),
                    json!({"id": "t2", "name": "B", "score": 1, "status": "open"}),
                    json!({"id": "t3", "name": "C", "score": 2, "status": "done"}),
                ],
            )
            .expect("seed");
        store
    }

    fn query(store: &Arc<Store>) -> TableQuery {
        TableQuery::new(Arc::clone(store), "tasks")
    }

    #[tokio::test]
    async fn read_applies_filters_order_and_bounds() {
        let store = seeded_store();
        let rows = query(&store)
            .eq("status", "open")
            .order("score", Direction::Ascending)
            .limit(1)
            .await
            .expect("read");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("B")));
    }

    #[tokio::test]
    async fn descending_order_reverses() {
        let store = seeded_store();
        let rows = query(&store)
            .order("score", Direction::Descending)
            .await
            .expect("read");
        let names: Vec<_> = rows.iter().map(|r| r.get("name").cloned()).collect();
        assert_eq!(names, vec![Some(json!("A")), Some(json!("C")), Some(json!("B"))]);
    }

    #[tokio::test]
    async fn last_order_call_wins() {
        let store = seeded_store();
        let rows = query(&store)
            .order("name", Direction::Descending)
            .order("score", Direction::Ascending)
            .await
            .expect("read");
        assert_eq!(rows[0].get("name"), Some(&json!("B")));
    }

    #[tokio::test]
    async fn range_is_inclusive_and_inverted_range_is_empty() {
        let store = seeded_store();
        let rows = query(&store)
            .order("score", Direction::Ascending)
            .range(1, 2)
            .await
            .expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("C")));

        let rows = query(&store)
            .order("score", Direction::Ascending)
            .range(2, 1)
            .await
            .expect("read");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn single_cardinality_error_kinds() {
        let store = seeded_store();
        let row = query(&store).eq("id", "t2").single().await.expect("one");
        assert_eq!(row.get("name"), Some(&json!("B")));

        let err = query(&store)
            .eq("id", "missing")
            .single()
            .await
            .expect_err("none");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = query(&store)
            .eq("status", "open")
            .single()
            .await
            .expect_err("many");
        assert_eq!(err.kind(), ErrorKind::NonUnique);
    }

    #[tokio::test]
    async fn maybe_single_yields_none_for_no_match() {
        let store = seeded_store();
        let row = query(&store)
            .eq("id", "missing")
            .maybe_single()
            .await
            .expect("maybe");
        assert!(row.is_none());

        let err = query(&store)
            .eq("status", "open")
            .maybe_single()
            .await
            .expect_err("many");
        assert_eq!(err.kind(), ErrorKind::NonUnique);
    }

    #[tokio::test]
    async fn insert_lands_before_await() {
        let store = seeded_store();
        let pending = query(&store).insert(json!({"name": "D", "score": 9}));
        // Visible already: the append happens at call time.
        assert_eq!(store.table_len("tasks"), 4);
        let row = pending.await.expect("insert");
        assert!(row.get("id").is_some());
        assert!(row.get("created_at").is_some());
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = seeded_store();
        let err = query(&store)
            .insert_many(vec![json!({"ok": true}), json!("not an object")])
            .await
            .expect_err("bad batch");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(store.table_len("tasks"), 3);
    }

    #[tokio::test]
    async fn update_merges_matching_rows_only() {
        let store = seeded_store();
        let updated = query(&store)
            .update(json!({"status": "closed"}))
            .eq("status", "open")
            .await
            .expect("update");
        assert_eq!(updated.len(), 2);

        let untouched = query(&store).eq("id", "t3").single().await.expect("read");
        assert_eq!(untouched.get("status"), Some(&json!("done")));
    }

    #[tokio::test]
    async fn update_rejects_non_object_patch() {
        let store = seeded_store();
        let err = query(&store)
            .update(json!([1, 2]))
            .eq("id", "t1")
            .await
            .expect_err("patch");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[tokio::test]
    async fn delete_removes_matches_and_returns_them() {
        let store = seeded_store();
        let removed = query(&store)
            .delete()
            .in_list("id", ["t1", "t3"])
            .await
            .expect("delete");
        assert_eq!(removed.len(), 2);
        assert_eq!(store.table_len("tasks"), 1);

        let left = query(&store).await.expect("read");
        assert_eq!(left[0].get("id"), Some(&json!("t2")));
    }

    #[tokio::test]
    async fn read_of_unknown_table_is_empty() {
        let store = Arc::new(Store::new());
        let rows = TableQuery::new(Arc::clone(&store), "ghost")
            .eq("x", 1)
            .await
            .expect("read");
        assert!(rows.is_empty());
    }
}
