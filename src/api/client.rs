//! Purpose: Define the client entry point application code talks to.
//! Exports: `Client`.
//! Role: Drop-in stand-in for a generated backend client; every surface of the
//! hosted service hangs off this handle.
//! Invariants: Clones share one store; a mutation through any clone is visible
//! to every later query through any other.
//! Invariants: The client itself never fails to construct; absent tables and
//! buckets appear on first use.

use std::sync::Arc;

use crate::api::auth::{AuthApi, Session, User};
use crate::api::realtime::ChannelBuilder;
use crate::api::storage::StorageApi;
use crate::core::query::TableQuery;
use crate::core::store::Store;

#[derive(Clone, Debug)]
pub struct Client {
    store: Arc<Store>,
    session: Session,
}

impl Client {
    /// A client over a fresh, empty store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(Store::new()))
    }

    /// A client over an existing store, so several clients (or a client and a
    /// test harness) observe the same rows.
    pub fn with_store(store: Arc<Store>) -> Self {
        Self {
            store,
            session: Session::for_user(User::default()),
        }
    }

    /// Replace the fixed identity the auth stub reports.
    pub fn with_user(mut self, user: User) -> Self {
        self.session = Session::for_user(user);
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Start a query against one table.
    pub fn from(&self, table: impl Into<String>) -> TableQuery {
        TableQuery::new(Arc::clone(&self.store), table)
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.session.clone())
    }

    pub fn storage(&self) -> StorageApi {
        StorageApi::new(Arc::clone(&self.store))
    }

    pub fn channel(&self, topic: impl Into<String>) -> ChannelBuilder {
        ChannelBuilder::new(topic)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::api::auth::User;
    use serde_json::json;

    #[tokio::test]
    async fn clones_share_the_store() {
        let client = Client::new();
        let other = client.clone();
        client
            .from("projects")
            .insert(json!({"name": "Bridge"}))
            .await
            .expect("insert");
        let rows = other.from("projects").await.expect("read");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn with_user_sets_the_fixed_identity() {
        let client = Client::new().with_user(User::new("pm-1", "pm@example.test"));
        let user = client.auth().get_user().await.expect("user");
        assert_eq!(user.id, "pm-1");
    }

    #[tokio::test]
    async fn store_reset_isolates_tests() {
        let client = Client::new();
        client
            .from("t")
            .insert(json!({"x": 1}))
            .await
            .expect("insert");
        client.store().reset();
        assert!(client.from("t").await.expect("read").is_empty());
    }
}
