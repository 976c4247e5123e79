// Core modules implementing the in-memory store, filtering, and error modeling.
pub mod error;
pub mod filter;
pub mod query;
pub mod row;
pub mod store;

/// One scheduling turn, standing in for the network round trip the real
/// client would make. Resolution always completes; there is no cancellation
/// path beyond dropping a future before awaiting it.
pub(crate) async fn defer() {
    tokio::task::yield_now().await;
}
