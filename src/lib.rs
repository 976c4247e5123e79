//! Purpose: In-memory stand-in for a hosted Postgres-style backend client.
//! Exports: `api` (client handle, query builder, auth/storage/realtime stubs).
//! Role: Lets application code written against a generated backend client run
//! without a live service; all state lives in one process-lifetime store.
//! Invariants: The `api` module is the public surface; `core` stays internal.
//! Invariants: One store, one logical connection — every completed mutation is
//! visible to every later query, and nothing stronger is promised.

pub mod api;
mod core;
pub mod logging;
