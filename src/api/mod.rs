//! Purpose: Define the stable public API boundary for understudy.
//! Exports: The client handle plus every type a call site can touch.
//! Role: Public, additive-only surface; hides internal store and filter modules.
//! Invariants: This module is the only public path to query and stub primitives.
//! Invariants: Internal modules remain private and are not directly exposed.

mod auth;
mod client;
mod realtime;
mod storage;

pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::query::{
    DeleteQuery, Direction, InsertMany, InsertOne, MaybeSingleQuery, QueryResult, SingleQuery,
    TableQuery, UpdateQuery,
};
pub use crate::core::row::Row;
pub use crate::core::store::Store;
pub use auth::{AuthApi, AuthEvent, AuthSubscription, Session, User};
pub use client::Client;
pub use realtime::{Channel, ChannelBuilder, SubscribeStatus};
pub use storage::{Bucket, StorageApi, StorageObject};
