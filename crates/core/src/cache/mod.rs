//! Aggregate caching and snapshot persistence.
//!
//! This module provides:
//!
//! - Tenant-scoped cache keys under a reserved prefix
//! - A read-through cache over a pluggable [`CacheStore`]
//! - SQLite (`StatsDb`) and in-process (`MemoryCache`) cache stores
//! - Durable aggregate snapshots with upsert-by-natural-key
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod keys;
pub mod memory;
pub mod migrations;
pub mod read_through;
pub mod snapshots;
pub mod store;

pub use crate::Error;

pub use connection::StatsDb;
pub use keys::{AggregateName, STATS_KEY_PREFIX, cache_key, tenant_prefix};
pub use memory::MemoryCache;
pub use read_through::ReadThroughCache;
pub use snapshots::{SnapshotStore, UpsertOutcome};
pub use store::CacheStore;
