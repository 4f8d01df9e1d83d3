//! Core types and shared functionality for edstats.
//!
//! This crate provides:
//! - Aggregate queries over an LMS source and the yearly combiner
//! - Tenant-scoped read-through caching with SQLite and in-memory stores
//! - Mutation-driven cache invalidation
//! - Durable aggregate snapshots and the refresh pipeline
//! - Unified error types and layered configuration

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod notify;
pub mod refresh;
pub mod service;
pub mod source;
pub mod tenant;

pub use cache::{CacheStore, MemoryCache, SnapshotStore, StatsDb};
pub use config::AppConfig;
pub use error::Error;
pub use invalidation::InvalidationHook;
pub use notify::{MutationEvent, MutationNotifier};
pub use refresh::{RefreshReport, SnapshotRefresher};
pub use service::StatsService;
pub use source::SourceStore;
