//! Client code for edstats.
//!
//! This crate provides the read-only connection to the LMS database that
//! feeds the aggregate pipeline in `edstats-core`.

pub mod source;

pub use source::SourceDb;
