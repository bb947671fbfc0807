//! Database layer for issuepulse
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Atomic upserts for per-(user, issue) engagement rows
//! - Bulk decay and cleanup statements for the periodic jobs

pub mod repo;
pub mod schema;

pub use repo::{Database, EngagementStats, EngagementUpsert};
