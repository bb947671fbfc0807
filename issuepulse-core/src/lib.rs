//! # issuepulse-core
//!
//! Core library for issuepulse - an issue intelligence and ranking engine.
//!
//! This library provides:
//! - Domain types for issues, priorities and engagement rows
//! - Issue classification, base scoring and shortlist ranking
//! - Per-user engagement tracking with periodic decay and cleanup
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! raw issues → [`IssueClassifier`] → [`PriorityScorer`] → [`IssueRanker`],
//! which also reads the current user's engagement through an
//! [`EngagementLookup`] and returns a size-capped, ordered shortlist.
//!
//! ## Example
//!
//! ```rust,no_run
//! use issuepulse_core::{source, Config, Database, EngagementTracker, IssueRanker, Personalization};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let issues = source::load_issues("issues.json".as_ref()).expect("failed to load issues");
//! let ranker = IssueRanker::from_config(&config);
//! let personalization = Personalization::new("alice", &db);
//! let now = chrono::Utc::now();
//! let shortlist = ranker
//!     .shortlist(&issues, now, Some(&personalization), config.ranking.max_count)
//!     .expect("failed to rank");
//!
//! let tracker = EngagementTracker::new(&db, config.engagement.clone());
//! for entry in &shortlist {
//!     tracker.track("alice", &entry.issue.id, "view", None);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use analysis::{
    AnalysisResult, IssueClassifier, IssueRanker, Personalization, PriorityScorer, RankedIssue,
    ScoreBreakdown,
};
pub use config::Config;
pub use db::{Database, EngagementStats};
pub use engagement::{EngagementLookup, EngagementTracker, Interaction, MaintenanceReport};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analysis;
pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod format;
pub mod logging;
pub mod source;
pub mod types;
