//! Per-user engagement tracking
//!
//! - [`scoring`]: the frequency/recency score formula and decay step
//! - [`tracker`]: validated recording plus the periodic decay and cleanup jobs
//!
//! The ranker reads scores through [`EngagementLookup`], so it never depends
//! on the storage layer directly.

pub mod scoring;
pub mod tracker;

pub use scoring::{compute_score, frequency_score, recency_score};
pub use tracker::{EngagementTracker, Interaction, MaintenanceReport};

use crate::db::Database;
use crate::error::Result;
use std::collections::{HashMap, HashSet};

/// Read access to engagement scores for ranking.
pub trait EngagementLookup {
    /// Score for one (user, issue) pair; `Ok(None)` when nothing was recorded.
    fn engagement_score(&self, user_id: &str, issue_id: &str) -> Result<Option<f64>>;

    /// Scores for many issues at once, keyed by issue id. Missing pairs are omitted.
    fn engagement_scores(&self, user_id: &str, issue_ids: &[&str]) -> Result<HashMap<String, f64>> {
        let mut scores = HashMap::with_capacity(issue_ids.len());
        for issue_id in issue_ids {
            if let Some(score) = self.engagement_score(user_id, issue_id)? {
                scores.insert((*issue_id).to_string(), score);
            }
        }
        Ok(scores)
    }
}

impl EngagementLookup for Database {
    fn engagement_score(&self, user_id: &str, issue_id: &str) -> Result<Option<f64>> {
        self.get_engagement_score(user_id, issue_id)
    }

    // One query per user instead of one per issue.
    fn engagement_scores(&self, user_id: &str, issue_ids: &[&str]) -> Result<HashMap<String, f64>> {
        let wanted: HashSet<&str> = issue_ids.iter().copied().collect();
        let mut all = self.user_engagement_scores(user_id)?;
        all.retain(|issue_id, _| wanted.contains(issue_id.as_str()));
        Ok(all)
    }
}

/// In-memory scores keyed by `(user_id, issue_id)`.
impl EngagementLookup for HashMap<(String, String), f64> {
    fn engagement_score(&self, user_id: &str, issue_id: &str) -> Result<Option<f64>> {
        Ok(self
            .get(&(user_id.to_string(), issue_id.to_string()))
            .copied())
    }
}

impl<'a> EngagementLookup for EngagementTracker<'a> {
    fn engagement_score(&self, user_id: &str, issue_id: &str) -> Result<Option<f64>> {
        self.db().engagement_score(user_id, issue_id)
    }

    fn engagement_scores(&self, user_id: &str, issue_ids: &[&str]) -> Result<HashMap<String, f64>> {
        self.db().engagement_scores(user_id, issue_ids)
    }
}
