//! Engagement tracking and periodic maintenance.
//!
//! The tracker borrows an explicit [`Database`] handle; there is no global
//! connection. Row lifecycle:
//!
//! ```text
//! absent ──record──▶ active (count=1) ──record──▶ active (count=N)
//!                                                     │ idle ≥ decay threshold
//!                                                     ▼
//!                    deleted ◀──cleanup── near zero ◀── decaying
//! ```

use crate::config::EngagementConfig;
use crate::db::{Database, EngagementUpsert};
use crate::engagement::scoring::{check_score, MAX_CONTEXT_CHARS};
use crate::error::{Error, Result};
use crate::format::truncate_chars;
use crate::types::{InteractionType, IssueEngagement};
use chrono::{DateTime, Duration, Utc};

/// A single interaction reported by a caller.
#[derive(Debug, Clone)]
pub struct Interaction<'a> {
    pub user_id: &'a str,
    pub issue_id: &'a str,
    pub interaction_type: InteractionType,
    /// Free text describing the interaction; truncated before storage
    pub context: Option<&'a str>,
    /// Overrides the configured source system
    pub source: Option<&'a str>,
    /// Must be a JSON object when present
    pub metadata: Option<serde_json::Value>,
}

impl<'a> Interaction<'a> {
    pub fn new(user_id: &'a str, issue_id: &'a str, interaction_type: InteractionType) -> Self {
        Self {
            user_id,
            issue_id,
            interaction_type,
            context: None,
            source: None,
            metadata: None,
        }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Counts produced by one maintenance run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MaintenanceReport {
    pub decayed: usize,
    pub deleted: usize,
}

/// Records interactions and runs decay/cleanup against a database.
pub struct EngagementTracker<'a> {
    db: &'a Database,
    config: EngagementConfig,
}

impl<'a> EngagementTracker<'a> {
    pub fn new(db: &'a Database, config: EngagementConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &EngagementConfig {
        &self.config
    }

    pub fn db(&self) -> &'a Database {
        self.db
    }

    /// Record an interaction now. `category` must be "query", "view" or "mention".
    pub fn record_interaction(
        &self,
        user_id: &str,
        issue_id: &str,
        category: &str,
        context: Option<&str>,
    ) -> Result<IssueEngagement> {
        self.record_interaction_at(user_id, issue_id, category, context, Utc::now())
    }

    /// Record an interaction at an explicit time.
    pub fn record_interaction_at(
        &self,
        user_id: &str,
        issue_id: &str,
        category: &str,
        context: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssueEngagement> {
        let interaction_type: InteractionType = category.trim().parse()?;
        let mut interaction = Interaction::new(user_id, issue_id, interaction_type);
        interaction.context = context;
        self.record(&interaction, now)
    }

    /// Validate and upsert a fully specified interaction.
    ///
    /// Nothing is written when validation fails.
    pub fn record(&self, interaction: &Interaction<'_>, now: DateTime<Utc>) -> Result<IssueEngagement> {
        let user_id = interaction.user_id.trim();
        let issue_id = interaction.issue_id.trim();
        if user_id.is_empty() || issue_id.is_empty() {
            return Err(Error::Validation(
                "user_id and issue_id must be non-empty".to_string(),
            ));
        }
        if let Some(metadata) = &interaction.metadata {
            if !metadata.is_object() {
                return Err(Error::Validation(
                    "interaction metadata must be a JSON object".to_string(),
                ));
            }
        }

        let context = interaction
            .context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| truncate_chars(c, MAX_CONTEXT_CHARS));
        let source = interaction
            .source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.source_system.as_str());

        let engagement = self.db.upsert_engagement(
            &EngagementUpsert {
                user_id,
                issue_id,
                source,
                interaction_type: interaction.interaction_type,
                context,
                metadata: interaction.metadata.as_ref(),
            },
            now,
        )?;

        check_score(engagement.engagement_score)?;
        Ok(engagement)
    }

    /// Hot-path variant: failures are logged and swallowed.
    pub fn track(
        &self,
        user_id: &str,
        issue_id: &str,
        category: &str,
        context: Option<&str>,
    ) -> Option<IssueEngagement> {
        match self.record_interaction(user_id, issue_id, category, context) {
            Ok(engagement) => Some(engagement),
            Err(e) => {
                tracing::warn!(
                    user_id,
                    issue_id,
                    category,
                    error = %e,
                    "Failed to track interaction"
                );
                None
            }
        }
    }

    /// The row for a pair, or [`Error::EngagementNotFound`].
    pub fn engagement(&self, user_id: &str, issue_id: &str) -> Result<IssueEngagement> {
        self.db
            .get_engagement(user_id, issue_id)?
            .ok_or_else(|| Error::EngagementNotFound {
                user_id: user_id.to_string(),
                issue_id: issue_id.to_string(),
            })
    }

    /// A user's most engaged issues, highest score first.
    pub fn top_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<IssueEngagement>> {
        self.db.top_engagements(user_id, limit)
    }

    /// Decay rows idle for at least `threshold_days` by `decay_factor`.
    pub fn decay_old(&self, threshold_days: i64, decay_factor: f64) -> Result<usize> {
        self.decay_old_at(threshold_days, decay_factor, Utc::now())
    }

    /// Decay evaluated at an explicit time. Returns the number of rows affected.
    pub fn decay_old_at(
        &self,
        threshold_days: i64,
        decay_factor: f64,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if threshold_days < 0 {
            return Err(Error::Validation(format!(
                "decay threshold must be non-negative, got {} days",
                threshold_days
            )));
        }
        if !(0.0..=1.0).contains(&decay_factor) {
            return Err(Error::Validation(format!(
                "decay factor must be within [0, 1], got {}",
                decay_factor
            )));
        }

        let cutoff = cutoff_before(now, threshold_days)?;
        let affected = self.db.decay_engagements(cutoff, 1.0 - decay_factor)?;

        tracing::info!(threshold_days, decay_factor, affected, "Decayed idle engagements");
        Ok(affected)
    }

    /// Delete near-zero rows idle for more than `age_days`.
    pub fn cleanup_zero(&self, age_days: i64) -> Result<usize> {
        self.cleanup_zero_at(age_days, Utc::now())
    }

    /// Cleanup evaluated at an explicit time. Returns the number of rows deleted.
    pub fn cleanup_zero_at(&self, age_days: i64, now: DateTime<Utc>) -> Result<usize> {
        if age_days < 0 {
            return Err(Error::Validation(format!(
                "cleanup age must be non-negative, got {} days",
                age_days
            )));
        }

        let cutoff = cutoff_before(now, age_days)?;
        let deleted = self
            .db
            .delete_zero_engagements(self.config.zero_epsilon, cutoff)?;

        tracing::info!(
            age_days,
            epsilon = self.config.zero_epsilon,
            deleted,
            "Cleaned up zero engagements"
        );
        Ok(deleted)
    }

    /// Decay then cleanup, using the configured thresholds.
    pub fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceReport> {
        let decayed = self.decay_old_at(
            self.config.decay_threshold_days,
            self.config.decay_factor,
            now,
        )?;
        let deleted = self.cleanup_zero_at(self.config.cleanup_age_days, now)?;
        Ok(MaintenanceReport { decayed, deleted })
    }
}

/// `now - days`, or a validation error when that instant is not representable.
fn cutoff_before(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| Error::Validation(format!("{} days is out of range", days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_record_twice_keeps_one_row() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());

        let first = tracker
            .record_interaction("u1", "ISS-1", "query", Some("status?"))
            .unwrap();
        let second = tracker
            .record_interaction("u1", "ISS-1", "mention", None)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.interaction_count, 2);
        assert_eq!(second.interaction_type, InteractionType::Mention);
        assert_eq!(second.source, "jira");
        assert_eq!(db.count_engagements().unwrap(), 1);
    }

    #[test]
    fn test_invalid_category_writes_nothing() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());

        let err = tracker
            .record_interaction("u1", "ISS-1", "click", None)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(db.count_engagements().unwrap(), 0);

        assert!(tracker.track("u1", "ISS-1", "like", None).is_none());
        assert_eq!(db.count_engagements().unwrap(), 0);
    }

    #[test]
    fn test_blank_ids_and_non_object_metadata_rejected() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let now = Utc::now();

        let blank = Interaction::new(" ", "ISS-1", InteractionType::View);
        assert!(tracker.record(&blank, now).unwrap_err().is_validation());

        let bad_meta = Interaction::new("u1", "ISS-1", InteractionType::View)
            .with_metadata(serde_json::json!([1, 2]));
        assert!(tracker.record(&bad_meta, now).unwrap_err().is_validation());
        assert_eq!(db.count_engagements().unwrap(), 0);
    }

    #[test]
    fn test_context_is_truncated() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let long = "é".repeat(250);

        let row = tracker
            .record_interaction("u1", "ISS-1", "query", Some(&long))
            .unwrap();
        let stored = row.context.unwrap();
        assert_eq!(stored.chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_source_override_and_metadata() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let interaction = Interaction::new("u1", "GH-7", InteractionType::View)
            .with_source("github")
            .with_context("opened in briefing")
            .with_metadata(serde_json::json!({"briefing": "morning"}));

        let row = tracker.record(&interaction, Utc::now()).unwrap();
        assert_eq!(row.source, "github");
        assert_eq!(row.context.as_deref(), Some("opened in briefing"));
        assert_eq!(row.metadata, Some(serde_json::json!({"briefing": "morning"})));
    }

    #[test]
    fn test_engagement_not_found_is_distinct() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let err = tracker.engagement("u1", "ISS-404").unwrap_err();
        assert!(matches!(err, Error::EngagementNotFound { .. }));
        assert!(!err.is_storage());
    }

    #[test]
    fn test_decay_reduces_eligible_rows_by_factor() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let now = Utc::now();

        // 0.68 after one interaction; 20 days idle makes it eligible
        tracker
            .record_interaction_at("u1", "old", "view", None, now - Duration::days(20))
            .unwrap();
        tracker
            .record_interaction_at("u1", "fresh", "view", None, now)
            .unwrap();

        let affected = tracker.decay_old_at(14, 0.1, now).unwrap();
        assert_eq!(affected, 1);
        let old = tracker.engagement("u1", "old").unwrap();
        assert!((old.engagement_score - 0.68 * 0.9).abs() < 1e-9);
        let fresh = tracker.engagement("u1", "fresh").unwrap();
        assert!((fresh.engagement_score - 0.68).abs() < 1e-9);
    }

    #[test]
    fn test_decay_rejects_bad_arguments() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        assert!(tracker.decay_old(-1, 0.1).unwrap_err().is_validation());
        assert!(tracker.decay_old(7, 1.2).unwrap_err().is_validation());
        assert!(tracker.cleanup_zero(-5).unwrap_err().is_validation());
    }

    #[test]
    fn test_out_of_range_day_windows_are_validation_errors() {
        let db = test_db();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());
        let now = Utc::now();

        let err = tracker.decay_old_at(1_000_000_000_000, 0.1, now).unwrap_err();
        assert!(err.is_validation());
        let err = tracker.cleanup_zero_at(i64::MAX, now).unwrap_err();
        assert!(err.is_validation());

        // Representable but far beyond any row
        tracker.record_interaction_at("u1", "ISS-1", "view", None, now).unwrap();
        assert_eq!(tracker.decay_old_at(1_000_000, 0.1, now).unwrap(), 0);
    }

    #[test]
    fn test_track_swallows_storage_failures() {
        // No migration: the engagement table does not exist
        let db = Database::open_in_memory().unwrap();
        let tracker = EngagementTracker::new(&db, EngagementConfig::default());

        assert!(tracker.track("u1", "ISS-1", "view", None).is_none());
        let err = tracker.record_interaction("u1", "ISS-1", "view", None).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_maintenance_decays_then_cleans() {
        let db = test_db();
        let config = EngagementConfig {
            decay_factor: 1.0,
            ..EngagementConfig::default()
        };
        let tracker = EngagementTracker::new(&db, config);
        let now = Utc::now();

        tracker
            .record_interaction_at("u1", "ancient", "view", None, now - Duration::days(120))
            .unwrap();
        tracker
            .record_interaction_at("u1", "recent", "view", None, now - Duration::days(1))
            .unwrap();

        let report = tracker.run_maintenance(now).unwrap();
        assert_eq!(report, MaintenanceReport { decayed: 1, deleted: 1 });
        assert!(tracker.engagement("u1", "ancient").is_err());
        assert!(tracker.engagement("u1", "recent").is_ok());
    }
}
