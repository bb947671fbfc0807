//! Database repository layer
//!
//! Provides upsert, lookup and batch maintenance operations for engagement rows.

use crate::engagement::scoring::{
    compute_score, recency_score, FREQUENCY_STEP, FREQUENCY_WEIGHT, RECENCY_WEIGHT,
};
use crate::error::{Error, Result};
use crate::format::{parse_timestamp, storage_timestamp};
use crate::types::{InteractionType, IssueEngagement};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const ENGAGEMENT_COLUMNS: &str = "id, user_id, issue_id, source, interaction_type, \
    interaction_count, engagement_score, first_interaction, last_interaction, context, metadata";

/// One interaction to fold into the (user, issue) row.
///
/// `context` must already be truncated by the caller.
#[derive(Debug, Clone)]
pub struct EngagementUpsert<'a> {
    pub user_id: &'a str,
    pub issue_id: &'a str,
    pub source: &'a str,
    pub interaction_type: InteractionType,
    pub context: Option<&'a str>,
    pub metadata: Option<&'a serde_json::Value>,
}

/// Aggregate statistics over the engagement table.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct EngagementStats {
    /// Total number of rows
    pub total_rows: i64,
    /// Distinct users with at least one row
    pub distinct_users: i64,
    /// Distinct issues with at least one row
    pub distinct_issues: i64,
    /// Mean engagement score (0.0 when empty)
    pub average_score: f64,
    /// Sum of interaction counts
    pub total_interactions: i64,
    /// Row count per latest interaction type, sorted by type
    pub by_type: Vec<(String, i64)>,
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ============================================
    // Engagement writes
    // ============================================

    /// Record one interaction for a (user, issue) pair in a single statement.
    ///
    /// A new pair is inserted with count 1. An existing pair has its count
    /// incremented and its score recomputed in place by the `ON CONFLICT`
    /// clause, so concurrent callers never observe a half-applied update and
    /// never create a second row.
    pub fn upsert_engagement(
        &self,
        upsert: &EngagementUpsert<'_>,
        now: DateTime<Utc>,
    ) -> Result<IssueEngagement> {
        let now_str = storage_timestamp(now);
        let initial_score = compute_score(1, now, now);
        let metadata = upsert.metadata.map(|m| m.to_string());

        let conn = self.conn.lock();
        let sql = format!(
            r#"
            INSERT INTO issue_engagements
                (user_id, issue_id, source, interaction_type, interaction_count,
                 engagement_score, first_interaction, last_interaction, context, metadata)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6, ?7, ?8)
            ON CONFLICT(user_id, issue_id) DO UPDATE SET
                interaction_type = excluded.interaction_type,
                interaction_count = issue_engagements.interaction_count + 1,
                engagement_score = MAX(0.0, MIN(1.0,
                    MIN(1.0, (issue_engagements.interaction_count + 1) * ?9) * ?10
                    + ?11 * ?12)),
                last_interaction = MAX(issue_engagements.last_interaction, excluded.last_interaction),
                context = COALESCE(excluded.context, issue_engagements.context),
                metadata = COALESCE(excluded.metadata, issue_engagements.metadata)
            RETURNING {ENGAGEMENT_COLUMNS}
            "#
        );

        let engagement = conn.query_row(
            &sql,
            params![
                upsert.user_id,
                upsert.issue_id,
                upsert.source,
                upsert.interaction_type.as_str(),
                initial_score,
                now_str,
                upsert.context,
                metadata,
                FREQUENCY_STEP,
                FREQUENCY_WEIGHT,
                recency_score(0.0),
                RECENCY_WEIGHT,
            ],
            Self::row_to_engagement,
        )?;

        tracing::debug!(
            user_id = upsert.user_id,
            issue_id = upsert.issue_id,
            interaction_type = %upsert.interaction_type,
            count = engagement.interaction_count,
            score = engagement.engagement_score,
            "Recorded engagement"
        );

        Ok(engagement)
    }

    /// Multiply the score of every row idle since `cutoff` (inclusive) by `keep_fraction`.
    ///
    /// Returns the number of rows updated.
    pub fn decay_engagements(&self, cutoff: DateTime<Utc>, keep_fraction: f64) -> Result<usize> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            r#"
            UPDATE issue_engagements
            SET engagement_score = MAX(0.0, MIN(1.0, engagement_score * ?1))
            WHERE last_interaction <= ?2
            "#,
            params![keep_fraction, storage_timestamp(cutoff)],
        )?;
        Ok(updated)
    }

    /// Delete rows scoring below `epsilon` whose last interaction is before `cutoff`.
    ///
    /// Returns the number of rows deleted.
    pub fn delete_zero_engagements(&self, epsilon: f64, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM issue_engagements WHERE engagement_score < ?1 AND last_interaction < ?2",
            params![epsilon, storage_timestamp(cutoff)],
        )?;
        Ok(deleted)
    }

    /// Delete a single (user, issue) row. Returns whether a row existed.
    pub fn delete_engagement(&self, user_id: &str, issue_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM issue_engagements WHERE user_id = ?1 AND issue_id = ?2",
            params![user_id, issue_id],
        )?;
        Ok(deleted > 0)
    }

    /// Delete every row for a user. Returns the number of rows deleted.
    pub fn delete_user_engagements(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM issue_engagements WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(deleted)
    }

    // ============================================
    // Engagement reads
    // ============================================

    /// Get the row for a (user, issue) pair
    pub fn get_engagement(&self, user_id: &str, issue_id: &str) -> Result<Option<IssueEngagement>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {ENGAGEMENT_COLUMNS} FROM issue_engagements WHERE user_id = ?1 AND issue_id = ?2"
            ),
            params![user_id, issue_id],
            Self::row_to_engagement,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Stored score for a (user, issue) pair, if any
    pub fn get_engagement_score(&self, user_id: &str, issue_id: &str) -> Result<Option<f64>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT engagement_score FROM issue_engagements WHERE user_id = ?1 AND issue_id = ?2",
            params![user_id, issue_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// All stored scores for a user, keyed by issue id
    pub fn user_engagement_scores(&self, user_id: &str) -> Result<HashMap<String, f64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT issue_id, engagement_score FROM issue_engagements WHERE user_id = ?1",
        )?;

        let scores = stmt
            .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<String, f64>>>()?;

        Ok(scores)
    }

    /// A user's most engaged issues, highest score first
    pub fn top_engagements(&self, user_id: &str, limit: usize) -> Result<Vec<IssueEngagement>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {ENGAGEMENT_COLUMNS}
            FROM issue_engagements
            WHERE user_id = ?1
            ORDER BY engagement_score DESC, last_interaction DESC, issue_id ASC
            LIMIT ?2
            "#
        ))?;

        let rows = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_engagement)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Total number of engagement rows
    pub fn count_engagements(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM issue_engagements", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Aggregate statistics for observability
    pub fn engagement_stats(&self) -> Result<EngagementStats> {
        let conn = self.conn.lock();

        let (total_rows, distinct_users, distinct_issues, average_score, total_interactions) = conn
            .query_row(
                r#"
                SELECT COUNT(*),
                       COUNT(DISTINCT user_id),
                       COUNT(DISTINCT issue_id),
                       COALESCE(AVG(engagement_score), 0.0),
                       COALESCE(SUM(interaction_count), 0)
                FROM issue_engagements
                "#,
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT interaction_type, COUNT(*)
            FROM issue_engagements
            GROUP BY interaction_type
            ORDER BY interaction_type
            "#,
        )?;
        let by_type = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

        Ok(EngagementStats {
            total_rows,
            distinct_users,
            distinct_issues,
            average_score,
            total_interactions,
            by_type,
        })
    }

    fn row_to_engagement(row: &Row) -> rusqlite::Result<IssueEngagement> {
        let interaction_type_str: String = row.get("interaction_type")?;
        let interaction_type = interaction_type_str
            .parse::<InteractionType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        let first_str: String = row.get("first_interaction")?;
        let last_str: String = row.get("last_interaction")?;
        let metadata_str: Option<String> = row.get("metadata")?;

        Ok(IssueEngagement {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            issue_id: row.get("issue_id")?,
            source: row.get("source")?,
            interaction_type,
            interaction_count: row.get("interaction_count")?,
            engagement_score: row.get("engagement_score")?,
            first_interaction: Self::parse_stored_timestamp(7, &first_str)?,
            last_interaction: Self::parse_stored_timestamp(8, &last_str)?,
            context: row.get("context")?,
            metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
        })
    }

    fn parse_stored_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
        parse_timestamp(value).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                Type::Text,
                format!("invalid timestamp {:?}", value).into(),
            )
        })
    }
}
