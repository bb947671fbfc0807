//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: per-(user, issue) engagement history
    r#"
    CREATE TABLE IF NOT EXISTS issue_engagements (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id           TEXT NOT NULL,
        issue_id          TEXT NOT NULL,
        source            TEXT NOT NULL,
        interaction_type  TEXT NOT NULL
                          CHECK (interaction_type IN ('query', 'view', 'mention')),
        interaction_count INTEGER NOT NULL DEFAULT 1
                          CHECK (interaction_count >= 1),
        engagement_score  REAL NOT NULL
                          CHECK (engagement_score >= 0.0 AND engagement_score <= 1.0),
        first_interaction TEXT NOT NULL,
        last_interaction  TEXT NOT NULL,
        context           TEXT CHECK (context IS NULL OR length(context) <= 200),
        metadata          JSON
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_engagements_user_issue
        ON issue_engagements(user_id, issue_id);
    CREATE INDEX IF NOT EXISTS idx_engagements_user ON issue_engagements(user_id);
    CREATE INDEX IF NOT EXISTS idx_engagements_issue ON issue_engagements(issue_id);
    CREATE INDEX IF NOT EXISTS idx_engagements_score ON issue_engagements(engagement_score DESC);
    CREATE INDEX IF NOT EXISTS idx_engagements_last ON issue_engagements(last_interaction);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let indexes = [
            "idx_engagements_user_issue",
            "idx_engagements_user",
            "idx_engagements_issue",
            "idx_engagements_score",
            "idx_engagements_last",
        ];

        for index in indexes {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?",
                    [index],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Index {} should exist", index);
        }
    }

    #[test]
    fn test_check_constraints_reject_out_of_range_scores() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = |score: f64, kind: &str| {
            conn.execute(
                "INSERT INTO issue_engagements
                 (user_id, issue_id, source, interaction_type, interaction_count,
                  engagement_score, first_interaction, last_interaction)
                 VALUES ('u', ?1, 'jira', ?2, 1, ?3, 'x', 'x')",
                rusqlite::params![format!("{score}-{kind}"), kind, score],
            )
        };

        assert!(insert(0.5, "view").is_ok());
        assert!(insert(1.5, "view").is_err());
        assert!(insert(-0.1, "view").is_err());
        assert!(insert(0.5, "click").is_err());
    }
}
