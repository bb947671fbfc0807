//! Core domain types for issuepulse
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Issue** | A work item delivered by an external tracker; read-only here |
//! | **Priority** | Static `P0`..`P4` urgency, explicit or carried as a label |
//! | **Interaction** | A user touching an issue: a query, a view or a mention |
//! | **Engagement** | The persisted per-(user, issue) interaction history and its score |
//!
//! Issues are never persisted by this crate. Only [`IssueEngagement`] rows have
//! a lifecycle of their own.

use crate::error::{Error, Result};
use crate::format::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// Issue
// ============================================

/// A work item as delivered by the issue source.
///
/// Every field except `id` is optional on the wire. Missing or malformed
/// values degrade to "unknown" rather than failing the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    /// Identifier, stable and unique within the source system
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Free-text lifecycle status, e.g. "In Progress" or "Done"
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Explicit priority (e.g. "P1"); falls back to labels when absent
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    /// Identifiers of issues blocking this one
    #[serde(default)]
    pub blocked_by: Vec<String>,
    /// Source tracker name (e.g. "jira")
    #[serde(default)]
    pub source: Option<String>,
}

impl Issue {
    /// Create a bare issue with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            state: String::new(),
            labels: Vec::new(),
            priority: None,
            created_at: None,
            updated_at: None,
            description: None,
            comments: Vec::new(),
            blocked_by: Vec::new(),
            source: None,
        }
    }

    /// Case-insensitive label check.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels
            .iter()
            .any(|l| l.trim().eq_ignore_ascii_case(label.trim()))
    }

    pub fn has_any_label<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        labels.iter().any(|l| self.has_label(l.as_ref()))
    }

    /// Whether any comment body contains any of the keywords (case-insensitive).
    pub fn comments_contain_any<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        self.comments
            .iter()
            .any(|body| contains_any_keyword(body, keywords))
    }

    /// Whether the title or description contains any of the keywords (case-insensitive).
    pub fn title_or_description_contains_any<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        contains_any_keyword(&self.title, keywords)
            || self
                .description
                .as_deref()
                .is_some_and(|d| contains_any_keyword(d, keywords))
    }

    /// Non-blank identifiers of the issues blocking this one.
    pub fn blocking_dependencies(&self) -> impl Iterator<Item = &str> {
        self.blocked_by
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }

    pub fn has_blocking_relationship(&self) -> bool {
        self.blocking_dependencies().next().is_some()
    }

    /// Resolve the static priority.
    ///
    /// The explicit `priority` field wins; otherwise the most urgent `P0`..`P4`
    /// label is used. Unrecognized values resolve to `None`.
    pub fn priority(&self) -> Option<Priority> {
        if let Some(explicit) = self.priority.as_deref().and_then(Priority::parse) {
            return Some(explicit);
        }
        self.labels.iter().filter_map(|l| Priority::parse(l)).min()
    }
}

fn contains_any_keyword<S: AsRef<str>>(haystack: &str, keywords: &[S]) -> bool {
    let haystack = haystack.to_lowercase();
    keywords.iter().any(|k| {
        let k = k.as_ref().trim();
        !k.is_empty() && haystack.contains(&k.to_lowercase())
    })
}

/// Accepts RFC3339 or SQLite-style timestamps; anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            let parsed = parse_timestamp(&s);
            if parsed.is_none() {
                tracing::warn!(value = %s, "Unparseable issue timestamp, treating as unknown");
            }
            parsed
        }
        Some(other) => {
            tracing::warn!(value = %other, "Non-string issue timestamp, treating as unknown");
            None
        }
    })
}

// ============================================
// Priority
// ============================================

/// Static priority, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// Parse "P0".."P4" (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Priority::P0),
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            "P3" => Some(Priority::P3),
            "P4" => Some(Priority::P4),
            _ => None,
        }
    }

    /// Position in the `P0`..`P4` table, used to index priority weights.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Interactions and engagement
// ============================================

/// Kind of interaction a user had with an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// The user asked about the issue
    Query,
    /// The issue was shown to the user
    View,
    /// The user mentioned the issue in conversation
    Mention,
}

impl InteractionType {
    pub const ALL: [InteractionType; 3] = [
        InteractionType::Query,
        InteractionType::View,
        InteractionType::Mention,
    ];

    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Query => "query",
            InteractionType::View => "view",
            InteractionType::Mention => "mention",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InteractionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "query" => Ok(InteractionType::Query),
            "view" => Ok(InteractionType::View),
            "mention" => Ok(InteractionType::Mention),
            _ => Err(Error::Validation(format!(
                "unknown interaction type: {:?} (expected query, view or mention)",
                s
            ))),
        }
    }
}

/// Persisted interaction history for one (user, issue) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueEngagement {
    /// Row id assigned by storage
    pub id: i64,
    pub user_id: String,
    pub issue_id: String,
    /// Source system the issue id belongs to
    pub source: String,
    /// Most recent interaction kind
    pub interaction_type: InteractionType,
    /// Number of tracked interactions, at least 1
    pub interaction_count: i64,
    /// Always within [0.0, 1.0]
    pub engagement_score: f64,
    pub first_interaction: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    /// Truncated context of the latest interaction that carried one
    pub context: Option<String>,
    /// Extensible metadata (JSON object)
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_labels_picks_most_urgent() {
        let mut issue = Issue::new("ISS-1", "Fix login");
        issue.labels = vec!["backend".into(), "p3".into(), "P1".into()];
        assert_eq!(issue.priority(), Some(Priority::P1));

        issue.priority = Some("P0".into());
        assert_eq!(issue.priority(), Some(Priority::P0));

        issue.priority = Some("urgent".into());
        assert_eq!(issue.priority(), Some(Priority::P1));

        issue.labels.clear();
        assert_eq!(issue.priority(), None);
    }

    #[test]
    fn test_label_and_keyword_matching_is_case_insensitive() {
        let mut issue = Issue::new("ISS-2", "Deploy is BLOCKED by infra");
        issue.labels = vec!["on hold".into()];
        issue.comments = vec!["We are Waiting For the vendor".into()];

        assert!(issue.has_label("On Hold"));
        assert!(issue.has_any_label(&["Waiting", "On Hold"]));
        assert!(issue.comments_contain_any(&["waiting for"]));
        assert!(issue.title_or_description_contains_any(&["blocked"]));
        assert!(!issue.title_or_description_contains_any(&["", "  "]));
    }

    #[test]
    fn test_interaction_type_parse() {
        for kind in InteractionType::ALL {
            assert_eq!(kind.as_str().parse::<InteractionType>().unwrap(), kind);
        }
        let err = "click".parse::<InteractionType>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_issue_deserialize_tolerates_bad_timestamps() {
        let json = r#"{
            "id": "ISS-3",
            "title": "Flaky test",
            "updated_at": "not a date",
            "created_at": "2026-01-05 10:00:00",
            "labels": ["P2"]
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert!(issue.updated_at.is_none());
        assert!(issue.created_at.is_some());
        assert_eq!(issue.state, "");
        assert!(!issue.has_blocking_relationship());
    }
}
