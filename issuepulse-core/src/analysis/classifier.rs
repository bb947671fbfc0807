//! Issue classification rules.
//!
//! Each rule is a pure function over one issue and the evaluation time. A rule
//! that fires yields a [`Signal`]; the classifier folds the signals into an
//! [`AnalysisResult`]. Rules never fail: missing fields simply keep the rule
//! from firing.

use crate::config::ClassifierConfig;
use crate::types::Issue;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Derived, per-pass classification of one issue. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub is_stagnant: bool,
    pub is_blocked: bool,
    pub is_recently_active: bool,
    /// Short human-readable notes, blocked first, then stagnant, then active
    pub insights: Vec<String>,
}

/// Why an issue counts as blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Blocked by this many linked issues
    Dependencies(usize),
    Label(String),
    Keyword,
}

/// A rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Blocked(BlockReason),
    Stagnant { idle_days: i64 },
    RecentlyActive { idle_hours: i64 },
}

impl Signal {
    /// One-line insight text for this signal.
    pub fn insight(&self) -> String {
        match self {
            Signal::Blocked(BlockReason::Dependencies(n)) => {
                format!("Blocked by {} linked issue{}", n, if *n == 1 { "" } else { "s" })
            }
            Signal::Blocked(BlockReason::Label(label)) => format!("Blocked (labeled {})", label),
            Signal::Blocked(BlockReason::Keyword) => {
                "Possibly blocked (mentioned in title or description)".to_string()
            }
            Signal::Stagnant { idle_days } => {
                format!("Stagnant: in progress with no updates for {} days", idle_days)
            }
            Signal::RecentlyActive { idle_hours } => {
                if *idle_hours <= 0 {
                    "Active: updated within the last hour".to_string()
                } else {
                    format!("Active: updated {}h ago", idle_hours)
                }
            }
        }
    }
}

/// Blocked when linked as blocked, labeled blocked, or described as blocked.
pub fn blocking_rule(issue: &Issue, config: &ClassifierConfig) -> Option<Signal> {
    if issue.has_blocking_relationship() {
        let dependencies = issue.blocking_dependencies().count();
        return Some(Signal::Blocked(BlockReason::Dependencies(dependencies)));
    }
    if issue.has_label(&config.blocked_label) {
        return Some(Signal::Blocked(BlockReason::Label(
            config.blocked_label.clone(),
        )));
    }
    if issue.title_or_description_contains_any(&config.blocker_keywords) {
        return Some(Signal::Blocked(BlockReason::Keyword));
    }
    None
}

/// Stagnant when in progress, idle past the threshold, and not intentionally held.
///
/// The hold-label and pause-keyword checks suppress issues that are parked on
/// purpose. This is a heuristic: an unlabeled, uncommented pause still reads
/// as stagnant.
pub fn stagnation_rule(
    issue: &Issue,
    config: &ClassifierConfig,
    now: DateTime<Utc>,
) -> Option<Signal> {
    let updated_at = issue.updated_at?;
    let idle = now.signed_duration_since(updated_at);

    // A threshold too large to represent can never be reached.
    let threshold = Duration::try_days(config.stagnation_days)?;
    if idle < threshold {
        return None;
    }
    if !issue
        .state
        .trim()
        .eq_ignore_ascii_case(config.in_progress_state.trim())
    {
        return None;
    }
    if issue.has_any_label(&config.hold_labels) {
        return None;
    }
    if issue.comments_contain_any(&config.pause_keywords) {
        return None;
    }

    Some(Signal::Stagnant {
        idle_days: idle.num_days(),
    })
}

/// Recently active when updated within the activity window.
pub fn activity_rule(
    issue: &Issue,
    config: &ClassifierConfig,
    now: DateTime<Utc>,
) -> Option<Signal> {
    let updated_at = issue.updated_at?;
    let idle = now.signed_duration_since(updated_at);

    // A window too large to represent covers every update.
    let recent = Duration::try_hours(config.active_hours).map_or(true, |window| idle < window);
    recent.then(|| Signal::RecentlyActive {
        idle_hours: idle.num_hours().max(0),
    })
}

/// Applies the classification rules with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct IssueClassifier {
    config: ClassifierConfig,
}

impl IssueClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Signals that fire for an issue, in insight order.
    pub fn signals(&self, issue: &Issue, now: DateTime<Utc>) -> Vec<Signal> {
        if issue.updated_at.is_none() {
            tracing::warn!(
                issue_id = %issue.id,
                "Issue has no last-updated timestamp; treating as not stagnant and not active"
            );
        }

        [
            blocking_rule(issue, &self.config),
            stagnation_rule(issue, &self.config, now),
            activity_rule(issue, &self.config, now),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Classify one issue as of `now`.
    pub fn classify(&self, issue: &Issue, now: DateTime<Utc>) -> AnalysisResult {
        let signals = self.signals(issue, now);

        let mut result = AnalysisResult::default();
        for signal in &signals {
            match signal {
                Signal::Blocked(_) => result.is_blocked = true,
                Signal::Stagnant { .. } => result.is_stagnant = true,
                Signal::RecentlyActive { .. } => result.is_recently_active = true,
            }
            result.insights.push(signal.insight());
        }
        result
    }

    /// Classify a batch. The output is index-aligned with the input.
    pub fn classify_all(&self, issues: &[Issue], now: DateTime<Utc>) -> Vec<AnalysisResult> {
        issues.iter().map(|issue| self.classify(issue, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn in_progress_issue(now: DateTime<Utc>, idle: Duration) -> Issue {
        let mut issue = Issue::new("ISS-1", "Migrate billing exports");
        issue.state = "In Progress".to_string();
        issue.updated_at = Some(now - idle);
        issue.comments = vec!["Picked this up, working through the schema".to_string()];
        issue
    }

    #[test]
    fn test_four_day_idle_in_progress_is_stagnant() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();
        let issue = in_progress_issue(now, Duration::days(4));

        let result = classifier.classify(&issue, now);
        assert!(result.is_stagnant);
        assert!(!result.is_blocked);
        assert!(!result.is_recently_active);
        assert_eq!(
            result.insights,
            vec!["Stagnant: in progress with no updates for 4 days".to_string()]
        );
    }

    #[test]
    fn test_on_hold_label_suppresses_stagnation() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();
        let mut issue = in_progress_issue(now, Duration::days(4));
        issue.labels.push("On Hold".to_string());

        assert!(!classifier.classify(&issue, now).is_stagnant);
    }

    #[test]
    fn test_pause_keyword_in_comments_suppresses_stagnation() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();
        let mut issue = in_progress_issue(now, Duration::days(10));
        issue
            .comments
            .push("Paused until the vendor ships their fix".to_string());

        assert!(!classifier.classify(&issue, now).is_stagnant);

        issue.comments.pop();
        issue
            .comments
            .push("We are waiting for legal sign-off".to_string());
        assert!(!classifier.classify(&issue, now).is_stagnant);
    }

    #[test]
    fn test_stagnation_threshold_and_state() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();

        let exactly_three = in_progress_issue(now, Duration::days(3));
        assert!(classifier.classify(&exactly_three, now).is_stagnant);

        let almost_three = in_progress_issue(now, Duration::days(3) - Duration::minutes(1));
        assert!(!classifier.classify(&almost_three, now).is_stagnant);

        let mut done = in_progress_issue(now, Duration::days(30));
        done.state = "Done".to_string();
        assert!(!classifier.classify(&done, now).is_stagnant);

        let mut lowercase = in_progress_issue(now, Duration::days(30));
        lowercase.state = "in progress".to_string();
        assert!(classifier.classify(&lowercase, now).is_stagnant);
    }

    #[test]
    fn test_blocking_sources() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();
        let config = classifier.config();

        let mut linked = Issue::new("ISS-2", "Ship search v2");
        linked.blocked_by = vec!["ISS-9".into(), "  ".into(), "ISS-10".into()];
        assert_eq!(
            blocking_rule(&linked, config),
            Some(Signal::Blocked(BlockReason::Dependencies(2)))
        );

        let mut labeled = Issue::new("ISS-3", "Rotate keys");
        labeled.labels = vec!["blocked".into()];
        assert!(classifier.classify(&labeled, now).is_blocked);

        let mut described = Issue::new("ISS-4", "Upgrade runtime");
        described.description = Some("This is a blocker for the Q3 launch".into());
        assert_eq!(
            blocking_rule(&described, config),
            Some(Signal::Blocked(BlockReason::Keyword))
        );

        let mut clear = Issue::new("ISS-5", "Write docs");
        clear.blocked_by = vec!["".into(), " ".into()];
        assert!(!classifier.classify(&clear, now).is_blocked);
    }

    #[test]
    fn test_activity_window() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();

        let recent = in_progress_issue(now, Duration::hours(5));
        let result = classifier.classify(&recent, now);
        assert!(result.is_recently_active);
        assert_eq!(result.insights, vec!["Active: updated 5h ago".to_string()]);

        let day_old = in_progress_issue(now, Duration::hours(24));
        assert!(!classifier.classify(&day_old, now).is_recently_active);
    }

    #[test]
    fn test_insight_order_is_blocked_stagnant_active() {
        let now = Utc::now();
        let config = ClassifierConfig {
            active_hours: 24 * 7,
            ..ClassifierConfig::default()
        };
        let classifier = IssueClassifier::new(config);
        let mut issue = in_progress_issue(now, Duration::days(4));
        issue.labels.push("Blocked".into());

        let result = classifier.classify(&issue, now);
        assert!(result.is_blocked && result.is_stagnant && result.is_recently_active);
        assert!(result.insights[0].starts_with("Blocked"));
        assert!(result.insights[1].starts_with("Stagnant"));
        assert!(result.insights[2].starts_with("Active"));
    }

    #[test]
    fn test_huge_thresholds_do_not_panic() {
        let now = Utc::now();
        let config = ClassifierConfig {
            stagnation_days: i64::MAX / 2,
            active_hours: i64::MAX / 2,
            ..ClassifierConfig::default()
        };
        let classifier = IssueClassifier::new(config);
        let issues = vec![
            in_progress_issue(now, Duration::days(400)),
            in_progress_issue(now, Duration::hours(1)),
        ];

        let results = classifier.classify_all(&issues, now);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_stagnant));
        assert!(results.iter().all(|r| r.is_recently_active));
    }

    #[traced_test]
    #[test]
    fn test_missing_updated_at_degrades_and_warns() {
        let now = Utc::now();
        let classifier = IssueClassifier::default();
        let mut issue = Issue::new("ISS-6", "Legacy import");
        issue.state = "In Progress".into();

        let result = classifier.classify(&issue, now);
        assert!(!result.is_stagnant);
        assert!(!result.is_recently_active);
        assert!(logs_contain("no last-updated timestamp"));
    }
}
