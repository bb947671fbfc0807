//! Shortlist ranking.
//!
//! Blends the base score with the per-user engagement score, sorts with a
//! fully deterministic tie-break, and truncates to the requested size.

use super::classifier::{AnalysisResult, IssueClassifier};
use super::scoring::{PriorityScorer, ScoreBreakdown};
use crate::config::Config;
use crate::engagement::EngagementLookup;
use crate::error::{Error, Result};
use crate::types::Issue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One entry of the ranked shortlist.
#[derive(Debug, Clone, Serialize)]
pub struct RankedIssue<'a> {
    pub issue: &'a Issue,
    pub analysis: AnalysisResult,
    pub breakdown: ScoreBreakdown,
    pub base_score: f64,
    /// `None` when personalization is off, nothing was recorded, or the lookup failed
    pub engagement_score: Option<f64>,
    pub final_score: f64,
}

/// Whose engagement to blend in, and where to read it from.
#[derive(Clone, Copy)]
pub struct Personalization<'a> {
    pub user_id: &'a str,
    pub lookup: &'a dyn EngagementLookup,
}

impl<'a> Personalization<'a> {
    pub fn new(user_id: &'a str, lookup: &'a dyn EngagementLookup) -> Self {
        Self { user_id, lookup }
    }
}

impl std::fmt::Debug for Personalization<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Personalization")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct IssueRanker {
    classifier: IssueClassifier,
    scorer: PriorityScorer,
    engagement_weight: f64,
}

impl Default for IssueRanker {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl IssueRanker {
    pub fn new(classifier: IssueClassifier, scorer: PriorityScorer, engagement_weight: f64) -> Self {
        Self {
            classifier,
            scorer,
            engagement_weight,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            IssueClassifier::new(config.classifier.clone()),
            PriorityScorer::new(config.scoring.clone()),
            config.ranking.engagement_weight,
        )
    }

    pub fn classifier(&self) -> &IssueClassifier {
        &self.classifier
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    pub fn engagement_weight(&self) -> f64 {
        self.engagement_weight
    }

    /// Classify, score and rank in one pass.
    pub fn shortlist<'a>(
        &self,
        issues: &'a [Issue],
        now: DateTime<Utc>,
        personalization: Option<&Personalization<'_>>,
        max_count: usize,
    ) -> Result<Vec<RankedIssue<'a>>> {
        let analyses = self.classifier.classify_all(issues, now);
        self.rank(issues, &analyses, personalization, max_count, now)
    }

    /// Rank pre-classified issues. `analyses` must be index-aligned with `issues`.
    ///
    /// Returns `min(max_count, issues.len())` entries ordered by final score
    /// descending. Ties go to blocked issues first, then to the issue that has
    /// waited longest since its last update, then to the smaller id.
    pub fn rank<'a>(
        &self,
        issues: &'a [Issue],
        analyses: &[AnalysisResult],
        personalization: Option<&Personalization<'_>>,
        max_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedIssue<'a>>> {
        if max_count == 0 {
            return Err(Error::Validation(
                "max_count must be a positive integer".to_string(),
            ));
        }
        if issues.len() != analyses.len() {
            return Err(Error::Validation(format!(
                "got {} issues but {} analyses",
                issues.len(),
                analyses.len()
            )));
        }
        if issues.is_empty() {
            return Ok(Vec::new());
        }

        let engagement = personalization
            .map(|p| fetch_engagement(p, issues))
            .unwrap_or_default();

        let mut ranked: Vec<RankedIssue<'a>> = issues
            .iter()
            .zip(analyses)
            .map(|(issue, analysis)| {
                let breakdown = self.scorer.breakdown(issue, analysis, now);
                let base_score = breakdown.total();
                let engagement_score = engagement.get(issue.id.as_str()).copied();
                let final_score =
                    base_score + engagement_score.unwrap_or(0.0) * self.engagement_weight;
                RankedIssue {
                    issue,
                    analysis: analysis.clone(),
                    breakdown,
                    base_score,
                    engagement_score,
                    final_score,
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked.truncate(max_count);

        tracing::debug!(
            candidates = issues.len(),
            returned = ranked.len(),
            personalized = personalization.is_some(),
            "Ranked issues"
        );
        Ok(ranked)
    }
}

/// Engagement scores for the candidate issues.
///
/// Lookup failures disable personalization for this pass instead of failing
/// the ranking. Values outside [0, 1] are ignored.
fn fetch_engagement(
    personalization: &Personalization<'_>,
    issues: &[Issue],
) -> HashMap<String, f64> {
    let ids: Vec<&str> = issues.iter().map(|i| i.id.as_str()).collect();

    let mut scores = match personalization
        .lookup
        .engagement_scores(personalization.user_id, &ids)
    {
        Ok(scores) => scores,
        Err(e) => {
            tracing::warn!(
                user_id = personalization.user_id,
                error = %e,
                "Engagement lookup failed, ranking without personalization"
            );
            return HashMap::new();
        }
    };

    scores.retain(|issue_id, score| {
        let valid = score.is_finite() && (0.0..=1.0).contains(score);
        if !valid {
            tracing::warn!(issue_id = %issue_id, score = *score, "Ignoring out-of-range engagement score");
        }
        valid
    });
    scores
}

fn compare_ranked(a: &RankedIssue<'_>, b: &RankedIssue<'_>) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| b.analysis.is_blocked.cmp(&a.analysis.is_blocked))
        .then_with(|| match (a.issue.updated_at, b.issue.updated_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.issue.id.cmp(&b.issue.id))
}
