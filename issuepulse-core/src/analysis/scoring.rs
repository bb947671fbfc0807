//! Base priority score.
//!
//! The base score is a plain additive sum. Every term is kept separately in a
//! [`ScoreBreakdown`] so a rank position can be explained term by term.

use super::classifier::AnalysisResult;
use crate::config::ScoringConfig;
use crate::types::{Issue, Priority};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-term contributions to an issue's base score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub priority: Option<Priority>,
    pub priority_points: f64,
    pub blocked: f64,
    pub stagnant: f64,
    pub active: f64,
    /// Full weeks since creation; 0 when the creation time is unknown
    pub age_weeks: i64,
    pub age: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.priority_points + self.blocked + self.stagnant + self.active + self.age
    }

    /// Compact "why was this ranked here" line, listing only non-zero terms.
    pub fn explain(&self) -> String {
        let mut parts = Vec::new();
        if let Some(priority) = self.priority {
            parts.push(format!("{} +{}", priority, self.priority_points));
        }
        if self.blocked > 0.0 {
            parts.push(format!("blocked +{}", self.blocked));
        }
        if self.stagnant > 0.0 {
            parts.push(format!("stagnant +{}", self.stagnant));
        }
        if self.active > 0.0 {
            parts.push(format!("active +{}", self.active));
        }
        if self.age > 0.0 {
            parts.push(format!("age {}w +{}", self.age_weeks, self.age));
        }

        if parts.is_empty() {
            "no signals".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Converts classifier output and static issue attributes into a base score.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    config: ScoringConfig,
}

impl PriorityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn breakdown(
        &self,
        issue: &Issue,
        analysis: &AnalysisResult,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let priority = issue.priority();
        let priority_points = priority
            .map(|p| self.config.priority_points[p.index()])
            .unwrap_or(0.0);

        // Creation times in the future count as brand new.
        let age_weeks = issue
            .created_at
            .map(|created| now.signed_duration_since(created).num_weeks().max(0))
            .unwrap_or(0);

        ScoreBreakdown {
            priority,
            priority_points,
            blocked: bonus(analysis.is_blocked, self.config.blocked_bonus),
            stagnant: bonus(analysis.is_stagnant, self.config.stagnant_bonus),
            active: bonus(analysis.is_recently_active, self.config.active_bonus),
            age_weeks,
            age: age_weeks as f64 * self.config.points_per_week,
        }
    }

    pub fn score(&self, issue: &Issue, analysis: &AnalysisResult, now: DateTime<Utc>) -> f64 {
        self.breakdown(issue, analysis, now).total()
    }
}

fn bonus(flag: bool, points: f64) -> f64 {
    if flag {
        points
    } else {
        0.0
    }
}
