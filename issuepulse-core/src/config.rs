//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/issuepulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/issuepulse/` (~/.config/issuepulse/)
//! - Data: `$XDG_DATA_HOME/issuepulse/` (~/.local/share/issuepulse/)
//! - State/Logs: `$XDG_STATE_HOME/issuepulse/` (~/.local/state/issuepulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Longest time window any threshold may span (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Issue classification rules
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Base score weights
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Shortlist size and personalization
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Engagement tracking and maintenance jobs
    #[serde(default)]
    pub engagement: EngagementConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds and vocabularies used by the issue classifier
#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Days without an update before an in-progress issue counts as stagnant
    #[serde(default = "default_stagnation_days")]
    pub stagnation_days: i64,

    /// Hours since the last update within which an issue counts as active
    #[serde(default = "default_active_hours")]
    pub active_hours: i64,

    /// State name that marks an issue as in progress
    #[serde(default = "default_in_progress_state")]
    pub in_progress_state: String,

    /// Labels that mark an issue as intentionally on hold
    #[serde(default = "default_hold_labels")]
    pub hold_labels: Vec<String>,

    /// Comment phrases that suppress stagnation
    #[serde(default = "default_pause_keywords")]
    pub pause_keywords: Vec<String>,

    /// Label that marks an issue as blocked
    #[serde(default = "default_blocked_label")]
    pub blocked_label: String,

    /// Title/description words that mark an issue as blocked
    #[serde(default = "default_blocker_keywords")]
    pub blocker_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            stagnation_days: default_stagnation_days(),
            active_hours: default_active_hours(),
            in_progress_state: default_in_progress_state(),
            hold_labels: default_hold_labels(),
            pause_keywords: default_pause_keywords(),
            blocked_label: default_blocked_label(),
            blocker_keywords: default_blocker_keywords(),
        }
    }
}

fn default_stagnation_days() -> i64 {
    3
}

fn default_active_hours() -> i64 {
    24
}

fn default_in_progress_state() -> String {
    "In Progress".to_string()
}

fn default_hold_labels() -> Vec<String> {
    vec!["On Hold".to_string(), "Waiting".to_string()]
}

fn default_pause_keywords() -> Vec<String> {
    vec![
        "paused".to_string(),
        "blocked on external".to_string(),
        "waiting for".to_string(),
    ]
}

fn default_blocked_label() -> String {
    "Blocked".to_string()
}

fn default_blocker_keywords() -> Vec<String> {
    vec!["blocked".to_string(), "blocker".to_string()]
}

/// Additive weights for the base score.
///
/// Each term is independent so a single weight can be tuned without touching
/// the combination logic.
#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Points for P0, P1, P2, P3, P4; an issue without priority scores 0
    #[serde(default = "default_priority_points")]
    pub priority_points: [f64; 5],

    #[serde(default = "default_blocked_bonus")]
    pub blocked_bonus: f64,

    #[serde(default = "default_stagnant_bonus")]
    pub stagnant_bonus: f64,

    #[serde(default = "default_active_bonus")]
    pub active_bonus: f64,

    /// Points per full week since creation (uncapped)
    #[serde(default = "default_points_per_week")]
    pub points_per_week: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            priority_points: default_priority_points(),
            blocked_bonus: default_blocked_bonus(),
            stagnant_bonus: default_stagnant_bonus(),
            active_bonus: default_active_bonus(),
            points_per_week: default_points_per_week(),
        }
    }
}

fn default_priority_points() -> [f64; 5] {
    [10.0, 8.0, 5.0, 3.0, 1.0]
}

fn default_blocked_bonus() -> f64 {
    10.0
}

fn default_stagnant_bonus() -> f64 {
    5.0
}

fn default_active_bonus() -> f64 {
    3.0
}

fn default_points_per_week() -> f64 {
    1.0
}

/// Shortlist configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    /// Shortlist size requested by callers (product policy: 3..=10)
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// Multiplier applied to the [0, 1] engagement score
    #[serde(default = "default_engagement_weight")]
    pub engagement_weight: f64,

    /// Blend per-user engagement into the ranking
    #[serde(default = "default_personalization")]
    pub personalization: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            engagement_weight: default_engagement_weight(),
            personalization: default_personalization(),
        }
    }
}

fn default_max_count() -> usize {
    5
}

fn default_engagement_weight() -> f64 {
    5.0
}

fn default_personalization() -> bool {
    true
}

/// Engagement tracking and maintenance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EngagementConfig {
    /// Source system recorded on new engagement rows
    #[serde(default = "default_source_system")]
    pub source_system: String,

    /// Rows idle at least this long are decayed by the periodic job
    #[serde(default = "default_decay_threshold_days")]
    pub decay_threshold_days: i64,

    /// Fraction removed from the score on each decay run
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Near-zero rows idle longer than this are deleted
    #[serde(default = "default_cleanup_age_days")]
    pub cleanup_age_days: i64,

    /// Scores below this count as zero for cleanup
    #[serde(default = "default_zero_epsilon")]
    pub zero_epsilon: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            source_system: default_source_system(),
            decay_threshold_days: default_decay_threshold_days(),
            decay_factor: default_decay_factor(),
            cleanup_age_days: default_cleanup_age_days(),
            zero_epsilon: default_zero_epsilon(),
        }
    }
}

fn default_source_system() -> String {
    "jira".to_string()
}

fn default_decay_threshold_days() -> i64 {
    14
}

fn default_decay_factor() -> f64 {
    0.1
}

fn default_cleanup_age_days() -> i64 {
    90
}

fn default_zero_epsilon() -> f64 {
    0.01
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints, returning the first violation
    pub fn validate(&self) -> Result<()> {
        if self.ranking.max_count == 0 {
            return Err(Error::Config(
                "ranking.max_count must be at least 1".to_string(),
            ));
        }
        if !(self.ranking.engagement_weight >= 0.0) {
            return Err(Error::Config(
                "ranking.engagement_weight must be non-negative".to_string(),
            ));
        }
        // A fully engaged issue must never outweigh a blocked one.
        if self.ranking.engagement_weight >= self.scoring.blocked_bonus {
            return Err(Error::Config(format!(
                "ranking.engagement_weight ({}) must be below scoring.blocked_bonus ({})",
                self.ranking.engagement_weight, self.scoring.blocked_bonus
            )));
        }
        if !(0.0..=1.0).contains(&self.engagement.decay_factor) {
            return Err(Error::Config(
                "engagement.decay_factor must be between 0 and 1".to_string(),
            ));
        }
        if self.engagement.decay_threshold_days < 0 || self.engagement.cleanup_age_days < 0 {
            return Err(Error::Config(
                "engagement day thresholds must be non-negative".to_string(),
            ));
        }
        if !(self.engagement.zero_epsilon >= 0.0) {
            return Err(Error::Config(
                "engagement.zero_epsilon must be non-negative".to_string(),
            ));
        }
        if self.classifier.stagnation_days < 0 || self.classifier.active_hours < 0 {
            return Err(Error::Config(
                "classifier thresholds must be non-negative".to_string(),
            ));
        }
        let windows = [
            ("classifier.stagnation_days", self.classifier.stagnation_days),
            ("classifier.active_hours", self.classifier.active_hours / 24),
            ("engagement.decay_threshold_days", self.engagement.decay_threshold_days),
            ("engagement.cleanup_age_days", self.engagement.cleanup_age_days),
        ];
        for (name, days) in windows {
            if days > MAX_WINDOW_DAYS {
                return Err(Error::Config(format!(
                    "{} exceeds the {}-day maximum",
                    name, MAX_WINDOW_DAYS
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/issuepulse/config.toml` (~/.config/issuepulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("issuepulse").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/issuepulse/` (~/.local/share/issuepulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("issuepulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/issuepulse/` (~/.local/state/issuepulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("issuepulse")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/issuepulse/engagement.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("engagement.db")
    }

    /// Returns the log directory
    ///
    /// Daily files are named `issuepulse.YYYY-MM-DD.log` inside it.
    pub fn log_dir() -> PathBuf {
        Self::state_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.classifier.stagnation_days, 3);
        assert_eq!(config.classifier.active_hours, 24);
        assert_eq!(config.scoring.priority_points, [10.0, 8.0, 5.0, 3.0, 1.0]);
        assert_eq!(config.ranking.max_count, 5);
        assert_eq!(config.engagement.cleanup_age_days, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[classifier]
stagnation_days = 5
hold_labels = ["Parked"]

[scoring]
blocked_bonus = 12.0

[ranking]
max_count = 8
personalization = false

[engagement]
decay_factor = 0.25

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.classifier.stagnation_days, 5);
        assert_eq!(config.classifier.hold_labels, vec!["Parked".to_string()]);
        assert_eq!(config.classifier.in_progress_state, "In Progress");
        assert_eq!(config.scoring.blocked_bonus, 12.0);
        assert_eq!(config.scoring.stagnant_bonus, 5.0);
        assert_eq!(config.ranking.max_count, 8);
        assert!(!config.ranking.personalization);
        assert_eq!(config.engagement.decay_factor, 0.25);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_dominant_engagement_weight() {
        let mut config = Config::default();
        config.ranking.engagement_weight = 10.0;
        assert!(config.validate().is_err());

        config.ranking.engagement_weight = 9.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.ranking.max_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engagement.decay_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engagement.zero_epsilon = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_time_windows() {
        let mut config = Config::default();
        config.classifier.stagnation_days = i64::MAX / 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classifier.active_hours = (MAX_WINDOW_DAYS + 1) * 24;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engagement.decay_threshold_days = 1_000_000_000_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engagement.cleanup_age_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
        config.engagement.cleanup_age_days = MAX_WINDOW_DAYS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ranking]\nengagement_weight = 20.0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        std::fs::write(&path, "[ranking]\nmax_count = 3\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ranking.max_count, 3);
    }
}
