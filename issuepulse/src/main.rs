//! issuepulse - issue triage shortlist with per-user engagement ranking
//!
//! Commands:
//! - `rank`: classify, score and rank an issue export into a shortlist
//! - `track`: record one interaction between a user and an issue
//! - `decay`, `cleanup`, `maintain`: periodic engagement maintenance jobs
//! - `top`, `stats`, `forget`: inspect and administer engagement rows
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/issuepulse/engagement.db (~/.local/share/issuepulse/engagement.db)
//! - Config: $XDG_CONFIG_HOME/issuepulse/config.toml (~/.config/issuepulse/config.toml)
//! - Logs: $XDG_STATE_HOME/issuepulse/ (~/.local/state/issuepulse/)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use issuepulse_core::format::{format_relative_time, format_relative_time_opt};
use issuepulse_core::{
    source, Config, Database, EngagementTracker, IssueRanker, Personalization, RankedIssue,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "issuepulse")]
#[command(about = "Rank issues into a daily shortlist and track per-user engagement")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/issuepulse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Engagement database (default: $XDG_DATA_HOME/issuepulse/engagement.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Rank an issue export (JSON array) into a shortlist
    Rank {
        /// Path to the issue export
        #[arg(short, long)]
        issues: PathBuf,

        /// Personalize for this user
        #[arg(short, long)]
        user: Option<String>,

        /// Shortlist size (default: from config)
        #[arg(short = 'n', long)]
        max_count: Option<usize>,

        /// Ignore engagement even when a user is given
        #[arg(long)]
        no_personalize: bool,

        /// Record a "view" for every shortlisted issue
        #[arg(long, requires = "user")]
        record_views: bool,
    },

    /// Record an interaction (query, view or mention)
    Track {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        issue: String,

        /// Interaction type: query, view or mention
        #[arg(short = 't', long = "type", default_value = "view")]
        interaction_type: String,

        /// Free-text context, truncated to 200 characters
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Decay engagement rows that have been idle for a while
    Decay {
        /// Idle threshold in days (default: from config)
        #[arg(long)]
        days: Option<i64>,

        /// Fraction removed per run (default: from config)
        #[arg(long)]
        factor: Option<f64>,
    },

    /// Delete near-zero engagement rows older than the retention window
    Cleanup {
        /// Retention window in days (default: from config)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Run decay then cleanup with configured defaults
    Maintain,

    /// Show a user's most engaged issues
    Top {
        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show engagement table statistics
    Stats,

    /// Delete engagement rows for a user (optionally a single issue)
    Forget {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        issue: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard =
        issuepulse_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = args.db.clone().unwrap_or_else(Config::database_path);
    tracing::debug!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let format = args.format;
    match args.command {
        Command::Rank {
            issues,
            user,
            max_count,
            no_personalize,
            record_views,
        } => cmd_rank(
            &config,
            &db,
            format,
            &issues,
            user.as_deref(),
            max_count,
            no_personalize,
            record_views,
        ),
        Command::Track {
            user,
            issue,
            interaction_type,
            context,
        } => cmd_track(
            &config,
            &db,
            format,
            &user,
            &issue,
            &interaction_type,
            context.as_deref(),
        ),
        Command::Decay { days, factor } => cmd_decay(&config, &db, format, days, factor),
        Command::Cleanup { days } => cmd_cleanup(&config, &db, format, days),
        Command::Maintain => cmd_maintain(&config, &db, format),
        Command::Top { user, limit } => cmd_top(&config, &db, format, &user, limit),
        Command::Stats => cmd_stats(&db, format),
        Command::Forget { user, issue } => cmd_forget(&db, format, &user, issue.as_deref()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_rank(
    config: &Config,
    db: &Database,
    format: OutputFormat,
    issues_path: &Path,
    user: Option<&str>,
    max_count: Option<usize>,
    no_personalize: bool,
    record_views: bool,
) -> Result<()> {
    let issues = source::load_issues(issues_path)
        .with_context(|| format!("failed to load issues from {}", issues_path.display()))?;

    let ranker = IssueRanker::from_config(config);
    let max_count = max_count.unwrap_or(config.ranking.max_count);
    let now = Utc::now();

    let personalization = user
        .filter(|_| config.ranking.personalization && !no_personalize)
        .map(|user_id| Personalization::new(user_id, db));

    let ranked = ranker
        .shortlist(&issues, now, personalization.as_ref(), max_count)
        .context("failed to rank issues")?;

    tracing::info!(
        candidates = issues.len(),
        shortlisted = ranked.len(),
        personalized = personalization.is_some(),
        "Shortlist produced"
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ranked)?),
        OutputFormat::Text => print_shortlist(&ranked, issues.len(), now),
    }

    if record_views {
        if let Some(user_id) = user {
            let tracker = EngagementTracker::new(db, config.engagement.clone());
            for entry in &ranked {
                tracker.track(user_id, &entry.issue.id, "view", Some("shown in shortlist"));
            }
        }
    }

    Ok(())
}

fn print_shortlist(ranked: &[RankedIssue<'_>], total: usize, now: chrono::DateTime<Utc>) {
    if ranked.is_empty() {
        println!("No issues to rank.");
        return;
    }

    println!("Top {} of {} issue(s)", ranked.len(), total);
    println!();

    for (position, entry) in ranked.iter().enumerate() {
        println!(
            "{:>2}. {}  {}  [{:.1}]",
            position + 1,
            entry.issue.id,
            entry.issue.title,
            entry.final_score
        );

        let updated = format_relative_time_opt(entry.issue.updated_at, now);
        let mut why = entry.breakdown.explain();
        if let Some(score) = entry.engagement_score {
            why.push_str(&format!(", engagement {:.2}", score));
        }
        println!("    {} | updated {}", why, updated);

        for insight in &entry.analysis.insights {
            println!("    - {}", insight);
        }
    }
}

fn cmd_track(
    config: &Config,
    db: &Database,
    format: OutputFormat,
    user: &str,
    issue: &str,
    interaction_type: &str,
    context: Option<&str>,
) -> Result<()> {
    let tracker = EngagementTracker::new(db, config.engagement.clone());

    // Tracking never fails the caller; the error is logged and reported.
    match tracker.record_interaction(user, issue, interaction_type, context) {
        Ok(engagement) => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&engagement)?),
            OutputFormat::Text => println!(
                "Recorded {} for {} on {} (count {}, score {:.3})",
                engagement.interaction_type,
                engagement.user_id,
                engagement.issue_id,
                engagement.interaction_count,
                engagement.engagement_score
            ),
        },
        Err(e) => {
            tracing::warn!(user, issue, interaction_type, error = %e, "Interaction not recorded");
            eprintln!("Interaction not recorded: {}", e);
        }
    }

    Ok(())
}

fn cmd_decay(
    config: &Config,
    db: &Database,
    format: OutputFormat,
    days: Option<i64>,
    factor: Option<f64>,
) -> Result<()> {
    let tracker = EngagementTracker::new(db, config.engagement.clone());
    let days = days.unwrap_or(config.engagement.decay_threshold_days);
    let factor = factor.unwrap_or(config.engagement.decay_factor);

    let decayed = tracker
        .decay_old(days, factor)
        .context("failed to decay engagements")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "decayed": decayed })),
        OutputFormat::Text => println!(
            "Decayed {} engagement row(s) idle for {}+ days by {:.0}%",
            decayed,
            days,
            factor * 100.0
        ),
    }
    Ok(())
}

fn cmd_cleanup(
    config: &Config,
    db: &Database,
    format: OutputFormat,
    days: Option<i64>,
) -> Result<()> {
    let tracker = EngagementTracker::new(db, config.engagement.clone());
    let days = days.unwrap_or(config.engagement.cleanup_age_days);

    let deleted = tracker
        .cleanup_zero(days)
        .context("failed to clean up engagements")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": deleted })),
        OutputFormat::Text => println!(
            "Deleted {} near-zero engagement row(s) older than {} days",
            deleted, days
        ),
    }
    Ok(())
}

fn cmd_maintain(config: &Config, db: &Database, format: OutputFormat) -> Result<()> {
    let tracker = EngagementTracker::new(db, config.engagement.clone());
    let report = tracker
        .run_maintenance(Utc::now())
        .context("engagement maintenance failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Maintenance complete:");
            println!("  Decayed: {}", report.decayed);
            println!("  Deleted: {}", report.deleted);
        }
    }
    Ok(())
}

fn cmd_top(
    config: &Config,
    db: &Database,
    format: OutputFormat,
    user: &str,
    limit: usize,
) -> Result<()> {
    let tracker = EngagementTracker::new(db, config.engagement.clone());
    let rows = tracker
        .top_for_user(user, limit)
        .context("failed to load engagements")?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No engagement recorded for {}.", user);
        return Ok(());
    }

    let now = Utc::now();
    println!("{:<16} {:>6} {:>6}  {:<8} LAST", "ISSUE", "SCORE", "COUNT", "TYPE");
    for row in rows {
        println!(
            "{:<16} {:>6.3} {:>6}  {:<8} {}",
            row.issue_id,
            row.engagement_score,
            row.interaction_count,
            row.interaction_type,
            format_relative_time(row.last_interaction, now)
        );
    }
    Ok(())
}

fn cmd_stats(db: &Database, format: OutputFormat) -> Result<()> {
    let stats = db
        .engagement_stats()
        .context("failed to compute statistics")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Engagement Statistics");
            println!("=====================");
            println!("Rows:            {}", stats.total_rows);
            println!("Users:           {}", stats.distinct_users);
            println!("Issues:          {}", stats.distinct_issues);
            println!("Interactions:    {}", stats.total_interactions);
            println!("Average score:   {:.3}", stats.average_score);
            for (interaction_type, count) in &stats.by_type {
                println!("  {:<14} {}", interaction_type, count);
            }
        }
    }
    Ok(())
}

fn cmd_forget(db: &Database, format: OutputFormat, user: &str, issue: Option<&str>) -> Result<()> {
    let deleted = match issue {
        Some(issue) => usize::from(db.delete_engagement(user, issue)?),
        None => db.delete_user_engagements(user)?,
    };

    tracing::info!(user, issue, deleted, "Forgot engagement rows");

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": deleted })),
        OutputFormat::Text => println!("Deleted {} engagement row(s) for {}", deleted, user),
    }
    Ok(())
}
