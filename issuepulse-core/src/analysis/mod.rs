//! Issue analysis for issuepulse
//!
//! Turns a batch of issues into a ranked shortlist:
//! - [`classifier`]: stagnation, blocking and activity signals
//! - [`scoring`]: additive base score with a per-term breakdown
//! - [`ranker`]: engagement blending, deterministic ordering, truncation
//!
//! Classification and scoring are pure. Neither touches storage nor the clock;
//! the evaluation time is always passed in.

pub mod classifier;
pub mod ranker;
pub mod scoring;

pub use classifier::{AnalysisResult, BlockReason, IssueClassifier, Signal};
pub use ranker::{IssueRanker, Personalization, RankedIssue};
pub use scoring::{PriorityScorer, ScoreBreakdown};
