//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ponder - Make decisions deliberately, learn from how they turn out
#[derive(Parser)]
#[command(name = "ponder")]
#[command(about = "Self-hosted decision journal with outcome insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "ponder.db", global = true)]
    pub db: PathBuf,

    /// Engine config file (defaults to the data-dir override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set PONDER_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, size, counts)
    Status,

    /// Manage decisions
    Decision {
        #[command(subcommand)]
        action: DecisionAction,
    },

    /// Manage the factors (weighted criteria) of a decision
    Factor {
        #[command(subcommand)]
        action: FactorAction,
    },

    /// Manage the options of a decision
    #[command(name = "option")]
    DecisionOption {
        #[command(subcommand)]
        action: OptionAction,
    },

    /// Rate an option against a factor (1-5)
    Score {
        /// Option ID
        option_id: i64,

        /// Factor ID
        factor_id: i64,

        /// Score from 1 (poor) to 5 (excellent)
        score: u8,

        /// How sure you are about this score (0-1)
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Rank the options of a decision
    Recommend {
        /// Decision ID
        decision_id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how each factor contributes to an option's utility
    Breakdown {
        /// Option ID
        option_id: i64,
    },

    /// Log how a decision turned out
    Outcome {
        /// Decision ID
        decision_id: i64,

        /// Satisfaction from 0 to 10
        #[arg(short, long)]
        satisfaction: f64,

        /// Surprise from -3 (much worse than expected) to 3 (much better)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        surprise: i8,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Review insights (default: list unread)
    Insights {
        #[command(subcommand)]
        action: Option<InsightsAction>,
    },

    /// Show streaks, badges and the next milestone
    Progress {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum DecisionAction {
    /// Start a new decision
    New {
        /// What you are deciding
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List decisions
    List {
        /// Filter by status: active, completed, archived
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a decision with its factors, options and scores
    Show {
        /// Decision ID
        id: i64,
    },

    /// Commit to an option
    Complete {
        /// Decision ID
        id: i64,

        /// Chosen option ID
        #[arg(short, long)]
        option: i64,
    },

    /// Archive a decision
    Archive {
        /// Decision ID
        id: i64,
    },

    /// Move an archived or completed decision back to active
    Reactivate {
        /// Decision ID
        id: i64,
    },

    /// Delete a decision (its outcome history is kept)
    Delete {
        /// Decision ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum FactorAction {
    /// Add a factor to a decision
    Add {
        /// Decision ID
        decision_id: i64,

        /// Factor name (e.g., "Cost", "Commute")
        name: String,

        /// Relative weight (0-1); a decision's weights must sum to 1
        #[arg(short, long)]
        weight: f64,

        /// Preference direction: higher, lower, neutral
        #[arg(long, default_value = "higher")]
        direction: String,
    },
}

#[derive(Subcommand)]
pub enum OptionAction {
    /// Add an option to a decision
    Add {
        /// Decision ID
        decision_id: i64,

        /// Option name
        name: String,

        /// Expected satisfaction if chosen (0-10)
        #[arg(short, long)]
        predicted: Option<f64>,
    },

    /// Set or change the expected satisfaction of an option
    Predict {
        /// Option ID
        option_id: i64,

        /// Expected satisfaction (0-10)
        satisfaction: f64,
    },
}

#[derive(Subcommand)]
pub enum InsightsAction {
    /// List insights
    List {
        /// Include read and dismissed insights
        #[arg(long)]
        all: bool,
    },

    /// Mark an insight as read
    Read {
        /// Insight ID
        id: i64,
    },

    /// Dismiss an insight
    Dismiss {
        /// Insight ID
        id: i64,
    },

    /// Show insights about one decision
    Decision {
        /// Decision ID
        decision_id: i64,
    },
}
