//! Ponder Core Library
//!
//! Shared functionality for the Ponder decision journal:
//! - Database access and migrations
//! - Weighted multi-attribute scoring of decision options
//! - Insight engines that learn from logged outcomes
//! - Streaks, badges and milestones

pub mod config;
pub mod db;
pub mod error;
pub mod gamification;
pub mod insights;
pub mod models;
pub mod utility;
pub mod workflow;

pub use config::EngineConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use gamification::{
    GamificationStatus, GamificationTracker, Milestone, MilestoneKind, OutcomeLogProgress,
};
pub use insights::{Insight, InsightOrchestrator, InsightType, NewInsight};
pub use utility::{FactorContribution, RankedOption, Recommendation, UtilityEngine};
pub use workflow::{log_outcome, OutcomeLogReport};
