//! Insight Engine - learning from logged outcomes
//!
//! After every logged outcome the orchestrator runs a fixed set of
//! analysis engines over recent history and stores what they find.
//!
//! ## Engines
//!
//! - **Correlation** - factors whose decisions turn out consistently well or badly
//! - **Bias** - optimism, pessimism, planning fallacy and recency bias
//! - **Accuracy** - how close predictions land, and whether that is improving
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ponder_core::insights::InsightOrchestrator;
//!
//! let orchestrator = InsightOrchestrator::new(db.clone(), &config);
//! let insights = orchestrator.generate_insights_after_outcome_log(&outcome).await;
//! ```

pub mod accuracy;
pub mod bias;
pub mod correlation;
pub mod engine;
pub mod orchestrator;
pub mod types;

pub use accuracy::AccuracyEngine;
pub use bias::BiasEngine;
pub use correlation::CorrelationEngine;
pub use engine::{AnalysisEngine, EngineKind};
pub use orchestrator::InsightOrchestrator;
pub use types::{
    AccuracyData, AccuracyTrend, AchievementData, BiasData, BiasKind, CorrelationData,
    CorrelationDirection, Insight, InsightMetadata, InsightType, NewInsight, PatternData,
    SuggestionData, PRIORITY_HIGHEST, PRIORITY_LOWEST,
};
