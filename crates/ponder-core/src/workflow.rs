//! Outcome logging workflow
//!
//! Storing an outcome is the only step that can fail the call. Insight
//! generation and progress tracking run afterwards as independent side
//! effects: neither can block or undo the other.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::Result;
use crate::gamification::{GamificationTracker, OutcomeLogProgress};
use crate::insights::{Insight, InsightOrchestrator};
use crate::models::{NewOutcome, Outcome};

/// Everything that happened as a result of logging an outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeLogReport {
    pub outcome: Outcome,
    pub insights: Vec<Insight>,
    /// None if progress tracking failed
    pub progress: Option<OutcomeLogProgress>,
}

/// Store an outcome, then generate insights and update progress
pub async fn log_outcome(
    db: &Database,
    config: &EngineConfig,
    new: NewOutcome,
) -> Result<OutcomeLogReport> {
    let outcome = db.create_outcome(&new)?;

    let insights = InsightOrchestrator::new(db.clone(), config)
        .generate_insights_after_outcome_log(&outcome)
        .await;

    let progress = match GamificationTracker::new(db).record_outcome_log() {
        Ok(progress) => Some(progress),
        Err(e) => {
            warn!(
                decision_id = outcome.decision_id,
                error = %e,
                "Failed to record outcome progress"
            );
            None
        }
    };

    info!(
        decision_id = outcome.decision_id,
        insights = insights.len(),
        "Outcome logged"
    );

    Ok(OutcomeLogReport {
        outcome,
        insights,
        progress,
    })
}

/// Create a decision and count it towards progress
pub fn create_decision(db: &Database, title: &str, description: Option<&str>) -> Result<i64> {
    let id = db.create_decision(title, description)?;

    if let Err(e) = GamificationTracker::new(db).record_decision() {
        warn!(decision_id = id, error = %e, "Failed to record decision progress");
    }

    Ok(id)
}
