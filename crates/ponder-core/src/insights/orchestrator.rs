//! Insight Orchestrator - runs the engines after an outcome is logged
//!
//! Each engine runs on its own blocking task against its own pooled
//! connection. A failing or panicking engine contributes nothing and is
//! logged; the others are unaffected and the caller never sees an error.
//!
//! ```rust,ignore
//! let orchestrator = InsightOrchestrator::new(db.clone(), &config);
//! let insights = orchestrator.generate_insights_after_outcome_log(&outcome).await;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::db::Database;
use crate::models::Outcome;
use crate::Result;

use super::accuracy::AccuracyEngine;
use super::bias::BiasEngine;
use super::correlation::CorrelationEngine;
use super::engine::AnalysisEngine;
use super::types::{AchievementData, Insight, InsightMetadata, NewInsight, SuggestionData};

/// Outcomes needed before the engines have enough to work with
const PATTERN_THRESHOLD: i64 = 5;

pub struct InsightOrchestrator {
    db: Database,
    engines: Vec<Arc<dyn AnalysisEngine>>,
    budget: Duration,
}

impl InsightOrchestrator {
    /// Orchestrator over the built-in engines, in merge order
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        let engines: Vec<Arc<dyn AnalysisEngine>> = vec![
            Arc::new(CorrelationEngine::new(db.clone(), config)),
            Arc::new(BiasEngine::new(db.clone(), config)),
            Arc::new(AccuracyEngine::new(db.clone(), config)),
        ];
        Self::with_engines(db, engines, config.orchestration_budget)
    }

    /// Orchestrator over an explicit engine list
    pub fn with_engines(
        db: Database,
        engines: Vec<Arc<dyn AnalysisEngine>>,
        budget: Duration,
    ) -> Self {
        Self {
            db,
            engines,
            budget,
        }
    }

    /// Run every engine for a freshly logged outcome.
    ///
    /// Never fails: engine errors are logged and skipped, and when nothing
    /// comes back a single progress insight is stored instead.
    pub async fn generate_insights_after_outcome_log(&self, outcome: &Outcome) -> Vec<Insight> {
        let started = Instant::now();

        let handles: Vec<_> = self
            .engines
            .iter()
            .map(|engine| {
                let kind = engine.kind();
                let engine = Arc::clone(engine);
                (kind, tokio::task::spawn_blocking(move || engine.run()))
            })
            .collect();

        let mut merged = Vec::new();
        for (kind, handle) in handles {
            match handle.await {
                Ok(Ok(insights)) => merged.extend(insights),
                Ok(Err(e)) => {
                    warn!(engine = kind.as_str(), error = %e, "Insight engine failed");
                }
                Err(e) => {
                    warn!(engine = kind.as_str(), error = %e, "Insight engine panicked");
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "Insight generation exceeded its time budget"
            );
        }

        if !merged.is_empty() {
            debug!(
                decision_id = outcome.decision_id,
                count = merged.len(),
                "Insights generated"
            );
            return merged;
        }

        match self.progress_insight(outcome) {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    decision_id = outcome.decision_id,
                    error = %e,
                    "Failed to store progress insight"
                );
                vec![]
            }
        }
    }

    /// Fallback shown when no engine had anything to say
    fn progress_insight(&self, outcome: &Outcome) -> Result<Vec<Insight>> {
        let total = self.db.count_outcomes()?;
        let insight = progress_for(total).with_decision(outcome.decision_id);
        self.db.insert_insights(&[insight])
    }

    pub fn unread_insights(&self) -> Result<Vec<Insight>> {
        self.db.list_unread_insights()
    }

    /// Returns true if the insight was unread until now
    pub fn mark_insight_as_read(&self, id: i64) -> Result<bool> {
        self.db.mark_insight_read(id)
    }

    pub fn dismiss_insight(&self, id: i64) -> Result<()> {
        self.db.dismiss_insight(id)
    }

    pub fn insights_for_decision(&self, decision_id: i64) -> Result<Vec<Insight>> {
        self.db.list_insights_for_decision(decision_id)
    }
}

fn progress_for(total_outcomes: i64) -> NewInsight {
    let count = total_outcomes.max(0) as u32;

    if total_outcomes <= 1 {
        NewInsight::new(
            "First outcome logged",
            "You logged your first outcome. Keep logging how decisions turn out; \
             after 5 outcomes Ponder starts spotting patterns in your choices.",
            2,
            InsightMetadata::Achievement(AchievementData {
                milestone: "first_outcome".to_string(),
                value: 1.0,
            }),
        )
    } else if total_outcomes < PATTERN_THRESHOLD {
        let remaining = PATTERN_THRESHOLD - total_outcomes;
        NewInsight::new(
            "Keep logging outcomes",
            format!(
                "{} outcomes logged. {} more until pattern analysis starts.",
                total_outcomes, remaining
            ),
            4,
            InsightMetadata::Suggestion(SuggestionData {
                action: "log_more_outcomes".to_string(),
                total_outcomes: count,
            }),
        )
    } else if total_outcomes == PATTERN_THRESHOLD {
        NewInsight::new(
            "5 outcomes logged",
            "You have logged 5 outcomes. Pattern analysis is now active, so \
             insights about your decision habits will start to appear.",
            2,
            InsightMetadata::Achievement(AchievementData {
                milestone: "fifth_outcome".to_string(),
                value: 5.0,
            }),
        )
    } else {
        NewInsight::new(
            "Keep it up",
            format!(
                "No new patterns this time. Every outcome you log ({} so far) \
                 sharpens the picture.",
                total_outcomes
            ),
            5,
            InsightMetadata::Suggestion(SuggestionData {
                action: "keep_logging".to_string(),
                total_outcomes: count,
            }),
        )
    }
}
