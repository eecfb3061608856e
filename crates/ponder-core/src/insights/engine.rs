//! Analysis engine trait shared by the insight generators

use crate::db::Database;
use crate::Result;

use super::types::{Insight, NewInsight};

/// Which analysis an engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Correlation,
    Bias,
    Accuracy,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Correlation => "correlation",
            EngineKind::Bias => "bias",
            EngineKind::Accuracy => "accuracy",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An insight generator. Engines are synchronous; the orchestrator runs
/// each one on its own blocking task.
pub trait AnalysisEngine: Send + Sync {
    /// Identifier used in logs
    fn kind(&self) -> EngineKind;

    /// Store the engine reads from and writes to
    fn database(&self) -> &Database;

    /// Analyze history and produce insights (not yet persisted)
    fn analyze(&self) -> Result<Vec<NewInsight>>;

    /// Analyze and persist in one transaction
    fn run(&self) -> Result<Vec<Insight>> {
        let insights = self.analyze()?;
        let stored = self.database().insert_insights(&insights)?;
        tracing::debug!(
            engine = self.kind().as_str(),
            count = stored.len(),
            "Engine analysis complete"
        );
        Ok(stored)
    }
}
