//! Bias Engine
//!
//! Compares predicted satisfaction for the chosen option against the
//! satisfaction actually logged, looking for three systematic errors:
//!
//! - **Optimism / pessimism**: mean prediction error significantly away
//!   from zero (one-sample t-test)
//! - **Planning fallacy**: outcomes routinely logged long after deciding
//! - **Recency bias**: predictions getting worse lately

use crate::config::EngineConfig;
use crate::db::Database;
use crate::models::PredictionPair;
use crate::Result;

use super::engine::{AnalysisEngine, EngineKind};
use super::types::{BiasData, BiasKind, InsightMetadata, NewInsight};

/// Prediction pairs needed before looking for any bias
pub const MIN_PAIRS: usize = 5;

const PLANNING_MIN_DELAYED: usize = 3;
const RECENCY_MIN_PAIRS: usize = 10;
const RECENCY_WINDOW: usize = 5;
const RECENCY_INCREASE: f64 = 0.3;

pub struct BiasEngine {
    db: Database,
    history_limit: usize,
    planning_delay_days: i64,
}

impl BiasEngine {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        Self {
            db,
            history_limit: config.history_limit,
            planning_delay_days: config.planning_delay_days,
        }
    }

    /// Run every detector over the recent prediction pairs
    pub fn detect_biases(&self) -> Result<Vec<NewInsight>> {
        let pairs = self.db.recent_prediction_pairs(self.history_limit)?;
        if pairs.len() < MIN_PAIRS {
            return Ok(vec![]);
        }

        Ok([
            prediction_bias(&pairs),
            planning_fallacy(&pairs, self.planning_delay_days),
            recency_bias(&pairs),
        ]
        .into_iter()
        .flatten()
        .map(bias_insight)
        .collect())
    }
}

impl AnalysisEngine for BiasEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Bias
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn analyze(&self) -> Result<Vec<NewInsight>> {
        self.detect_biases()
    }
}

/// Two-tailed 95% critical value of Student's t
fn critical_t(df: usize) -> f64 {
    match df {
        30.. => 1.96,
        20..=29 => 2.086,
        10..=19 => 2.228,
        5..=9 => 2.571,
        _ => 3.182,
    }
}

/// |t| at or beyond the critical value
fn is_significant(t: f64, df: usize) -> bool {
    t.abs() >= critical_t(df)
}

/// Optimism or pessimism from the signed prediction errors
pub fn prediction_bias(pairs: &[PredictionPair]) -> Option<BiasData> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let errors: Vec<f64> = pairs.iter().map(PredictionPair::error).collect();
    let mean = errors.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return None;
    }

    let sd = (errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();
    let significant = if sd == 0.0 {
        true
    } else {
        let t = mean / (sd / (n as f64).sqrt());
        is_significant(t, n - 1)
    };
    if !significant {
        return None;
    }

    Some(BiasData {
        bias: if mean > 0.0 {
            BiasKind::OptimismBias
        } else {
            BiasKind::PessimismBias
        },
        magnitude: (mean.abs() / 10.0).min(1.0),
        sample_size: n,
        evidence: mean,
        actionable: true,
    })
}

/// Outcomes logged more than `delay_days` after the decision
pub fn planning_fallacy(pairs: &[PredictionPair], delay_days: i64) -> Option<BiasData> {
    let delays: Vec<i64> = pairs
        .iter()
        .filter_map(|p| p.decided_at.map(|d| (p.logged_at - d).num_days()))
        .filter(|days| *days > delay_days)
        .collect();

    if delays.len() < PLANNING_MIN_DELAYED || delays.len() * 2 <= pairs.len() {
        return None;
    }

    let avg_delay = delays.iter().sum::<i64>() as f64 / delays.len() as f64;

    Some(BiasData {
        bias: BiasKind::PlanningFallacy,
        magnitude: (avg_delay / 30.0).min(1.0),
        sample_size: pairs.len(),
        evidence: avg_delay,
        actionable: true,
    })
}

/// Recent predictions noticeably worse than the ones before.
/// `pairs` must be newest first.
pub fn recency_bias(pairs: &[PredictionPair]) -> Option<BiasData> {
    if pairs.len() < RECENCY_MIN_PAIRS {
        return None;
    }

    let recent = mean_abs_error(&pairs[..RECENCY_WINDOW]);
    let older = mean_abs_error(&pairs[RECENCY_WINDOW..RECENCY_WINDOW * 2]);

    let increase = if older == 0.0 {
        if recent > 0.0 {
            1.0
        } else {
            return None;
        }
    } else {
        (recent - older) / older
    };

    if increase <= RECENCY_INCREASE {
        return None;
    }

    Some(BiasData {
        bias: BiasKind::RecencyBias,
        magnitude: increase.min(1.0),
        sample_size: RECENCY_WINDOW * 2,
        evidence: increase,
        actionable: true,
    })
}

fn mean_abs_error(pairs: &[PredictionPair]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs.iter().map(PredictionPair::abs_error).sum::<f64>() / pairs.len() as f64
}

/// Stronger biases come first
fn priority_for(magnitude: f64) -> u8 {
    if magnitude >= 0.7 {
        1
    } else if magnitude >= 0.5 {
        2
    } else if magnitude >= 0.3 {
        3
    } else {
        4
    }
}

fn bias_insight(data: BiasData) -> NewInsight {
    let (title, description) = match data.bias {
        BiasKind::OptimismBias => (
            "You tend to be optimistic".to_string(),
            format!(
                "Across {} decisions your predictions ran {:.1} points above how \
                 things actually turned out. Try shading your next prediction down.",
                data.sample_size, data.evidence
            ),
        ),
        BiasKind::PessimismBias => (
            "You tend to be pessimistic".to_string(),
            format!(
                "Across {} decisions things turned out {:.1} points better than you \
                 predicted. You can afford to expect a little more.",
                data.sample_size,
                data.evidence.abs()
            ),
        ),
        BiasKind::PlanningFallacy => (
            "Outcomes take longer than planned".to_string(),
            format!(
                "Most of your outcomes were logged long after deciding (about {:.0} days \
                 on average). Build extra time into your plans.",
                data.evidence
            ),
        ),
        BiasKind::RecencyBias => (
            "Recent predictions are less accurate".to_string(),
            format!(
                "Your last {} predictions missed by {:.0}% more than the {} before them. \
                 Recent events may be swaying your expectations.",
                RECENCY_WINDOW,
                data.evidence * 100.0,
                RECENCY_WINDOW
            ),
        ),
    };

    NewInsight::new(
        title,
        description,
        priority_for(data.magnitude),
        InsightMetadata::BiasDetection(data),
    )
}
