//! Correlation Engine
//!
//! Looks for factors whose decisions turn out consistently well or
//! consistently badly.
//!
//! The "correlation" reported here is a consistency score, not Pearson's r:
//! `1 / (1 + σ)` of the satisfaction values seen alongside a factor, signed
//! by whether their mean sits above or below the scale midpoint. It is then
//! run through the usual t-statistic so weak samples are filtered out.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::Result;

use super::engine::{AnalysisEngine, EngineKind};
use super::types::{CorrelationData, CorrelationDirection, InsightMetadata, NewInsight};

/// Outcomes (and samples per factor) needed before correlating
pub const MIN_SAMPLES: usize = 5;

/// Minimum |r| worth reporting
const MIN_CORRELATION: f64 = 0.6;

/// Maximum p-value worth reporting
const MAX_P_VALUE: f64 = 0.05;

/// Satisfaction midpoint separating positive from negative
const SATISFACTION_MIDPOINT: f64 = 5.0;

pub struct CorrelationEngine {
    db: Database,
    history_limit: usize,
}

impl CorrelationEngine {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        Self {
            db,
            history_limit: config.history_limit,
        }
    }

    /// Correlation insights over the most recent outcomes
    pub fn discover_correlations(&self) -> Result<Vec<NewInsight>> {
        if (self.db.count_outcomes()? as usize) < MIN_SAMPLES {
            return Ok(vec![]);
        }

        let samples = self.db.recent_factor_satisfaction(self.history_limit)?;

        Ok(group_by_factor(samples)
            .into_iter()
            .filter_map(|(factor, values)| analyze_factor(&factor, &values))
            .map(correlation_insight)
            .collect())
    }
}

impl AnalysisEngine for CorrelationEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Correlation
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn analyze(&self) -> Result<Vec<NewInsight>> {
        self.discover_correlations()
    }
}

/// Group satisfaction values by factor name, keeping first-seen order
fn group_by_factor(samples: Vec<(String, f64)>) -> Vec<(String, Vec<f64>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    for (factor, satisfaction) in samples {
        match index.get(&factor) {
            Some(&i) => groups[i].1.push(satisfaction),
            None => {
                index.insert(factor.clone(), groups.len());
                groups.push((factor, vec![satisfaction]));
            }
        }
    }

    groups
}

/// Consistency-based correlation for one factor, if it is significant
fn analyze_factor(factor: &str, values: &[f64]) -> Option<CorrelationData> {
    let n = values.len();
    if n < MIN_SAMPLES {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let consistency = 1.0 / (1.0 + variance.sqrt());

    let correlation = if mean > SATISFACTION_MIDPOINT {
        consistency
    } else {
        -consistency
    };
    let p_value = p_value_for(t_statistic(correlation, n));

    if correlation.abs() > MIN_CORRELATION && p_value < MAX_P_VALUE {
        Some(CorrelationData {
            factor_name: factor.to_string(),
            correlation,
            p_value,
            sample_size: n,
            mean_satisfaction: mean,
            direction: if correlation > 0.0 {
                CorrelationDirection::Positive
            } else {
                CorrelationDirection::Negative
            },
        })
    } else {
        None
    }
}

/// t = |r| · √((n − 2) / (1 − r²)); infinite for a perfect correlation
fn t_statistic(r: f64, n: usize) -> f64 {
    let denominator = 1.0 - r * r;
    if denominator <= 0.0 {
        return f64::INFINITY;
    }
    r.abs() * ((n as f64 - 2.0) / denominator).sqrt()
}

/// Two-tailed p-value from a coarse critical-value table
fn p_value_for(t: f64) -> f64 {
    if t > 2.576 {
        0.01
    } else if t > 1.96 {
        0.05
    } else if t > 1.645 {
        0.10
    } else {
        0.20
    }
}

fn correlation_insight(data: CorrelationData) -> NewInsight {
    let priority = (data.correlation.abs() * 10.0).floor() as u8;

    let (title, description) = match data.direction {
        CorrelationDirection::Positive => (
            format!("'{}' decisions tend to work out", data.factor_name),
            format!(
                "Decisions where you weighed '{}' have turned out consistently well: \
                 average satisfaction {:.1}/10 over {} outcomes.",
                data.factor_name, data.mean_satisfaction, data.sample_size
            ),
        ),
        CorrelationDirection::Negative => (
            format!("'{}' decisions tend to disappoint", data.factor_name),
            format!(
                "Decisions where you weighed '{}' have consistently disappointed: \
                 average satisfaction {:.1}/10 over {} outcomes. \
                 Consider giving it a different weight next time.",
                data.factor_name, data.mean_satisfaction, data.sample_size
            ),
        ),
    };

    NewInsight::new(
        title,
        description,
        priority,
        InsightMetadata::Correlation(data),
    )
}
