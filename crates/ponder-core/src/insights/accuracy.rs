//! Accuracy Engine - how close predictions land to reality
//!
//! Besides producing insights, each run overwrites the accuracy snapshot
//! on the user statistics so badges and progress reporting can use it.

use crate::config::EngineConfig;
use crate::db::Database;
use crate::models::{AccuracySnapshot, PredictionPair};
use crate::Result;

use super::engine::{AnalysisEngine, EngineKind};
use super::types::{AccuracyData, AccuracyTrend, AchievementData, InsightMetadata, NewInsight};

/// Prediction pairs needed for an accuracy report
pub const MIN_PAIRS: usize = 3;

const TREND_MIN_PAIRS: usize = 6;
const TREND_WINDOW: usize = 3;
const TREND_THRESHOLD_PCT: f64 = 15.0;

const MILESTONE_ACCURACY_PCT: f64 = 70.0;
const MILESTONE_MIN_PAIRS: usize = 5;
const IMPROVEMENT_MIN_PAIRS: usize = 10;

pub struct AccuracyEngine {
    db: Database,
    history_limit: usize,
    correct_error_threshold: f64,
}

impl AccuracyEngine {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        Self {
            db,
            history_limit: config.history_limit,
            correct_error_threshold: config.correct_error_threshold,
        }
    }

    /// Report, milestone and trend insights; updates the stored snapshot
    pub fn generate_accuracy_insights(&self) -> Result<Vec<NewInsight>> {
        let pairs = self.db.recent_prediction_pairs(self.history_limit)?;
        let Some(data) = measure(&pairs, self.correct_error_threshold) else {
            return Ok(vec![]);
        };

        let snapshot = AccuracySnapshot {
            total: data.total as u32,
            correct: data.correct as u32,
            mean_error: data.mean_abs_error,
        };
        self.db.update_user_stats(|stats| stats.accuracy = snapshot)?;

        let mut insights = vec![report_insight(&data, self.correct_error_threshold)];

        if data.accuracy_pct >= MILESTONE_ACCURACY_PCT && data.total >= MILESTONE_MIN_PAIRS {
            insights.push(NewInsight::new(
                "Accurate predictor",
                format!(
                    "{:.0}% of your predictions landed within {} points of the real outcome.",
                    data.accuracy_pct, self.correct_error_threshold
                ),
                3,
                InsightMetadata::Achievement(AchievementData {
                    milestone: "accuracy_70".to_string(),
                    value: data.accuracy_pct,
                }),
            ));
        }

        if data.trend == Some(AccuracyTrend::Improving) && data.total >= IMPROVEMENT_MIN_PAIRS {
            insights.push(NewInsight::new(
                "Your predictions are improving",
                format!(
                    "Your latest predictions missed by {:.0}% less than the ones before. \
                     Reflecting on outcomes is paying off.",
                    data.improvement_pct.unwrap_or_default()
                ),
                3,
                InsightMetadata::AccuracyTracking(data),
            ));
        }

        Ok(insights)
    }
}

impl AnalysisEngine for AccuracyEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Accuracy
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn analyze(&self) -> Result<Vec<NewInsight>> {
        self.generate_accuracy_insights()
    }
}

/// Accuracy statistics over newest-first pairs; None below the minimum
pub fn measure(pairs: &[PredictionPair], correct_threshold: f64) -> Option<AccuracyData> {
    if pairs.len() < MIN_PAIRS {
        return None;
    }

    let errors: Vec<f64> = pairs.iter().map(PredictionPair::abs_error).collect();
    let total = errors.len();
    let correct = errors.iter().filter(|e| **e <= correct_threshold).count();
    let (trend, improvement_pct) = match trend(&errors) {
        Some((trend, pct)) => (Some(trend), pct),
        None => (None, None),
    };

    Some(AccuracyData {
        total,
        correct,
        accuracy_pct: correct as f64 / total as f64 * 100.0,
        mean_abs_error: mean(&errors),
        median_abs_error: median(&errors),
        trend,
        improvement_pct,
    })
}

/// Newest window against the one before it
fn trend(errors: &[f64]) -> Option<(AccuracyTrend, Option<f64>)> {
    if errors.len() < TREND_MIN_PAIRS {
        return None;
    }

    let recent = mean(&errors[..TREND_WINDOW]);
    let older = mean(&errors[TREND_WINDOW..TREND_WINDOW * 2]);

    if older == 0.0 {
        return Some(if recent == 0.0 {
            (AccuracyTrend::Stable, Some(0.0))
        } else {
            (AccuracyTrend::Declining, None)
        });
    }

    let improvement = (older - recent) / older * 100.0;
    let trend = if improvement > TREND_THRESHOLD_PCT {
        AccuracyTrend::Improving
    } else if improvement < -TREND_THRESHOLD_PCT {
        AccuracyTrend::Declining
    } else {
        AccuracyTrend::Stable
    };
    Some((trend, Some(improvement)))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn report_insight(data: &AccuracyData, threshold: f64) -> NewInsight {
    let mut description = format!(
        "{} of {} predictions were within {} points ({:.0}%). \
         Average miss {:.1}, median {:.1}.",
        data.correct,
        data.total,
        threshold,
        data.accuracy_pct,
        data.mean_abs_error,
        data.median_abs_error
    );
    if let Some(trend) = data.trend {
        description.push_str(&format!(" Trend: {}.", trend.as_str()));
    }

    NewInsight::new(
        format!("Prediction accuracy: {:.0}%", data.accuracy_pct),
        description,
        2,
        InsightMetadata::AccuracyTracking(data.clone()),
    )
}
