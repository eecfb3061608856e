//! Core types for the Insight Engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest priority an insight can carry
pub const PRIORITY_HIGHEST: u8 = 1;
/// Lowest priority an insight can carry
pub const PRIORITY_LOWEST: u8 = 5;

/// Types of insights that can be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Factor associated with consistently high or low satisfaction
    Correlation,
    /// Systematic prediction error
    BiasDetection,
    /// Prediction accuracy report
    AccuracyTracking,
    /// Recurring behavior in decision history
    Pattern,
    /// Progress milestone
    Achievement,
    /// Nudge toward a next step
    Suggestion,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Correlation => "correlation",
            InsightType::BiasDetection => "bias_detection",
            InsightType::AccuracyTracking => "accuracy_tracking",
            InsightType::Pattern => "pattern",
            InsightType::Achievement => "achievement",
            InsightType::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correlation" => Ok(InsightType::Correlation),
            "bias_detection" => Ok(InsightType::BiasDetection),
            "accuracy_tracking" => Ok(InsightType::AccuracyTracking),
            "pattern" => Ok(InsightType::Pattern),
            "achievement" => Ok(InsightType::Achievement),
            "suggestion" => Ok(InsightType::Suggestion),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// Which way a factor leans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

/// Data for correlation insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationData {
    pub factor_name: String,
    /// Signed consistency proxy in [-1, 1]
    pub correlation: f64,
    pub p_value: f64,
    pub sample_size: usize,
    pub mean_satisfaction: f64,
    pub direction: CorrelationDirection,
}

/// Cognitive biases the bias engine looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    OptimismBias,
    PessimismBias,
    PlanningFallacy,
    RecencyBias,
}

impl BiasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasKind::OptimismBias => "optimism_bias",
            BiasKind::PessimismBias => "pessimism_bias",
            BiasKind::PlanningFallacy => "planning_fallacy",
            BiasKind::RecencyBias => "recency_bias",
        }
    }
}

impl fmt::Display for BiasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data for bias insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasData {
    pub bias: BiasKind,
    /// Strength in [0, 1]
    pub magnitude: f64,
    pub sample_size: usize,
    /// Detector-specific evidence: mean error, average delay in days, or
    /// error increase ratio
    pub evidence: f64,
    pub actionable: bool,
}

/// Direction of prediction accuracy over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTrend {
    Improving,
    Stable,
    Declining,
}

impl AccuracyTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyTrend::Improving => "improving",
            AccuracyTrend::Stable => "stable",
            AccuracyTrend::Declining => "declining",
        }
    }
}

/// Data for accuracy insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyData {
    pub total: usize,
    pub correct: usize,
    pub accuracy_pct: f64,
    pub mean_abs_error: f64,
    pub median_abs_error: f64,
    pub trend: Option<AccuracyTrend>,
    pub improvement_pct: Option<f64>,
}

/// Data for pattern insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    pub pattern: String,
    pub occurrences: u32,
}

/// Data for achievement insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementData {
    /// Stable key, e.g. "first_outcome" or "accuracy_70"
    pub milestone: String,
    pub value: f64,
}

/// Data for suggestion insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionData {
    pub action: String,
    pub total_outcomes: u32,
}

/// Type-specific payload, one shape per insight type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsightMetadata {
    Correlation(CorrelationData),
    BiasDetection(BiasData),
    AccuracyTracking(AccuracyData),
    Pattern(PatternData),
    Achievement(AchievementData),
    Suggestion(SuggestionData),
}

impl InsightMetadata {
    pub fn insight_type(&self) -> InsightType {
        match self {
            InsightMetadata::Correlation(_) => InsightType::Correlation,
            InsightMetadata::BiasDetection(_) => InsightType::BiasDetection,
            InsightMetadata::AccuracyTracking(_) => InsightType::AccuracyTracking,
            InsightMetadata::Pattern(_) => InsightType::Pattern,
            InsightMetadata::Achievement(_) => InsightType::Achievement,
            InsightMetadata::Suggestion(_) => InsightType::Suggestion,
        }
    }
}

/// An insight produced by an engine (before persistence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInsight {
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// 1 (highest) to 5 (lowest)
    pub priority: u8,
    pub metadata: InsightMetadata,
    /// Decision this insight is about, if any
    pub decision_id: Option<i64>,
    pub generated_at: DateTime<Utc>,
}

impl NewInsight {
    /// Create a new insight with the current timestamp.
    ///
    /// The insight type is taken from the metadata variant and the priority
    /// is clamped into 1..=5.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: u8,
        metadata: InsightMetadata,
    ) -> Self {
        Self {
            insight_type: metadata.insight_type(),
            title: title.into(),
            description: description.into(),
            priority: priority.clamp(PRIORITY_HIGHEST, PRIORITY_LOWEST),
            metadata,
            decision_id: None,
            generated_at: Utc::now(),
        }
    }

    /// Attach the decision this insight refers to
    pub fn with_decision(mut self, decision_id: i64) -> Self {
        self.decision_id = Some(decision_id);
        self
    }
}

/// A persisted insight from the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub metadata: InsightMetadata,
    pub decision_id: Option<i64>,
    pub generated_at: DateTime<Utc>,
}
