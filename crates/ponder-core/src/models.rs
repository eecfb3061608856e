//! Domain models for Ponder

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for DecisionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown decision status: {}", s)),
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decision the user is working through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: DecisionStatus,
    pub selected_option_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// When an option was committed to
    pub decided_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// Which end of a criterion the user prefers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceDirection {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
    Neutral,
}

impl PreferenceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HigherIsBetter => "higher_is_better",
            Self::LowerIsBetter => "lower_is_better",
            Self::Neutral => "neutral",
        }
    }
}

impl std::str::FromStr for PreferenceDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "higher_is_better" | "higher" => Ok(Self::HigherIsBetter),
            "lower_is_better" | "lower" => Ok(Self::LowerIsBetter),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("Unknown preference direction: {}", s)),
        }
    }
}

impl std::fmt::Display for PreferenceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A weighted criterion belonging to a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub id: i64,
    pub decision_id: i64,
    pub name: String,
    /// Relative importance in [0, 1]; a decision's weights sum to 1.0
    pub weight: f64,
    pub direction: PreferenceDirection,
    pub created_at: DateTime<Utc>,
}

/// One alternative of a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: i64,
    pub decision_id: i64,
    pub name: String,
    /// Last computed utility in [0, 1]
    pub utility: Option<f64>,
    /// Expected satisfaction on a 0-10 scale
    pub predicted_satisfaction: Option<f64>,
    pub selected: bool,
    pub created_at: DateTime<Utc>,
}

/// Likert rating of an option against a factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorScore {
    pub option_id: i64,
    pub factor_id: i64,
    /// 1-5
    pub score: u8,
    pub confidence: Option<f64>,
}

/// Real-world result of a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: i64,
    pub decision_id: i64,
    pub logged_at: DateTime<Utc>,
    /// 0-10
    pub satisfaction: f64,
    /// -3 (much worse than expected) to +3 (much better)
    pub surprise: i8,
    pub notes: Option<String>,
}

/// For logging a new outcome
#[derive(Debug, Clone)]
pub struct NewOutcome {
    pub decision_id: i64,
    pub satisfaction: f64,
    pub surprise: i8,
    pub notes: Option<String>,
    /// Defaults to now when not set
    pub logged_at: Option<DateTime<Utc>>,
}

/// A decision whose selected option carried a prediction and that has an
/// outcome. Input to the bias and accuracy engines.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionPair {
    pub decision_id: i64,
    pub predicted: f64,
    pub actual: f64,
    pub decided_at: Option<DateTime<Utc>>,
    pub logged_at: DateTime<Utc>,
}

impl PredictionPair {
    /// Signed error: positive when the prediction was too rosy
    pub fn error(&self) -> f64 {
        self.predicted - self.actual
    }

    pub fn abs_error(&self) -> f64 {
        self.error().abs()
    }
}

/// Achievement markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    FirstDecision,
    DecisionMaker,
    FirstOutcome,
    CommittedLogger,
    OutcomeMaster,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_30")]
    Streak30,
    AccuratePredictor,
    PredictionMaster,
    InsightSeeker,
}

impl BadgeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstDecision => "first_decision",
            Self::DecisionMaker => "decision_maker",
            Self::FirstOutcome => "first_outcome",
            Self::CommittedLogger => "committed_logger",
            Self::OutcomeMaster => "outcome_master",
            Self::Streak3 => "streak_3",
            Self::Streak7 => "streak_7",
            Self::Streak30 => "streak_30",
            Self::AccuratePredictor => "accurate_predictor",
            Self::PredictionMaster => "prediction_master",
            Self::InsightSeeker => "insight_seeker",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::FirstDecision => "First Decision",
            Self::DecisionMaker => "Decision Maker",
            Self::FirstOutcome => "First Outcome",
            Self::CommittedLogger => "Committed Logger",
            Self::OutcomeMaster => "Outcome Master",
            Self::Streak3 => "3-Day Streak",
            Self::Streak7 => "Week Warrior",
            Self::Streak30 => "Monthly Habit",
            Self::AccuratePredictor => "Accurate Predictor",
            Self::PredictionMaster => "Prediction Master",
            Self::InsightSeeker => "Insight Seeker",
        }
    }

    pub fn all() -> &'static [BadgeId] {
        &[
            Self::FirstDecision,
            Self::DecisionMaker,
            Self::FirstOutcome,
            Self::CommittedLogger,
            Self::OutcomeMaster,
            Self::Streak3,
            Self::Streak7,
            Self::Streak30,
            Self::AccuratePredictor,
            Self::PredictionMaster,
            Self::InsightSeeker,
        ]
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An earned badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub awarded_at: DateTime<Utc>,
}

/// Latest prediction-accuracy figures, overwritten by each accuracy run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySnapshot {
    pub total: u32,
    pub correct: u32,
    pub mean_error: f64,
}

impl AccuracySnapshot {
    /// Percentage of correct predictions (0 when nothing has been measured)
    pub fn accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// The single user-statistics row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub total_decisions: u32,
    pub total_outcomes: u32,
    pub insights_generated: u32,
    pub insights_read: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_log_day: Option<NaiveDate>,
    pub accuracy: AccuracySnapshot,
    pub badges: Vec<Badge>,
    pub first_decision_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn has_badge(&self, id: BadgeId) -> bool {
        self.badges.iter().any(|b| b.id == id)
    }

    /// Percentage of generated insights that were read
    pub fn read_rate_pct(&self) -> f64 {
        if self.insights_generated == 0 {
            0.0
        } else {
            self.insights_read as f64 / self.insights_generated as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_roundtrip_strings() {
        assert_eq!(DecisionStatus::Completed.as_str(), "completed");
        assert_eq!(
            DecisionStatus::from_str("archived").unwrap(),
            DecisionStatus::Archived
        );
        assert!(DecisionStatus::from_str("pending").is_err());
    }

    #[test]
    fn test_direction_aliases() {
        assert_eq!(
            PreferenceDirection::from_str("lower").unwrap(),
            PreferenceDirection::LowerIsBetter
        );
        assert_eq!(
            PreferenceDirection::from_str("HIGHER_IS_BETTER").unwrap(),
            PreferenceDirection::HigherIsBetter
        );
    }

    #[test]
    fn test_accuracy_pct_empty() {
        let snapshot = AccuracySnapshot::default();
        assert_eq!(snapshot.accuracy_pct(), 0.0);

        let snapshot = AccuracySnapshot {
            total: 4,
            correct: 3,
            mean_error: 1.0,
        };
        assert!((snapshot.accuracy_pct() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_badge_json_uses_snake_case() {
        let json = serde_json::to_string(&BadgeId::Streak30).unwrap();
        assert_eq!(json, "\"streak_30\"");

        let json = serde_json::to_string(&BadgeId::AccuratePredictor).unwrap();
        assert_eq!(json, "\"accurate_predictor\"");
    }

    #[test]
    fn test_prediction_pair_error_sign() {
        let pair = PredictionPair {
            decision_id: 1,
            predicted: 8.0,
            actual: 5.0,
            decided_at: None,
            logged_at: Utc::now(),
        };
        assert_eq!(pair.error(), 3.0);
        assert_eq!(pair.abs_error(), 3.0);
    }
}
