//! Gamification Tracker - streaks, badges and milestones
//!
//! Every update is a single read-modify-write of the user statistics row
//! (see [`Database::update_user_stats`]), so concurrent callers cannot lose
//! counts or award a badge twice.
//!
//! Streaks count calendar days (UTC) with at least one logged outcome:
//!
//! | days since last log | effect                                  |
//! |---------------------|-----------------------------------------|
//! | never logged        | streak = 1                              |
//! | 0                   | unchanged                               |
//! | 1                   | streak + 1, longest = max(longest, new) |
//! | more than 1         | streak = 1                              |

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Badge, BadgeId, UserStats};

const STREAK_MILESTONES: [u32; 4] = [3, 7, 14, 30];
const OUTCOME_MILESTONES: [u32; 3] = [5, 10, 25];
const ACCURACY_MILESTONES: [u32; 2] = [70, 90];

/// Result of logging an outcome, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeLogProgress {
    pub streak_increased: bool,
    pub current_streak: u32,
    pub new_badges: Vec<BadgeId>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Streak,
    Outcomes,
    Accuracy,
}

/// The next goal to work towards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub target: u32,
    pub current: u32,
    pub description: String,
}

/// Read-only snapshot of progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationStatus {
    pub total_decisions: u32,
    pub total_outcomes: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_log_day: Option<NaiveDate>,
    pub accuracy_pct: f64,
    pub predictions_measured: u32,
    pub insights_generated: u32,
    pub insights_read: u32,
    pub read_rate_pct: f64,
    pub badges: Vec<Badge>,
    pub next_milestone: Milestone,
}

pub struct GamificationTracker<'a> {
    db: &'a Database,
}

impl<'a> GamificationTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Count a new decision. Returns the badges it earned.
    pub fn record_decision(&self) -> Result<Vec<BadgeId>> {
        self.record_decision_at(Utc::now())
    }

    pub fn record_decision_at(&self, now: DateTime<Utc>) -> Result<Vec<BadgeId>> {
        let new_badges = self.db.update_user_stats(|stats| {
            stats.total_decisions += 1;
            stats.first_decision_at.get_or_insert(now);
            stats.last_active_at = Some(now);
            award_earned(stats, now)
        })?;

        if !new_badges.is_empty() {
            info!(badges = ?new_badges, "Badges earned");
        }
        Ok(new_badges)
    }

    /// Count a logged outcome and advance the daily streak
    pub fn record_outcome_log(&self) -> Result<OutcomeLogProgress> {
        self.record_outcome_log_at(Utc::now())
    }

    pub fn record_outcome_log_at(&self, now: DateTime<Utc>) -> Result<OutcomeLogProgress> {
        let progress = self.db.update_user_stats(|stats| {
            stats.total_outcomes += 1;
            stats.last_active_at = Some(now);

            let streak_increased = advance_streak(stats, now.date_naive());
            let new_badges = award_earned(stats, now);
            let message = progress_message(stats, streak_increased, &new_badges);

            OutcomeLogProgress {
                streak_increased,
                current_streak: stats.current_streak,
                new_badges,
                message,
            }
        })?;

        debug!(
            streak = progress.current_streak,
            badges = progress.new_badges.len(),
            "Outcome log recorded"
        );
        Ok(progress)
    }

    /// Current progress without changing anything
    pub fn status(&self) -> Result<GamificationStatus> {
        let stats = self.db.get_or_create_user_stats()?;
        Ok(GamificationStatus {
            total_decisions: stats.total_decisions,
            total_outcomes: stats.total_outcomes,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            last_log_day: stats.last_log_day,
            accuracy_pct: stats.accuracy.accuracy_pct(),
            predictions_measured: stats.accuracy.total,
            insights_generated: stats.insights_generated,
            insights_read: stats.insights_read,
            read_rate_pct: stats.read_rate_pct(),
            next_milestone: next_milestone(&stats),
            badges: stats.badges,
        })
    }
}

/// Apply the calendar-day streak rules. Returns true if the streak grew.
pub fn advance_streak(stats: &mut UserStats, today: NaiveDate) -> bool {
    let previous = stats.current_streak;

    match stats.last_log_day {
        None => {
            stats.current_streak = 1;
            stats.last_log_day = Some(today);
        }
        Some(last) => match (today - last).num_days() {
            // A log dated before the last one never moves the day backwards
            d if d < 0 => {}
            0 => stats.last_log_day = Some(today),
            1 => {
                stats.current_streak += 1;
                stats.last_log_day = Some(today);
            }
            _ => {
                stats.current_streak = 1;
                stats.last_log_day = Some(today);
            }
        },
    }

    stats.longest_streak = stats.longest_streak.max(stats.current_streak);
    stats.current_streak > previous
}

/// Whether the stats meet a badge's requirement
fn badge_earned(stats: &UserStats, badge: BadgeId) -> bool {
    let accuracy = &stats.accuracy;
    match badge {
        BadgeId::FirstDecision => stats.total_decisions >= 1,
        BadgeId::DecisionMaker => stats.total_decisions >= 10,
        BadgeId::FirstOutcome => stats.total_outcomes >= 1,
        BadgeId::CommittedLogger => stats.total_outcomes >= 10,
        BadgeId::OutcomeMaster => stats.total_outcomes >= 50,
        BadgeId::Streak3 => stats.current_streak >= 3,
        BadgeId::Streak7 => stats.current_streak >= 7,
        BadgeId::Streak30 => stats.current_streak >= 30,
        BadgeId::AccuratePredictor => accuracy.total >= 5 && accuracy.accuracy_pct() >= 70.0,
        BadgeId::PredictionMaster => accuracy.total >= 10 && accuracy.accuracy_pct() >= 90.0,
        BadgeId::InsightSeeker => stats.insights_generated >= 5 && stats.read_rate_pct() >= 80.0,
    }
}

/// Badges whose requirement is met but which have not been awarded yet
pub fn evaluate_badges(stats: &UserStats) -> Vec<BadgeId> {
    BadgeId::all()
        .iter()
        .copied()
        .filter(|b| !stats.has_badge(*b) && badge_earned(stats, *b))
        .collect()
}

/// Award a badge. Returns false if it was already held.
pub fn award_badge(stats: &mut UserStats, badge: BadgeId, now: DateTime<Utc>) -> bool {
    if stats.has_badge(badge) {
        return false;
    }
    stats.badges.push(Badge {
        id: badge,
        awarded_at: now,
    });
    true
}

fn award_earned(stats: &mut UserStats, now: DateTime<Utc>) -> Vec<BadgeId> {
    evaluate_badges(stats)
        .into_iter()
        .filter(|b| award_badge(stats, *b, now))
        .collect()
}

/// Pick the single most notable thing to say about an outcome log
fn progress_message(stats: &UserStats, streak_increased: bool, new_badges: &[BadgeId]) -> String {
    if !new_badges.is_empty() {
        let titles: Vec<&str> = new_badges.iter().map(BadgeId::title).collect();
        return if titles.len() == 1 {
            format!("Badge earned: {}!", titles[0])
        } else {
            format!("Badges earned: {}!", titles.join(", "))
        };
    }

    if streak_increased && STREAK_MILESTONES.contains(&stats.current_streak) {
        return format!(
            "{}-day streak! Reflecting every day builds better judgment.",
            stats.current_streak
        );
    }

    if OUTCOME_MILESTONES.contains(&stats.total_outcomes) {
        return format!(
            "{} outcomes logged. Your decision history is taking shape.",
            stats.total_outcomes
        );
    }

    if stats.accuracy.total >= 5 {
        let pct = stats.accuracy.accuracy_pct();
        if let Some(level) = ACCURACY_MILESTONES
            .iter()
            .rev()
            .find(|level| pct >= **level as f64)
        {
            return format!("Your predictions are over {}% accurate.", level);
        }
    }

    match stats.current_streak {
        1 => "Outcome logged. Come back tomorrow to start a streak.".to_string(),
        n => format!("Outcome logged. Current streak: {} days.", n),
    }
}

/// The next goal: streak first, then outcome count, then accuracy
pub fn next_milestone(stats: &UserStats) -> Milestone {
    if let Some(target) = STREAK_MILESTONES
        .iter()
        .copied()
        .find(|t| *t > stats.current_streak)
    {
        return Milestone {
            kind: MilestoneKind::Streak,
            target,
            current: stats.current_streak,
            description: format!("Reach a {}-day logging streak", target),
        };
    }

    if let Some(target) = OUTCOME_MILESTONES
        .iter()
        .copied()
        .find(|t| *t > stats.total_outcomes)
    {
        return Milestone {
            kind: MilestoneKind::Outcomes,
            target,
            current: stats.total_outcomes,
            description: format!("Log {} outcomes", target),
        };
    }

    let accuracy = stats.accuracy.accuracy_pct();
    if let Some(target) = ACCURACY_MILESTONES
        .iter()
        .copied()
        .find(|t| accuracy < *t as f64)
    {
        return Milestone {
            kind: MilestoneKind::Accuracy,
            target,
            current: accuracy.floor() as u32,
            description: format!("Reach {}% prediction accuracy", target),
        };
    }

    let target = stats.total_outcomes + 10;
    Milestone {
        kind: MilestoneKind::Outcomes,
        target,
        current: stats.total_outcomes,
        description: format!("Log {} outcomes", target),
    }
}
