//! The single user-statistics row
//!
//! There is exactly one row (id = 1). It is created lazily on first access,
//! and every change goes through [`Database::update_user_stats`], which
//! performs the read-modify-write inside a `BEGIN IMMEDIATE` transaction so
//! two writers can never interleave and lose an update.

use rusqlite::{params, Connection, TransactionBehavior};

use super::{format_date, format_datetime, parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{AccuracySnapshot, Badge, UserStats};

/// Insert the default row if it does not exist yet
pub(super) fn ensure_user_stats_row(conn: &Connection) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO user_stats (id) VALUES (1)", [])?;
    Ok(())
}

fn load_user_stats(conn: &Connection) -> Result<UserStats> {
    ensure_user_stats_row(conn)?;

    let (stats, badges_json) = conn.query_row(
        r#"
        SELECT total_decisions, total_outcomes, insights_generated, insights_read,
               current_streak, longest_streak, last_log_day,
               accuracy_total, accuracy_correct, accuracy_mean_error,
               badges, first_decision_at, last_active_at
        FROM user_stats WHERE id = 1
        "#,
        [],
        |row| {
            let last_log_day: Option<String> = row.get(6)?;
            let first_decision_at: Option<String> = row.get(11)?;
            let last_active_at: Option<String> = row.get(12)?;
            let badges_json: String = row.get(10)?;

            Ok((
                UserStats {
                    total_decisions: row.get(0)?,
                    total_outcomes: row.get(1)?,
                    insights_generated: row.get(2)?,
                    insights_read: row.get(3)?,
                    current_streak: row.get(4)?,
                    longest_streak: row.get(5)?,
                    last_log_day: last_log_day.as_deref().and_then(parse_date),
                    accuracy: AccuracySnapshot {
                        total: row.get(7)?,
                        correct: row.get(8)?,
                        mean_error: row.get(9)?,
                    },
                    badges: Vec::new(),
                    first_decision_at: first_decision_at.map(|s| parse_datetime(&s)),
                    last_active_at: last_active_at.map(|s| parse_datetime(&s)),
                },
                badges_json,
            ))
        },
    )?;

    let badges: Vec<Badge> = serde_json::from_str(&badges_json)?;
    Ok(UserStats { badges, ..stats })
}

fn save_user_stats(conn: &Connection, stats: &UserStats) -> Result<()> {
    let badges_json = serde_json::to_string(&stats.badges)?;

    conn.execute(
        r#"
        UPDATE user_stats SET
            total_decisions = ?,
            total_outcomes = ?,
            insights_generated = ?,
            insights_read = ?,
            current_streak = ?,
            longest_streak = ?,
            last_log_day = ?,
            accuracy_total = ?,
            accuracy_correct = ?,
            accuracy_mean_error = ?,
            badges = ?,
            first_decision_at = ?,
            last_active_at = ?
        WHERE id = 1
        "#,
        params![
            stats.total_decisions,
            stats.total_outcomes,
            stats.insights_generated,
            stats.insights_read,
            stats.current_streak,
            stats.longest_streak,
            stats.last_log_day.as_ref().map(format_date),
            stats.accuracy.total,
            stats.accuracy.correct,
            stats.accuracy.mean_error,
            badges_json,
            stats.first_decision_at.as_ref().map(format_datetime),
            stats.last_active_at.as_ref().map(format_datetime),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Fetch the user-statistics row, creating it on first access
    pub fn get_or_create_user_stats(&self) -> Result<UserStats> {
        let conn = self.conn()?;
        load_user_stats(&conn)
    }

    /// Atomically read, modify and write the user-statistics row.
    ///
    /// The closure sees the current row and may change it; whatever it
    /// returns is passed back once the transaction has committed.
    pub fn update_user_stats<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UserStats) -> T,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut stats = load_user_stats(&tx)?;
        let result = f(&mut stats);
        save_user_stats(&tx, &stats)?;

        tx.commit()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BadgeId;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_lazily_created_with_defaults() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_or_create_user_stats().unwrap();
        assert_eq!(stats.total_decisions, 0);
        assert_eq!(stats.current_streak, 0);
        assert!(stats.badges.is_empty());
        assert!(stats.last_log_day.is_none());

        // Second access does not create another row
        db.get_or_create_user_stats().unwrap();
        let conn = db.conn().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_update_roundtrip() {
        let db = Database::in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();

        let returned = db
            .update_user_stats(|stats| {
                stats.total_outcomes = 4;
                stats.current_streak = 2;
                stats.longest_streak = 3;
                stats.last_log_day = Some(day);
                stats.accuracy = AccuracySnapshot {
                    total: 6,
                    correct: 5,
                    mean_error: 1.25,
                };
                stats.badges.push(Badge {
                    id: BadgeId::FirstOutcome,
                    awarded_at: Utc::now(),
                });
                stats.total_outcomes
            })
            .unwrap();
        assert_eq!(returned, 4);

        let stats = db.get_or_create_user_stats().unwrap();
        assert_eq!(stats.total_outcomes, 4);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.last_log_day, Some(day));
        assert_eq!(stats.accuracy.correct, 5);
        assert_eq!(stats.accuracy.mean_error, 1.25);
        assert!(stats.has_badge(BadgeId::FirstOutcome));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_user_stats().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        db.update_user_stats(|s| s.total_decisions += 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.get_or_create_user_stats().unwrap().total_decisions, 40);
    }
}
