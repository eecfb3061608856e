//! Outcome logging and the history joins the insight engines read

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewOutcome, Outcome, PredictionPair};

const OUTCOME_COLUMNS: &str = "id, decision_id, logged_at, satisfaction, surprise, notes";

/// The N most recent outcomes of live decisions, as a subquery aliased `r`
const RECENT_OUTCOMES: &str = "
    SELECT o.id, o.decision_id, o.logged_at, o.satisfaction
    FROM outcomes o
    JOIN decisions d ON d.id = o.decision_id
    WHERE d.deleted = 0
    ORDER BY o.logged_at DESC, o.id DESC
    LIMIT ?1";

impl Database {
    /// Log the outcome of a decision. Each decision gets at most one.
    pub fn create_outcome(&self, new: &NewOutcome) -> Result<Outcome> {
        if !(0.0..=10.0).contains(&new.satisfaction) {
            return Err(Error::InvalidData(format!(
                "Satisfaction must be between 0 and 10, got {}",
                new.satisfaction
            )));
        }
        if !(-3..=3).contains(&new.surprise) {
            return Err(Error::InvalidData(format!(
                "Surprise must be between -3 and 3, got {}",
                new.surprise
            )));
        }

        self.require_decision(new.decision_id)?;
        let logged_at = new.logged_at.unwrap_or_else(Utc::now);

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM outcomes WHERE decision_id = ?",
                params![new.decision_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::InvalidData(format!(
                "Decision {} already has an outcome",
                new.decision_id
            )));
        }

        tx.execute(
            "INSERT INTO outcomes (decision_id, logged_at, satisfaction, surprise, notes)
             VALUES (?, ?, ?, ?, ?)",
            params![
                new.decision_id,
                format_datetime(&logged_at),
                new.satisfaction,
                new.surprise,
                new.notes
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        // Read back so the returned timestamp has storage precision
        self.get_outcome(id)?
            .ok_or_else(|| Error::NotFound(format!("Outcome {}", id)))
    }

    /// Get an outcome by ID
    pub fn get_outcome(&self, id: i64) -> Result<Option<Outcome>> {
        let conn = self.conn()?;
        let outcome = conn
            .query_row(
                &format!("SELECT {} FROM outcomes WHERE id = ?", OUTCOME_COLUMNS),
                params![id],
                row_to_outcome,
            )
            .optional()?;
        Ok(outcome)
    }

    /// Get the outcome logged for a decision, if any
    pub fn get_outcome_for_decision(&self, decision_id: i64) -> Result<Option<Outcome>> {
        let conn = self.conn()?;
        let outcome = conn
            .query_row(
                &format!(
                    "SELECT {} FROM outcomes WHERE decision_id = ?",
                    OUTCOME_COLUMNS
                ),
                params![decision_id],
                row_to_outcome,
            )
            .optional()?;
        Ok(outcome)
    }

    /// Most recent outcomes first
    pub fn list_recent_outcomes(&self, limit: usize) -> Result<Vec<Outcome>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM outcomes ORDER BY logged_at DESC, id DESC LIMIT ?",
            OUTCOME_COLUMNS
        ))?;
        let outcomes = stmt
            .query_map(params![limit as i64], row_to_outcome)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(outcomes)
    }

    /// Count all logged outcomes
    pub fn count_outcomes(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM outcomes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Prediction/outcome pairs from the `limit` most recent outcomes,
    /// newest first. Only decisions whose selected option carries a
    /// predicted satisfaction qualify.
    pub fn recent_prediction_pairs(&self, limit: usize) -> Result<Vec<PredictionPair>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT r.decision_id, op.predicted_satisfaction, r.satisfaction, d.decided_at, r.logged_at
             FROM ({}) r
             JOIN decisions d ON d.id = r.decision_id
             JOIN options op ON op.id = d.selected_option_id
             WHERE op.predicted_satisfaction IS NOT NULL
             ORDER BY r.logged_at DESC, r.id DESC",
            RECENT_OUTCOMES
        ))?;

        let pairs = stmt
            .query_map(params![limit as i64], |row| {
                let decided_at_str: Option<String> = row.get(3)?;
                let logged_at_str: String = row.get(4)?;
                Ok(PredictionPair {
                    decision_id: row.get(0)?,
                    predicted: row.get(1)?,
                    actual: row.get(2)?,
                    decided_at: decided_at_str.map(|s| parse_datetime(&s)),
                    logged_at: parse_datetime(&logged_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    /// (factor name, outcome satisfaction) for every factor of every
    /// decision among the `limit` most recent outcomes
    pub fn recent_factor_satisfaction(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT f.name, r.satisfaction
             FROM ({}) r
             JOIN factors f ON f.decision_id = r.decision_id
             ORDER BY r.logged_at DESC, r.id DESC, f.id",
            RECENT_OUTCOMES
        ))?;

        let samples = stmt
            .query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }
}

fn row_to_outcome(row: &rusqlite::Row) -> rusqlite::Result<Outcome> {
    let logged_at_str: String = row.get(2)?;
    Ok(Outcome {
        id: row.get(0)?,
        decision_id: row.get(1)?,
        logged_at: parse_datetime(&logged_at_str),
        satisfaction: row.get(3)?,
        surprise: row.get(4)?,
        notes: row.get(5)?,
    })
}
