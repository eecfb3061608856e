//! Decision, factor, option and factor-score operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Decision, DecisionOption, DecisionStatus, Factor, FactorScore, PreferenceDirection,
};

const DECISION_COLUMNS: &str =
    "id, title, description, status, selected_option_id, created_at, decided_at, deleted";

const OPTION_COLUMNS: &str =
    "id, decision_id, name, utility, predicted_satisfaction, selected, created_at";

fn check_predicted(predicted: Option<f64>) -> Result<()> {
    match predicted {
        Some(p) if !(0.0..=10.0).contains(&p) => Err(Error::InvalidData(format!(
            "Predicted satisfaction must be between 0 and 10, got {}",
            p
        ))),
        _ => Ok(()),
    }
}

impl Database {
    // ========== Decisions ==========

    /// Create a new active decision
    pub fn create_decision(&self, title: &str, description: Option<&str>) -> Result<i64> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidData("Decision title cannot be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO decisions (title, description, created_at) VALUES (?, ?, ?)",
            params![title, description, format_datetime(&Utc::now())],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a decision by ID (soft-deleted decisions included)
    pub fn get_decision(&self, id: i64) -> Result<Option<Decision>> {
        let conn = self.conn()?;
        let decision = conn
            .query_row(
                &format!("SELECT {} FROM decisions WHERE id = ?", DECISION_COLUMNS),
                params![id],
                row_to_decision,
            )
            .optional()?;
        Ok(decision)
    }

    /// Get a live decision or fail with NotFound
    pub(crate) fn require_decision(&self, id: i64) -> Result<Decision> {
        match self.get_decision(id)? {
            Some(d) if !d.deleted => Ok(d),
            _ => Err(Error::NotFound(format!("Decision {}", id))),
        }
    }

    /// List live decisions, newest first, optionally filtered by status
    pub fn list_decisions(&self, status: Option<DecisionStatus>) -> Result<Vec<Decision>> {
        let conn = self.conn()?;

        let decisions = if let Some(s) = status {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM decisions WHERE deleted = 0 AND status = ? ORDER BY id DESC",
                DECISION_COLUMNS
            ))?;
            let rows = stmt.query_map(params![s.as_str()], row_to_decision)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM decisions WHERE deleted = 0 ORDER BY id DESC",
                DECISION_COLUMNS
            ))?;
            let rows = stmt.query_map([], row_to_decision)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        Ok(decisions)
    }

    /// Commit to an option: marks it selected, stamps the decision date and
    /// moves the decision to completed
    pub fn complete_decision(&self, decision_id: i64, option_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owner: Option<i64> = tx
            .query_row(
                "SELECT o.decision_id FROM options o
                 JOIN decisions d ON d.id = o.decision_id
                 WHERE o.id = ? AND d.deleted = 0",
                params![option_id],
                |row| row.get(0),
            )
            .optional()?;

        match owner {
            Some(id) if id == decision_id => {}
            Some(_) => {
                return Err(Error::InvalidData(format!(
                    "Option {} does not belong to decision {}",
                    option_id, decision_id
                )))
            }
            None => return Err(Error::NotFound(format!("Option {}", option_id))),
        }

        tx.execute(
            "UPDATE options SET selected = (id = ?) WHERE decision_id = ?",
            params![option_id, decision_id],
        )?;
        tx.execute(
            "UPDATE decisions SET status = 'completed', selected_option_id = ?, decided_at = ?
             WHERE id = ?",
            params![option_id, format_datetime(&Utc::now()), decision_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Move a decision to archived
    pub fn archive_decision(&self, id: i64) -> Result<()> {
        self.set_decision_status(id, DecisionStatus::Archived)
    }

    /// Move a completed or archived decision back to active.
    /// The selected option is kept.
    pub fn reactivate_decision(&self, id: i64) -> Result<()> {
        self.set_decision_status(id, DecisionStatus::Active)
    }

    fn set_decision_status(&self, id: i64, status: DecisionStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE decisions SET status = ? WHERE id = ? AND deleted = 0",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Decision {}", id)));
        }
        Ok(())
    }

    /// Soft-delete a decision
    pub fn delete_decision(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE decisions SET deleted = 1 WHERE id = ? AND deleted = 0",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Decision {}", id)));
        }
        Ok(())
    }

    // ========== Factors ==========

    /// Add a weighted factor to a decision
    pub fn add_factor(
        &self,
        decision_id: i64,
        name: &str,
        weight: f64,
        direction: PreferenceDirection,
    ) -> Result<i64> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(Error::InvalidData(format!(
                "Factor weight must be between 0 and 1, got {}",
                weight
            )));
        }
        self.require_decision(decision_id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO factors (decision_id, name, weight, direction, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                decision_id,
                name.trim(),
                weight,
                direction.as_str(),
                format_datetime(&Utc::now())
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List a decision's factors in creation order
    pub fn list_factors(&self, decision_id: i64) -> Result<Vec<Factor>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, decision_id, name, weight, direction, created_at
             FROM factors WHERE decision_id = ? ORDER BY id",
        )?;

        let factors = stmt
            .query_map(params![decision_id], |row| {
                let direction_str: String = row.get(4)?;
                let created_at_str: String = row.get(5)?;
                Ok(Factor {
                    id: row.get(0)?,
                    decision_id: row.get(1)?,
                    name: row.get(2)?,
                    weight: row.get(3)?,
                    direction: direction_str.parse().unwrap_or_default(),
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(factors)
    }

    // ========== Options ==========

    /// Add an option to a decision
    pub fn add_option(
        &self,
        decision_id: i64,
        name: &str,
        predicted_satisfaction: Option<f64>,
    ) -> Result<i64> {
        check_predicted(predicted_satisfaction)?;
        self.require_decision(decision_id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO options (decision_id, name, predicted_satisfaction, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                decision_id,
                name.trim(),
                predicted_satisfaction,
                format_datetime(&Utc::now())
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an option by ID
    pub fn get_option(&self, id: i64) -> Result<Option<DecisionOption>> {
        let conn = self.conn()?;
        let option = conn
            .query_row(
                &format!("SELECT {} FROM options WHERE id = ?", OPTION_COLUMNS),
                params![id],
                row_to_option,
            )
            .optional()?;
        Ok(option)
    }

    /// List a decision's options in creation order
    pub fn list_options(&self, decision_id: i64) -> Result<Vec<DecisionOption>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM options WHERE decision_id = ? ORDER BY id",
            OPTION_COLUMNS
        ))?;
        let options = stmt
            .query_map(params![decision_id], row_to_option)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(options)
    }

    /// Record (or clear) the satisfaction the user expects from an option
    pub fn set_predicted_satisfaction(&self, option_id: i64, predicted: Option<f64>) -> Result<()> {
        check_predicted(predicted)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE options SET predicted_satisfaction = ? WHERE id = ?",
            params![predicted, option_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Option {}", option_id)));
        }
        Ok(())
    }

    /// Cache computed utilities, all in one transaction
    pub fn update_option_utilities(&self, utilities: &[(i64, f64)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE options SET utility = ? WHERE id = ?")?;
            for (option_id, utility) in utilities {
                stmt.execute(params![utility, option_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ========== Factor Scores ==========

    /// Set the 1-5 score of an option against a factor (replaces any
    /// existing score for the pair)
    pub fn set_factor_score(
        &self,
        option_id: i64,
        factor_id: i64,
        score: u8,
        confidence: Option<f64>,
    ) -> Result<()> {
        if !(1..=5).contains(&score) {
            return Err(Error::InvalidData(format!(
                "Score must be between 1 and 5, got {}",
                score
            )));
        }
        if let Some(c) = confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(Error::InvalidData(format!(
                    "Confidence must be between 0 and 1, got {}",
                    c
                )));
            }
        }

        let conn = self.conn()?;
        let same_decision: Option<bool> = conn
            .query_row(
                "SELECT o.decision_id = f.decision_id FROM options o, factors f
                 WHERE o.id = ? AND f.id = ?",
                params![option_id, factor_id],
                |row| row.get(0),
            )
            .optional()?;

        match same_decision {
            Some(true) => {}
            Some(false) => {
                return Err(Error::InvalidData(format!(
                    "Option {} and factor {} belong to different decisions",
                    option_id, factor_id
                )))
            }
            None => {
                return Err(Error::NotFound(format!(
                    "Option {} or factor {}",
                    option_id, factor_id
                )))
            }
        }

        conn.execute(
            "INSERT INTO factor_scores (option_id, factor_id, score, confidence)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(option_id, factor_id) DO UPDATE SET
                score = excluded.score,
                confidence = excluded.confidence",
            params![option_id, factor_id, score, confidence],
        )?;
        Ok(())
    }

    /// All recorded scores for a decision's options
    pub fn list_scores(&self, decision_id: i64) -> Result<Vec<FactorScore>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.option_id, s.factor_id, s.score, s.confidence
             FROM factor_scores s
             JOIN options o ON o.id = s.option_id
             WHERE o.decision_id = ?
             ORDER BY s.option_id, s.factor_id",
        )?;
        let scores = stmt
            .query_map(params![decision_id], |row| {
                Ok(FactorScore {
                    option_id: row.get(0)?,
                    factor_id: row.get(1)?,
                    score: row.get(2)?,
                    confidence: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scores)
    }
}

fn row_to_decision(row: &rusqlite::Row) -> rusqlite::Result<Decision> {
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;
    let decided_at_str: Option<String> = row.get(6)?;

    Ok(Decision {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: status_str.parse().unwrap_or_default(),
        selected_option_id: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
        decided_at: decided_at_str.map(|s| parse_datetime(&s)),
        deleted: row.get(7)?,
    })
}

fn row_to_option(row: &rusqlite::Row) -> rusqlite::Result<DecisionOption> {
    let created_at_str: String = row.get(6)?;
    Ok(DecisionOption {
        id: row.get(0)?,
        decision_id: row.get(1)?,
        name: row.get(2)?,
        utility: row.get(3)?,
        predicted_satisfaction: row.get(4)?,
        selected: row.get(5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision_with_options(db: &Database) -> (i64, i64, i64) {
        let decision_id = db.create_decision("New laptop", None).unwrap();
        let a = db.add_option(decision_id, "ThinkPad", Some(7.5)).unwrap();
        let b = db.add_option(decision_id, "MacBook", None).unwrap();
        (decision_id, a, b)
    }

    #[test]
    fn test_create_and_get_decision() {
        let db = Database::in_memory().unwrap();
        let id = db
            .create_decision("  Move to Lisbon?  ", Some("Job offer"))
            .unwrap();

        let decision = db.get_decision(id).unwrap().unwrap();
        assert_eq!(decision.title, "Move to Lisbon?");
        assert_eq!(decision.description.as_deref(), Some("Job offer"));
        assert_eq!(decision.status, DecisionStatus::Active);
        assert!(decision.selected_option_id.is_none());
        assert!(!decision.deleted);
    }

    #[test]
    fn test_empty_title_rejected() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.create_decision("   ", None),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_complete_archive_reactivate() {
        let db = Database::in_memory().unwrap();
        let (decision_id, a, b) = decision_with_options(&db);

        db.complete_decision(decision_id, b).unwrap();
        let decision = db.get_decision(decision_id).unwrap().unwrap();
        assert_eq!(decision.status, DecisionStatus::Completed);
        assert_eq!(decision.selected_option_id, Some(b));
        assert!(decision.decided_at.is_some());

        let options = db.list_options(decision_id).unwrap();
        assert!(!options.iter().find(|o| o.id == a).unwrap().selected);
        assert!(options.iter().find(|o| o.id == b).unwrap().selected);

        db.archive_decision(decision_id).unwrap();
        assert_eq!(
            db.list_decisions(Some(DecisionStatus::Archived)).unwrap().len(),
            1
        );

        db.reactivate_decision(decision_id).unwrap();
        let decision = db.get_decision(decision_id).unwrap().unwrap();
        assert_eq!(decision.status, DecisionStatus::Active);
        assert_eq!(decision.selected_option_id, Some(b));
    }

    #[test]
    fn test_complete_with_foreign_option_fails() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, _) = decision_with_options(&db);
        let (_, other_option, _) = decision_with_options(&db);

        let result = db.complete_decision(decision_id, other_option);
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let result = db.complete_decision(decision_id, 9999);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_soft_delete_hides_from_list() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, _) = decision_with_options(&db);

        db.delete_decision(decision_id).unwrap();
        assert!(db.list_decisions(None).unwrap().is_empty());

        // Still retrievable by id, flagged deleted
        let decision = db.get_decision(decision_id).unwrap().unwrap();
        assert!(decision.deleted);

        // Second delete and status changes report NotFound
        assert!(matches!(
            db.delete_decision(decision_id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.archive_decision(decision_id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_factor_weight_range() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, _) = decision_with_options(&db);

        assert!(db
            .add_factor(decision_id, "Price", 1.5, PreferenceDirection::LowerIsBetter)
            .is_err());

        let id = db
            .add_factor(decision_id, "Price", 0.4, PreferenceDirection::LowerIsBetter)
            .unwrap();
        let factors = db.list_factors(decision_id).unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].id, id);
        assert_eq!(factors[0].direction, PreferenceDirection::LowerIsBetter);
    }

    #[test]
    fn test_score_upsert_and_validation() {
        let db = Database::in_memory().unwrap();
        let (decision_id, a, _) = decision_with_options(&db);
        let f = db
            .add_factor(decision_id, "Battery", 1.0, PreferenceDirection::HigherIsBetter)
            .unwrap();

        db.set_factor_score(a, f, 2, None).unwrap();
        db.set_factor_score(a, f, 4, Some(0.8)).unwrap();

        let scores = db.list_scores(decision_id).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 4);
        assert_eq!(scores[0].confidence, Some(0.8));

        assert!(matches!(
            db.set_factor_score(a, f, 6, None),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.set_factor_score(a, f, 3, Some(1.2)),
            Err(Error::InvalidData(_))
        ));

        // Factor from another decision
        let (other_decision, _, _) = decision_with_options(&db);
        let other_factor = db
            .add_factor(other_decision, "Weight", 1.0, PreferenceDirection::LowerIsBetter)
            .unwrap();
        assert!(matches!(
            db.set_factor_score(a, other_factor, 3, None),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_prediction_range_and_utilities() {
        let db = Database::in_memory().unwrap();
        let (decision_id, a, b) = decision_with_options(&db);

        assert!(db.set_predicted_satisfaction(a, Some(11.0)).is_err());
        db.set_predicted_satisfaction(b, Some(6.0)).unwrap();

        db.update_option_utilities(&[(a, 0.6), (b, 0.5)]).unwrap();
        let options = db.list_options(decision_id).unwrap();
        assert_eq!(options[0].utility, Some(0.6));
        assert_eq!(options[1].utility, Some(0.5));
        assert_eq!(options[1].predicted_satisfaction, Some(6.0));
    }
}
