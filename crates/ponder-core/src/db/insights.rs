//! Insight database operations

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::{format_datetime, parse_datetime, user_stats::ensure_user_stats_row, Database};
use crate::error::{Error, Result};
use crate::insights::{Insight, InsightMetadata, InsightType, NewInsight};

const INSIGHT_COLUMNS: &str = "id, insight_type, title, description, priority, is_read, \
                               is_dismissed, metadata, decision_id, generated_at";

impl Database {
    /// Persist a batch of insights in one transaction and bump the
    /// generated-insights counter by the same amount.
    ///
    /// Returns the stored insights in input order.
    pub fn insert_insights(&self, insights: &[NewInsight]) -> Result<Vec<Insight>> {
        if insights.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut stored = Vec::with_capacity(insights.len());

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO insights (
                    insight_type, title, description, priority, metadata, decision_id, generated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for insight in insights {
                let metadata_json = serde_json::to_string(&insight.metadata)?;
                stmt.execute(params![
                    insight.insight_type.as_str(),
                    insight.title,
                    insight.description,
                    insight.priority,
                    metadata_json,
                    insight.decision_id,
                    format_datetime(&insight.generated_at),
                ])?;

                stored.push(Insight {
                    id: tx.last_insert_rowid(),
                    insight_type: insight.insight_type,
                    title: insight.title.clone(),
                    description: insight.description.clone(),
                    priority: insight.priority,
                    is_read: false,
                    is_dismissed: false,
                    metadata: insight.metadata.clone(),
                    decision_id: insight.decision_id,
                    generated_at: insight.generated_at,
                });
            }
        }

        ensure_user_stats_row(&tx)?;
        tx.execute(
            "UPDATE user_stats SET insights_generated = insights_generated + ? WHERE id = 1",
            params![stored.len() as i64],
        )?;

        tx.commit()?;
        Ok(stored)
    }

    /// Get a single insight by ID (soft-deleted insights are not returned)
    pub fn get_insight(&self, id: i64) -> Result<Option<Insight>> {
        let conn = self.conn()?;
        let insight = conn
            .query_row(
                &format!(
                    "SELECT {} FROM insights WHERE id = ? AND deleted = 0",
                    INSIGHT_COLUMNS
                ),
                params![id],
                row_to_insight,
            )
            .optional()?;
        Ok(insight)
    }

    /// Unread, undismissed insights, highest priority first
    pub fn list_unread_insights(&self) -> Result<Vec<Insight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM insights
             WHERE is_read = 0 AND is_dismissed = 0 AND deleted = 0
             ORDER BY priority ASC, generated_at DESC, id DESC",
            INSIGHT_COLUMNS
        ))?;
        let insights = stmt
            .query_map([], row_to_insight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(insights)
    }

    /// Every live insight, newest first; dismissed ones only when asked
    pub fn list_insights(&self, include_dismissed: bool) -> Result<Vec<Insight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM insights
             WHERE deleted = 0 AND (? OR is_dismissed = 0)
             ORDER BY generated_at DESC, id DESC",
            INSIGHT_COLUMNS
        ))?;
        let insights = stmt
            .query_map(params![include_dismissed], row_to_insight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(insights)
    }

    /// Undismissed insights attached to a decision, newest first
    pub fn list_insights_for_decision(&self, decision_id: i64) -> Result<Vec<Insight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM insights
             WHERE decision_id = ? AND is_dismissed = 0 AND deleted = 0
             ORDER BY generated_at DESC, id DESC",
            INSIGHT_COLUMNS
        ))?;
        let insights = stmt
            .query_map(params![decision_id], row_to_insight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(insights)
    }

    /// Mark an insight read. The read counter only moves the first time.
    ///
    /// Returns true if the insight was previously unread.
    pub fn mark_insight_read(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let is_read: Option<bool> = tx
            .query_row(
                "SELECT is_read FROM insights WHERE id = ? AND deleted = 0",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let newly_read = match is_read {
            None => return Err(Error::NotFound(format!("Insight {}", id))),
            Some(true) => false,
            Some(false) => {
                tx.execute("UPDATE insights SET is_read = 1 WHERE id = ?", params![id])?;
                ensure_user_stats_row(&tx)?;
                tx.execute(
                    "UPDATE user_stats SET insights_read = insights_read + 1 WHERE id = 1",
                    [],
                )?;
                true
            }
        };

        tx.commit()?;
        Ok(newly_read)
    }

    /// Dismiss an insight
    pub fn dismiss_insight(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE insights SET is_dismissed = 1 WHERE id = ? AND deleted = 0",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Insight {}", id)));
        }
        Ok(())
    }

    /// Soft-delete an insight
    pub fn delete_insight(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE insights SET deleted = 1 WHERE id = ? AND deleted = 0",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Insight {}", id)));
        }
        Ok(())
    }
}

/// Helper to convert a row to Insight
fn row_to_insight(row: &rusqlite::Row) -> rusqlite::Result<Insight> {
    let insight_type_str: String = row.get(1)?;
    let metadata_json: String = row.get(7)?;
    let generated_at_str: String = row.get(9)?;

    let metadata: InsightMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let insight_type = insight_type_str
        .parse::<InsightType>()
        .unwrap_or_else(|_| metadata.insight_type());

    Ok(Insight {
        id: row.get(0)?,
        insight_type,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        is_read: row.get(5)?,
        is_dismissed: row.get(6)?,
        metadata,
        decision_id: row.get(8)?,
        generated_at: parse_datetime(&generated_at_str),
    })
}
