//! Utility Engine - weighted multi-attribute scoring of decision options
//!
//! Each option's utility is the weighted sum of its normalized factor
//! scores:
//!
//! ```text
//! utility = Σ weight · (score - 1) / 4
//! ```
//!
//! A factor without a recorded score for an option counts as the scale
//! midpoint (3, normalized 0.5). That is a missing-data policy, not an
//! error: the confidence score reports how much of the matrix is filled.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{DecisionOption, Factor, FactorScore};

/// Score assumed when a factor has not been scored for an option
pub const DEFAULT_SCORE: u8 = 3;

/// Allowed distance of Σ weights from 1.0
const WEIGHT_TOLERANCE: f64 = 0.01;

/// Factors whose score variance across options is below this do not help
/// tell the options apart
const UNCERTAIN_VARIANCE: f64 = 0.5;

/// Top-two utility gap below which the race is called close
const CLOSE_RACE_GAP: f64 = 0.10;

/// Utility gaps are compared at this resolution so summed-float noise
/// cannot push a gap across a threshold
const GAP_RESOLUTION: f64 = 1e9;

/// Difference between two utilities, snapped to [`GAP_RESOLUTION`]
fn utility_gap(first: f64, second: f64) -> f64 {
    ((first - second) * GAP_RESOLUTION).round() / GAP_RESOLUTION
}

/// Map a 1-5 Likert score onto [0, 1]
pub fn normalize_score(score: u8) -> f64 {
    (score as f64 - 1.0) / 4.0
}

/// An option with its computed utility, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedOption {
    pub option_id: i64,
    pub name: String,
    pub utility: f64,
    /// 1-based position
    pub rank: usize,
    /// Factors that fell back to the default score
    pub missing_scores: usize,
}

/// How the confidence score was put together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// 0-40
    pub completeness: f64,
    /// 0-40
    pub decisiveness: f64,
    /// 0-20
    pub factor_count: f64,
}

impl ConfidenceBreakdown {
    /// Combined score, 0-100
    pub fn total(&self) -> u8 {
        (self.completeness + self.decisiveness + self.factor_count)
            .round()
            .clamp(0.0, 100.0) as u8
    }
}

/// Result of scoring a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub decision_id: i64,
    pub ranked_options: Vec<RankedOption>,
    /// 0-100
    pub confidence: u8,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub uncertain_factors: Vec<String>,
    pub fully_scored: bool,
    pub text: String,
}

impl Recommendation {
    pub fn top(&self) -> Option<&RankedOption> {
        self.ranked_options.first()
    }

    /// Utility gap between the two best options (None with fewer than two)
    pub fn top_gap(&self) -> Option<f64> {
        match self.ranked_options.as_slice() {
            [first, second, ..] => Some(utility_gap(first.utility, second.utility)),
            _ => None,
        }
    }
}

/// One factor's share of an option's utility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor_id: i64,
    pub factor_name: String,
    pub weight: f64,
    /// Recorded score, if any
    pub score: Option<u8>,
    /// Score used in the computation
    pub effective_score: u8,
    pub normalized: f64,
    pub contribution: f64,
}

/// Computes recommendations for decisions stored in the database
pub struct UtilityEngine<'a> {
    db: &'a Database,
}

impl<'a> UtilityEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Score and rank every option of a decision.
    ///
    /// Fails with [`Error::Validation`] listing every structural problem
    /// (too few options, no factors, weights not summing to 1). On success
    /// the computed utilities are cached on the options.
    pub fn compute_recommendation(&self, decision_id: i64) -> Result<Recommendation> {
        self.db.require_decision(decision_id)?;

        let options = self.db.list_options(decision_id)?;
        let factors = self.db.list_factors(decision_id)?;
        let scores = self.db.list_scores(decision_id)?;

        let recommendation = evaluate(decision_id, &options, &factors, &scores)?;

        let utilities: Vec<(i64, f64)> = recommendation
            .ranked_options
            .iter()
            .map(|o| (o.option_id, o.utility))
            .collect();
        self.db.update_option_utilities(&utilities)?;

        debug!(
            decision_id,
            confidence = recommendation.confidence,
            options = options.len(),
            "Recommendation computed"
        );

        Ok(recommendation)
    }

    /// Per-factor contributions to one option's utility
    pub fn utility_breakdown(&self, option_id: i64) -> Result<Vec<FactorContribution>> {
        let option = self
            .db
            .get_option(option_id)?
            .ok_or_else(|| Error::NotFound(format!("Option {}", option_id)))?;

        let factors = self.db.list_factors(option.decision_id)?;
        let scores: HashMap<i64, u8> = self
            .db
            .list_scores(option.decision_id)?
            .into_iter()
            .filter(|s| s.option_id == option_id)
            .map(|s| (s.factor_id, s.score))
            .collect();

        Ok(factors
            .iter()
            .map(|factor| {
                let score = scores.get(&factor.id).copied();
                let effective_score = score.unwrap_or(DEFAULT_SCORE);
                let normalized = normalize_score(effective_score);
                FactorContribution {
                    factor_id: factor.id,
                    factor_name: factor.name.clone(),
                    weight: factor.weight,
                    score,
                    effective_score,
                    normalized,
                    contribution: factor.weight * normalized,
                }
            })
            .collect())
    }
}

/// Structural checks; collects every violation instead of stopping early
fn validate(options: &[DecisionOption], factors: &[Factor]) -> Result<()> {
    let mut violations = Vec::new();

    if options.len() < 2 {
        violations.push(format!(
            "a decision needs at least 2 options (has {})",
            options.len()
        ));
    }
    if factors.is_empty() {
        violations.push("a decision needs at least 1 factor".to_string());
    } else {
        let total: f64 = factors.iter().map(|f| f.weight).sum();
        // Small epsilon so 0.33 + 0.33 + 0.34 style inputs are not rejected
        // on float noise
        if (total - 1.0).abs() > WEIGHT_TOLERANCE + 1e-9 {
            violations.push(format!(
                "factor weights must sum to 1.0 ± {} (sum is {:.3})",
                WEIGHT_TOLERANCE, total
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(violations))
    }
}

/// Score a decision from already-loaded rows
pub(crate) fn evaluate(
    decision_id: i64,
    options: &[DecisionOption],
    factors: &[Factor],
    scores: &[FactorScore],
) -> Result<Recommendation> {
    validate(options, factors)?;

    let lookup: HashMap<(i64, i64), u8> = scores
        .iter()
        .map(|s| ((s.option_id, s.factor_id), s.score))
        .collect();
    let effective = |option_id: i64, factor_id: i64| {
        lookup
            .get(&(option_id, factor_id))
            .copied()
            .unwrap_or(DEFAULT_SCORE)
    };

    let mut ranked: Vec<RankedOption> = options
        .iter()
        .map(|option| {
            let utility = factors
                .iter()
                .map(|f| f.weight * normalize_score(effective(option.id, f.id)))
                .sum();
            let missing_scores = factors
                .iter()
                .filter(|f| !lookup.contains_key(&(option.id, f.id)))
                .count();
            RankedOption {
                option_id: option.id,
                name: option.name.clone(),
                utility,
                rank: 0,
                missing_scores,
            }
        })
        .collect();

    // Stable: equal utilities keep creation order
    ranked.sort_by(|a, b| {
        b.utility
            .partial_cmp(&a.utility)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, option) in ranked.iter_mut().enumerate() {
        option.rank = i + 1;
    }

    let total_cells = options.len() * factors.len();
    let missing_cells: usize = ranked.iter().map(|o| o.missing_scores).sum();
    let filled_cells = total_cells - missing_cells;
    let fully_scored = missing_cells == 0;

    let gap = match ranked.as_slice() {
        [first, second, ..] => Some(utility_gap(first.utility, second.utility)),
        _ => None,
    };

    let breakdown = ConfidenceBreakdown {
        completeness: completeness_component(filled_cells, total_cells),
        decisiveness: decisiveness_component(gap),
        factor_count: factor_count_component(factors.len()),
    };
    let confidence = breakdown.total();

    let uncertain_factors = factors
        .iter()
        .filter(|f| {
            let values: Vec<f64> = options
                .iter()
                .map(|o| effective(o.id, f.id) as f64)
                .collect();
            variance(&values) < UNCERTAIN_VARIANCE
        })
        .map(|f| f.name.clone())
        .collect();

    let text = recommendation_text(&ranked, gap, confidence, filled_cells, total_cells);

    Ok(Recommendation {
        decision_id,
        ranked_options: ranked,
        confidence,
        confidence_breakdown: breakdown,
        uncertain_factors,
        fully_scored,
        text,
    })
}

/// 0-40, prorated by the share of (option × factor) cells with a score
fn completeness_component(filled: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    40.0 * filled as f64 / total as f64
}

/// 0-40 from the gap between the two best utilities
fn decisiveness_component(top_gap: Option<f64>) -> f64 {
    match top_gap {
        None => 40.0,
        Some(gap) if gap > 0.2 => 40.0,
        Some(gap) if gap > 0.1 => 30.0,
        Some(gap) if gap > 0.05 => 20.0,
        Some(_) => 10.0,
    }
}

/// 0-20; five to seven factors is the sweet spot
fn factor_count_component(count: usize) -> f64 {
    match count {
        5..=7 => 20.0,
        3..=10 => 15.0,
        _ => 10.0,
    }
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn recommendation_text(
    ranked: &[RankedOption],
    gap: Option<f64>,
    confidence: u8,
    filled: usize,
    total: usize,
) -> String {
    let Some(top) = ranked.first() else {
        return "No options to recommend.".to_string();
    };

    let mut text = if confidence >= 80 {
        format!(
            "Strong recommendation: {} (utility {:.0}%, confidence {}/100).",
            top.name,
            top.utility * 100.0,
            confidence
        )
    } else if confidence >= 60 {
        format!(
            "Moderate recommendation: {} looks best (utility {:.0}%, confidence {}/100).",
            top.name,
            top.utility * 100.0,
            confidence
        )
    } else {
        format!(
            "Weak recommendation: {} edges ahead (utility {:.0}%), but confidence is only {}/100.",
            top.name,
            top.utility * 100.0,
            confidence
        )
    };

    if filled < total {
        text.push_str(&format!(
            " Tip: score every option on every factor for a more reliable result \
             ({} of {} scores recorded).",
            filled, total
        ));
    }

    if let ([first, second, ..], Some(gap)) = (ranked, gap) {
        if gap < CLOSE_RACE_GAP {
            text.push_str(&format!(
                " Close race: {} and {} are within {:.1} percentage points.",
                first.name,
                second.name,
                gap * 100.0
            ));
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceDirection;

    /// Create a decision with the given weights and option score rows.
    /// `None` leaves the cell unscored.
    fn seed(db: &Database, weights: &[f64], rows: &[&[Option<u8>]]) -> (i64, Vec<i64>, Vec<i64>) {
        let decision_id = db.create_decision("Test decision", None).unwrap();
        let factor_ids: Vec<i64> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                db.add_factor(
                    decision_id,
                    &format!("Factor {}", i),
                    *w,
                    PreferenceDirection::HigherIsBetter,
                )
                .unwrap()
            })
            .collect();
        let option_ids: Vec<i64> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let option_id = db
                    .add_option(decision_id, &format!("Option {}", (b'A' + i as u8) as char), None)
                    .unwrap();
                for (factor_id, score) in factor_ids.iter().zip(row.iter()) {
                    if let Some(s) = score {
                        db.set_factor_score(option_id, *factor_id, *s, None).unwrap();
                    }
                }
                option_id
            })
            .collect();
        (decision_id, factor_ids, option_ids)
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(1), 0.0);
        assert_eq!(normalize_score(3), 0.5);
        assert_eq!(normalize_score(5), 1.0);
    }

    #[test]
    fn test_utility_exactness() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, options) =
            seed(&db, &[0.6, 0.4], &[&[Some(5), Some(1)], &[Some(3), Some(3)]]);

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();

        assert_eq!(rec.ranked_options[0].option_id, options[0]);
        assert!((rec.ranked_options[0].utility - 0.6).abs() < 1e-9);
        assert!((rec.ranked_options[1].utility - 0.5).abs() < 1e-9);
        assert_eq!(rec.ranked_options[0].rank, 1);
        assert!(rec.fully_scored);
    }

    #[test]
    fn test_missing_score_defaults_to_midpoint() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, options) =
            seed(&db, &[0.5, 0.5], &[&[Some(5), None], &[Some(1), Some(1)]]);

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();

        let a = rec
            .ranked_options
            .iter()
            .find(|o| o.option_id == options[0])
            .unwrap();
        // 0.5 * 1.0 + 0.5 * 0.5
        assert!((a.utility - 0.75).abs() < 1e-9);
        assert_eq!(a.missing_scores, 1);
        assert!(!rec.fully_scored);
        assert!(rec.text.contains("Tip"));
    }

    #[test]
    fn test_validation_lists_every_violation() {
        let db = Database::in_memory().unwrap();
        let decision_id = db.create_decision("Broken", None).unwrap();
        db.add_option(decision_id, "Only option", None).unwrap();

        let err = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap_err();
        match err {
            Error::Validation(violations) => {
                assert_eq!(violations.len(), 2);
                assert!(violations[0].contains("2 options"));
                assert!(violations[1].contains("1 factor"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, _) =
            seed(&db, &[0.5, 0.3], &[&[Some(5), Some(1)], &[Some(3), Some(3)]]);

        let err = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref v) if v.len() == 1 && v[0].contains("sum")));

        // Within tolerance passes
        let (decision_id, _, _) = seed(
            &db,
            &[0.33, 0.33, 0.33],
            &[&[Some(5), Some(1), Some(2)], &[Some(3), Some(3), Some(3)]],
        );
        assert!(UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .is_ok());
    }

    #[test]
    fn test_ties_keep_creation_order() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, options) = seed(
            &db,
            &[1.0],
            &[&[Some(2)], &[Some(4)], &[Some(4)], &[Some(2)]],
        );

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();
        let order: Vec<i64> = rec.ranked_options.iter().map(|o| o.option_id).collect();
        assert_eq!(order, vec![options[1], options[2], options[0], options[3]]);
        assert!(rec.text.contains("Close race"));
    }

    #[test]
    fn test_confidence_components() {
        assert_eq!(decisiveness_component(None), 40.0);
        assert_eq!(decisiveness_component(Some(0.25)), 40.0);
        assert_eq!(decisiveness_component(Some(0.15)), 30.0);
        assert_eq!(decisiveness_component(Some(0.06)), 20.0);
        assert_eq!(decisiveness_component(Some(0.05)), 10.0);

        assert_eq!(factor_count_component(1), 10.0);
        assert_eq!(factor_count_component(3), 15.0);
        assert_eq!(factor_count_component(6), 20.0);
        assert_eq!(factor_count_component(10), 15.0);
        assert_eq!(factor_count_component(11), 10.0);

        assert_eq!(completeness_component(4, 4), 40.0);
        assert_eq!(completeness_component(2, 4), 20.0);
    }

    #[test]
    fn test_confidence_monotonic_in_completeness() {
        let db = Database::in_memory().unwrap();
        // Identical structure and utilities; only the number of recorded
        // cells differs (explicit 3s vs missing defaults)
        let (sparse, _, _) = seed(
            &db,
            &[0.5, 0.5],
            &[&[Some(5), None], &[Some(1), None]],
        );
        let (dense, _, _) = seed(
            &db,
            &[0.5, 0.5],
            &[&[Some(5), Some(3)], &[Some(1), None]],
        );
        let (full, _, _) = seed(
            &db,
            &[0.5, 0.5],
            &[&[Some(5), Some(3)], &[Some(1), Some(3)]],
        );

        let engine = UtilityEngine::new(&db);
        let c1 = engine.compute_recommendation(sparse).unwrap().confidence;
        let c2 = engine.compute_recommendation(dense).unwrap().confidence;
        let c3 = engine.compute_recommendation(full).unwrap().confidence;
        assert!(c1 <= c2 && c2 <= c3);
        // Full: 40 + 40 (gap 0.5) + 10 (two factors)
        assert_eq!(c3, 90);
    }

    #[test]
    fn test_ten_point_gap_is_not_a_close_race() {
        let db = Database::in_memory().unwrap();
        // 0.6 vs 0.5: the float difference is 0.09999999999999998
        let (decision_id, _, _) =
            seed(&db, &[0.6, 0.4], &[&[Some(5), Some(1)], &[Some(3), Some(3)]]);

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();
        assert_eq!(rec.top_gap(), Some(0.1));
        assert!(!rec.text.contains("Close race"));
        // Exactly 0.1 is not "more than 0.1"
        assert_eq!(rec.confidence_breakdown.decisiveness, 20.0);
    }

    #[test]
    fn test_exact_tenth_gap_scores_twenty() {
        let db = Database::in_memory().unwrap();
        // 0.8 vs 0.7: the float difference is 0.10000000000000009
        let (decision_id, _, _) =
            seed(&db, &[0.6, 0.4], &[&[Some(5), Some(3)], &[Some(3), Some(5)]]);

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();
        assert!((rec.ranked_options[0].utility - 0.8).abs() < 1e-9);
        assert!((rec.ranked_options[1].utility - 0.7).abs() < 1e-9);
        assert_eq!(rec.confidence_breakdown.decisiveness, 20.0);
        // 40 + 20 + 10
        assert_eq!(rec.confidence, 70);
        assert!(!rec.text.contains("Close race"));
    }

    #[test]
    fn test_utility_gap_snaps_float_noise() {
        assert_eq!(utility_gap(0.6, 0.5), 0.1);
        assert_eq!(utility_gap(0.8, 0.7), 0.1);
        assert_eq!(utility_gap(0.5, 0.5), 0.0);
    }

    #[test]
    fn test_uncertain_factors() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, _) = seed(
            &db,
            &[0.5, 0.5],
            &[&[Some(5), Some(3)], &[Some(1), Some(3)], &[Some(3), Some(4)]],
        );

        let rec = UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();
        // Factor 1 scores 3,3,4: variance 0.22
        assert_eq!(rec.uncertain_factors, vec!["Factor 1".to_string()]);
    }

    #[test]
    fn test_recommendation_text_tiers() {
        let db = Database::in_memory().unwrap();
        let engine = UtilityEngine::new(&db);

        // 40 + 40 + 15 = 95
        let (strong, _, _) = seed(
            &db,
            &[0.4, 0.3, 0.3],
            &[&[Some(5), Some(5), Some(5)], &[Some(1), Some(1), Some(1)]],
        );
        let rec = engine.compute_recommendation(strong).unwrap();
        assert_eq!(rec.confidence, 95);
        assert!(rec.text.starts_with("Strong"));

        // 40 + 10 + 10 = 60
        let (moderate, _, _) = seed(&db, &[1.0], &[&[Some(4)], &[Some(4)]]);
        let rec = engine.compute_recommendation(moderate).unwrap();
        assert_eq!(rec.confidence, 60);
        assert!(rec.text.starts_with("Moderate"));

        // 0 + 10 + 10 = 20
        let (weak, _, _) = seed(&db, &[1.0], &[&[None], &[None]]);
        let rec = engine.compute_recommendation(weak).unwrap();
        assert_eq!(rec.confidence, 20);
        assert!(rec.text.starts_with("Weak"));
    }

    #[test]
    fn test_utilities_are_cached() {
        let db = Database::in_memory().unwrap();
        let (decision_id, _, options) =
            seed(&db, &[0.6, 0.4], &[&[Some(5), Some(1)], &[Some(3), Some(3)]]);

        UtilityEngine::new(&db)
            .compute_recommendation(decision_id)
            .unwrap();

        let a = db.get_option(options[0]).unwrap().unwrap();
        let b = db.get_option(options[1]).unwrap().unwrap();
        assert!((a.utility.unwrap() - 0.6).abs() < 1e-9);
        assert!((b.utility.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_utility_breakdown() {
        let db = Database::in_memory().unwrap();
        let (_, factors, options) =
            seed(&db, &[0.6, 0.4], &[&[Some(5), None], &[Some(3), Some(3)]]);

        let breakdown = UtilityEngine::new(&db)
            .utility_breakdown(options[0])
            .unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].factor_id, factors[0]);
        assert_eq!(breakdown[0].score, Some(5));
        assert!((breakdown[0].contribution - 0.6).abs() < 1e-9);
        assert_eq!(breakdown[1].score, None);
        assert_eq!(breakdown[1].effective_score, 3);
        assert!((breakdown[1].contribution - 0.2).abs() < 1e-9);

        assert!(matches!(
            UtilityEngine::new(&db).utility_breakdown(999),
            Err(Error::NotFound(_))
        ));
    }
}
