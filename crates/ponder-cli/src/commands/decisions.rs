//! Decision command implementations (decisions, factors, options, scores,
//! recommendations)

use std::collections::HashMap;

use anyhow::{Context, Result};
use ponder_core::models::{DecisionStatus, PreferenceDirection};
use ponder_core::{workflow, Database, UtilityEngine};

use super::truncate;

pub fn cmd_decision_new(db: &Database, title: &str, description: Option<&str>) -> Result<()> {
    let id = workflow::create_decision(db, title, description)?;

    println!("✅ Decision created (ID: {})", id);
    println!("   Next: ponder factor add {} <name> --weight <0-1>", id);
    Ok(())
}

pub fn cmd_decision_list(db: &Database, status: Option<&str>) -> Result<()> {
    let status = status
        .map(|s| s.parse::<DecisionStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let decisions = db.list_decisions(status)?;

    if decisions.is_empty() {
        println!("No decisions found. Start one with:");
        println!("  ponder decision new \"Which laptop?\"");
        return Ok(());
    }

    println!();
    println!("🤔 Decisions");
    println!("   ─────────────────────────────────────────────────────────────");

    for decision in decisions {
        let icon = match decision.status {
            DecisionStatus::Active => "🟢",
            DecisionStatus::Completed => "✅",
            DecisionStatus::Archived => "📦",
        };
        println!(
            "   {} {:>4} │ {:40} │ {}",
            icon,
            decision.id,
            truncate(&decision.title, 40),
            decision.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub fn cmd_decision_show(db: &Database, id: i64) -> Result<()> {
    let decision = db
        .get_decision(id)?
        .filter(|d| !d.deleted)
        .ok_or_else(|| anyhow::anyhow!("Decision not found: {}", id))?;
    let factors = db.list_factors(id)?;
    let options = db.list_options(id)?;
    let scores: HashMap<(i64, i64), u8> = db
        .list_scores(id)?
        .into_iter()
        .map(|s| ((s.option_id, s.factor_id), s.score))
        .collect();

    println!();
    println!("🤔 {} (ID: {}, {})", decision.title, decision.id, decision.status);
    if let Some(description) = &decision.description {
        println!("   {}", description);
    }
    if let Some(decided_at) = decision.decided_at {
        println!("   Decided: {}", decided_at.format("%Y-%m-%d"));
    }

    println!();
    println!("   Factors");
    println!("   ─────────────────────────────");
    if factors.is_empty() {
        println!("   (none yet)");
    }
    for factor in &factors {
        println!(
            "   {:>4} │ {:20} │ weight {:.2} │ {}",
            factor.id,
            truncate(&factor.name, 20),
            factor.weight,
            factor.direction
        );
    }

    println!();
    println!("   Options");
    println!("   ─────────────────────────────");
    if options.is_empty() {
        println!("   (none yet)");
    }
    for option in &options {
        let marker = if option.selected { "👉" } else { "  " };
        let predicted = option
            .predicted_satisfaction
            .map(|p| format!("{:.1}", p))
            .unwrap_or_else(|| "-".to_string());
        let row: Vec<String> = factors
            .iter()
            .map(|f| {
                scores
                    .get(&(option.id, f.id))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "·".to_string())
            })
            .collect();
        println!(
            "   {} {:>4} │ {:20} │ predicted {:>4} │ scores [{}]",
            marker,
            option.id,
            truncate(&option.name, 20),
            predicted,
            row.join(" ")
        );
    }

    if let Some(outcome) = db.get_outcome_for_decision(id)? {
        println!();
        println!(
            "   Outcome: satisfaction {:.1}/10, surprise {:+} ({})",
            outcome.satisfaction,
            outcome.surprise,
            outcome.logged_at.format("%Y-%m-%d")
        );
        if let Some(notes) = outcome.notes {
            println!("   Notes: {}", notes);
        }
    }

    Ok(())
}

pub fn cmd_decision_complete(db: &Database, id: i64, option_id: i64) -> Result<()> {
    db.complete_decision(id, option_id)?;
    println!("✅ Decision {} completed with option {}", id, option_id);
    println!(
        "   When you know how it went: ponder outcome {} --satisfaction <0-10>",
        id
    );
    Ok(())
}

pub fn cmd_decision_archive(db: &Database, id: i64) -> Result<()> {
    db.archive_decision(id)?;
    println!("📦 Decision {} archived", id);
    Ok(())
}

pub fn cmd_decision_reactivate(db: &Database, id: i64) -> Result<()> {
    db.reactivate_decision(id)?;
    println!("🟢 Decision {} is active again", id);
    Ok(())
}

pub fn cmd_decision_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_decision(id)?;
    println!("🗑️  Decision {} deleted", id);
    Ok(())
}

pub fn cmd_factor_add(
    db: &Database,
    decision_id: i64,
    name: &str,
    weight: f64,
    direction: &str,
) -> Result<()> {
    let direction: PreferenceDirection = direction.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    let id = db.add_factor(decision_id, name, weight, direction)?;

    let total: f64 = db.list_factors(decision_id)?.iter().map(|f| f.weight).sum();
    println!("✅ Factor '{}' added (ID: {})", name, id);
    println!("   Weights now sum to {:.2}", total);
    Ok(())
}

pub fn cmd_option_add(
    db: &Database,
    decision_id: i64,
    name: &str,
    predicted: Option<f64>,
) -> Result<()> {
    let id = db.add_option(decision_id, name, predicted)?;
    println!("✅ Option '{}' added (ID: {})", name, id);
    Ok(())
}

pub fn cmd_option_predict(db: &Database, option_id: i64, satisfaction: f64) -> Result<()> {
    db.set_predicted_satisfaction(option_id, Some(satisfaction))?;
    println!(
        "✅ Option {} predicted satisfaction set to {:.1}",
        option_id, satisfaction
    );
    Ok(())
}

pub fn cmd_score(
    db: &Database,
    option_id: i64,
    factor_id: i64,
    score: u8,
    confidence: Option<f64>,
) -> Result<()> {
    db.set_factor_score(option_id, factor_id, score, confidence)?;
    println!(
        "✅ Option {} scored {}/5 on factor {}",
        option_id, score, factor_id
    );
    Ok(())
}

pub fn cmd_recommend(db: &Database, decision_id: i64, json: bool) -> Result<()> {
    let recommendation = UtilityEngine::new(db)
        .compute_recommendation(decision_id)
        .with_context(|| format!("Cannot recommend for decision {}", decision_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        return Ok(());
    }

    println!();
    println!("🏆 Recommendation");
    println!("   ─────────────────────────────────────────────────────────────");
    for option in &recommendation.ranked_options {
        let missing = if option.missing_scores > 0 {
            format!(" ({} unscored)", option.missing_scores)
        } else {
            String::new()
        };
        println!(
            "   #{} {:30} │ {:>5.1}%{}",
            option.rank,
            truncate(&option.name, 30),
            option.utility * 100.0,
            missing
        );
    }

    let breakdown = recommendation.confidence_breakdown;
    println!();
    println!(
        "   Confidence: {}/100 (completeness {:.0}, decisiveness {:.0}, factors {:.0})",
        recommendation.confidence,
        breakdown.completeness,
        breakdown.decisiveness,
        breakdown.factor_count
    );
    if !recommendation.uncertain_factors.is_empty() {
        println!(
            "   ⚠️  Factors that barely separate the options: {}",
            recommendation.uncertain_factors.join(", ")
        );
    }
    println!();
    println!("   {}", recommendation.text);

    Ok(())
}

pub fn cmd_breakdown(db: &Database, option_id: i64) -> Result<()> {
    let contributions = UtilityEngine::new(db).utility_breakdown(option_id)?;

    if contributions.is_empty() {
        println!("This decision has no factors yet.");
        return Ok(());
    }

    println!();
    println!("🔍 Utility breakdown for option {}", option_id);
    println!("   ─────────────────────────────────────────────────────────────");

    let mut total = 0.0;
    for c in &contributions {
        let score = match c.score {
            Some(s) => s.to_string(),
            None => format!("{}*", c.effective_score),
        };
        println!(
            "   {:20} │ weight {:.2} │ score {:>2} │ {:+.3}",
            truncate(&c.factor_name, 20),
            c.weight,
            score,
            c.contribution
        );
        total += c.contribution;
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Utility: {:.1}%", total * 100.0);
    if contributions.iter().any(|c| c.score.is_none()) {
        println!("   * not scored yet, counted as the midpoint");
    }

    Ok(())
}
