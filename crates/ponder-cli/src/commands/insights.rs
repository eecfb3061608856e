//! Outcome logging and insight review commands

use anyhow::{Context, Result};
use ponder_core::insights::{Insight, InsightType};
use ponder_core::models::NewOutcome;
use ponder_core::{workflow, Database, EngineConfig, InsightOrchestrator};

use super::truncate;

/// Management calls never run the engines, so the tuning is irrelevant here
fn orchestrator(db: &Database) -> InsightOrchestrator {
    InsightOrchestrator::new(db.clone(), &EngineConfig::default())
}

fn insight_icon(insight_type: InsightType) -> &'static str {
    match insight_type {
        InsightType::Correlation => "🔗",
        InsightType::BiasDetection => "🧠",
        InsightType::AccuracyTracking => "🎯",
        InsightType::Pattern => "🧩",
        InsightType::Achievement => "🏅",
        InsightType::Suggestion => "💡",
    }
}

fn print_insight(insight: &Insight) {
    let state = if insight.is_dismissed {
        " (dismissed)"
    } else if insight.is_read {
        " (read)"
    } else {
        ""
    };
    println!(
        "   {} [{}] P{} {}{}",
        insight_icon(insight.insight_type),
        insight.id,
        insight.priority,
        insight.title,
        state
    );
    println!("        {}", truncate(&insight.description, 200));
}

pub async fn cmd_outcome(
    db: &Database,
    config: &EngineConfig,
    decision_id: i64,
    satisfaction: f64,
    surprise: i8,
    notes: Option<String>,
) -> Result<()> {
    let report = workflow::log_outcome(
        db,
        config,
        NewOutcome {
            decision_id,
            satisfaction,
            surprise,
            notes,
            logged_at: None,
        },
    )
    .await
    .with_context(|| format!("Failed to log outcome for decision {}", decision_id))?;

    println!(
        "✅ Outcome logged for decision {} (satisfaction {:.1}/10)",
        decision_id, report.outcome.satisfaction
    );

    if let Some(progress) = &report.progress {
        println!("   🔥 Streak: {} day(s)", progress.current_streak);
        println!("   {}", progress.message);
    }

    if !report.insights.is_empty() {
        println!();
        println!("💡 New insights");
        println!("   ─────────────────────────────────────────────────────────────");
        for insight in &report.insights {
            print_insight(insight);
        }
    }

    Ok(())
}

pub fn cmd_insights_list(db: &Database, all: bool) -> Result<()> {
    let insights = if all {
        db.list_insights(true)?
    } else {
        orchestrator(db).unread_insights()?
    };

    if insights.is_empty() {
        if all {
            println!("No insights yet. Log outcomes to start generating them:");
            println!("  ponder outcome <decision-id> --satisfaction <0-10>");
        } else {
            println!("No unread insights. 🎉");
        }
        return Ok(());
    }

    println!();
    println!("💡 Insights");
    println!("   ─────────────────────────────────────────────────────────────");
    for insight in &insights {
        print_insight(insight);
    }

    Ok(())
}

pub fn cmd_insights_read(db: &Database, id: i64) -> Result<()> {
    if orchestrator(db).mark_insight_as_read(id)? {
        println!("✅ Insight {} marked as read", id);
    } else {
        println!("Insight {} was already read", id);
    }
    Ok(())
}

pub fn cmd_insights_dismiss(db: &Database, id: i64) -> Result<()> {
    orchestrator(db).dismiss_insight(id)?;
    println!("🙈 Insight {} dismissed", id);
    Ok(())
}

pub fn cmd_insights_decision(db: &Database, decision_id: i64) -> Result<()> {
    let insights = orchestrator(db).insights_for_decision(decision_id)?;

    if insights.is_empty() {
        println!("No insights for decision {}.", decision_id);
        return Ok(());
    }

    println!();
    println!("💡 Insights for decision {}", decision_id);
    println!("   ─────────────────────────────────────────────────────────────");
    for insight in &insights {
        print_insight(insight);
    }

    Ok(())
}
