//! Status and progress command implementations

use std::path::Path;

use anyhow::Result;
use ponder_core::{Database, GamificationTracker};

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use ponder_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Ponder Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Try to open the database and show counts
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => print_counts(&db),
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

fn print_counts(db: &Database) {
    if let Ok(decisions) = db.list_decisions(None) {
        println!();
        println!("   Decisions: {}", decisions.len());
    }
    if let Ok(outcomes) = db.count_outcomes() {
        println!("   Outcomes: {}", outcomes);
    }
    if let Ok(unread) = db.list_unread_insights() {
        println!("   Unread insights: {}", unread.len());
    }
}

pub fn cmd_progress(db: &Database, json: bool) -> Result<()> {
    let status = GamificationTracker::new(db).status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           🧭 Ponder Progress            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Decisions:        {}", status.total_decisions);
    println!("  Outcomes logged:  {}", status.total_outcomes);
    println!(
        "  🔥 Streak:        {} day(s) (longest {})",
        status.current_streak, status.longest_streak
    );
    if status.predictions_measured > 0 {
        println!(
            "  🎯 Accuracy:      {:.0}% over {} predictions",
            status.accuracy_pct, status.predictions_measured
        );
    }
    println!(
        "  💡 Insights read: {}/{}",
        status.insights_read, status.insights_generated
    );
    println!();

    if status.badges.is_empty() {
        println!("  🏅 No badges yet");
    } else {
        println!("  🏅 Badges");
        for badge in &status.badges {
            println!(
                "     {} ({})",
                badge.id.title(),
                badge.awarded_at.format("%Y-%m-%d")
            );
        }
    }

    println!();
    println!(
        "  Next milestone: {} ({}/{})",
        status.next_milestone.description,
        status.next_milestone.current,
        status.next_milestone.target
    );

    Ok(())
}
