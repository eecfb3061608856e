//! Ponder CLI - Decision journal
//!
//! Usage:
//!   ponder init                          Initialize database
//!   ponder decision new "Which job?"     Start a decision
//!   ponder recommend 1                   Rank its options
//!   ponder outcome 1 --satisfaction 8    Log how it turned out

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Decision { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                DecisionAction::New { title, description } => {
                    commands::cmd_decision_new(&db, &title, description.as_deref())
                }
                DecisionAction::List { status } => {
                    commands::cmd_decision_list(&db, status.as_deref())
                }
                DecisionAction::Show { id } => commands::cmd_decision_show(&db, id),
                DecisionAction::Complete { id, option } => {
                    commands::cmd_decision_complete(&db, id, option)
                }
                DecisionAction::Archive { id } => commands::cmd_decision_archive(&db, id),
                DecisionAction::Reactivate { id } => commands::cmd_decision_reactivate(&db, id),
                DecisionAction::Delete { id } => commands::cmd_decision_delete(&db, id),
            }
        }
        Commands::Factor { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                FactorAction::Add {
                    decision_id,
                    name,
                    weight,
                    direction,
                } => commands::cmd_factor_add(&db, decision_id, &name, weight, &direction),
            }
        }
        Commands::DecisionOption { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                OptionAction::Add {
                    decision_id,
                    name,
                    predicted,
                } => commands::cmd_option_add(&db, decision_id, &name, predicted),
                OptionAction::Predict {
                    option_id,
                    satisfaction,
                } => commands::cmd_option_predict(&db, option_id, satisfaction),
            }
        }
        Commands::Score {
            option_id,
            factor_id,
            score,
            confidence,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_score(&db, option_id, factor_id, score, confidence)
        }
        Commands::Recommend { decision_id, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_recommend(&db, decision_id, json)
        }
        Commands::Breakdown { option_id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_breakdown(&db, option_id)
        }
        Commands::Outcome {
            decision_id,
            satisfaction,
            surprise,
            notes,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_outcome(&db, &config, decision_id, satisfaction, surprise, notes).await
        }
        Commands::Insights { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_insights_list(&db, false),
                Some(InsightsAction::List { all }) => commands::cmd_insights_list(&db, all),
                Some(InsightsAction::Read { id }) => commands::cmd_insights_read(&db, id),
                Some(InsightsAction::Dismiss { id }) => commands::cmd_insights_dismiss(&db, id),
                Some(InsightsAction::Decision { decision_id }) => {
                    commands::cmd_insights_decision(&db, decision_id)
                }
            }
        }
        Commands::Progress { json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_progress(&db, json)
        }
    }
}
