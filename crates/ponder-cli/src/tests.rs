//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use ponder_core::db::Database;
use ponder_core::models::{DecisionStatus, PreferenceDirection};
use ponder_core::EngineConfig;

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Create a scored two-option decision, returning (decision_id, [option ids])
fn create_scored_decision(db: &Database) -> (i64, [i64; 2]) {
    let decision_id = db.create_decision("Which city?", None).unwrap();
    let cost = db
        .add_factor(decision_id, "Cost", 0.6, PreferenceDirection::LowerIsBetter)
        .unwrap();
    let jobs = db
        .add_factor(decision_id, "Jobs", 0.4, PreferenceDirection::HigherIsBetter)
        .unwrap();
    let lisbon = db.add_option(decision_id, "Lisbon", Some(8.0)).unwrap();
    let berlin = db.add_option(decision_id, "Berlin", Some(6.0)).unwrap();

    db.set_factor_score(lisbon, cost, 5, None).unwrap();
    db.set_factor_score(lisbon, jobs, 1, None).unwrap();
    db.set_factor_score(berlin, cost, 3, None).unwrap();
    db.set_factor_score(berlin, jobs, 3, None).unwrap();

    (decision_id, [lisbon, berlin])
}

// ========== Decision Command Tests ==========

#[test]
fn test_cmd_decision_new_counts_progress() {
    let db = setup_test_db();
    commands::cmd_decision_new(&db, "Buy a bike?", Some("Commute options")).unwrap();

    let decisions = db.list_decisions(None).unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].title, "Buy a bike?");

    let stats = db.get_or_create_user_stats().unwrap();
    assert_eq!(stats.total_decisions, 1);
}

#[test]
fn test_cmd_decision_list_filters() {
    let db = setup_test_db();
    commands::cmd_decision_new(&db, "One", None).unwrap();

    assert!(commands::cmd_decision_list(&db, None).is_ok());
    assert!(commands::cmd_decision_list(&db, Some("archived")).is_ok());

    let result = commands::cmd_decision_list(&db, Some("pending"));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown decision status"));
}

#[test]
fn test_cmd_decision_show() {
    let db = setup_test_db();
    let (decision_id, _) = create_scored_decision(&db);

    assert!(commands::cmd_decision_show(&db, decision_id).is_ok());

    let missing = commands::cmd_decision_show(&db, 999);
    assert!(missing.unwrap_err().to_string().contains("not found"));
}

#[test]
fn test_cmd_decision_lifecycle() {
    let db = setup_test_db();
    let (decision_id, [lisbon, _]) = create_scored_decision(&db);

    commands::cmd_decision_complete(&db, decision_id, lisbon).unwrap();
    let decision = db.get_decision(decision_id).unwrap().unwrap();
    assert_eq!(decision.status, DecisionStatus::Completed);
    assert_eq!(decision.selected_option_id, Some(lisbon));

    commands::cmd_decision_archive(&db, decision_id).unwrap();
    commands::cmd_decision_reactivate(&db, decision_id).unwrap();
    let decision = db.get_decision(decision_id).unwrap().unwrap();
    assert_eq!(decision.status, DecisionStatus::Active);

    commands::cmd_decision_delete(&db, decision_id).unwrap();
    assert!(db.list_decisions(None).unwrap().is_empty());
}

// ========== Factor / Option / Score Tests ==========

#[test]
fn test_cmd_factor_add_parses_direction() {
    let db = setup_test_db();
    let decision_id = db.create_decision("Laptop", None).unwrap();

    commands::cmd_factor_add(&db, decision_id, "Weight", 0.5, "lower").unwrap();
    let factors = db.list_factors(decision_id).unwrap();
    assert_eq!(factors[0].direction, PreferenceDirection::LowerIsBetter);

    let bad = commands::cmd_factor_add(&db, decision_id, "Price", 0.5, "sideways");
    assert!(bad.is_err());
}

#[test]
fn test_cmd_option_add_and_predict() {
    let db = setup_test_db();
    let decision_id = db.create_decision("Laptop", None).unwrap();

    commands::cmd_option_add(&db, decision_id, "ThinkPad", None).unwrap();
    let option = &db.list_options(decision_id).unwrap()[0];
    assert!(option.predicted_satisfaction.is_none());

    commands::cmd_option_predict(&db, option.id, 7.5).unwrap();
    let option = db.get_option(option.id).unwrap().unwrap();
    assert_eq!(option.predicted_satisfaction, Some(7.5));
}

#[test]
fn test_cmd_score_rejects_out_of_range() {
    let db = setup_test_db();
    let (decision_id, [lisbon, _]) = create_scored_decision(&db);
    let factor_id = db.list_factors(decision_id).unwrap()[0].id;

    assert!(commands::cmd_score(&db, lisbon, factor_id, 4, Some(0.8)).is_ok());
    assert!(commands::cmd_score(&db, lisbon, factor_id, 6, None).is_err());

    // Stored directly in the scores table
    let conn = db.conn().unwrap();
    let stored: u8 = conn
        .query_row(
            "SELECT score FROM factor_scores WHERE option_id = ?1 AND factor_id = ?2",
            rusqlite::params![lisbon, factor_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 4);
}

// ========== Recommendation Tests ==========

#[test]
fn test_cmd_recommend_caches_utilities() {
    let db = setup_test_db();
    let (decision_id, [lisbon, berlin]) = create_scored_decision(&db);

    commands::cmd_recommend(&db, decision_id, false).unwrap();
    commands::cmd_recommend(&db, decision_id, true).unwrap();

    let lisbon = db.get_option(lisbon).unwrap().unwrap();
    let berlin = db.get_option(berlin).unwrap().unwrap();
    assert!((lisbon.utility.unwrap() - 0.6).abs() < 1e-9);
    assert!((berlin.utility.unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn test_cmd_recommend_reports_validation() {
    let db = setup_test_db();
    let decision_id = db.create_decision("Unready", None).unwrap();

    let err = commands::cmd_recommend(&db, decision_id, false).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Cannot recommend"));
    assert!(message.contains("2 options"));
    assert!(message.contains("1 factor"));
}

#[test]
fn test_cmd_breakdown() {
    let db = setup_test_db();
    let (_, [lisbon, _]) = create_scored_decision(&db);

    assert!(commands::cmd_breakdown(&db, lisbon).is_ok());
    assert!(commands::cmd_breakdown(&db, 999).is_err());
}

// ========== Outcome & Insight Tests ==========

#[tokio::test]
async fn test_cmd_outcome_generates_first_insight() {
    let db = setup_test_db();
    let (decision_id, [lisbon, _]) = create_scored_decision(&db);
    db.complete_decision(decision_id, lisbon).unwrap();

    commands::cmd_outcome(
        &db,
        &EngineConfig::default(),
        decision_id,
        7.0,
        -1,
        Some("Rainier than expected".to_string()),
    )
    .await
    .unwrap();

    let insights = db.list_insights_for_decision(decision_id).unwrap();
    assert_eq!(insights.len(), 1);
    assert!(insights[0].description.contains("first outcome"));

    let stats = db.get_or_create_user_stats().unwrap();
    assert_eq!(stats.total_outcomes, 1);
    assert_eq!(stats.current_streak, 1);
}

#[tokio::test]
async fn test_cmd_outcome_twice_fails() {
    let db = setup_test_db();
    let decision_id = db.create_decision("Haircut", None).unwrap();
    let config = EngineConfig::default();

    commands::cmd_outcome(&db, &config, decision_id, 5.0, 0, None)
        .await
        .unwrap();
    let again = commands::cmd_outcome(&db, &config, decision_id, 6.0, 0, None).await;
    assert!(format!("{:#}", again.unwrap_err()).contains("already has an outcome"));
}

#[tokio::test]
async fn test_cmd_insights_read_and_dismiss() {
    let db = setup_test_db();
    let decision_id = db.create_decision("Haircut", None).unwrap();
    commands::cmd_outcome(&db, &EngineConfig::default(), decision_id, 5.0, 0, None)
        .await
        .unwrap();

    let id = db.list_unread_insights().unwrap()[0].id;
    assert!(commands::cmd_insights_list(&db, false).is_ok());
    assert!(commands::cmd_insights_decision(&db, decision_id).is_ok());

    commands::cmd_insights_read(&db, id).unwrap();
    commands::cmd_insights_read(&db, id).unwrap();
    assert_eq!(db.get_or_create_user_stats().unwrap().insights_read, 1);

    commands::cmd_insights_dismiss(&db, id).unwrap();
    assert!(db.list_insights_for_decision(decision_id).unwrap().is_empty());
    assert!(commands::cmd_insights_list(&db, true).is_ok());

    assert!(commands::cmd_insights_read(&db, 999).is_err());
}

// ========== Status & Progress Tests ==========

#[test]
fn test_cmd_progress() {
    let db = setup_test_db();
    commands::cmd_decision_new(&db, "Anything", None).unwrap();

    assert!(commands::cmd_progress(&db, false).is_ok());
    assert!(commands::cmd_progress(&db, true).is_ok());
}

#[test]
fn test_cmd_init_and_status_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ponder.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());
    assert!(commands::cmd_status(&path, true).is_ok());

    let db = commands::open_db(&path, true).unwrap();
    assert!(!db.is_encrypted().unwrap());
}

#[test]
fn test_load_config_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[history]\nlimit = 20\n").unwrap();

    let config = commands::load_config(Some(&path)).unwrap();
    assert_eq!(config.history_limit, 20);

    std::fs::write(&path, "[history]\nlimit = 0\n").unwrap();
    assert!(commands::load_config(Some(&path)).is_err());

    let missing = dir.path().join("engine.tmol");
    let err = commands::load_config(Some(&missing)).unwrap_err();
    assert!(format!("{:#}", err).contains("Config file not found"));
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is too long", 10), "this is...");
    assert_eq!(truncate("éééééééééééé", 6), "ééé...");
}
