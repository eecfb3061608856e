//! Database access layer with connection pooling and schema setup
//!
//! This module is organized by domain:
//! - `decisions` - Decisions, factors, options and factor scores
//! - `outcomes` - Outcome logging and the history joins the engines read
//! - `insights` - Insight persistence, read/dismiss state
//! - `user_stats` - The single user-statistics row

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod decisions;
mod insights;
mod outcomes;
mod user_stats;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "PONDER_DB_KEY";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"ponder-salt-v1-x";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a timestamp the way SQLite's CURRENT_TIMESTAMP does
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

pub(crate) fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `PONDER_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `PONDER_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `PONDER_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager = manager.with_init(|conn| {
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(())
            });
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "ponder_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path.to_string_lossy())
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block writers, so engines can read
            -- history while another connection writes insights
            PRAGMA journal_mode = WAL;

            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Decisions (soft-deleted, never removed)
            CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'active',    -- active, completed, archived
                selected_option_id INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                decided_at DATETIME,
                deleted BOOLEAN NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_decisions_status ON decisions(status, deleted);

            -- Factors (weighted criteria)
            CREATE TABLE IF NOT EXISTS factors (
                id INTEGER PRIMARY KEY,
                decision_id INTEGER NOT NULL REFERENCES decisions(id),
                name TEXT NOT NULL,
                weight REAL NOT NULL,
                direction TEXT NOT NULL DEFAULT 'higher_is_better',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_factors_decision ON factors(decision_id);

            -- Options (alternatives)
            CREATE TABLE IF NOT EXISTS options (
                id INTEGER PRIMARY KEY,
                decision_id INTEGER NOT NULL REFERENCES decisions(id),
                name TEXT NOT NULL,
                utility REAL,                             -- cached by the utility engine
                predicted_satisfaction REAL,              -- 0-10
                selected BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_options_decision ON options(decision_id);

            -- Factor scores (option x factor, Likert 1-5)
            CREATE TABLE IF NOT EXISTS factor_scores (
                option_id INTEGER NOT NULL REFERENCES options(id),
                factor_id INTEGER NOT NULL REFERENCES factors(id),
                score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
                confidence REAL,
                PRIMARY KEY (option_id, factor_id)
            );

            CREATE INDEX IF NOT EXISTS idx_factor_scores_factor ON factor_scores(factor_id);

            -- Outcomes (one per decision)
            CREATE TABLE IF NOT EXISTS outcomes (
                id INTEGER PRIMARY KEY,
                decision_id INTEGER NOT NULL UNIQUE REFERENCES decisions(id),
                logged_at DATETIME NOT NULL,
                satisfaction REAL NOT NULL,               -- 0-10
                surprise INTEGER NOT NULL DEFAULT 0,      -- -3..3
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_outcomes_logged ON outcomes(logged_at);

            -- Insights (soft-deleted, never purged)
            CREATE TABLE IF NOT EXISTS insights (
                id INTEGER PRIMARY KEY,
                insight_type TEXT NOT NULL,               -- correlation, bias_detection, accuracy_tracking, ...
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority INTEGER NOT NULL,                -- 1 (highest) - 5 (lowest)
                is_read BOOLEAN NOT NULL DEFAULT 0,
                is_dismissed BOOLEAN NOT NULL DEFAULT 0,
                metadata TEXT NOT NULL,                   -- JSON: InsightMetadata
                decision_id INTEGER REFERENCES decisions(id),
                generated_at DATETIME NOT NULL,
                deleted BOOLEAN NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_insights_unread ON insights(is_read, is_dismissed, deleted);
            CREATE INDEX IF NOT EXISTS idx_insights_decision ON insights(decision_id);

            -- User statistics (exactly one row, id = 1)
            CREATE TABLE IF NOT EXISTS user_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_decisions INTEGER NOT NULL DEFAULT 0,
                total_outcomes INTEGER NOT NULL DEFAULT 0,
                insights_generated INTEGER NOT NULL DEFAULT 0,
                insights_read INTEGER NOT NULL DEFAULT 0,
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_log_day DATE,
                accuracy_total INTEGER NOT NULL DEFAULT 0,
                accuracy_correct INTEGER NOT NULL DEFAULT 0,
                accuracy_mean_error REAL NOT NULL DEFAULT 0,
                badges TEXT NOT NULL DEFAULT '[]',        -- JSON: [Badge]
                first_decision_at DATETIME,
                last_active_at DATETIME
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let decisions = db.list_decisions(None).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.run_migrations().unwrap();

        let conn = db.conn().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('decisions', 'factors', 'options', 'factor_scores', 'outcomes', 'insights', 'user_stats')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }

    #[test]
    fn test_datetime_format_roundtrip() {
        let dt = chrono::NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
            .and_utc();
        assert_eq!(format_datetime(&dt), "2026-03-14 09:26:53");
        assert_eq!(parse_datetime(&format_datetime(&dt)), dt);
    }

    #[test]
    fn test_derive_key_is_stable() {
        let a = derive_key("correct horse").unwrap();
        let b = derive_key("correct horse").unwrap();
        let c = derive_key("battery staple").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
