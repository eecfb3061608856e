//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `decisions` - Decisions, factors, options, scores and recommendations
//! - `insights` - Outcome logging and insight review
//! - `status` - Database status and progress

pub mod core;
pub mod decisions;
pub mod insights;
pub mod status;

// Re-export command functions for main.rs
pub use core::*;
pub use decisions::*;
pub use insights::*;
pub use status::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
