//! CLI `reset` command: forget every memory for one actor after confirmation.

use anyhow::{bail, Result};
use chrono::Utc;
use std::io::Write;

use daybook::config::DaybookConfig;
use daybook::memory::forget::delete_all_memories;

/// Delete summaries and revoke preferences for `actor`. Journal entries stay.
pub fn reset(config: &DaybookConfig, actor: &str) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("WARNING: This deletes all episodic summaries and revokes all preferences for {actor}.");
    println!("Database: {}", db_path.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let mut conn = daybook::db::open_database(&db_path)?;
    let result = delete_all_memories(&mut conn, actor, Utc::now())?;

    println!(
        "Deleted {} summaries, revoked {} preferences.",
        result.episodic_deleted, result.preferences_revoked
    );
    Ok(())
}
