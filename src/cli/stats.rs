use anyhow::Result;

use daybook::config::DaybookConfig;

/// Display one actor's memory statistics in the terminal.
pub fn stats(config: &DaybookConfig, actor: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = daybook::db::open_database(&db_path)?;

    let response = daybook::memory::stats::memory_stats(&conn, actor, Some(&db_path))?;

    println!("Memory Statistics: {actor}");
    println!("{}", "=".repeat(40));
    println!("  Journal entries:     {}", response.journal_entries);
    println!("  Episodic summaries:  {}", response.episodic_summaries);
    println!("  Open loops:          {}", response.open_loops);
    println!(
        "  Preferences:         {} active, {} revoked",
        response.active_preferences, response.revoked_preferences
    );
    println!();

    println!("Check-ins:");
    for status in ["pending", "snoozed", "dismissed", "done"] {
        let count = response
            .suggestions_by_status
            .get(status)
            .copied()
            .unwrap_or(0);
        println!("  {:<12} {}", status, count);
    }
    println!();

    println!("Audit entries:         {}", response.audit_entries);
    println!("Database size:         {} bytes", response.db_size_bytes);

    if let Some(ref oldest) = response.oldest_entry {
        println!("Oldest entry:          {oldest}");
    }
    if let Some(ref newest) = response.newest_entry {
        println!("Newest entry:          {newest}");
    }

    Ok(())
}
