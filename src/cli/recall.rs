use anyhow::Result;

use daybook::config::DaybookConfig;
use daybook::memory::recall::recall as recall_memories;

/// Run a recall query from the terminal.
pub fn recall(config: &DaybookConfig, actor: &str, query: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = daybook::db::open_database(&db_path)?;

    let items = recall_memories(&conn, actor, query)?;

    if items.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    println!("Found {} memory item(s) for {actor}\n", items.len());

    for (i, item) in items.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({}, {})",
            i + 1,
            item.memory_type,
            item.id,
            item.reason,
            item.source_date.format("%Y-%m-%d"),
        );
        println!("     {}", super::preview(&item.content, 120));
        println!("     why: {}", item.why_shown);
        println!();
    }

    Ok(())
}
