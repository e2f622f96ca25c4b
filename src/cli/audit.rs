//! CLI `audit` command: print the newest audit events for an actor.

use anyhow::{anyhow, Result};

use daybook::config::DaybookConfig;
use daybook::memory::audit::list_audit_log;
use daybook::memory::types::EntityType;

pub fn audit(
    config: &DaybookConfig,
    actor: &str,
    entity_type: Option<&str>,
    limit: usize,
) -> Result<()> {
    let entity_type = entity_type
        .map(|raw| raw.parse::<EntityType>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let db_path = config.resolved_db_path();
    let conn = daybook::db::open_database(&db_path)?;
    let events = list_audit_log(&conn, actor, entity_type, limit)?;

    if events.is_empty() {
        println!("No audit events for {actor}.");
        return Ok(());
    }

    println!("Audit log: {actor}");
    println!("{}", "=".repeat(50));
    for event in &events {
        let details = event
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default();
        println!(
            "  {} [{}] {} {} {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.action,
            event.entity_type,
            event.entity_id.as_deref().unwrap_or("-"),
            details,
        );
    }

    Ok(())
}
