//! CLI `checkins` commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use daybook::checkin::{list_active, run_daily_scheduler};
use daybook::config::DaybookConfig;

/// Run the daily scheduler once, as a cron job would.
pub fn run(config: &DaybookConfig, at: Option<&str>) -> Result<()> {
    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at timestamp: {raw}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let mut conn = daybook::db::open_database(config.resolved_db_path())?;
    let run = run_daily_scheduler(&mut conn, now)?;

    println!(
        "Scheduler run at {}: processed {}, created {}, failed {}",
        now.to_rfc3339(),
        run.processed,
        run.created,
        run.failed
    );
    Ok(())
}

/// Print active suggestions for one actor.
pub fn list(config: &DaybookConfig, actor: &str) -> Result<()> {
    let conn = daybook::db::open_database(config.resolved_db_path())?;
    let suggestions = list_active(&conn, actor, Utc::now())?;

    if suggestions.is_empty() {
        println!("No active check-ins for {actor}.");
        return Ok(());
    }

    for s in &suggestions {
        println!("  {} [{}] {}", s.id, s.status, s.message);
        for open_loop in &s.reason_details.open_loops {
            println!("     - {}", super::preview(&open_loop.loop_text, 100));
        }
        if let Some(days) = s.reason_details.inactivity_days {
            println!("     inactive for {days} day(s)");
        }
    }
    Ok(())
}
