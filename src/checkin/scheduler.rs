//! Suggestion generation, listing and user actions.
//!
//! Generation is capped per UTC day and must be justified by at least one
//! signal: an open loop from a recent summary, or journal inactivity.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::checkin::settings::{get_settings, list_proactive_users};
use crate::checkin::suggestion::{
    count_created_between, find_suggestion, insert_suggestion, query_active, set_status,
    CheckInAction, CheckInStatus, CheckInSuggestion, OpenLoopRef, ReasonDetails,
};
use crate::error::{EngineError, EngineResult};
use crate::journal::latest_entry_at;
use crate::memory::audit::{actions, write_audit_log};
use crate::memory::episodic::list_recent_summaries;
use crate::memory::types::EntityType;
use crate::redact::redact_text;

pub const LOOKBACK_DAYS: i64 = 7;
pub const MAX_SOURCE_SUMMARIES: usize = 10;
pub const MAX_OPEN_LOOPS: usize = 3;
pub const MAX_ACTIVE: usize = 5;
pub const SNOOZE_DAYS_RANGE: (u32, u32) = (1, 30);

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const GENERIC_MESSAGE: &str = "Quick check-in: how are you feeling today?";

/// Outcome of one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerRun {
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
}

fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Maybe create one suggestion for `user_id`.
///
/// Returns `None` when check-ins are disabled, the daily cap is reached, or no
/// signal fired.
pub fn generate_suggestion(
    conn: &mut Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<Option<CheckInSuggestion>> {
    let settings = get_settings(conn, user_id, now)?;
    if !settings.proactive_check_ins {
        return Ok(None);
    }

    let day_start = start_of_utc_day(now);
    let created_today = count_created_between(conn, user_id, day_start, day_start + Duration::days(1))?;
    if created_today >= settings.check_in_max_per_day {
        tracing::debug!(created_today, "daily check-in cap reached");
        return Ok(None);
    }

    let open_loops: Vec<OpenLoopRef> =
        list_recent_summaries(conn, user_id, now - Duration::days(LOOKBACK_DAYS), MAX_SOURCE_SUMMARIES)?
            .into_iter()
            .flat_map(|summary| {
                let summary_id = summary.id;
                let text = summary.summary;
                summary.open_loops.into_iter().map(move |loop_text| OpenLoopRef {
                    summary_id: summary_id.clone(),
                    summary: text.clone(),
                    loop_text,
                })
            })
            .take(MAX_OPEN_LOOPS)
            .collect();

    let threshold = i64::from(settings.check_in_inactivity_days);
    let inactivity_days = match latest_entry_at(conn, user_id)? {
        Some(last) => (now - last).num_milliseconds().div_euclid(DAY_MS),
        None => threshold,
    };
    let is_inactive = inactivity_days >= threshold;

    if open_loops.is_empty() && !is_inactive {
        return Ok(None);
    }

    let mut why_parts = Vec::new();
    if !open_loops.is_empty() {
        let n = open_loops.len();
        why_parts.push(format!(
            "You have {n} open loop{} from recent summaries.",
            if n == 1 { "" } else { "s" }
        ));
    }
    if is_inactive {
        why_parts.push(format!(
            "No journal entries in the last {inactivity_days} day{}.",
            if inactivity_days == 1 { "" } else { "s" }
        ));
    }

    let message = match open_loops.first() {
        Some(first) => redact_text(&format!("Quick check-in: {}", first.loop_text)),
        None => GENERIC_MESSAGE.to_string(),
    };

    let mut source_summary_ids: Vec<String> = Vec::new();
    for open_loop in &open_loops {
        if !source_summary_ids.contains(&open_loop.summary_id) {
            source_summary_ids.push(open_loop.summary_id.clone());
        }
    }

    let reason_details = ReasonDetails {
        open_loops,
        inactivity_days: is_inactive.then_some(inactivity_days),
        source_summary_ids,
    };

    let tx = conn.transaction()?;
    let suggestion = insert_suggestion(&tx, user_id, &message, &why_parts.join(" "), &reason_details, now)?;
    write_audit_log(
        &tx,
        user_id,
        actions::CHECKIN_CREATED,
        EntityType::CheckInSuggestion,
        Some(&suggestion.id),
        Some(&serde_json::json!({
            "sourceSummaryIds": reason_details.source_summary_ids,
            "inactivityDays": reason_details.inactivity_days,
        })),
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        suggestion_id = %suggestion.id,
        open_loops = suggestion.reason_details.open_loops.len(),
        inactive = is_inactive,
        "checkin.created"
    );

    Ok(Some(suggestion))
}

/// Suggestions the user should currently see, newest first, at most five.
pub fn list_active(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<Vec<CheckInSuggestion>> {
    query_active(conn, user_id, now, MAX_ACTIVE)
}

fn clamp_snooze_days(days: Option<u32>) -> u32 {
    let (min, max) = SNOOZE_DAYS_RANGE;
    days.unwrap_or(min).clamp(min, max)
}

/// Apply a user action. `None` when the suggestion is missing or not owned.
pub fn apply_action(
    conn: &mut Connection,
    user_id: &str,
    suggestion_id: &str,
    action: CheckInAction,
    snooze_days: Option<u32>,
    now: DateTime<Utc>,
) -> EngineResult<Option<CheckInSuggestion>> {
    let tx = conn.transaction()?;

    let Some(current) = find_suggestion(&tx, user_id, suggestion_id)? else {
        return Ok(None);
    };
    if !current.is_effectively_pending(now) {
        return Err(EngineError::InvalidTransition {
            from: current.status.to_string(),
            action: action.as_str().to_string(),
        });
    }

    let (next_status, audit_action) = action.transition();
    let snooze_days = clamp_snooze_days(snooze_days);
    let snoozed_until = (next_status == CheckInStatus::Snoozed)
        .then(|| now + Duration::days(i64::from(snooze_days)));

    let updated = set_status(&tx, suggestion_id, next_status, snoozed_until, now)?;

    let mut metadata = serde_json::json!({
        "previousStatus": current.status,
        "nextStatus": updated.status,
    });
    if next_status == CheckInStatus::Snoozed {
        metadata["snoozeDays"] = snooze_days.into();
    }
    write_audit_log(
        &tx,
        user_id,
        audit_action,
        EntityType::CheckInSuggestion,
        Some(suggestion_id),
        Some(&metadata),
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        suggestion_id,
        from = %current.status,
        to = %updated.status,
        "check-in action applied"
    );
    Ok(Some(updated))
}

/// Run generation for every opted-in user. One user's failure never stops the batch.
pub fn run_daily_scheduler(conn: &mut Connection, now: DateTime<Utc>) -> EngineResult<SchedulerRun> {
    let users = list_proactive_users(conn)?;
    let mut run = SchedulerRun {
        processed: users.len(),
        ..SchedulerRun::default()
    };

    for user_id in &users {
        match generate_suggestion(conn, user_id, now) {
            Ok(Some(_)) => run.created += 1,
            Ok(None) => {}
            Err(e) => {
                run.failed += 1;
                tracing::warn!(user_id = %user_id, error = %e, "checkin.scheduler.user_failed");
            }
        }
    }

    tracing::info!(
        processed = run.processed,
        created = run.created,
        failed = run.failed,
        "check-in scheduler finished"
    );
    Ok(run)
}
