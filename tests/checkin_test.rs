mod helpers;

use daybook::checkin::{
    apply_action, generate_suggestion, get_settings, list_active, run_daily_scheduler,
    CheckInAction, CheckInStatus,
};
use daybook::error::EngineError;
use daybook::memory::audit::{actions, list_audit_log};
use daybook::memory::types::EntityType;
use daybook::pipeline::record_entry;
use helpers::{at, enable_checkins, journal, test_db};

const LOOP_ENTRY: &str = "Client meeting went well. Need to follow up on the contract.";

#[test]
fn open_loop_entry_produces_one_suggestion_per_day() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "u1", 1, 3, at(10, 8));

    let first = record_entry(&mut conn, "u1", LOOP_ENTRY, at(10, 9)).unwrap();
    let suggestion = first.outcome.suggestion.expect("open loop should suggest");
    assert_eq!(suggestion.message, "Quick check-in: Need to follow up on the contract.");
    assert_eq!(suggestion.why, "You have 1 open loop from recent summaries.");
    assert_eq!(suggestion.status, CheckInStatus::Pending);
    assert_eq!(suggestion.reason_details.inactivity_days, None);
    assert_eq!(
        suggestion.reason_details.source_summary_ids,
        vec![first.outcome.episodic.summary.id.clone()]
    );

    let second = record_entry(&mut conn, "u1", "Should call mom later.", at(10, 18)).unwrap();
    assert!(second.outcome.suggestion.is_none(), "daily cap of one");

    // a new UTC day resets the cap
    let next_day = generate_suggestion(&mut conn, "u1", at(11, 9)).unwrap().unwrap();
    assert_eq!(next_day.message, "Quick check-in: Should call mom later.");
    assert_eq!(next_day.reason_details.open_loops.len(), 2);
}

#[test]
fn disabled_users_never_get_suggestions() {
    let mut conn = test_db();
    assert!(!get_settings(&conn, "u1", at(10, 8)).unwrap().proactive_check_ins);

    let processed = record_entry(&mut conn, "u1", LOOP_ENTRY, at(10, 9)).unwrap();
    assert!(processed.outcome.suggestion.is_none());
    assert!(generate_suggestion(&mut conn, "u1", at(20, 9)).unwrap().is_none());
}

#[test]
fn inactivity_alone_triggers_generic_message() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "u1", 1, 3, at(1, 8));
    journal(&mut conn, "u1", "Calm day at home.", at(1, 9));

    // two and a half days is not enough
    assert!(generate_suggestion(&mut conn, "u1", at(3, 21)).unwrap().is_none());

    let suggestion = generate_suggestion(&mut conn, "u1", at(5, 10)).unwrap().unwrap();
    assert_eq!(suggestion.message, "Quick check-in: how are you feeling today?");
    assert_eq!(suggestion.why, "No journal entries in the last 4 days.");
    assert_eq!(suggestion.reason_details.inactivity_days, Some(4));
    assert!(suggestion.reason_details.open_loops.is_empty());
}

#[test]
fn snoozed_suggestion_resurfaces_after_snooze() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "u1", 1, 3, at(10, 8));
    let suggestion = record_entry(&mut conn, "u1", LOOP_ENTRY, at(10, 9))
        .unwrap()
        .outcome
        .suggestion
        .unwrap();

    let snoozed = apply_action(&mut conn, "u1", &suggestion.id, CheckInAction::Snooze, Some(2), at(10, 10))
        .unwrap()
        .unwrap();
    assert_eq!(snoozed.status, CheckInStatus::Snoozed);
    assert_eq!(snoozed.snoozed_until, Some(at(12, 10)));

    assert!(list_active(&conn, "u1", at(11, 10)).unwrap().is_empty());
    let visible = list_active(&conn, "u1", at(12, 10)).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, suggestion.id);

    let done = apply_action(&mut conn, "u1", &suggestion.id, CheckInAction::Done, None, at(12, 11))
        .unwrap()
        .unwrap();
    assert_eq!(done.status, CheckInStatus::Done);
    assert_eq!(done.snoozed_until, None);

    let err = apply_action(&mut conn, "u1", &suggestion.id, CheckInAction::Dismiss, None, at(12, 12))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert_eq!(err.status_code(), 409);

    let trail: Vec<String> = list_audit_log(&conn, "u1", Some(EntityType::CheckInSuggestion), 20)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        trail,
        vec![actions::CHECKIN_DONE, actions::CHECKIN_SNOOZED, actions::CHECKIN_CREATED]
    );
}

#[test]
fn actions_on_foreign_suggestions_are_misses() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "u1", 1, 3, at(10, 8));
    let suggestion = record_entry(&mut conn, "u1", LOOP_ENTRY, at(10, 9))
        .unwrap()
        .outcome
        .suggestion
        .unwrap();

    assert!(apply_action(&mut conn, "u2", &suggestion.id, CheckInAction::Done, None, at(10, 10))
        .unwrap()
        .is_none());
    assert_eq!(list_active(&conn, "u1", at(10, 10)).unwrap().len(), 1);
}

#[test]
fn scheduler_covers_only_opted_in_users() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "active", 1, 3, at(10, 8));
    enable_checkins(&mut conn, "quiet", 1, 3, at(10, 8));
    journal(&mut conn, "active", LOOP_ENTRY, at(10, 9));
    journal(&mut conn, "quiet", "Nice walk.", at(10, 9));
    journal(&mut conn, "opted-out", LOOP_ENTRY, at(10, 9));

    let run = run_daily_scheduler(&mut conn, at(11, 6)).unwrap();
    assert_eq!(run.processed, 2);
    assert_eq!(run.created, 1);
    assert_eq!(run.failed, 0);

    // same day again: cap holds
    let rerun = run_daily_scheduler(&mut conn, at(11, 7)).unwrap();
    assert_eq!(rerun.created, 0);

    assert!(list_active(&conn, "opted-out", at(11, 8)).unwrap().is_empty());
    assert!(list_active(&conn, "quiet", at(11, 8)).unwrap().is_empty());
}

#[test]
fn one_failing_user_does_not_stop_the_scheduler() {
    let mut conn = test_db();
    enable_checkins(&mut conn, "healthy", 1, 3, at(10, 8));
    enable_checkins(&mut conn, "broken", 1, 3, at(10, 8));
    journal(&mut conn, "healthy", LOOP_ENTRY, at(10, 9));
    journal(&mut conn, "broken", LOOP_ENTRY, at(10, 9));
    conn.execute(
        "UPDATE episodic_summaries SET open_loops = 'not json' WHERE user_id = 'broken'",
        [],
    )
    .unwrap();

    let run = run_daily_scheduler(&mut conn, at(11, 6)).unwrap();
    assert_eq!(run.processed, 2);
    assert_eq!(run.created, 1);
    assert_eq!(run.failed, 1);

    assert_eq!(list_active(&conn, "healthy", at(11, 7)).unwrap().len(), 2);
    let broken_created: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM checkin_suggestions WHERE user_id = 'broken' AND created_at >= ?1",
            ["2026-10-11T00:00:00.000Z"],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(broken_created, 0);
}
