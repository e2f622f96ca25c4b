mod helpers;

use daybook::error::EngineError;
use daybook::memory::forget::delete_memory;
use daybook::memory::preference::{
    get_preference, list_active_preferences, write_preference_memory, PreferenceWrite,
};
use daybook::memory::types::MemoryType;
use daybook::redact::MASK;
use helpers::{at, test_db};

fn write(key: &str, value: serde_json::Value, consent: bool) -> PreferenceWrite {
    PreferenceWrite {
        user_id: "u1".into(),
        key: key.into(),
        value,
        source: None,
        consent_granted: consent,
        consent_given_at: None,
    }
}

#[test]
fn one_row_per_user_and_key() {
    let conn = test_db();
    let first = write_preference_memory(&conn, &write("tone", "gentle".into(), true), at(10, 9)).unwrap();
    let second = write_preference_memory(&conn, &write("tone", "direct".into(), true), at(11, 9)).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, serde_json::json!("direct"));
    assert_eq!(second.created_at, at(10, 9));
    assert_eq!(second.updated_at, at(11, 9));
    assert_eq!(second.consent_given_at, at(11, 9));
    assert_eq!(list_active_preferences(&conn, "u1").unwrap().len(), 1);
}

#[test]
fn rewriting_a_revoked_preference_restores_it() {
    let mut conn = test_db();
    let pref = write_preference_memory(&conn, &write("tone", "gentle".into(), true), at(10, 9)).unwrap();
    delete_memory(&mut conn, "u1", MemoryType::Preference, &pref.id, at(10, 10)).unwrap();
    assert!(list_active_preferences(&conn, "u1").unwrap().is_empty());

    let restored = write_preference_memory(&conn, &write("tone", "calm".into(), true), at(11, 9)).unwrap();
    assert_eq!(restored.id, pref.id);
    assert!(restored.revoked_at.is_none());
}

#[test]
fn consent_is_required_and_nothing_is_stored_without_it() {
    let conn = test_db();
    let err = write_preference_memory(&conn, &write("tone", "gentle".into(), false), at(10, 9)).unwrap_err();
    assert!(matches!(err, EngineError::ConsentRequired));
    assert!(get_preference(&conn, "u1", "tone").unwrap().is_none());
}

#[test]
fn values_are_redacted_before_storage() {
    let conn = test_db();
    let value = serde_json::json!({
        "contact": "reach me at sam@example.com",
        "password": "hunter2",
        "days": ["mon", "wed"],
    });
    let pref = write_preference_memory(&conn, &write("contact_prefs", value, true), at(10, 9)).unwrap();

    assert_eq!(pref.value["contact"], "reach me at [REDACTED:EMAIL]");
    assert_eq!(pref.value["password"], MASK);
    assert_eq!(pref.value["days"], serde_json::json!(["mon", "wed"]));

    let stored = get_preference(&conn, "u1", "contact_prefs").unwrap().unwrap();
    assert_eq!(stored.value, pref.value);
}

#[test]
fn blank_keys_are_rejected() {
    let conn = test_db();
    let err = write_preference_memory(&conn, &write("   ", "x".into(), true), at(10, 9)).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
