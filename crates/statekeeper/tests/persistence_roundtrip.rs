use std::fs;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde_json::Value;
use statekeeper::clock::FixedClock;
use statekeeper::config::EngineConfig;
use statekeeper::notify::MemoryNotifier;
use statekeeper::persistence::{JsonFileStore, PersistenceError, SnapshotStore};
use statekeeper::workflows::compliance::{
    AuditDraft, AuditEntryType, Frequency, NewComplianceItem, NewStateProfile, RecurrencePattern,
};
use statekeeper::workflows::ComplianceEngine;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date")
}

fn populated_engine(clock: Arc<FixedClock>) -> ComplianceEngine {
    let mut engine = ComplianceEngine::new(
        &EngineConfig::default(),
        clock,
        Arc::new(MemoryNotifier::default()),
        "nurse@example.com",
    );
    let texas = engine
        .registry_mut()
        .create_state(NewStateProfile::new("Texas", "TX"))
        .expect("state created");
    let ohio = engine
        .registry_mut()
        .create_state(NewStateProfile::new("Ohio", "OH"))
        .expect("state created");
    let item = engine
        .registry_mut()
        .scheduler()
        .add_item(
            &texas.id,
            NewComplianceItem::new("Monthly monitoring report", today())
                .recurring(RecurrencePattern::new(Frequency::Monthly, 1).ending_after(6)),
        )
        .expect("item added");
    engine
        .complete_item(&texas.id, &item.id, Some("uploaded".into()))
        .expect("completed");
    engine
        .registry_mut()
        .record_event(
            &texas.id,
            AuditDraft::new("Board Request", "Board asked for employer letter")
                .with_kind(AuditEntryType::Request)
                .effective_on(today() - Duration::days(4)),
        )
        .expect("event recorded");
    engine
        .registry_mut()
        .delete_state(&ohio.id)
        .expect("state deleted");
    engine
}

#[test]
fn engine_state_survives_a_restart() {
    let dir = TempDir::new().expect("temp dir");
    let store = JsonFileStore::new(dir.path());
    let clock = Arc::new(FixedClock::on(today()));
    let engine = populated_engine(clock.clone());

    engine.flush(&store).expect("flushed");
    let restored = ComplianceEngine::hydrate(
        &store,
        &EngineConfig::default(),
        clock.clone(),
        Arc::new(MemoryNotifier::default()),
        "nurse@example.com",
    )
    .expect("hydrated");

    assert_eq!(restored.snapshot(), engine.snapshot());
    assert_eq!(restored.gamification().data(), engine.gamification().data());
    assert_eq!(restored.registry().archived_audit().len(), 1);

    let someone_else = ComplianceEngine::hydrate(
        &store,
        &EngineConfig::default(),
        clock,
        Arc::new(MemoryNotifier::default()),
        "auditor",
    )
    .expect("hydrated");
    assert_eq!(someone_else.gamification().data().points, 0);
    assert_eq!(someone_else.registry().states().len(), 1);
}

#[test]
fn registry_file_uses_camel_case_fields() {
    let dir = TempDir::new().expect("temp dir");
    let store = JsonFileStore::new(dir.path());
    let engine = populated_engine(Arc::new(FixedClock::on(today())));
    engine.flush(&store).expect("flushed");

    let raw = fs::read_to_string(store.registry_path()).expect("registry written");
    let json: Value = serde_json::from_str(&raw).expect("valid json");

    let state = &json["states"][0];
    assert_eq!(state["abbreviation"], "TX");
    let items = state["complianceItems"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["recurrencePattern"]["frequency"], "monthly");
    assert_eq!(items[0]["recurrencePattern"]["endAfterOccurrences"], 6);
    assert_eq!(items[0]["completedOn"], "2024-07-01");
    assert_eq!(items[1]["parentTaskId"], items[0]["id"]);
    let request = state["auditLog"]
        .as_array()
        .expect("audit log")
        .iter()
        .find(|entry| entry["type"] == "request")
        .expect("request entry");
    assert_eq!(request["date"], "2024-06-27");
    assert_eq!(json["archivedAudit"][0]["action"], "State Deleted");
    assert!(!dir.path().join("registry.json.tmp").exists());
}

#[test]
fn corrupt_registry_is_reported_not_ignored() {
    let dir = TempDir::new().expect("temp dir");
    let store = JsonFileStore::new(dir.path());
    fs::write(store.registry_path(), "{\"states\": [").expect("write");

    let err = ComplianceEngine::hydrate(
        &store,
        &EngineConfig::default(),
        Arc::new(FixedClock::on(today())),
        Arc::new(MemoryNotifier::default()),
        "nurse@example.com",
    )
    .expect_err("corrupt file");

    assert!(matches!(err, PersistenceError::Serde { .. }));
    assert!(store.load_gamification("nurse@example.com").expect("load").is_none());
}
