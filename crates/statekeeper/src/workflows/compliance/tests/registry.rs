use super::common::*;
use crate::workflows::compliance::{
    AuditDraft, AuditEntryType, AuditQuery, DocumentCategory, NewDocument, NewStateProfile,
    StatePatch, StateRegistry, StateStatus,
};
use crate::workflows::errors::{EngineError, EntityKind};

#[test]
fn create_state_normalizes_abbreviation_and_records_audit() {
    let (mut registry, _clock) = registry();

    let state = registry
        .create_state(NewStateProfile::new("  Texas ", " tx "))
        .expect("created");

    assert_eq!(state.name, "Texas");
    assert_eq!(state.abbreviation, "TX");
    assert_eq!(state.status, StateStatus::Active);
    assert_eq!(state.audit_log.len(), 1);
    assert_eq!(state.audit_log[0].action, "State Created");
    assert_eq!(state.audit_log[0].user, "analyst");
    assert_eq!(registry.states().len(), 1);
}

#[test]
fn create_state_rejects_blank_fields_without_mutating() {
    let (mut registry, _clock) = registry();

    let err = registry
        .create_state(NewStateProfile::new("", "TX"))
        .expect_err("blank name");
    assert!(err.is_validation());
    let err = registry
        .create_state(NewStateProfile::new("Texas", "  "))
        .expect_err("blank abbreviation");
    assert!(err.is_validation());
    assert!(registry.states().is_empty());
}

#[test]
fn create_state_rejects_duplicate_ids_and_dangling_links() {
    let (mut registry, _clock) = registry();
    registry
        .create_state(NewStateProfile::new("Texas", "TX").with_id("tx"))
        .expect("created");

    let duplicate = registry
        .create_state(NewStateProfile::new("Texas again", "TX").with_id("tx"))
        .expect_err("duplicate id");
    assert!(duplicate.is_validation());

    let dangling = registry
        .create_state(NewStateProfile::new("Oklahoma", "OK").reciprocal_of("nowhere"))
        .expect_err("dangling link");
    assert_eq!(
        dangling,
        EngineError::NotFound {
            entity: EntityKind::State,
            id: "nowhere".into(),
        }
    );
    assert_eq!(registry.states().len(), 1);
}

#[test]
fn abbreviation_lookup_is_case_insensitive_and_first_wins() {
    let (mut registry, _clock) = registry();
    let first = add_state(&mut registry, "Texas", "TX");
    add_state(&mut registry, "Texas (second board)", "tx");

    let found = registry.state_by_abbreviation("tX").expect("found");
    assert_eq!(found.id, first.id);
    assert!(registry.state_by_abbreviation("CA").is_none());
}

#[test]
fn update_state_lists_changed_fields() {
    let (mut registry, _clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");

    let updated = registry
        .update_state(
            &state.id,
            StatePatch {
                status: Some(StateStatus::Probation),
                name: Some("Texas".into()),
                ..StatePatch::default()
            },
        )
        .expect("updated");

    assert_eq!(updated.status, StateStatus::Probation);
    let last = updated.audit_log.last().expect("entry");
    assert_eq!(last.action, "State Updated");
    assert_eq!(last.description, "Updated status of Texas");
    assert_eq!(updated.audit_log.len(), 2);

    let missing = registry
        .update_state("missing", StatePatch::default())
        .expect_err("unknown");
    assert!(missing.is_not_found());
}

#[test]
fn delete_cascades_to_dependents_and_archives_audit() {
    let (mut registry, _clock) = registry();
    let primary = add_state(&mut registry, "Texas", "TX");
    let reciprocal = registry
        .create_state(NewStateProfile::new("Oklahoma", "OK").reciprocal_of(primary.id.clone()))
        .expect("reciprocal");
    let associated = registry
        .create_state(
            NewStateProfile::new("Kansas", "KS").associated_with(reciprocal.id.clone()),
        )
        .expect("associated");
    let unrelated = add_state(&mut registry, "Oregon", "OR");

    let removed = registry.delete_state(&primary.id).expect("deleted");

    assert_eq!(
        removed,
        vec![primary.id.clone(), reciprocal.id.clone(), associated.id.clone()]
    );
    assert_eq!(registry.states().len(), 1);
    assert_eq!(registry.states()[0].id, unrelated.id);

    let archived = registry.archived_audit();
    assert_eq!(archived.len(), 3);
    assert!(archived.iter().all(|entry| entry.action == "State Deleted"));
    assert!(archived[1].description.contains("in cascade from Texas (TX)"));

    let history = registry.audit_query(&AuditQuery::for_state(primary.id.clone()));
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "State Deleted");
}

#[test]
fn delete_unknown_state_changes_nothing() {
    let (mut registry, _clock) = registry();
    add_state(&mut registry, "Texas", "TX");

    assert!(registry.delete_state("missing").expect_err("unknown").is_not_found());
    assert_eq!(registry.states().len(), 1);
    assert!(registry.archived_audit().is_empty());
}

#[test]
fn nested_records_each_write_one_audit_entry() {
    let (mut registry, _clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");

    let document = registry
        .add_document(
            &state.id,
            NewDocument {
                name: "Renewal receipt.pdf".into(),
                category: DocumentCategory::Correspondence,
                ..NewDocument::default()
            },
        )
        .expect("document");
    assert_eq!(document.uploaded_on, today());

    let note = registry
        .add_note(&state.id, "Called the board about CE hours")
        .expect("note");
    registry.remove_note(&state.id, &note.id).expect("removed note");
    registry
        .remove_document(&state.id, &document.id)
        .expect("removed document");

    let log = registry.audit_log(&state.id).expect("log");
    let actions: Vec<&str> = log.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "State Created",
            "Document Added",
            "Note Added",
            "Note Removed",
            "Document Removed"
        ]
    );
    assert_eq!(log[1].kind, Some(AuditEntryType::Submission));
    assert_eq!(log[1].date, Some(today()));
    assert!(registry.documents(&state.id).expect("docs").is_empty());
    assert!(registry.notes(&state.id).expect("notes").is_empty());
}

#[test]
fn nested_operations_validate_parent_and_child() {
    let (mut registry, _clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");

    assert!(registry
        .add_note("missing", "hello")
        .expect_err("unknown state")
        .is_not_found());
    assert!(registry
        .add_note(&state.id, "   ")
        .expect_err("blank note")
        .is_validation());
    assert_eq!(
        registry
            .remove_document(&state.id, "doc-1")
            .expect_err("unknown document"),
        EngineError::NotFound {
            entity: EntityKind::Document,
            id: "doc-1".into(),
        }
    );
    assert_eq!(registry.audit_log(&state.id).expect("log").len(), 1);
}

#[test]
fn record_event_appends_typed_entries() {
    let (mut registry, _clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");

    let entry = registry
        .record_event(
            &state.id,
            AuditDraft::new("Board Request", "Board asked for CE certificates")
                .with_kind(AuditEntryType::Request)
                .effective_on(date(2024, 2, 20))
                .by("board liaison"),
        )
        .expect("recorded");

    assert_eq!(entry.kind, Some(AuditEntryType::Request));
    assert_eq!(entry.date, Some(date(2024, 2, 20)));
    assert_eq!(entry.user, "board liaison");

    let blank = registry
        .record_event(&state.id, AuditDraft::new(" ", "nothing"))
        .expect_err("blank action");
    assert!(blank.is_validation());
}

#[test]
fn snapshot_rehydration_continues_the_sequence() {
    let (mut registry, clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");
    registry.add_note(&state.id, "first").expect("note");
    let last_sequence = registry
        .audit_log(&state.id)
        .expect("log")
        .last()
        .expect("entry")
        .sequence;

    let mut restored = StateRegistry::from_snapshot(
        registry.states().to_vec(),
        registry.archived_audit().to_vec(),
        clock,
        "analyst",
    )
    .expect("restored");
    let entry = restored
        .record_event(&state.id, AuditDraft::new("Follow Up", "after restart"))
        .expect("recorded");

    assert!(entry.sequence > last_sequence);
}

#[test]
fn snapshot_with_duplicate_ids_is_rejected() {
    let (mut registry, clock) = registry();
    let state = add_state(&mut registry, "Texas", "TX");
    let states = vec![state.clone(), state];

    let err = StateRegistry::from_snapshot(states, Vec::new(), clock, "analyst")
        .expect_err("duplicate");
    assert!(err.is_validation());
}
