use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use statekeeper::clock::FixedClock;
use statekeeper::config::EngineConfig;
use statekeeper::notify::{MemoryNotifier, Severity};
use statekeeper::workflows::compliance::{
    AuditQuery, Frequency, NewComplianceItem, NewStateProfile, Priority, RecurrencePattern,
};
use statekeeper::workflows::ComplianceEngine;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid start date")
}

fn engine() -> (ComplianceEngine, Arc<FixedClock>, Arc<MemoryNotifier>) {
    let clock = Arc::new(FixedClock::on(start()));
    let notifier = Arc::new(MemoryNotifier::default());
    let engine = ComplianceEngine::new(
        &EngineConfig::default(),
        clock.clone(),
        notifier.clone(),
        "nurse@example.com",
    );
    (engine, clock, notifier)
}

#[test]
fn daily_completions_build_a_streak_and_unlock_achievements() {
    let (mut engine, clock, notifier) = engine();
    let texas = engine
        .registry_mut()
        .create_state(NewStateProfile::new("Texas", "TX"))
        .expect("state created");

    let mut item_ids = Vec::new();
    for title in ["CE: ethics", "CE: pharmacology", "CE: jurisprudence", "CE: bonus"] {
        let item = engine
            .registry_mut()
            .scheduler()
            .add_item(
                &texas.id,
                NewComplianceItem::new(title, start() + Duration::days(9)),
            )
            .expect("item added");
        item_ids.push(item.id);
    }

    let first = engine
        .complete_item(&texas.id, &item_ids[0], None)
        .expect("day one");
    assert_eq!(first.points_awarded, 15, "base points plus on-time bonus");
    assert_eq!(first.streak, 1);
    assert_eq!(
        first.unlocked.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
        vec!["first_task"]
    );

    clock.advance(Duration::days(1));
    let second = engine
        .complete_item(&texas.id, &item_ids[1], None)
        .expect("day two");
    assert_eq!(second.streak, 2);
    assert!(second.unlocked.is_empty());

    clock.advance(Duration::days(1));
    let third = engine
        .complete_item(&texas.id, &item_ids[2], None)
        .expect("day three");
    assert_eq!(third.streak, 3);
    assert_eq!(
        third.unlocked.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
        vec!["on_a_roll"]
    );
    assert_eq!(third.total_points, 70);
    assert_eq!(third.level, 1);

    let same_day = engine
        .complete_item(&texas.id, &item_ids[3], None)
        .expect("same day");
    assert_eq!(same_day.streak, 3, "same-day activity keeps the streak");
    assert_eq!(
        engine.gamification().data().last_activity_date,
        Some(start() + Duration::days(2))
    );

    let unlock_notices: Vec<_> = notifier
        .events()
        .into_iter()
        .filter(|event| event.severity == Severity::Info)
        .collect();
    assert_eq!(unlock_notices.len(), 2);
}

#[test]
fn a_gap_resets_the_streak() {
    let (mut engine, clock, _notifier) = engine();
    let texas = engine
        .registry_mut()
        .create_state(NewStateProfile::new("Texas", "TX"))
        .expect("state created");
    let pattern = RecurrencePattern::new(Frequency::Daily, 1);
    let template = engine
        .registry_mut()
        .scheduler()
        .add_item(
            &texas.id,
            NewComplianceItem::new("Daily check-in", start()).recurring(pattern),
        )
        .expect("item added");

    let first = engine
        .complete_item(&texas.id, &template.id, None)
        .expect("completed");
    let next = first.outcome.next_instance.expect("daily recurrence");

    clock.advance(Duration::days(3));
    let late = engine
        .complete_item(&texas.id, &next.id, None)
        .expect("completed late");

    assert_eq!(late.streak, 1);
    assert_eq!(late.points_awarded, 10, "late completion earns no on-time bonus");
}

#[test]
fn tracking_three_states_unlocks_multi_state() {
    let (mut engine, _clock, notifier) = engine();
    for (name, abbreviation) in [("Texas", "TX"), ("Ohio", "OH"), ("Iowa", "IA")] {
        engine
            .registry_mut()
            .create_state(NewStateProfile::new(name, abbreviation))
            .expect("state created");
    }

    let unlocked = engine.refresh_achievements().expect("evaluated");

    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].id, "multi_state");
    assert_eq!(engine.gamification().data().points, 25);
    assert!(engine.refresh_achievements().expect("evaluated").is_empty());
    assert_eq!(notifier.events().len(), 1);
}

#[test]
fn deleting_a_primary_state_removes_its_reciprocals_but_keeps_history() {
    let (mut engine, _clock, _notifier) = engine();
    let registry = engine.registry_mut();
    let texas = registry
        .create_state(NewStateProfile::new("Texas", "TX"))
        .expect("state created");
    let oklahoma = registry
        .create_state(NewStateProfile::new("Oklahoma", "OK").reciprocal_of(texas.id.clone()))
        .expect("reciprocal created");
    registry
        .scheduler()
        .add_item(
            &oklahoma.id,
            NewComplianceItem::new("Reciprocity paperwork", start())
                .with_priority(Priority::High),
        )
        .expect("item added");

    let removed = registry.delete_state(&texas.id).expect("deleted");

    assert_eq!(removed, vec![texas.id.clone(), oklahoma.id.clone()]);
    assert!(registry.states().is_empty());
    assert_eq!(registry.all_items().count(), 0);
    let history = registry.audit_query(&AuditQuery::default().containing("deleted"));
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].state_id, oklahoma.id);
}
