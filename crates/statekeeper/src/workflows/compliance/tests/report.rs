use chrono::Duration;

use super::common::*;
use crate::workflows::compliance::{ComplianceReport, NewComplianceItem, Priority};

#[test]
fn summarizes_each_state_and_collects_overdue_items() {
    let (mut registry, _clock) = registry();
    let texas = add_state(&mut registry, "Texas", "TX");
    let ohio = add_state(&mut registry, "Ohio", "OH");

    add_item(
        &mut registry,
        &texas.id,
        NewComplianceItem::new("Late CE", date(2024, 2, 1)),
    );
    add_item(
        &mut registry,
        &texas.id,
        NewComplianceItem::new("Later CE", date(2024, 2, 20)).with_priority(Priority::High),
    );
    add_item(
        &mut registry,
        &texas.id,
        NewComplianceItem::new("Upcoming", date(2024, 3, 10)),
    );
    let done = add_item(
        &mut registry,
        &ohio.id,
        NewComplianceItem::new("Done already", date(2024, 3, 5)),
    );
    registry
        .scheduler()
        .complete_item(&ohio.id, &done.id, None)
        .expect("completed");
    add_item(
        &mut registry,
        &ohio.id,
        NewComplianceItem::new("Far away", date(2024, 8, 1)),
    );

    let licenses = vec![
        license("1", "RN", "TX", today() + Duration::days(40)),
        license("2", "RN", "OH", today() + Duration::days(12)),
        license("3", "RN", "OH", today() - Duration::days(2)),
    ];
    let report = ComplianceReport::build(&registry, &licenses, today(), 30);

    let tx = &report.states[0];
    assert_eq!((tx.open, tx.overdue, tx.due_soon, tx.completed), (3, 2, 1, 0));
    assert_eq!(tx.next_due.as_ref().map(|item| item.title.as_str()), Some("Upcoming"));

    let oh = &report.states[1];
    assert_eq!((oh.open, oh.overdue, oh.due_soon, oh.completed), (1, 0, 0, 1));
    assert_eq!(oh.next_due.as_ref().map(|item| item.title.as_str()), Some("Far away"));

    assert_eq!(report.total_overdue(), 2);
    assert_eq!(report.overdue_items[0].title, "Late CE");

    let expiring: Vec<&str> = report
        .expiring_licenses
        .iter()
        .map(|license| license.license_number.as_str())
        .collect();
    assert_eq!(expiring, vec!["3", "2"]);
}

#[test]
fn oversized_window_saturates_instead_of_overflowing() {
    let (mut registry, _clock) = registry();
    let texas = add_state(&mut registry, "Texas", "TX");
    add_item(
        &mut registry,
        &texas.id,
        NewComplianceItem::new("Far away", date(2030, 1, 1)),
    );

    let wide = ComplianceReport::build(&registry, &[], today(), 200_000_000);
    assert_eq!(wide.states[0].due_soon, 1);

    let negative = ComplianceReport::build(&registry, &[], today(), -5);
    assert_eq!(negative.states[0].due_soon, 0);
}
