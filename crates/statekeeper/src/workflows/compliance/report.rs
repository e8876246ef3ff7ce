use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::domain::{ComplianceItem, License, Priority, StateProfile};
use super::registry::StateRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub state_id: String,
    pub item_id: String,
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub priority_label: &'static str,
}

impl ItemSnapshot {
    fn from_item(item: &ComplianceItem) -> Self {
        Self {
            state_id: item.state_id.clone(),
            item_id: item.id.clone(),
            title: item.title.clone(),
            due_date: item.due_date,
            priority: item.priority,
            priority_label: item.priority.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub state_id: String,
    pub name: String,
    pub abbreviation: String,
    pub status_label: &'static str,
    pub open: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub completed: usize,
    pub next_due: Option<ItemSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringLicense {
    pub license_id: String,
    pub license_number: String,
    pub license_type: String,
    pub state: String,
    pub expiration_date: NaiveDate,
    pub days_remaining: i64,
}

/// Point-in-time view across every tracked state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub today: NaiveDate,
    pub window_days: i64,
    pub states: Vec<StateSummary>,
    pub overdue_items: Vec<ItemSnapshot>,
    pub expiring_licenses: Vec<ExpiringLicense>,
}

impl ComplianceReport {
    pub fn build(
        registry: &StateRegistry,
        licenses: &[License],
        today: NaiveDate,
        window_days: i64,
    ) -> Self {
        let horizon = due_soon_horizon(today, window_days);
        let states = registry
            .states()
            .iter()
            .map(|state| summarize(state, today, horizon))
            .collect();

        let mut overdue_items: Vec<ItemSnapshot> = registry
            .all_items()
            .filter(|item| item.is_overdue(today))
            .map(ItemSnapshot::from_item)
            .collect();
        overdue_items.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| b.priority.cmp(&a.priority))
        });

        let mut expiring_licenses: Vec<ExpiringLicense> = licenses
            .iter()
            .filter_map(|license| {
                let days_remaining = license.days_until_expiration(today);
                (days_remaining <= window_days).then(|| ExpiringLicense {
                    license_id: license.id.clone(),
                    license_number: license.license_number.clone(),
                    license_type: license.license_type.clone(),
                    state: license.state.clone(),
                    expiration_date: license.expiration_date,
                    days_remaining,
                })
            })
            .collect();
        expiring_licenses.sort_by_key(|license| license.days_remaining);

        Self {
            today,
            window_days,
            states,
            overdue_items,
            expiring_licenses,
        }
    }

    pub fn total_overdue(&self) -> usize {
        self.overdue_items.len()
    }
}

/// Last date counted as due soon. Saturates at the calendar's end; a
/// non-positive window covers today only.
fn due_soon_horizon(today: NaiveDate, window_days: i64) -> NaiveDate {
    let days = u64::try_from(window_days).unwrap_or(0);
    today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn summarize(state: &StateProfile, today: NaiveDate, horizon: NaiveDate) -> StateSummary {
    let mut summary = StateSummary {
        state_id: state.id.clone(),
        name: state.name.clone(),
        abbreviation: state.abbreviation.clone(),
        status_label: state.status.label(),
        open: 0,
        overdue: 0,
        due_soon: 0,
        completed: 0,
        next_due: None,
    };

    let mut next_due: Option<&ComplianceItem> = None;
    for item in &state.compliance_items {
        if item.completed {
            summary.completed += 1;
            continue;
        }
        summary.open += 1;
        if item.due_date < today {
            summary.overdue += 1;
        } else {
            if item.due_date <= horizon {
                summary.due_soon += 1;
            }
            if next_due.map_or(true, |current| item.due_date < current.due_date) {
                next_due = Some(item);
            }
        }
    }
    summary.next_due = next_due.map(ItemSnapshot::from_item);
    summary
}
