use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::FixedClock;
use crate::workflows::compliance::{
    ComplianceItem, License, LicenseStatus, NewComplianceItem, NewStateProfile, StateProfile,
    StateRegistry,
};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2024, 3, 1)
}

pub(super) fn registry() -> (StateRegistry, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::on(today()));
    let registry = StateRegistry::new(clock.clone(), "analyst");
    (registry, clock)
}

pub(super) fn add_state(
    registry: &mut StateRegistry,
    name: &str,
    abbreviation: &str,
) -> StateProfile {
    registry
        .create_state(NewStateProfile::new(name, abbreviation))
        .expect("state is created")
}

pub(super) fn add_item(
    registry: &mut StateRegistry,
    state_id: &str,
    item: NewComplianceItem,
) -> ComplianceItem {
    registry
        .scheduler()
        .add_item(state_id, item)
        .expect("item is added")
}

pub(super) fn license(
    number: &str,
    license_type: &str,
    state: &str,
    expires: NaiveDate,
) -> License {
    License {
        id: format!("lic-{number}"),
        license_number: number.to_string(),
        license_type: license_type.to_string(),
        state: state.to_string(),
        issuance_date: date(2020, 1, 1),
        expiration_date: expires,
        status: LicenseStatus::Active,
    }
}
