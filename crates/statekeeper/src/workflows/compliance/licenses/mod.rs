mod import;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{License, NewComplianceItem, Priority};
use super::registry::StateRegistry;
use crate::config::EngineConfig;
use crate::notify::{Notification, Notifier, Severity};
use crate::workflows::errors::EngineError;

pub use import::{parse_licenses, LicenseImportError};

const DEFAULT_RENEWAL_WINDOW_DAYS: i64 = 30;
const DEFAULT_RENEWAL_LEAD_DAYS: i64 = 15;
const SYSTEM_ACTOR: &str = "system";

/// What a single scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub created_task_ids: Vec<String>,
    /// Expiring licenses that already had a renewal task.
    pub skipped_license_ids: Vec<String>,
    /// Expiring licenses with no state profile to own a renewal task.
    pub unmatched_license_ids: Vec<String>,
    /// Licenses already at or past their expiration date.
    pub expired_license_ids: Vec<String>,
}

/// Watches license expirations and files renewal obligations exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseExpirationMonitor {
    window_days: i64,
    lead_days: i64,
}

impl Default for LicenseExpirationMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_RENEWAL_WINDOW_DAYS, DEFAULT_RENEWAL_LEAD_DAYS)
    }
}

impl From<&EngineConfig> for LicenseExpirationMonitor {
    fn from(config: &EngineConfig) -> Self {
        Self::new(config.renewal_window_days, config.renewal_lead_days)
    }
}

impl LicenseExpirationMonitor {
    pub fn new(window_days: i64, lead_days: i64) -> Self {
        let window_days = if window_days > 0 {
            window_days
        } else {
            DEFAULT_RENEWAL_WINDOW_DAYS
        };
        Self {
            window_days,
            lead_days: lead_days.max(0),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// `0 < days until expiration <= window`.
    pub fn is_expiring_soon(&self, license: &License, today: chrono::NaiveDate) -> bool {
        let days = license.days_until_expiration(today);
        days > 0 && days <= self.window_days
    }

    /// Days from today the renewal task falls due; never earlier than tomorrow.
    pub fn renewal_offset_days(&self, days_until_expiration: i64) -> i64 {
        (days_until_expiration - self.lead_days).max(1)
    }

    pub fn scan(
        &self,
        registry: &mut StateRegistry,
        licenses: &[License],
        notifier: &dyn Notifier,
    ) -> Result<ScanOutcome, EngineError> {
        let today = registry.clock().today();
        let mut outcome = ScanOutcome::default();

        for license in licenses {
            let days = license.days_until_expiration(today);
            if days <= 0 {
                outcome.expired_license_ids.push(license.id.clone());
                continue;
            }
            if days > self.window_days {
                continue;
            }

            if has_renewal_task(registry, license) {
                debug!(license = %license.license_number, "renewal task already filed");
                outcome.skipped_license_ids.push(license.id.clone());
                continue;
            }

            let Some(state_id) = registry
                .state_by_abbreviation(&license.state)
                .map(|state| state.id.clone())
            else {
                warn!(
                    license = %license.license_number,
                    state = %license.state,
                    "expiring license has no matching state profile"
                );
                notifier.notify(&Notification::new(
                    format!("{} license expiring soon", license.license_type),
                    format!(
                        "License {} ({}) expires in {days} days on {}. Add a {} state profile to track its renewal.",
                        license.license_number, license.license_type, license.expiration_date, license.state
                    ),
                    Severity::Warning,
                ));
                outcome.unmatched_license_ids.push(license.id.clone());
                continue;
            };

            let due_date = today + chrono::Duration::days(self.renewal_offset_days(days));
            let mut task = NewComplianceItem::new(renewal_title(license), due_date)
                .with_priority(Priority::High)
                .with_description(format!(
                    "License {} expires on {} ({days} days). Submit the renewal application and fees before the deadline.",
                    license.license_number, license.expiration_date
                ));
            task.source_license = Some(license.link());

            let created = registry
                .scheduler()
                .acting_as(SYSTEM_ACTOR)
                .add_item(&state_id, task)?;
            info!(
                license = %license.license_number,
                state_id = %state_id,
                due = %created.due_date,
                "renewal task created"
            );
            outcome.created_task_ids.push(created.id);
        }

        Ok(outcome)
    }
}

pub fn renewal_title(license: &License) -> String {
    format!(
        "License Renewal: {} #{}",
        license.license_type, license.license_number
    )
}

/// Whether any item already tracks the renewal of `license`.
///
/// Items carrying a structured license link are matched on number and type;
/// older items without one fall back to matching their title.
pub fn has_renewal_task(registry: &StateRegistry, license: &License) -> bool {
    let legacy_marker = format!("License Renewal: {}", license.license_type);
    registry.all_items().any(|item| match &item.source_license {
        Some(link) => {
            link.license_number == license.license_number
                && link.license_type == license.license_type
        }
        None => {
            item.title.contains(&legacy_marker) && item.title.contains(&license.license_number)
        }
    })
}

impl License {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.license_number.trim().is_empty() {
            return Err(EngineError::validation("license number is required"));
        }
        if self.license_type.trim().is_empty() {
            return Err(EngineError::validation("license type is required"));
        }
        if self.state.trim().is_empty() {
            return Err(EngineError::validation("license state is required"));
        }
        if self.expiration_date < self.issuance_date {
            return Err(EngineError::validation(format!(
                "license {} expires before it was issued",
                self.license_number
            )));
        }
        Ok(())
    }
}
