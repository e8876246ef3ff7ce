use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::notify::{Notification, Notifier, Severity};
use crate::persistence::{PersistenceError, RegistrySnapshot, SnapshotStore};
use crate::workflows::compliance::registry::generate_id;
use crate::workflows::compliance::{
    parse_licenses, CompletionOutcome, ComplianceReport, License, LicenseExpirationMonitor,
    LicenseImportError, ScanOutcome, StateRegistry,
};
use crate::workflows::errors::{EngineError, EntityKind};
use crate::workflows::gamification::{
    Achievement, AchievementCatalog, AchievementContext, GamificationData, GamificationEngine,
    GamificationRules,
};

/// Everything that happened when an item was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub outcome: CompletionOutcome,
    pub points_awarded: u64,
    pub total_points: u64,
    pub level: u64,
    pub streak: u64,
    pub unlocked: Vec<Achievement>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
}

/// Ties the registry, license roster, renewal monitor and gamification layer
/// together for a single user.
pub struct ComplianceEngine {
    registry: StateRegistry,
    licenses: Vec<License>,
    gamification: GamificationEngine,
    monitor: LicenseExpirationMonitor,
    notifier: Arc<dyn Notifier>,
    user_id: String,
}

impl std::fmt::Debug for ComplianceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceEngine")
            .field("registry", &self.registry)
            .field("licenses", &self.licenses.len())
            .field("monitor", &self.monitor)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ComplianceEngine {
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        user_id: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let gamification = GamificationEngine::new(
            GamificationData::default(),
            AchievementCatalog::standard(),
            GamificationRules::from(&config.gamification),
            clock.clone(),
        );
        Self {
            registry: StateRegistry::new(clock, user_id.clone()),
            licenses: Vec::new(),
            gamification,
            monitor: LicenseExpirationMonitor::from(config),
            notifier,
            user_id,
        }
    }

    /// Rebuild the engine from whatever `store` currently holds.
    pub fn hydrate(
        store: &dyn SnapshotStore,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        user_id: impl Into<String>,
    ) -> Result<Self, PersistenceError> {
        let user_id = user_id.into();
        let snapshot = store.load_registry()?;
        let data = store.load_gamification(&user_id)?.unwrap_or_default();

        let registry = StateRegistry::from_snapshot(
            snapshot.states,
            snapshot.archived_audit,
            clock.clone(),
            user_id.clone(),
        )
        .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        let gamification = GamificationEngine::new(
            data,
            AchievementCatalog::standard(),
            GamificationRules::from(&config.gamification),
            clock,
        );

        debug!(
            states = registry.states().len(),
            licenses = snapshot.licenses.len(),
            user = %user_id,
            "engine hydrated"
        );
        Ok(Self {
            registry,
            licenses: snapshot.licenses,
            gamification,
            monitor: LicenseExpirationMonitor::from(config),
            notifier,
            user_id,
        })
    }

    /// Replace the stored registry and this user's gamification data.
    pub fn flush(&self, store: &dyn SnapshotStore) -> Result<(), PersistenceError> {
        store.save_registry(&self.snapshot())?;
        store.save_gamification(&self.user_id, self.gamification.data())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            states: self.registry.states().to_vec(),
            licenses: self.licenses.clone(),
            archived_audit: self.registry.archived_audit().to_vec(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn today(&self) -> NaiveDate {
        self.registry.clock().today()
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StateRegistry {
        &mut self.registry
    }

    pub fn gamification(&self) -> &GamificationEngine {
        &self.gamification
    }

    pub fn monitor(&self) -> &LicenseExpirationMonitor {
        &self.monitor
    }

    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    /// Complete an item and pay out points, streak progress and achievements.
    pub fn complete_item(
        &mut self,
        state_id: &str,
        item_id: &str,
        note: Option<String>,
    ) -> Result<CompletionReport, EngineError> {
        let outcome = self
            .registry
            .scheduler()
            .complete_item(state_id, item_id, note)?;

        let today = self.today();
        let streak = self.gamification.record_activity(today);
        // Reopened items were already paid for.
        let points_awarded = if outcome.first_completion {
            self.gamification.rules().completion_reward(&outcome.item)
        } else {
            0
        };
        let amount = i64::try_from(points_awarded)
            .map_err(|_| EngineError::validation("completion reward is out of range"))?;
        self.gamification.award_points(amount)?;
        let unlocked = self.refresh_achievements()?;

        let data = self.gamification.data();
        Ok(CompletionReport {
            outcome,
            points_awarded,
            total_points: data.points,
            level: data.level,
            streak,
            unlocked,
        })
    }

    /// Re-evaluate achievements against the registry, notifying on unlocks.
    pub fn refresh_achievements(&mut self) -> Result<Vec<Achievement>, EngineError> {
        let context = AchievementContext::from_registry(&self.registry);
        let unlocked = self.gamification.evaluate_achievements(&context)?;
        for achievement in &unlocked {
            self.notifier.notify(&Notification::new(
                format!("Achievement unlocked: {}", achievement.title),
                format!(
                    "{} (+{} points)",
                    achievement.description, achievement.points
                ),
                Severity::Info,
            ));
        }
        Ok(unlocked)
    }

    pub fn scan_licenses(&mut self) -> Result<ScanOutcome, EngineError> {
        let outcome =
            self.monitor
                .scan(&mut self.registry, &self.licenses, self.notifier.as_ref())?;
        info!(
            created = outcome.created_task_ids.len(),
            skipped = outcome.skipped_license_ids.len(),
            unmatched = outcome.unmatched_license_ids.len(),
            expired = outcome.expired_license_ids.len(),
            "license scan finished"
        );
        Ok(outcome)
    }

    /// Add a license to the roster. A blank id is replaced with a fresh one.
    pub fn add_license(&mut self, mut license: License) -> Result<License, EngineError> {
        license.validate()?;
        license.state = license.state.trim().to_ascii_uppercase();
        if license.id.trim().is_empty() {
            license.id = generate_id();
        }
        if self.licenses.iter().any(|existing| existing.id == license.id) {
            return Err(EngineError::validation(format!(
                "license id {} is already on the roster",
                license.id
            )));
        }
        if self.find_same_license(&license).is_some() {
            return Err(EngineError::validation(format!(
                "{} license {} is already on the roster",
                license.license_type, license.license_number
            )));
        }

        debug!(license = %license.license_number, state = %license.state, "license added");
        self.licenses.push(license.clone());
        Ok(license)
    }

    pub fn remove_license(&mut self, license_id: &str) -> Result<License, EngineError> {
        let position = self
            .licenses
            .iter()
            .position(|license| license.id == license_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::License, license_id))?;
        let removed = self.licenses.remove(position);
        debug!(license = %removed.license_number, "license removed");
        Ok(removed)
    }

    /// Merge a CSV roster: rows naming a license already on file update it in
    /// place (keeping its id), new rows are appended.
    pub fn import_licenses<R: Read>(
        &mut self,
        reader: R,
    ) -> Result<ImportSummary, LicenseImportError> {
        let rows = parse_licenses(reader)?;
        let mut summary = ImportSummary::default();

        for row in rows {
            match self.find_same_license(&row) {
                Some(position) => {
                    let existing = &mut self.licenses[position];
                    let id = std::mem::take(&mut existing.id);
                    *existing = License { id, ..row };
                    summary.updated += 1;
                }
                None => {
                    self.licenses.push(row);
                    summary.added += 1;
                }
            }
        }

        info!(
            added = summary.added,
            updated = summary.updated,
            "license roster imported"
        );
        Ok(summary)
    }

    pub fn report(&self, today: NaiveDate) -> ComplianceReport {
        ComplianceReport::build(
            &self.registry,
            &self.licenses,
            today,
            self.monitor.window_days(),
        )
    }

    fn find_same_license(&self, license: &License) -> Option<usize> {
        self.licenses.iter().position(|existing| {
            existing.license_number == license.license_number
                && existing.license_type == license.license_type
                && existing.state.eq_ignore_ascii_case(&license.state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::MemoryNotifier;
    use crate::persistence::MemorySnapshotStore;
    use crate::workflows::compliance::{NewComplianceItem, NewStateProfile, Priority};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn engine() -> (ComplianceEngine, Arc<FixedClock>, Arc<MemoryNotifier>) {
        let clock = Arc::new(FixedClock::on(date(2024, 3, 1)));
        let notifier = Arc::new(MemoryNotifier::default());
        let engine = ComplianceEngine::new(
            &EngineConfig::default(),
            clock.clone(),
            notifier.clone(),
            "tester",
        );
        (engine, clock, notifier)
    }

    fn license(number: &str, state: &str, expires: NaiveDate) -> License {
        License {
            id: String::new(),
            license_number: number.to_string(),
            license_type: "RN".to_string(),
            state: state.to_string(),
            issuance_date: date(2020, 1, 1),
            expiration_date: expires,
            status: Default::default(),
        }
    }

    #[test]
    fn completing_an_item_pays_points_and_unlocks_first_task() {
        let (mut engine, _clock, notifier) = engine();
        let state = engine
            .registry_mut()
            .create_state(NewStateProfile::new("Texas", "TX"))
            .expect("state");
        let item = engine
            .registry_mut()
            .scheduler()
            .add_item(
                &state.id,
                NewComplianceItem::new("CE hours", date(2024, 3, 5)).with_priority(Priority::High),
            )
            .expect("item");

        let report = engine
            .complete_item(&state.id, &item.id, None)
            .expect("completes");

        assert_eq!(report.points_awarded, 20);
        assert_eq!(report.streak, 1);
        assert_eq!(report.unlocked.len(), 1);
        assert_eq!(report.unlocked[0].id, "first_task");
        assert_eq!(report.total_points, 30);
        assert_eq!(report.level, 1);

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Info);
        assert!(events[0].title.contains("First Steps"));
    }

    #[test]
    fn recompleting_a_reopened_item_pays_nothing() {
        let (mut engine, _clock, _notifier) = engine();
        let state = engine
            .registry_mut()
            .create_state(NewStateProfile::new("Texas", "TX"))
            .expect("state");
        let item = engine
            .registry_mut()
            .scheduler()
            .add_item(&state.id, NewComplianceItem::new("CE hours", date(2024, 3, 5)))
            .expect("item");

        let first = engine
            .complete_item(&state.id, &item.id, None)
            .expect("completes");
        engine
            .registry_mut()
            .scheduler()
            .reopen_item(&state.id, &item.id, "missing certificate")
            .expect("reopens");
        let again = engine
            .complete_item(&state.id, &item.id, None)
            .expect("completes again");

        assert_eq!(again.points_awarded, 0);
        assert_eq!(again.total_points, first.total_points);
        assert!(again.unlocked.is_empty());
    }

    #[test]
    fn report_tolerates_a_very_large_renewal_window() {
        let config = EngineConfig {
            renewal_window_days: 200_000_000,
            ..EngineConfig::default()
        };
        let engine = ComplianceEngine::new(
            &config,
            Arc::new(FixedClock::on(date(2024, 3, 1))),
            Arc::new(MemoryNotifier::default()),
            "tester",
        );

        let report = engine.report(date(2024, 3, 1));
        assert_eq!(report.window_days, 200_000_000);
        assert!(report.states.is_empty());
    }

    #[test]
    fn failed_completion_leaves_gamification_untouched() {
        let (mut engine, _clock, notifier) = engine();
        let err = engine
            .complete_item("missing", "missing", None)
            .expect_err("unknown state");

        assert!(err.is_not_found());
        assert_eq!(engine.gamification().data().points, 0);
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn licenses_get_ids_and_duplicates_are_rejected() {
        let (mut engine, _clock, _notifier) = engine();
        let added = engine
            .add_license(license("123", "tx", date(2024, 12, 31)))
            .expect("added");

        assert!(!added.id.is_empty());
        assert_eq!(added.state, "TX");
        assert!(engine
            .add_license(license("123", "TX", date(2025, 12, 31)))
            .expect_err("duplicate")
            .is_validation());

        let removed = engine.remove_license(&added.id).expect("removed");
        assert_eq!(removed.license_number, "123");
        assert!(engine
            .remove_license(&added.id)
            .expect_err("gone")
            .is_not_found());
    }

    #[test]
    fn reimporting_a_roster_updates_rows_in_place() {
        let (mut engine, _clock, _notifier) = engine();
        let csv = "License Number,License Type,State,Issuance Date,Expiration Date,Status\n\
                   123,RN,TX,2020-01-01,2024-06-30,active\n";
        let first = engine.import_licenses(csv.as_bytes()).expect("imports");
        assert_eq!(first, ImportSummary { added: 1, updated: 0 });
        let id = engine.licenses()[0].id.clone();

        let renewed = "License Number,License Type,State,Issuance Date,Expiration Date,Status\n\
                       123,RN,TX,2020-01-01,2026-06-30,active\n";
        let second = engine.import_licenses(renewed.as_bytes()).expect("imports");

        assert_eq!(second, ImportSummary { added: 0, updated: 1 });
        assert_eq!(engine.licenses().len(), 1);
        assert_eq!(engine.licenses()[0].id, id);
        assert_eq!(engine.licenses()[0].expiration_date, date(2026, 6, 30));
    }

    #[test]
    fn flush_then_hydrate_restores_everything() {
        let (mut engine, clock, notifier) = engine();
        let state = engine
            .registry_mut()
            .create_state(NewStateProfile::new("Texas", "TX"))
            .expect("state");
        let item = engine
            .registry_mut()
            .scheduler()
            .add_item(&state.id, NewComplianceItem::new("Renew", date(2024, 3, 2)))
            .expect("item");
        engine
            .complete_item(&state.id, &item.id, Some("done".into()))
            .expect("completes");
        engine
            .add_license(license("123", "TX", date(2024, 3, 20)))
            .expect("license");

        let store = MemorySnapshotStore::default();
        engine.flush(&store).expect("flush");

        let restored = ComplianceEngine::hydrate(
            &store,
            &EngineConfig::default(),
            clock,
            notifier,
            "tester",
        )
        .expect("hydrate");

        assert_eq!(restored.snapshot(), engine.snapshot());
        assert_eq!(restored.gamification().data(), engine.gamification().data());
    }
}
