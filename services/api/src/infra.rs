use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use statekeeper::clock::{Clock, FixedClock, SystemClock};
use statekeeper::config::AppConfig;
use statekeeper::error::AppError;
use statekeeper::notify::Notifier;
use statekeeper::persistence::{JsonFileStore, SnapshotStore};
use statekeeper::workflows::{ComplianceEngine, EngineError};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared engine plus the store it is flushed to after every mutation.
///
/// Requests are serialized on the mutex; the engine itself has no notion of
/// concurrent writers.
#[derive(Clone)]
pub(crate) struct EngineHandle {
    engine: Arc<Mutex<ComplianceEngine>>,
    store: Arc<dyn SnapshotStore>,
}

impl EngineHandle {
    pub(crate) fn new(engine: ComplianceEngine, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ComplianceEngine> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn read<T>(&self, view: impl FnOnce(&ComplianceEngine) -> T) -> T {
        view(&self.lock())
    }

    /// Apply `change` and persist the result. Nothing is written when the
    /// change is rejected.
    pub(crate) fn mutate<T>(
        &self,
        change: impl FnOnce(&mut ComplianceEngine) -> Result<T, EngineError>,
    ) -> Result<T, AppError> {
        let mut engine = self.lock();
        let value = change(&mut engine)?;
        engine.flush(self.store.as_ref())?;
        Ok(value)
    }
}

/// `--today` pins the calendar; otherwise the wall clock is used.
pub(crate) fn clock_for(today: Option<NaiveDate>) -> Arc<dyn Clock> {
    match today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    }
}

pub(crate) fn file_store(config: &AppConfig) -> JsonFileStore {
    JsonFileStore::new(config.storage.data_dir.clone())
}

pub(crate) fn open_engine(
    config: &AppConfig,
    store: &dyn SnapshotStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
) -> Result<ComplianceEngine, AppError> {
    let engine = ComplianceEngine::hydrate(
        store,
        &config.engine,
        clock,
        notifier,
        config.storage.user_id.clone(),
    )?;
    Ok(engine)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
