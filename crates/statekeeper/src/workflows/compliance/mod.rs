//! Jurisdiction registry, obligation scheduling, audit trail and license renewals.

pub mod audit;
pub mod domain;
pub mod licenses;
pub mod recurrence;
pub mod registry;
pub mod report;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use audit::{AuditDateField, AuditQuery, AuditTrail};
pub use domain::{
    AuditDraft, AuditEntryType, AuditLogEntry, ComplianceItem, ContactRecord, DisciplinaryRecord,
    DocumentCategory, DocumentRecord, Frequency, ItemPatch, License, LicenseLink, LicenseStatus,
    NewComplianceItem, NewDocument, NewStateProfile, Note, Priority, RecurrencePattern,
    StatePatch, StateProfile, StateStatus,
};
pub use licenses::{
    has_renewal_task, parse_licenses, renewal_title, LicenseExpirationMonitor, LicenseImportError,
    ScanOutcome,
};
pub use registry::StateRegistry;
pub use report::{ComplianceReport, ExpiringLicense, ItemSnapshot, StateSummary};
pub use scheduler::{CompletionOutcome, ComplianceItemScheduler};
