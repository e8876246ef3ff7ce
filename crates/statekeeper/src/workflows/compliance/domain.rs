use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    #[default]
    Active,
    Inactive,
    Pending,
    Probation,
    Closed,
}

impl StateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Pending => "Pending",
            Self::Probation => "Probation",
            Self::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
        }
    }
}

/// Rule for spawning the next instance of a completed obligation.
///
/// When both bounds are present, whichever is reached first stops generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_by_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_after_occurrences: Option<u32>,
}

/// Structured back-reference from a renewal task to the license that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseLink {
    pub license_id: String,
    pub license_number: String,
    pub license_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceItem {
    pub id: String,
    pub state_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopen_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_license: Option<LicenseLink>,
}

impl ComplianceItem {
    /// Id of the template this item descends from (itself for templates).
    pub fn lineage_id(&self) -> &str {
        self.parent_task_id.as_deref().unwrap_or(&self.id)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date < today
    }

    pub fn completed_on_time(&self) -> bool {
        matches!(self.completed_on, Some(done) if self.completed && done <= self.due_date)
    }
}

/// Caller-supplied fields for a new obligation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplianceItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(skip)]
    pub source_license: Option<LicenseLink>,
}

impl NewComplianceItem {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn recurring(mut self, pattern: RecurrencePattern) -> Self {
        self.recurrence_pattern = Some(pattern);
        self
    }
}

/// Partial update for an existing obligation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub clear_recurrence: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    License,
    Certificate,
    Correspondence,
    Evidence,
    #[default]
    Other,
}

/// Metadata for a stored document; the blob itself lives with the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: DocumentCategory,
    pub uploaded_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub name: String,
    #[serde(default)]
    pub category: DocumentCategory,
    #[serde(default)]
    pub uploaded_on: Option<NaiveDate>,
    #[serde(default)]
    pub storage_key: Option<String>,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Board action or proceeding tied to a jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplinaryRecord {
    pub case_number: String,
    pub board: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_on: Option<NaiveDate>,
}

/// Monitoring program or treatment provider contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    Request,
    Submission,
    Other,
}

/// Immutable record of a state-affecting action.
///
/// `timestamp` is when the entry was recorded; `date` is the effective date of
/// the underlying event, when it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub state_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sequence: u64,
    pub user: String,
    pub action: String,
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AuditEntryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Fields a caller controls when appending to the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDraft {
    pub action: String,
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: Option<AuditEntryType>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub user: Option<String>,
}

impl AuditDraft {
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: AuditEntryType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn effective_on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// A tracked jurisdiction and everything owned by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProfile {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub status: StateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_license_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reciprocal_of: Option<String>,
    #[serde(default)]
    pub compliance_items: Vec<ComplianceItem>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub audit_log: Vec<AuditLogEntry>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disciplinary: Option<DisciplinaryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<ContactRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ContactRecord>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl StateProfile {
    /// Whether this profile hangs off `state_id` and must go when it goes.
    pub fn depends_on(&self, state_id: &str) -> bool {
        self.associated_license_id.as_deref() == Some(state_id)
            || self.reciprocal_of.as_deref() == Some(state_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&ComplianceItem> {
        self.compliance_items.iter().find(|item| item.id == item_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStateProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub status: StateStatus,
    #[serde(default)]
    pub associated_license_id: Option<String>,
    #[serde(default)]
    pub reciprocal_of: Option<String>,
    #[serde(default)]
    pub disciplinary: Option<DisciplinaryRecord>,
    #[serde(default)]
    pub monitor: Option<ContactRecord>,
    #[serde(default)]
    pub provider: Option<ContactRecord>,
}

impl NewStateProfile {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn reciprocal_of(mut self, state_id: impl Into<String>) -> Self {
        self.reciprocal_of = Some(state_id.into());
        self
    }

    pub fn associated_with(mut self, state_id: impl Into<String>) -> Self {
        self.associated_license_id = Some(state_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub status: Option<StateStatus>,
    #[serde(default)]
    pub disciplinary: Option<DisciplinaryRecord>,
    #[serde(default)]
    pub monitor: Option<ContactRecord>,
    #[serde(default)]
    pub provider: Option<ContactRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    #[default]
    Active,
    Inactive,
    Pending,
    Expired,
}

impl LicenseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Pending => "Pending",
            Self::Expired => "Expired",
        }
    }
}

/// Professional license. `state` is an abbreviation, resolved against
/// `StateProfile::abbreviation` rather than by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(default)]
    pub id: String,
    pub license_number: String,
    pub license_type: String,
    pub state: String,
    pub issuance_date: NaiveDate,
    pub expiration_date: NaiveDate,
    #[serde(default)]
    pub status: LicenseStatus,
}

impl License {
    pub fn days_until_expiration(&self, today: NaiveDate) -> i64 {
        (self.expiration_date - today).num_days()
    }

    pub fn link(&self) -> LicenseLink {
        LicenseLink {
            license_id: self.id.clone(),
            license_number: self.license_number.clone(),
            license_type: self.license_type.clone(),
        }
    }
}
