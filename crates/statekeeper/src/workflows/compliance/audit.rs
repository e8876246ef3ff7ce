use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{AuditDraft, AuditEntryType, AuditLogEntry};

/// Sequencer for append-only audit entries.
///
/// Timestamps never go backwards even if the injected clock does, and every
/// entry gets a registry-wide sequence number so equal timestamps still sort
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    last_timestamp: Option<DateTime<Utc>>,
    next_sequence: u64,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self {
            last_timestamp: None,
            next_sequence: 1,
        }
    }

    /// Continue after the newest of a set of previously persisted entries.
    pub fn resume<'a>(entries: impl IntoIterator<Item = &'a AuditLogEntry>) -> Self {
        let mut trail = Self::new();
        for entry in entries {
            trail.last_timestamp = trail.last_timestamp.max(Some(entry.timestamp));
            trail.next_sequence = trail.next_sequence.max(entry.sequence.saturating_add(1));
        }
        trail
    }

    pub(crate) fn stamp(
        &mut self,
        state_id: &str,
        draft: AuditDraft,
        default_user: &str,
        now: DateTime<Utc>,
    ) -> AuditLogEntry {
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let sequence = self.next_sequence.max(1);
        self.next_sequence = sequence + 1;

        AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            state_id: state_id.to_string(),
            timestamp,
            sequence,
            user: draft.user.unwrap_or_else(|| default_user.to_string()),
            action: draft.action,
            description: draft.description,
            kind: draft.kind,
            date: draft.date,
        }
    }
}

/// Which date an audit range filter applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDateField {
    /// The event's effective date; entries without one never match.
    #[default]
    Effective,
    Recorded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub state_id: Option<String>,
    pub kind: Option<AuditEntryType>,
    pub date_field: AuditDateField,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub text: Option<String>,
}

impl AuditQuery {
    pub fn for_state(state_id: impl Into<String>) -> Self {
        Self {
            state_id: Some(state_id.into()),
            ..Self::default()
        }
    }

    pub fn of_kind(mut self, kind: AuditEntryType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn between(
        mut self,
        field: AuditDateField,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Self {
        self.date_field = field;
        self.from = from;
        self.to = to;
        self
    }

    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(state_id) = &self.state_id {
            if &entry.state_id != state_id {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            if entry.kind != Some(kind) {
                return false;
            }
        }

        if self.from.is_some() || self.to.is_some() {
            let date = match self.date_field {
                AuditDateField::Effective => entry.date,
                AuditDateField::Recorded => Some(entry.timestamp.date_naive()),
            };
            let Some(date) = date else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }

        match &self.text {
            Some(text) if !text.trim().is_empty() => entry
                .description
                .to_lowercase()
                .contains(&text.trim().to_lowercase()),
            _ => true,
        }
    }
}

/// Filter entries and order them newest first.
pub fn query<'a>(
    entries: impl IntoIterator<Item = &'a AuditLogEntry>,
    filter: &AuditQuery,
) -> Vec<AuditLogEntry> {
    let mut matched: Vec<AuditLogEntry> = entries
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .cloned()
        .collect();
    matched.sort_by_key(|entry| Reverse((entry.timestamp, entry.sequence)));
    matched
}
