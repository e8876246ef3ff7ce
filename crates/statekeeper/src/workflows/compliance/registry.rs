use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::audit::{self, AuditQuery, AuditTrail};
use super::domain::{
    AuditDraft, AuditEntryType, AuditLogEntry, ComplianceItem, DocumentRecord, NewDocument,
    NewStateProfile, Note, StatePatch, StateProfile,
};
use super::scheduler::ComplianceItemScheduler;
use crate::clock::Clock;
use crate::workflows::errors::{EngineError, EntityKind};

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-memory store of state profiles and their children.
///
/// Every successful mutation appends exactly one audit entry. Profiles are only
/// handed out by shared reference so recorded audit entries cannot be edited.
pub struct StateRegistry {
    states: Vec<StateProfile>,
    archived_audit: Vec<AuditLogEntry>,
    trail: AuditTrail,
    actor: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegistry")
            .field("states", &self.states.len())
            .field("archived_audit", &self.archived_audit.len())
            .field("actor", &self.actor)
            .finish()
    }
}

impl StateRegistry {
    pub fn new(clock: Arc<dyn Clock>, actor: impl Into<String>) -> Self {
        Self {
            states: Vec::new(),
            archived_audit: Vec::new(),
            trail: AuditTrail::new(),
            actor: actor.into(),
            clock,
        }
    }

    /// Rehydrate from a persisted snapshot.
    pub fn from_snapshot(
        states: Vec<StateProfile>,
        archived_audit: Vec<AuditLogEntry>,
        clock: Arc<dyn Clock>,
        actor: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for state in &states {
            if !seen.insert(state.id.as_str()) {
                return Err(EngineError::validation(format!(
                    "duplicate state id {} in snapshot",
                    state.id
                )));
            }
        }

        let trail = AuditTrail::resume(
            states
                .iter()
                .flat_map(|state| state.audit_log.iter())
                .chain(archived_audit.iter()),
        );

        Ok(Self {
            states,
            archived_audit,
            trail,
            actor: actor.into(),
            clock,
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn states(&self) -> &[StateProfile] {
        &self.states
    }

    /// Audit entries of deleted states, kept after their owners are gone.
    pub fn archived_audit(&self) -> &[AuditLogEntry] {
        &self.archived_audit
    }

    pub fn state(&self, id: &str) -> Option<&StateProfile> {
        self.states.iter().find(|state| state.id == id)
    }

    pub fn get_state(&self, id: &str) -> Result<&StateProfile, EngineError> {
        self.state(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::State, id))
    }

    /// First state whose abbreviation matches, ignoring case.
    pub fn state_by_abbreviation(&self, abbreviation: &str) -> Option<&StateProfile> {
        let wanted = abbreviation.trim();
        self.states
            .iter()
            .find(|state| state.abbreviation.eq_ignore_ascii_case(wanted))
    }

    pub(crate) fn state_mut(&mut self, id: &str) -> Result<&mut StateProfile, EngineError> {
        self.states
            .iter_mut()
            .find(|state| state.id == id)
            .ok_or_else(|| EngineError::not_found(EntityKind::State, id))
    }

    pub fn all_items(&self) -> impl Iterator<Item = &ComplianceItem> {
        self.states
            .iter()
            .flat_map(|state| state.compliance_items.iter())
    }

    pub fn items(&self, state_id: &str) -> Result<&[ComplianceItem], EngineError> {
        Ok(&self.get_state(state_id)?.compliance_items)
    }

    pub fn item(&self, state_id: &str, item_id: &str) -> Result<&ComplianceItem, EngineError> {
        self.get_state(state_id)?
            .item(item_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::ComplianceItem, item_id))
    }

    pub fn documents(&self, state_id: &str) -> Result<&[DocumentRecord], EngineError> {
        Ok(&self.get_state(state_id)?.documents)
    }

    pub fn notes(&self, state_id: &str) -> Result<&[Note], EngineError> {
        Ok(&self.get_state(state_id)?.notes)
    }

    pub fn audit_log(&self, state_id: &str) -> Result<&[AuditLogEntry], EngineError> {
        Ok(&self.get_state(state_id)?.audit_log)
    }

    pub fn scheduler(&mut self) -> ComplianceItemScheduler<'_> {
        ComplianceItemScheduler::new(self)
    }

    /// Append an audit entry to `state_id`'s log.
    pub fn append_audit(
        &mut self,
        state_id: &str,
        draft: AuditDraft,
    ) -> Result<AuditLogEntry, EngineError> {
        let now = self.clock.now();
        let state = self
            .states
            .iter_mut()
            .find(|state| state.id == state_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::State, state_id))?;

        let entry = self.trail.stamp(state_id, draft, &self.actor, now);
        state.audit_log.push(entry.clone());
        debug!(state_id, action = %entry.action, sequence = entry.sequence, "audit entry recorded");
        Ok(entry)
    }

    /// Entries across live and deleted states, newest first.
    pub fn audit_query(&self, filter: &AuditQuery) -> Vec<AuditLogEntry> {
        audit::query(
            self.states
                .iter()
                .flat_map(|state| state.audit_log.iter())
                .chain(self.archived_audit.iter()),
            filter,
        )
    }

    /// Record a free-form event (e.g. a board request or a submission).
    pub fn record_event(
        &mut self,
        state_id: &str,
        draft: AuditDraft,
    ) -> Result<AuditLogEntry, EngineError> {
        if draft.action.trim().is_empty() {
            return Err(EngineError::validation("audit action is required"));
        }
        self.append_audit(state_id, draft)
    }

    pub fn create_state(&mut self, profile: NewStateProfile) -> Result<StateProfile, EngineError> {
        let name = profile.name.trim().to_string();
        let abbreviation = profile.abbreviation.trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(EngineError::validation("state name is required"));
        }
        if abbreviation.is_empty() {
            return Err(EngineError::validation("state abbreviation is required"));
        }

        let id = match profile.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => generate_id(),
        };
        if self.state(&id).is_some() {
            return Err(EngineError::validation(format!("state id {id} already exists")));
        }
        for link in [&profile.associated_license_id, &profile.reciprocal_of]
            .into_iter()
            .flatten()
        {
            self.get_state(link)?;
        }

        let created_at: DateTime<Utc> = self.clock.now();
        let state = StateProfile {
            id: id.clone(),
            name,
            abbreviation,
            status: profile.status,
            associated_license_id: profile.associated_license_id,
            reciprocal_of: profile.reciprocal_of,
            compliance_items: Vec::new(),
            documents: Vec::new(),
            audit_log: Vec::new(),
            notes: Vec::new(),
            disciplinary: profile.disciplinary,
            monitor: profile.monitor,
            provider: profile.provider,
            created_at,
        };

        let description = match &state.reciprocal_of {
            Some(primary) => format!(
                "Added {} ({}) as a reciprocal of {primary}",
                state.name, state.abbreviation
            ),
            None => format!("Added {} ({})", state.name, state.abbreviation),
        };
        self.states.push(state);
        self.append_audit(&id, AuditDraft::new("State Created", description))?;

        self.get_state(&id).cloned()
    }

    pub fn update_state(
        &mut self,
        id: &str,
        patch: StatePatch,
    ) -> Result<StateProfile, EngineError> {
        let state = self.state_mut(id)?;
        let mut changed = Vec::new();

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(EngineError::validation("state name cannot be blank"));
            }
            if name != state.name {
                state.name = name;
                changed.push("name");
            }
        }
        if let Some(abbreviation) = patch.abbreviation {
            let abbreviation = abbreviation.trim().to_ascii_uppercase();
            if abbreviation.is_empty() {
                return Err(EngineError::validation("state abbreviation cannot be blank"));
            }
            if abbreviation != state.abbreviation {
                state.abbreviation = abbreviation;
                changed.push("abbreviation");
            }
        }
        if let Some(status) = patch.status {
            if status != state.status {
                state.status = status;
                changed.push("status");
            }
        }
        if let Some(disciplinary) = patch.disciplinary {
            state.disciplinary = Some(disciplinary);
            changed.push("disciplinary record");
        }
        if let Some(monitor) = patch.monitor {
            state.monitor = Some(monitor);
            changed.push("monitor");
        }
        if let Some(provider) = patch.provider {
            state.provider = Some(provider);
            changed.push("provider");
        }

        let description = if changed.is_empty() {
            format!("Saved {} with no changes", state.name)
        } else {
            format!("Updated {} of {}", changed.join(", "), state.name)
        };
        self.append_audit(id, AuditDraft::new("State Updated", description))?;
        self.get_state(id).cloned()
    }

    /// Remove `id` and, transitively, every profile that depends on a removed one.
    ///
    /// Returns the removed ids in removal order. Each removal is recorded in
    /// the archived audit log since the profile's own log goes with it.
    pub fn delete_state(&mut self, id: &str) -> Result<Vec<String>, EngineError> {
        let root = self.get_state(id)?;
        let root_label = format!("{} ({})", root.name, root.abbreviation);

        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor].clone();
            for state in &self.states {
                if state.depends_on(&current) && !doomed.contains(&state.id) {
                    doomed.push(state.id.clone());
                }
            }
            cursor += 1;
        }

        let now = self.clock.now();
        for doomed_id in &doomed {
            let Some(position) = self.states.iter().position(|state| &state.id == doomed_id)
            else {
                continue;
            };
            let removed = self.states.remove(position);
            let description = if doomed_id == id {
                format!(
                    "Deleted {} ({}) with {} compliance items",
                    removed.name,
                    removed.abbreviation,
                    removed.compliance_items.len()
                )
            } else {
                format!(
                    "Deleted {} ({}) in cascade from {root_label}",
                    removed.name, removed.abbreviation
                )
            };
            let entry = self.trail.stamp(
                doomed_id,
                AuditDraft::new("State Deleted", description),
                &self.actor,
                now,
            );
            self.archived_audit.push(entry);
        }

        debug!(root = id, removed = doomed.len(), "state deleted");
        Ok(doomed)
    }

    pub fn add_document(
        &mut self,
        state_id: &str,
        document: NewDocument,
    ) -> Result<DocumentRecord, EngineError> {
        let name = document.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::validation("document name is required"));
        }
        let today = self.clock.today();
        let record = DocumentRecord {
            id: generate_id(),
            name,
            category: document.category,
            uploaded_on: document.uploaded_on.unwrap_or(today),
            storage_key: document.storage_key,
            expires_on: document.expires_on,
        };

        self.state_mut(state_id)?.documents.push(record.clone());
        self.append_audit(
            state_id,
            AuditDraft::new("Document Added", format!("Added document {}", record.name))
                .with_kind(AuditEntryType::Submission)
                .effective_on(record.uploaded_on),
        )?;
        Ok(record)
    }

    pub fn remove_document(
        &mut self,
        state_id: &str,
        document_id: &str,
    ) -> Result<DocumentRecord, EngineError> {
        let state = self.state_mut(state_id)?;
        let position = state
            .documents
            .iter()
            .position(|document| document.id == document_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Document, document_id))?;
        let removed = state.documents.remove(position);
        self.append_audit(
            state_id,
            AuditDraft::new("Document Removed", format!("Removed document {}", removed.name)),
        )?;
        Ok(removed)
    }

    pub fn add_note(&mut self, state_id: &str, content: &str) -> Result<Note, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::validation("note content is required"));
        }
        let note = Note {
            id: generate_id(),
            content: content.to_string(),
            created_at: self.clock.now(),
        };
        self.state_mut(state_id)?.notes.push(note.clone());
        self.append_audit(state_id, AuditDraft::new("Note Added", preview(content)))?;
        Ok(note)
    }

    pub fn remove_note(&mut self, state_id: &str, note_id: &str) -> Result<Note, EngineError> {
        let state = self.state_mut(state_id)?;
        let position = state
            .notes
            .iter()
            .position(|note| note.id == note_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Note, note_id))?;
        let removed = state.notes.remove(position);
        self.append_audit(
            state_id,
            AuditDraft::new("Note Removed", preview(&removed.content)),
        )?;
        Ok(removed)
    }
}

fn preview(content: &str) -> String {
    const LIMIT: usize = 80;
    match content.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
