use serde::Serialize;
use tracing::debug;

use super::domain::{AuditDraft, ComplianceItem, ItemPatch, NewComplianceItem};
use super::recurrence::next_occurrence;
use super::registry::{generate_id, StateRegistry};
use crate::workflows::errors::{EngineError, EntityKind};

/// Result of completing an obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub item: ComplianceItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_instance: Option<ComplianceItem>,
    /// False when the item had been completed before and was reopened.
    pub first_completion: bool,
}

/// Lifecycle and recurrence rules for compliance items, operating on a registry.
pub struct ComplianceItemScheduler<'r> {
    registry: &'r mut StateRegistry,
    actor: Option<String>,
}

impl<'r> ComplianceItemScheduler<'r> {
    pub(crate) fn new(registry: &'r mut StateRegistry) -> Self {
        Self {
            registry,
            actor: None,
        }
    }

    /// Attribute audit entries written by this scheduler to `user`.
    pub fn acting_as(mut self, user: impl Into<String>) -> Self {
        self.actor = Some(user.into());
        self
    }

    fn draft(&self, action: &str, description: String) -> AuditDraft {
        let draft = AuditDraft::new(action, description);
        match &self.actor {
            Some(user) => draft.by(user.clone()),
            None => draft,
        }
    }

    pub fn add_item(
        &mut self,
        state_id: &str,
        item: NewComplianceItem,
    ) -> Result<ComplianceItem, EngineError> {
        let title = item.title.trim().to_string();
        if title.is_empty() {
            return Err(EngineError::validation("compliance item title is required"));
        }
        let due_date = item
            .due_date
            .ok_or_else(|| EngineError::validation("compliance item due date is required"))?;
        if let Some(pattern) = &item.recurrence_pattern {
            pattern.validate()?;
        }

        let created = ComplianceItem {
            id: generate_id(),
            state_id: state_id.to_string(),
            title,
            description: item.description,
            due_date,
            completed: false,
            priority: item.priority,
            recurrence_pattern: item.recurrence_pattern,
            parent_task_id: None,
            completion_note: None,
            completed_on: None,
            reopen_reason: None,
            source_license: item.source_license,
        };

        self.registry
            .state_mut(state_id)?
            .compliance_items
            .push(created.clone());

        let mut description = format!("Added \"{}\" due {}", created.title, created.due_date);
        if let Some(pattern) = &created.recurrence_pattern {
            description.push_str(&format!(", repeating {}", pattern.describe()));
        }
        let draft = self.draft("Task Added", description);
        self.registry.append_audit(state_id, draft)?;

        debug!(state_id, item_id = %created.id, "compliance item added");
        Ok(created)
    }

    pub fn update_item(
        &mut self,
        state_id: &str,
        item_id: &str,
        patch: ItemPatch,
    ) -> Result<ComplianceItem, EngineError> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(EngineError::validation("compliance item title cannot be blank"));
            }
        }
        if let Some(pattern) = &patch.recurrence_pattern {
            pattern.validate()?;
        }

        let item = item_mut(self.registry, state_id, item_id)?;
        let mut changed = Vec::new();
        if let Some(title) = patch.title {
            item.title = title.trim().to_string();
            changed.push("title");
        }
        if let Some(description) = patch.description {
            item.description = description;
            changed.push("description");
        }
        if let Some(due_date) = patch.due_date {
            item.due_date = due_date;
            changed.push("due date");
        }
        if let Some(priority) = patch.priority {
            item.priority = priority;
            changed.push("priority");
        }
        if patch.clear_recurrence {
            item.recurrence_pattern = None;
            changed.push("recurrence");
        } else if let Some(pattern) = patch.recurrence_pattern {
            item.recurrence_pattern = Some(pattern);
            changed.push("recurrence");
        }
        let updated = item.clone();

        let description = if changed.is_empty() {
            format!("Saved \"{}\" with no changes", updated.title)
        } else {
            format!("Updated {} of \"{}\"", changed.join(", "), updated.title)
        };
        let draft = self.draft("Task Updated", description);
        self.registry.append_audit(state_id, draft)?;
        Ok(updated)
    }

    pub fn remove_item(
        &mut self,
        state_id: &str,
        item_id: &str,
    ) -> Result<ComplianceItem, EngineError> {
        let state = self.registry.state_mut(state_id)?;
        let position = state
            .compliance_items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::ComplianceItem, item_id))?;
        let removed = state.compliance_items.remove(position);

        let draft = self.draft("Task Removed", format!("Removed \"{}\"", removed.title));
        self.registry.append_audit(state_id, draft)?;
        Ok(removed)
    }

    /// Mark an item complete and, for recurring items, schedule the next instance.
    ///
    /// The completion and any spawned instance are recorded as a single audit entry.
    /// Completing a reopened item never spawns a second instance for the same period.
    pub fn complete_item(
        &mut self,
        state_id: &str,
        item_id: &str,
        note: Option<String>,
    ) -> Result<CompletionOutcome, EngineError> {
        let today = self.registry.clock().today();
        let current = self.registry.item(state_id, item_id)?;
        if current.completed {
            return Err(EngineError::validation(format!(
                "\"{}\" is already completed",
                current.title
            )));
        }

        let first_completion = current.reopen_reason.is_none();
        let mut completed = current.clone();
        completed.completed = true;
        completed.completed_on = Some(today);
        completed.completion_note = note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        let mut next_instance = self.expand_recurrence(&completed)?;
        if let Some(instance) = &next_instance {
            if self.period_already_scheduled(instance)? {
                next_instance = None;
            }
        }

        *item_mut(self.registry, state_id, item_id)? = completed.clone();
        if let Some(instance) = &next_instance {
            self.registry
                .state_mut(state_id)?
                .compliance_items
                .push(instance.clone());
        }

        let mut description = format!("Completed \"{}\"", completed.title);
        if let Some(note) = &completed.completion_note {
            description.push_str(&format!(": {note}"));
        }
        if let Some(instance) = &next_instance {
            description.push_str(&format!("; next occurrence due {}", instance.due_date));
        }
        let draft = self
            .draft("Task Completed", description)
            .effective_on(today);
        self.registry.append_audit(state_id, draft)?;

        debug!(
            state_id,
            item_id,
            spawned = next_instance.is_some(),
            "compliance item completed"
        );
        Ok(CompletionOutcome {
            item: completed,
            next_instance,
            first_completion,
        })
    }

    fn period_already_scheduled(&self, instance: &ComplianceItem) -> Result<bool, EngineError> {
        let lineage = instance.lineage_id();
        Ok(self.registry.items(&instance.state_id)?.iter().any(|candidate| {
            candidate.lineage_id() == lineage && candidate.due_date == instance.due_date
        }))
    }

    /// Reopen a completed item. Never triggers recurrence.
    pub fn reopen_item(
        &mut self,
        state_id: &str,
        item_id: &str,
        reason: &str,
    ) -> Result<ComplianceItem, EngineError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::validation("a reason is required to reopen an item"));
        }

        let item = item_mut(self.registry, state_id, item_id)?;
        if !item.completed {
            return Err(EngineError::validation(format!(
                "\"{}\" is not completed",
                item.title
            )));
        }
        item.completed = false;
        item.completed_on = None;
        item.reopen_reason = Some(reason.to_string());
        let reopened = item.clone();

        let draft = self.draft(
            "Task Reopened",
            format!("Reopened \"{}\": {reason}", reopened.title),
        );
        self.registry.append_audit(state_id, draft)?;
        Ok(reopened)
    }

    /// Next instance of a recurring item, or `None` when it does not recur or
    /// its pattern has run out. Does not insert anything.
    pub fn expand_recurrence(
        &self,
        item: &ComplianceItem,
    ) -> Result<Option<ComplianceItem>, EngineError> {
        let Some(pattern) = &item.recurrence_pattern else {
            return Ok(None);
        };

        let lineage = item.lineage_id();
        let generated = self
            .registry
            .items(&item.state_id)?
            .iter()
            .filter(|candidate| candidate.parent_task_id.as_deref() == Some(lineage))
            .count();

        let Some(due_date) = next_occurrence(pattern, item.due_date, generated)? else {
            return Ok(None);
        };

        Ok(Some(ComplianceItem {
            id: generate_id(),
            state_id: item.state_id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            due_date,
            completed: false,
            priority: item.priority,
            recurrence_pattern: Some(pattern.clone()),
            parent_task_id: Some(lineage.to_string()),
            completion_note: None,
            completed_on: None,
            reopen_reason: None,
            source_license: None,
        }))
    }
}

fn item_mut<'a>(
    registry: &'a mut StateRegistry,
    state_id: &str,
    item_id: &str,
) -> Result<&'a mut ComplianceItem, EngineError> {
    registry
        .state_mut(state_id)?
        .compliance_items
        .iter_mut()
        .find(|item| item.id == item_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::ComplianceItem, item_id))
}
