use std::fmt;

/// Entity kinds that can fail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    State,
    ComplianceItem,
    Document,
    Note,
    License,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::State => "state",
            EntityKind::ComplianceItem => "compliance item",
            EntityKind::Document => "document",
            EntityKind::Note => "note",
            EntityKind::License => "license",
        };
        f.write_str(label)
    }
}

/// Error taxonomy shared by every engine component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
