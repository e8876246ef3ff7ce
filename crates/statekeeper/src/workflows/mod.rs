pub mod compliance;
pub mod engine;
pub mod errors;
pub mod gamification;

pub use engine::{ComplianceEngine, CompletionReport, ImportSummary};
pub use errors::{EngineError, EntityKind};
