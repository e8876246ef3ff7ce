//! Compliance obligation lifecycle engine.
//!
//! Tracks the jurisdictions ("states") a professional is licensed in, the
//! obligations owed to each of them, renewal tasks derived from license
//! expirations, an append-only audit trail, and the points/levels/achievements
//! layer that rewards completed work.

pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod telemetry;
pub mod workflows;
