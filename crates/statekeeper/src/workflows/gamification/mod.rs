//! Points, levels, streaks and achievements earned by completing obligations.

pub mod catalog;
pub mod domain;
pub mod engine;

pub use catalog::{AchievementCatalog, AchievementContext, AchievementDefinition, UnlockCriterion};
pub use domain::{level_for, Achievement, GamificationData, POINTS_PER_LEVEL};
pub use engine::{GamificationEngine, GamificationRules};
