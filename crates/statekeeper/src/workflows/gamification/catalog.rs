use serde::{Deserialize, Serialize};

use super::domain::{Achievement, GamificationData};
use crate::workflows::compliance::{Priority, StateRegistry};

/// Unlock condition for an achievement, as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum UnlockCriterion {
    ItemsCompleted(u64),
    HighPriorityCompleted(u64),
    StreakDays(u64),
    PointsReached(u64),
    LevelReached(u64),
    StatesTracked(u64),
}

impl UnlockCriterion {
    pub fn is_met(&self, context: &AchievementContext, data: &GamificationData) -> bool {
        match *self {
            Self::ItemsCompleted(n) => context.items_completed >= n,
            Self::HighPriorityCompleted(n) => context.high_priority_completed >= n,
            Self::StreakDays(n) => data.weekly_streak >= n,
            Self::PointsReached(n) => data.points >= n,
            Self::LevelReached(n) => data.level >= n,
            Self::StatesTracked(n) => context.states_tracked >= n,
        }
    }
}

/// Facts about the user's compliance work that unlock predicates read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AchievementContext {
    pub items_completed: u64,
    pub high_priority_completed: u64,
    pub states_tracked: u64,
}

impl AchievementContext {
    pub fn from_registry(registry: &StateRegistry) -> Self {
        let mut context = Self {
            states_tracked: registry.states().len() as u64,
            ..Self::default()
        };
        for item in registry.all_items().filter(|item| item.completed) {
            context.items_completed += 1;
            if item.priority == Priority::High {
                context.high_priority_completed += 1;
            }
        }
        context
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub points: u64,
    pub icon: String,
    pub criterion: UnlockCriterion,
}

impl AchievementDefinition {
    pub fn new(
        id: &str,
        title: &str,
        description: &str,
        points: u64,
        icon: &str,
        criterion: UnlockCriterion,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            points,
            icon: icon.to_string(),
            criterion,
        }
    }

    /// Locked achievement record for a user who has not earned it yet.
    pub fn locked(&self) -> Achievement {
        Achievement {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            points: self.points,
            icon: self.icon.clone(),
            unlocked: false,
            unlocked_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    pub fn new(definitions: Vec<AchievementDefinition>) -> Self {
        Self { definitions }
    }

    pub fn standard() -> Self {
        Self::new(standard_definitions())
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|definition| definition.id == id)
    }
}

fn standard_definitions() -> Vec<AchievementDefinition> {
    use UnlockCriterion::*;

    vec![
        AchievementDefinition::new(
            "first_task",
            "First Steps",
            "Complete your first compliance task",
            10,
            "check-circle",
            ItemsCompleted(1),
        ),
        AchievementDefinition::new(
            "task_master",
            "Task Master",
            "Complete 10 compliance tasks",
            50,
            "list-checks",
            ItemsCompleted(10),
        ),
        AchievementDefinition::new(
            "compliance_champion",
            "Compliance Champion",
            "Complete 50 compliance tasks",
            200,
            "trophy",
            ItemsCompleted(50),
        ),
        AchievementDefinition::new(
            "priority_handler",
            "Priority Handler",
            "Complete 5 high priority tasks",
            30,
            "alert-triangle",
            HighPriorityCompleted(5),
        ),
        AchievementDefinition::new(
            "on_a_roll",
            "On a Roll",
            "Stay active 3 days in a row",
            15,
            "flame",
            StreakDays(3),
        ),
        AchievementDefinition::new(
            "week_warrior",
            "Week Warrior",
            "Stay active 7 days in a row",
            50,
            "calendar-check",
            StreakDays(7),
        ),
        AchievementDefinition::new(
            "multi_state",
            "Multi-State Professional",
            "Track compliance in 3 states",
            25,
            "map",
            StatesTracked(3),
        ),
        AchievementDefinition::new(
            "rising_star",
            "Rising Star",
            "Reach level 5",
            100,
            "star",
            LevelReached(5),
        ),
    ]
}
