use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use super::catalog::{AchievementCatalog, AchievementContext};
use super::domain::{level_for, Achievement, GamificationData};
use crate::clock::Clock;
use crate::config::GamificationConfig;
use crate::workflows::compliance::{ComplianceItem, Priority};
use crate::workflows::errors::EngineError;

const DEFAULT_POINTS_PER_ITEM: u64 = 10;
const DEFAULT_HIGH_PRIORITY_BONUS: u64 = 5;
const DEFAULT_ON_TIME_BONUS: u64 = 5;

/// Points granted for finishing an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamificationRules {
    pub points_per_item: u64,
    pub high_priority_bonus: u64,
    pub on_time_bonus: u64,
}

impl Default for GamificationRules {
    fn default() -> Self {
        Self {
            points_per_item: DEFAULT_POINTS_PER_ITEM,
            high_priority_bonus: DEFAULT_HIGH_PRIORITY_BONUS,
            on_time_bonus: DEFAULT_ON_TIME_BONUS,
        }
    }
}

impl From<&GamificationConfig> for GamificationRules {
    fn from(config: &GamificationConfig) -> Self {
        Self {
            points_per_item: config.points_per_item,
            high_priority_bonus: config.high_priority_bonus,
            on_time_bonus: config.on_time_bonus,
        }
    }
}

impl GamificationRules {
    pub fn completion_reward(&self, item: &ComplianceItem) -> u64 {
        let mut reward = self.points_per_item;
        if item.priority == Priority::High {
            reward += self.high_priority_bonus;
        }
        if item.completed_on_time() {
            reward += self.on_time_bonus;
        }
        reward
    }
}

/// Keeps points, level, streak and achievements for one user.
pub struct GamificationEngine {
    data: GamificationData,
    catalog: AchievementCatalog,
    rules: GamificationRules,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GamificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamificationEngine")
            .field("data", &self.data)
            .field("rules", &self.rules)
            .finish()
    }
}

impl GamificationEngine {
    /// Wrap persisted data. The stored level is re-derived from points and any
    /// catalog achievement the user has never seen is added locked.
    pub fn new(
        mut data: GamificationData,
        catalog: AchievementCatalog,
        rules: GamificationRules,
        clock: Arc<dyn Clock>,
    ) -> Self {
        data.level = level_for(data.points);
        for definition in catalog.definitions() {
            if data.achievement(&definition.id).is_none() {
                data.achievements.push(definition.locked());
            }
        }

        Self {
            data,
            catalog,
            rules,
            clock,
        }
    }

    pub fn data(&self) -> &GamificationData {
        &self.data
    }

    pub fn into_data(self) -> GamificationData {
        self.data
    }

    pub fn catalog(&self) -> &AchievementCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &GamificationRules {
        &self.rules
    }

    pub fn current_level(&self) -> u64 {
        level_for(self.data.points)
    }

    /// Add `amount` points. Unlocking is left to `evaluate_achievements`.
    pub fn award_points(&mut self, amount: i64) -> Result<u64, EngineError> {
        let amount = u64::try_from(amount).map_err(|_| {
            EngineError::validation(format!("cannot award a negative amount ({amount})"))
        })?;
        credit(&mut self.data, amount);
        Ok(self.data.points)
    }

    /// Track consecutive active days. Returns the streak after the update.
    pub fn record_activity(&mut self, date: NaiveDate) -> u64 {
        match self.data.last_activity_date {
            Some(last) if last == date => return self.data.weekly_streak,
            Some(last) if last.succ_opt() == Some(date) => {
                self.data.weekly_streak = self.data.weekly_streak.saturating_add(1);
            }
            _ => self.data.weekly_streak = 1,
        }
        self.data.last_activity_date = Some(date);
        self.data.weekly_streak
    }

    /// Unlock every satisfied achievement and award its points.
    ///
    /// Runs until nothing new unlocks, so achievements reachable through the
    /// points of other unlocks are granted in the same call.
    pub fn evaluate_achievements(
        &mut self,
        context: &AchievementContext,
    ) -> Result<Vec<Achievement>, EngineError> {
        let already_unlocked: Vec<String> = self
            .data
            .achievements
            .iter()
            .filter(|achievement| achievement.unlocked)
            .map(|achievement| achievement.id.clone())
            .collect();

        let now = self.clock.now();
        let mut newly_unlocked = Vec::new();
        loop {
            let mut progressed = false;
            for definition in self.catalog.definitions() {
                let position = match self
                    .data
                    .achievements
                    .iter()
                    .position(|achievement| achievement.id == definition.id)
                {
                    Some(position) => position,
                    None => {
                        self.data.achievements.push(definition.locked());
                        self.data.achievements.len() - 1
                    }
                };
                if self.data.achievements[position].unlocked
                    || !definition.criterion.is_met(context, &self.data)
                {
                    continue;
                }

                let achievement = &mut self.data.achievements[position];
                achievement.unlocked = true;
                achievement.unlocked_at = Some(now);
                let unlocked = achievement.clone();
                credit(&mut self.data, unlocked.points);

                info!(achievement = %unlocked.id, points = unlocked.points, "achievement unlocked");
                newly_unlocked.push(unlocked);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        for id in &already_unlocked {
            if !self.data.achievement(id).is_some_and(|achievement| achievement.unlocked) {
                error!(achievement = %id, "previously unlocked achievement is locked again");
                return Err(EngineError::InvariantViolation(format!(
                    "achievement {id} lost its unlocked status"
                )));
            }
        }

        Ok(newly_unlocked)
    }
}

fn credit(data: &mut GamificationData, amount: u64) {
    data.points = data.points.saturating_add(amount);
    data.level = level_for(data.points);
}
