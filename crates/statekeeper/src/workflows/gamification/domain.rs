use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const POINTS_PER_LEVEL: u64 = 100;

/// Level for a point total: 0-99 is level 1, 100-199 level 2, and so on.
pub const fn level_for(points: u64) -> u64 {
    points / POINTS_PER_LEVEL + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub points: u64,
    pub icon: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// User-level scoring state. Owned by the user, not by any state profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationData {
    #[serde(default)]
    pub points: u64,
    #[serde(default = "first_level")]
    pub level: u64,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub weekly_streak: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<NaiveDate>,
}

fn first_level() -> u64 {
    1
}

impl Default for GamificationData {
    fn default() -> Self {
        Self {
            points: 0,
            level: first_level(),
            achievements: Vec::new(),
            weekly_streak: 0,
            last_activity_date: None,
        }
    }
}

impl GamificationData {
    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|achievement| achievement.id == id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.achievements
            .iter()
            .filter(|achievement| achievement.unlocked)
            .count()
    }

    /// Points still needed to reach the next level.
    pub fn points_to_next_level(&self) -> u64 {
        POINTS_PER_LEVEL - self.points % POINTS_PER_LEVEL
    }
}
