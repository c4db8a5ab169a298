use crate::errors::{ContentError, ContentResult};
use serde::{Deserialize, Serialize};

/// Tunable battle constants. Every field has a default, so a RON file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub max_units_per_side: usize,
    pub damage_reduction_cap_pct: u32,
    pub marked_bonus_pct: u32,
    pub vicious_bonus_pct: u32,
    pub echo_splash_targets: u8,
    pub echo_splash_pct: u32,
    /// Cooldown the AI imposes on a Mana unit's skill when the skill has none.
    pub ai_mana_cooldown: u8,
    pub level_growth_pct: u32,
    pub star_bonus_pct: u32,
    pub shard_bonus_pct: u32,
    pub boss_power_growth_pct: u32,
    pub max_rounds: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_units_per_side: 5,
            damage_reduction_cap_pct: 80,
            marked_bonus_pct: 25,
            vicious_bonus_pct: 20,
            echo_splash_targets: 2,
            echo_splash_pct: 50,
            ai_mana_cooldown: 2,
            level_growth_pct: 5,
            star_bonus_pct: 10,
            shard_bonus_pct: 3,
            boss_power_growth_pct: 2,
            max_rounds: 50,
        }
    }
}

impl BattleConfig {
    pub fn from_ron_str(text: &str) -> ContentResult<Self> {
        ron::from_str(text).map_err(|e| ContentError::Malformed(e.to_string()))
    }

    /// Stat percent for a unit of the given level, star count and shard tier.
    pub fn growth_pct(&self, level: u32, stars: u32, shard_tier: u32) -> u32 {
        100 + level.saturating_sub(1) * self.level_growth_pct
            + stars.saturating_sub(1) * self.star_bonus_pct
            + shard_tier * self.shard_bonus_pct
    }
}
