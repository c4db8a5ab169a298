use crate::{BaseStats, EffectApplication, EffectKind, Finale, LeaderSkill, Role, SkillDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Heroes,
    Enemies,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Heroes => Side::Enemies,
            Side::Enemies => Side::Heroes,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Heroes => 0,
            Side::Enemies => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Heroes => write!(f, "Heroes"),
            Side::Enemies => write!(f, "Enemies"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactiveTrigger {
    AllyBelowHalf,
    AllyHeavyHit { min_pct: u32 },
    AllyDied,
}

fn one() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Passive {
    /// Gains `pct_per_missing_pct`/100 ATK percent per missing HP percent, up to `cap_pct`.
    MissingHpAttack {
        pct_per_missing_pct: u32,
        cap_pct: u32,
    },
    Lifesteal {
        pct: u32,
    },
    OnDeath {
        #[serde(default)]
        damage_atk_pct: u32,
        #[serde(default)]
        ally_effects: Vec<EffectApplication>,
        #[serde(default)]
        enemy_effects: Vec<EffectApplication>,
    },
    ReactiveStacks {
        trigger: ReactiveTrigger,
        kind: EffectKind,
        #[serde(default = "one")]
        stacks: u8,
        duration: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: String,
    pub name: String,
    pub class_id: String,
    pub base_stats: BaseStats,
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
    #[serde(default)]
    pub passives: Vec<Passive>,
    #[serde(default)]
    pub leader_skill: Option<LeaderSkill>,
    #[serde(default)]
    pub finale: Option<Finale>,
    #[serde(default)]
    pub role_override: Option<Role>,
}
