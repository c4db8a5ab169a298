use crate::{EffectApplication, Role, StatType};
use serde::{Deserialize, Serialize};

/// A single predicate in a leader effect's condition list. All conditions
/// in a list must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderCondition {
    ClassIs(String),
    ClassIsNot(String),
    RoleIs(Role),
    RoleIsNot(Role),
    HpBelowPct(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderEffectKind {
    PassiveStat {
        stat: StatType,
        pct: i32,
    },
    PassiveLifesteal {
        pct: u32,
    },
    /// Heals a percent of max HP at the start of every round.
    PassiveRegen {
        pct: u32,
    },
    Timed {
        round: u32,
        effect: EffectApplication,
    },
    Threshold {
        hp_below_pct: u32,
        effect: EffectApplication,
        #[serde(default)]
        once_per_battle: bool,
    },
    /// Applied at battle start to the leader's party, or to the opposing
    /// party when the application targets `AllEnemies`.
    BattleStartDebuff(EffectApplication),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderEffect {
    #[serde(default)]
    pub conditions: Vec<LeaderCondition>,
    pub kind: LeaderEffectKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderSkill {
    pub name: String,
    pub effects: Vec<LeaderEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinaleTarget {
    AllAllies,
    AllEnemies,
}

/// Bundled payload fired when a Verse pool reaches its cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finale {
    pub name: String,
    pub target: FinaleTarget,
    #[serde(default)]
    pub effects: Vec<EffectApplication>,
    #[serde(default)]
    pub damage_atk_pct: u32,
    #[serde(default)]
    pub heal_atk_pct: u32,
    /// Percent of the side's sacrificed HP added to damage and heals.
    #[serde(default)]
    pub sacrifice_scaling_pct: u32,
}
