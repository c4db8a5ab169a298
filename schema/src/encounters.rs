use crate::{EffectApplication, SkillDescriptor, Side};
use serde::{Deserialize, Serialize};

fn level_one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroInstance {
    pub template_id: String,
    #[serde(default = "level_one")]
    pub level: u32,
    #[serde(default = "level_one")]
    pub stars: u32,
}

impl HeroInstance {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            level: 1,
            stars: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaOpponent {
    pub template_id: String,
    #[serde(default = "level_one")]
    pub level: u32,
    #[serde(default = "level_one")]
    pub stars: u32,
    #[serde(default)]
    pub shard_tier: u32,
}

/// A boss ability that joins the boss's kit once the power level reaches `unlock_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossAbility {
    pub unlock_at: u32,
    pub skill: SkillDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encounter {
    Standard {
        enemies: Vec<String>,
        #[serde(default = "level_one")]
        level: u32,
    },
    ArenaBout {
        opponents: Vec<ArenaOpponent>,
        #[serde(default)]
        leader: Option<usize>,
    },
    GenusLoci {
        boss_id: String,
        power_level: u32,
        #[serde(default)]
        abilities: Vec<BossAbility>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hook {
    OnPreDamage,
    OnPostDamage,
    OnTurnStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Heroes,
    Enemies,
    All,
}

impl Scope {
    pub fn includes(self, side: Side) -> bool {
        match self {
            Scope::All => true,
            Scope::Heroes => side == Side::Heroes,
            Scope::Enemies => side == Side::Enemies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FightEffectKind {
    DamageMultiplier { pct: u32 },
    DamageReduction { pct: u32 },
    PercentMaxHpDamage { pct: u32 },
    PercentMaxHpHeal { pct: u32 },
    Lifesteal { pct: u32 },
    ChanceStatus { chance: u8, effect: EffectApplication },
    Shield { amount: u32 },
}

/// A battle-wide modifier attached to one hook and scoped to one side (or both).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightEffect {
    pub name: String,
    pub hook: Hook,
    pub scope: Scope,
    pub kind: FightEffectKind,
}
