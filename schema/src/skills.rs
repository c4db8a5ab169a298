use crate::EffectKind;
use serde::{Deserialize, Serialize};

/// Who a skill resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTarget {
    SelfOnly,
    SingleEnemy,
    SingleAlly,
    AllEnemies,
    AllAllies,
    RandomEnemies { count: u8 },
    /// Revive a fallen ally.
    DeadAlly,
    /// Primary target plus up to `extra_targets` other live enemies.
    Chain { extra_targets: u8 },
    /// Primary target plus up to `extra_targets` others at `splash_pct` damage.
    Splash { extra_targets: u8, splash_pct: u32 },
}

impl SkillTarget {
    /// True when the player must pick a target before the skill resolves.
    pub fn needs_selection(&self) -> bool {
        matches!(
            self,
            SkillTarget::SingleEnemy
                | SkillTarget::SingleAlly
                | SkillTarget::DeadAlly
                | SkillTarget::Chain { .. }
                | SkillTarget::Splash { .. }
        )
    }

    pub fn targets_allies(&self) -> bool {
        matches!(
            self,
            SkillTarget::SingleAlly | SkillTarget::AllAllies | SkillTarget::DeadAlly
        )
    }

    pub fn targets_enemies(&self) -> bool {
        matches!(
            self,
            SkillTarget::SingleEnemy
                | SkillTarget::AllEnemies
                | SkillTarget::RandomEnemies { .. }
                | SkillTarget::Chain { .. }
                | SkillTarget::Splash { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResourceCost {
    #[default]
    Free,
    Amount(u32),
    /// Drains the whole pool; usable while the pool is above zero.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectTarget {
    #[default]
    Target,
    Caster,
    AllAllies,
    AllEnemies,
}

fn full_chance() -> u8 {
    100
}

fn one() -> u8 {
    1
}

/// A status effect a skill (or passive, leader skill, finale) applies.
///
/// `value_pct` is interpreted per kind: stat percent for stat modifiers,
/// percent of the caster's ATK for periodic ticks, shields, thorns and
/// death-prevention heals, and percent of damage for reflect, guardian and
/// stored damage. `transfer_pct` and `cap_pct` only matter for death
/// prevention and reflect respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectApplication {
    pub kind: EffectKind,
    pub duration: u8,
    #[serde(default)]
    pub value_pct: u32,
    #[serde(default = "full_chance")]
    pub chance: u8,
    #[serde(default)]
    pub target: EffectTarget,
    #[serde(default)]
    pub requires_debuffed_target: bool,
    #[serde(default = "one")]
    pub stacks: u8,
    #[serde(default)]
    pub transfer_pct: u32,
    #[serde(default)]
    pub cap_pct: u32,
}

impl EffectApplication {
    pub fn new(kind: EffectKind, duration: u8) -> Self {
        Self {
            kind,
            duration,
            value_pct: 0,
            chance: 100,
            target: EffectTarget::Target,
            requires_debuffed_target: false,
            stacks: 1,
            transfer_pct: 0,
            cap_pct: 0,
        }
    }

    pub fn value(mut self, value_pct: u32) -> Self {
        self.value_pct = value_pct;
        self
    }

    pub fn chance(mut self, chance: u8) -> Self {
        self.chance = chance;
        self
    }

    pub fn on(mut self, target: EffectTarget) -> Self {
        self.target = target;
        self
    }

    pub fn stacks(mut self, stacks: u8) -> Self {
        self.stacks = stacks;
        self
    }

    pub fn only_if_debuffed(mut self) -> Self {
        self.requires_debuffed_target = true;
        self
    }

    pub fn transfer(mut self, transfer_pct: u32) -> Self {
        self.transfer_pct = transfer_pct;
        self
    }

    pub fn cap(mut self, cap_pct: u32) -> Self {
        self.cap_pct = cap_pct;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSpec {
    pub multiplier_pct: u32,
    #[serde(default = "one")]
    pub hits: u8,
    #[serde(default)]
    pub ignore_def_pct: u32,
}

impl DamageSpec {
    pub fn single(multiplier_pct: u32) -> Self {
        Self {
            multiplier_pct,
            hits: 1,
            ignore_def_pct: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealSpec {
    #[serde(default)]
    pub atk_pct: u32,
    #[serde(default)]
    pub max_hp_pct: u32,
}

/// Damage adjustment that applies when the target carries `if_target_has`.
/// A multiplier override replaces the skill's base multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalBonus {
    pub if_target_has: EffectKind,
    #[serde(default)]
    pub multiplier_pct: Option<u32>,
    #[serde(default)]
    pub extra_ignore_def_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnKillHook {
    GainResource(u32),
    RecomputeTurnOrder,
    ChainedAoe { multiplier_pct: u32 },
    ApplyToAllEnemies(EffectApplication),
}

/// Magnitude tier read from the caster's resource pool when the skill is cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTier {
    pub threshold: u32,
    #[serde(default)]
    pub bonus_multiplier_pct: u32,
    #[serde(default)]
    pub effect_value_pct: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTier {
    pub min: u32,
    pub max: u32,
    #[serde(default)]
    pub heal_atk_pct: u32,
    #[serde(default)]
    pub effects: Vec<EffectApplication>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSpec {
    pub count: u8,
    pub sides: u8,
    pub tiers: Vec<DiceTier>,
}

impl DiceSpec {
    pub fn max_roll(&self) -> u32 {
        self.count as u32 * self.sides as u32
    }

    /// The tier whose inclusive range contains `total`.
    pub fn tier_for(&self, total: u32) -> Option<&DiceTier> {
        self.tiers
            .iter()
            .find(|tier| tier.min <= total && total <= tier.max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinBranch {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub effects: Vec<EffectApplication>,
    #[serde(default)]
    pub self_damage_pct: u32,
    #[serde(default)]
    pub resource_gain: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinFlipSpec {
    pub heads: CoinBranch,
    pub tails: CoinBranch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonSpec {
    pub template_id: String,
    #[serde(default = "one")]
    pub count: u8,
    #[serde(default)]
    pub fallback_skill: Option<String>,
}

/// Declarative rule table describing one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target: SkillTarget,
    #[serde(default)]
    pub cost: ResourceCost,
    #[serde(default)]
    pub cooldown: u8,
    #[serde(default)]
    pub damage: Option<DamageSpec>,
    #[serde(default)]
    pub heal: Option<HealSpec>,
    #[serde(default)]
    pub effects: Vec<EffectApplication>,
    #[serde(default)]
    pub conditional_bonuses: Vec<ConditionalBonus>,
    #[serde(default)]
    pub on_kill: Vec<OnKillHook>,
    #[serde(default)]
    pub resource_tiers: Vec<ResourceTier>,
    /// Extra damage percent per resource point drained by an `All` cost.
    #[serde(default)]
    pub drain_scaling_pct: u32,
    #[serde(default)]
    pub dice: Option<DiceSpec>,
    #[serde(default)]
    pub coin_flip: Option<CoinFlipSpec>,
    /// Percent of the caster's max HP paid on cast.
    #[serde(default)]
    pub self_damage_pct: u32,
    /// Extra damage percent per percent of the caster's missing HP, read before self damage.
    #[serde(default)]
    pub volatility_pct: u32,
    #[serde(default)]
    pub lifesteal_pct: u32,
    #[serde(default)]
    pub summon: Option<SummonSpec>,
    /// Read resource tiers from the live pool at each use instead of the cast snapshot.
    #[serde(default)]
    pub reads_live_resource: bool,
}

pub const BASIC_ATTACK: &str = "Basic Attack";

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, target: SkillTarget) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            target,
            cost: ResourceCost::Free,
            cooldown: 0,
            damage: None,
            heal: None,
            effects: Vec::new(),
            conditional_bonuses: Vec::new(),
            on_kill: Vec::new(),
            resource_tiers: Vec::new(),
            drain_scaling_pct: 0,
            dice: None,
            coin_flip: None,
            self_damage_pct: 0,
            volatility_pct: 0,
            lifesteal_pct: 0,
            summon: None,
            reads_live_resource: false,
        }
    }

    /// The free single-target strike every unit can fall back on.
    pub fn basic_attack() -> Self {
        let mut skill = Self::new(BASIC_ATTACK, SkillTarget::SingleEnemy);
        skill.damage = Some(DamageSpec::single(100));
        skill
    }

    pub fn is_basic_attack(&self) -> bool {
        self.name == BASIC_ATTACK
    }

    pub fn is_taunt(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.kind == EffectKind::Taunt)
    }

    pub fn hits(&self) -> u8 {
        self.damage.as_ref().map(|d| d.hits.max(1)).unwrap_or(1)
    }

    /// Highest tier whose threshold the pool value reaches.
    pub fn resource_tier(&self, pool: u32) -> Option<&ResourceTier> {
        self.resource_tiers
            .iter()
            .filter(|tier| pool >= tier.threshold)
            .max_by_key(|tier| tier.threshold)
    }
}
