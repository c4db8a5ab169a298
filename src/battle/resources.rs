use crate::combatant::Combatant;
use schema::{EffectKind, ResourceArchetype, ResourceCost, ResourceRules, SkillDescriptor};
use serde::{Deserialize, Serialize};

/// Per-unit class resource. `current` is the pool for Mana, Rage and Valor
/// and the verse counter for Verse; `focused` is the Focus flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub rules: ResourceRules,
    pub current: u32,
    pub focused: bool,
    pub last_skill: Option<String>,
}

/// What a skill activation paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpendOutcome {
    /// Pool value before the spend; tiers are read from this.
    pub pool_before: u32,
    /// Amount removed by an `All` cost.
    pub drained: u32,
    /// The verse counter reached its cap and reset.
    pub finale_ready: bool,
}

impl ResourcePool {
    pub fn new(rules: ResourceRules) -> Self {
        let current = match rules.archetype {
            ResourceArchetype::Verse => 0,
            _ => rules.start.min(rules.max),
        };
        Self {
            rules,
            current,
            focused: false,
            last_skill: None,
        }
    }

    pub fn none() -> Self {
        Self::new(ResourceRules::default())
    }

    pub fn archetype(&self) -> ResourceArchetype {
        self.rules.archetype
    }

    pub fn max(&self) -> u32 {
        self.rules.max
    }

    /// Adds to the pool, clamped to its max. Returns the amount actually gained.
    pub fn gain(&mut self, amount: u32) -> u32 {
        if !self.is_pooled() {
            return 0;
        }
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.rules.max);
        self.current - before
    }

    pub fn drain(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.current);
        self.current -= taken;
        taken
    }

    fn is_pooled(&self) -> bool {
        matches!(
            self.rules.archetype,
            ResourceArchetype::Mana | ResourceArchetype::Rage | ResourceArchetype::Valor
        )
    }

    /// Passive regeneration at the start of the holder's turn.
    pub fn on_turn_start(&mut self) -> u32 {
        match self.rules.archetype {
            ResourceArchetype::Mana | ResourceArchetype::Valor => self.gain(self.rules.regen_per_turn),
            _ => 0,
        }
    }

    pub fn on_attack(&mut self) -> u32 {
        match self.rules.archetype {
            ResourceArchetype::Rage => self.gain(self.rules.gain_on_attack),
            _ => 0,
        }
    }

    pub fn on_damage_taken(&mut self) -> u32 {
        match self.rules.archetype {
            ResourceArchetype::Valor => self.gain(self.rules.gain_on_damage_taken),
            _ => 0,
        }
    }

    pub fn on_self_damage(&mut self) -> u32 {
        match self.rules.archetype {
            ResourceArchetype::Rage => self.gain(self.rules.gain_on_self_damage),
            _ => 0,
        }
    }

    pub fn on_heal_cast(&mut self) -> u32 {
        match self.rules.archetype {
            ResourceArchetype::Mana => self.gain(self.rules.gain_on_heal),
            _ => 0,
        }
    }

    /// Sets the Focus flag. Returns true when the flag changed.
    pub fn grant_focus(&mut self) -> bool {
        if self.rules.archetype != ResourceArchetype::Focus || self.focused {
            return false;
        }
        self.focused = true;
        true
    }

    /// Clears the Focus flag after a hit or a debuff. Returns true when the flag changed.
    pub fn break_focus(&mut self) -> bool {
        if self.rules.archetype != ResourceArchetype::Focus || !self.focused {
            return false;
        }
        self.focused = false;
        true
    }
}

/// Gate check for a skill. Seated holders can never use a skill, not even
/// the basic attack; otherwise the basic attack is not gated by resources.
pub fn can_use_skill(unit: &Combatant, skill: &SkillDescriptor) -> bool {
    if unit.has_effect(EffectKind::Seated) {
        return false;
    }
    if skill.is_basic_attack() {
        return true;
    }
    if unit.cooldown(&skill.name) > 0 {
        return false;
    }

    let pool = &unit.resource;
    match pool.archetype() {
        ResourceArchetype::Verse => {
            unit.skills.len() <= 1 || pool.last_skill.as_deref() != Some(skill.name.as_str())
        }
        ResourceArchetype::Focus => match skill.cost {
            ResourceCost::Free => true,
            _ => pool.focused,
        },
        ResourceArchetype::None => true,
        ResourceArchetype::Mana | ResourceArchetype::Rage | ResourceArchetype::Valor => {
            match skill.cost {
                ResourceCost::Free => true,
                ResourceCost::Amount(cost) => pool.current >= cost,
                ResourceCost::All => pool.current > 0,
            }
        }
    }
}

/// Pays for a skill. Must only be called after `can_use_skill` succeeded;
/// the payment and the activation are one step.
pub fn spend(unit: &mut Combatant, skill: &SkillDescriptor) -> SpendOutcome {
    let multi_skill = unit.skills.len() > 1;
    let pool = &mut unit.resource;
    let mut outcome = SpendOutcome {
        pool_before: pool.current,
        ..SpendOutcome::default()
    };

    match pool.archetype() {
        ResourceArchetype::Mana | ResourceArchetype::Rage | ResourceArchetype::Valor => {
            match skill.cost {
                ResourceCost::Free => {}
                ResourceCost::Amount(cost) => {
                    pool.drain(cost);
                }
                ResourceCost::All => {
                    outcome.drained = pool.current;
                    pool.current = 0;
                }
            }
        }
        ResourceArchetype::Focus => {
            if skill.cost != ResourceCost::Free {
                pool.focused = false;
            }
        }
        ResourceArchetype::Verse => {
            if multi_skill && !skill.is_basic_attack() {
                pool.current += 1;
                if pool.current >= pool.rules.max.max(1) {
                    pool.current = 0;
                    outcome.finale_ready = true;
                }
            }
        }
        ResourceArchetype::None => {}
    }

    if !skill.is_basic_attack() {
        pool.last_skill = Some(skill.name.clone());
    }
    outcome
}
