use crate::StatType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Every status effect the engine knows how to carry on a combatant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum EffectKind {
    // Stat modifiers
    AttackUp,
    AttackDown,
    DefenseUp,
    DefenseDown,
    SpeedUp,
    SpeedDown,
    Fury,
    // Periodic
    Poison,
    Burn,
    Bleed,
    Regen,
    // Control
    Stun,
    Seated,
    Taunt,
    Marked,
    // Offensive flags
    Vicious,
    Echoing,
    Empowered,
    Haste,
    Loaded,
    // Defensive
    Evasion,
    Shield,
    Guardian,
    Reflect,
    Thorns,
    StoredDamage,
    DeathPrevention,
    DebuffImmunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Buff,
    Debuff,
}

/// How a repeated application of the same effect is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stacking {
    /// One instance per origin class; reapplication refreshes duration and magnitude.
    #[default]
    Refresh,
    /// Every application is an independent instance.
    MultiInstance,
    /// A single instance whose stack counter grows up to the cap.
    CounterStack { max_stacks: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Periodic {
    Damage,
    Heal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub kind: EffectKind,
    pub polarity: Polarity,
    #[serde(default)]
    pub stacking: Stacking,
    #[serde(default)]
    pub stat: Option<StatType>,
    #[serde(default)]
    pub periodic: Option<Periodic>,
}

impl StatusDefinition {
    /// The built-in definition for `kind`. Content packs may override any of these.
    pub fn standard(kind: EffectKind) -> Self {
        use EffectKind::*;

        let polarity = match kind {
            AttackDown | DefenseDown | SpeedDown | Poison | Burn | Bleed | Stun | Seated
            | Marked => Polarity::Debuff,
            _ => Polarity::Buff,
        };
        let stacking = match kind {
            Fury => Stacking::CounterStack { max_stacks: 5 },
            Bleed => Stacking::MultiInstance,
            _ => Stacking::Refresh,
        };
        let stat = match kind {
            AttackUp | AttackDown | Fury => Some(StatType::Attack),
            DefenseUp | DefenseDown => Some(StatType::Defense),
            SpeedUp | SpeedDown => Some(StatType::Speed),
            _ => None,
        };
        let periodic = match kind {
            Poison | Burn | Bleed => Some(Periodic::Damage),
            Regen => Some(Periodic::Heal),
            _ => None,
        };

        Self {
            kind,
            polarity,
            stacking,
            stat,
            periodic,
        }
    }

    pub fn is_debuff(&self) -> bool {
        self.polarity == Polarity::Debuff
    }

    /// Signed stat contribution per stack, in percent.
    pub fn stat_sign(&self) -> i64 {
        match self.polarity {
            Polarity::Buff => 1,
            Polarity::Debuff => -1,
        }
    }
}

pub fn standard_status_definitions() -> Vec<StatusDefinition> {
    EffectKind::iter().map(StatusDefinition::standard).collect()
}
