use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceArchetype {
    #[default]
    None,
    Mana,
    Rage,
    Valor,
    Focus,
    Verse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Tank,
    Damage,
    Support,
    Healer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn default_max() -> u32 {
    100
}

/// Gain and gate parameters for a class resource. For Verse, `max` is the cap
/// at which the pool resets and the Finale fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRules {
    #[serde(default)]
    pub archetype: ResourceArchetype,
    #[serde(default = "default_max")]
    pub max: u32,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub regen_per_turn: u32,
    #[serde(default)]
    pub gain_on_attack: u32,
    #[serde(default)]
    pub gain_on_damage_taken: u32,
    #[serde(default)]
    pub gain_on_heal: u32,
    #[serde(default)]
    pub gain_on_self_damage: u32,
}

impl Default for ResourceRules {
    fn default() -> Self {
        Self {
            archetype: ResourceArchetype::None,
            max: default_max(),
            start: 0,
            regen_per_turn: 0,
            gain_on_attack: 0,
            gain_on_damage_taken: 0,
            gain_on_heal: 0,
            gain_on_self_damage: 0,
        }
    }
}

impl ResourceRules {
    pub fn of(archetype: ResourceArchetype) -> Self {
        Self {
            archetype,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub resource: ResourceRules,
}
