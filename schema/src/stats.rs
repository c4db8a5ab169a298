use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatType {
    Hp,
    Attack,
    Defense,
    Speed,
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_name = match self {
            StatType::Hp => "HP",
            StatType::Attack => "ATK",
            StatType::Defense => "DEF",
            StatType::Speed => "SPD",
        };
        write!(f, "{}", display_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
}

impl BaseStats {
    pub fn new(hp: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            hp,
            attack,
            defense,
            speed,
        }
    }

    pub fn get(&self, stat: StatType) -> u32 {
        match stat {
            StatType::Hp => self.hp,
            StatType::Attack => self.attack,
            StatType::Defense => self.defense,
            StatType::Speed => self.speed,
        }
    }

    /// Scale every stat by `pct` percent (100 leaves the block unchanged).
    pub fn scaled(&self, pct: u32) -> BaseStats {
        let scale = |value: u32| ((value as u64 * pct as u64) / 100) as u32;
        BaseStats {
            hp: scale(self.hp).max(1),
            attack: scale(self.attack),
            defense: scale(self.defense),
            speed: scale(self.speed),
        }
    }
}
