use crate::battle::state::BattleState;
use crate::combatant::{Combatant, UnitId};
use schema::{Passive, StatType};

/// Percent bonus to ATK from missing-HP passives, after each passive's cap.
pub fn missing_hp_attack_pct(unit: &Combatant) -> i64 {
    let missing = unit.missing_hp_pct() as i64;
    unit.passives
        .iter()
        .map(|passive| match passive {
            Passive::MissingHpAttack {
                pct_per_missing_pct,
                cap_pct,
            } => (missing * *pct_per_missing_pct as i64 / 100).min(*cap_pct as i64),
            _ => 0,
        })
        .sum()
}

/// Total percent applied to a base stat: 100 plus every stat effect (each
/// origin class counted separately), the leader bonus and stat passives.
pub fn stat_pct(unit: &Combatant, stat: StatType) -> i64 {
    let from_effects: i64 = unit.effects.iter().map(|effect| effect.stat_pct(stat)).sum();
    let from_leader = unit.leader_bonus.stat_pct(stat) as i64;
    let from_passives = match stat {
        StatType::Attack => missing_hp_attack_pct(unit),
        _ => 0,
    };
    (100 + from_effects + from_leader + from_passives).max(0)
}

pub fn effective_stat(unit: &Combatant, stat: StatType) -> u32 {
    let base = unit.stats.get(stat) as i64;
    (base * stat_pct(unit, stat) / 100) as u32
}

/// Calculate effective attack including stat effects, leader bonuses and passives
pub fn effective_attack(state: &BattleState, unit: UnitId) -> u32 {
    state
        .unit(unit)
        .map(|u| effective_stat(u, StatType::Attack))
        .unwrap_or(0)
}

/// Calculate effective defense including stat effects and leader bonuses
pub fn effective_defense(state: &BattleState, unit: UnitId) -> u32 {
    state
        .unit(unit)
        .map(|u| effective_stat(u, StatType::Defense))
        .unwrap_or(0)
}

/// Calculate effective speed; turn order reads this once per round
pub fn effective_speed(state: &BattleState, unit: UnitId) -> u32 {
    state
        .unit(unit)
        .map(|u| effective_stat(u, StatType::Speed))
        .unwrap_or(0)
}
