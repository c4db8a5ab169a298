use crate::battle::calculators::apply_heal;
use crate::battle::effects::apply_application;
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnRng};
use crate::combatant::{Combatant, UnitId};
use schema::{
    EffectApplication, EffectTarget, LeaderCondition, LeaderEffectKind, LeaderSkill, Side, StatType,
};
use serde::{Deserialize, Serialize};

/// A leader skill in play for one side, with the triggers it already spent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActiveLeader {
    pub side: Side,
    pub leader: UnitId,
    pub skill: LeaderSkill,
    fired_timed: Vec<usize>,
    /// Threshold effects that fired and have not re-armed yet. A `None`
    /// unit marks a once-per-battle effect, which never re-arms.
    fired_thresholds: Vec<(usize, Option<UnitId>)>,
}

/// True when every condition in the list holds for `unit`.
pub fn matches_conditions(unit: &Combatant, conditions: &[LeaderCondition]) -> bool {
    conditions.iter().all(|condition| match condition {
        LeaderCondition::ClassIs(class) => unit.class_id == *class,
        LeaderCondition::ClassIsNot(class) => unit.class_id != *class,
        LeaderCondition::RoleIs(role) => unit.role == *role,
        LeaderCondition::RoleIsNot(role) => unit.role != *role,
        LeaderCondition::HpBelowPct(pct) => unit.hp_pct() < *pct,
    })
}

fn announce(state: &BattleState, leader: &ActiveLeader, detail: String, bus: &mut EventBus) {
    tracing::debug!(side = %leader.side, skill = %leader.skill.name, %detail, "leader skill");
    bus.push(BattleEvent::LeaderSkillActivated {
        side: leader.side,
        leader: format!("{} - {}", state.name_of(leader.leader), leader.skill.name),
        detail,
    });
}

/// Units an application reaches when fired by a leader on `side`.
fn recipients(state: &BattleState, side: Side, application: &EffectApplication, conditions: &[LeaderCondition]) -> Vec<UnitId> {
    match application.target {
        EffectTarget::AllEnemies => state.living(side.opponent()),
        _ => state
            .living(side)
            .into_iter()
            .filter(|&id| state.unit(id).is_some_and(|u| matches_conditions(u, conditions)))
            .collect(),
    }
}

/// Grants the passive parts of every installed leader skill to `unit`.
/// Called once per unit at battle start and for each summon.
pub fn apply_passives_to(state: &mut BattleState, unit: UnitId) {
    let Some(side) = state.side_of(unit) else {
        return;
    };
    let leaders: Vec<LeaderSkill> = state
        .leaders
        .iter()
        .filter(|leader| leader.side == side)
        .map(|leader| leader.skill.clone())
        .collect();

    let Some(holder) = state.unit_mut(unit) else {
        return;
    };
    for skill in leaders {
        for effect in &skill.effects {
            if !matches_conditions(holder, &effect.conditions) {
                continue;
            }
            match &effect.kind {
                LeaderEffectKind::PassiveStat { stat, pct } => match stat {
                    StatType::Hp => {
                        let bonus = (holder.max_hp as i64 * *pct as i64 / 100) as i64;
                        holder.max_hp = (holder.max_hp as i64 + bonus).max(1) as u32;
                        holder.hp = (holder.hp as i64 + bonus).clamp(1, holder.max_hp as i64) as u32;
                    }
                    StatType::Attack => holder.leader_bonus.attack_pct += pct,
                    StatType::Defense => holder.leader_bonus.defense_pct += pct,
                    StatType::Speed => holder.leader_bonus.speed_pct += pct,
                },
                LeaderEffectKind::PassiveLifesteal { pct } => holder.leader_bonus.lifesteal_pct += pct,
                LeaderEffectKind::PassiveRegen { pct } => holder.leader_bonus.regen_pct += pct,
                _ => {}
            }
        }
    }
}

/// Installs the leader skills for both sides and fires their battle-start parts.
pub fn install_leaders(
    state: &mut BattleState,
    leaders: &[UnitId],
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    for &leader in leaders {
        let Some(unit) = state.unit(leader) else {
            continue;
        };
        let Some(skill) = unit.leader_skill.clone() else {
            continue;
        };
        let active = ActiveLeader {
            side: unit.side,
            leader,
            skill,
            fired_timed: Vec::new(),
            fired_thresholds: Vec::new(),
        };
        announce(state, &active, active.skill.name.clone(), bus);
        state.leaders.push(active);
    }

    let all_units: Vec<UnitId> = state.units.iter().map(|u| u.id).collect();
    for unit in all_units {
        apply_passives_to(state, unit);
    }

    for index in 0..state.leaders.len() {
        let leader = state.leaders[index].clone();
        for effect in &leader.skill.effects {
            if let LeaderEffectKind::BattleStartDebuff(application) = &effect.kind {
                let targets = match application.target {
                    EffectTarget::AllEnemies => state.living(leader.side.opponent()),
                    _ => state.living(leader.side),
                };
                for target in targets {
                    apply_application(state, target, application, Some(leader.leader), None, rng, bus);
                }
                announce(state, &leader, format!("{} at battle start", application.kind), bus);
            }
        }
    }
}

/// Round-start leader work: per-round regen, then timed triggers for this round.
pub fn on_round_start(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    let regen: Vec<(UnitId, u32)> = state
        .units
        .iter()
        .filter(|u| u.is_alive() && u.leader_bonus.regen_pct > 0)
        .map(|u| (u.id, (u.max_hp as u64 * u.leader_bonus.regen_pct as u64 / 100) as u32))
        .collect();
    for (unit, amount) in regen {
        apply_heal(state, unit, amount, bus);
    }

    let round = state.round;
    for index in 0..state.leaders.len() {
        let leader = state.leaders[index].clone();
        for (effect_index, effect) in leader.skill.effects.iter().enumerate() {
            let LeaderEffectKind::Timed { round: at, effect: application } = &effect.kind else {
                continue;
            };
            if *at != round || leader.fired_timed.contains(&effect_index) {
                continue;
            }
            state.leaders[index].fired_timed.push(effect_index);
            for target in recipients(state, leader.side, application, &effect.conditions) {
                apply_application(state, target, application, Some(leader.leader), None, rng, bus);
            }
            announce(state, &leader, format!("{} on round {}", application.kind, round), bus);
        }
    }
}

/// Re-arms the per-unit threshold triggers `unit` has climbed back above.
pub fn rearm_thresholds(state: &mut BattleState, unit: UnitId) {
    let Some(hp_pct) = state.unit(unit).filter(|u| u.is_alive()).map(|u| u.hp_pct()) else {
        return;
    };
    for leader in &mut state.leaders {
        let effects = &leader.skill.effects;
        leader.fired_thresholds.retain(|&(effect_index, holder)| {
            if holder != Some(unit) {
                return true;
            }
            match effects.get(effect_index).map(|effect| &effect.kind) {
                Some(LeaderEffectKind::Threshold { hp_below_pct, .. }) => hp_pct < *hp_below_pct,
                _ => true,
            }
        });
    }
}

/// Evaluates HP-threshold triggers after `unit` took damage. An effect
/// fires when the unit crosses from above the line to below it.
pub fn check_thresholds(state: &mut BattleState, unit: UnitId, bus: &mut EventBus, rng: &mut TurnRng) {
    rearm_thresholds(state, unit);
    let Some(holder) = state.unit(unit).cloned() else {
        return;
    };
    if !holder.is_alive() {
        return;
    }

    for index in 0..state.leaders.len() {
        let leader = state.leaders[index].clone();
        if leader.side != holder.side {
            continue;
        }
        for (effect_index, effect) in leader.skill.effects.iter().enumerate() {
            let LeaderEffectKind::Threshold {
                hp_below_pct,
                effect: application,
                once_per_battle,
            } = &effect.kind
            else {
                continue;
            };
            if holder.hp_pct() >= *hp_below_pct || !matches_conditions(&holder, &effect.conditions) {
                continue;
            }
            let key = (effect_index, if *once_per_battle { None } else { Some(unit) });
            if leader.fired_thresholds.contains(&key) {
                continue;
            }
            state.leaders[index].fired_thresholds.push(key);

            let targets = match application.target {
                EffectTarget::AllAllies => state.living(leader.side),
                EffectTarget::AllEnemies => state.living(leader.side.opponent()),
                _ => vec![unit],
            };
            for target in targets {
                apply_application(state, target, application, Some(leader.leader), None, rng, bus);
            }
            announce(
                state,
                &leader,
                format!("{} below {}% HP", state.name_of(unit), hp_below_pct),
                bus,
            );
        }
    }
}
