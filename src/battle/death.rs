//! Everything that happens after HP changes: reactive passives, leader
//! thresholds, defeat processing, on-death passives and Finales.

use crate::battle::calculators::{
    apply_damage, apply_heal, calculate_damage, resolve_hit, DamageReport, DamageRequest, HitReport,
};
use crate::battle::effects::{apply_application, clear_all};
use crate::battle::leader::{check_thresholds, rearm_thresholds};
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnRng, VisualKind};
use crate::battle::stats::effective_attack;
use crate::combatant::UnitId;
use schema::{EffectApplication, FinaleTarget, Passive, ReactiveTrigger};

/// Raw damage to one unit followed by every reaction it causes.
pub fn deal_damage(
    state: &mut BattleState,
    target: UnitId,
    amount: u32,
    source: Option<UnitId>,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) -> DamageReport {
    let report = apply_damage(state, target, amount, source, bus);
    after_damage(state, &[(target, report.dealt)], bus, rng);
    report
}

/// A full hit from `attacker` (guardian, reflect, thorns) followed by reactions.
pub fn deal_hit(
    state: &mut BattleState,
    attacker: UnitId,
    target: UnitId,
    amount: u32,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) -> HitReport {
    let report = resolve_hit(state, attacker, target, amount, bus);
    let mut struck = Vec::with_capacity(3);
    if let Some(guardian) = report.guardian {
        struck.push(guardian);
    }
    struck.push((target, report.to_target.dealt));
    struck.push((attacker, report.reflected + report.thorns));
    after_damage(state, &struck, bus, rng);
    report
}

/// Runs reactions for the units just struck, then processes any deaths.
pub fn after_damage(
    state: &mut BattleState,
    struck: &[(UnitId, u32)],
    bus: &mut EventBus,
    rng: &mut TurnRng,
) -> Vec<UnitId> {
    for &(unit, dealt) in struck {
        react_to_damage(state, unit, dealt, bus, rng);
    }
    refresh_health_flags(state, bus, rng);
    process_deaths(state, bus, rng)
}

fn react_to_damage(state: &mut BattleState, unit: UnitId, dealt: u32, bus: &mut EventBus, rng: &mut TurnRng) {
    if dealt == 0 {
        return;
    }
    let dealt_pct = state
        .unit(unit)
        .map(|u| (dealt as u64 * 100 / u.max_hp.max(1) as u64) as u32)
        .unwrap_or(0);
    trigger_reactive(
        state,
        unit,
        |trigger| matches!(trigger, ReactiveTrigger::AllyHeavyHit { min_pct } if dealt_pct >= min_pct),
        bus,
        rng,
    );
}

/// Tracks below-half crossings and evaluates leader thresholds for every
/// living unit.
fn refresh_health_flags(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    let living: Vec<UnitId> = state.units.iter().filter(|u| u.is_alive()).map(|u| u.id).collect();
    for unit in living {
        let crossed = match state.unit_mut(unit) {
            Some(holder) => {
                let below = holder.hp_pct() < 50;
                let crossed = below && !holder.flags.below_half;
                holder.flags.below_half = below;
                crossed
            }
            None => false,
        };
        if crossed {
            trigger_reactive(
                state,
                unit,
                |trigger| matches!(trigger, ReactiveTrigger::AllyBelowHalf),
                bus,
                rng,
            );
        }
        check_thresholds(state, unit, bus, rng);
    }
}

/// Gives reactive stacks to living allies of `subject` whose passive matches.
fn trigger_reactive(
    state: &mut BattleState,
    subject: UnitId,
    matches: impl Fn(ReactiveTrigger) -> bool,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    let Some(side) = state.side_of(subject) else {
        return;
    };
    let reactions: Vec<(UnitId, EffectApplication)> = state
        .units
        .iter()
        .filter(|u| u.side == side && u.id != subject && u.is_alive())
        .flat_map(|u| {
            u.passives.iter().filter_map(move |passive| match passive {
                Passive::ReactiveStacks {
                    trigger,
                    kind,
                    stacks,
                    duration,
                } => Some((u.id, *trigger, *kind, *stacks, *duration)),
                _ => None,
            })
        })
        .filter(|(_, trigger, ..)| matches(*trigger))
        .map(|(id, _, kind, stacks, duration)| (id, EffectApplication::new(kind, duration).stacks(stacks)))
        .collect();

    for (ally, application) in reactions {
        bus.push(BattleEvent::PassiveTriggered {
            unit: ally,
            passive: format!("{} Instinct", application.kind),
        });
        apply_application(state, ally, &application, Some(ally), None, rng, bus);
    }
}

/// Finds units that dropped to 0 HP since the last scan and runs their
/// death consequences. Repeats until a scan finds nobody new, since an
/// on-death passive can kill in turn.
pub fn process_deaths(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) -> Vec<UnitId> {
    let mut fallen = Vec::new();
    loop {
        let newly: Vec<UnitId> = state
            .units
            .iter()
            .filter(|u| !u.is_alive() && !u.flags.defeated)
            .map(|u| u.id)
            .collect();
        if newly.is_empty() {
            break;
        }
        for unit in newly {
            on_defeated(state, unit, bus, rng);
            fallen.push(unit);
        }
    }
    fallen
}

fn on_defeated(state: &mut BattleState, unit: UnitId, bus: &mut EventBus, rng: &mut TurnRng) {
    let Some(holder) = state.unit_mut(unit) else {
        return;
    };
    holder.flags.defeated = true;
    let fire_passive = !holder.flags.on_death_fired;
    holder.flags.on_death_fired = true;
    let on_death = holder.passives.iter().find_map(|passive| match passive {
        Passive::OnDeath {
            damage_atk_pct,
            ally_effects,
            enemy_effects,
        } => Some((*damage_atk_pct, ally_effects.clone(), enemy_effects.clone())),
        _ => None,
    });
    tracing::info!(unit, name = %holder.name, "unit defeated");

    clear_all(state, unit);
    bus.push(BattleEvent::UnitDefeated { unit });
    bus.visual(unit, VisualKind::Death, 0);

    if let (true, Some((damage_atk_pct, ally_effects, enemy_effects))) = (fire_passive, on_death) {
        bus.push(BattleEvent::PassiveTriggered {
            unit,
            passive: "Last Stand".to_string(),
        });
        let enemies = state.enemies_of(unit);
        if damage_atk_pct > 0 && !enemies.is_empty() {
            let victim = enemies[rng.pick_index(enemies.len(), "On-Death Target")];
            let amount = calculate_damage(state, unit, victim, DamageRequest::simple(damage_atk_pct)).total;
            let report = apply_damage(state, victim, amount, Some(unit), bus);
            react_to_damage(state, victim, report.dealt, bus, rng);
        }
        for ally in state.allies_of(unit) {
            for application in &ally_effects {
                apply_application(state, ally, application, Some(unit), None, rng, bus);
            }
        }
        for enemy in state.enemies_of(unit) {
            for application in &enemy_effects {
                apply_application(state, enemy, application, Some(unit), None, rng, bus);
            }
        }
    }

    trigger_reactive(
        state,
        unit,
        |trigger| matches!(trigger, ReactiveTrigger::AllyDied),
        bus,
        rng,
    );
}

/// Brings a fallen unit back with `hp`. Its on-death passive stays spent.
pub fn revive(state: &mut BattleState, unit: UnitId, hp: u32, bus: &mut EventBus) -> bool {
    let Some(holder) = state.unit_mut(unit) else {
        return false;
    };
    if holder.is_alive() {
        return false;
    }
    holder.hp = hp.clamp(1, holder.max_hp.max(1));
    holder.flags.defeated = false;
    holder.flags.below_half = holder.hp_pct() < 50;
    let restored = holder.hp;
    bus.push(BattleEvent::Revived { unit, hp: restored });
    bus.visual(unit, VisualKind::Revive, restored);
    rearm_thresholds(state, unit);
    true
}

/// Fires `unit`'s Finale. Sacrifice-scaled Finales consume the side's
/// sacrificed-HP counter.
pub fn trigger_finale(state: &mut BattleState, unit: UnitId, bus: &mut EventBus, rng: &mut TurnRng) {
    let Some((finale, side)) = state
        .unit(unit)
        .and_then(|u| u.finale.clone().map(|finale| (finale, u.side)))
    else {
        return;
    };

    let sacrifice_bonus = if finale.sacrifice_scaling_pct > 0 {
        let pool = std::mem::take(&mut state.sacrificed_hp[side.index()]);
        (pool as u64 * finale.sacrifice_scaling_pct as u64 / 100) as u32
    } else {
        0
    };
    tracing::info!(unit, finale = %finale.name, sacrifice_bonus, "finale");
    bus.push(BattleEvent::FinaleTriggered {
        unit,
        finale: finale.name.clone(),
        sacrifice_bonus,
    });

    let targets = match finale.target {
        FinaleTarget::AllAllies => state.living(side),
        FinaleTarget::AllEnemies => state.living(side.opponent()),
    };
    let attack = effective_attack(state, unit);
    for target in targets {
        bus.visual(target, VisualKind::Finale, sacrifice_bonus);
        if finale.damage_atk_pct > 0 && finale.target == FinaleTarget::AllEnemies {
            let base = calculate_damage(state, unit, target, DamageRequest::simple(finale.damage_atk_pct)).total;
            deal_hit(state, unit, target, base + sacrifice_bonus, bus, rng);
        }
        if finale.heal_atk_pct > 0 {
            let amount = (attack as u64 * finale.heal_atk_pct as u64 / 100) as u32 + sacrifice_bonus;
            apply_heal(state, target, amount, bus);
        }
        for application in &finale.effects {
            apply_application(state, target, application, Some(unit), None, rng, bus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::effects::{Origin, StatusEffect};
    use crate::battle::tests::common::{create_test_battle, predictable_rng, TestUnitBuilder};
    use pretty_assertions::assert_eq;
    use schema::{EffectKind, Finale, Side};

    #[test]
    fn test_on_death_passive_fires_once_and_clears_effects() {
        let (mut state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes).with_stats(200, 100, 0, 10)],
            vec![
                TestUnitBuilder::new("bomber", Side::Enemies)
                    .with_stats(50, 100, 0, 10)
                    .with_passive(Passive::OnDeath {
                        damage_atk_pct: 50,
                        ally_effects: vec![EffectApplication::new(EffectKind::AttackUp, 2).value(20)],
                        enemy_effects: vec![],
                    }),
                TestUnitBuilder::new("grunt", Side::Enemies),
            ],
        );
        let mut rng = predictable_rng();
        state.units[1]
            .effects
            .push(crate::battle::effects::StatusEffect::flag(
                EffectKind::Regen,
                3,
                None,
                crate::battle::effects::Origin::Environment,
            ));

        deal_damage(&mut state, 1, 999, Some(0), &mut bus, &mut rng);

        assert!(state.units[1].effects.is_empty());
        assert!(state.units[1].flags.defeated);
        // 100 ATK at 50% against 0 DEF
        assert_eq!(state.units[0].hp, 150);
        assert!(state.units[2].has_effect(EffectKind::AttackUp));

        let fired = bus
            .events()
            .iter()
            .filter(|e| matches!(e, BattleEvent::PassiveTriggered { unit: 1, .. }))
            .count();
        assert_eq!(fired, 1);

        revive(&mut state, 1, 10, &mut bus);
        deal_damage(&mut state, 1, 999, Some(0), &mut bus, &mut rng);
        assert_eq!(state.units[0].hp, 150);
    }

    #[test]
    fn test_reactive_stacks_for_heavy_hit_and_ally_death() {
        let (mut state, mut bus) = create_test_battle(
            vec![
                TestUnitBuilder::new("squire", Side::Heroes).with_stats(100, 10, 0, 10),
                TestUnitBuilder::new("berserker", Side::Heroes)
                    .with_passive(Passive::ReactiveStacks {
                        trigger: ReactiveTrigger::AllyHeavyHit { min_pct: 30 },
                        kind: EffectKind::Fury,
                        stacks: 1,
                        duration: 3,
                    })
                    .with_passive(Passive::ReactiveStacks {
                        trigger: ReactiveTrigger::AllyDied,
                        kind: EffectKind::Fury,
                        stacks: 2,
                        duration: 3,
                    }),
            ],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();

        deal_damage(&mut state, 0, 10, Some(2), &mut bus, &mut rng);
        assert_eq!(state.units[1].stacks_of(EffectKind::Fury), 0);

        deal_damage(&mut state, 0, 40, Some(2), &mut bus, &mut rng);
        assert_eq!(state.units[1].stacks_of(EffectKind::Fury), 1);

        deal_damage(&mut state, 0, 100, Some(2), &mut bus, &mut rng);
        // heavy hit plus ally death
        assert_eq!(state.units[1].stacks_of(EffectKind::Fury), 4);
    }

    #[test]
    fn test_redirected_damage_counts_as_a_hit_on_the_guardian() {
        let (mut state, mut bus) = create_test_battle(
            vec![
                TestUnitBuilder::new("ward", Side::Heroes).with_stats(10_000, 10, 0, 10),
                TestUnitBuilder::new("bulwark", Side::Heroes).with_stats(100, 10, 0, 10),
                TestUnitBuilder::new("watcher", Side::Heroes).with_passive(Passive::ReactiveStacks {
                    trigger: ReactiveTrigger::AllyHeavyHit { min_pct: 30 },
                    kind: EffectKind::Fury,
                    stacks: 1,
                    duration: 3,
                }),
            ],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        state.units[0].effects.push(StatusEffect {
            value: 40,
            ..StatusEffect::flag(EffectKind::Guardian, 2, Some(1), Origin::Ally)
        });
        let mut rng = predictable_rng();

        let report = deal_hit(&mut state, 3, 0, 100, &mut bus, &mut rng);

        assert_eq!(report.guardian, Some((1, 40)));
        assert_eq!(state.units[1].hp, 60);
        assert_eq!(state.units[0].hp, 9_940);
        assert_eq!(state.units[2].stacks_of(EffectKind::Fury), 1);
    }

    #[test]
    fn test_below_half_fires_on_crossing_only() {
        let (mut state, mut bus) = create_test_battle(
            vec![
                TestUnitBuilder::new("squire", Side::Heroes).with_stats(100, 10, 0, 10),
                TestUnitBuilder::new("warden", Side::Heroes).with_passive(Passive::ReactiveStacks {
                    trigger: ReactiveTrigger::AllyBelowHalf,
                    kind: EffectKind::DefenseUp,
                    stacks: 1,
                    duration: 2,
                }),
            ],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();

        deal_damage(&mut state, 0, 60, Some(2), &mut bus, &mut rng);
        deal_damage(&mut state, 0, 10, Some(2), &mut bus, &mut rng);
        let triggers = bus
            .events()
            .iter()
            .filter(|e| matches!(e, BattleEvent::PassiveTriggered { unit: 1, .. }))
            .count();
        assert_eq!(triggers, 1);
        assert!(state.units[1].has_effect(EffectKind::DefenseUp));
    }

    #[test]
    fn test_sacrifice_finale_scales_and_resets_counter() {
        let finale = Finale {
            name: "Crescendo".to_string(),
            target: FinaleTarget::AllAllies,
            effects: vec![EffectApplication::new(EffectKind::AttackUp, 2).value(10)],
            damage_atk_pct: 0,
            heal_atk_pct: 50,
            sacrifice_scaling_pct: 50,
        };
        let (mut state, mut bus) = create_test_battle(
            vec![
                TestUnitBuilder::new("bard", Side::Heroes)
                    .with_stats(500, 100, 0, 10)
                    .with_finale(finale),
                TestUnitBuilder::new("knight", Side::Heroes).with_stats(500, 10, 0, 10),
            ],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        state.units[1].hp = 100;
        state.sacrificed_hp[Side::Heroes.index()] = 80;

        trigger_finale(&mut state, 0, &mut bus, &mut rng);

        // 50 from ATK plus half of the 80 sacrificed
        assert_eq!(state.units[1].hp, 190);
        assert!(state.units[1].has_effect(EffectKind::AttackUp));
        assert_eq!(state.sacrificed_hp[Side::Heroes.index()], 0);
        assert!(bus.events().iter().any(|e| matches!(
            e,
            BattleEvent::FinaleTriggered { sacrifice_bonus: 40, .. }
        )));
    }
}
