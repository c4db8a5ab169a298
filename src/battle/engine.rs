//! Round processing: the steps the runner strings together between player
//! inputs. Every function here mutates the state in place and reports what
//! happened through the event bus.

use crate::battle::calculators::apply_heal;
use crate::battle::death::{deal_damage, process_deaths};
use crate::battle::effects::{apply_effect, decrement_durations, periodic_ticks, EffectParams, EffectPayload};
use crate::battle::fight_effects::{turn_start_actions, TurnStartAction};
use crate::battle::leader;
use crate::battle::state::{BattleEvent, BattleState, EventBus, GameState, Outcome, SkipReason, TurnRng};
use crate::battle::turn_order::TurnOrder;
use crate::combatant::UnitId;
use schema::EffectKind;

/// Turns a fight-level shield lasts; long enough to survive the enemy side's turns.
const FIGHT_SHIELD_DURATION: u8 = 2;

pub fn start_battle(state: &mut BattleState, leaders: &[UnitId], bus: &mut EventBus, rng: &mut TurnRng) {
    tracing::info!(battle_id = %state.battle_id, units = state.units.len(), "battle started");
    bus.push(BattleEvent::BattleStarted {
        battle_id: state.battle_id.clone(),
    });
    leader::install_leaders(state, leaders, bus, rng);
    process_deaths(state, bus, rng);
    state.game_state = GameState::RoundStart;
    check_outcome(state, bus);
}

/// Opens a new round: leader round hooks, then a fresh turn order.
pub fn begin_round(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    state.round += 1;
    tracing::info!(round = state.round, "round started");
    bus.push(BattleEvent::RoundStarted { round: state.round });
    leader::on_round_start(state, bus, rng);
    state.turn_order = TurnOrder::build(state);
    state.game_state = GameState::Resolving;
}

/// Runs start-of-turn processing for `unit`. Returns false when the unit
/// loses its turn (stunned, or killed by a turn-start effect); the caller
/// still runs `end_turn` for a stunned unit so its effects tick down.
pub fn start_turn(state: &mut BattleState, unit: UnitId, bus: &mut EventBus, rng: &mut TurnRng) -> bool {
    if !state.is_alive(unit) {
        bus.push(BattleEvent::TurnSkipped {
            unit,
            reason: SkipReason::Dead,
        });
        return false;
    }
    bus.push(BattleEvent::TurnStarted { unit });

    if let Some(side) = state.side_of(unit) {
        for action in turn_start_actions(state, side) {
            apply_turn_start_action(state, unit, action, bus, rng);
        }
    }
    if !state.is_alive(unit) {
        bus.push(BattleEvent::TurnSkipped {
            unit,
            reason: SkipReason::Dead,
        });
        return false;
    }

    if let Some(holder) = state.unit_mut(unit) {
        if holder.resource.on_turn_start() > 0 {
            let value = holder.resource.current;
            bus.push(BattleEvent::ResourceChanged { unit, value });
        }
        if holder.has_effect(EffectKind::Stun) {
            tracing::debug!(unit, "stunned; turn skipped");
            bus.push(BattleEvent::TurnSkipped {
                unit,
                reason: SkipReason::Stunned,
            });
            return false;
        }
    }
    true
}

fn apply_turn_start_action(
    state: &mut BattleState,
    unit: UnitId,
    action: TurnStartAction,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    let max_hp = state.unit(unit).map(|u| u.max_hp).unwrap_or(0);
    let of_max = |pct: u32| ((max_hp as u64 * pct as u64) / 100) as u32;
    match action {
        TurnStartAction::Damage { pct } => {
            deal_damage(state, unit, of_max(pct).max(1), None, bus, rng);
        }
        TurnStartAction::Heal { pct } => {
            apply_heal(state, unit, of_max(pct), bus);
        }
        TurnStartAction::Shield { amount } => {
            apply_effect(
                state,
                unit,
                EffectParams {
                    kind: EffectKind::Shield,
                    duration: FIGHT_SHIELD_DURATION,
                    value: amount,
                    stacks: 1,
                    source: None,
                    payload: EffectPayload::Shield { remaining: amount },
                },
                bus,
            );
        }
    }
}

/// End-of-turn processing for `unit`: periodic ticks, duration decrement,
/// stored-damage release and cooldown ticks. `used_skill` keeps the cooldown
/// just set by this turn's activation from ticking immediately.
pub fn end_turn(
    state: &mut BattleState,
    unit: UnitId,
    used_skill: Option<&str>,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    for tick in periodic_ticks(state, unit) {
        if !state.is_alive(unit) {
            break;
        }
        if tick.heal {
            let healed = apply_heal(state, unit, tick.amount, bus);
            bus.push(BattleEvent::EffectTicked {
                target: unit,
                kind: tick.kind,
                amount: healed,
            });
        } else {
            bus.push(BattleEvent::EffectTicked {
                target: unit,
                kind: tick.kind,
                amount: tick.amount,
            });
            deal_damage(state, unit, tick.amount, tick.source, bus, rng);
        }
    }
    if !state.is_alive(unit) {
        return;
    }

    for expired in decrement_durations(state, unit, bus) {
        if let EffectPayload::StoredDamage { banked } = expired.payload {
            release_stored_damage(state, unit, banked, bus, rng);
        }
    }

    if let Some(holder) = state.unit_mut(unit) {
        holder.tick_cooldowns(used_skill);
    }
}

/// Banked damage from an expired StoredDamage hits every living enemy.
fn release_stored_damage(state: &mut BattleState, unit: UnitId, banked: u32, bus: &mut EventBus, rng: &mut TurnRng) {
    if banked == 0 {
        return;
    }
    bus.push(BattleEvent::StoredDamageReleased { unit, amount: banked });
    for enemy in state.enemies_of(unit) {
        deal_damage(state, enemy, banked, Some(unit), bus, rng);
    }
}

/// Closes the round: units nobody hit this round gain Focus, and the harm
/// flags rotate.
pub fn end_round(state: &mut BattleState, bus: &mut EventBus) {
    for unit in state.units.iter_mut().filter(|u| u.is_alive()) {
        if !unit.flags.harmed_this_round && unit.resource.grant_focus() {
            bus.push(BattleEvent::FocusGained { unit: unit.id });
        }
        unit.flags.harmed_last_round = unit.flags.harmed_this_round;
        unit.flags.harmed_this_round = false;
    }
    bus.push(BattleEvent::RoundEnded { round: state.round });
}

/// Moves the battle to its terminal state once a side is wiped out. Returns
/// the outcome, announcing it only the first time.
pub fn check_outcome(state: &mut BattleState, bus: &mut EventBus) -> Option<Outcome> {
    let outcome = state.outcome()?;
    if !state.game_state.is_terminal() {
        tracing::info!(?outcome, round = state.round, "battle ended");
        end_battle(state, outcome, bus);
    }
    Some(outcome)
}

pub fn end_battle(state: &mut BattleState, outcome: Outcome, bus: &mut EventBus) {
    state.game_state = match outcome {
        Outcome::Victory => GameState::Victory,
        Outcome::Defeat => GameState::Defeat,
    };
    bus.push(BattleEvent::BattleEnded { outcome });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, predictable_rng, TestUnitBuilder};
    use crate::battle::effects::{Origin, StatusEffect};
    use pretty_assertions::assert_eq;
    use schema::{FightEffect, FightEffectKind, Hook, ResourceArchetype, ResourceRules, Scope, Side};

    fn periodic(kind: EffectKind, per_tick: u32, heal: bool, duration: u8) -> StatusEffect {
        StatusEffect {
            payload: EffectPayload::Periodic { per_tick, heal },
            ..StatusEffect::flag(kind, duration, None, Origin::Enemy)
        }
    }

    #[test]
    fn test_stunned_unit_loses_turn() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        battle_state.units[0]
            .effects
            .push(StatusEffect::flag(EffectKind::Stun, 1, Some(1), Origin::Enemy));

        assert!(!start_turn(&mut battle_state, 0, &mut bus, &mut rng));
        assert!(bus.events().contains(&BattleEvent::TurnSkipped {
            unit: 0,
            reason: SkipReason::Stunned
        }));

        end_turn(&mut battle_state, 0, None, &mut bus, &mut rng);
        assert!(!battle_state.units[0].has_effect(EffectKind::Stun));
        assert!(start_turn(&mut battle_state, 0, &mut bus, &mut rng));
    }

    #[test]
    fn test_periodic_ticks_and_expiry() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        battle_state.units[0].effects.push(periodic(EffectKind::Poison, 8, false, 2));
        battle_state.units[0].effects.push(periodic(EffectKind::Regen, 3, true, 1));

        end_turn(&mut battle_state, 0, None, &mut bus, &mut rng);
        // 100 - 8 + 3
        assert_eq!(battle_state.units[0].hp, 95);
        assert!(battle_state.units[0].has_effect(EffectKind::Poison));
        assert!(!battle_state.units[0].has_effect(EffectKind::Regen));

        end_turn(&mut battle_state, 0, None, &mut bus, &mut rng);
        assert_eq!(battle_state.units[0].hp, 87);
        assert!(battle_state.units[0].effects.is_empty());
    }

    #[test]
    fn test_stored_damage_released_on_expiry() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![
                TestUnitBuilder::new("foe a", Side::Enemies),
                TestUnitBuilder::new("foe b", Side::Enemies),
            ],
        );
        let mut rng = predictable_rng();
        battle_state.units[0].effects.push(StatusEffect {
            payload: EffectPayload::StoredDamage { banked: 30 },
            ..StatusEffect::flag(EffectKind::StoredDamage, 1, Some(0), Origin::SelfApplied)
        });

        end_turn(&mut battle_state, 0, None, &mut bus, &mut rng);
        assert_eq!(battle_state.units[1].hp, 70);
        assert_eq!(battle_state.units[2].hp, 70);
        assert!(bus.events().contains(&BattleEvent::StoredDamageReleased { unit: 0, amount: 30 }));
    }

    #[test]
    fn test_cooldown_used_this_turn_does_not_tick() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        battle_state.units[0].set_cooldown("Blast", 2);
        battle_state.units[0].set_cooldown("Older", 2);

        end_turn(&mut battle_state, 0, Some("Blast"), &mut bus, &mut rng);
        assert_eq!(battle_state.units[0].cooldown("Blast"), 2);
        assert_eq!(battle_state.units[0].cooldown("Older"), 1);
    }

    #[test]
    fn test_focus_granted_to_unharmed_units_at_round_end() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![
                TestUnitBuilder::new("calm", Side::Heroes).with_resource(ResourceRules::of(ResourceArchetype::Focus)),
                TestUnitBuilder::new("struck", Side::Heroes).with_resource(ResourceRules::of(ResourceArchetype::Focus)),
            ],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        battle_state.units[1].flags.harmed_this_round = true;

        end_round(&mut battle_state, &mut bus);
        assert!(battle_state.units[0].resource.focused);
        assert!(!battle_state.units[1].resource.focused);
        assert!(battle_state.units[1].flags.harmed_last_round);
        assert!(!battle_state.units[1].flags.harmed_this_round);
    }

    #[test]
    fn test_turn_start_fight_effects() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        battle_state.fight_effects = vec![
            FightEffect {
                name: "Scorched Earth".to_string(),
                hook: Hook::OnTurnStart,
                scope: Scope::Enemies,
                kind: FightEffectKind::PercentMaxHpDamage { pct: 10 },
            },
            FightEffect {
                name: "Bulwark".to_string(),
                hook: Hook::OnTurnStart,
                scope: Scope::Heroes,
                kind: FightEffectKind::Shield { amount: 15 },
            },
        ];

        assert!(start_turn(&mut battle_state, 1, &mut bus, &mut rng));
        assert_eq!(battle_state.units[1].hp, 90);

        assert!(start_turn(&mut battle_state, 0, &mut bus, &mut rng));
        assert_eq!(battle_state.units[0].hp, 100);
        assert!(battle_state.units[0].has_effect(EffectKind::Shield));
    }

    #[test]
    fn test_outcome_announced_once() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("hero", Side::Heroes)],
            vec![TestUnitBuilder::new("foe", Side::Enemies)],
        );
        assert_eq!(check_outcome(&mut battle_state, &mut bus), None);

        battle_state.units[1].hp = 0;
        assert_eq!(check_outcome(&mut battle_state, &mut bus), Some(Outcome::Victory));
        assert_eq!(check_outcome(&mut battle_state, &mut bus), Some(Outcome::Victory));
        assert_eq!(battle_state.game_state, GameState::Victory);
        let ended = bus
            .events()
            .iter()
            .filter(|e| matches!(e, BattleEvent::BattleEnded { .. }))
            .count();
        assert_eq!(ended, 1);
    }
}
