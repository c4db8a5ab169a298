//! Per-target stages of skill resolution.

use super::SkillContext;
use crate::battle::calculators::{apply_heal, calculate_damage, DamageRequest};
use crate::battle::death::{deal_hit, revive};
use crate::battle::effects::{apply_application, consume};
use crate::battle::fight_effects::{post_damage_lifesteal_pct, post_damage_statuses};
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnRng, VisualKind};
use crate::battle::stats::effective_attack;
use crate::battle::targeting::ResolvedTarget;
use crate::battle::turn_order::recompute_remaining;
use crate::combatant::UnitId;
use schema::{EffectKind, EffectTarget, OnKillHook, Passive, SkillTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStage {
    PreDamage,
    Compute,
    OnHit,
    PostDamage,
    OnKill,
}

pub const TARGET_STAGES: [TargetStage; 5] = [
    TargetStage::PreDamage,
    TargetStage::Compute,
    TargetStage::OnHit,
    TargetStage::PostDamage,
    TargetStage::OnKill,
];

/// What happened to one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetOutcome {
    pub evaded: bool,
    pub debuffed_before: bool,
    pub damage: u32,
    pub healed: u32,
    pub killed: bool,
}

fn is_hostile(state: &BattleState, caster: UnitId, target: UnitId) -> bool {
    state.side_of(caster) != state.side_of(target)
}

/// Runs every per-target stage for one target, in order.
pub fn resolve_target(
    state: &mut BattleState,
    ctx: &mut SkillContext,
    target: ResolvedTarget,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> TargetOutcome {
    let mut outcome = TargetOutcome::default();
    let was_alive = state.is_alive(target.unit);
    if !was_alive && ctx.mode != SkillTarget::DeadAlly {
        return outcome;
    }

    for stage in TARGET_STAGES {
        match stage {
            TargetStage::PreDamage => {
                outcome.debuffed_before = state
                    .unit(target.unit)
                    .is_some_and(|u| u.has_any_debuff());
                if ctx.skill.damage.is_some() && is_hostile(state, ctx.caster, target.unit) {
                    let evasion = state
                        .unit(target.unit)
                        .and_then(|u| u.effect(EffectKind::Evasion))
                        .map(|e| if e.value > 0 { e.value } else { 50 });
                    if let Some(chance) = evasion {
                        if rng.roll_chance(chance, "Evasion Check") {
                            bus.push(BattleEvent::TargetEvaded {
                                attacker: ctx.caster,
                                target: target.unit,
                            });
                            bus.visual(target.unit, VisualKind::Evade, 0);
                            outcome.evaded = true;
                            return outcome;
                        }
                    }
                }
            }
            TargetStage::Compute => compute(state, ctx, target, &mut outcome, rng, bus),
            TargetStage::OnHit => {
                for (application, tiered) in ctx.effects.clone() {
                    if application.target != EffectTarget::Target {
                        continue;
                    }
                    if application.requires_debuffed_target && !outcome.debuffed_before {
                        continue;
                    }
                    let value = if tiered { ctx.tier_value(state) } else { None };
                    apply_application(state, target.unit, &application, Some(ctx.caster), value, rng, bus);
                }
            }
            TargetStage::PostDamage => {
                if outcome.damage > 0 {
                    post_damage(state, ctx, target.unit, outcome.damage, rng, bus);
                }
            }
            TargetStage::OnKill => {
                outcome.killed = was_alive && !state.is_alive(target.unit);
                if outcome.killed {
                    on_kill(state, ctx, rng, bus);
                }
            }
        }
    }
    outcome
}

fn compute(
    state: &mut BattleState,
    ctx: &mut SkillContext,
    target: ResolvedTarget,
    outcome: &mut TargetOutcome,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) {
    if let Some(damage) = ctx.skill.damage.clone() {
        if is_hostile(state, ctx.caster, target.unit) {
            let breakdown = calculate_damage(
                state,
                ctx.caster,
                target.unit,
                DamageRequest {
                    multiplier_pct: damage.multiplier_pct,
                    hits: damage.hits,
                    ignore_def_pct: damage.ignore_def_pct,
                    bonuses: &ctx.skill.conditional_bonuses,
                    extra_multiplier_pct: ctx.cast.extra_multiplier_pct,
                    scale_pct: target.scale_pct,
                },
            );
            for hit in breakdown.hits {
                if !state.is_alive(target.unit) {
                    break;
                }
                outcome.damage += deal_hit(state, ctx.caster, target.unit, hit, bus, rng).inflicted();
            }
        }
    }

    let dice_heal = ctx
        .cast
        .dice
        .as_ref()
        .and_then(|dice| dice.tier.as_ref())
        .map(|tier| tier.heal_atk_pct);
    let heal = ctx.skill.heal.clone();
    if heal.is_none() && dice_heal.is_none() {
        return;
    }
    let atk_pct = dice_heal.unwrap_or_else(|| heal.as_ref().map(|h| h.atk_pct).unwrap_or(0));
    let max_hp_pct = heal.as_ref().map(|h| h.max_hp_pct).unwrap_or(0);
    let attack = effective_attack(state, ctx.caster) as u64;
    let target_max = state.unit(target.unit).map(|u| u.max_hp).unwrap_or(0) as u64;
    let base = attack * atk_pct as u64 / 100 + target_max * max_hp_pct as u64 / 100;
    let amount = (base * (100 + ctx.cast.extra_multiplier_pct as u64) / 100 * target.scale_pct as u64 / 100) as u32;

    if ctx.mode == SkillTarget::DeadAlly {
        if revive(state, target.unit, amount, bus) {
            outcome.healed = state.unit(target.unit).map(|u| u.hp).unwrap_or(0);
        }
    } else {
        outcome.healed = apply_heal(state, target.unit, amount, bus);
    }
}

fn post_damage(
    state: &mut BattleState,
    ctx: &mut SkillContext,
    target: UnitId,
    damage: u32,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) {
    let Some(caster) = state.unit(ctx.caster) else {
        return;
    };
    let side = caster.side;
    let passive_lifesteal: u32 = caster
        .passives
        .iter()
        .map(|p| match p {
            Passive::Lifesteal { pct } => *pct,
            _ => 0,
        })
        .sum();
    let lifesteal_pct = ctx.skill.lifesteal_pct
        + caster.leader_bonus.lifesteal_pct
        + passive_lifesteal
        + post_damage_lifesteal_pct(state, side);
    if lifesteal_pct > 0 {
        let amount = (damage as u64 * lifesteal_pct as u64 / 100) as u32;
        apply_heal(state, ctx.caster, amount, bus);
    }

    for (chance, application) in post_damage_statuses(state, side) {
        if rng.roll_chance(chance as u32, "Fight Effect Status") {
            apply_application(state, target, &application, Some(ctx.caster), None, rng, bus);
        }
    }

    if consume(state, ctx.caster, EffectKind::Empowered).is_some() {
        bus.push(BattleEvent::EffectRemoved {
            target: ctx.caster,
            kind: EffectKind::Empowered,
        });
    }
}

fn on_kill(state: &mut BattleState, ctx: &mut SkillContext, rng: &mut TurnRng, bus: &mut EventBus) {
    for hook in ctx.skill.on_kill.clone() {
        match hook {
            OnKillHook::GainResource(amount) => {
                if let Some(caster) = state.unit_mut(ctx.caster) {
                    if caster.resource.gain(amount) > 0 {
                        let value = caster.resource.current;
                        bus.push(BattleEvent::ResourceChanged {
                            unit: ctx.caster,
                            value,
                        });
                    }
                }
            }
            OnKillHook::RecomputeTurnOrder => {
                recompute_remaining(state);
                bus.push(BattleEvent::TurnOrderRecomputed);
            }
            OnKillHook::ChainedAoe { multiplier_pct } => {
                for enemy in state.enemies_of(ctx.caster) {
                    let amount =
                        calculate_damage(state, ctx.caster, enemy, DamageRequest::simple(multiplier_pct)).total;
                    ctx.report.damage_dealt += deal_hit(state, ctx.caster, enemy, amount, bus, rng).inflicted();
                }
            }
            OnKillHook::ApplyToAllEnemies(application) => {
                for enemy in state.enemies_of(ctx.caster) {
                    apply_application(state, enemy, &application, Some(ctx.caster), None, rng, bus);
                }
            }
        }
    }
}
