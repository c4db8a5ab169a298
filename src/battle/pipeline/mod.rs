//! Skill resolution as an explicit, ordered list of stages.
//!
//! ```text
//! Activation -> Targeting -> CastResolution -> SelfCost
//!   -> PerTarget (PreDamage -> Compute -> OnHit -> PostDamage -> OnKill)
//!   -> AreaEffects -> Summon -> Bookkeeping
//! ```
//!
//! Cast resolution happens once per activation; its results are baked into
//! the context, so later pool changes never alter what a cast applies.

pub mod cast;
pub mod per_target;

use crate::battle::death::{process_deaths, trigger_finale};
use crate::battle::effects::apply_application;
use crate::battle::resources::{can_use_skill, spend, SpendOutcome};
use crate::battle::roster::{summon, SummonOutcome};
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnRng};
use crate::battle::targeting::{effective_target, resolve_targets, validate_target, ResolvedTarget};
use crate::combatant::UnitId;
use crate::errors::{ActionError, BattleResult, BattleStateError};
use cast::{resolve_cast, CastResolution};
use per_target::resolve_target;
use schema::{EffectApplication, EffectTarget, SkillDescriptor, SkillTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Activation,
    Targeting,
    CastResolution,
    SelfCost,
    PerTarget,
    AreaEffects,
    Summon,
    Bookkeeping,
}

pub const SKILL_STAGES: [Stage; 8] = [
    Stage::Activation,
    Stage::Targeting,
    Stage::CastResolution,
    Stage::SelfCost,
    Stage::PerTarget,
    Stage::AreaEffects,
    Stage::Summon,
    Stage::Bookkeeping,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillReport {
    pub skill: String,
    pub stages: Vec<Stage>,
    pub targets: Vec<UnitId>,
    pub evaded: Vec<UnitId>,
    pub damage_dealt: u32,
    pub healed: u32,
    pub killed: Vec<UnitId>,
    pub summoned: Vec<UnitId>,
    /// The fallback skill that ran because a summon had no room.
    pub fallback: Option<String>,
    pub finale: bool,
}

/// Working state for one activation.
#[derive(Debug, Clone)]
pub struct SkillContext {
    pub caster: UnitId,
    pub skill: SkillDescriptor,
    pub primary: Option<UnitId>,
    pub mode: SkillTarget,
    /// Runs as a summon fallback: no gate, no spend, no bookkeeping.
    pub fallback: bool,
    pub spend: SpendOutcome,
    pub cast: CastResolution,
    pub targets: Vec<ResolvedTarget>,
    /// Every application this cast carries; `true` marks ones the resource tier may override.
    pub effects: Vec<(EffectApplication, bool)>,
    pub report: SkillReport,
}

impl SkillContext {
    fn new(caster: UnitId, skill: SkillDescriptor, primary: Option<UnitId>, fallback: bool) -> Self {
        Self {
            caster,
            mode: skill.target,
            report: SkillReport {
                skill: skill.name.clone(),
                ..SkillReport::default()
            },
            skill,
            primary,
            fallback,
            spend: SpendOutcome::default(),
            cast: CastResolution::default(),
            targets: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Tier override for effect magnitudes. Reads the cast-time snapshot
    /// unless the skill opts into the live pool value.
    pub fn tier_value(&self, state: &BattleState) -> Option<u32> {
        if self.skill.reads_live_resource {
            let live = state.unit(self.caster).map(|u| u.resource.current).unwrap_or(0);
            return self.skill.resource_tier(live).and_then(|tier| tier.effect_value_pct);
        }
        self.cast.tier_value()
    }
}

/// Checks that `caster` may use `skill_name` on `primary` right now.
pub fn check_skill(
    state: &BattleState,
    caster: UnitId,
    skill_name: &str,
    primary: Option<UnitId>,
) -> BattleResult<SkillDescriptor> {
    let unit = state
        .unit(caster)
        .ok_or(BattleStateError::UnknownUnit(caster))?;
    if !unit.is_alive() {
        return Err(ActionError::SkillUnavailable(format!("{} has fallen", unit.name)).into());
    }
    let skill = unit
        .find_skill(skill_name)
        .ok_or_else(|| ActionError::UnknownSkill(skill_name.to_string()))?;
    if !can_use_skill(unit, &skill) {
        return Err(ActionError::SkillUnavailable(skill.name.clone()).into());
    }
    if let Some(target) = primary {
        validate_target(state, caster, effective_target(state, caster, &skill), target)?;
    }
    Ok(skill)
}

/// Resolves one skill activation from `caster`. Selection errors surface
/// before any state changes.
pub fn resolve_skill(
    state: &mut BattleState,
    caster: UnitId,
    skill_name: &str,
    primary: Option<UnitId>,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> BattleResult<SkillReport> {
    let skill = check_skill(state, caster, skill_name, primary)?;
    let mut ctx = SkillContext::new(caster, skill, primary, false);
    run_stages(state, &mut ctx, rng, bus);
    Ok(ctx.report)
}

fn run_stages(state: &mut BattleState, ctx: &mut SkillContext, rng: &mut TurnRng, bus: &mut EventBus) {
    tracing::debug!(caster = ctx.caster, skill = %ctx.skill.name, fallback = ctx.fallback, "resolving skill");
    for stage in SKILL_STAGES {
        ctx.report.stages.push(stage);
        match stage {
            Stage::Activation => activation(state, ctx, bus),
            Stage::Targeting => {
                ctx.mode = effective_target(state, ctx.caster, &ctx.skill);
                ctx.targets = resolve_targets(state, ctx.caster, ctx.mode, ctx.primary, rng);
                ctx.report.targets = ctx.targets.iter().map(|t| t.unit).collect();
            }
            Stage::CastResolution => {
                let loaded_holder = ctx.targets.iter().find(|t| t.primary).map(|t| t.unit);
                ctx.cast = resolve_cast(state, ctx.caster, &ctx.skill, &ctx.spend, loaded_holder, rng, bus);
                ctx.effects = ctx.skill.effects.iter().cloned().map(|a| (a, true)).collect();
                if let Some(tier) = ctx.cast.dice.as_ref().and_then(|d| d.tier.as_ref()) {
                    ctx.effects.extend(tier.effects.iter().cloned().map(|a| (a, false)));
                }
                if let Some(coin) = &ctx.cast.coin {
                    ctx.effects.extend(coin.branch.effects.iter().cloned().map(|a| (a, false)));
                }
            }
            Stage::SelfCost => self_cost(state, ctx, bus),
            Stage::PerTarget => {
                for target in ctx.targets.clone() {
                    let outcome = resolve_target(state, ctx, target, rng, bus);
                    if outcome.evaded {
                        ctx.report.evaded.push(target.unit);
                    }
                    ctx.report.damage_dealt += outcome.damage;
                    ctx.report.healed += outcome.healed;
                    if outcome.killed {
                        ctx.report.killed.push(target.unit);
                    }
                }
            }
            Stage::AreaEffects => area_effects(state, ctx, rng, bus),
            Stage::Summon => summon_stage(state, ctx, rng, bus),
            Stage::Bookkeeping => bookkeeping(state, ctx, rng, bus),
        }
    }
}

fn activation(state: &mut BattleState, ctx: &mut SkillContext, bus: &mut EventBus) {
    if !ctx.fallback {
        if let Some(unit) = state.unit_mut(ctx.caster) {
            let before = unit.resource.current;
            ctx.spend = spend(unit, &ctx.skill);
            let after = unit.resource.current;
            if before != after {
                bus.push(BattleEvent::ResourceChanged {
                    unit: ctx.caster,
                    value: after,
                });
            }
        }
    }
    bus.push(BattleEvent::SkillUsed {
        unit: ctx.caster,
        skill: ctx.skill.name.clone(),
    });
}

/// Pays `pct` of max HP. Self damage never takes the last point of HP.
pub fn pay_hp(state: &mut BattleState, unit: UnitId, pct: u32, bus: &mut EventBus) -> u32 {
    let Some(holder) = state.unit_mut(unit) else {
        return 0;
    };
    let wanted = (holder.max_hp as u64 * pct as u64 / 100) as u32;
    let paid = holder.lose_hp(wanted.min(holder.hp.saturating_sub(1)));
    if paid == 0 {
        return 0;
    }
    let side = holder.side;
    let gained = holder.resource.on_self_damage();
    let value = holder.resource.current;
    state.sacrificed_hp[side.index()] += paid;
    bus.push(BattleEvent::SelfDamage { unit, amount: paid });
    if gained > 0 {
        bus.push(BattleEvent::ResourceChanged { unit, value });
    }
    paid
}

fn self_cost(state: &mut BattleState, ctx: &mut SkillContext, bus: &mut EventBus) {
    let coin = ctx.cast.coin.as_ref().map(|c| c.branch.clone()).unwrap_or_default();
    let pct = ctx.skill.self_damage_pct + coin.self_damage_pct;
    if pct > 0 {
        pay_hp(state, ctx.caster, pct, bus);
    }
    if coin.resource_gain > 0 {
        if let Some(unit) = state.unit_mut(ctx.caster) {
            if unit.resource.gain(coin.resource_gain) > 0 {
                let value = unit.resource.current;
                bus.push(BattleEvent::ResourceChanged {
                    unit: ctx.caster,
                    value,
                });
            }
        }
    }
}

fn area_effects(state: &mut BattleState, ctx: &mut SkillContext, rng: &mut TurnRng, bus: &mut EventBus) {
    let Some(side) = state.side_of(ctx.caster) else {
        return;
    };
    for (application, tiered) in ctx.effects.clone() {
        let recipients = match application.target {
            EffectTarget::Target => continue,
            EffectTarget::Caster => vec![ctx.caster],
            EffectTarget::AllAllies => state.living(side),
            EffectTarget::AllEnemies => state.living(side.opponent()),
        };
        let value = if tiered { ctx.tier_value(state) } else { None };
        for unit in recipients {
            apply_application(state, unit, &application, Some(ctx.caster), value, rng, bus);
        }
    }
}

fn summon_stage(state: &mut BattleState, ctx: &mut SkillContext, rng: &mut TurnRng, bus: &mut EventBus) {
    let Some(spec) = ctx.skill.summon.clone() else {
        return;
    };
    match summon(state, ctx.caster, &spec, bus) {
        SummonOutcome::Summoned(units) => ctx.report.summoned.extend(units),
        SummonOutcome::NoRoom { fallback: None } => {}
        SummonOutcome::NoRoom {
            fallback: Some(name),
        } => {
            if ctx.fallback {
                return;
            }
            let Some(skill) = state.unit(ctx.caster).and_then(|u| u.find_skill(&name)) else {
                tracing::warn!(skill = %name, "summon fallback skill not found");
                return;
            };
            let mut nested = SkillContext::new(ctx.caster, skill, None, true);
            run_stages(state, &mut nested, rng, bus);
            ctx.report.damage_dealt += nested.report.damage_dealt;
            ctx.report.healed += nested.report.healed;
            ctx.report.killed.extend(nested.report.killed);
            ctx.report.fallback = Some(name);
        }
    }
}

fn bookkeeping(state: &mut BattleState, ctx: &mut SkillContext, rng: &mut TurnRng, bus: &mut EventBus) {
    if ctx.fallback {
        return;
    }
    if let Some(unit) = state.unit_mut(ctx.caster) {
        if ctx.skill.cooldown > 0 {
            unit.set_cooldown(&ctx.skill.name, ctx.skill.cooldown);
        }
        let mut gained = 0;
        if ctx.report.damage_dealt > 0 {
            gained += unit.resource.on_attack();
        }
        if ctx.report.healed > 0 {
            gained += unit.resource.on_heal_cast();
        }
        if gained > 0 {
            let value = unit.resource.current;
            bus.push(BattleEvent::ResourceChanged {
                unit: ctx.caster,
                value,
            });
        }
    }
    if ctx.spend.finale_ready && state.is_alive(ctx.caster) {
        trigger_finale(state, ctx.caster, bus, rng);
        ctx.report.finale = true;
    }
    process_deaths(state, bus, rng);
}
