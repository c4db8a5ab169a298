use crate::battle::state::{BattleState, TurnRng};
use crate::combatant::UnitId;
use crate::errors::ActionError;
use schema::{EffectKind, SkillDescriptor, SkillTarget};

/// One unit a skill will resolve against. `scale_pct` is 100 for a full hit
/// and lower for splash spill-over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub unit: UnitId,
    pub scale_pct: u32,
    pub primary: bool,
}

impl ResolvedTarget {
    fn full(unit: UnitId, primary: bool) -> Self {
        Self {
            unit,
            scale_pct: 100,
            primary,
        }
    }
}

/// The targeting mode actually used by `caster` for `skill`. An Echoing caster
/// turns a single-target, single-hit attack into a splash.
pub fn effective_target(state: &BattleState, caster: UnitId, skill: &SkillDescriptor) -> SkillTarget {
    let echoing = state
        .unit(caster)
        .is_some_and(|u| u.has_effect(EffectKind::Echoing));
    match skill.target {
        SkillTarget::SingleEnemy if echoing && skill.damage.is_some() && skill.hits() == 1 => {
            SkillTarget::Splash {
                extra_targets: state.config.echo_splash_targets,
                splash_pct: state.config.echo_splash_pct,
            }
        }
        other => other,
    }
}

/// Living enemies that force target selection onto themselves.
pub fn taunting_enemies(state: &BattleState, caster: UnitId) -> Vec<UnitId> {
    state
        .enemies_of(caster)
        .into_iter()
        .filter(|&id| state.unit(id).is_some_and(|u| u.has_taunt()))
        .collect()
}

/// Rejects a player-chosen target before anything resolves.
pub fn validate_target(
    state: &BattleState,
    caster: UnitId,
    mode: SkillTarget,
    target: UnitId,
) -> Result<(), ActionError> {
    let (Some(caster_unit), Some(target_unit)) = (state.unit(caster), state.unit(target)) else {
        return Err(ActionError::InvalidTarget(format!("no unit #{}", target)));
    };
    let same_side = caster_unit.side == target_unit.side;

    if mode.targets_enemies() {
        if same_side || !target_unit.is_alive() {
            return Err(ActionError::InvalidTarget(format!(
                "{} is not a living enemy",
                target_unit.name
            )));
        }
        let taunting = taunting_enemies(state, caster);
        if !taunting.is_empty() && !taunting.contains(&target) {
            return Err(ActionError::InvalidTarget(format!(
                "{} must be targeted while taunting",
                state.name_of(taunting[0])
            )));
        }
        return Ok(());
    }

    match mode {
        SkillTarget::SingleAlly if same_side && target_unit.is_alive() => Ok(()),
        SkillTarget::DeadAlly if same_side && !target_unit.is_alive() => Ok(()),
        SkillTarget::SingleAlly => Err(ActionError::InvalidTarget(format!(
            "{} is not a living ally",
            target_unit.name
        ))),
        SkillTarget::DeadAlly => Err(ActionError::InvalidTarget(format!(
            "{} has not fallen",
            target_unit.name
        ))),
        _ => Ok(()),
    }
}

/// Target the engine picks when nobody chose one: a taunting enemy, else the
/// enemy with the lowest HP. Ally skills pick the most wounded ally.
pub fn default_target(state: &BattleState, caster: UnitId, mode: SkillTarget) -> Option<UnitId> {
    if mode.targets_enemies() {
        let taunting = taunting_enemies(state, caster);
        let pool = if taunting.is_empty() {
            state.enemies_of(caster)
        } else {
            taunting
        };
        return pool
            .into_iter()
            .min_by_key(|&id| (state.unit(id).map(|u| u.hp).unwrap_or(u32::MAX), id));
    }
    let side = state.side_of(caster)?;
    match mode {
        SkillTarget::SingleAlly => state
            .living(side)
            .into_iter()
            .min_by_key(|&id| (state.unit(id).map(|u| u.hp_pct()).unwrap_or(u32::MAX), id)),
        SkillTarget::DeadAlly => state
            .fallen(side)
            .into_iter()
            .find(|&id| state.unit(id).is_some_and(|u| !u.summoned)),
        _ => Some(caster),
    }
}

/// Others hit alongside the primary, in id order.
fn neighbours(state: &BattleState, caster: UnitId, primary: UnitId, count: u8) -> Vec<UnitId> {
    state
        .enemies_of(caster)
        .into_iter()
        .filter(|&id| id != primary)
        .take(count as usize)
        .collect()
}

/// Expands a targeting mode into the concrete unit list.
pub fn resolve_targets(
    state: &BattleState,
    caster: UnitId,
    mode: SkillTarget,
    primary: Option<UnitId>,
    rng: &mut TurnRng,
) -> Vec<ResolvedTarget> {
    let Some(side) = state.side_of(caster) else {
        return Vec::new();
    };
    let chosen = primary.or_else(|| default_target(state, caster, mode));

    match mode {
        SkillTarget::SelfOnly => vec![ResolvedTarget::full(caster, true)],
        SkillTarget::SingleEnemy | SkillTarget::SingleAlly | SkillTarget::DeadAlly => chosen
            .map(|unit| vec![ResolvedTarget::full(unit, true)])
            .unwrap_or_default(),
        SkillTarget::AllEnemies => state
            .living(side.opponent())
            .into_iter()
            .map(|unit| ResolvedTarget::full(unit, false))
            .collect(),
        SkillTarget::AllAllies => state
            .living(side)
            .into_iter()
            .map(|unit| ResolvedTarget::full(unit, false))
            .collect(),
        SkillTarget::RandomEnemies { count } => {
            let mut pool = state.living(side.opponent());
            let mut picked = Vec::new();
            for _ in 0..count {
                if pool.is_empty() {
                    break;
                }
                let index = rng.pick_index(pool.len(), "Random Target");
                picked.push(ResolvedTarget::full(pool.remove(index), false));
            }
            picked
        }
        SkillTarget::Chain { extra_targets } => match chosen {
            Some(first) => std::iter::once(ResolvedTarget::full(first, true))
                .chain(
                    neighbours(state, caster, first, extra_targets)
                        .into_iter()
                        .map(|unit| ResolvedTarget::full(unit, false)),
                )
                .collect(),
            None => Vec::new(),
        },
        SkillTarget::Splash {
            extra_targets,
            splash_pct,
        } => match chosen {
            Some(first) => std::iter::once(ResolvedTarget::full(first, true))
                .chain(
                    neighbours(state, caster, first, extra_targets)
                        .into_iter()
                        .map(|unit| ResolvedTarget {
                            unit,
                            scale_pct: splash_pct,
                            primary: false,
                        }),
                )
                .collect(),
            None => Vec::new(),
        },
    }
}
