//! Action selection for AI-controlled units.

use crate::battle::calculators::{calculate_damage, DamageRequest};
use crate::battle::resources::can_use_skill;
use crate::battle::state::BattleState;
use crate::battle::targeting::{default_target, effective_target};
use crate::combatant::{Combatant, UnitId};
use ordered_float::OrderedFloat;
use schema::{
    EffectKind, EffectTarget, Polarity, ResourceArchetype, SkillDescriptor, SkillTarget,
    StatusDefinition,
};

/// A skill and the target it should be aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiDecision {
    pub skill: String,
    pub target: Option<UnitId>,
}

/// A trait for any system that can decide on a battle action.
pub trait Behavior {
    /// Inspects the battle state and decides on the next action for `unit`.
    fn decide_action(&self, unit: UnitId, battle_state: &BattleState) -> AiDecision;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringAI;

impl ScoringAI {
    pub fn new() -> Self {
        Self
    }

    /// Skills the AI is allowed to consider. The basic attack is last, and
    /// nothing is left while the unit is Seated.
    pub fn candidates(&self, unit: &Combatant) -> Vec<SkillDescriptor> {
        unit.skills
            .iter()
            .filter(|skill| unit.cooldown(&skill.name) == 0)
            .filter(|skill| !skill.is_taunt())
            .filter(|skill| !skill.target.targets_allies())
            .cloned()
            .chain(std::iter::once(SkillDescriptor::basic_attack()))
            .filter(|skill| can_use_skill(unit, skill))
            .collect()
    }

    fn target_count(&self, battle_state: &BattleState, unit: UnitId, mode: SkillTarget) -> f64 {
        let enemies = battle_state.enemies_of(unit).len() as f64;
        match mode {
            SkillTarget::AllEnemies => enemies,
            SkillTarget::RandomEnemies { count } => (count as f64).min(enemies),
            SkillTarget::Chain { extra_targets } => (1.0 + extra_targets as f64).min(enemies),
            SkillTarget::Splash {
                extra_targets,
                splash_pct,
            } => 1.0 + (extra_targets as f64).min((enemies - 1.0).max(0.0)) * splash_pct as f64 / 100.0,
            _ => 1.0,
        }
    }

    /// Expected damage times targets, plus flat bonuses for control and utility.
    fn score_skill(&self, unit: UnitId, skill: &SkillDescriptor, battle_state: &BattleState) -> f64 {
        let mode = effective_target(battle_state, unit, skill);
        let target = default_target(battle_state, unit, mode);

        let mut damage_score = 0.0;
        if let (Some(damage), Some(target)) = (&skill.damage, target) {
            let expected = calculate_damage(
                battle_state,
                unit,
                target,
                DamageRequest {
                    multiplier_pct: damage.multiplier_pct,
                    hits: damage.hits,
                    ignore_def_pct: damage.ignore_def_pct,
                    bonuses: &skill.conditional_bonuses,
                    extra_multiplier_pct: 0,
                    scale_pct: 100,
                },
            )
            .total as f64;
            damage_score = expected * self.target_count(battle_state, unit, mode);
        }

        let mut utility_score = 0.0;
        for effect in &skill.effects {
            let chance = effect.chance as f64 / 100.0;
            let hostile = StatusDefinition::standard(effect.kind).polarity == Polarity::Debuff;
            utility_score += match (effect.kind, effect.target, hostile) {
                (EffectKind::Stun, EffectTarget::Target | EffectTarget::AllEnemies, _) => 30.0 * chance,
                (_, EffectTarget::Target | EffectTarget::AllEnemies, true) => 15.0 * chance,
                (_, EffectTarget::Caster | EffectTarget::AllAllies, false) => 10.0 * chance,
                _ => 0.0,
            };
        }
        if skill.summon.is_some() {
            let side = battle_state.side_of(unit);
            let room = side
                .map(|s| battle_state.config.max_units_per_side > battle_state.living(s).len())
                .unwrap_or(false);
            if room {
                utility_score += 25.0;
            }
        }
        if skill.heal.is_some() || skill.dice.is_some() {
            utility_score += 5.0;
        }

        damage_score + utility_score
    }
}

impl Behavior for ScoringAI {
    fn decide_action(&self, unit: UnitId, battle_state: &BattleState) -> AiDecision {
        let Some(combatant) = battle_state.unit(unit) else {
            return AiDecision {
                skill: SkillDescriptor::basic_attack().name,
                target: None,
            };
        };

        // Highest score wins; earlier skills win ties.
        let mut best: Option<(SkillDescriptor, OrderedFloat<f64>)> = None;
        for skill in self.candidates(combatant) {
            let score = OrderedFloat(self.score_skill(unit, &skill, battle_state));
            let better = match &best {
                None => true,
                Some((_, top)) => score > *top,
            };
            if better {
                best = Some((skill, score));
            }
        }
        let skill = best
            .map(|(skill, _)| skill)
            .unwrap_or_else(SkillDescriptor::basic_attack);

        let mode = effective_target(battle_state, unit, &skill);
        let target = if mode.needs_selection() {
            default_target(battle_state, unit, mode)
        } else {
            None
        };
        tracing::debug!(unit, skill = %skill.name, ?target, "ai decision");
        AiDecision {
            skill: skill.name,
            target,
        }
    }
}

/// Mana pools never run dry for AI units, so every skill they use goes on an
/// artificial cooldown: the skill's own, or the configured window.
pub fn apply_mana_window(battle_state: &mut BattleState, unit: UnitId, skill_name: &str) {
    let window = battle_state.config.ai_mana_cooldown;
    let Some(combatant) = battle_state.unit_mut(unit) else {
        return;
    };
    if combatant.resource.archetype() != ResourceArchetype::Mana {
        return;
    }
    let Some(skill) = combatant.find_skill(skill_name) else {
        return;
    };
    if skill.is_basic_attack() {
        return;
    }
    let turns = if skill.cooldown > 0 { skill.cooldown } else { window };
    let current = combatant.cooldown(&skill.name);
    combatant.set_cooldown(&skill.name, current.max(turns));
}
