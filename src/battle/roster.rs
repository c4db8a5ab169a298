use crate::battle::leader::apply_passives_to;
use crate::battle::state::{BattleEvent, BattleState, EventBus, VisualKind};
use crate::combatant::{Combatant, UnitId};
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use crate::errors::{BattleResult, BattleStateError};
use schema::{Encounter, FightEffect, HeroInstance, Side, SummonSpec, UnitTemplate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything needed to start a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSetup {
    pub battle_id: String,
    pub roster: Vec<HeroInstance>,
    /// Index into `roster` of the hero whose leader skill is active.
    #[serde(default)]
    pub leader_index: Option<usize>,
    pub encounter: Encounter,
    #[serde(default)]
    pub fight_effects: Vec<FightEffect>,
    #[serde(default)]
    pub config: BattleConfig,
}

/// A freshly built battle and the units whose leader skills should be installed.
#[derive(Debug, Clone)]
pub struct BuiltBattle {
    pub state: BattleState,
    pub leaders: Vec<UnitId>,
}

fn spawn(
    state: &mut BattleState,
    template: &UnitTemplate,
    side: Side,
    level: u32,
    growth_pct: u32,
) -> UnitId {
    let class = state.content.class(&template.class_id);
    if class.is_none() {
        tracing::warn!(class = %template.class_id, unit = %template.id, "unknown class; unit has no resource");
    }
    let unit = Combatant::from_template(template, class, side, level, growth_pct);
    state.add_unit(unit)
}

/// Builds combatants for both sides. Unknown templates are skipped.
pub fn build_battle(setup: &BattleSetup, content: Arc<ContentLibrary>) -> BattleResult<BuiltBattle> {
    let mut state = BattleState::new(setup.battle_id.clone(), content.clone(), setup.config.clone());
    state.fight_effects = setup.fight_effects.clone();
    let cap = setup.config.max_units_per_side;
    let mut leaders = Vec::new();

    for (index, hero) in setup.roster.iter().enumerate() {
        if state.living(Side::Heroes).len() >= cap {
            tracing::warn!(template = %hero.template_id, "hero roster exceeds the side cap; skipping");
            continue;
        }
        let Some(template) = content.unit(&hero.template_id) else {
            tracing::warn!(template = %hero.template_id, "unknown hero template; skipping");
            continue;
        };
        let growth = setup.config.growth_pct(hero.level, hero.stars, 0);
        let id = spawn(&mut state, template, Side::Heroes, hero.level, growth);
        if setup.leader_index == Some(index) {
            leaders.push(id);
        }
    }

    match &setup.encounter {
        Encounter::Standard { enemies, level } => {
            let growth = setup.config.growth_pct(*level, 1, 0);
            for template_id in enemies.iter() {
                if state.living(Side::Enemies).len() >= cap {
                    break;
                }
                match content.unit(template_id) {
                    Some(template) => {
                        spawn(&mut state, template, Side::Enemies, *level, growth);
                    }
                    None => tracing::warn!(template = %template_id, "unknown enemy template; skipping"),
                }
            }
        }
        Encounter::ArenaBout { opponents, leader } => {
            for (index, opponent) in opponents.iter().enumerate().take(cap) {
                let Some(template) = content.unit(&opponent.template_id) else {
                    tracing::warn!(template = %opponent.template_id, "unknown arena template; skipping");
                    continue;
                };
                let growth = setup
                    .config
                    .growth_pct(opponent.level, opponent.stars, opponent.shard_tier);
                let id = spawn(&mut state, template, Side::Enemies, opponent.level, growth);
                if *leader == Some(index) {
                    leaders.push(id);
                }
            }
        }
        Encounter::GenusLoci {
            boss_id,
            power_level,
            abilities,
        } => match content.unit(boss_id) {
            Some(template) => {
                let mut boss = template.clone();
                for ability in abilities.iter().filter(|a| a.unlock_at <= *power_level) {
                    boss.skills.push(ability.skill.clone());
                }
                let growth = 100 + power_level.saturating_sub(1) * setup.config.boss_power_growth_pct;
                let id = spawn(&mut state, &boss, Side::Enemies, *power_level, growth);
                if boss.leader_skill.is_some() {
                    leaders.push(id);
                }
            }
            None => tracing::warn!(boss = %boss_id, "unknown boss template"),
        },
    }

    for side in [Side::Heroes, Side::Enemies] {
        if state.living(side).is_empty() {
            return Err(BattleStateError::EmptySide(side).into());
        }
    }
    Ok(BuiltBattle { state, leaders })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummonOutcome {
    Summoned(Vec<UnitId>),
    /// The side is full; the caller runs the fallback skill if one is set.
    NoRoom { fallback: Option<String> },
}

/// Adds as many copies of the summon template as fit under the side cap.
/// New units wait for the next round's turn order.
pub fn summon(state: &mut BattleState, summoner: UnitId, spec: &SummonSpec, bus: &mut EventBus) -> SummonOutcome {
    let Some(owner) = state.unit(summoner) else {
        return SummonOutcome::Summoned(Vec::new());
    };
    let side = owner.side;
    let level = owner.level;
    let room = state
        .config
        .max_units_per_side
        .saturating_sub(state.living(side).len());
    if room == 0 {
        bus.push(BattleEvent::SummonFailed {
            summoner,
            fallback: spec.fallback_skill.clone(),
        });
        return SummonOutcome::NoRoom {
            fallback: spec.fallback_skill.clone(),
        };
    }

    let content = state.content.clone();
    let Some(template) = content.unit(&spec.template_id) else {
        tracing::warn!(template = %spec.template_id, "unknown summon template; skipping");
        return SummonOutcome::Summoned(Vec::new());
    };
    let growth = state.config.growth_pct(level, 1, 0);

    let mut summoned = Vec::new();
    for _ in 0..(spec.count.max(1) as usize).min(room) {
        let id = spawn(state, template, side, level, growth);
        if let Some(unit) = state.unit_mut(id) {
            unit.summoned = true;
        }
        apply_passives_to(state, id);
        tracing::debug!(summoner, unit = id, template = %spec.template_id, "summoned");
        bus.push(BattleEvent::UnitSummoned { summoner, unit: id });
        bus.visual(id, VisualKind::Summon, 0);
        summoned.push(id);
    }
    SummonOutcome::Summoned(summoned)
}
