use crate::battle::ai::{apply_mana_window, Behavior, ScoringAI};
use crate::battle::engine::{begin_round, check_outcome, end_battle, end_round, end_turn, start_battle, start_turn};
use crate::battle::pipeline::{check_skill, resolve_skill, SkillReport};
use crate::battle::roster::{build_battle, BattleSetup};
use crate::battle::state::{BattleEvent, BattleState, EventBus, GameState, Outcome, SkipReason, TurnRng};
use crate::battle::targeting::{default_target, effective_target};
use crate::combatant::{Combatant, UnitId};
use crate::content::ContentLibrary;
use crate::errors::{ActionError, BattleResult, BattleStateError};
use schema::{EffectKind, Side, SkillDescriptor, SkillTarget};
use serde::Serialize;
use std::sync::Arc;

/// High-level battle driver. Owns the state, the rng and the event log, and
/// walks the battle forward until a hero needs a decision or the battle ends.
#[derive(Debug)]
pub struct BattleRunner {
    battle_state: BattleState,
    rng: TurnRng,
    event_bus: EventBus,
    ai: ScoringAI,
    /// Heroes are driven by the AI as well; no player input is requested.
    auto_heroes: bool,
}

/// Snapshot of the battle for API queries
#[derive(Debug, Clone, Serialize)]
pub struct BattleInfo {
    pub battle_id: String,
    pub round: u32,
    pub game_state: GameState,
    pub units: Vec<UnitInfo>,
    /// Units still to act this round, in order.
    pub pending_turns: Vec<UnitId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitInfo {
    pub id: UnitId,
    pub name: String,
    pub side: Side,
    pub hp: u32,
    pub max_hp: u32,
    pub resource: u32,
    pub focused: bool,
    pub summoned: bool,
    pub effects: Vec<EffectInfo>,
    pub skills: Vec<SkillInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectInfo {
    pub kind: EffectKind,
    pub duration: u8,
    pub stacks: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillInfo {
    pub name: String,
    pub target: SkillTarget,
    pub cooldown: u8,
    pub usable: bool,
}

impl UnitInfo {
    fn from_combatant(unit: &Combatant) -> Self {
        let mut skills: Vec<SkillDescriptor> = unit.skills.clone();
        skills.push(SkillDescriptor::basic_attack());
        UnitInfo {
            id: unit.id,
            name: unit.name.clone(),
            side: unit.side,
            hp: unit.hp,
            max_hp: unit.max_hp,
            resource: unit.resource.current,
            focused: unit.resource.focused,
            summoned: unit.summoned,
            effects: unit
                .effects
                .iter()
                .map(|effect| EffectInfo {
                    kind: effect.kind,
                    duration: effect.duration,
                    stacks: effect.stacks,
                })
                .collect(),
            skills: skills
                .into_iter()
                .map(|skill| SkillInfo {
                    cooldown: unit.cooldown(&skill.name),
                    usable: unit.is_alive() && crate::battle::resources::can_use_skill(unit, &skill),
                    target: skill.target,
                    name: skill.name,
                })
                .collect(),
        }
    }
}

impl BattleRunner {
    /// Build the battle described by `setup` and run its opening (leader
    /// skills, battle-start debuffs). Call `advance` to start playing.
    pub fn new(setup: &BattleSetup, content: Arc<ContentLibrary>, rng: TurnRng) -> BattleResult<Self> {
        let built = build_battle(setup, content)?;
        let mut runner = Self {
            battle_state: built.state,
            rng,
            event_bus: EventBus::new(),
            ai: ScoringAI::new(),
            auto_heroes: false,
        };
        start_battle(
            &mut runner.battle_state,
            &built.leaders,
            &mut runner.event_bus,
            &mut runner.rng,
        );
        Ok(runner)
    }

    /// Wrap an already-assembled state. Used by tests and tools that set up
    /// units by hand.
    pub fn from_state(battle_state: BattleState, rng: TurnRng) -> Self {
        Self {
            battle_state,
            rng,
            event_bus: EventBus::new(),
            ai: ScoringAI::new(),
            auto_heroes: false,
        }
    }

    pub fn with_auto_heroes(mut self, auto_heroes: bool) -> Self {
        self.auto_heroes = auto_heroes;
        self
    }

    pub fn state(&self) -> &BattleState {
        &self.battle_state
    }

    pub fn game_state(&self) -> &GameState {
        &self.battle_state.game_state
    }

    pub fn is_battle_ended(&self) -> bool {
        self.battle_state.game_state.is_terminal()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.battle_state.game_state {
            GameState::Victory => Some(Outcome::Victory),
            GameState::Defeat => Some(Outcome::Defeat),
            _ => None,
        }
    }

    /// Get all events that have occurred in the battle so far
    pub fn events(&self) -> &[BattleEvent] {
        self.event_bus.events()
    }

    /// Drain the event log; the next call only returns newer events.
    pub fn take_events(&mut self) -> Vec<BattleEvent> {
        self.event_bus.take()
    }

    pub fn formatted_log(&self) -> Vec<String> {
        self.event_bus.formatted_lines(&self.battle_state)
    }

    /// Run the battle until a hero needs input or the battle ends.
    pub fn advance(&mut self) -> &GameState {
        loop {
            match self.battle_state.game_state.clone() {
                GameState::Victory
                | GameState::Defeat
                | GameState::AwaitingAction { .. }
                | GameState::AwaitingTarget { .. } => break,
                GameState::RoundStart => {
                    if self.battle_state.round >= self.battle_state.config.max_rounds {
                        tracing::warn!(round = self.battle_state.round, "round limit reached");
                        end_battle(&mut self.battle_state, Outcome::Defeat, &mut self.event_bus);
                        break;
                    }
                    begin_round(&mut self.battle_state, &mut self.event_bus, &mut self.rng);
                }
                GameState::Resolving => self.next_turn(),
            }
        }
        &self.battle_state.game_state
    }

    fn next_turn(&mut self) {
        let mut order = std::mem::take(&mut self.battle_state.turn_order);
        let next = order.pop_next(&self.battle_state);
        self.battle_state.turn_order = order;
        let Some(unit) = next else {
            end_round(&mut self.battle_state, &mut self.event_bus);
            if check_outcome(&mut self.battle_state, &mut self.event_bus).is_none() {
                self.battle_state.game_state = GameState::RoundStart;
            }
            return;
        };

        if !start_turn(&mut self.battle_state, unit, &mut self.event_bus, &mut self.rng) {
            if self.battle_state.is_alive(unit) {
                end_turn(&mut self.battle_state, unit, None, &mut self.event_bus, &mut self.rng);
            }
            check_outcome(&mut self.battle_state, &mut self.event_bus);
            return;
        }
        if check_outcome(&mut self.battle_state, &mut self.event_bus).is_some() {
            return;
        }

        let seated = self
            .battle_state
            .unit(unit)
            .is_some_and(|u| u.has_effect(EffectKind::Seated));
        if seated {
            tracing::debug!(unit, "seated; passing turn");
            self.event_bus.push(BattleEvent::TurnSkipped {
                unit,
                reason: SkipReason::Seated,
            });
            self.finish_turn(unit, "");
            return;
        }

        let is_hero = self.battle_state.side_of(unit) == Some(Side::Heroes);
        if is_hero && !self.auto_heroes {
            self.battle_state.game_state = GameState::AwaitingAction { unit };
            return;
        }
        self.take_ai_turn(unit);
    }

    fn take_ai_turn(&mut self, unit: UnitId) {
        let decision = self.ai.decide_action(unit, &self.battle_state);
        let report = match resolve_skill(
            &mut self.battle_state,
            unit,
            &decision.skill,
            decision.target,
            &mut self.rng,
            &mut self.event_bus,
        ) {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(unit, %error, "ai choice rejected; using basic attack");
                let basic = SkillDescriptor::basic_attack();
                let target = default_target(&self.battle_state, unit, basic.target);
                match resolve_skill(
                    &mut self.battle_state,
                    unit,
                    &basic.name,
                    target,
                    &mut self.rng,
                    &mut self.event_bus,
                ) {
                    Ok(report) => report,
                    Err(error) => {
                        tracing::warn!(unit, %error, "basic attack rejected; passing turn");
                        SkillReport::default()
                    }
                }
            }
        };
        let is_enemy = self.battle_state.side_of(unit) == Some(Side::Enemies);
        if is_enemy && !report.skill.is_empty() {
            apply_mana_window(&mut self.battle_state, unit, &report.skill);
        }
        self.finish_turn(unit, &report.skill);
    }

    fn finish_turn(&mut self, unit: UnitId, skill: &str) {
        self.battle_state.game_state = GameState::Resolving;
        if self.battle_state.is_alive(unit) {
            let used = (!skill.is_empty()).then_some(skill);
            end_turn(&mut self.battle_state, unit, used, &mut self.event_bus, &mut self.rng);
        }
        check_outcome(&mut self.battle_state, &mut self.event_bus);
    }

    fn awaiting_unit(&self) -> BattleResult<UnitId> {
        match self.battle_state.game_state {
            GameState::AwaitingAction { unit } => Ok(unit),
            GameState::Victory | GameState::Defeat => Err(BattleStateError::BattleOver.into()),
            _ => Err(ActionError::NotAwaiting("action").into()),
        }
    }

    /// Pick a skill for the hero whose turn it is. Skills that need a target
    /// move the battle to `AwaitingTarget`; everything else resolves now.
    pub fn select_skill(&mut self, skill_name: &str) -> BattleResult<&GameState> {
        let unit = self.awaiting_unit()?;
        let skill = check_skill(&self.battle_state, unit, skill_name, None)?;
        let mode = effective_target(&self.battle_state, unit, &skill);
        if mode.needs_selection() {
            self.battle_state.game_state = GameState::AwaitingTarget {
                unit,
                skill: skill.name,
            };
            return Ok(&self.battle_state.game_state);
        }
        self.perform(unit, &skill.name, None)?;
        Ok(self.advance())
    }

    /// Resolve the pending skill against `target`. An invalid target leaves
    /// the selection pending.
    pub fn select_target(&mut self, target: UnitId) -> BattleResult<&GameState> {
        let (unit, skill) = match &self.battle_state.game_state {
            GameState::AwaitingTarget { unit, skill } => (*unit, skill.clone()),
            GameState::Victory | GameState::Defeat => return Err(BattleStateError::BattleOver.into()),
            _ => return Err(ActionError::NotAwaiting("target").into()),
        };
        check_skill(&self.battle_state, unit, &skill, Some(target))?;
        self.perform(unit, &skill, Some(target))?;
        Ok(self.advance())
    }

    /// Drop the pending skill choice and ask for a skill again.
    pub fn cancel_selection(&mut self) -> BattleResult<&GameState> {
        match self.battle_state.game_state {
            GameState::AwaitingTarget { unit, .. } => {
                self.battle_state.game_state = GameState::AwaitingAction { unit };
                Ok(&self.battle_state.game_state)
            }
            GameState::Victory | GameState::Defeat => Err(BattleStateError::BattleOver.into()),
            _ => Err(ActionError::NotAwaiting("target").into()),
        }
    }

    fn perform(&mut self, unit: UnitId, skill: &str, target: Option<UnitId>) -> BattleResult<()> {
        let report = resolve_skill(
            &mut self.battle_state,
            unit,
            skill,
            target,
            &mut self.rng,
            &mut self.event_bus,
        )?;
        self.finish_turn(unit, &report.skill);
        Ok(())
    }

    /// Play the whole battle with the AI on both sides. The battle counts as
    /// lost if it is still running after `max_rounds`.
    pub fn run_to_completion(&mut self, max_rounds: u32) -> Outcome {
        self.auto_heroes = true;
        self.battle_state.config.max_rounds = max_rounds.min(self.battle_state.config.max_rounds);
        if let GameState::AwaitingAction { .. } | GameState::AwaitingTarget { .. } = self.battle_state.game_state {
            if let Some(unit) = self.awaiting_any() {
                self.take_ai_turn(unit);
            }
        }
        self.advance();
        self.outcome().unwrap_or(Outcome::Defeat)
    }

    fn awaiting_any(&self) -> Option<UnitId> {
        match self.battle_state.game_state {
            GameState::AwaitingAction { unit } | GameState::AwaitingTarget { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Get current battle information for API queries
    pub fn battle_info(&self) -> BattleInfo {
        BattleInfo {
            battle_id: self.battle_state.battle_id.clone(),
            round: self.battle_state.round,
            game_state: self.battle_state.game_state.clone(),
            units: self
                .battle_state
                .units
                .iter()
                .map(UnitInfo::from_combatant)
                .collect(),
            pending_turns: self.battle_state.turn_order.pending().copied().collect(),
        }
    }
}
