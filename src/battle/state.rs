use crate::battle::leader::ActiveLeader;
use crate::battle::turn_order::TurnOrder;
use crate::combatant::{Combatant, UnitId};
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use schema::{EffectKind, FightEffect, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum GameState {
    RoundStart,
    /// A hero is up and the player must pick a skill.
    AwaitingAction { unit: UnitId },
    /// The player picked a skill that needs a target.
    AwaitingTarget { unit: UnitId, skill: String },
    Resolving,
    Victory,
    Defeat,
}

impl GameState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameState::Victory | GameState::Defeat)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Stunned,
    Seated,
    Dead,
}

/// Notification for the presentation layer; fire-and-forget.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Hit,
    Heal,
    Shield,
    Evade,
    Death,
    Revive,
    Summon,
    Finale,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    // Battle flow
    BattleStarted {
        battle_id: String,
    },
    RoundStarted {
        round: u32,
    },
    RoundEnded {
        round: u32,
    },
    TurnStarted {
        unit: UnitId,
    },
    TurnSkipped {
        unit: UnitId,
        reason: SkipReason,
    },
    TurnOrderRecomputed,

    // Actions
    SkillUsed {
        unit: UnitId,
        skill: String,
    },
    TargetEvaded {
        attacker: UnitId,
        target: UnitId,
    },
    DiceRolled {
        unit: UnitId,
        total: u32,
        forced: bool,
    },
    CoinFlipped {
        unit: UnitId,
        heads: bool,
    },

    // Damage and healing
    DamageDealt {
        source: Option<UnitId>,
        target: UnitId,
        amount: u32,
        remaining_hp: u32,
    },
    SelfDamage {
        unit: UnitId,
        amount: u32,
    },
    Healed {
        target: UnitId,
        amount: u32,
        new_hp: u32,
    },
    ShieldAbsorbed {
        target: UnitId,
        amount: u32,
    },
    Redirected {
        guardian: UnitId,
        protected: UnitId,
        amount: u32,
    },
    Reflected {
        from: UnitId,
        to: UnitId,
        amount: u32,
    },
    DeathPrevented {
        unit: UnitId,
        healed: u32,
    },
    StoredDamageReleased {
        unit: UnitId,
        amount: u32,
    },
    UnitDefeated {
        unit: UnitId,
    },
    Revived {
        unit: UnitId,
        hp: u32,
    },

    // Status effects
    EffectApplied {
        target: UnitId,
        kind: EffectKind,
        stacks: u8,
        duration: u8,
    },
    EffectBlocked {
        target: UnitId,
        kind: EffectKind,
    },
    EffectRemoved {
        target: UnitId,
        kind: EffectKind,
    },
    EffectExpired {
        target: UnitId,
        kind: EffectKind,
    },
    EffectTicked {
        target: UnitId,
        kind: EffectKind,
        amount: u32,
    },

    // Resources
    ResourceChanged {
        unit: UnitId,
        value: u32,
    },
    FocusGained {
        unit: UnitId,
    },
    FocusLost {
        unit: UnitId,
    },

    // Announcements
    LeaderSkillActivated {
        side: Side,
        leader: String,
        detail: String,
    },
    FinaleTriggered {
        unit: UnitId,
        finale: String,
        sacrifice_bonus: u32,
    },
    PassiveTriggered {
        unit: UnitId,
        passive: String,
    },
    UnitSummoned {
        summoner: UnitId,
        unit: UnitId,
    },
    SummonFailed {
        summoner: UnitId,
        fallback: Option<String>,
    },
    Visual {
        target: UnitId,
        kind: VisualKind,
        magnitude: u32,
    },

    // Battle End
    BattleEnded {
        outcome: Outcome,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable string using battle context.
    /// Returns None for silent events that should not produce user-visible text.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let name = |id: &UnitId| battle_state.name_of(*id);
        match self {
            BattleEvent::BattleStarted { battle_id } => {
                Some(format!("Battle {} begins!", battle_id))
            }
            BattleEvent::RoundStarted { round } => Some(format!("=== Round {} ===", round)),
            BattleEvent::RoundEnded { .. } => None,
            BattleEvent::TurnStarted { .. } => None,
            BattleEvent::TurnSkipped { unit, reason } => match reason {
                SkipReason::Stunned => Some(format!("{} is stunned and cannot act!", name(unit))),
                SkipReason::Seated => Some(format!("{} is seated and cannot act!", name(unit))),
                SkipReason::Dead => None,
            },
            BattleEvent::TurnOrderRecomputed => Some("The turn order shifts!".to_string()),

            BattleEvent::SkillUsed { unit, skill } => {
                let side_prefix = match battle_state.unit(*unit).map(|u| u.side) {
                    Some(Side::Enemies) => "Enemy ",
                    _ => "",
                };
                Some(format!("{}{} used {}!", side_prefix, name(unit), skill))
            }
            BattleEvent::TargetEvaded { target, .. } => {
                Some(format!("{} evaded the attack!", name(target)))
            }
            BattleEvent::DiceRolled { unit, total, forced } => {
                if *forced {
                    Some(format!("{}'s loaded dice land on {}!", name(unit), total))
                } else {
                    Some(format!("{} rolled {}.", name(unit), total))
                }
            }
            BattleEvent::CoinFlipped { unit, heads } => Some(format!(
                "{} flips a coin: {}!",
                name(unit),
                if *heads { "heads" } else { "tails" }
            )),

            BattleEvent::DamageDealt { target, amount, .. } => {
                Some(format!("{} took {} damage!", name(target), amount))
            }
            BattleEvent::SelfDamage { unit, amount } => {
                Some(format!("{} sacrificed {} HP!", name(unit), amount))
            }
            BattleEvent::Healed { target, amount, .. } => {
                Some(format!("{} recovered {} HP!", name(target), amount))
            }
            BattleEvent::ShieldAbsorbed { target, amount } => {
                Some(format!("{}'s shield absorbed {} damage.", name(target), amount))
            }
            BattleEvent::Redirected {
                guardian,
                protected,
                amount,
            } => Some(format!(
                "{} takes {} damage in place of {}!",
                name(guardian),
                amount,
                name(protected)
            )),
            BattleEvent::Reflected { from, to, amount } => Some(format!(
                "{} reflected {} damage back at {}!",
                name(from),
                amount,
                name(to)
            )),
            BattleEvent::DeathPrevented { unit, .. } => {
                Some(format!("{} refused to fall!", name(unit)))
            }
            BattleEvent::StoredDamageReleased { unit, amount } => Some(format!(
                "{} unleashes {} stored damage!",
                name(unit),
                amount
            )),
            BattleEvent::UnitDefeated { unit } => Some(format!("{} was defeated!", name(unit))),
            BattleEvent::Revived { unit, hp } => {
                Some(format!("{} was revived with {} HP!", name(unit), hp))
            }

            BattleEvent::EffectApplied { target, kind, stacks, .. } => {
                if *stacks > 1 {
                    Some(format!("{} gained {} (x{}).", name(target), kind, stacks))
                } else {
                    Some(format!("{} gained {}.", name(target), kind))
                }
            }
            BattleEvent::EffectBlocked { target, kind } => {
                Some(format!("{} is immune to {}!", name(target), kind))
            }
            BattleEvent::EffectRemoved { target, kind } => {
                Some(format!("{}'s {} was removed.", name(target), kind))
            }
            BattleEvent::EffectExpired { target, kind } => {
                Some(format!("{}'s {} wore off.", name(target), kind))
            }
            BattleEvent::EffectTicked { target, kind, amount } => {
                Some(format!("{} is affected by {} ({}).", name(target), kind, amount))
            }

            BattleEvent::ResourceChanged { .. } => None,
            BattleEvent::FocusGained { unit } => Some(format!("{} is focused.", name(unit))),
            BattleEvent::FocusLost { unit } => Some(format!("{} lost focus.", name(unit))),

            BattleEvent::LeaderSkillActivated { leader, detail, .. } => {
                Some(format!("Leader Skill [{}]: {}", leader, detail))
            }
            BattleEvent::FinaleTriggered { unit, finale, .. } => {
                Some(format!("{} performs the Finale: {}!", name(unit), finale))
            }
            BattleEvent::PassiveTriggered { unit, passive } => {
                Some(format!("{}'s {} activates!", name(unit), passive))
            }
            BattleEvent::UnitSummoned { summoner, unit } => {
                Some(format!("{} summoned {}!", name(summoner), name(unit)))
            }
            BattleEvent::SummonFailed { summoner, .. } => {
                Some(format!("{} has no room to summon!", name(summoner)))
            }
            BattleEvent::Visual { .. } => None,

            BattleEvent::BattleEnded { outcome } => match outcome {
                Outcome::Victory => Some("Victory!".to_string()),
                Outcome::Defeat => Some("Defeat...".to_string()),
            },
        }
    }
}

/// Event bus for collecting and managing battle events.
///
/// ```rust,ignore
/// event_bus.print_debug();                    // Just print events
/// println!("{}", event_bus);                  // Display trait
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        tracing::trace!(?event, "battle event");
        self.events.push(event);
    }

    pub fn visual(&mut self, target: UnitId, kind: VisualKind, magnitude: u32) {
        self.push(BattleEvent::Visual {
            target,
            kind,
            magnitude,
        });
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Drain every collected event, leaving the bus empty.
    pub fn take(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Print all events in debug format with indentation.
    pub fn print_debug(&self) {
        for event in &self.events {
            println!("  {:?}", event);
        }
    }

    /// Print a custom message followed by all events in debug format.
    pub fn print_debug_with_message(&self, message: &str) {
        println!("{}", message);
        self.print_debug();
    }

    pub fn formatted_lines(&self, battle_state: &BattleState) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.format(battle_state))
            .collect()
    }

    /// Return true if the event bus contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Return the number of events in the bus.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl std::fmt::Display for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RngSource {
    Scripted { outcomes: Vec<u8>, index: usize },
    Seeded(rand::rngs::StdRng),
}

/// Source of every random outcome in a battle. Outcomes are percent rolls in
/// 1..=100; each draw names what it is for.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RngSource,
}

impl TurnRng {
    /// A scripted sequence; wraps around when exhausted.
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            source: RngSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            source: RngSource::Seeded(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }

    pub fn new_random() -> Self {
        use rand::Rng;
        Self::from_seed(rand::rng().random())
    }

    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = match &mut self.source {
            RngSource::Scripted { outcomes, index } => {
                if outcomes.is_empty() {
                    tracing::warn!(reason, "scripted rng is empty; using 50");
                    return 50;
                }
                if *index >= outcomes.len() {
                    tracing::warn!(reason, "scripted rng exhausted; wrapping around");
                    *index = 0;
                }
                let outcome = outcomes[*index];
                *index += 1;
                outcome
            }
            RngSource::Seeded(rng) => {
                use rand::Rng;
                rng.random_range(1..=100)
            }
        };

        #[cfg(test)]
        println!("[RNG] Consumed {} for: {}", outcome, reason);

        outcome
    }

    /// True when a `chance` percent roll succeeds.
    pub fn roll_chance(&mut self, chance: u32, reason: &str) -> bool {
        if chance >= 100 {
            return true;
        }
        if chance == 0 {
            return false;
        }
        self.next_outcome(reason) as u32 <= chance
    }

    pub fn roll_die(&mut self, sides: u8, reason: &str) -> u32 {
        let sides = sides.max(1) as u32;
        if let RngSource::Seeded(rng) = &mut self.source {
            use rand::Rng;
            return rng.random_range(1..=sides);
        }
        let outcome = self.next_outcome(reason).max(1) as u32;
        (outcome - 1) % sides + 1
    }

    /// Heads on a roll of 50 or below.
    pub fn coin_flip(&mut self, reason: &str) -> bool {
        self.next_outcome(reason) <= 50
    }

    pub fn pick_index(&mut self, len: usize, reason: &str) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_outcome(reason).max(1) as usize - 1) % len
    }
}

/// The single context object for one battle.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BattleState {
    pub battle_id: String,
    pub units: Vec<Combatant>,
    pub round: u32,
    pub game_state: GameState,
    pub turn_order: TurnOrder,
    pub fight_effects: Vec<FightEffect>,
    pub leaders: Vec<ActiveLeader>,
    /// HP paid through self damage this battle, per side; reset when a Finale consumes it.
    pub sacrificed_hp: [u32; 2],
    pub config: BattleConfig,
    #[serde(skip)]
    pub content: Arc<ContentLibrary>,
}

impl BattleState {
    pub fn new(battle_id: impl Into<String>, content: Arc<ContentLibrary>, config: BattleConfig) -> Self {
        Self {
            battle_id: battle_id.into(),
            units: Vec::new(),
            round: 0,
            game_state: GameState::RoundStart,
            turn_order: TurnOrder::default(),
            fight_effects: Vec::new(),
            leaders: Vec::new(),
            sacrificed_hp: [0, 0],
            config,
            content,
        }
    }

    /// Adds a combatant and returns its id.
    pub fn add_unit(&mut self, mut unit: Combatant) -> UnitId {
        let id = self.units.len();
        unit.id = id;
        self.units.push(unit);
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Combatant> {
        self.units.get(id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Combatant> {
        self.units.get_mut(id)
    }

    pub fn is_alive(&self, id: UnitId) -> bool {
        self.unit(id).is_some_and(Combatant::is_alive)
    }

    pub fn name_of(&self, id: UnitId) -> String {
        self.unit(id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| format!("Unit #{}", id))
    }

    pub fn side_of(&self, id: UnitId) -> Option<Side> {
        self.unit(id).map(|u| u.side)
    }

    /// Living units on `side`, in id order.
    pub fn living(&self, side: Side) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.side == side && u.is_alive())
            .map(|u| u.id)
            .collect()
    }

    pub fn fallen(&self, side: Side) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.side == side && !u.is_alive())
            .map(|u| u.id)
            .collect()
    }

    pub fn all_defeated(&self, side: Side) -> bool {
        self.living(side).is_empty()
    }

    /// Living allies of `id`, excluding `id` itself.
    pub fn allies_of(&self, id: UnitId) -> Vec<UnitId> {
        match self.side_of(id) {
            Some(side) => self.living(side).into_iter().filter(|&a| a != id).collect(),
            None => Vec::new(),
        }
    }

    pub fn enemies_of(&self, id: UnitId) -> Vec<UnitId> {
        match self.side_of(id) {
            Some(side) => self.living(side.opponent()),
            None => Vec::new(),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if self.all_defeated(Side::Enemies) {
            Some(Outcome::Victory)
        } else if self.all_defeated(Side::Heroes) {
            Some(Outcome::Defeat)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod event_formatting_tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, TestUnitBuilder};
    use pretty_assertions::assert_eq;

    fn battle() -> BattleState {
        create_test_battle(
            vec![TestUnitBuilder::new("Aria", Side::Heroes)],
            vec![TestUnitBuilder::new("Gloom", Side::Enemies)],
        )
        .0
    }

    #[test]
    fn test_silent_events_return_none() {
        let battle_state = battle();
        let silent_events = vec![
            BattleEvent::RoundEnded { round: 1 },
            BattleEvent::TurnStarted { unit: 0 },
            BattleEvent::ResourceChanged { unit: 0, value: 10 },
            BattleEvent::Visual {
                target: 1,
                kind: VisualKind::Hit,
                magnitude: 20,
            },
        ];
        for event in silent_events {
            assert!(
                event.format(&battle_state).is_none(),
                "Event {:?} should be silent",
                event
            );
        }
    }

    #[test]
    fn test_enemy_skill_use_is_announced() {
        let battle_state = battle();
        let hero = BattleEvent::SkillUsed {
            unit: 0,
            skill: "Lance".to_string(),
        };
        let enemy = BattleEvent::SkillUsed {
            unit: 1,
            skill: "Miasma".to_string(),
        };
        assert_eq!(hero.format(&battle_state), Some("Aria used Lance!".to_string()));
        assert_eq!(
            enemy.format(&battle_state),
            Some("Enemy Gloom used Miasma!".to_string())
        );
    }

    #[test]
    fn test_event_text_samples() {
        let battle_state = battle();
        assert_eq!(
            BattleEvent::RoundStarted { round: 5 }.format(&battle_state),
            Some("=== Round 5 ===".to_string())
        );
        assert_eq!(
            BattleEvent::EffectApplied {
                target: 1,
                kind: EffectKind::Fury,
                stacks: 3,
                duration: 2
            }
            .format(&battle_state),
            Some("Gloom gained Fury (x3).".to_string())
        );
    }

    #[test]
    fn test_event_bus_collects_and_drains() {
        let battle_state = battle();
        let mut event_bus = EventBus::new();
        event_bus.push(BattleEvent::RoundStarted { round: 1 });
        event_bus.visual(1, VisualKind::Hit, 10);
        assert_eq!(event_bus.len(), 2);
        assert_eq!(event_bus.formatted_lines(&battle_state).len(), 1);
        assert!(format!("{}", event_bus).contains("RoundStarted"));

        let drained = event_bus.take();
        assert_eq!(drained.len(), 2);
        assert!(event_bus.is_empty());
    }

    #[test]
    fn test_scripted_rng_helpers() {
        let mut rng = TurnRng::new_for_test(vec![3, 51, 50, 7, 100]);
        assert_eq!(rng.roll_die(6, "die"), 3);
        assert!(!rng.coin_flip("coin"));
        assert!(rng.coin_flip("coin"));
        assert_eq!(rng.pick_index(3, "pick"), 0);
        assert!(!rng.roll_chance(99, "chance"));
        assert_eq!(rng.next_outcome("wrap"), 3);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = TurnRng::from_seed(7);
        let mut b = TurnRng::from_seed(7);
        let rolls_a: Vec<u8> = (0..10).map(|_| a.next_outcome("a")).collect();
        let rolls_b: Vec<u8> = (0..10).map(|_| b.next_outcome("b")).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|r| (1..=100).contains(r)));
    }
}
