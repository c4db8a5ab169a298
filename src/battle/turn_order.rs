use std::cmp::Reverse;
use std::collections::VecDeque;

use crate::battle::state::BattleState;
use crate::battle::stats::effective_speed;
use crate::combatant::UnitId;
use schema::EffectKind;
use serde::{Deserialize, Serialize};

/// Sort key for one unit: priority-override holders first, then higher
/// effective speed, then lower id for a stable order.
pub type PriorityKey = (u8, Reverse<u32>, UnitId);

/// Acting order for the current round. Built once at round start; only an
/// explicit on-kill effect reorders the units that have not yet acted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOrder {
    pending: VecDeque<UnitId>,
    acted: Vec<UnitId>,
}

impl TurnOrder {
    /// Builds the round order from every living unit.
    pub fn build(battle_state: &BattleState) -> Self {
        let living: Vec<UnitId> = battle_state
            .units
            .iter()
            .filter(|unit| unit.is_alive())
            .map(|unit| unit.id)
            .collect();
        Self {
            pending: sort_by_priority(battle_state, living).into(),
            acted: Vec::new(),
        }
    }

    /// Removes and returns the next living unit, skipping any that died
    /// since the order was built.
    pub fn pop_next(&mut self, battle_state: &BattleState) -> Option<UnitId> {
        while let Some(unit) = self.pending.pop_front() {
            if battle_state.is_alive(unit) {
                self.acted.push(unit);
                return Some(unit);
            }
        }
        None
    }

    pub fn pending(&self) -> impl Iterator<Item = &UnitId> {
        self.pending.iter()
    }

    pub fn acted(&self) -> &[UnitId] {
        &self.acted
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn priority_key(battle_state: &BattleState, unit: UnitId) -> PriorityKey {
    let band = match battle_state.unit(unit) {
        Some(u) if u.has_effect(EffectKind::Haste) => 0,
        _ => 1,
    };
    (band, Reverse(effective_speed(battle_state, unit)), unit)
}

fn sort_by_priority(battle_state: &BattleState, mut units: Vec<UnitId>) -> Vec<UnitId> {
    units.sort_by_key(|&unit| priority_key(battle_state, unit));
    units
}

/// Re-sort the units still waiting to act this round with current stats.
/// Units that already acted stay where they are.
pub fn recompute_remaining(battle_state: &mut BattleState) {
    let waiting: Vec<UnitId> = battle_state
        .turn_order
        .pending
        .iter()
        .copied()
        .filter(|&unit| battle_state.is_alive(unit))
        .collect();
    let sorted = sort_by_priority(battle_state, waiting);
    battle_state.turn_order.pending = sorted.into();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::effects::{Origin, StatusEffect};
    use crate::battle::tests::common::{create_test_battle, TestUnitBuilder};
    use pretty_assertions::assert_eq;
    use schema::Side;

    fn with_speeds(speeds: &[u32]) -> BattleState {
        let heroes = speeds
            .iter()
            .enumerate()
            .map(|(i, &spd)| {
                TestUnitBuilder::new(&format!("hero{}", i), Side::Heroes).with_stats(100, 10, 10, spd)
            })
            .collect();
        create_test_battle(heroes, vec![TestUnitBuilder::new("foe", Side::Enemies).with_stats(100, 10, 10, 1)]).0
    }

    fn order_of(state: &BattleState) -> Vec<UnitId> {
        TurnOrder::build(state).pending().copied().collect()
    }

    #[test]
    fn test_higher_speed_acts_first() {
        let state = with_speeds(&[10, 30, 20]);
        assert_eq!(order_of(&state), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_priority_override_beats_raw_speed() {
        let mut state = with_speeds(&[10, 30, 20]);
        state.units[0]
            .effects
            .push(StatusEffect::flag(EffectKind::Haste, 1, Some(0), Origin::SelfApplied));
        state.units[2]
            .effects
            .push(StatusEffect::flag(EffectKind::Haste, 1, Some(2), Origin::SelfApplied));

        // Among override holders, higher speed still goes first.
        assert_eq!(order_of(&state), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_equal_speed_ties_break_by_id() {
        let state = with_speeds(&[15, 15, 15]);
        assert_eq!(order_of(&state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_dead_units_are_skipped() {
        let mut state = with_speeds(&[10, 30, 20]);
        let mut order = TurnOrder::build(&state);
        state.units[2].hp = 0;

        assert_eq!(order.pop_next(&state), Some(1));
        assert_eq!(order.pop_next(&state), Some(0));
        assert_eq!(order.pop_next(&state), Some(3));
        assert_eq!(order.pop_next(&state), None);
        assert_eq!(order.acted(), &[1, 0, 3]);
    }

    #[test]
    fn test_recompute_only_touches_units_yet_to_act() {
        let mut state = with_speeds(&[10, 30, 20]);
        state.turn_order = TurnOrder::build(&state);
        let first = state.turn_order.clone().pop_next(&state);
        assert_eq!(first, Some(1));
        let mut order = state.turn_order.clone();
        order.pop_next(&state);
        state.turn_order = order;

        state.units[0].stats.speed = 99;
        recompute_remaining(&mut state);

        let rest: Vec<UnitId> = state.turn_order.pending().copied().collect();
        assert_eq!(rest, vec![0, 2, 3]);
        assert_eq!(state.turn_order.acted(), &[1]);
    }
}
