//! Battle-wide modifiers keyed by hook and scoped by side. These are pure
//! queries; the calculator and the turn loop decide what to do with them.

use crate::battle::state::BattleState;
use schema::{EffectApplication, FightEffectKind, Hook, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreDamageModifiers {
    /// Sum of every matching damage multiplier, in percent.
    pub bonus_pct: u32,
    /// Sum of every matching reduction, already capped.
    pub reduction_pct: u32,
}

impl PreDamageModifiers {
    /// Net percent applied to damage.
    pub fn net_pct(&self) -> u64 {
        (100 + self.bonus_pct as u64) * (100 - self.reduction_pct.min(100) as u64) / 100
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStartAction {
    Damage { pct: u32 },
    Heal { pct: u32 },
    Shield { amount: u32 },
}

fn matching(state: &BattleState, hook: Hook, side: Side) -> impl Iterator<Item = &FightEffectKind> {
    state
        .fight_effects
        .iter()
        .filter(move |effect| effect.hook == hook && effect.scope.includes(side))
        .map(|effect| &effect.kind)
}

/// Bonuses and reductions for an attack made by a unit on `attacker_side`.
pub fn pre_damage_modifiers(state: &BattleState, attacker_side: Side) -> PreDamageModifiers {
    let mut modifiers = PreDamageModifiers::default();
    let mut reduction = 0u32;
    for kind in matching(state, Hook::OnPreDamage, attacker_side) {
        match kind {
            FightEffectKind::DamageMultiplier { pct } => modifiers.bonus_pct += pct,
            FightEffectKind::DamageReduction { pct } => reduction += pct,
            _ => {}
        }
    }
    modifiers.reduction_pct = reduction.min(state.config.damage_reduction_cap_pct);
    modifiers
}

pub fn post_damage_lifesteal_pct(state: &BattleState, attacker_side: Side) -> u32 {
    matching(state, Hook::OnPostDamage, attacker_side)
        .map(|kind| match kind {
            FightEffectKind::Lifesteal { pct } => *pct,
            _ => 0,
        })
        .sum()
}

/// Probability-gated statuses applied to the target after a hit.
pub fn post_damage_statuses(state: &BattleState, attacker_side: Side) -> Vec<(u8, EffectApplication)> {
    matching(state, Hook::OnPostDamage, attacker_side)
        .filter_map(|kind| match kind {
            FightEffectKind::ChanceStatus { chance, effect } => Some((*chance, effect.clone())),
            _ => None,
        })
        .collect()
}

pub fn turn_start_actions(state: &BattleState, side: Side) -> Vec<TurnStartAction> {
    matching(state, Hook::OnTurnStart, side)
        .filter_map(|kind| match kind {
            FightEffectKind::PercentMaxHpDamage { pct } => Some(TurnStartAction::Damage { pct: *pct }),
            FightEffectKind::PercentMaxHpHeal { pct } => Some(TurnStartAction::Heal { pct: *pct }),
            FightEffectKind::Shield { amount } => Some(TurnStartAction::Shield { amount: *amount }),
            _ => None,
        })
        .collect()
}
