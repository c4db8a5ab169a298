// --- IMPORTS ---
use crate::battle::state::{BattleEvent, BattleState, EventBus};
use crate::combatant::UnitId;
use schema::{
    EffectApplication, EffectKind, Periodic, Polarity, Stacking, StatType, StatusDefinition,
};
use serde::{Deserialize, Serialize};

// --- DATA STRUCTURES ---

/// Who applied an effect, relative to its holder. Refresh-stacked effects
/// only merge with an instance of the same kind and the same origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    SelfApplied,
    Ally,
    Enemy,
    Environment,
}

/// Kind-specific data carried next to the shared envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectPayload {
    None,
    Stat { stat: StatType },
    Periodic { per_tick: u32, heal: bool },
    DeathPrevention { heal: u32, transfer_pct: u32 },
    Reflect { cap_pct: u32 },
    Thorns { damage: u32 },
    StoredDamage { banked: u32 },
    Shield { remaining: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub polarity: Polarity,
    pub duration: u8,
    pub value: u32,
    pub stacks: u8,
    pub source: Option<UnitId>,
    pub origin: Origin,
    pub payload: EffectPayload,
}

impl StatusEffect {
    /// A payload-free effect using the standard definition's polarity.
    pub fn flag(kind: EffectKind, duration: u8, source: Option<UnitId>, origin: Origin) -> Self {
        Self {
            kind,
            polarity: StatusDefinition::standard(kind).polarity,
            duration,
            value: 0,
            stacks: 1,
            source,
            origin,
            payload: EffectPayload::None,
        }
    }

    pub fn is_debuff(&self) -> bool {
        self.polarity == Polarity::Debuff
    }

    /// Signed percent this effect adds to `stat`.
    pub fn stat_pct(&self, stat: StatType) -> i64 {
        match self.payload {
            EffectPayload::Stat { stat: affected } if affected == stat => {
                let sign = match self.polarity {
                    Polarity::Buff => 1,
                    Polarity::Debuff => -1,
                };
                sign * self.value as i64 * self.stacks.max(1) as i64
            }
            _ => 0,
        }
    }
}

/// A request to put an effect on a unit, with magnitudes already baked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectParams {
    pub kind: EffectKind,
    pub duration: u8,
    pub value: u32,
    pub stacks: u8,
    pub source: Option<UnitId>,
    pub payload: EffectPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stacked { stacks: u8 },
    Refreshed,
    Blocked,
}

impl ApplyOutcome {
    pub fn landed(&self) -> bool {
        !matches!(self, ApplyOutcome::Blocked)
    }
}

/// One periodic tick due at the end of a unit's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTick {
    pub kind: EffectKind,
    pub amount: u32,
    pub heal: bool,
    pub source: Option<UnitId>,
}

// --- PARAMETER BAKING ---

/// Turn a declarative application into concrete parameters. Magnitudes that
/// depend on the caster are frozen here, at application time.
pub fn bake_application(
    definition: &StatusDefinition,
    application: &EffectApplication,
    value_pct: u32,
    source: Option<UnitId>,
    caster_attack: u32,
) -> EffectParams {
    let of_attack = |pct: u32| ((caster_attack as u64 * pct as u64) / 100) as u32;

    let payload = match (definition.stat, definition.periodic, application.kind) {
        (Some(stat), _, _) => EffectPayload::Stat { stat },
        (_, Some(periodic), _) => EffectPayload::Periodic {
            per_tick: of_attack(value_pct).max(1),
            heal: periodic == Periodic::Heal,
        },
        (_, _, EffectKind::DeathPrevention) => EffectPayload::DeathPrevention {
            heal: of_attack(value_pct),
            transfer_pct: application.transfer_pct,
        },
        (_, _, EffectKind::Reflect) => EffectPayload::Reflect {
            cap_pct: application.cap_pct,
        },
        (_, _, EffectKind::Thorns) => EffectPayload::Thorns {
            damage: of_attack(value_pct).max(1),
        },
        (_, _, EffectKind::StoredDamage) => EffectPayload::StoredDamage { banked: 0 },
        (_, _, EffectKind::Shield) => EffectPayload::Shield {
            remaining: of_attack(value_pct),
        },
        _ => EffectPayload::None,
    };

    EffectParams {
        kind: application.kind,
        duration: application.duration,
        value: value_pct,
        stacks: application.stacks.max(1),
        source,
        payload,
    }
}

fn origin_of(state: &BattleState, holder: UnitId, source: Option<UnitId>) -> Origin {
    match source {
        None => Origin::Environment,
        Some(source) if source == holder => Origin::SelfApplied,
        Some(source) => match (state.unit(source), state.unit(holder)) {
            (Some(a), Some(b)) if a.side == b.side => Origin::Ally,
            _ => Origin::Enemy,
        },
    }
}

fn merge_payload(existing: EffectPayload, incoming: EffectPayload) -> EffectPayload {
    use EffectPayload::*;
    match (existing, incoming) {
        (Periodic { per_tick: a, heal }, Periodic { per_tick: b, .. }) => Periodic {
            per_tick: a.max(b),
            heal,
        },
        (
            DeathPrevention { heal: a, transfer_pct: ta },
            DeathPrevention { heal: b, transfer_pct: tb },
        ) => DeathPrevention {
            heal: a.max(b),
            transfer_pct: ta.max(tb),
        },
        (Reflect { cap_pct: a }, Reflect { cap_pct: b }) => Reflect { cap_pct: a.max(b) },
        (Thorns { damage: a }, Thorns { damage: b }) => Thorns { damage: a.max(b) },
        (Shield { remaining: a }, Shield { remaining: b }) => Shield {
            remaining: a.max(b),
        },
        (StoredDamage { banked }, StoredDamage { .. }) => StoredDamage { banked },
        (_, incoming) => incoming,
    }
}

// --- PUBLIC API ---

/// Apply an effect to `target`, honoring immunity and the definition's
/// stacking discipline. Dead targets and unknown kinds are a no-op.
pub fn apply_effect(
    state: &mut BattleState,
    target: UnitId,
    params: EffectParams,
    bus: &mut EventBus,
) -> ApplyOutcome {
    let Some(definition) = state.content.status(params.kind).cloned() else {
        tracing::warn!(kind = %params.kind, "no status definition; skipping application");
        return ApplyOutcome::Blocked;
    };
    let origin = origin_of(state, target, params.source);

    let Some(unit) = state.unit_mut(target) else {
        return ApplyOutcome::Blocked;
    };
    if !unit.is_alive() {
        return ApplyOutcome::Blocked;
    }
    if definition.is_debuff() && unit.has_effect(EffectKind::DebuffImmunity) {
        bus.push(BattleEvent::EffectBlocked {
            target,
            kind: params.kind,
        });
        return ApplyOutcome::Blocked;
    }

    let fresh = StatusEffect {
        kind: params.kind,
        polarity: definition.polarity,
        duration: params.duration,
        value: params.value,
        stacks: params.stacks.max(1),
        source: params.source,
        origin,
        payload: params.payload,
    };

    let outcome = match definition.stacking {
        Stacking::CounterStack { max_stacks } => {
            let cap = max_stacks.max(1);
            match unit.effects.iter_mut().find(|e| e.kind == params.kind) {
                Some(existing) => {
                    existing.stacks = existing.stacks.saturating_add(fresh.stacks).min(cap);
                    existing.duration = existing.duration.max(fresh.duration);
                    existing.value = existing.value.max(fresh.value);
                    ApplyOutcome::Stacked {
                        stacks: existing.stacks,
                    }
                }
                None => {
                    let stacks = fresh.stacks.min(cap);
                    unit.effects.push(StatusEffect { stacks, ..fresh });
                    ApplyOutcome::Stacked { stacks }
                }
            }
        }
        Stacking::MultiInstance => {
            unit.effects.push(fresh);
            ApplyOutcome::Applied
        }
        Stacking::Refresh => {
            match unit
                .effects
                .iter_mut()
                .find(|e| e.kind == params.kind && e.origin == origin)
            {
                Some(existing) => {
                    existing.duration = existing.duration.max(fresh.duration);
                    existing.value = existing.value.max(fresh.value);
                    existing.payload = merge_payload(existing.payload, fresh.payload);
                    existing.source = fresh.source.or(existing.source);
                    ApplyOutcome::Refreshed
                }
                None => {
                    unit.effects.push(fresh);
                    ApplyOutcome::Applied
                }
            }
        }
    };

    let stacks = unit.stacks_of(params.kind) as u8;
    let duration = unit
        .effects
        .iter()
        .filter(|e| e.kind == params.kind)
        .map(|e| e.duration)
        .max()
        .unwrap_or(params.duration);

    // Focus reacts to what lands on its holder.
    let focus_change = match (definition.polarity, origin) {
        (Polarity::Buff, Origin::Ally) => unit.resource.grant_focus().then_some(true),
        (Polarity::Debuff, _) => unit.resource.break_focus().then_some(false),
        _ => None,
    };

    bus.push(BattleEvent::EffectApplied {
        target,
        kind: params.kind,
        stacks,
        duration,
    });
    match focus_change {
        Some(true) => bus.push(BattleEvent::FocusGained { unit: target }),
        Some(false) => bus.push(BattleEvent::FocusLost { unit: target }),
        None => {}
    }
    outcome
}

/// Apply a declarative application from `source`, rolling its chance.
/// `value_override` replaces the authored magnitude (resource tiers, dice).
pub fn apply_application(
    state: &mut BattleState,
    target: UnitId,
    application: &EffectApplication,
    source: Option<UnitId>,
    value_override: Option<u32>,
    rng: &mut crate::battle::state::TurnRng,
    bus: &mut EventBus,
) -> ApplyOutcome {
    if application.chance < 100 && rng.next_outcome("Status Application Chance") > application.chance {
        return ApplyOutcome::Blocked;
    }
    let Some(definition) = state.content.status(application.kind).cloned() else {
        tracing::warn!(kind = %application.kind, "no status definition; skipping application");
        return ApplyOutcome::Blocked;
    };
    let caster_attack = source
        .map(|id| crate::battle::stats::effective_attack(state, id))
        .unwrap_or(0);
    let value = value_override.unwrap_or(application.value_pct);
    let params = bake_application(&definition, application, value, source, caster_attack);
    apply_effect(state, target, params, bus)
}

/// Periodic ticks due for `unit`, in list order.
pub fn periodic_ticks(state: &BattleState, unit: UnitId) -> Vec<PeriodicTick> {
    let Some(holder) = state.unit(unit) else {
        return Vec::new();
    };
    holder
        .effects
        .iter()
        .filter_map(|effect| match effect.payload {
            EffectPayload::Periodic { per_tick, heal } => Some(PeriodicTick {
                kind: effect.kind,
                amount: per_tick.saturating_mul(effect.stacks.max(1) as u32),
                heal,
                source: effect.source,
            }),
            _ => None,
        })
        .collect()
}

/// Decrement every duration on `unit` by one and remove what expired.
/// Returns the expired effects so the caller can run expiry hooks.
pub fn decrement_durations(
    state: &mut BattleState,
    unit: UnitId,
    bus: &mut EventBus,
) -> Vec<StatusEffect> {
    let Some(holder) = state.unit_mut(unit) else {
        return Vec::new();
    };
    for effect in holder.effects.iter_mut() {
        effect.duration = effect.duration.saturating_sub(1);
    }
    let (expired, kept): (Vec<_>, Vec<_>) =
        holder.effects.drain(..).partition(|effect| effect.duration == 0);
    holder.effects = kept;

    for effect in &expired {
        bus.push(BattleEvent::EffectExpired {
            target: unit,
            kind: effect.kind,
        });
    }
    expired
}

/// Remove every effect of the given polarity. Returns how many were removed.
pub fn dispel(state: &mut BattleState, unit: UnitId, polarity: Polarity, bus: &mut EventBus) -> usize {
    let Some(holder) = state.unit_mut(unit) else {
        return 0;
    };
    let before = holder.effects.len();
    let mut removed = Vec::new();
    holder.effects.retain(|effect| {
        if effect.polarity == polarity {
            removed.push(effect.kind);
            false
        } else {
            true
        }
    });
    for kind in removed {
        bus.push(BattleEvent::EffectRemoved { target: unit, kind });
    }
    before - holder.effects.len()
}

/// Remove and return the first instance of `kind` on `unit`.
pub fn consume(state: &mut BattleState, unit: UnitId, kind: EffectKind) -> Option<StatusEffect> {
    let holder = state.unit_mut(unit)?;
    let index = holder.effects.iter().position(|effect| effect.kind == kind)?;
    Some(holder.effects.remove(index))
}

pub fn clear_all(state: &mut BattleState, unit: UnitId) {
    if let Some(holder) = state.unit_mut(unit) {
        holder.effects.clear();
    }
}
