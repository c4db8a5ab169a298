use crate::battle::effects::EffectPayload;
use crate::battle::fight_effects::pre_damage_modifiers;
use crate::battle::leader::rearm_thresholds;
use crate::battle::state::{BattleEvent, BattleState, EventBus, VisualKind};
use crate::battle::stats::{effective_attack, effective_defense};
use crate::combatant::UnitId;
use schema::{ConditionalBonus, EffectKind};

/// One whole multiplier, in basis points.
pub const FULL_MULTIPLIER: u64 = 10_000;

/// `floor(attack * multiplier * 100 / (100 + defense))`, never below 1.
/// `multiplier_bp` is in basis points, so 10_000 is a multiplier of 1.0.
pub fn base_damage(attack: u32, multiplier_bp: u64, defense: u32) -> u32 {
    let numerator = attack as u64 * multiplier_bp;
    let denominator = (100 + defense as u64) * 100;
    ((numerator / denominator).min(u32::MAX as u64) as u32).max(1)
}

/// Split `total` over `hits` so the parts always sum back to `total`.
pub fn split_hits(total: u32, hits: u8) -> Vec<u32> {
    let hits = hits.max(1) as u32;
    let share = total / hits;
    let remainder = total % hits;
    (0..hits)
        .map(|i| share + u32::from(i < remainder))
        .collect()
}

/// Everything a damage computation needs besides the two units.
#[derive(Debug, Clone, Copy)]
pub struct DamageRequest<'a> {
    pub multiplier_pct: u32,
    pub hits: u8,
    pub ignore_def_pct: u32,
    pub bonuses: &'a [ConditionalBonus],
    /// Cast-time additions (resource tier, drain scaling, volatility), added to the multiplier.
    pub extra_multiplier_pct: u32,
    /// Reduced-damage targets such as splash; 100 for a full hit.
    pub scale_pct: u32,
}

impl<'a> DamageRequest<'a> {
    pub fn simple(multiplier_pct: u32) -> Self {
        Self {
            multiplier_pct,
            hits: 1,
            ignore_def_pct: 0,
            bonuses: &[],
            extra_multiplier_pct: 0,
            scale_pct: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageBreakdown {
    pub attack: u32,
    pub defense: u32,
    pub multiplier_bp: u64,
    pub total: u32,
    pub hits: Vec<u32>,
}

fn scale(value: u64, pct: u64) -> u64 {
    value * pct / 100
}

/// Runs the modifier pipeline and the damage formula for one attacker/target pair.
pub fn calculate_damage(
    state: &BattleState,
    attacker: UnitId,
    target: UnitId,
    request: DamageRequest<'_>,
) -> DamageBreakdown {
    let attack = effective_attack(state, attacker);
    let raw_defense = effective_defense(state, target);
    let (Some(attacker_unit), Some(target_unit)) = (state.unit(attacker), state.unit(target)) else {
        return DamageBreakdown {
            attack,
            defense: raw_defense,
            multiplier_bp: 0,
            total: 0,
            hits: Vec::new(),
        };
    };

    // Conditional tables: the highest matching override wins, ignore-DEF adds up.
    let matching: Vec<&ConditionalBonus> = request
        .bonuses
        .iter()
        .filter(|bonus| target_unit.has_effect(bonus.if_target_has))
        .collect();
    let base_pct = matching
        .iter()
        .filter_map(|bonus| bonus.multiplier_pct)
        .max()
        .unwrap_or(request.multiplier_pct);
    let ignore_def_pct = (request.ignore_def_pct
        + matching.iter().map(|b| b.extra_ignore_def_pct).sum::<u32>())
    .min(100);

    let mut multiplier_bp = (base_pct + request.extra_multiplier_pct) as u64 * 100;
    multiplier_bp = scale(multiplier_bp, request.scale_pct as u64);

    let globals = pre_damage_modifiers(state, attacker_unit.side);
    multiplier_bp = scale(multiplier_bp, globals.net_pct());

    let config = &state.config;
    if let Some(marked) = target_unit.effect(EffectKind::Marked) {
        let bonus = if marked.value > 0 { marked.value } else { config.marked_bonus_pct };
        multiplier_bp = scale(multiplier_bp, 100 + bonus as u64);
    }
    if let Some(vicious) = attacker_unit.effect(EffectKind::Vicious) {
        if target_unit.has_any_debuff() {
            let bonus = if vicious.value > 0 { vicious.value } else { config.vicious_bonus_pct };
            multiplier_bp = scale(multiplier_bp, 100 + bonus as u64);
        }
    }
    if let Some(empowered) = attacker_unit.effect(EffectKind::Empowered) {
        multiplier_bp = scale(multiplier_bp, 100 + empowered.value as u64);
    }

    let defense = (raw_defense as u64 * (100 - ignore_def_pct) as u64 / 100) as u32;
    let total = base_damage(attack, multiplier_bp, defense);

    DamageBreakdown {
        attack,
        defense,
        multiplier_bp,
        total,
        hits: split_hits(total, request.hits),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageReport {
    pub absorbed: u32,
    pub dealt: u32,
    pub prevented_death: bool,
    pub killed: bool,
}

impl DamageReport {
    pub fn inflicted(&self) -> u32 {
        self.absorbed + self.dealt
    }
}

/// Applies raw damage to one unit: shield first, then HP with death
/// prevention. Also banks stored damage and feeds damage-taken resources.
/// Death consequences are left to the caller.
pub fn apply_damage(
    state: &mut BattleState,
    target: UnitId,
    amount: u32,
    source: Option<UnitId>,
    bus: &mut EventBus,
) -> DamageReport {
    let mut report = DamageReport::default();
    let Some(unit) = state.unit_mut(target) else {
        return report;
    };
    if !unit.is_alive() || amount == 0 {
        return report;
    }

    let mut remaining = amount;
    if let Some(shield) = unit
        .effects
        .iter_mut()
        .find(|e| matches!(e.payload, EffectPayload::Shield { .. }))
    {
        if let EffectPayload::Shield { remaining: capacity } = &mut shield.payload {
            let absorbed = remaining.min(*capacity);
            *capacity -= absorbed;
            remaining -= absorbed;
            report.absorbed = absorbed;
        }
    }
    unit.effects
        .retain(|e| !matches!(e.payload, EffectPayload::Shield { remaining: 0 }));
    if report.absorbed > 0 {
        bus.push(BattleEvent::ShieldAbsorbed {
            target,
            amount: report.absorbed,
        });
        bus.visual(target, VisualKind::Shield, report.absorbed);
    }
    if remaining == 0 {
        return report;
    }

    let mut transfer: Option<(UnitId, u32)> = None;
    let prevention_index = unit
        .effects
        .iter()
        .position(|e| matches!(e.payload, EffectPayload::DeathPrevention { .. }));
    match prevention_index {
        Some(index) if remaining >= unit.hp => {
            let effect = unit.effects.remove(index);
            report.dealt = unit.hp - 1;
            unit.hp = 1;
            report.prevented_death = true;
            if let EffectPayload::DeathPrevention { heal, transfer_pct } = effect.payload {
                let healed = unit.restore_hp(heal);
                bus.push(BattleEvent::DeathPrevented {
                    unit: target,
                    healed,
                });
                if let Some(origin) = effect.source.filter(|&s| s != target) {
                    let moved = (remaining as u64 * transfer_pct as u64 / 100) as u32;
                    if moved > 0 {
                        transfer = Some((origin, moved));
                    }
                }
            }
        }
        _ => {
            report.dealt = unit.lose_hp(remaining);
        }
    }

    if report.dealt > 0 {
        unit.flags.harmed_this_round = true;
        if let Some(stored) = unit
            .effects
            .iter_mut()
            .find(|e| matches!(e.payload, EffectPayload::StoredDamage { .. }))
        {
            let add = (report.dealt as u64 * stored.value as u64 / 100) as u32;
            if let EffectPayload::StoredDamage { banked } = &mut stored.payload {
                *banked = banked.saturating_add(add);
            }
        }
        let focus_broken = unit.resource.break_focus();
        let gained = unit.resource.on_damage_taken();
        let pool = unit.resource.current;
        report.killed = !unit.is_alive();
        let remaining_hp = unit.hp;

        bus.push(BattleEvent::DamageDealt {
            source,
            target,
            amount: report.dealt,
            remaining_hp,
        });
        bus.visual(target, VisualKind::Hit, report.dealt);
        if focus_broken {
            bus.push(BattleEvent::FocusLost { unit: target });
        }
        if gained > 0 {
            bus.push(BattleEvent::ResourceChanged {
                unit: target,
                value: pool,
            });
        }
    }

    if let Some((origin, moved)) = transfer {
        apply_damage(state, origin, moved, Some(target), bus);
    }
    report
}

/// Heals `target` by up to `amount`. Returns the HP actually restored.
pub fn apply_heal(state: &mut BattleState, target: UnitId, amount: u32, bus: &mut EventBus) -> u32 {
    let Some(unit) = state.unit_mut(target) else {
        return 0;
    };
    let healed = unit.restore_hp(amount);
    if healed > 0 {
        let new_hp = unit.hp;
        bus.push(BattleEvent::Healed {
            target,
            amount: healed,
            new_hp,
        });
        bus.visual(target, VisualKind::Heal, healed);
        rearm_thresholds(state, target);
    }
    healed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitReport {
    pub to_target: DamageReport,
    pub redirected: u32,
    /// The guardian that took the redirected share, and the HP it lost.
    pub guardian: Option<(UnitId, u32)>,
    pub reflected: u32,
    pub thorns: u32,
}

impl HitReport {
    /// Damage that landed on the target or its guardian.
    pub fn inflicted(&self) -> u32 {
        self.to_target.inflicted() + self.redirected
    }
}

/// Delivers one hit from `attacker`: guardian redirect, then the target,
/// then reflect and thorns back at the attacker.
pub fn resolve_hit(
    state: &mut BattleState,
    attacker: UnitId,
    target: UnitId,
    amount: u32,
    bus: &mut EventBus,
) -> HitReport {
    let mut report = HitReport::default();
    let mut to_target = amount;

    let guardian = state.unit(target).and_then(|unit| {
        unit.effects
            .iter()
            .find(|e| e.kind == EffectKind::Guardian)
            .and_then(|e| e.source.map(|g| (g, e.value)))
    });
    if let Some((guardian, pct)) = guardian {
        if guardian != target && state.is_alive(guardian) {
            let redirected = (amount as u64 * pct.min(100) as u64 / 100) as u32;
            if redirected > 0 {
                to_target -= redirected;
                bus.push(BattleEvent::Redirected {
                    guardian,
                    protected: target,
                    amount: redirected,
                });
                let taken = apply_damage(state, guardian, redirected, Some(attacker), bus);
                report.redirected = taken.inflicted();
                report.guardian = Some((guardian, taken.dealt));
            }
        }
    }

    report.to_target = apply_damage(state, target, to_target, Some(attacker), bus);
    let landed = report.to_target.inflicted();

    let (reflect, thorns) = match state.unit(target) {
        Some(unit) => (
            unit.effects
                .iter()
                .find(|e| e.kind == EffectKind::Reflect)
                .map(|e| {
                    let cap_pct = match e.payload {
                        EffectPayload::Reflect { cap_pct } => cap_pct,
                        _ => 0,
                    };
                    (e.value, cap_pct, unit.max_hp)
                }),
            unit.effects.iter().find_map(|e| match e.payload {
                EffectPayload::Thorns { damage } => Some(damage),
                _ => None,
            }),
        ),
        None => (None, None),
    };

    if let Some((pct, cap_pct, max_hp)) = reflect {
        let mut reflected = (landed as u64 * pct as u64 / 100) as u32;
        if cap_pct > 0 {
            reflected = reflected.min((max_hp as u64 * cap_pct as u64 / 100) as u32);
        }
        if reflected > 0 && attacker != target {
            bus.push(BattleEvent::Reflected {
                from: target,
                to: attacker,
                amount: reflected,
            });
            report.reflected = apply_damage(state, attacker, reflected, Some(target), bus).dealt;
        }
    }
    if let Some(damage) = thorns {
        if landed > 0 && attacker != target {
            report.thorns = apply_damage(state, attacker, damage, Some(target), bus).dealt;
        }
    }
    report
}
