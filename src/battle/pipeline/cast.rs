//! Cast-time resolution. Everything here is rolled or read exactly once per
//! activation, before any target is touched, and then baked into the cast.

use crate::battle::effects::consume;
use crate::battle::resources::SpendOutcome;
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnRng};
use crate::combatant::UnitId;
use schema::{CoinBranch, DiceTier, EffectKind, ResourceTier, SkillDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceOutcome {
    pub total: u32,
    pub forced: bool,
    pub tier: Option<DiceTier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinOutcome {
    pub heads: bool,
    pub branch: CoinBranch,
}

/// The frozen result of cast resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastResolution {
    /// Added to the skill's damage multiplier and heal magnitude.
    pub extra_multiplier_pct: u32,
    pub tier: Option<ResourceTier>,
    pub dice: Option<DiceOutcome>,
    pub coin: Option<CoinOutcome>,
}

impl CastResolution {
    /// Effect magnitude override from the resource tier read at cast time.
    pub fn tier_value(&self) -> Option<u32> {
        self.tier.as_ref().and_then(|tier| tier.effect_value_pct)
    }
}

/// Resolves tier, drain scaling, volatility, dice and coin for one cast.
/// `loaded_holder` is the unit whose Loaded flag forces the maximum roll.
pub fn resolve_cast(
    state: &mut BattleState,
    caster: UnitId,
    skill: &SkillDescriptor,
    spend: &SpendOutcome,
    loaded_holder: Option<UnitId>,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> CastResolution {
    let mut cast = CastResolution {
        tier: skill.resource_tier(spend.pool_before).cloned(),
        ..CastResolution::default()
    };
    if let Some(tier) = &cast.tier {
        cast.extra_multiplier_pct += tier.bonus_multiplier_pct;
    }
    cast.extra_multiplier_pct += spend.drained * skill.drain_scaling_pct;

    // Volatility reads HP before this cast's own self damage is paid.
    if skill.volatility_pct > 0 {
        let missing = state.unit(caster).map(|u| u.missing_hp_pct()).unwrap_or(0);
        cast.extra_multiplier_pct += missing * skill.volatility_pct / 100;
    }

    if let Some(dice) = &skill.dice {
        let holder = loaded_holder.unwrap_or(caster);
        let forced = consume(state, holder, EffectKind::Loaded).is_some();
        if forced {
            bus.push(BattleEvent::EffectRemoved {
                target: holder,
                kind: EffectKind::Loaded,
            });
        }
        let total = if forced {
            dice.max_roll()
        } else {
            (0..dice.count.max(1))
                .map(|_| rng.roll_die(dice.sides, "Dice Roll"))
                .sum()
        };
        bus.push(BattleEvent::DiceRolled {
            unit: caster,
            total,
            forced,
        });
        cast.dice = Some(DiceOutcome {
            total,
            forced,
            tier: dice.tier_for(total).cloned(),
        });
    }

    if let Some(coin) = &skill.coin_flip {
        let heads = rng.coin_flip("Coin Flip");
        bus.push(BattleEvent::CoinFlipped { unit: caster, heads });
        cast.coin = Some(CoinOutcome {
            heads,
            branch: if heads { coin.heads.clone() } else { coin.tails.clone() },
        });
    }

    tracing::debug!(caster, skill = %skill.name, extra = cast.extra_multiplier_pct, "cast resolved");
    cast
}
