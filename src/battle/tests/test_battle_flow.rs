#[cfg(test)]
mod tests {
    use crate::battle::effects::{EffectPayload, Origin, StatusEffect};
    use crate::battle::runner::BattleRunner;
    use crate::battle::state::{BattleEvent, GameState, Outcome, SkipReason};
    use crate::battle::tests::common::{assert_ok, create_test_battle, predictable_rng, TestUnitBuilder};
    use crate::content::ContentLibrary;
    use pretty_assertions::assert_eq;
    use schema::{BaseStats, EffectKind, Side, SkillDescriptor, SkillTarget, SummonSpec, UnitTemplate, BASIC_ATTACK};
    use std::sync::Arc;

    fn runner(heroes: Vec<TestUnitBuilder>, enemies: Vec<TestUnitBuilder>) -> BattleRunner {
        let (battle_state, _) = create_test_battle(heroes, enemies);
        BattleRunner::from_state(battle_state, predictable_rng())
    }

    #[test]
    fn test_basic_attack_hits_for_66_and_wins() {
        let mut runner = runner(
            vec![TestUnitBuilder::new("Champion", Side::Heroes).with_stats(100, 100, 0, 20)],
            vec![TestUnitBuilder::new("Sentry", Side::Enemies).with_stats(66, 10, 50, 10)],
        );

        assert_eq!(runner.advance(), &GameState::AwaitingAction { unit: 0 });
        assert_eq!(
            assert_ok(runner.select_skill(BASIC_ATTACK)),
            &GameState::AwaitingTarget {
                unit: 0,
                skill: BASIC_ATTACK.to_string()
            }
        );
        assert_eq!(assert_ok(runner.select_target(1)), &GameState::Victory);

        assert!(runner.events().contains(&BattleEvent::DamageDealt {
            source: Some(0),
            target: 1,
            amount: 66,
            remaining_hp: 0,
        }));
        assert!(runner.events().contains(&BattleEvent::BattleEnded {
            outcome: Outcome::Victory
        }));
        assert_eq!(runner.outcome(), Some(Outcome::Victory));
        assert!(runner.select_skill(BASIC_ATTACK).is_err());
    }

    #[test]
    fn test_haste_holders_open_the_round() {
        let mut runner = {
            let (mut battle_state, _) = create_test_battle(
                vec![
                    TestUnitBuilder::new("Slowpoke", Side::Heroes).with_stats(100, 50, 20, 5),
                    TestUnitBuilder::new("Sprinter", Side::Heroes).with_stats(100, 50, 20, 30),
                ],
                vec![TestUnitBuilder::new("Harrier", Side::Enemies).with_stats(300, 50, 20, 20)],
            );
            for id in [0, 2] {
                battle_state.units[id]
                    .effects
                    .push(StatusEffect::flag(EffectKind::Haste, 3, Some(id), Origin::SelfApplied));
            }
            BattleRunner::from_state(battle_state, predictable_rng())
        };

        // Haste holders first, faster first among them; the raw-speed leader goes last.
        assert_eq!(runner.advance(), &GameState::AwaitingAction { unit: 0 });
        let first_actor = runner.events().iter().find_map(|e| match e {
            BattleEvent::SkillUsed { unit, .. } => Some(*unit),
            _ => None,
        });
        assert_eq!(first_actor, Some(2));
        assert_eq!(runner.battle_info().pending_turns, vec![1]);
    }

    #[test]
    fn test_stunned_hero_loses_the_turn_and_recovers() {
        let mut runner = {
            let (mut battle_state, _) = create_test_battle(
                vec![TestUnitBuilder::new("Dazed", Side::Heroes).with_stats(100, 50, 20, 30)],
                vec![TestUnitBuilder::new("Jailer", Side::Enemies).with_stats(300, 20, 20, 10)],
            );
            battle_state.units[0]
                .effects
                .push(StatusEffect::flag(EffectKind::Stun, 1, Some(1), Origin::Enemy));
            BattleRunner::from_state(battle_state, predictable_rng())
        };

        assert_eq!(runner.advance(), &GameState::AwaitingAction { unit: 0 });
        assert_eq!(runner.state().round, 2);
        assert!(runner.events().contains(&BattleEvent::TurnSkipped {
            unit: 0,
            reason: SkipReason::Stunned
        }));
        assert!(!runner.state().units[0].has_effect(EffectKind::Stun));
    }

    #[test]
    fn test_death_prevention_saves_once_then_the_hero_falls() {
        let mut runner = {
            let (mut battle_state, _) = create_test_battle(
                vec![TestUnitBuilder::new("Martyr", Side::Heroes).with_stats(100, 50, 0, 10)],
                vec![TestUnitBuilder::new("Brute", Side::Enemies).with_stats(500, 200, 20, 30)],
            );
            battle_state.units[0].effects.push(StatusEffect {
                payload: EffectPayload::DeathPrevention {
                    heal: 20,
                    transfer_pct: 0,
                },
                ..StatusEffect::flag(EffectKind::DeathPrevention, 5, Some(0), Origin::SelfApplied)
            });
            BattleRunner::from_state(battle_state, predictable_rng())
        };

        assert_eq!(runner.advance(), &GameState::AwaitingAction { unit: 0 });
        assert_eq!(runner.state().units[0].hp, 21);
        assert!(runner
            .events()
            .contains(&BattleEvent::DeathPrevented { unit: 0, healed: 20 }));

        assert_ok(runner.select_skill(BASIC_ATTACK));
        assert_eq!(assert_ok(runner.select_target(1)), &GameState::Defeat);
        assert_eq!(runner.state().units[0].hp, 0);
        let defeats = runner
            .events()
            .iter()
            .filter(|e| matches!(e, BattleEvent::UnitDefeated { unit: 0 }))
            .count();
        assert_eq!(defeats, 1);
    }

    #[test]
    fn test_summoned_units_wait_for_the_next_round() {
        let mut call = SkillDescriptor::new("Call Wisp", SkillTarget::SelfOnly);
        call.summon = Some(SummonSpec {
            template_id: "wisp".to_string(),
            count: 1,
            fallback_skill: None,
        });
        let (mut battle_state, _) = create_test_battle(
            vec![TestUnitBuilder::new("Conjurer", Side::Heroes)
                .with_stats(100, 50, 20, 30)
                .with_skill(call)],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies).with_stats(300, 50, 20, 10)],
        );
        let mut content = ContentLibrary::new();
        content.insert_unit(UnitTemplate {
            id: "wisp".to_string(),
            name: "Wisp".to_string(),
            class_id: "spirit".to_string(),
            base_stats: BaseStats::new(200, 10, 0, 20),
            skills: vec![],
            passives: vec![],
            leader_skill: None,
            finale: None,
            role_override: None,
        });
        battle_state.content = Arc::new(content);
        let mut runner = BattleRunner::from_state(battle_state, predictable_rng());

        assert_eq!(runner.advance(), &GameState::AwaitingAction { unit: 0 });
        assert_eq!(assert_ok(runner.select_skill("Call Wisp")), &GameState::AwaitingAction { unit: 0 });

        assert_eq!(runner.state().round, 2);
        assert!(runner.state().units[2].summoned);
        assert_eq!(runner.battle_info().pending_turns, vec![2, 1]);

        assert!(runner.events().contains(&BattleEvent::RoundStarted { round: 2 }));
        assert!(!runner.events().contains(&BattleEvent::TurnStarted { unit: 2 }));
    }
}
