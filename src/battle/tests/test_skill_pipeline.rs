#[cfg(test)]
mod tests {
    use crate::battle::effects::{EffectPayload, Origin, StatusEffect};
    use crate::battle::pipeline::{resolve_skill, SKILL_STAGES};
    use crate::battle::state::{BattleEvent, TurnRng};
    use crate::battle::tests::common::{assert_ok, create_test_battle, predictable_rng, TestUnitBuilder};
    use crate::errors::{ActionError, BattleEngineError};
    use pretty_assertions::assert_eq;
    use schema::{
        CoinBranch, CoinFlipSpec, DamageSpec, DiceSpec, DiceTier, EffectApplication, EffectKind,
        EffectTarget, OnKillHook, ResourceArchetype, ResourceRules, Side, SkillDescriptor,
        SkillTarget, SummonSpec, BASIC_ATTACK,
    };

    fn lucky_mend() -> SkillDescriptor {
        let mut skill = SkillDescriptor::new("Lucky Mend", SkillTarget::SingleAlly);
        skill.dice = Some(DiceSpec {
            count: 1,
            sides: 6,
            tiers: vec![
                DiceTier { min: 1, max: 2, heal_atk_pct: 50, effects: vec![] },
                DiceTier { min: 3, max: 4, heal_atk_pct: 100, effects: vec![] },
                DiceTier {
                    min: 5,
                    max: 6,
                    heal_atk_pct: 150,
                    effects: vec![EffectApplication::new(EffectKind::Regen, 2).value(20)],
                },
            ],
        });
        skill
    }

    fn strike(name: &str, multiplier_pct: u32) -> SkillDescriptor {
        let mut skill = SkillDescriptor::new(name, SkillTarget::SingleEnemy);
        skill.damage = Some(DamageSpec::single(multiplier_pct));
        skill
    }

    fn healer_and_patient() -> Vec<TestUnitBuilder> {
        vec![
            TestUnitBuilder::new("Cleric", Side::Heroes)
                .with_stats(100, 100, 20, 10)
                .with_skill(lucky_mend()),
            TestUnitBuilder::new("Patient", Side::Heroes).with_hp(10),
        ]
    }

    #[test]
    fn test_basic_attack_runs_every_stage_in_order() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Knight", Side::Heroes)],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies)],
        );
        let mut rng = predictable_rng();

        let report = assert_ok(resolve_skill(&mut battle_state, 0, BASIC_ATTACK, Some(1), &mut rng, &mut bus));

        bus.print_debug_with_message("Events for test_basic_attack_runs_every_stage_in_order:");
        assert_eq!(report.stages, SKILL_STAGES.to_vec());
        assert_eq!(report.targets, vec![1]);
        // 50 ATK against 20 DEF
        assert_eq!(report.damage_dealt, 41);
        assert_eq!(battle_state.units[1].hp, 59);
        assert!(matches!(bus.events()[0], BattleEvent::SkillUsed { unit: 0, .. }));
    }

    #[test]
    fn test_rejected_selection_changes_nothing() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Knight", Side::Heroes)],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies)],
        );
        let mut rng = predictable_rng();
        let before = battle_state.units.clone();

        let unknown = resolve_skill(&mut battle_state, 0, "Meteor", Some(1), &mut rng, &mut bus);
        assert_eq!(
            unknown,
            Err(BattleEngineError::Action(ActionError::UnknownSkill("Meteor".to_string())))
        );

        let wrong_side = resolve_skill(&mut battle_state, 0, BASIC_ATTACK, Some(0), &mut rng, &mut bus);
        assert!(matches!(
            wrong_side,
            Err(BattleEngineError::Action(ActionError::InvalidTarget(_)))
        ));

        battle_state.units[0]
            .effects
            .push(StatusEffect::flag(EffectKind::Seated, 2, Some(1), Origin::Enemy));
        battle_state.units[0].skills.push(strike("Lunge", 150));
        let seated = resolve_skill(&mut battle_state, 0, "Lunge", Some(1), &mut rng, &mut bus);
        assert!(matches!(
            seated,
            Err(BattleEngineError::Action(ActionError::SkillUnavailable(_)))
        ));

        assert!(bus.is_empty());
        assert_eq!(battle_state.units[1], before[1]);
    }

    #[test]
    fn test_dice_heal_low_roll_uses_lowest_tier() {
        let (mut battle_state, mut bus) =
            create_test_battle(healer_and_patient(), vec![TestUnitBuilder::new("Goblin", Side::Enemies)]);
        let mut rng = TurnRng::new_for_test(vec![2]);

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Lucky Mend", Some(1), &mut rng, &mut bus));

        // Roll of 2 lands in the 50% tier: 100 ATK * 50%
        assert_eq!(report.healed, 50);
        assert_eq!(battle_state.units[1].hp, 60);
        assert!(!battle_state.units[1].has_effect(EffectKind::Regen));
        assert!(bus.events().contains(&BattleEvent::DiceRolled {
            unit: 0,
            total: 2,
            forced: false
        }));
    }

    #[test]
    fn test_dice_heal_top_tier_adds_regen() {
        let (mut battle_state, mut bus) =
            create_test_battle(healer_and_patient(), vec![TestUnitBuilder::new("Goblin", Side::Enemies)]);
        let mut rng = TurnRng::new_for_test(vec![6]);

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Lucky Mend", Some(1), &mut rng, &mut bus));

        assert_eq!(report.healed, 90);
        assert_eq!(battle_state.units[1].hp, 100);
        assert!(battle_state.units[1].has_effect(EffectKind::Regen));
    }

    #[test]
    fn test_loaded_target_forces_max_roll_and_is_consumed() {
        let (mut battle_state, mut bus) =
            create_test_battle(healer_and_patient(), vec![TestUnitBuilder::new("Goblin", Side::Enemies)]);
        battle_state.units[1]
            .effects
            .push(StatusEffect::flag(EffectKind::Loaded, 3, Some(0), Origin::Ally));
        // A natural roll of 1 would land in the lowest tier.
        let mut rng = TurnRng::new_for_test(vec![1]);

        assert_ok(resolve_skill(&mut battle_state, 0, "Lucky Mend", Some(1), &mut rng, &mut bus));

        assert!(bus.events().contains(&BattleEvent::DiceRolled {
            unit: 0,
            total: 6,
            forced: true
        }));
        assert!(!battle_state.units[1].has_effect(EffectKind::Loaded));
        assert!(battle_state.units[1].has_effect(EffectKind::Regen));
        assert_eq!(battle_state.units[1].hp, 100);
    }

    fn gamble() -> SkillDescriptor {
        let mut skill = strike("Gamble", 100);
        skill.coin_flip = Some(CoinFlipSpec {
            heads: CoinBranch {
                label: "Hot Hand".to_string(),
                effects: vec![EffectApplication::new(EffectKind::Empowered, 2)
                    .value(50)
                    .on(EffectTarget::Caster)],
                ..CoinBranch::default()
            },
            tails: CoinBranch {
                label: "Pay Up".to_string(),
                self_damage_pct: 10,
                resource_gain: 20,
                ..CoinBranch::default()
            },
        });
        skill
    }

    fn gambler() -> TestUnitBuilder {
        TestUnitBuilder::new("Gambler", Side::Heroes)
            .with_resource(ResourceRules::of(ResourceArchetype::Rage))
            .with_skill(gamble())
    }

    #[test]
    fn test_coin_heads_empowers_the_next_hit() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![gambler()],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies).with_stats(200, 50, 20, 10)],
        );
        let mut rng = TurnRng::new_for_test(vec![50]);

        assert_ok(resolve_skill(&mut battle_state, 0, "Gamble", Some(1), &mut rng, &mut bus));

        assert!(bus.events().contains(&BattleEvent::CoinFlipped { unit: 0, heads: true }));
        // Granted after this cast's hits, so it is still waiting for the next one.
        assert!(battle_state.units[0].has_effect(EffectKind::Empowered));
        assert_eq!(battle_state.units[1].hp, 159);

        assert_ok(resolve_skill(&mut battle_state, 0, BASIC_ATTACK, Some(1), &mut rng, &mut bus));
        // floor(50 * 1.5 * 100 / 120)
        assert_eq!(battle_state.units[1].hp, 159 - 62);
        assert!(!battle_state.units[0].has_effect(EffectKind::Empowered));
    }

    #[test]
    fn test_coin_tails_trades_hp_for_resource() {
        let (mut battle_state, mut bus) =
            create_test_battle(vec![gambler()], vec![TestUnitBuilder::new("Goblin", Side::Enemies)]);
        let mut rng = TurnRng::new_for_test(vec![51]);

        assert_ok(resolve_skill(&mut battle_state, 0, "Gamble", Some(1), &mut rng, &mut bus));

        assert!(bus.events().contains(&BattleEvent::CoinFlipped { unit: 0, heads: false }));
        assert_eq!(battle_state.units[0].hp, 90);
        assert_eq!(battle_state.units[0].resource.current, 20);
        assert_eq!(battle_state.sacrificed_hp[0], 10);
        assert!(!battle_state.units[0].has_effect(EffectKind::Empowered));
    }

    #[test]
    fn test_full_side_runs_the_summon_fallback() {
        let mut call = SkillDescriptor::new("Call Wisps", SkillTarget::SelfOnly);
        call.summon = Some(SummonSpec {
            template_id: "wisp".to_string(),
            count: 2,
            fallback_skill: Some("Spark".to_string()),
        });
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Conjurer", Side::Heroes)
                .with_skill(call)
                .with_skill(strike("Spark", 100))],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies)],
        );
        battle_state.config.max_units_per_side = 1;
        let mut rng = predictable_rng();

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Call Wisps", None, &mut rng, &mut bus));

        bus.print_debug_with_message("Events for test_full_side_runs_the_summon_fallback:");
        assert_eq!(report.fallback, Some("Spark".to_string()));
        assert!(report.summoned.is_empty());
        assert_eq!(report.damage_dealt, 41);
        assert_eq!(battle_state.units.len(), 2);
        assert!(bus.events().contains(&BattleEvent::SummonFailed {
            summoner: 0,
            fallback: Some("Spark".to_string())
        }));
    }

    #[test]
    fn test_evasion_skips_every_later_target_stage() {
        let mut hex = strike("Hex", 100);
        hex.effects = vec![EffectApplication::new(EffectKind::Poison, 3).value(10)];
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Witch", Side::Heroes).with_skill(hex)],
            vec![TestUnitBuilder::new("Rogue", Side::Enemies)],
        );
        battle_state.units[1]
            .effects
            .push(StatusEffect::flag(EffectKind::Evasion, 2, Some(1), Origin::SelfApplied));
        let mut rng = predictable_rng();

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Hex", Some(1), &mut rng, &mut bus));

        assert_eq!(report.evaded, vec![1]);
        assert_eq!(report.damage_dealt, 0);
        assert_eq!(battle_state.units[1].hp, 100);
        assert!(!battle_state.units[1].has_effect(EffectKind::Poison));
    }

    #[test]
    fn test_debuff_gated_effect_reads_state_before_the_hit() {
        let mut shatter = strike("Shatter", 100);
        shatter.effects = vec![
            EffectApplication::new(EffectKind::DefenseDown, 2).value(20),
            EffectApplication::new(EffectKind::Stun, 1).only_if_debuffed(),
        ];
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Breaker", Side::Heroes).with_skill(shatter)],
            vec![TestUnitBuilder::new("Golem", Side::Enemies).with_stats(500, 10, 20, 5)],
        );
        let mut rng = predictable_rng();

        assert_ok(resolve_skill(&mut battle_state, 0, "Shatter", Some(1), &mut rng, &mut bus));
        assert!(battle_state.units[1].has_effect(EffectKind::DefenseDown));
        assert!(!battle_state.units[1].has_effect(EffectKind::Stun));

        assert_ok(resolve_skill(&mut battle_state, 0, "Shatter", Some(1), &mut rng, &mut bus));
        assert!(battle_state.units[1].has_effect(EffectKind::Stun));
    }

    #[test]
    fn test_on_kill_hooks_fire_only_on_a_kill() {
        let mut execute = strike("Execute", 100);
        execute.on_kill = vec![OnKillHook::GainResource(30), OnKillHook::RecomputeTurnOrder];
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Reaper", Side::Heroes)
                .with_resource(ResourceRules::of(ResourceArchetype::Rage))
                .with_skill(execute)],
            vec![
                TestUnitBuilder::new("Tough", Side::Enemies),
                TestUnitBuilder::new("Frail", Side::Enemies).with_hp(10),
            ],
        );
        let mut rng = predictable_rng();

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Execute", Some(1), &mut rng, &mut bus));
        assert!(report.killed.is_empty());
        assert_eq!(battle_state.units[0].resource.current, 0);

        let report = assert_ok(resolve_skill(&mut battle_state, 0, "Execute", Some(2), &mut rng, &mut bus));
        assert_eq!(report.killed, vec![2]);
        assert_eq!(battle_state.units[0].resource.current, 30);
        assert!(bus.events().contains(&BattleEvent::TurnOrderRecomputed));
        assert!(bus.events().contains(&BattleEvent::UnitDefeated { unit: 2 }));
    }

    #[test]
    fn test_cooldown_is_set_on_use() {
        let mut blast = strike("Blast", 200);
        blast.cooldown = 3;
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Mage", Side::Heroes).with_skill(blast)],
            vec![TestUnitBuilder::new("Goblin", Side::Enemies).with_stats(500, 10, 20, 5)],
        );
        let mut rng = predictable_rng();

        assert_ok(resolve_skill(&mut battle_state, 0, "Blast", Some(1), &mut rng, &mut bus));
        assert_eq!(battle_state.units[0].cooldown("Blast"), 3);
        let again = resolve_skill(&mut battle_state, 0, "Blast", Some(1), &mut rng, &mut bus);
        assert!(again.is_err());
    }

    #[test]
    fn test_thorns_can_kill_the_attacker() {
        let (mut battle_state, mut bus) = create_test_battle(
            vec![TestUnitBuilder::new("Knight", Side::Heroes).with_hp(15)],
            vec![TestUnitBuilder::new("Bramble", Side::Enemies)],
        );
        battle_state.units[1].effects.push(StatusEffect {
            payload: EffectPayload::Thorns { damage: 20 },
            ..StatusEffect::flag(EffectKind::Thorns, 2, Some(1), Origin::SelfApplied)
        });
        let mut rng = predictable_rng();

        assert_ok(resolve_skill(&mut battle_state, 0, BASIC_ATTACK, Some(1), &mut rng, &mut bus));

        assert_eq!(battle_state.units[1].hp, 59);
        assert_eq!(battle_state.units[0].hp, 0);
        assert!(battle_state.units[0].flags.defeated);
        assert!(bus.events().contains(&BattleEvent::UnitDefeated { unit: 0 }));
    }
}
