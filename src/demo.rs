use crate::battle::roster::BattleSetup;
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use crate::errors::ContentResult;
use schema::{ArenaOpponent, BossAbility, Encounter, HeroInstance, SkillDescriptor, SkillTarget, SummonSpec};
use std::sync::{Arc, LazyLock};

const DEMO_CONTENT_RON: &str = include_str!("../data/demo_content.ron");

// Parsed once; every battle shares the same library.
static DEMO_CONTENT: LazyLock<ContentResult<Arc<ContentLibrary>>> =
    LazyLock::new(|| ContentLibrary::from_ron_str(DEMO_CONTENT_RON).map(Arc::new));

/// A named, ready-to-run battle built from the demo pack.
#[derive(Debug, Clone)]
pub struct DemoEncounter {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const DEMO_ENCOUNTERS: [DemoEncounter; 3] = [
    DemoEncounter {
        id: "goblin_camp",
        name: "Goblin Camp",
        description: "Two goblins and their shaman",
    },
    DemoEncounter {
        id: "wolf_arena",
        name: "Wolf Arena",
        description: "An arena bout against a led wolf pack",
    },
    DemoEncounter {
        id: "elder_treant",
        name: "Elder Treant",
        description: "Genus Loci boss on scorched ground, calls saplings at power 3",
    },
];

pub fn demo_content() -> ContentResult<Arc<ContentLibrary>> {
    DEMO_CONTENT.clone()
}

pub fn demo_encounters() -> &'static [DemoEncounter] {
    &DEMO_ENCOUNTERS
}

pub fn demo_roster() -> Vec<HeroInstance> {
    ["aurelia", "vesper", "grask", "lyra"]
        .into_iter()
        .map(HeroInstance::new)
        .collect()
}

fn call_saplings() -> SkillDescriptor {
    let mut skill = SkillDescriptor::new("Call Saplings", SkillTarget::SelfOnly);
    skill.description = "Raises two saplings from the roots.".to_string();
    skill.cooldown = 3;
    skill.summon = Some(SummonSpec {
        template_id: "sapling".to_string(),
        count: 2,
        fallback_skill: Some("Root Slam".to_string()),
    });
    skill
}

/// Build the setup for one of the demo encounters. Returns `None` for an
/// unknown id. Fight effects are looked up in `content` by name.
pub fn demo_setup(encounter_id: &str, content: &ContentLibrary) -> Option<BattleSetup> {
    let (encounter, fight_effect_names): (Encounter, &[&str]) = match encounter_id {
        "goblin_camp" => (
            Encounter::Standard {
                enemies: vec!["goblin".into(), "goblin".into(), "goblin_shaman".into()],
                level: 3,
            },
            &[],
        ),
        "wolf_arena" => (
            Encounter::ArenaBout {
                opponents: vec![
                    ArenaOpponent {
                        template_id: "wolf".into(),
                        level: 4,
                        stars: 2,
                        shard_tier: 1,
                    },
                    ArenaOpponent {
                        template_id: "wolf".into(),
                        level: 3,
                        stars: 1,
                        shard_tier: 0,
                    },
                    ArenaOpponent {
                        template_id: "goblin_shaman".into(),
                        level: 3,
                        stars: 1,
                        shard_tier: 0,
                    },
                ],
                leader: None,
            },
            &["Blessed Ground"],
        ),
        "elder_treant" => (
            Encounter::GenusLoci {
                boss_id: "elder_treant".into(),
                power_level: 3,
                abilities: vec![BossAbility {
                    unlock_at: 3,
                    skill: call_saplings(),
                }],
            },
            &["Scorched Earth"],
        ),
        _ => return None,
    };

    let fight_effects = fight_effect_names
        .iter()
        .filter_map(|name| {
            let effect = content.fight_effect(name).cloned();
            if effect.is_none() {
                tracing::warn!(effect = %name, "demo fight effect missing from content");
            }
            effect
        })
        .collect();

    Some(BattleSetup {
        battle_id: format!("demo_{}", encounter_id),
        roster: demo_roster(),
        leader_index: Some(0),
        encounter,
        fight_effects,
        config: BattleConfig::default(),
    })
}
