use crate::{ClassDefinition, FightEffect, StatusDefinition, UnitTemplate};
use serde::{Deserialize, Serialize};

/// The complete authored content bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPack {
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub statuses: Vec<StatusDefinition>,
    #[serde(default)]
    pub units: Vec<UnitTemplate>,
    #[serde(default)]
    pub fight_effects: Vec<FightEffect>,
}

impl ContentPack {
    /// Encode the pack into a compact postcard bundle.
    pub fn to_bundle(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bundle(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BaseStats, EffectApplication, EffectKind, ResourceArchetype, ResourceRules, Role,
        SkillDescriptor, SkillTarget,
    };

    #[test]
    fn test_bundle_preserves_nested_skill_tables() {
        let mut skill = SkillDescriptor::new("Hex", SkillTarget::SingleEnemy);
        skill.effects = vec![EffectApplication::new(EffectKind::Marked, 2).chance(60)];
        let pack = ContentPack {
            classes: vec![ClassDefinition {
                id: "witch".to_string(),
                name: "Witch".to_string(),
                role: Role::Support,
                resource: ResourceRules::of(ResourceArchetype::Mana),
            }],
            statuses: vec![],
            units: vec![UnitTemplate {
                id: "hexer".to_string(),
                name: "Hexer".to_string(),
                class_id: "witch".to_string(),
                base_stats: BaseStats::new(300, 40, 20, 12),
                skills: vec![skill],
                passives: vec![],
                leader_skill: None,
                finale: None,
                role_override: None,
            }],
            fight_effects: vec![],
        };

        let bytes = pack.to_bundle().expect("encode");
        let decoded = ContentPack::from_bundle(&bytes).expect("decode");
        assert_eq!(decoded, pack);
    }
}
