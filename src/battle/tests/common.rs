use crate::battle::state::{BattleState, EventBus, TurnRng};
use crate::combatant::{Combatant, UnitId};
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use crate::errors::BattleResult;
use schema::{
    BaseStats, ClassDefinition, Finale, LeaderSkill, Passive, ResourceRules, Role, Side,
    SkillDescriptor, UnitTemplate,
};
use std::sync::Arc;

/// A builder for creating test combatants with common defaults
/// (100 HP, 50 ATK, 20 DEF, 10 SPD, no class resource).
///
/// # Example
/// ```ignore
/// let unit = TestUnitBuilder::new("knight", Side::Heroes)
///     .with_stats(200, 60, 30, 12)
///     .with_skill(SkillDescriptor::basic_attack())
///     .build(0);
/// ```
#[derive(Debug, Clone)]
pub struct TestUnitBuilder {
    name: String,
    side: Side,
    class_id: String,
    role: Option<Role>,
    stats: BaseStats,
    resource: Option<ResourceRules>,
    skills: Vec<SkillDescriptor>,
    passives: Vec<Passive>,
    leader_skill: Option<LeaderSkill>,
    finale: Option<Finale>,
    current_hp: Option<u32>,
}

impl TestUnitBuilder {
    pub fn new(name: &str, side: Side) -> Self {
        Self {
            name: name.to_string(),
            side,
            class_id: "test".to_string(),
            role: None,
            stats: BaseStats::new(100, 50, 20, 10),
            resource: None,
            skills: Vec::new(),
            passives: Vec::new(),
            leader_skill: None,
            finale: None,
            current_hp: None,
        }
    }

    pub fn with_stats(mut self, hp: u32, attack: u32, defense: u32, speed: u32) -> Self {
        self.stats = BaseStats::new(hp, attack, defense, speed);
        self
    }

    /// Sets the current HP. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn with_class(mut self, class_id: &str) -> Self {
        self.class_id = class_id.to_string();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_resource(mut self, rules: ResourceRules) -> Self {
        self.resource = Some(rules);
        self
    }

    pub fn with_skill(mut self, skill: SkillDescriptor) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_passive(mut self, passive: Passive) -> Self {
        self.passives.push(passive);
        self
    }

    pub fn with_leader_skill(mut self, leader_skill: LeaderSkill) -> Self {
        self.leader_skill = Some(leader_skill);
        self
    }

    pub fn with_finale(mut self, finale: Finale) -> Self {
        self.finale = Some(finale);
        self
    }

    pub fn template(&self) -> UnitTemplate {
        UnitTemplate {
            id: self.name.to_lowercase(),
            name: self.name.clone(),
            class_id: self.class_id.clone(),
            base_stats: self.stats,
            skills: self.skills.clone(),
            passives: self.passives.clone(),
            leader_skill: self.leader_skill.clone(),
            finale: self.finale.clone(),
            role_override: self.role,
        }
    }

    /// Builds the `Combatant` with the given id.
    pub fn build(self, id: UnitId) -> Combatant {
        let class = self.resource.clone().map(|resource| ClassDefinition {
            id: self.class_id.clone(),
            name: self.class_id.clone(),
            role: self.role.unwrap_or(Role::Damage),
            resource,
        });
        let mut unit = Combatant::from_template(&self.template(), class.as_ref(), self.side, 1, 100);
        unit.id = id;
        if let Some(hp) = self.current_hp {
            unit.hp = hp.min(unit.max_hp);
        }
        unit
    }
}

/// Creates a battle with the standard status set and default config.
/// Ids are assigned heroes first, then enemies, in list order.
pub fn create_test_battle(
    heroes: Vec<TestUnitBuilder>,
    enemies: Vec<TestUnitBuilder>,
) -> (BattleState, EventBus) {
    let mut state = BattleState::new(
        "test_battle",
        Arc::new(ContentLibrary::new()),
        BattleConfig::default(),
    );
    for builder in heroes.into_iter().chain(enemies) {
        state.add_unit(builder.build(0));
    }
    (state, EventBus::new())
}

/// Creates a `TurnRng` instance with a long list of default values (50).
/// Useful for tests where the specific RNG outcome is not important.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 100])
}

/// Helper function to assert that a Result is Ok and return the value.
/// Provides clear error messages in tests when functions unexpectedly fail.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}
