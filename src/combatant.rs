use crate::battle::effects::StatusEffect;
use crate::battle::resources::ResourcePool;
use schema::{
    BaseStats, ClassDefinition, EffectKind, Finale, LeaderSkill, Passive, Role, Side,
    SkillDescriptor, StatType, UnitTemplate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a combatant in `BattleState::units`. Ids are never reused, so a
/// dead or summoned unit keeps its id for the whole battle.
pub type UnitId = usize;

/// Bonuses granted by the active leader skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderBonus {
    pub attack_pct: i32,
    pub defense_pct: i32,
    pub speed_pct: i32,
    pub lifesteal_pct: u32,
    pub regen_pct: u32,
}

impl LeaderBonus {
    pub fn stat_pct(&self, stat: StatType) -> i32 {
        match stat {
            StatType::Attack => self.attack_pct,
            StatType::Defense => self.defense_pct,
            StatType::Speed => self.speed_pct,
            StatType::Hp => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantFlags {
    pub harmed_this_round: bool,
    pub harmed_last_round: bool,
    pub below_half: bool,
    pub on_death_fired: bool,
    /// Death consequences already ran for this unit.
    pub defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: UnitId,
    pub name: String,
    pub template_id: String,
    pub class_id: String,
    pub side: Side,
    pub role: Role,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub stats: BaseStats,
    pub resource: ResourcePool,
    pub effects: Vec<StatusEffect>,
    pub cooldowns: BTreeMap<String, u8>,
    pub skills: Vec<SkillDescriptor>,
    pub passives: Vec<Passive>,
    pub finale: Option<Finale>,
    pub leader_skill: Option<LeaderSkill>,
    pub leader_bonus: LeaderBonus,
    pub summoned: bool,
    pub flags: CombatantFlags,
}

impl Combatant {
    /// Build a combatant from its template. `growth_pct` scales the base
    /// stats (100 = unscaled). A missing class leaves the unit without a
    /// resource and with the Damage role.
    pub fn from_template(
        template: &UnitTemplate,
        class: Option<&ClassDefinition>,
        side: Side,
        level: u32,
        growth_pct: u32,
    ) -> Self {
        let stats = template.base_stats.scaled(growth_pct);
        let role = template
            .role_override
            .or(class.map(|c| c.role))
            .unwrap_or(Role::Damage);
        let resource = class
            .map(|c| ResourcePool::new(c.resource.clone()))
            .unwrap_or_else(ResourcePool::none);

        Combatant {
            id: 0,
            name: template.name.clone(),
            template_id: template.id.clone(),
            class_id: template.class_id.clone(),
            side,
            role,
            level,
            hp: stats.hp,
            max_hp: stats.hp,
            stats,
            resource,
            effects: Vec::new(),
            cooldowns: BTreeMap::new(),
            skills: template.skills.clone(),
            passives: template.passives.clone(),
            finale: template.finale.clone(),
            leader_skill: template.leader_skill.clone(),
            leader_bonus: LeaderBonus::default(),
            summoned: false,
            flags: CombatantFlags::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Current HP as a whole percent of max HP.
    pub fn hp_pct(&self) -> u32 {
        if self.max_hp == 0 {
            return 0;
        }
        ((self.hp as u64 * 100) / self.max_hp as u64) as u32
    }

    pub fn missing_hp_pct(&self) -> u32 {
        100 - self.hp_pct().min(100)
    }

    /// Removes up to `amount` HP. Returns the HP actually lost.
    pub fn lose_hp(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restores up to `amount` HP without exceeding max HP. Dead units cannot be healed.
    pub fn restore_hp(&mut self, amount: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self.hp - before
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    pub fn effect(&self, kind: EffectKind) -> Option<&StatusEffect> {
        self.effects.iter().find(|effect| effect.kind == kind)
    }

    pub fn has_any_debuff(&self) -> bool {
        self.effects.iter().any(StatusEffect::is_debuff)
    }

    pub fn stacks_of(&self, kind: EffectKind) -> u32 {
        self.effects
            .iter()
            .filter(|effect| effect.kind == kind)
            .map(|effect| effect.stacks as u32)
            .sum()
    }

    pub fn cooldown(&self, skill_name: &str) -> u8 {
        self.cooldowns.get(skill_name).copied().unwrap_or(0)
    }

    pub fn set_cooldown(&mut self, skill_name: &str, turns: u8) {
        if turns == 0 {
            self.cooldowns.remove(skill_name);
        } else {
            self.cooldowns.insert(skill_name.to_string(), turns);
        }
    }

    /// Decrement every cooldown except the one for the skill just used.
    pub fn tick_cooldowns(&mut self, just_used: Option<&str>) {
        for (name, turns) in self.cooldowns.iter_mut() {
            if Some(name.as_str()) != just_used {
                *turns = turns.saturating_sub(1);
            }
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
    }

    /// Finds a skill by case-insensitive name. The basic attack is always known.
    pub fn find_skill(&self, name: &str) -> Option<SkillDescriptor> {
        self.skills
            .iter()
            .find(|skill| skill.name.eq_ignore_ascii_case(name))
            .cloned()
            .or_else(|| {
                let basic = SkillDescriptor::basic_attack();
                basic.name.eq_ignore_ascii_case(name).then_some(basic)
            })
    }

    pub fn has_taunt(&self) -> bool {
        self.has_effect(EffectKind::Taunt)
    }
}
