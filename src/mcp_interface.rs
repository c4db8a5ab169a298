//! Text front end for the MCP server
//!
//! Every function here takes a `BattleRunner` (or the content library) and
//! returns plain text suitable for an LLM tool response.

use crate::battle::resources::can_use_skill;
use crate::battle::runner::BattleRunner;
use crate::battle::state::{GameState, TurnRng};
use crate::combatant::{Combatant, UnitId};
use crate::content::ContentLibrary;
use crate::demo::{demo_content, demo_encounters, demo_setup};
use schema::{ResourceArchetype, ResourceCost, Side, SkillDescriptor, SkillTarget};

/// Returns formatted text listing the demo encounters
pub fn get_available_encounters_display() -> String {
    let mut output = String::from("Available Encounters:\n");
    for encounter in demo_encounters() {
        output.push_str(&format!(
            "  {} - {}: {}\n",
            encounter.id, encounter.name, encounter.description
        ));
    }
    output
}

/// Creates a new battle for the chosen encounter and returns the intro text
/// together with whatever the opening round produced.
pub fn create_battle(encounter_id: &str) -> Result<(BattleRunner, String), String> {
    let content = demo_content().map_err(|e| format!("Failed to load content: {}", e))?;
    let setup = demo_setup(encounter_id, &content).ok_or_else(|| {
        format!(
            "Unknown encounter '{}'. Use one of: {}",
            encounter_id,
            demo_encounters()
                .iter()
                .map(|e| e.id)
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;
    let mut runner = BattleRunner::new(&setup, content, TurnRng::new_random())
        .map_err(|e| format!("Failed to start battle: {}", e))?;
    runner.advance();

    let mut output = String::from("The gauntlet begins!\n\n");
    output.push_str(&drain_event_text(&mut runner));
    output.push('\n');
    output.push_str(&get_battle_status_summary(&runner));
    Ok((runner, output))
}

fn effect_list(unit: &Combatant) -> String {
    if unit.effects.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = unit
        .effects
        .iter()
        .map(|effect| {
            if effect.stacks > 1 {
                format!("{} x{} ({}t)", effect.kind, effect.stacks, effect.duration)
            } else {
                format!("{} ({}t)", effect.kind, effect.duration)
            }
        })
        .collect();
    format!(" [{}]", parts.join(", "))
}

fn resource_text(unit: &Combatant) -> String {
    match unit.resource.archetype() {
        ResourceArchetype::None => String::new(),
        ResourceArchetype::Focus if unit.resource.focused => " Focus: ready".to_string(),
        ResourceArchetype::Focus => " Focus: -".to_string(),
        archetype => format!(
            " {:?}: {}/{}",
            archetype,
            unit.resource.current,
            unit.resource.max()
        ),
    }
}

/// One line per unit, grouped by side
pub fn display_battle_status(runner: &BattleRunner) -> String {
    let state = runner.state();
    let mut output = format!("--- Round {} ---\n", state.round);
    for side in [Side::Heroes, Side::Enemies] {
        output.push_str(&format!("{}:\n", side));
        for unit in state.units.iter().filter(|u| u.side == side) {
            let status = if unit.is_alive() {
                format!("HP {}/{}", unit.hp, unit.max_hp)
            } else {
                "Defeated".to_string()
            };
            output.push_str(&format!(
                "  {}. {} - {}{}{}\n",
                unit.id,
                unit.name,
                status,
                resource_text(unit),
                effect_list(unit)
            ));
        }
    }
    output
}

fn cost_text(cost: ResourceCost) -> String {
    match cost {
        ResourceCost::Free => "free".to_string(),
        ResourceCost::Amount(amount) => format!("costs {}", amount),
        ResourceCost::All => "spends all".to_string(),
    }
}

fn target_text(target: SkillTarget) -> String {
    match target {
        SkillTarget::SelfOnly => "self".to_string(),
        SkillTarget::SingleEnemy => "one enemy".to_string(),
        SkillTarget::SingleAlly => "one ally".to_string(),
        SkillTarget::AllEnemies => "all enemies".to_string(),
        SkillTarget::AllAllies => "all allies".to_string(),
        SkillTarget::RandomEnemies { count } => format!("{} random enemies", count),
        SkillTarget::DeadAlly => "a fallen ally".to_string(),
        SkillTarget::Chain { extra_targets } => format!("one enemy, chains to {} more", extra_targets),
        SkillTarget::Splash { extra_targets, splash_pct } => {
            format!("one enemy, {}% splash to {} more", splash_pct, extra_targets)
        }
    }
}

/// Multi-line description of a skill
pub fn describe_skill(skill: &SkillDescriptor) -> String {
    let mut output = format!("{} ({}, {})\n", skill.name, target_text(skill.target), cost_text(skill.cost));
    if !skill.description.is_empty() {
        output.push_str(&format!("  {}\n", skill.description));
    }
    if let Some(damage) = &skill.damage {
        output.push_str(&format!("  Damage: {}% ATK", damage.multiplier_pct));
        if damage.hits > 1 {
            output.push_str(&format!(" over {} hits", damage.hits));
        }
        if damage.ignore_def_pct > 0 {
            output.push_str(&format!(", ignores {}% DEF", damage.ignore_def_pct));
        }
        output.push('\n');
    }
    if let Some(heal) = &skill.heal {
        output.push_str(&format!("  Heal: {}% ATK + {}% max HP\n", heal.atk_pct, heal.max_hp_pct));
    }
    for effect in &skill.effects {
        output.push_str(&format!(
            "  Applies {} for {} turn(s) ({}% chance)\n",
            effect.kind, effect.duration, effect.chance
        ));
    }
    if let Some(dice) = &skill.dice {
        output.push_str(&format!("  Rolls {}d{}\n", dice.count, dice.sides));
    }
    if skill.coin_flip.is_some() {
        output.push_str("  Flips a coin\n");
    }
    if let Some(summon) = &skill.summon {
        output.push_str(&format!("  Summons {} x{}\n", summon.template_id, summon.count));
    }
    if skill.cooldown > 0 {
        output.push_str(&format!("  Cooldown: {} turn(s)\n", skill.cooldown));
    }
    output
}

fn prompt_text(runner: &BattleRunner) -> String {
    let state = runner.state();
    match runner.game_state() {
        GameState::AwaitingAction { unit } => {
            let Some(actor) = state.unit(*unit) else {
                return String::new();
            };
            let mut output = format!("\n{}'s turn. Choose a skill:\n", actor.name);
            let mut skills = actor.skills.clone();
            skills.push(SkillDescriptor::basic_attack());
            for skill in skills {
                let cooldown = actor.cooldown(&skill.name);
                let note = if cooldown > 0 {
                    format!(" - cooling down ({})", cooldown)
                } else if !can_use_skill(actor, &skill) {
                    " - unavailable".to_string()
                } else {
                    String::new()
                };
                output.push_str(&format!(
                    "  {} ({}, {}){}\n",
                    skill.name,
                    target_text(skill.target),
                    cost_text(skill.cost),
                    note
                ));
            }
            output
        }
        GameState::AwaitingTarget { unit, skill } => {
            format!(
                "\n{} is preparing {}. Choose a target by number, or cancel.\n",
                state.name_of(*unit),
                skill
            )
        }
        _ => String::new(),
    }
}

/// Gets the current battle status as a formatted string
pub fn get_battle_status_summary(runner: &BattleRunner) -> String {
    let mut output = String::new();
    match runner.game_state() {
        GameState::Victory => output.push_str("Battle Over - Victory!\n"),
        GameState::Defeat => output.push_str("Battle Over - Defeat.\n"),
        _ => output.push_str("Battle in Progress\n"),
    }
    output.push_str(&display_battle_status(runner));
    output.push_str(&prompt_text(runner));
    output
}

/// Formats and clears the events produced since the last call
pub fn drain_event_text(runner: &mut BattleRunner) -> String {
    let events = runner.take_events();
    let mut output = String::new();
    for event in &events {
        if let Some(line) = event.format(runner.state()) {
            output.push_str(&line);
            output.push('\n');
        }
    }
    output
}

fn after_action(runner: &mut BattleRunner) -> String {
    let mut output = drain_event_text(runner);
    output.push('\n');
    output.push_str(&get_battle_status_summary(runner));
    output
}

/// Picks a skill for the hero whose turn it is
pub fn execute_skill_action(runner: &mut BattleRunner, skill_name: &str) -> Result<String, String> {
    runner
        .select_skill(skill_name.trim())
        .map_err(|e| format!("Cannot use '{}': {}", skill_name, e))?;
    Ok(after_action(runner))
}

/// Resolves the pending skill against a unit number
pub fn execute_target_action(runner: &mut BattleRunner, target: UnitId) -> Result<String, String> {
    runner
        .select_target(target)
        .map_err(|e| format!("Cannot target {}: {}", target, e))?;
    Ok(after_action(runner))
}

pub fn execute_cancel_action(runner: &mut BattleRunner) -> Result<String, String> {
    runner.cancel_selection().map_err(|e| e.to_string())?;
    Ok(get_battle_status_summary(runner))
}

/// Handles the "lookup skill" command for skill details
pub fn handle_lookup_skill_command(content: &ContentLibrary, skill_name: &str) -> String {
    if skill_name.trim().is_empty() {
        return "What skill do you want to look up? (e.g., 'Fireball')".to_string();
    }
    if skill_name.trim().eq_ignore_ascii_case(schema::BASIC_ATTACK) {
        return format!("--- Skill Details ---\n{}", describe_skill(&SkillDescriptor::basic_attack()));
    }
    match content.find_skill(skill_name.trim()) {
        Some((unit, skill)) => format!("--- Skill Details ({}) ---\n{}", unit.name, describe_skill(skill)),
        None => format!("The skill '{}' was not found.", skill_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, predictable_rng, TestUnitBuilder};
    use schema::BASIC_ATTACK;

    fn duel() -> BattleRunner {
        let (battle_state, _) = create_test_battle(
            vec![TestUnitBuilder::new("Champion", Side::Heroes).with_stats(100, 100, 0, 20)],
            vec![TestUnitBuilder::new("Sentry", Side::Enemies).with_stats(300, 10, 50, 10)],
        );
        let mut runner = BattleRunner::from_state(battle_state, predictable_rng());
        runner.advance();
        runner
    }

    #[test]
    fn test_status_summary_prompts_for_a_skill() {
        let runner = duel();
        let summary = get_battle_status_summary(&runner);
        assert!(summary.contains("Battle in Progress"));
        assert!(summary.contains("0. Champion - HP 100/100"));
        assert!(summary.contains("Champion's turn"));
        assert!(summary.contains(BASIC_ATTACK));
    }

    #[test]
    fn test_skill_then_target_reports_the_hit() {
        let mut runner = duel();
        runner.take_events();

        let prompt = execute_skill_action(&mut runner, BASIC_ATTACK).expect("skill accepted");
        assert!(prompt.contains("Choose a target"));

        let result = execute_target_action(&mut runner, 1).expect("target accepted");
        assert!(result.contains("Sentry - HP 234/300"));
    }

    #[test]
    fn test_bad_selections_report_errors() {
        let mut runner = duel();
        assert!(execute_skill_action(&mut runner, "Meteor").is_err());
        assert!(execute_cancel_action(&mut runner).is_err());
        assert!(execute_target_action(&mut runner, 1).is_err());
    }

    #[test]
    fn test_lookup_finds_content_skills() {
        let mut skill = SkillDescriptor::new("Hex", SkillTarget::SingleEnemy);
        skill.cost = ResourceCost::Amount(30);
        let mut content = ContentLibrary::new();
        content.insert_unit(
            TestUnitBuilder::new("Witch", Side::Enemies)
                .with_skill(skill)
                .template(),
        );

        let text = handle_lookup_skill_command(&content, "hex");
        assert!(text.contains("Hex (one enemy, costs 30)"));
        assert!(text.contains("Witch"));
        assert!(handle_lookup_skill_command(&content, "Nope").contains("not found"));
        assert!(handle_lookup_skill_command(&content, "").contains("What skill"));
    }
}
