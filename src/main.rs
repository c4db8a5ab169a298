use gauntlet::battle::runner::BattleRunner;
use gauntlet::battle::state::{Outcome, TurnRng};
use gauntlet::demo::{demo_content, demo_encounters, demo_setup};
use tracing_subscriber::EnvFilter;

const DEMO_ROUND_LIMIT: u32 = 30;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let encounter_id = args.next().unwrap_or_else(|| "goblin_camp".to_string());
    let rng = match args.next().map(|seed| seed.parse::<u64>()) {
        Some(Ok(seed)) => TurnRng::from_seed(seed),
        Some(Err(e)) => {
            println!("Invalid seed: {}", e);
            return;
        }
        None => TurnRng::new_random(),
    };

    let content = match demo_content() {
        Ok(content) => content,
        Err(e) => {
            println!("Error loading demo content: {}", e);
            return;
        }
    };

    let Some(setup) = demo_setup(&encounter_id, &content) else {
        println!("Unknown encounter '{}'. Available encounters:", encounter_id);
        for encounter in demo_encounters() {
            println!("  {} - {} ({})", encounter.id, encounter.name, encounter.description);
        }
        return;
    };

    let mut runner = match BattleRunner::new(&setup, content, rng) {
        Ok(runner) => runner,
        Err(e) => {
            println!("Error starting battle: {}", e);
            return;
        }
    };

    println!("=== {} ===", setup.battle_id);
    for unit in &runner.state().units {
        println!(
            "  [{}] {} (HP: {}/{})",
            unit.side, unit.name, unit.hp, unit.max_hp
        );
    }
    println!();

    let outcome = runner.run_to_completion(DEMO_ROUND_LIMIT);
    for line in runner.formatted_log() {
        println!("{}", line);
    }
    println!();

    match outcome {
        Outcome::Victory => println!("The heroes win after {} round(s)!", runner.state().round),
        Outcome::Defeat => println!("The heroes fall after {} round(s).", runner.state().round),
    }
}
