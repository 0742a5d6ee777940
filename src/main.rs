use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use limbcore::entity::Stats;
use limbcore::zone::Cell;
use limbcore::{equip, mutations, perform_melee_attack, CombatParams, CreatureId, World};

#[derive(Parser, Debug)]
#[command(name = "limbcore")]
#[command(about = "Run a seeded melee duel between two creatures")]
struct Args {
    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Anatomy of the first combatant
    #[arg(long, default_value = "humanoid")]
    attacker: String,

    /// Anatomy of the second combatant
    #[arg(long, default_value = "quadruped")]
    defender: String,

    /// Maximum number of exchanges
    #[arg(short, long, default_value = "20")]
    rounds: u32,

    /// Combat parameters as JSON; missing fields keep their defaults
    #[arg(long)]
    params: Option<PathBuf>,

    /// Item blueprint the attacker wields (e.g. "Long Sword")
    #[arg(long)]
    weapon: Option<String>,

    /// Mutation granted to the attacker before the fight (e.g. "MultipleArms")
    #[arg(long)]
    mutation: Option<String>,

    /// Print each attack report as JSON instead of narration
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("limbcore=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let params = match &args.params {
        Some(path) => CombatParams::from_json_file(path)?,
        None => CombatParams::default(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(seed, attacker = %args.attacker, defender = %args.defender, "starting duel");

    let mut world = World::new(8, 8).with_params(params);
    let red = world.spawn_creature(
        &format!("the {}", args.attacker),
        &args.attacker,
        Stats::average(),
        Some(Cell::new(3, 3)),
    )?;
    let blue = world.spawn_creature(
        &format!("the {}", args.defender),
        &args.defender,
        Stats::average(),
        Some(Cell::new(4, 3)),
    )?;

    if let Some(key) = &args.mutation {
        mutations::grant_mutation(&mut world, red, key)?;
    }
    if let Some(blueprint) = &args.weapon {
        let item = world
            .items
            .spawn_blueprint(blueprint)
            .ok_or_else(|| format!("unknown item blueprint \"{}\"", blueprint))?;
        world.give_item(red, item)?;
        equip(&mut world, red, item, None)?;
    }

    if !args.json {
        println!("Duel seed: {}", seed);
        flush_log(&mut world);
    }

    for round in 1..=args.rounds {
        if !args.json {
            println!("-- round {} --", round);
        }
        for (attacker, defender) in [(red, blue), (blue, red)] {
            if !is_alive(&world, attacker) || !is_alive(&world, defender) {
                continue;
            }
            let report = perform_melee_attack(&mut world, attacker, defender, &mut rng)?;
            if args.json {
                println!("{}", serde_json::to_string(&report)?);
                world.log.drain();
            } else {
                flush_log(&mut world);
            }
        }
        if !is_alive(&world, red) || !is_alive(&world, blue) {
            break;
        }
    }

    if !args.json {
        for id in [red, blue] {
            if let Some(creature) = world.creature(id) {
                println!(
                    "{}: {}/{} hp{}",
                    creature.name,
                    creature.stats.hitpoints(),
                    creature.stats.max_hitpoints(),
                    if creature.alive { "" } else { " (dead)" }
                );
            }
        }
    }
    Ok(())
}

fn is_alive(world: &World, id: CreatureId) -> bool {
    world.creature(id).map_or(false, |c| c.alive)
}

fn flush_log(world: &mut World) {
    for line in world.log.drain() {
        println!("{}", line);
    }
}
