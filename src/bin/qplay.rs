//! Apply one play to an encoded position and print the result.
//!
//! ```text
//! qplay --seed 7 '{"object_index":9,"primary_moves":[{"move":{"type":"pawn_double_move","pushed_pawn":"b2"},"declarations":["no_capture","non_leaping"]}]}'
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use quantum_chess::chess::config::GameSettings;
use quantum_chess::chess::moves::Play;
use quantum_chess::chess::rules::Rules;
use quantum_chess::core::entropy::BitQueue;
use quantum_chess::notation;
use quantum_chess::quantum::play::generate_play_results;
use quantum_chess::quantum::position::QuantumPosition;
use quantum_chess::quantum::validity::check_play_validity;

#[derive(Debug, Parser)]
#[command(name = "qplay", about = "Resolve one quantum chess play")]
struct Args {
    /// Play as JSON.
    play: String,

    /// Encoded position, or `standard` for the opening.
    #[arg(long, default_value = "standard")]
    position: String,

    /// Settings JSON file. Missing fields take their defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Seed for a replayable bit stream. Without it the OS RNG is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of random bits to queue.
    #[arg(long, default_value_t = 1 << 14)]
    bits: usize,

    /// Only report validation problems.
    #[arg(long)]
    check: bool,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &args.settings {
        Some(path) => GameSettings::load(path)?,
        None => GameSettings::default(),
    };
    let position = if args.position == "standard" {
        QuantumPosition::standard(&settings)
    } else {
        notation::decode(&args.position)?
    };
    let play: Play = serde_json::from_str(&args.play)?;
    let rules = Rules::new(settings);

    if args.check {
        let violations = check_play_validity(&rules, &play, &position);
        if violations.is_empty() {
            println!("legal");
        }
        for v in violations {
            println!("{v}");
        }
        return Ok(());
    }

    let mut bits = BitQueue::new();
    match args.seed {
        Some(seed) => bits.add_seeded(seed, args.bits),
        None => bits.add_random(args.bits),
    }

    let results = generate_play_results(&rules, position, &play, &mut bits)?;
    println!("{}", notation::encode(&results.position));
    println!("outcome: {}", results.outcome);
    if results.game_over {
        println!("game over");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
