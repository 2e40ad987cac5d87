// Genetic melody generator: CLI entry point.
//
// Evolves a population of ten random bass lines and writes the fittest one
// to a single-part MIDI file.
//
// Usage:
//   cargo run -p melody_swarm --bin ga -- [--seed N] [--output PATH]
//
// With no arguments the seed comes from the clock and the file is `ga.mid`.

use melody_swarm::arrangement::{GA_OUTPUT, ga_score};
use melody_swarm::cli::{init_logging, parse_flag, rng_from_args};
use melody_swarm::config::GaConfig;
use melody_swarm::midi::write_midi;
use std::path::PathBuf;

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    let output: PathBuf = parse_flag(&args, "--output").unwrap_or_else(|| GA_OUTPUT.into());
    let (mut rng, seed) = rng_from_args(&args);
    log::info!("genetic run, seed {seed}");

    let (score, _) = match ga_score(&GaConfig::default(), &mut rng) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    match write_midi(&score, &output) {
        Ok(()) => log::info!("wrote {}", output.display()),
        Err(e) => {
            eprintln!("Error writing MIDI: {e}");
            std::process::exit(1);
        }
    }
}
