// Ant colony melody generator: CLI entry point.
//
// Runs one ant colony search per instrument (bass plus two snares, each over
// its own pitch range) and writes the three-part score to MIDI.
//
// Usage:
//   cargo run -p melody_swarm --bin aco -- [--seed N] [--output PATH]
//
// With no arguments the seed comes from the clock and the file is `aco.mid`.

use melody_swarm::arrangement::{ACO_OUTPUT, ACO_VOICINGS, aco_score};
use melody_swarm::cli::{init_logging, parse_flag, rng_from_args};
use melody_swarm::config::AcoConfig;
use melody_swarm::midi::write_midi;
use std::path::PathBuf;

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    let output: PathBuf = parse_flag(&args, "--output").unwrap_or_else(|| ACO_OUTPUT.into());
    let (mut rng, seed) = rng_from_args(&args);
    log::info!("ant colony run, seed {seed}");

    let score = match aco_score(&AcoConfig::default(), &ACO_VOICINGS, &mut rng) {
        Ok(score) => score,
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
