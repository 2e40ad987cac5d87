// Melody Swarm
//
// Generates short monophonic melodies with two independent stochastic
// searches and writes them as Standard MIDI Files. Both searches treat a
// melody as a sequence of pitches drawn from a configured range, with every
// note the same length.
//
// Architecture:
// - pitch.rs: Pitch domain (inclusive MIDI range, offset mapping)
// - score.rs: Note / Phrase / Part / Score containers handed to the MIDI sink
// - config.rs: Serde-backed search settings with validation
// - error.rs: Configuration and sink error types
// - aco.rs: Ant colony search (pheromone matrix, silent and playing ants)
// - ga.rs: Genetic search (organisms, roulette selection, uniform crossover,
//   mutation, generational replacement)
// - midi.rs: MIDI file encoding and note-count read-back
// - arrangement.rs: The three-part ant colony piece and the genetic bass line
// - cli.rs: Logging, flag parsing and seeding for the binaries
//
// Both searches are deterministic given a seed: each run threads a single
// `MelodyRng` through every random decision.

pub mod aco;
pub mod arrangement;
pub mod cli;
pub mod config;
pub mod error;
pub mod ga;
pub mod midi;
pub mod pitch;
pub mod score;
