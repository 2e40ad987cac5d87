// The two shipped arrangements: a three-part ant colony piece and a single
// bass line bred by the genetic search.
//
// Each function runs the search cores with one random stream and assembles
// the resulting phrases into a `Score` ready for `midi::write_midi`. The
// binaries in `src/bin/` are thin wrappers around these.

use log::info;
use melody_swarm_prng::MelodyRng;

use crate::aco;
use crate::config::{AcoConfig, GaConfig};
use crate::error::ConfigError;
use crate::ga::{self, Evolution};
use crate::score::{Part, SYNTH_BASS, Score};

/// Title written into both MIDI files.
pub const SCORE_TITLE: &str = "Ant Symphony";

pub const ACO_TEMPO_BPM: u32 = 100;
pub const GA_TEMPO_BPM: u32 = 80;

/// Program used by the two upper ant colony parts.
pub const SNARE_PROGRAM: u8 = 25;

pub const ACO_OUTPUT: &str = "aco.mid";
pub const GA_OUTPUT: &str = "ga.mid";

/// One instrument of the ant colony piece and the pitches its ants may visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voicing {
    pub name: &'static str,
    pub program: u8,
    pub channel: u8,
    pub min_note: u8,
    pub max_note: u8,
}

/// Bass over a wide range, then two snare parts over narrow ranges.
pub const ACO_VOICINGS: [Voicing; 3] = [
    Voicing {
        name: "BASS",
        program: SYNTH_BASS,
        channel: 1,
        min_note: 30,
        max_note: 70,
    },
    Voicing {
        name: "SNARE",
        program: SNARE_PROGRAM,
        channel: 2,
        min_note: 40,
        max_note: 50,
    },
    Voicing {
        name: "SNARE",
        program: SNARE_PROGRAM,
        channel: 3,
        min_note: 30,
        max_note: 40,
    },
];

/// Run one independent colony per voicing, in order, and collect the parts.
///
/// `config` supplies every setting except the pitch range, which comes from
/// each voicing.
pub fn aco_score(
    config: &AcoConfig,
    voicings: &[Voicing],
    rng: &mut MelodyRng,
) -> Result<Score, ConfigError> {
    let mut score = Score::new(SCORE_TITLE, ACO_TEMPO_BPM);
    for voicing in voicings {
        let part_config = config.with_range(voicing.min_note, voicing.max_note);
        let phrase = aco::generate(&part_config, rng)?;
        info!(
            "{} (channel {}): {} notes in {}..={}",
            voicing.name,
            voicing.channel,
            phrase.len(),
            voicing.min_note,
            voicing.max_note
        );
        let mut part = Part::new(voicing.name, voicing.program, voicing.channel);
        part.attach(phrase);
        score.attach(part);
    }
    Ok(score)
}

/// Evolve one bass line and place it in a single-part score.
pub fn ga_score(config: &GaConfig, rng: &mut MelodyRng) -> Result<(Score, Evolution), ConfigError> {
    info!("begin evolving {} organisms", config.pop_size);
    let evolution = ga::evolve(config, rng)?;
    info!(
        "end evolving after {} epochs, best fitness {:.2}",
        evolution.epochs, evolution.best_fitness
    );

    let mut part = Part::new("BASS", SYNTH_BASS, 1);
    part.attach(evolution.phrase.clone());
    let mut score = Score::new(SCORE_TITLE, GA_TEMPO_BPM);
    score.attach(part);
    Ok((score, evolution))
}
