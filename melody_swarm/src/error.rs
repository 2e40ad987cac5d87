// Error types for the melody generator.
//
// Two kinds of failure exist: a configuration that cannot drive a search
// (rejected before any random draw is made) and a Music Sink failure while
// encoding or writing the MIDI file. The search cores themselves never do
// I/O, so they only ever return `ConfigError`.

/// A configuration record that cannot be used to run a search.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid pitch range: max_note {max} is below min_note {min}")]
    InvalidPitchRange { min: u8, max: u8 },

    #[error("pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfMidiRange(u8),

    #[error("phrase_len must be at least 2, got {0}")]
    PhraseTooShort(usize),

    #[error("pop_size must be at least 2, got {0}")]
    PopulationTooSmall(usize),

    #[error("replace_count must lie in 1..={pop_size}, got {count}")]
    InvalidReplaceCount { count: usize, pop_size: usize },

    #[error("beta must be a finite value >= 1, got {0}")]
    InvalidBeta(f64),

    #[error("pheromone evaporation must lie strictly between 0 and 1, got {0}")]
    InvalidEvaporation(f64),

    #[error("pheromone strength must be finite and positive, got {0}")]
    InvalidPheromone(f64),

    #[error("note length must be finite and positive, got {0}")]
    InvalidNoteLength(f64),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure while turning a `Score` into a Standard MIDI File.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("program {0} is outside the MIDI range 0..=127")]
    InvalidProgram(u8),

    #[error("channel {0} is outside the MIDI range 0..=15")]
    InvalidChannel(u8),

    #[error("note pitch {0} is outside the MIDI range 0..=127")]
    InvalidPitch(u8),

    #[error("tempo of {0} BPM cannot be encoded")]
    InvalidTempo(u32),

    #[error("note duration must be finite and positive, got {0}")]
    InvalidDuration(f64),

    #[error("malformed MIDI data: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
