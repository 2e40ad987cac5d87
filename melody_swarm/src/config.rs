// Search configuration for both cores.
//
// Every tunable lives in `AcoConfig` or `GaConfig`; the cores never use magic
// numbers. Each record is handed to one search invocation, so running the ant
// colony for several instruments means building one config per instrument
// (see `AcoConfig::with_range`) rather than mutating shared state.
//
// Both configs deserialize from JSON with every field optional, falling back
// to the defaults below. `validate()` is called at core entry; a record that
// fails validation never reaches the random stream.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pitch::PitchRange;
use crate::score::SIXTEENTH;

// ---------------------------------------------------------------------------
// Ant colony
// ---------------------------------------------------------------------------

/// Parameters for one ant colony melody search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcoConfig {
    /// Lowest pitch the ants may visit.
    pub min_note: u8,
    /// Highest pitch the ants may visit (inclusive).
    pub max_note: u8,
    /// Duration in beats of every emitted note.
    pub note_len: f64,
    /// Initial pheromone on every edge, and the amount added per traversal.
    pub pheromone_str: f64,
    /// Fraction of pheromone lost on every edge per iteration, in (0, 1).
    pub pheromone_evp: f64,
    /// Exponent on the distance desirability `1 / (|c - k| + 1)`. At least 1.
    pub beta: f64,
    /// Reinforcing ants that walk and deposit but never play.
    pub num_ants_silent: usize,
    /// Playing ants; each emits one note per iteration.
    pub num_notes_in_mel: usize,
    /// Iterations to run. The melody has `max_iterations * num_notes_in_mel` notes.
    pub max_iterations: usize,
}

impl Default for AcoConfig {
    fn default() -> Self {
        AcoConfig {
            min_note: 60,
            max_note: 70,
            note_len: SIXTEENTH,
            pheromone_str: 0.1,
            pheromone_evp: 0.01,
            beta: 1.5,
            num_ants_silent: 10,
            num_notes_in_mel: 8,
            max_iterations: 40,
        }
    }
}

impl AcoConfig {
    /// Copy of this config restricted to a different pitch range.
    pub fn with_range(&self, min_note: u8, max_note: u8) -> Self {
        AcoConfig {
            min_note,
            max_note,
            ..self.clone()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every parameter, returning the validated pitch range.
    pub fn validate(&self) -> Result<PitchRange, ConfigError> {
        let range = PitchRange::new(self.min_note, self.max_note)?;
        validate_note_len(self.note_len)?;
        if !(self.pheromone_str.is_finite() && self.pheromone_str > 0.0) {
            return Err(ConfigError::InvalidPheromone(self.pheromone_str));
        }
        if !(self.pheromone_evp > 0.0 && self.pheromone_evp < 1.0) {
            return Err(ConfigError::InvalidEvaporation(self.pheromone_evp));
        }
        if !(self.beta.is_finite() && self.beta >= 1.0) {
            return Err(ConfigError::InvalidBeta(self.beta));
        }
        Ok(range)
    }

    /// Length of the phrase one search produces.
    pub fn melody_len(&self) -> usize {
        self.max_iterations * self.num_notes_in_mel
    }
}

// ---------------------------------------------------------------------------
// Genetic algorithm
// ---------------------------------------------------------------------------

/// How `Organism::mutate` perturbs a selected note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationStyle {
    /// Add a non-zero delta drawn uniformly from the deltas in
    /// `[-max_step, max_step]` that keep the pitch in range. `None` means the
    /// full span of the range.
    Shift { max_step: Option<u8> },
    /// Raise the pitch one semitone when that stays in range, otherwise leave
    /// the note alone. Every selected note below the top of the range moves
    /// up, so this drifts melodies upward.
    Nudge,
}

impl Default for MutationStyle {
    fn default() -> Self {
        MutationStyle::Shift { max_step: None }
    }
}

/// Parameters for one genetic melody search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    pub min_note: u8,
    pub max_note: u8,
    pub note_len: f64,
    /// Notes per organism. At least 2.
    pub phrase_len: usize,
    /// Upper bound on generations.
    pub max_epoch: usize,
    /// The run stops early once the best organism reaches this fitness.
    pub max_fitness: f64,
    /// Organisms per generation. At least 2.
    pub pop_size: usize,
    /// Children bred per epoch, replacing the least fit organisms. `None`
    /// replaces the whole population.
    pub replace_count: Option<usize>,
    pub mutation: MutationStyle,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            min_note: 60,
            max_note: 70,
            note_len: SIXTEENTH,
            phrase_len: 120,
            max_epoch: 100,
            max_fitness: 999.93,
            pop_size: 10,
            replace_count: None,
            mutation: MutationStyle::default(),
        }
    }
}

impl GaConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every parameter, returning the validated pitch range.
    pub fn validate(&self) -> Result<PitchRange, ConfigError> {
        let range = PitchRange::new(self.min_note, self.max_note)?;
        validate_note_len(self.note_len)?;
        if self.phrase_len < 2 {
            return Err(ConfigError::PhraseTooShort(self.phrase_len));
        }
        if self.pop_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.pop_size));
        }
        match self.replace_count {
            Some(count) if count == 0 || count > self.pop_size => {
                Err(ConfigError::InvalidReplaceCount {
                    count,
                    pop_size: self.pop_size,
                })
            }
            _ => Ok(range),
        }
    }
}

fn validate_note_len(note_len: f64) -> Result<(), ConfigError> {
    if note_len.is_finite() && note_len > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidNoteLength(note_len))
    }
}
