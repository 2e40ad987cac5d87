// Pitch domain shared by both search cores.
//
// A `PitchRange` is an inclusive span of MIDI note numbers. The ant colony
// indexes its pheromone matrix and silent-ant counts by offset into the
// range (`pitch - min`), so conversions between the two live here.

use melody_swarm_prng::MelodyRng;

use crate::error::ConfigError;

/// Highest valid MIDI note number.
pub const MIDI_MAX_PITCH: u8 = 127;

/// Inclusive range of MIDI pitches `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    min: u8,
    max: u8,
}

impl PitchRange {
    /// Build a range, rejecting inverted bounds and pitches beyond 127.
    pub fn new(min: u8, max: u8) -> Result<Self, ConfigError> {
        if max < min {
            return Err(ConfigError::InvalidPitchRange { min, max });
        }
        if max > MIDI_MAX_PITCH {
            return Err(ConfigError::PitchOutOfMidiRange(max));
        }
        Ok(PitchRange { min, max })
    }

    pub fn min(self) -> u8 {
        self.min
    }

    pub fn max(self) -> u8 {
        self.max
    }

    /// Number of pitches in the range (N in the pheromone matrix).
    pub fn len(self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// A range always holds at least one pitch.
    pub fn is_empty(self) -> bool {
        false
    }

    pub fn contains(self, pitch: u8) -> bool {
        (self.min..=self.max).contains(&pitch)
    }

    /// Offset of `pitch` from the bottom of the range.
    pub fn offset(self, pitch: u8) -> usize {
        debug_assert!(self.contains(pitch), "pitch {pitch} outside {:?}", self);
        (pitch - self.min) as usize
    }

    /// Pitch at `offset` from the bottom of the range.
    pub fn pitch_at(self, offset: usize) -> u8 {
        debug_assert!(offset < self.len(), "offset {offset} outside {:?}", self);
        self.min + offset as u8
    }

    /// Uniformly random pitch in the range.
    pub fn random_pitch(self, rng: &mut MelodyRng) -> u8 {
        rng.range_u8_inclusive(self.min, self.max)
    }

    /// Iterate every pitch from `min` to `max`.
    pub fn pitches(self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }
}
