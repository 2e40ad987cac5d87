// Music Sink data model: notes, phrases, parts and scores.
//
// The search cores produce `Phrase`s; the arrangement layer attaches them to
// `Part`s (one instrument on one MIDI channel) and collects the parts in a
// `Score` with a title and tempo. `midi.rs` encodes a finished `Score`.
//
// Durations are in beats (quarter notes), so a sixteenth note is 0.25.
// Once a phrase is handed to a part the cores no longer touch it.

/// Duration of a sixteenth note, in beats.
pub const SIXTEENTH: f64 = 0.25;

/// General MIDI program for Synth Bass 1 (zero-based).
pub const SYNTH_BASS: u8 = 38;

/// A single pitched note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// MIDI note number.
    pub pitch: u8,
    /// Length in beats.
    pub duration: f64,
}

impl Note {
    pub fn new(pitch: u8, duration: f64) -> Self {
        Note { pitch, duration }
    }
}

/// An ordered run of notes played back to back from `start_beat`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Phrase {
    pub start_beat: f64,
    pub notes: Vec<Note>,
}

impl Phrase {
    pub fn new(start_beat: f64) -> Self {
        Phrase {
            start_beat,
            notes: Vec::new(),
        }
    }

    /// Build a phrase starting at beat 0 from existing notes.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        Phrase {
            start_beat: 0.0,
            notes,
        }
    }

    pub fn add_note(&mut self, pitch: u8, duration: f64) {
        self.notes.push(Note::new(pitch, duration));
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.notes.iter().map(|n| n.pitch)
    }

    /// Total length of the phrase in beats.
    pub fn duration(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).sum()
    }
}

/// One instrument: a named program on a MIDI channel, holding phrases.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub program: u8,
    pub channel: u8,
    pub phrases: Vec<Phrase>,
}

impl Part {
    pub fn new(name: impl Into<String>, program: u8, channel: u8) -> Self {
        Part {
            name: name.into(),
            program,
            channel,
            phrases: Vec::new(),
        }
    }

    pub fn attach(&mut self, phrase: Phrase) {
        self.phrases.push(phrase);
    }

    /// Number of notes across all phrases.
    pub fn note_count(&self) -> usize {
        self.phrases.iter().map(Phrase::len).sum()
    }
}

/// A titled collection of parts at a fixed tempo.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub title: String,
    pub tempo_bpm: u32,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn new(title: impl Into<String>, tempo_bpm: u32) -> Self {
        Score {
            title: title.into(),
            tempo_bpm,
            parts: Vec::new(),
        }
    }

    pub fn attach(&mut self, part: Part) {
        self.parts.push(part);
    }
}
