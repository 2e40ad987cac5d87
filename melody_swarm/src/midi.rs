// MIDI output from scores.
//
// Converts a `Score` into a Standard MIDI File (SMF Format 1, multi-track)
// using the `midly` crate. Track 0 carries the title and tempo; every part
// gets its own track with a program change on the part's channel followed by
// its notes. A phrase's notes play back to back from the phrase's start beat.
//
// Encoding is a pure function of the score, so equal scores always produce
// equal bytes. The whole file is encoded in memory before anything touches
// the filesystem, so a failed encode never leaves a partial file behind.

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

use crate::error::SinkError;
use crate::pitch::MIDI_MAX_PITCH;
use crate::score::{Part, Score};

/// Ticks per quarter note (one beat) in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Velocity of every note-on.
const VELOCITY: u8 = 100;

const MAX_CHANNEL: u8 = 15;

/// Largest value of a 7-bit MIDI data byte (program number).
const MAX_PROGRAM: u8 = 127;

/// Largest tempo meta value (microseconds per quarter) a 24-bit field holds.
const MAX_TEMPO_MICROS: u32 = (1 << 24) - 1;

/// Encode `score` and write it to `path`.
pub fn write_midi(score: &Score, path: &Path) -> Result<(), SinkError> {
    let bytes = encode(score)?;
    std::fs::write(path, &bytes)?;
    Ok(())
}

/// Encode `score` as the bytes of a Standard MIDI File.
pub fn encode(score: &Score) -> Result<Vec<u8>, SinkError> {
    let smf = score_to_smf(score)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Parse SMF bytes and count the sounding note-ons in every track.
pub fn read_note_counts(bytes: &[u8]) -> Result<Vec<usize>, SinkError> {
    let smf = Smf::parse(bytes).map_err(|e| SinkError::Malformed(e.to_string()))?;
    Ok(smf
        .tracks
        .iter()
        .map(|track| {
            track
                .iter()
                .filter(|event| {
                    matches!(
                        event.kind,
                        TrackEventKind::Midi {
                            message: MidiMessage::NoteOn { vel, .. },
                            ..
                        } if vel.as_int() > 0
                    )
                })
                .count()
        })
        .collect())
}

fn score_to_smf(score: &Score) -> Result<Smf<'_>, SinkError> {
    if score.tempo_bpm == 0 || 60_000_000 / score.tempo_bpm > MAX_TEMPO_MICROS {
        return Err(SinkError::InvalidTempo(score.tempo_bpm));
    }

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let tempo_micros = 60_000_000 / score.tempo_bpm;
    smf.tracks.push(vec![
        meta(MetaMessage::TrackName(score.title.as_bytes())),
        meta(MetaMessage::Tempo(u24::new(tempo_micros))),
        meta(MetaMessage::EndOfTrack),
    ]);

    for part in &score.parts {
        smf.tracks.push(part_to_track(part)?);
    }

    Ok(smf)
}

/// A note boundary at an absolute tick. Offs sort ahead of ons at the same tick.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Off(u8),
    On(u8),
}

fn part_to_track(part: &Part) -> Result<Track<'_>, SinkError> {
    if part.program > MAX_PROGRAM {
        return Err(SinkError::InvalidProgram(part.program));
    }
    if part.channel > MAX_CHANNEL {
        return Err(SinkError::InvalidChannel(part.channel));
    }
    let channel = u4::new(part.channel);

    let mut edges: Vec<(u32, Edge)> = Vec::with_capacity(part.note_count() * 2);
    for phrase in &part.phrases {
        let mut beat = phrase.start_beat;
        for note in &phrase.notes {
            if note.pitch > MIDI_MAX_PITCH {
                return Err(SinkError::InvalidPitch(note.pitch));
            }
            if !(note.duration.is_finite() && note.duration > 0.0) {
                return Err(SinkError::InvalidDuration(note.duration));
            }
            let on = beats_to_ticks(beat);
            beat += note.duration;
            // Very short notes still sound for one tick.
            let off = beats_to_ticks(beat).max(on + 1);
            edges.push((on, Edge::On(note.pitch)));
            edges.push((off, Edge::Off(note.pitch)));
        }
    }
    edges.sort_by_key(|&(tick, edge)| (tick, matches!(edge, Edge::On(_))));

    let mut track: Track<'_> = Vec::with_capacity(edges.len() + 3);
    track.push(meta(MetaMessage::TrackName(part.name.as_bytes())));
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(part.program),
            },
        },
    });

    let mut last_tick = 0;
    for (tick, edge) in edges {
        let message = match edge {
            Edge::On(pitch) => MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(VELOCITY),
            },
            Edge::Off(pitch) => MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            },
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(meta(MetaMessage::EndOfTrack));
    Ok(track)
}

fn meta(message: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(message),
    }
}

fn beats_to_ticks(beats: f64) -> u32 {
    (beats.max(0.0) * TICKS_PER_QUARTER as f64).round() as u32
}
