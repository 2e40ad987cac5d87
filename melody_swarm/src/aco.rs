// Ant colony melody search.
//
// The pitch range is a dense undirected graph: every pitch connects to every
// other pitch and to itself. Edge weights are pheromone levels held in a
// symmetric N x N matrix indexed by pitch offset. Two ant populations walk
// the graph:
//
// - Silent ants reinforce trails. They are stored as a count per pitch, since
//   only how many ants stand on a pitch matters.
// - Playing ants each own one slot of the melody. Every iteration each one
//   steps to a new pitch and that pitch is emitted as a note.
//
// An iteration runs, in order: silent movement, playing movement (emitting
// notes), the silent-ant buffer swap, then evaporation. Every traversal
// deposits pheromone immediately, so later ants in the same iteration already
// see the reinforced edges.
//
// The next pitch from `c` is drawn with probability proportional to
// `tau(c, k) * eta(c, k)` where `eta = (1 / (|c - k| + 1))^beta` favours
// small intervals.
//
// A `Colony` holds all state for one melody. `generate` builds one, runs it
// to completion and returns the phrase; tests drive `Colony::step` directly
// to inspect the matrix between iterations.

use log::{debug, log_enabled, trace, warn};
use melody_swarm_prng::MelodyRng;

use crate::config::AcoConfig;
use crate::error::ConfigError;
use crate::pitch::PitchRange;
use crate::score::Phrase;

/// Iterations between progress log lines.
const PROGRESS_INTERVAL: usize = 10;

/// Symmetric matrix of non-negative pheromone levels.
#[derive(Debug, Clone, PartialEq)]
pub struct PheromoneMatrix {
    size: usize,
    /// Row-major, `size * size` entries.
    levels: Vec<f64>,
}

impl PheromoneMatrix {
    /// A `size` x `size` matrix with every cell, diagonal included, at `initial`.
    pub fn new(size: usize, initial: f64) -> Self {
        PheromoneMatrix {
            size,
            levels: vec![initial; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.levels[from * self.size + to]
    }

    /// Add `amount` to the edge between two offsets. A self-loop has only one
    /// cell, so it is reinforced once.
    pub fn deposit(&mut self, from: usize, to: usize, amount: f64) {
        self.levels[from * self.size + to] += amount;
        if from != to {
            self.levels[to * self.size + from] += amount;
        }
    }

    /// Scale every cell by `1 - rate`.
    pub fn evaporate(&mut self, rate: f64) {
        let keep = 1.0 - rate;
        for level in &mut self.levels {
            *level *= keep;
        }
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| (i + 1..self.size).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Every edge once, as `(from, to, level)` with `to >= from`.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.size).flat_map(move |i| (i..self.size).map(move |j| (i, j, self.get(i, j))))
    }
}

/// Silent ants as a count per pitch offset.
///
/// Ants that have already moved this iteration land in `next`, so no ant is
/// moved twice. `swap` promotes `next` to `current` and clears the new `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentAnts {
    current: Vec<u32>,
    next: Vec<u32>,
}

impl SilentAnts {
    /// Drop `count` ants on uniformly random offsets in `0..slots`. Several
    /// ants may share an offset.
    pub fn scatter(slots: usize, count: usize, rng: &mut MelodyRng) -> Self {
        let mut current = vec![0; slots];
        for _ in 0..count {
            current[rng.range_usize(0, slots)] += 1;
        }
        SilentAnts {
            current,
            next: vec![0; slots],
        }
    }

    /// Ants waiting to move, per offset.
    pub fn counts(&self) -> &[u32] {
        &self.current
    }

    /// Ants in both buffers. Constant for the lifetime of a colony.
    pub fn total(&self) -> u64 {
        self.current
            .iter()
            .chain(&self.next)
            .map(|&c| c as u64)
            .sum()
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.fill(0);
    }
}

/// All state for one ant colony melody search.
#[derive(Debug, Clone)]
pub struct Colony {
    config: AcoConfig,
    range: PitchRange,
    pheromones: PheromoneMatrix,
    silent: SilentAnts,
    /// Current pitch of each playing ant, one per melody slot.
    playing: Vec<u8>,
    iterations_run: usize,
    fallback_warned: bool,
}

impl Colony {
    /// Validate `config`, then lay the initial pheromone and place the ants.
    pub fn new(config: &AcoConfig, rng: &mut MelodyRng) -> Result<Self, ConfigError> {
        let range = config.validate()?;
        let pheromones = PheromoneMatrix::new(range.len(), config.pheromone_str);
        let silent = SilentAnts::scatter(range.len(), config.num_ants_silent, rng);
        let playing = (0..config.num_notes_in_mel)
            .map(|_| range.random_pitch(rng))
            .collect();
        Ok(Colony {
            config: config.clone(),
            range,
            pheromones,
            silent,
            playing,
            iterations_run: 0,
            fallback_warned: false,
        })
    }

    pub fn pheromones(&self) -> &PheromoneMatrix {
        &self.pheromones
    }

    pub fn silent_ants(&self) -> &SilentAnts {
        &self.silent
    }

    pub fn playing_ants(&self) -> &[u8] {
        &self.playing
    }

    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    /// Run one full iteration, appending one note per playing ant to `melody`.
    pub fn step(&mut self, melody: &mut Phrase, rng: &mut MelodyRng) {
        if self.iterations_run % PROGRESS_INTERVAL == 0 {
            debug!("ant colony iteration {}", self.iterations_run);
        }
        self.move_silent(rng);
        self.move_playing(melody, rng);
        self.silent.swap();
        self.pheromones.evaporate(self.config.pheromone_evp);
        self.iterations_run += 1;
    }

    /// Run the remaining iterations and return the emitted melody.
    pub fn run(mut self, rng: &mut MelodyRng) -> Phrase {
        let mut melody = Phrase::new(0.0);
        melody.notes.reserve(self.config.melody_len());
        while self.iterations_run < self.config.max_iterations {
            self.step(&mut melody, rng);
        }
        if log_enabled!(log::Level::Trace) {
            for (i, j, level) in self.pheromones.upper_triangle() {
                trace!("P[{i}][{j}]: {level}");
            }
        }
        melody
    }

    fn move_silent(&mut self, rng: &mut MelodyRng) {
        for offset in 0..self.range.len() {
            let pitch = self.range.pitch_at(offset);
            while self.silent.current[offset] != 0 {
                let to = self.choose_next(pitch, rng);
                self.traverse(pitch, to);
                self.silent.current[offset] -= 1;
                self.silent.next[self.range.offset(to)] += 1;
            }
        }
    }

    fn move_playing(&mut self, melody: &mut Phrase, rng: &mut MelodyRng) {
        for slot in 0..self.playing.len() {
            let from = self.playing[slot];
            let to = self.choose_next(from, rng);
            self.traverse(from, to);
            self.playing[slot] = to;
            melody.add_note(to, self.config.note_len);
        }
    }

    fn traverse(&mut self, from: u8, to: u8) {
        self.pheromones.deposit(
            self.range.offset(from),
            self.range.offset(to),
            self.config.pheromone_str,
        );
    }

    /// Draw the next pitch for an ant standing on `current`.
    fn choose_next(&mut self, current: u8, rng: &mut MelodyRng) -> u8 {
        let from = self.range.offset(current);
        let weights: Vec<f64> = self
            .range
            .pitches()
            .map(|k| {
                let tau = self.pheromones.get(from, self.range.offset(k));
                tau * desirability(current, k, self.config.beta)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        if !(total.is_finite() && total > 0.0) {
            if !self.fallback_warned {
                warn!("pheromone total {total} unusable, choosing pitches uniformly");
                self.fallback_warned = true;
            }
            return self.range.random_pitch(rng);
        }

        let target = rng.next_f64();
        let mut cumulative = 0.0;
        for (offset, weight) in weights.iter().enumerate() {
            cumulative += weight / total;
            if cumulative >= target {
                return self.range.pitch_at(offset);
            }
        }
        // Rounding kept the running sum below the draw.
        self.range.max()
    }
}

/// Distance preference `(1 / (|current - candidate| + 1))^beta`. A repeated
/// pitch scores 1.
pub fn desirability(current: u8, candidate: u8, beta: f64) -> f64 {
    let distance = current.abs_diff(candidate) as f64;
    (1.0 / (distance + 1.0)).powf(beta)
}

/// Run a complete ant colony search and return its melody of
/// `max_iterations * num_notes_in_mel` notes.
pub fn generate(config: &AcoConfig, rng: &mut MelodyRng) -> Result<Phrase, ConfigError> {
    let colony = Colony::new(config, rng)?;
    Ok(colony.run(rng))
}
