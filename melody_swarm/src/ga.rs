// Genetic melody search.
//
// Each `Organism` carries one candidate phrase of `phrase_len` notes and its
// fitness. A `Population` evolves generationally: every epoch it sorts by
// fitness, builds a roulette from the fitness shares, and breeds a
// replacement generation (the whole population unless `replace_count` keeps
// the fittest). Each child takes two distinct roulette-selected
// parents, inherits every position from one of them with probability 0.5
// (uniform crossover), then mutates each note with probability
// 1 / phrase_len. With full replacement there is no elitism.
//
// The run ends when the best organism reaches `max_fitness` or after
// `max_epoch` generations, whichever comes first, and returns the best phrase.
//
// Fitness is pluggable through `Evaluator`; `ClimbingFitness` is the scoring
// used by the `ga` binary.

use log::{info, warn};
use melody_swarm_prng::MelodyRng;

use crate::config::{GaConfig, MutationStyle};
use crate::error::ConfigError;
use crate::pitch::PitchRange;
use crate::score::{Note, Phrase};

/// Epochs between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Scores a candidate phrase. Higher is better.
pub trait Evaluator {
    fn fitness(&self, phrase: &Phrase) -> f64;
}

/// Sum of successive intervals, plus a bonus of `phrase_len * 4/3` whenever
/// that sum falls short of `phrase_len`.
///
/// The interval sum telescopes to `last - first`, so phrases that end higher
/// than they start score higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimbingFitness {
    phrase_len: usize,
}

impl ClimbingFitness {
    pub fn new(phrase_len: usize) -> Self {
        ClimbingFitness { phrase_len }
    }
}

impl Evaluator for ClimbingFitness {
    fn fitness(&self, phrase: &Phrase) -> f64 {
        let climb: f64 = phrase
            .notes
            .windows(2)
            .map(|pair| pair[1].pitch as f64 - pair[0].pitch as f64)
            .sum();
        let len = self.phrase_len as f64;
        if climb < len {
            climb + len + len / 3.0
        } else {
            climb
        }
    }
}

/// One candidate melody and, once evaluated, its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Organism {
    phrase: Phrase,
    fitness: Option<f64>,
}

impl Organism {
    /// A phrase of `len` notes with uniformly random pitches.
    pub fn random(len: usize, range: PitchRange, note_len: f64, rng: &mut MelodyRng) -> Self {
        let notes = (0..len)
            .map(|_| Note::new(range.random_pitch(rng), note_len))
            .collect();
        Organism::from_phrase(Phrase::from_notes(notes))
    }

    pub fn from_phrase(phrase: Phrase) -> Self {
        Organism {
            phrase,
            fitness: None,
        }
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    pub fn into_phrase(self) -> Phrase {
        self.phrase
    }

    /// Fitness from the last evaluation, or `None` if the phrase changed since.
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn evaluate(&mut self, evaluator: &impl Evaluator) -> f64 {
        let fitness = evaluator.fitness(&self.phrase);
        self.fitness = Some(fitness);
        fitness
    }

    /// Replace this organism's phrase with a position-wise mix of two parents.
    ///
    /// Panics if the parents differ in length.
    pub fn uniform_crossover(&mut self, first: &Phrase, second: &Phrase, rng: &mut MelodyRng) {
        assert_eq!(
            first.len(),
            second.len(),
            "uniform_crossover: parents must have the same length"
        );
        let notes = first
            .notes
            .iter()
            .zip(&second.notes)
            .map(|(&a, &b)| if rng.random_bool(0.5) { a } else { b })
            .collect();
        self.phrase = Phrase::from_notes(notes);
        self.fitness = None;
    }

    /// Give each note a `1 / len` chance of a pitch change that stays inside
    /// `range`. Returns how many notes changed.
    pub fn mutate(
        &mut self,
        range: PitchRange,
        style: MutationStyle,
        rng: &mut MelodyRng,
    ) -> usize {
        let len = self.phrase.len();
        if len == 0 {
            return 0;
        }
        let rate = 1.0 / len as f64;
        let mut changed = 0;
        for note in &mut self.phrase.notes {
            if !rng.random_bool(rate) {
                continue;
            }
            if let Some(pitch) = perturb(note.pitch, range, style, rng) {
                note.pitch = pitch;
                changed += 1;
            }
        }
        if changed > 0 {
            self.fitness = None;
        }
        changed
    }

    fn score(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }
}

/// New pitch for a note selected for mutation, or `None` if no in-range
/// change exists.
fn perturb(pitch: u8, range: PitchRange, style: MutationStyle, rng: &mut MelodyRng) -> Option<u8> {
    match style {
        MutationStyle::Nudge => (pitch < range.max()).then_some(pitch + 1),
        MutationStyle::Shift { max_step } => {
            let span = (range.max() - range.min()) as i32;
            let step = max_step.map_or(span, |s| (s as i32).min(span));
            let low = (-step).max(range.min() as i32 - pitch as i32);
            let high = step.min(range.max() as i32 - pitch as i32);
            if low == 0 && high == 0 {
                return None;
            }
            // Draw from [low, high] without zero.
            let mut delta = rng.range_i32_inclusive(low, high - 1);
            if delta >= 0 {
                delta += 1;
            }
            Some((pitch as i32 + delta) as u8)
        }
    }
}

/// Normalized selection weights for one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Roulette {
    weights: Vec<f64>,
    uniform_fallback: bool,
}

impl Roulette {
    /// Weights proportional to fitness.
    ///
    /// Negative fitness shifts every weight up by the minimum so none is
    /// negative. If nothing is left to weigh (all zero, or not finite) the
    /// wheel is uniform and `is_fallback` reports it.
    pub fn new(fitnesses: &[f64]) -> Self {
        let min = fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let shift = if min < 0.0 { -min } else { 0.0 };
        let raw: Vec<f64> = fitnesses.iter().map(|f| f + shift).collect();
        let total: f64 = raw.iter().sum();

        if total.is_finite() && total > 0.0 {
            Roulette {
                weights: raw.iter().map(|w| w / total).collect(),
                uniform_fallback: false,
            }
        } else {
            let share = 1.0 / fitnesses.len().max(1) as f64;
            Roulette {
                weights: vec![share; fitnesses.len()],
                uniform_fallback: true,
            }
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn is_fallback(&self) -> bool {
        self.uniform_fallback
    }

    /// Index of the first entry whose cumulative weight reaches a uniform draw.
    pub fn spin(&self, rng: &mut MelodyRng) -> usize {
        let target = rng.next_f64();
        let mut cumulative = 0.0;
        for (i, weight) in self.weights.iter().enumerate() {
            cumulative += weight;
            if cumulative >= target {
                return i;
            }
        }
        self.weights.len() - 1
    }

    /// Spin over every entry except `excluded`, with the remaining weights
    /// renormalized. This draws from the same distribution as re-spinning
    /// until the result differs, in a single draw. When every other entry
    /// has zero weight, pick one of them uniformly instead.
    ///
    /// Panics with fewer than two entries.
    pub fn spin_excluding(&self, excluded: usize, rng: &mut MelodyRng) -> usize {
        assert!(self.weights.len() >= 2, "spin_excluding: need two entries");
        let last = if excluded == self.weights.len() - 1 {
            excluded - 1
        } else {
            self.weights.len() - 1
        };
        let others: f64 = self
            .weights
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != excluded)
            .map(|(_, w)| w)
            .sum();
        if !(others.is_finite() && others > 0.0) {
            let pick = rng.range_usize(0, self.weights.len() - 1);
            return if pick >= excluded { pick + 1 } else { pick };
        }

        let target = rng.next_f64() * others;
        let mut cumulative = 0.0;
        for (i, weight) in self.weights.iter().enumerate() {
            if i == excluded {
                continue;
            }
            cumulative += weight;
            if cumulative >= target {
                return i;
            }
        }
        last
    }
}

/// Outcome of an evolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct Evolution {
    /// Best phrase of the final population.
    pub phrase: Phrase,
    pub best_fitness: f64,
    /// Generations bred before stopping.
    pub epochs: usize,
}

/// A generation of organisms plus the settings that breed the next one.
#[derive(Debug, Clone)]
pub struct Population<E: Evaluator = ClimbingFitness> {
    config: GaConfig,
    range: PitchRange,
    evaluator: E,
    organisms: Vec<Organism>,
    /// Organisms replaced per epoch; the rest are the fittest survivors.
    replace_count: usize,
    fallback_warned: bool,
}

impl<E: Evaluator> Population<E> {
    /// Validate `config` and create `pop_size` evaluated random organisms.
    pub fn new(config: &GaConfig, evaluator: E, rng: &mut MelodyRng) -> Result<Self, ConfigError> {
        let range = config.validate()?;
        let organisms = (0..config.pop_size)
            .map(|_| {
                let mut org = Organism::random(config.phrase_len, range, config.note_len, rng);
                org.evaluate(&evaluator);
                org
            })
            .collect();
        Ok(Population {
            config: config.clone(),
            range,
            evaluator,
            organisms,
            replace_count: config.replace_count.unwrap_or(config.pop_size),
            fallback_warned: false,
        })
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub fn replace_count(&self) -> usize {
        self.replace_count
    }

    /// Order organisms by descending fitness. Ties keep their order.
    pub fn sort(&mut self) {
        self.organisms.sort_by(|a, b| b.score().total_cmp(&a.score()));
    }

    /// Highest fitness in the population.
    pub fn best_fitness(&self) -> f64 {
        self.organisms
            .iter()
            .map(Organism::score)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Breed a new generation from the current one and replace it.
    pub fn breed(&mut self, rng: &mut MelodyRng) {
        self.sort();
        let fitnesses: Vec<f64> = self.organisms.iter().map(Organism::score).collect();
        let roulette = Roulette::new(&fitnesses);
        if roulette.is_fallback() && !self.fallback_warned {
            warn!("total fitness is not positive, selecting parents uniformly");
            self.fallback_warned = true;
        }

        let children: Vec<Organism> = (0..self.replace_count)
            .map(|_| {
                let first = roulette.spin(rng);
                let second = roulette.spin_excluding(first, rng);
                let mut child = Organism::from_phrase(Phrase::new(0.0));
                child.uniform_crossover(
                    self.organisms[first].phrase(),
                    self.organisms[second].phrase(),
                    rng,
                );
                child.mutate(self.range, self.config.mutation, rng);
                child.evaluate(&self.evaluator);
                child
            })
            .collect();

        // Sorted above, so the survivors are the fittest.
        self.organisms.truncate(self.organisms.len() - self.replace_count);
        self.organisms.extend(children);
    }

    /// Evolve until the best organism reaches `max_fitness` or `max_epoch`
    /// generations have been bred, then return the best phrase.
    pub fn evolve(mut self, rng: &mut MelodyRng) -> Evolution {
        let mut epoch = 0;
        loop {
            self.sort();
            let best = self.best_fitness();
            if best >= self.config.max_fitness {
                info!("fitness target {} reached at epoch {epoch}", self.config.max_fitness);
                break;
            }
            if epoch >= self.config.max_epoch {
                break;
            }
            if epoch % PROGRESS_INTERVAL == 0 {
                info!("epoch {epoch}: best fitness {best:.2}");
            }
            self.breed(rng);
            epoch += 1;
        }
        self.sort();

        let best_fitness = self.best_fitness();
        let phrase = self.organisms.swap_remove(0).into_phrase();
        Evolution {
            phrase,
            best_fitness,
            epochs: epoch,
        }
    }
}

/// Run a complete genetic search with `ClimbingFitness`.
pub fn evolve(config: &GaConfig, rng: &mut MelodyRng) -> Result<Evolution, ConfigError> {
    let population = Population::new(config, ClimbingFitness::new(config.phrase_len), rng)?;
    Ok(population.evolve(rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(pitches: &[u8]) -> Phrase {
        Phrase::from_notes(pitches.iter().map(|&p| Note::new(p, 0.25)).collect())
    }

    fn range(min: u8, max: u8) -> PitchRange {
        PitchRange::new(min, max).unwrap()
    }

    #[test]
    fn test_climbing_fitness() {
        let eval = ClimbingFitness::new(4);
        // Climbs 6, which is at least the phrase length: no bonus.
        assert_eq!(eval.fitness(&phrase(&[60, 62, 64, 66])), 6.0);
        // Climbs 1: bonus of 4 + 4/3.
        let f = eval.fitness(&phrase(&[60, 70, 50, 61]));
        assert!((f - (1.0 + 4.0 + 4.0 / 3.0)).abs() < 1e-12);
        // Descending phrases go negative before the bonus.
        let f = ClimbingFitness::new(2).fitness(&phrase(&[66, 60]));
        assert!((f - (-6.0 + 2.0 + 2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_random_organism_in_range() {
        let mut rng = MelodyRng::new(4);
        let org = Organism::random(50, range(60, 70), 0.25, &mut rng);
        assert_eq!(org.phrase().len(), 50);
        assert!(org.phrase().pitches().all(|p| (60..=70).contains(&p)));
        assert!(org.phrase().notes.iter().all(|n| n.duration == 0.25));
        assert_eq!(org.fitness(), None);
    }

    #[test]
    fn test_crossover_of_identical_parents() {
        let parent = phrase(&[60, 62, 64, 66]);
        for seed in 0..20 {
            let mut rng = MelodyRng::new(seed);
            let mut child = Organism::from_phrase(Phrase::new(0.0));
            child.uniform_crossover(&parent, &parent, &mut rng);
            assert_eq!(child.phrase().pitches().collect::<Vec<_>>(), vec![60, 62, 64, 66]);
        }
    }

    #[test]
    fn test_crossover_takes_each_position_from_a_parent() {
        let a = phrase(&[60; 64]);
        let b = phrase(&[70; 64]);
        let mut rng = MelodyRng::new(9);
        let mut child = Organism::from_phrase(Phrase::new(0.0));
        child.evaluate(&ClimbingFitness::new(64));
        child.uniform_crossover(&a, &b, &mut rng);
        assert_eq!(child.fitness(), None);
        let from_a = child.phrase().pitches().filter(|&p| p == 60).count();
        let from_b = child.phrase().pitches().filter(|&p| p == 70).count();
        assert_eq!(from_a + from_b, 64);
        assert!(from_a > 10 && from_b > 10, "a={from_a} b={from_b}");
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_crossover_length_mismatch_panics() {
        let mut rng = MelodyRng::new(0);
        let mut child = Organism::from_phrase(Phrase::new(0.0));
        child.uniform_crossover(&phrase(&[60, 61]), &phrase(&[60]), &mut rng);
    }

    #[test]
    fn test_mutation_stays_in_range() {
        let r = range(60, 64);
        let mut rng = MelodyRng::new(12);
        let styles = [
            MutationStyle::default(),
            MutationStyle::Shift { max_step: Some(1) },
            MutationStyle::Nudge,
        ];
        for style in styles {
            let mut org = Organism::random(8, r, 0.25, &mut rng);
            for _ in 0..500 {
                let before: Vec<u8> = org.phrase().pitches().collect();
                let changed = org.mutate(r, style, &mut rng);
                let after: Vec<u8> = org.phrase().pitches().collect();
                let differing = before.iter().zip(&after).filter(|(a, b)| a != b).count();
                assert_eq!(differing, changed);
                assert!(after.iter().all(|&p| r.contains(p)), "{style:?}: {after:?}");
                if style == (MutationStyle::Shift { max_step: Some(1) }) {
                    assert!(before.iter().zip(&after).all(|(a, b)| a.abs_diff(*b) <= 1));
                }
            }
        }
    }

    #[test]
    fn test_mutation_rate_is_one_per_phrase() {
        let r = range(60, 70);
        let mut rng = MelodyRng::new(77);
        let mut org = Organism::random(40, r, 0.25, &mut rng);
        let trials = 2_000;
        let total: usize = (0..trials)
            .map(|_| org.mutate(r, MutationStyle::default(), &mut rng))
            .sum();
        let mean = total as f64 / trials as f64;
        assert!((0.8..1.2).contains(&mean), "mean changes per mutation {mean}");
    }

    #[test]
    fn test_shift_never_drops_edge_pitches() {
        // At the top of the range every selected note must still move down.
        let r = range(60, 61);
        let mut rng = MelodyRng::new(3);
        for _ in 0..100 {
            assert_eq!(perturb(61, r, MutationStyle::default(), &mut rng), Some(60));
            assert_eq!(perturb(60, r, MutationStyle::default(), &mut rng), Some(61));
        }
        assert_eq!(perturb(61, r, MutationStyle::Nudge, &mut rng), None);
        assert_eq!(perturb(60, r, MutationStyle::Nudge, &mut rng), Some(61));
        let single = range(60, 60);
        assert_eq!(perturb(60, single, MutationStyle::default(), &mut rng), None);
    }

    #[test]
    fn test_roulette_normalizes() {
        let roulette = Roulette::new(&[3.0, 1.0, 0.0, 4.0]);
        assert!(!roulette.is_fallback());
        let sum: f64 = roulette.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(roulette.weights(), &[0.375, 0.125, 0.0, 0.5]);
    }

    #[test]
    fn test_roulette_shifts_negative_fitness() {
        let roulette = Roulette::new(&[2.0, -2.0, 0.0]);
        assert!(!roulette.is_fallback());
        assert!(roulette.weights().iter().all(|&w| w >= 0.0));
        assert_eq!(roulette.weights()[1], 0.0);
        let sum: f64 = roulette.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_roulette_uniform_fallback() {
        let roulette = Roulette::new(&[0.0, 0.0, 0.0, 0.0]);
        assert!(roulette.is_fallback());
        assert_eq!(roulette.weights(), &[0.25; 4]);
        let roulette = Roulette::new(&[-5.0, -5.0]);
        assert!(roulette.is_fallback());
    }

    #[test]
    fn test_spin_follows_weights() {
        let roulette = Roulette::new(&[1.0, 0.0, 9.0]);
        let mut rng = MelodyRng::new(6);
        let mut counts = [0usize; 3];
        for _ in 0..5_000 {
            counts[roulette.spin(&mut rng)] += 1;
        }
        assert_eq!(counts[1], 0);
        assert!(counts[2] > counts[0] * 5, "{counts:?}");
    }

    #[test]
    fn test_spin_excluding_returns_distinct_parent() {
        let mut rng = MelodyRng::new(10);
        let roulette = Roulette::new(&[5.0, 1.0, 1.0]);
        for _ in 0..200 {
            let first = roulette.spin(&mut rng);
            assert_ne!(roulette.spin_excluding(first, &mut rng), first);
        }
        // All weight on one organism: the other parent comes uniformly.
        let lopsided = Roulette::new(&[0.0, 7.0, 0.0]);
        for _ in 0..200 {
            let second = lopsided.spin_excluding(1, &mut rng);
            assert!(second == 0 || second == 2);
        }
    }

    #[test]
    fn test_spin_excluding_with_negligible_others() {
        // The first weight normalizes to 1.0, so a plain spin never leaves it.
        let roulette = Roulette::new(&[1e17, 1.0]);
        assert_eq!(roulette.weights()[0], 1.0);
        let mut rng = MelodyRng::new(0);
        for _ in 0..1_000 {
            assert_eq!(roulette.spin_excluding(0, &mut rng), 1);
        }
    }

    #[test]
    fn test_spin_excluding_renormalizes_remaining_weights() {
        let roulette = Roulette::new(&[6.0, 1.0, 3.0]);
        let mut rng = MelodyRng::new(21);
        let mut counts = [0usize; 3];
        for _ in 0..8_000 {
            counts[roulette.spin_excluding(0, &mut rng)] += 1;
        }
        assert_eq!(counts[0], 0);
        // Expected split 1:3 between the other two.
        let share = counts[2] as f64 / 8_000.0;
        assert!((0.70..0.80).contains(&share), "{counts:?}");
    }

    #[test]
    fn test_zero_epochs_returns_best_initial() {
        let config = GaConfig {
            pop_size: 2,
            phrase_len: 2,
            min_note: 60,
            max_note: 61,
            max_epoch: 0,
            ..GaConfig::default()
        };
        let mut rng = MelodyRng::new(0);
        let population = Population::new(&config, ClimbingFitness::new(2), &mut rng).unwrap();
        let initial: Vec<Organism> = population.organisms().to_vec();
        let top = initial
            .iter()
            .map(Organism::score)
            .fold(f64::NEG_INFINITY, f64::max);
        let result = population.evolve(&mut rng);
        assert_eq!(result.epochs, 0);
        assert_eq!(result.best_fitness, top);
        assert!(
            initial
                .iter()
                .any(|o| o.score() == top && o.phrase() == &result.phrase),
            "result must be an unchanged top organism"
        );
    }

    #[test]
    fn test_full_run_keeps_invariants() {
        let config = GaConfig {
            pop_size: 10,
            phrase_len: 120,
            min_note: 60,
            max_note: 70,
            max_epoch: 100,
            ..GaConfig::default()
        };
        let mut rng = MelodyRng::new(2024);
        let result = evolve(&config, &mut rng).unwrap();
        assert!(result.epochs <= 100);
        assert_eq!(result.phrase.len(), 120);
        assert!(result.phrase.pitches().all(|p| (60..=70).contains(&p)));
        assert!(result.phrase.notes.iter().all(|n| n.duration == config.note_len));
    }

    #[test]
    fn test_early_stop_on_fitness_target() {
        // No six-note phrase in 60..=70 scores below -2.
        let config = GaConfig {
            phrase_len: 6,
            max_fitness: -100.0,
            ..GaConfig::default()
        };
        let result = evolve(&config, &mut MelodyRng::new(1)).unwrap();
        assert_eq!(result.epochs, 0);
    }

    #[test]
    fn test_breed_replaces_whole_generation() {
        let config = GaConfig {
            pop_size: 6,
            phrase_len: 16,
            ..GaConfig::default()
        };
        let mut rng = MelodyRng::new(55);
        let mut population = Population::new(&config, ClimbingFitness::new(16), &mut rng).unwrap();
        assert_eq!(population.replace_count(), 6);
        population.breed(&mut rng);
        assert_eq!(population.organisms().len(), 6);
        assert!(population.organisms().iter().all(|o| o.fitness().is_some()));
    }

    #[test]
    fn test_partial_replacement_keeps_fittest() {
        let config = GaConfig {
            pop_size: 6,
            phrase_len: 16,
            replace_count: Some(2),
            ..GaConfig::default()
        };
        let mut rng = MelodyRng::new(31);
        let mut population = Population::new(&config, ClimbingFitness::new(16), &mut rng).unwrap();
        assert_eq!(population.replace_count(), 2);
        population.sort();
        let fittest: Vec<Organism> = population.organisms()[..4].to_vec();
        population.breed(&mut rng);
        assert_eq!(population.organisms().len(), 6);
        assert_eq!(&population.organisms()[..4], fittest.as_slice());
        assert!(population.organisms().iter().all(|o| o.fitness().is_some()));
    }

    #[test]
    fn test_same_seed_same_result() {
        let config = GaConfig {
            phrase_len: 24,
            max_epoch: 20,
            ..GaConfig::default()
        };
        let a = evolve(&config, &mut MelodyRng::new(8)).unwrap();
        let b = evolve(&config, &mut MelodyRng::new(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GaConfig {
            pop_size: 1,
            ..GaConfig::default()
        };
        assert!(matches!(
            evolve(&config, &mut MelodyRng::new(0)),
            Err(ConfigError::PopulationTooSmall(1))
        ));
    }
}
