// Generational genetic algorithm over melodies.
//
// One run: build a random population, then per generation
//   1. rank every melody with the fitness evaluator (best first, stable),
//   2. update best-ever score and the stagnation counter,
//   3. adapt the mutation rate (optional),
//   4. breed the next population: elites copied unchanged, the rest either
//      a crossover child of two tournament winners or a fresh random
//      melody, then mutated at the current rate.
// The run ends when the generation budget is spent (BudgetExhausted) or the
// stagnation counter reaches its limit (Converged). The best melody of the
// final, freshly ranked population is returned.
//
// An internal failure (an operator rejecting its input, an evaluator
// producing NaN) aborts the run. `Evolver::run` never propagates it: the
// outcome carries `Termination::Failed` and a fresh random melody, so the
// caller always gets something to play.
//
// Everything is synchronous and single-threaded apart from optional rayon
// scoring inside population.rs. All randomness comes from the one
// `HarmonyRng` passed in, so a fixed seed reproduces the run exactly.

use crate::error::EvolveError;
use crate::fitness::FitnessEvaluator;
use crate::operators::{DEFAULT_TOURNAMENT_SIZE, crossover, mutate, tournament_select};
use crate::population::{Melody, Population, Scored, random_melody};
use crate::scale::{BoundaryPolicy, Scale};
use pixel_harmony_prng::HarmonyRng;
use serde::{Deserialize, Serialize};

/// Stagnation-driven mutation-rate control.
///
/// While the search is stuck (stagnation above `stagnation_threshold`) the
/// rate grows by `increase` up to `ceiling`; otherwise it decays by `decay`
/// down to `floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveMutation {
    pub enabled: bool,
    pub stagnation_threshold: usize,
    pub increase: f64,
    pub decay: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for AdaptiveMutation {
    fn default() -> Self {
        AdaptiveMutation {
            enabled: true,
            stagnation_threshold: 20,
            increase: 1.1,
            decay: 0.9,
            floor: 0.1,
            ceiling: 0.5,
        }
    }
}

impl AdaptiveMutation {
    /// A profile that never changes the rate.
    pub fn fixed() -> Self {
        AdaptiveMutation {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn next_rate(&self, rate: f64, stagnation: usize) -> f64 {
        if !self.enabled {
            rate
        } else if stagnation > self.stagnation_threshold {
            (rate * self.increase).min(self.ceiling)
        } else {
            (rate * self.decay).max(self.floor)
        }
    }
}

/// Parameters of one evolutionary run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Notes per melody.
    pub length: usize,
    pub population_size: usize,
    /// Generation budget.
    pub generations: usize,
    /// Starting mutation rate.
    pub mutation_rate: f64,
    pub tournament_size: usize,
    /// Top melodies copied unchanged into the next generation.
    pub elitism: usize,
    /// Chance that a non-elite slot is a crossover child rather than a
    /// fresh random melody.
    pub crossover_probability: f64,
    /// Stop once this many consecutive generations fail to improve.
    pub stagnation_limit: usize,
    pub adaptive: AdaptiveMutation,
    pub boundary: BoundaryPolicy,
    /// Score each generation on the rayon pool.
    pub parallel_scoring: bool,
    /// Emit a debug log line every this many generations (0 disables).
    pub log_every: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            length: 16,
            population_size: 50,
            generations: 500,
            mutation_rate: 0.1,
            tournament_size: DEFAULT_TOURNAMENT_SIZE,
            elitism: 2,
            crossover_probability: 0.7,
            stagnation_limit: 100,
            adaptive: AdaptiveMutation::default(),
            boundary: BoundaryPolicy::default(),
            parallel_scoring: false,
            log_every: 10,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        let unit = 0.0..=1.0;
        if self.length < 2 {
            return Err(EvolveError::invalid(format!(
                "melody length must be at least 2, got {}",
                self.length
            )));
        }
        if self.population_size == 0 {
            return Err(EvolveError::invalid("population size must be at least 1"));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(EvolveError::invalid(format!(
                "tournament size {} must be in 1..={}",
                self.tournament_size, self.population_size
            )));
        }
        if self.elitism > self.population_size {
            return Err(EvolveError::invalid(format!(
                "elitism {} exceeds population size {}",
                self.elitism, self.population_size
            )));
        }
        if !unit.contains(&self.mutation_rate) {
            return Err(EvolveError::invalid(format!(
                "mutation rate {} outside [0, 1]",
                self.mutation_rate
            )));
        }
        if !unit.contains(&self.crossover_probability) {
            return Err(EvolveError::invalid(format!(
                "crossover probability {} outside [0, 1]",
                self.crossover_probability
            )));
        }
        let a = &self.adaptive;
        if a.enabled
            && !(a.floor >= 0.0 && a.floor <= a.ceiling && a.ceiling <= 1.0 && a.increase > 0.0 && a.decay > 0.0)
        {
            return Err(EvolveError::invalid(format!(
                "adaptive mutation needs 0 <= floor <= ceiling <= 1 and positive factors, got {a:?}"
            )));
        }
        Ok(())
    }
}

/// Per-run mutable bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionState {
    /// Generations evaluated so far.
    pub generation: usize,
    pub best_ever: f64,
    /// Consecutive generations without a strictly better best score.
    pub stagnation: usize,
    pub mutation_rate: f64,
}

impl EvolutionState {
    fn new(mutation_rate: f64) -> Self {
        EvolutionState {
            generation: 0,
            best_ever: f64::NEG_INFINITY,
            stagnation: 0,
            mutation_rate,
        }
    }

    /// Fold in this generation's best score.
    fn record(&mut self, generation_best: f64) {
        if generation_best > self.best_ever {
            self.best_ever = generation_best;
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
    }
}

/// Telemetry for one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    /// Best score within this generation.
    pub best: f64,
    pub best_ever: f64,
    pub stagnation: usize,
    /// Rate that will be applied when breeding the next generation.
    pub mutation_rate: f64,
}

/// Receives per-generation telemetry while a run is in progress.
pub trait EvolutionObserver {
    fn on_generation(&mut self, stats: &GenerationStats);
}

/// Keeps every generation's stats in order.
#[derive(Debug, Default, Clone)]
pub struct HistoryRecorder {
    pub stats: Vec<GenerationStats>,
}

impl EvolutionObserver for HistoryRecorder {
    fn on_generation(&mut self, stats: &GenerationStats) {
        self.stats.push(stats.clone());
    }
}

struct NullObserver;

impl EvolutionObserver for NullObserver {
    fn on_generation(&mut self, _stats: &GenerationStats) {}
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Stagnation limit reached.
    Converged,
    /// Generation budget spent.
    BudgetExhausted,
    /// Internal failure; the outcome holds a fallback melody.
    Failed(EvolveError),
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub best: Melody,
    /// Score of `best`. For a failed run this is the fallback's score, which
    /// may itself be non-finite if the evaluator was the problem.
    pub best_score: f64,
    pub generations_run: usize,
    pub termination: Termination,
    pub history: Vec<GenerationStats>,
}

/// Runs the genetic algorithm for a validated configuration and scale.
#[derive(Debug, Clone)]
pub struct Evolver {
    config: EvolutionConfig,
    scale: Scale,
}

impl Evolver {
    pub fn new(config: EvolutionConfig, scale: Scale) -> Result<Self, EvolveError> {
        config.validate()?;
        Ok(Evolver { config, scale })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Evolve a melody. Never fails; see `Termination::Failed`.
    pub fn run(
        &self,
        evaluator: &dyn FitnessEvaluator,
        rng: &mut HarmonyRng,
        observer: Option<&mut dyn EvolutionObserver>,
    ) -> EvolutionOutcome {
        let mut null = NullObserver;
        let observer: &mut dyn EvolutionObserver = match observer {
            Some(o) => o,
            None => &mut null,
        };
        let mut state = EvolutionState::new(self.config.mutation_rate);
        let mut history = Vec::new();

        match self.search(evaluator, rng, observer, &mut state, &mut history) {
            Ok((best, termination)) => {
                tracing::info!(
                    evaluator = evaluator.name(),
                    generations = state.generation,
                    best_score = best.score,
                    ?termination,
                    "evolution finished"
                );
                EvolutionOutcome {
                    best: best.melody,
                    best_score: best.score,
                    generations_run: state.generation,
                    termination,
                    history,
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    generation = state.generation,
                    "evolution aborted, returning a random melody"
                );
                let best = random_melody(self.config.length, &self.scale, self.config.boundary, rng);
                let best_score = evaluator.score(&best);
                EvolutionOutcome {
                    best,
                    best_score,
                    generations_run: state.generation,
                    termination: Termination::Failed(e),
                    history,
                }
            }
        }
    }

    fn search(
        &self,
        evaluator: &dyn FitnessEvaluator,
        rng: &mut HarmonyRng,
        observer: &mut dyn EvolutionObserver,
        state: &mut EvolutionState,
        history: &mut Vec<GenerationStats>,
    ) -> Result<(Scored, Termination), EvolveError> {
        let cfg = &self.config;
        let mut population = Population::random(
            cfg.population_size,
            cfg.length,
            &self.scale,
            cfg.boundary,
            rng,
        )?;

        loop {
            let ranked = population.rank(evaluator, cfg.parallel_scoring)?;
            let Some(generation_best) = ranked.first().map(|s| s.score) else {
                return Err(EvolveError::Internal("ranked an empty population".into()));
            };

            if state.generation >= cfg.generations {
                return Ok((take_best(ranked)?, Termination::BudgetExhausted));
            }

            state.record(generation_best);
            state.mutation_rate = cfg.adaptive.next_rate(state.mutation_rate, state.stagnation);

            let stats = GenerationStats {
                generation: state.generation,
                best: generation_best,
                best_ever: state.best_ever,
                stagnation: state.stagnation,
                mutation_rate: state.mutation_rate,
            };
            if cfg.log_every > 0 && state.generation % cfg.log_every == 0 {
                tracing::debug!(
                    generation = stats.generation,
                    best = stats.best,
                    best_ever = stats.best_ever,
                    mutation_rate = stats.mutation_rate,
                    "generation"
                );
            }
            observer.on_generation(&stats);
            history.push(stats);
            state.generation += 1;

            if state.stagnation >= cfg.stagnation_limit {
                tracing::info!(
                    stagnation = state.stagnation,
                    "stopping early, no improvement"
                );
                return Ok((take_best(ranked)?, Termination::Converged));
            }

            population = self.breed(ranked, state.mutation_rate, rng)?;
        }
    }

    /// Build the next generation from a ranked one.
    fn breed(
        &self,
        ranked: Vec<Scored>,
        mutation_rate: f64,
        rng: &mut HarmonyRng,
    ) -> Result<Population, EvolveError> {
        let cfg = &self.config;
        let (parents, scores): (Vec<Melody>, Vec<f64>) =
            ranked.into_iter().map(|s| (s.melody, s.score)).unzip();

        let mut next: Vec<Melody> = Vec::with_capacity(cfg.population_size);
        next.extend(parents.iter().take(cfg.elitism).cloned());

        while next.len() < cfg.population_size {
            let child = if rng.random_bool(cfg.crossover_probability) {
                let a = tournament_select(&parents, &scores, cfg.tournament_size, rng)?;
                let b = tournament_select(&parents, &scores, cfg.tournament_size, rng)?;
                crossover(a, b, rng)?
            } else {
                random_melody(cfg.length, &self.scale, cfg.boundary, rng)
            };
            next.push(mutate(&child, mutation_rate, &self.scale, rng)?);
        }

        Population::from_melodies(next)
    }
}

fn take_best(ranked: Vec<Scored>) -> Result<Scored, EvolveError> {
    ranked
        .into_iter()
        .next()
        .ok_or_else(|| EvolveError::Internal("no melody to return".into()))
}
