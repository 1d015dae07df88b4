// Pixel Harmony Melody Generator
//
// Evolves short monophonic melodies with a genetic algorithm and writes the
// winner to MIDI. A melody is a fixed-length sequence of MIDI pitches drawn
// from one scale; the search keeps a population of them, scores each with a
// pluggable fitness evaluator, and breeds the next generation by tournament
// selection, single-point crossover and per-note mutation.
//
// Architecture:
// - scale.rs: Scales (C major/minor/pentatonic) and the boundary-note policy
// - population.rs: Random melodies, the population container, ranking
// - operators.rs: Tournament selection, crossover, mutation
// - fitness/: The `FitnessEvaluator` trait and its three built-in scorers
//   (heuristic, multi-criterion, rubric-driven with heuristic fallback)
// - evolve.rs: The generational loop with elitism, adaptive mutation and a
//   stagnation-based early stop
// - midi.rs: Standard MIDI File output for the winning melody
// - playback.rs: Optional audio preview, mock when no device is available
// - config.rs: JSON run configuration with defaults
// - error.rs: Error types shared by the modules above
//
// The generator is deterministic given a seed, supporting reproducible output.

pub mod config;
pub mod error;
pub mod evolve;
pub mod fitness;
pub mod midi;
pub mod operators;
pub mod playback;
pub mod population;
pub mod scale;

pub use config::RunConfig;
pub use error::{ConfigError, EvolveError, ExportError, RubricError};
pub use evolve::{EvolutionConfig, EvolutionOutcome, Evolver, Termination};
pub use fitness::{Evaluator, EvaluatorKind, FitnessEvaluator};
pub use population::{Melody, Population};
pub use scale::{Note, Scale, ScaleKind};
