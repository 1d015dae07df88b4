// Pixel Harmony Melody Generator, CLI entry point.
//
// Evolves one melody and writes it to MIDI. The pipeline: load config →
// build evaluator → genetic search → MIDI output → optional preview.
//
// Usage:
//   cargo run -p pixel_harmony_music -- [output.mid] [--config run.json]
//     [--length N] [--population N] [--generations N] [--mutation-rate R]
//     [--crossover-probability P] [--stagnation-limit N] [--fixed-mutation]
//     [--free-boundary] [--parallel] [--seed N] [--scale SCALE]
//     [--evaluator KIND] [--rubric FILE] [--tempo BPM] [--note-duration S]
//     [--play] [-v]
//
// Scales: major, minor, pentatonic
// Evaluators: heuristic, multi-criterion, generated

use clap::Parser;
use pixel_harmony_music::config::RunConfig;
use pixel_harmony_music::evolve::{Evolver, Termination};
use pixel_harmony_music::fitness::rubric::FileRubric;
use pixel_harmony_music::fitness::{Evaluator, EvaluatorKind, FitnessEvaluator, RubricSource};
use pixel_harmony_music::midi::write_midi;
use pixel_harmony_music::playback::select_player;
use pixel_harmony_music::scale::{BoundaryPolicy, Note, ScaleKind};
use pixel_harmony_prng::HarmonyRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Evolve a melody with a genetic algorithm and save it as MIDI.
#[derive(Parser, Debug)]
#[command(name = "generate", version)]
struct Cli {
    /// Output MIDI file
    #[arg(default_value = "output.mid")]
    output: PathBuf,

    /// JSON run configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Notes per melody
    #[arg(long)]
    length: Option<usize>,

    /// Melodies per generation
    #[arg(long)]
    population: Option<usize>,

    /// Generation budget
    #[arg(long)]
    generations: Option<usize>,

    /// Initial per-note mutation probability
    #[arg(long)]
    mutation_rate: Option<f64>,

    #[arg(long)]
    tournament_size: Option<usize>,

    /// Chance a new melody is bred rather than drawn at random
    #[arg(long)]
    crossover_probability: Option<f64>,

    /// Best melodies copied unchanged into each new generation
    #[arg(long)]
    elitism: Option<usize>,

    /// Generations without improvement before stopping early
    #[arg(long)]
    stagnation_limit: Option<usize>,

    /// Let the first and last notes be any scale note
    #[arg(long)]
    free_boundary: bool,

    /// Keep the mutation rate fixed
    #[arg(long)]
    fixed_mutation: bool,

    /// Score each generation on all cores
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// major, minor or pentatonic
    #[arg(long)]
    scale: Option<ScaleKind>,

    /// heuristic, multi-criterion or generated
    #[arg(long)]
    evaluator: Option<EvaluatorKind>,

    /// Rubric text for the generated evaluator
    #[arg(long)]
    rubric: Option<PathBuf>,

    #[arg(long)]
    tempo: Option<u16>,

    /// Seconds per note when previewing
    #[arg(long)]
    note_duration: Option<f64>,

    /// Preview the result after writing it
    #[arg(long)]
    play: bool,

    /// Debug-level logging (per-generation progress)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// The config file (or defaults) with command-line overrides applied.
    fn run_config(&self) -> Result<RunConfig, String> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
            None => RunConfig::default(),
        };
        let evo = &mut config.evolution;
        if let Some(v) = self.length {
            evo.length = v;
        }
        if let Some(v) = self.population {
            evo.population_size = v;
        }
        if let Some(v) = self.generations {
            evo.generations = v;
        }
        if let Some(v) = self.mutation_rate {
            evo.mutation_rate = v;
        }
        if let Some(v) = self.tournament_size {
            evo.tournament_size = v;
        }
        if let Some(v) = self.crossover_probability {
            evo.crossover_probability = v;
        }
        if let Some(v) = self.elitism {
            evo.elitism = v;
        }
        if let Some(v) = self.stagnation_limit {
            evo.stagnation_limit = v;
        }
        if self.free_boundary {
            evo.boundary = BoundaryPolicy::Free;
        }
        if self.fixed_mutation {
            evo.adaptive.enabled = false;
        }
        if self.parallel {
            evo.parallel_scoring = true;
        }
        if let Some(v) = self.scale {
            config.scale = v;
        }
        if let Some(v) = self.evaluator {
            config.evaluator = v;
        }
        if let Some(v) = self.tempo {
            config.tempo = v;
        }
        if let Some(v) = self.note_duration {
            config.note_duration = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = match cli.run_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let evo = &config.evolution;

    println!("=== Pixel Harmony Melody Generator ===");
    println!("Output: {}", cli.output.display());
    println!("Scale: {:?}", config.scale);
    println!("Evaluator: {:?}", config.evaluator);
    println!(
        "Melody: {} notes, population {}, up to {} generations",
        evo.length, evo.population_size, evo.generations
    );
    if let Some(s) = config.seed {
        println!("Seed: {s}");
    }
    println!();

    let mut rng = match config.seed {
        Some(s) => HarmonyRng::new(s),
        None => HarmonyRng::from_entropy(),
    };

    println!("[1/3] Building fitness evaluator...");
    let rubric_source = cli.rubric.clone().map(FileRubric);
    let evaluator = Evaluator::build(
        config.evaluator,
        rubric_source.as_ref().map(|s| s as &dyn RubricSource),
    );
    println!("  Using {} fitness.", evaluator.name());
    if let Evaluator::Generated(g) = &evaluator {
        let c = g.criteria();
        println!(
            "  Rubric: range {}-{}, stepwise {:.1}, cadence {:.1}, phrase {}",
            c.preferred_range.0, c.preferred_range.1, c.stepwise_weight, c.cadence_weight, c.phrase_length
        );
    }

    println!("[2/3] Evolving...");
    let evolver = match Evolver::new(config.evolution.clone(), config.scale.scale()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("  Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let outcome = evolver.run(&evaluator, &mut rng, None);
    println!("  Generations: {}", outcome.generations_run);
    match &outcome.termination {
        Termination::Converged => println!("  Stopped early: no improvement."),
        Termination::BudgetExhausted => println!("  Generation budget spent."),
        Termination::Failed(e) => println!("  Search failed ({e}); using a random melody."),
    }
    println!("  Best score: {:.2}", outcome.best_score);
    println!("  Melody: {}", describe(&outcome.best));

    println!("[3/3] Writing MIDI to {}...", cli.output.display());
    if let Err(e) = write_midi(&outcome.best, config.tempo, &cli.output) {
        eprintln!("  Error writing MIDI: {e}");
        return ExitCode::FAILURE;
    }
    println!("  Done.");

    if cli.play {
        println!();
        println!("Playing...");
        let mut player = select_player(None);
        player.play_melody(&outcome.best, config.note_duration);
    }

    println!();
    println!("Play with: timidity {} (or any MIDI player)", cli.output.display());
    ExitCode::SUCCESS
}

fn describe(melody: &[Note]) -> String {
    melody
        .iter()
        .map(|&n| format!("{}{}", pitch_name(n), i32::from(n) / 12 - 1))
        .collect::<Vec<_>>()
        .join(" ")
}

const PITCH_NAMES: [&str; 12] = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];

fn pitch_name(note: Note) -> &'static str {
    PITCH_NAMES[usize::from(note % 12)]
}
