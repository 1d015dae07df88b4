// Genetic operators: tournament selection, single-point crossover, and
// per-position mutation.
//
// Operators never modify their inputs; they return new melodies. Argument
// problems (empty or mismatched inputs, out-of-range sizes and rates) are
// reported as `EvolveError::InvalidArgument` rather than corrected.
//
// Consumed by evolve.rs when breeding each generation.

use crate::error::EvolveError;
use crate::fitness::FitnessEvaluator;
use crate::population::Melody;
use crate::scale::{Note, Scale};
use pixel_harmony_prng::HarmonyRng;

/// Tournament size used when none is configured.
pub const DEFAULT_TOURNAMENT_SIZE: usize = 3;

/// Pick the best of `size` distinct, uniformly sampled members.
///
/// `scores[i]` is the fitness of `population[i]`. The winner is returned by
/// reference into `population`. On a tie the contender sampled first wins.
pub fn tournament_select<'a>(
    population: &'a [Melody],
    scores: &[f64],
    size: usize,
    rng: &mut HarmonyRng,
) -> Result<&'a Melody, EvolveError> {
    if scores.len() != population.len() {
        return Err(EvolveError::invalid(format!(
            "{} scores for {} melodies",
            scores.len(),
            population.len()
        )));
    }
    if size == 0 {
        return Err(EvolveError::invalid("tournament size must be at least 1"));
    }
    if size > population.len() {
        return Err(EvolveError::invalid(format!(
            "tournament size {size} exceeds population size {}",
            population.len()
        )));
    }

    let contenders = rng.sample_indices(population.len(), size);
    let mut best = contenders[0];
    for &i in &contenders[1..] {
        if scores[i] > scores[best] {
            best = i;
        }
    }
    Ok(&population[best])
}

/// Tournament selection that scores the population with `evaluator` first.
pub fn select_with<'a>(
    population: &'a [Melody],
    evaluator: &dyn FitnessEvaluator,
    size: usize,
    rng: &mut HarmonyRng,
) -> Result<&'a Melody, EvolveError> {
    let scores: Vec<f64> = population.iter().map(|m| evaluator.score(m)).collect();
    tournament_select(population, &scores, size, rng)
}

/// Single-point crossover with a uniformly random cut in `[1, len - 1]`.
pub fn crossover(a: &[Note], b: &[Note], rng: &mut HarmonyRng) -> Result<Melody, EvolveError> {
    check_parents(a, b)?;
    let cut = rng.range_usize_inclusive(1, a.len() - 1);
    crossover_at(a, b, cut)
}

/// `a[..cut] ++ b[cut..]`.
pub fn crossover_at(a: &[Note], b: &[Note], cut: usize) -> Result<Melody, EvolveError> {
    check_parents(a, b)?;
    if cut == 0 || cut >= a.len() {
        return Err(EvolveError::invalid(format!(
            "cut point {cut} outside 1..={}",
            a.len() - 1
        )));
    }
    let mut child = Vec::with_capacity(a.len());
    child.extend_from_slice(&a[..cut]);
    child.extend_from_slice(&b[cut..]);
    Ok(child)
}

fn check_parents(a: &[Note], b: &[Note]) -> Result<(), EvolveError> {
    if a.len() != b.len() {
        return Err(EvolveError::invalid(format!(
            "parent lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(EvolveError::invalid("crossover needs melodies of at least 2 notes"));
    }
    Ok(())
}

/// Replace each note, independently with probability `rate`, by a uniform
/// draw from `scale`. A rate of zero returns an exact copy without touching
/// the generator.
pub fn mutate(
    melody: &[Note],
    rate: f64,
    scale: &Scale,
    rng: &mut HarmonyRng,
) -> Result<Melody, EvolveError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(EvolveError::invalid(format!("mutation rate {rate} outside [0, 1]")));
    }
    if rate == 0.0 {
        return Ok(melody.to_vec());
    }
    Ok(melody
        .iter()
        .map(|&note| {
            if rng.random_bool(rate) {
                scale.random_note(rng)
            } else {
                note
            }
        })
        .collect())
}
