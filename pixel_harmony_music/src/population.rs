// Population of candidate melodies.
//
// A population is a non-empty, ordered set of melodies that all share one
// length. It is rebuilt every generation by evolve.rs; nothing here is
// shared across runs.
//
// Ranking scores every member with the configured evaluator and sorts by
// score, descending, with a stable sort so ties keep population order.
// Scoring may run on the rayon pool: `par_iter().map().collect()` preserves
// order, so the ranking is identical either way.

use crate::error::EvolveError;
use crate::fitness::FitnessEvaluator;
use crate::scale::{BoundaryPolicy, Note, Scale};
use pixel_harmony_prng::HarmonyRng;
use rayon::prelude::*;

/// A candidate melody: one MIDI pitch per position.
pub type Melody = Vec<Note>;

/// A melody paired with the score it received this generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub melody: Melody,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    melodies: Vec<Melody>,
}

/// Generate one random melody of `length` notes.
pub fn random_melody(
    length: usize,
    scale: &Scale,
    boundary: BoundaryPolicy,
    rng: &mut HarmonyRng,
) -> Melody {
    (0..length)
        .map(|i| boundary.note_at(scale, i, length, rng))
        .collect()
}

impl Population {
    pub fn random(
        size: usize,
        length: usize,
        scale: &Scale,
        boundary: BoundaryPolicy,
        rng: &mut HarmonyRng,
    ) -> Result<Self, EvolveError> {
        if size == 0 {
            return Err(EvolveError::invalid("population size must be at least 1"));
        }
        if length == 0 {
            return Err(EvolveError::invalid("melody length must be at least 1"));
        }
        let melodies = (0..size)
            .map(|_| random_melody(length, scale, boundary, rng))
            .collect();
        Ok(Population { melodies })
    }

    pub fn from_melodies(melodies: Vec<Melody>) -> Result<Self, EvolveError> {
        let Some(first) = melodies.first() else {
            return Err(EvolveError::invalid("population must not be empty"));
        };
        let length = first.len();
        if length == 0 {
            return Err(EvolveError::invalid("melody length must be at least 1"));
        }
        if let Some(bad) = melodies.iter().position(|m| m.len() != length) {
            return Err(EvolveError::invalid(format!(
                "melody {bad} has length {}, expected {length}",
                melodies[bad].len()
            )));
        }
        Ok(Population { melodies })
    }

    pub fn melodies(&self) -> &[Melody] {
        &self.melodies
    }

    /// Score every member and return them best-first.
    ///
    /// Fails with `Internal` if the evaluator produces a non-finite score,
    /// since such a value cannot be ranked meaningfully.
    pub fn rank(
        &self,
        evaluator: &dyn FitnessEvaluator,
        parallel: bool,
    ) -> Result<Vec<Scored>, EvolveError> {
        let scores: Vec<f64> = if parallel {
            self.melodies.par_iter().map(|m| evaluator.score(m)).collect()
        } else {
            self.melodies.iter().map(|m| evaluator.score(m)).collect()
        };

        if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
            return Err(EvolveError::Internal(format!(
                "{} evaluator returned {} for {:?}",
                evaluator.name(),
                scores[i],
                self.melodies[i]
            )));
        }

        let mut ranked: Vec<Scored> = self
            .melodies
            .iter()
            .zip(scores)
            .map(|(m, score)| Scored {
                melody: m.clone(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}
