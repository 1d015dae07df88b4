// Default heuristic scorer.
//
// Additive, unbounded above: one point per note in the comfortable vocal
// band, small bonuses for stepwise and third motion, and fixed bonuses for
// opening on the tonic or dominant and closing on the tonic. This is also
// the fallback whenever a generated rubric cannot be obtained.

use super::FitnessEvaluator;
use crate::scale::Note;

const BAND_LOW: Note = 60;
const BAND_HIGH: Note = 72;
const TONIC: Note = 60;
const DOMINANT: Note = 67;

const IN_BAND_REWARD: f64 = 1.0;
const STEP_REWARD: f64 = 0.5;
const THIRD_REWARD: f64 = 0.3;
const BOUNDARY_REWARD: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

impl FitnessEvaluator for HeuristicEvaluator {
    fn score(&self, melody: &[Note]) -> f64 {
        let (Some(&first), Some(&last)) = (melody.first(), melody.last()) else {
            return 0.0;
        };

        let mut score = 0.0;
        for (i, &note) in melody.iter().enumerate() {
            if (BAND_LOW..=BAND_HIGH).contains(&note) {
                score += IN_BAND_REWARD;
            }
            if i > 0 {
                let interval = note.abs_diff(melody[i - 1]);
                if interval <= 2 {
                    score += STEP_REWARD;
                } else if interval <= 4 {
                    score += THIRD_REWARD;
                }
            }
        }

        if first == TONIC || first == DOMINANT {
            score += BOUNDARY_REWARD;
        }
        if last == TONIC {
            score += BOUNDARY_REWARD;
        }
        score
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
