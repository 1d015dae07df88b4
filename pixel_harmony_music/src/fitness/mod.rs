// Fitness evaluation: the pluggable scoring strategy behind the search.
//
// `FitnessEvaluator` is the capability the evolution loop depends on. Three
// built-in strategies implement it:
// - heuristic.rs: fixed additive scorer (pitch band, small steps, tonic
//   start/end). Unbounded above.
// - criteria.rs: five bounded sub-scores (contour, rhythm, harmony,
//   phrasing, tension/resolution), each 0-20, totalling 0-100.
// - rubric.rs: parameters parsed from an externally generated text rubric,
//   falling back to the heuristic scorer when the source fails.
//
// All scorers are pure functions of the melody, so they are `Send + Sync`
// and population.rs may score a generation in parallel.

pub mod criteria;
pub mod heuristic;
pub mod rubric;

pub use criteria::{MultiCriterionEvaluator, ScoreBreakdown};
pub use heuristic::HeuristicEvaluator;
pub use rubric::{GeneratedEvaluator, RubricCriteria, RubricSource};

use crate::error::EvolveError;
use crate::scale::Note;
use serde::{Deserialize, Serialize};

/// Scores a candidate melody. Higher is better.
///
/// Implementations must be deterministic and side-effect free, and must
/// return a defined minimum (0.0 for the built-ins) for an empty melody.
pub trait FitnessEvaluator: Send + Sync {
    fn score(&self, melody: &[Note]) -> f64;

    /// Short label for logs and telemetry.
    fn name(&self) -> &'static str;
}

/// Which built-in evaluator a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Heuristic,
    #[default]
    MultiCriterion,
    /// Rubric text from an external source; heuristic if that fails.
    Generated,
}

impl std::str::FromStr for EvaluatorKind {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "heuristic" | "a" => Ok(EvaluatorKind::Heuristic),
            "multi_criterion" | "criteria" | "b" => Ok(EvaluatorKind::MultiCriterion),
            "generated" | "rubric" | "c" => Ok(EvaluatorKind::Generated),
            other => Err(EvolveError::invalid(format!("unknown evaluator '{other}'"))),
        }
    }
}

/// A built-in evaluator, chosen once at construction.
#[derive(Debug, Clone)]
pub enum Evaluator {
    Heuristic(HeuristicEvaluator),
    MultiCriterion(MultiCriterionEvaluator),
    Generated(GeneratedEvaluator),
}

impl Evaluator {
    /// Build the evaluator for `kind`. `Generated` consults `source` and
    /// degrades to the heuristic scorer if it is missing or fails.
    pub fn build(kind: EvaluatorKind, source: Option<&dyn RubricSource>) -> Self {
        match kind {
            EvaluatorKind::Heuristic => Evaluator::Heuristic(HeuristicEvaluator),
            EvaluatorKind::MultiCriterion => {
                Evaluator::MultiCriterion(MultiCriterionEvaluator::default())
            }
            EvaluatorKind::Generated => match source {
                Some(source) => rubric::generate_evaluator(source),
                None => {
                    tracing::warn!("no rubric source configured, using heuristic fitness");
                    Evaluator::Heuristic(HeuristicEvaluator)
                }
            },
        }
    }
}

impl FitnessEvaluator for Evaluator {
    fn score(&self, melody: &[Note]) -> f64 {
        match self {
            Evaluator::Heuristic(e) => e.score(melody),
            Evaluator::MultiCriterion(e) => e.score(melody),
            Evaluator::Generated(e) => e.score(melody),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Evaluator::Heuristic(e) => e.name(),
            Evaluator::MultiCriterion(e) => e.name(),
            Evaluator::Generated(e) => e.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RubricError;

    struct Unreachable;

    impl RubricSource for Unreachable {
        fn generate(&self, _prompt: &str) -> Result<String, RubricError> {
            Err(RubricError::Transient("connection refused".into()))
        }
    }

    #[test]
    fn test_build_each_kind() {
        assert_eq!(Evaluator::build(EvaluatorKind::Heuristic, None).name(), "heuristic");
        assert_eq!(
            Evaluator::build(EvaluatorKind::MultiCriterion, None).name(),
            "multi_criterion"
        );
    }

    #[test]
    fn test_generated_without_source_is_heuristic() {
        let e = Evaluator::build(EvaluatorKind::Generated, None);
        assert!(matches!(e, Evaluator::Heuristic(_)));
    }

    #[test]
    fn test_generated_with_failing_source_is_heuristic() {
        let e = Evaluator::build(EvaluatorKind::Generated, Some(&Unreachable));
        assert!(matches!(e, Evaluator::Heuristic(_)));
        assert!(e.score(&[60, 62, 64, 60]) > 0.0);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("heuristic".parse::<EvaluatorKind>().unwrap(), EvaluatorKind::Heuristic);
        assert_eq!("Multi-Criterion".parse::<EvaluatorKind>().unwrap(), EvaluatorKind::MultiCriterion);
        assert_eq!("generated".parse::<EvaluatorKind>().unwrap(), EvaluatorKind::Generated);
        assert!("oracle".parse::<EvaluatorKind>().is_err());
    }

    #[test]
    fn test_empty_melody_scores_zero_everywhere() {
        for kind in [EvaluatorKind::Heuristic, EvaluatorKind::MultiCriterion] {
            assert_eq!(Evaluator::build(kind, None).score(&[]), 0.0);
        }
    }
}
