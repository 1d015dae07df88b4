// Rubric-driven scorer: fitness parameters parsed from free text.
//
// An external text generator (typically an LLM) is asked once, at evaluator
// construction, to describe how melodies should be judged. The answer is
// scanned for a fixed table of trigger phrases, each overriding one scoring
// parameter. Nothing else in the text matters; there is no attempt at real
// language understanding.
//
// Any failure to obtain usable text (transport error, empty answer) yields
// the heuristic evaluator instead. `RubricError` never leaves this module.
//
// The request happens strictly before evolution starts; scoring itself does
// no I/O.

use super::{Evaluator, FitnessEvaluator, HeuristicEvaluator};
use crate::error::RubricError;
use crate::scale::Note;
use serde::Serialize;
use std::path::PathBuf;

/// Prompt sent to the rubric source.
pub const RUBRIC_PROMPT: &str = "\
Describe how to evaluate a melody represented as a list of MIDI note numbers, \
focusing on these aspects:

1. Preferred note range and melodic motion
2. Phrase structure and length
3. Cadence preferences
4. Overall melodic shape

Format your response as a clear description of how each aspect should be \
evaluated, including any specific musical patterns or characteristics to \
prefer or avoid.

Example aspects to consider:
- Comfortable vocal ranges
- Stepwise vs. leap motion
- Structural points for cadences
- Melodic arch and contour";

/// Something that can answer the rubric prompt with free text.
pub trait RubricSource {
    fn generate(&self, prompt: &str) -> Result<String, RubricError>;
}

/// A fixed rubric, e.g. captured from an earlier model response.
#[derive(Debug, Clone)]
pub struct StaticRubric(pub String);

impl RubricSource for StaticRubric {
    fn generate(&self, _prompt: &str) -> Result<String, RubricError> {
        Ok(self.0.clone())
    }
}

/// Reads the rubric text from a file on every request.
#[derive(Debug, Clone)]
pub struct FileRubric(pub PathBuf);

impl RubricSource for FileRubric {
    fn generate(&self, _prompt: &str) -> Result<String, RubricError> {
        std::fs::read_to_string(&self.0)
            .map_err(|e| RubricError::Transient(format!("{}: {e}", self.0.display())))
    }
}

/// Tunable parameters of the generated scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricCriteria {
    /// Inclusive pitch band that earns a point per note.
    pub preferred_range: (Note, Note),
    pub stepwise_weight: f64,
    pub cadence_weight: f64,
    pub phrase_length: usize,
    /// Carried in the rubric parameter set; no keyword rule sets it and
    /// scoring ignores it.
    pub prefer_consonant_intervals: bool,
}

impl Default for RubricCriteria {
    fn default() -> Self {
        RubricCriteria {
            preferred_range: (60, 72),
            stepwise_weight: 0.5,
            cadence_weight: 2.0,
            phrase_length: 4,
            prefer_consonant_intervals: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Override {
    Range(Note, Note),
    StepwiseWeight(f64),
    CadenceWeight(f64),
    PhraseLength(usize),
}

impl Override {
    fn slot(self) -> usize {
        match self {
            Override::Range(..) => 0,
            Override::StepwiseWeight(_) => 1,
            Override::CadenceWeight(_) => 2,
            Override::PhraseLength(_) => 3,
        }
    }
}

/// Trigger phrase -> parameter override. Matching is case-insensitive and
/// the first matching rule for a parameter wins.
const KEYWORD_RULES: &[(&str, Override)] = &[
    ("high range", Override::Range(67, 79)),
    ("low range", Override::Range(48, 60)),
    ("strong emphasis on stepwise motion", Override::StepwiseWeight(0.8)),
    ("strong cadences", Override::CadenceWeight(3.0)),
    ("longer phrases", Override::PhraseLength(8)),
    ("short motifs", Override::PhraseLength(2)),
];

/// Cadence bonus applies when the last two notes are this far apart.
const CADENTIAL_INTERVALS: &[u8] = &[1, 2, 5];

impl RubricCriteria {
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        let mut criteria = RubricCriteria::default();
        let mut taken = [false; 4];

        for &(trigger, rule) in KEYWORD_RULES {
            if taken[rule.slot()] || !lower.contains(trigger) {
                continue;
            }
            taken[rule.slot()] = true;
            match rule {
                Override::Range(lo, hi) => criteria.preferred_range = (lo, hi),
                Override::StepwiseWeight(w) => criteria.stepwise_weight = w,
                Override::CadenceWeight(w) => criteria.cadence_weight = w,
                Override::PhraseLength(n) => criteria.phrase_length = n,
            }
        }
        criteria
    }
}

/// Scorer driven by parsed rubric criteria.
#[derive(Debug, Clone)]
pub struct GeneratedEvaluator {
    description: String,
    criteria: RubricCriteria,
}

impl GeneratedEvaluator {
    pub fn from_text(text: impl Into<String>) -> Self {
        let description = text.into();
        let criteria = RubricCriteria::parse(&description);
        GeneratedEvaluator {
            description,
            criteria,
        }
    }

    pub fn criteria(&self) -> &RubricCriteria {
        &self.criteria
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl FitnessEvaluator for GeneratedEvaluator {
    fn score(&self, melody: &[Note]) -> f64 {
        if melody.is_empty() {
            return 0.0;
        }
        let c = &self.criteria;
        let mut score = 0.0;

        let (lo, hi) = c.preferred_range;
        score += melody.iter().filter(|&&n| (lo..=hi).contains(&n)).count() as f64;

        for w in melody.windows(2) {
            match w[0].abs_diff(w[1]) {
                0..=2 => score += c.stepwise_weight,
                3..=4 => score += c.stepwise_weight * 0.5,
                _ => {}
            }
        }

        if c.phrase_length > 0 {
            score += melody
                .chunks_exact(c.phrase_length)
                .filter(|phrase| is_good_phrase(phrase))
                .count() as f64;
        }

        match melody {
            [.., a, b] if CADENTIAL_INTERVALS.contains(&a.abs_diff(*b)) => {
                score += c.cadence_weight;
            }
            _ => {}
        }
        score
    }

    fn name(&self) -> &'static str {
        "generated"
    }
}

/// A phrase is good if its peak is interior (an arch) or some absolute
/// interval repeats.
fn is_good_phrase(phrase: &[Note]) -> bool {
    let (Some(&first), Some(&last), Some(&peak)) =
        (phrase.first(), phrase.last(), phrase.iter().max())
    else {
        return false;
    };
    let has_arch = peak != first && peak != last;

    let intervals: Vec<u8> = phrase.windows(2).map(|w| w[0].abs_diff(w[1])).collect();
    let has_pattern = intervals
        .iter()
        .enumerate()
        .any(|(i, iv)| intervals[i + 1..].contains(iv));

    has_arch || has_pattern
}

/// Ask `source` for a rubric and build a generated evaluator from it,
/// falling back to the heuristic evaluator on any failure.
pub fn generate_evaluator<S: RubricSource + ?Sized>(source: &S) -> Evaluator {
    let text = source.generate(RUBRIC_PROMPT).and_then(|text| {
        if text.trim().is_empty() {
            Err(RubricError::Malformed("empty response".into()))
        } else {
            Ok(text)
        }
    });
    match text {
        Ok(text) => {
            let evaluator = GeneratedEvaluator::from_text(text);
            tracing::info!(criteria = ?evaluator.criteria(), "generated fitness rubric");
            Evaluator::Generated(evaluator)
        }
        Err(e) => {
            tracing::warn!(error = %e, "rubric generation failed, using heuristic fitness");
            Evaluator::Heuristic(HeuristicEvaluator)
        }
    }
}

/// Like [`generate_evaluator`], but the source itself is built by a
/// fallible `connect` (client setup, credential lookup). A connection
/// failure also yields the heuristic evaluator.
pub fn connect_and_generate<F>(connect: F) -> Evaluator
where
    F: FnOnce() -> Result<Box<dyn RubricSource>, RubricError>,
{
    match connect() {
        Ok(source) => generate_evaluator(source.as_ref()),
        Err(e) => {
            tracing::warn!(error = %e, "rubric source unavailable, using heuristic fitness");
            Evaluator::Heuristic(HeuristicEvaluator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken(RubricError);

    impl RubricSource for Broken {
        fn generate(&self, _prompt: &str) -> Result<String, RubricError> {
            Err(self.0.clone())
        }
    }

    #[test]
    fn test_default_criteria_for_unrelated_text() {
        assert_eq!(RubricCriteria::parse("Make it pleasant."), RubricCriteria::default());
    }

    #[test]
    fn test_high_range_keyword() {
        let c = RubricCriteria::parse("The melody should be in a HIGH RANGE.");
        assert_eq!(c.preferred_range, (67, 79));
    }

    #[test]
    fn test_first_rule_wins_per_parameter() {
        let c = RubricCriteria::parse("Avoid a low range; prefer a high range.");
        assert_eq!(c.preferred_range, (67, 79));
        let c = RubricCriteria::parse("short motifs inside longer phrases");
        assert_eq!(c.phrase_length, 8);
    }

    #[test]
    fn test_all_keywords() {
        let c = RubricCriteria::parse(
            "Low range, strong emphasis on stepwise motion, strong cadences, short motifs.",
        );
        assert_eq!(c.preferred_range, (48, 60));
        assert_eq!(c.stepwise_weight, 0.8);
        assert_eq!(c.cadence_weight, 3.0);
        assert_eq!(c.phrase_length, 2);
        assert!(c.prefer_consonant_intervals);
    }

    #[test]
    fn test_generated_score_components() {
        let eval = GeneratedEvaluator::from_text("nothing special");
        // 3 in range, steps 2+2 (0.5 each), an interior peak in the one
        // 4-note phrase, and a closing fourth (5 semitones) for the cadence.
        let score = eval.score(&[60, 62, 64, 59]);
        assert!((score - (3.0 + 1.0 + 1.0 + 2.0)).abs() < 1e-9, "got {score}");
        let score = eval.score(&[60, 62, 67, 62]);
        assert!((score - (4.0 + 0.5 + 1.0 + 2.0)).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_good_phrase_rules() {
        assert!(is_good_phrase(&[60, 64, 62]));
        assert!(is_good_phrase(&[60, 62, 64, 66]));
        assert!(!is_good_phrase(&[60, 61, 63, 66]));
        assert!(!is_good_phrase(&[]));
    }

    #[test]
    fn test_empty_melody_is_zero() {
        assert_eq!(GeneratedEvaluator::from_text("high range").score(&[]), 0.0);
    }

    #[test]
    fn test_transient_failure_falls_back() {
        let e = generate_evaluator(&Broken(RubricError::Transient("401".into())));
        assert!(matches!(e, Evaluator::Heuristic(_)));
    }

    #[test]
    fn test_blank_response_falls_back() {
        let e = generate_evaluator(&StaticRubric("  \n".into()));
        assert!(matches!(e, Evaluator::Heuristic(_)));
    }

    #[test]
    fn test_static_rubric_builds_generated() {
        let e = generate_evaluator(&StaticRubric("strong cadences please".into()));
        match e {
            Evaluator::Generated(g) => assert_eq!(g.criteria().cadence_weight, 3.0),
            other => panic!("expected generated evaluator, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_falls_back() {
        let source = FileRubric(PathBuf::from("/nonexistent/rubric.txt"));
        assert!(matches!(generate_evaluator(&source), Evaluator::Heuristic(_)));
    }

    #[test]
    fn test_connect_failure_falls_back() {
        let e = connect_and_generate(|| Err(RubricError::Transient("no api key".into())));
        assert!(matches!(e, Evaluator::Heuristic(_)));
    }
}
