// Multi-criterion melodic scorer.
//
// Five independent sub-scores, each clamped to [0, 20], summed to a total
// in [0, 100]:
//
// - Contour: direction changes near length/4, small intervals over leaps.
// - Rhythm: there is no duration data, so the absolute-interval profile
//   stands in for rhythm. Windows matching a reference pattern score, as
//   do "syncopated" odd positions that differ from both neighbours.
// - Harmony: chord-tone membership by pitch class, plus a V-I / vii-I
//   cadence bonus.
// - Phrasing: balanced halves and transposed repeats of 4-note motifs.
// - Tension/resolution: non-triad notes in the middle half, triad ending.
//
// All reference material (chords, cadence, triad) is relative to a tonic,
// middle C unless configured otherwise.

use super::FitnessEvaluator;
use crate::scale::Note;
use serde::Serialize;

/// Upper bound of each sub-score.
pub const CRITERION_MAX: f64 = 20.0;

/// Reference interval profiles (absolute semitone steps). A window of
/// `len` notes matches when its first `len - 1` steps equal the pattern's
/// first `len - 1` entries.
const RHYTHM_PATTERNS: &[&[u8]] = &[&[2, 1, 1, 2, 2], &[3, 3, 2], &[2, 2, 1, 1, 2]];
const RHYTHM_MATCH_BONUS: f64 = 5.0;
const SYNCOPATION_BONUS: f64 = 2.0;

/// Diatonic triads of the tonic's major key as pitch-class offsets:
/// I, V, IV, ii, iii, vi.
const CHORDS: &[[u8; 3]] = &[
    [0, 4, 7],
    [7, 11, 2],
    [5, 9, 0],
    [2, 5, 9],
    [4, 7, 11],
    [9, 0, 4],
];
const CADENCE_BONUS: f64 = 10.0;
/// Penultimate pitch classes (relative to the tonic) that resolve into it.
const CADENCE_APPROACHES: &[u8] = &[7, 11];

const TONIC_TRIAD: [u8; 3] = [0, 4, 7];
const RESOLUTION_BONUS: f64 = 10.0;

const MOTIF_LEN: usize = 4;
const BALANCED_PHRASE_BONUS: f64 = 5.0;
const MOTIF_REPEAT_BONUS: f64 = 3.0;

/// Per-criterion scores for one melody.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub contour: f64,
    pub rhythm: f64,
    pub harmony: f64,
    pub phrasing: f64,
    pub tension: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.contour + self.rhythm + self.harmony + self.phrasing + self.tension
    }
}

#[derive(Debug, Clone)]
pub struct MultiCriterionEvaluator {
    tonic: Note,
}

impl Default for MultiCriterionEvaluator {
    fn default() -> Self {
        MultiCriterionEvaluator { tonic: 60 }
    }
}

impl MultiCriterionEvaluator {
    pub fn with_tonic(tonic: Note) -> Self {
        MultiCriterionEvaluator { tonic }
    }

    pub fn breakdown(&self, melody: &[Note]) -> ScoreBreakdown {
        ScoreBreakdown {
            contour: self.contour(melody),
            rhythm: self.rhythm(melody),
            harmony: self.harmony(melody),
            phrasing: self.phrasing(melody),
            tension: self.tension(melody),
        }
    }

    // ── Contour ──

    pub fn contour(&self, melody: &[Note]) -> f64 {
        if melody.len() < 2 {
            return 0.0;
        }
        let mut score = 0.0;

        let changes = melody
            .windows(3)
            .filter(|w| {
                let a = i16::from(w[1]) - i16::from(w[0]);
                let b = i16::from(w[2]) - i16::from(w[1]);
                a * b < 0
            })
            .count();
        let optimal = melody.len() / 4;
        if optimal > 0 {
            let miss = changes.abs_diff(optimal) as f64 / optimal as f64;
            score += 10.0 * (1.0 - miss);
        }

        for w in melody.windows(2) {
            score += match w[0].abs_diff(w[1]) {
                0..=2 => 0.5,
                3..=4 => 0.3,
                5..=7 => 0.2,
                _ => -0.1,
            };
        }
        clamp_criterion(score)
    }

    // ── Rhythm (interval-profile proxy) ──

    pub fn rhythm(&self, melody: &[Note]) -> f64 {
        let mut score = 0.0;

        for pattern in RHYTHM_PATTERNS {
            if melody.len() < pattern.len() {
                continue;
            }
            let matches = melody
                .windows(pattern.len())
                .filter(|w| matches_interval_pattern(w, pattern))
                .count();
            score += matches as f64 * RHYTHM_MATCH_BONUS;
        }

        for i in (1..melody.len().saturating_sub(1)).step_by(2) {
            if melody[i] != melody[i - 1] && melody[i] != melody[i + 1] {
                score += SYNCOPATION_BONUS;
            }
        }
        clamp_criterion(score)
    }

    // ── Harmony ──

    pub fn harmony(&self, melody: &[Note]) -> f64 {
        let mut score = 0.0;
        for &note in melody {
            let pc = self.relative_pc(note);
            score += CHORDS.iter().filter(|chord| chord.contains(&pc)).count() as f64;
        }
        if melody.len() >= 4 && self.is_cadence(&melody[melody.len() - 4..]) {
            score += CADENCE_BONUS;
        }
        clamp_criterion(score)
    }

    fn is_cadence(&self, tail: &[Note]) -> bool {
        match tail {
            [.., penultimate, last] => {
                self.relative_pc(*last) == 0
                    && CADENCE_APPROACHES.contains(&self.relative_pc(*penultimate))
            }
            _ => false,
        }
    }

    // ── Phrasing ──

    pub fn phrasing(&self, melody: &[Note]) -> f64 {
        if melody.len() < 8 {
            return 0.0;
        }
        let mut score = 0.0;

        let half = melody.len() / 2;
        if half.abs_diff(melody.len() - half) <= 1 {
            score += BALANCED_PHRASE_BONUS;
        }

        let last_start = melody.len() - MOTIF_LEN;
        for i in 0..=last_start {
            let motif = &melody[i..i + MOTIF_LEN];
            for j in (i + MOTIF_LEN)..=last_start {
                if similar_motifs(motif, &melody[j..j + MOTIF_LEN]) {
                    score += MOTIF_REPEAT_BONUS;
                }
            }
        }
        clamp_criterion(score)
    }

    // ── Tension / resolution ──

    pub fn tension(&self, melody: &[Note]) -> f64 {
        let len = melody.len();
        if len < 4 {
            return 0.0;
        }
        let mut score = 0.0;
        for &note in &melody[len / 4..3 * len / 4] {
            if !TONIC_TRIAD.contains(&self.relative_pc(note)) {
                score += 1.0;
            }
        }
        if TONIC_TRIAD.contains(&self.relative_pc(melody[len - 1])) {
            score += RESOLUTION_BONUS;
        }
        clamp_criterion(score)
    }

    fn relative_pc(&self, note: Note) -> u8 {
        (note % 12 + 12 - self.tonic % 12) % 12
    }
}

impl FitnessEvaluator for MultiCriterionEvaluator {
    fn score(&self, melody: &[Note]) -> f64 {
        if melody.is_empty() {
            return 0.0;
        }
        self.breakdown(melody).total()
    }

    fn name(&self) -> &'static str {
        "multi_criterion"
    }
}

fn clamp_criterion(score: f64) -> f64 {
    score.clamp(0.0, CRITERION_MAX)
}

fn matches_interval_pattern(window: &[Note], pattern: &[u8]) -> bool {
    window
        .windows(2)
        .zip(pattern)
        .all(|(pair, &step)| pair[0].abs_diff(pair[1]) == step)
}

/// Same consecutive-interval signature, i.e. equal up to transposition.
fn similar_motifs(a: &[Note], b: &[Note]) -> bool {
    a.len() == b.len()
        && a.windows(2)
            .zip(b.windows(2))
            .all(|(x, y)| i16::from(x[1]) - i16::from(x[0]) == i16::from(y[1]) - i16::from(y[0]))
}
