// Scales and boundary-note policy.
//
// A melody's notes are MIDI pitches drawn from the active scale. Random
// initialization and mutation only ever produce scale members; the
// boundary policy can further constrain the first and last positions to
// musically privileged degrees (still scale members).
//
// Used by population.rs for initialization and operators.rs for mutation.

use crate::error::EvolveError;
use pixel_harmony_prng::HarmonyRng;
use serde::{Deserialize, Serialize};

/// A MIDI pitch, 0..=127.
pub type Note = u8;

/// Built-in scales, all rooted on middle C and spanning one octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    /// C D E F G A B C
    CMajor,
    /// C D Eb F G Ab Bb C (natural minor)
    CMinor,
    /// C D E G A C
    CPentatonic,
}

impl ScaleKind {
    pub fn notes(self) -> &'static [Note] {
        match self {
            ScaleKind::CMajor => &[60, 62, 64, 65, 67, 69, 71, 72],
            ScaleKind::CMinor => &[60, 62, 63, 65, 67, 68, 70, 72],
            ScaleKind::CPentatonic => &[60, 62, 64, 67, 69, 72],
        }
    }

    pub fn scale(self) -> Scale {
        Scale {
            notes: self.notes().to_vec(),
        }
    }
}

impl std::str::FromStr for ScaleKind {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "c_major" | "major" => Ok(ScaleKind::CMajor),
            "c_minor" | "minor" => Ok(ScaleKind::CMinor),
            "c_pentatonic" | "pentatonic" => Ok(ScaleKind::CPentatonic),
            other => Err(EvolveError::invalid(format!("unknown scale '{other}'"))),
        }
    }
}

/// The set of notes eligible for random generation and mutation.
///
/// Ordered, non-empty, no duplicates. The first note is the tonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    notes: Vec<Note>,
}

impl Scale {
    pub fn from_notes(notes: &[Note]) -> Result<Self, EvolveError> {
        if notes.is_empty() {
            return Err(EvolveError::invalid("scale must contain at least one note"));
        }
        if let Some(bad) = notes.iter().find(|&&n| n > 127) {
            return Err(EvolveError::invalid(format!("note {bad} is outside MIDI range")));
        }
        let mut deduped = Vec::with_capacity(notes.len());
        for &n in notes {
            if !deduped.contains(&n) {
                deduped.push(n);
            }
        }
        Ok(Scale { notes: deduped })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn contains(&self, note: Note) -> bool {
        self.notes.contains(&note)
    }

    pub fn random_note(&self, rng: &mut HarmonyRng) -> Note {
        rng.choose(&self.notes).copied().unwrap_or_else(|| self.tonic())
    }

    pub fn tonic(&self) -> Note {
        self.notes[0]
    }

    /// The fifth above the tonic if the scale has it, else the tonic.
    pub fn dominant(&self) -> Note {
        self.tonic()
            .checked_add(7)
            .filter(|&n| self.contains(n))
            .unwrap_or(self.tonic())
    }

    /// The third scale degree (index 2), or the tonic for tiny scales.
    pub fn mediant(&self) -> Note {
        self.notes.get(2).copied().unwrap_or(self.tonic())
    }
}

impl Default for Scale {
    fn default() -> Self {
        ScaleKind::CMajor.scale()
    }
}

/// How the first and last notes of a freshly generated melody are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Every position is an independent draw from the scale.
    Free,
    /// Open on the tonic or dominant, close on the tonic or mediant.
    #[default]
    Cadential,
}

impl BoundaryPolicy {
    /// Pick the note for `position` in a melody of `length` notes.
    pub fn note_at(self, scale: &Scale, position: usize, length: usize, rng: &mut HarmonyRng) -> Note {
        match self {
            BoundaryPolicy::Free => scale.random_note(rng),
            BoundaryPolicy::Cadential => {
                if position == 0 {
                    if rng.random_bool(0.5) { scale.tonic() } else { scale.dominant() }
                } else if position + 1 == length {
                    if rng.random_bool(0.5) { scale.tonic() } else { scale.mediant() }
                } else {
                    scale.random_note(rng)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_degrees() {
        let scale = ScaleKind::CMajor.scale();
        assert_eq!(scale.tonic(), 60);
        assert_eq!(scale.dominant(), 67);
        assert_eq!(scale.mediant(), 64);
        assert!(scale.contains(71));
        assert!(!scale.contains(61));
    }

    #[test]
    fn test_minor_mediant_is_flat_third() {
        assert_eq!(ScaleKind::CMinor.scale().mediant(), 63);
    }

    #[test]
    fn test_from_notes_rejects_empty_and_out_of_range() {
        assert!(matches!(Scale::from_notes(&[]), Err(EvolveError::InvalidArgument(_))));
        assert!(matches!(Scale::from_notes(&[60, 200]), Err(EvolveError::InvalidArgument(_))));
    }

    #[test]
    fn test_from_notes_dedups_preserving_order() {
        let scale = Scale::from_notes(&[62, 60, 62, 64]).unwrap();
        assert_eq!(scale.notes(), &[62, 60, 64]);
        assert_eq!(scale.tonic(), 62);
    }

    #[test]
    fn test_dominant_falls_back_to_tonic() {
        let scale = Scale::from_notes(&[60, 62]).unwrap();
        assert_eq!(scale.dominant(), 60);
        assert_eq!(scale.mediant(), 60);
    }

    #[test]
    fn test_cadential_boundaries() {
        let scale = ScaleKind::CMajor.scale();
        let mut rng = HarmonyRng::new(11);
        for _ in 0..200 {
            let first = BoundaryPolicy::Cadential.note_at(&scale, 0, 8, &mut rng);
            let last = BoundaryPolicy::Cadential.note_at(&scale, 7, 8, &mut rng);
            let mid = BoundaryPolicy::Cadential.note_at(&scale, 3, 8, &mut rng);
            assert!(first == 60 || first == 67);
            assert!(last == 60 || last == 64);
            assert!(scale.contains(mid));
        }
    }

    #[test]
    fn test_random_note_reaches_every_member() {
        let scale = ScaleKind::CPentatonic.scale();
        let mut rng = HarmonyRng::new(21);
        let mut seen = Vec::new();
        for _ in 0..500 {
            let n = scale.random_note(&mut rng);
            assert!(scale.contains(n));
            if !seen.contains(&n) {
                seen.push(n);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, scale.notes());
    }

    #[test]
    fn test_scale_kind_parse() {
        assert_eq!("pentatonic".parse::<ScaleKind>().unwrap(), ScaleKind::CPentatonic);
        assert_eq!("C-Minor".parse::<ScaleKind>().unwrap(), ScaleKind::CMinor);
        assert!("lydian".parse::<ScaleKind>().is_err());
    }
}
