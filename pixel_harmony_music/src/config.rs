// Run configuration.
//
// Everything a generation run needs that is not code: the evolution
// parameters, the scale, which evaluator to use, and the output settings
// (tempo, preview note length, seed). Loaded from JSON; every field has a
// default, so a config file only needs the values it changes.
//
// The CLI (main.rs) layers command-line overrides on top of this.

use crate::error::{ConfigError, EvolveError};
use crate::evolve::EvolutionConfig;
use crate::fitness::EvaluatorKind;
use crate::midi::MIN_TEMPO_BPM;
use crate::scale::ScaleKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub evolution: EvolutionConfig,
    pub scale: ScaleKind,
    pub evaluator: EvaluatorKind,
    /// MIDI tempo in beats per minute.
    pub tempo: u16,
    /// Seconds per note when previewing.
    pub note_duration: f64,
    /// Fixed seed for a reproducible run; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            evolution: EvolutionConfig::default(),
            scale: ScaleKind::CMajor,
            evaluator: EvaluatorKind::default(),
            tempo: 120,
            note_duration: 0.5,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;
        if self.tempo < MIN_TEMPO_BPM {
            return Err(EvolveError::invalid(format!(
                "tempo {} BPM is below the MIDI minimum of {MIN_TEMPO_BPM}",
                self.tempo
            ))
            .into());
        }
        if !(self.note_duration.is_finite() && self.note_duration >= 0.0) {
            return Err(EvolveError::invalid(format!(
                "note duration {} must be a non-negative number of seconds",
                self.note_duration
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::BoundaryPolicy;

    #[test]
    fn test_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.evolution.length, 16);
        assert_eq!(c.evolution.population_size, 50);
        assert_eq!(c.evolution.mutation_rate, 0.1);
        assert_eq!(c.evolution.tournament_size, 3);
        assert_eq!(c.evolution.elitism, 2);
        assert_eq!(c.tempo, 120);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c = RunConfig::from_json(
            r#"{
                "scale": "c_pentatonic",
                "evaluator": "heuristic",
                "seed": 7,
                "evolution": { "length": 8, "boundary": "free", "adaptive": { "enabled": false } }
            }"#,
        )
        .unwrap();
        assert_eq!(c.scale, ScaleKind::CPentatonic);
        assert_eq!(c.evaluator, EvaluatorKind::Heuristic);
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.evolution.length, 8);
        assert_eq!(c.evolution.population_size, 50);
        assert_eq!(c.evolution.boundary, BoundaryPolicy::Free);
        assert!(!c.evolution.adaptive.enabled);
        assert_eq!(c.evolution.adaptive.ceiling, 0.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RunConfig::from_json(r#"{ "evolution": { "tournament_size": 100 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(RunConfig::from_json(r#"{ "tempo": 0 }"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(RunConfig::from_json("{ not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tempo_below_midi_minimum_rejected() {
        assert!(matches!(RunConfig::from_json(r#"{ "tempo": 3 }"#), Err(ConfigError::Invalid(_))));
        assert_eq!(RunConfig::from_json(r#"{ "tempo": 4 }"#).unwrap().tempo, 4);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "tempo": 96 }"#).unwrap();
        assert_eq!(RunConfig::load(&path).unwrap().tempo, 96);
        assert!(matches!(
            RunConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
