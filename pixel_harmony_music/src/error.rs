// Error taxonomy for the melody generator.
//
// - `EvolveError`: bad arguments to operators/config (fail fast) and
//   internal failures mid-generation (the evolution loop catches these and
//   returns a fallback melody, see evolve.rs).
// - `RubricError`: failures talking to or parsing the external rubric
//   source. Never escapes fitness/rubric.rs; it triggers the heuristic
//   fallback instead.
// - `ExportError`, `ConfigError`: I/O around the loop (MIDI, JSON config).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvolveError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal evolution failure: {0}")]
    Internal(String),
}

impl EvolveError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EvolveError::InvalidArgument(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RubricError {
    /// Transport or auth failure (network down, missing key, unreadable file).
    #[error("rubric source unavailable: {0}")]
    Transient(String),
    /// The source answered, but with nothing usable.
    #[error("malformed rubric response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to write MIDI file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] EvolveError),
}
