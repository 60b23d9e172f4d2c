//! Error types for the ghost_core library.

use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// One structural or semantic defect in a workout document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location in the document, e.g. `patterns[0].entries[2].config.repeatCount`
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found by one validation pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Audio collaborator a playback host may lack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioCapability {
    Narration,
    Tones,
}

impl fmt::Display for AudioCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCapability::Narration => write!(f, "narration"),
            AudioCapability::Tones => write!(f, "tones"),
        }
    }
}

/// Core error type for ghost_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workout document failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A setting resolved to nothing, which the default table should make impossible
    #[error("No value for '{key}' at {node}")]
    ConfigResolution { key: String, node: String },

    /// Checkpoint could not be written or restored
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// The host has no collaborator for this kind of audio
    #[error("Missing audio capability: {0}")]
    MissingAudioCapability(AudioCapability),

    /// A collaborator failed to render a cue
    #[error("Audio error: {0}")]
    Audio(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
