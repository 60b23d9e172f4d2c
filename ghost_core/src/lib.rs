#![forbid(unsafe_code)]

//! Core engine for ghosting drill workouts.
//!
//! This crate provides:
//! - The workout document model and its saved JSON form
//! - Configuration inheritance (entry → pattern → workout → defaults)
//! - Validation
//! - Seeded, resumable timeline generation
//! - Playback lookup and sound cue dispatch
//! - Checkpoints for paused generation

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod rng;
pub mod resolver;
pub mod ordering;
pub mod validate;
pub mod document;
pub mod timing;
pub mod cursor;
pub mod generator;
pub mod playback;
pub mod cues;
pub mod checkpoint;

// Re-export commonly used types
pub use error::{AudioCapability, Error, Result, ValidationErrors, ValidationIssue};
pub use types::*;
pub use config::Config;
pub use resolver::{ConfigKey, ConfigResolver, ConfigValue};
pub use validate::{ensure_valid, validate};
pub use document::{load_workout, load_workout_file, LoadOptions};
pub use cursor::{GenerationRequest, GeneratorState, Supersets};
pub use generator::{generate_timeline, Batch, Progress, TimelineGenerator};
pub use playback::{ActiveEvent, Phase, PlaybackCursor, PlaybackIndex, SoundCue};
pub use cues::{CueDispatcher, Narrator, TonePlayer};
pub use checkpoint::Checkpoint;
