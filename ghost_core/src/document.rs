//! Loading and saving workout documents in their saved JSON form.

use crate::validate::ensure_valid;
use crate::{Result, Workout};
use std::path::Path;

/// How a document is being loaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Loading many documents at once: skip per-pattern logging
    pub bulk_load: bool,
}

impl LoadOptions {
    pub fn bulk() -> Self {
        Self { bulk_load: true }
    }
}

/// Parse and validate a saved workout
pub fn load_workout(json: &str, options: LoadOptions) -> Result<Workout> {
    let workout: Workout = serde_json::from_str(json)?;
    ensure_valid(&workout)?;

    if options.bulk_load {
        tracing::debug!(
            "Loaded '{}' ({} patterns)",
            workout.name,
            workout.patterns.len()
        );
    } else {
        for pattern in &workout.patterns {
            tracing::info!(
                "Pattern '{}' ({}): {} entries, {} shots",
                pattern.name,
                pattern.id,
                pattern.entries.len(),
                pattern.shot_count()
            );
        }
        tracing::info!("Loaded workout '{}'", workout.name);
    }
    Ok(workout)
}

pub fn load_workout_file(path: &Path, options: LoadOptions) -> Result<Workout> {
    let json = std::fs::read_to_string(path)?;
    load_workout(&json, options)
}

impl Workout {
    /// Saved form; only explicitly set config keys are written
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
