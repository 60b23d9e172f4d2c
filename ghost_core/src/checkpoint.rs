//! Persisting paused generation cursors.
//!
//! A checkpoint lets a long or unbounded generation continue in a later
//! process. Files are written atomically under an exclusive lock and read
//! under a shared lock.

use crate::cursor::GeneratorState;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A paused cursor plus enough context to match it to its workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub run_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub workout_name: String,
    pub state: GeneratorState,
}

impl Checkpoint {
    pub fn new(workout_name: impl Into<String>, state: GeneratorState) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            saved_at: Utc::now(),
            workout_name: workout_name.into(),
            state,
        }
    }

    /// Default file for a run inside `dir`
    pub fn path_in(dir: &Path, run_id: Uuid) -> PathBuf {
        dir.join(format!("{}.json", run_id))
    }

    /// Fail unless this checkpoint was taken from `workout_name`
    pub fn ensure_matches(&self, workout_name: &str) -> Result<()> {
        if self.workout_name != workout_name {
            return Err(Error::Checkpoint(format!(
                "checkpoint {} belongs to '{}', not '{}'",
                self.run_id, self.workout_name, workout_name
            )));
        }
        Ok(())
    }

    /// Load a checkpoint.
    ///
    /// A missing file is `Ok(None)`. An unreadable or corrupt file logs a
    /// warning and is also `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            tracing::info!("No checkpoint at {:?}", path);
            return Ok(None);
        }

        let parsed = read_shared(path)
            .map_err(Error::Io)
            .and_then(|contents| Ok(serde_json::from_str::<Checkpoint>(&contents)?));
        match parsed {
            Ok(checkpoint) => {
                tracing::debug!(
                    "Checkpoint {} resumes after {} events ({:?})",
                    checkpoint.run_id,
                    checkpoint.state.total_events_generated,
                    path
                );
                Ok(Some(checkpoint))
            }
            Err(e) => {
                tracing::warn!("Skipping unusable checkpoint {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Write atomically: temp file in the same directory, fsync, rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved checkpoint {} to {:?}", self.run_id, path);
        Ok(())
    }
}

/// Whole file contents, read under a shared lock
fn read_shared(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read.map(|_| contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Progress, TimelineGenerator};
    use crate::{Entry, GenerationRequest, Pattern, Supersets, Workout};

    fn workout() -> Workout {
        Workout::new(
            "Checkpointed",
            vec![Pattern::new(
                "p",
                "P",
                vec![Entry::shot("a", "A"), Entry::shot("b", "B")],
            )],
        )
    }

    fn paused_state(workout: &Workout) -> GeneratorState {
        let batch = TimelineGenerator::with_default_timing(workout)
            .generate(
                None,
                GenerationRequest::seeded(5).with_supersets(Supersets::Unbounded),
                Some(3),
            )
            .unwrap();
        match batch.progress {
            Progress::Paused(state) => state,
            Progress::Done => panic!("expected a paused cursor"),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workout = workout();
        let checkpoint = Checkpoint::new(&workout.name, paused_state(&workout));
        let path = Checkpoint::path_in(temp_dir.path(), checkpoint.run_id);

        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(loaded.ensure_matches("Checkpointed").is_ok());
        assert!(loaded.ensure_matches("Other").is_err());
    }

    #[test]
    fn test_resume_from_disk_continues_sequence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workout = workout();
        let generator = TimelineGenerator::with_default_timing(&workout);
        let request = GenerationRequest::seeded(5).with_supersets(Supersets::Unbounded);

        let reference = generator.generate(None, request, Some(6)).unwrap().events;

        let path = temp_dir.path().join("run.json");
        Checkpoint::new(&workout.name, paused_state(&workout))
            .save(&path)
            .unwrap();
        let resumed = Checkpoint::load(&path).unwrap().unwrap();
        let rest = generator
            .generate(Some(resumed.state), request, Some(3))
            .unwrap()
            .events;

        assert_eq!(rest.as_slice(), &reference[3..]);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(Checkpoint::load(&temp_dir.path().join("nope.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_corrupt_checkpoint_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Checkpoint::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_checkpoint_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A directory opens on some platforms but never reads as a file
        let path = temp_dir.path().join("latest.json");
        std::fs::create_dir(&path).unwrap();
        assert!(Checkpoint::load(&path).unwrap().is_none());

        let empty = temp_dir.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(Checkpoint::load(&empty).unwrap().is_none());
    }

    #[test]
    fn test_read_shared_releases_lock() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("run.json");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(read_shared(&path).unwrap(), "abc");
        let file = File::open(&path).unwrap();
        file.try_lock_exclusive().unwrap();
        file.unlock().unwrap();
    }
}
