//! Resumable generation cursor.
//!
//! A [`GeneratorState`] holds everything the generator needs to continue
//! exactly where a budgeted call stopped: the superset pass and pattern order,
//! the active pattern's run counters and shuffle-bag remainder, every RNG
//! stream position, and events produced but not yet handed out.

use crate::rng::SeededRng;
use crate::{IterationType, TimelineEvent};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How many passes over the pattern list to generate
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Supersets {
    Count(u32),
    /// Only meaningful with a per-call budget or a workout-level limit
    Unbounded,
}

impl Supersets {
    pub fn allows(&self, superset: u32) -> bool {
        match self {
            Supersets::Count(n) => superset < *n,
            Supersets::Unbounded => true,
        }
    }
}

/// Parameters of a fresh generation run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub seed: u64,
    /// Overrides the workout's own superset count
    pub supersets: Option<Supersets>,
}

impl GenerationRequest {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            supersets: None,
        }
    }

    pub fn with_supersets(mut self, supersets: Supersets) -> Self {
        self.supersets = Some(supersets);
        self
    }
}

/// An entry currently being repeated
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryRepeat {
    pub entry: usize,
    pub remaining: u32,
}

/// Progress through one pattern's runs
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatternRunState {
    /// Source index of the pattern
    pub pattern: usize,
    pub pattern_runs_total: u32,
    pub pattern_runs_completed: u32,
    pub run_active: bool,
    pub pattern_shots_played: u32,
    pub pattern_time_elapsed: f64,
    pub run_start_time: f64,
    /// Remainder of the current pass, in play order
    pub available_entries: VecDeque<usize>,
    pub last_played_entry: Option<usize>,
    pub last_was_shot: bool,
    pub current_entry: Option<EntryRepeat>,
    pub pass_shots: u32,
    pub pass_time: f64,
    /// Events emitted across every run of this pattern visit
    #[serde(default)]
    pub events_emitted: u64,
    pub rng: SeededRng,
}

impl PatternRunState {
    pub fn new(pattern: usize, runs_total: u32, rng: SeededRng) -> Self {
        Self {
            pattern,
            pattern_runs_total: runs_total,
            pattern_runs_completed: 0,
            run_active: false,
            pattern_shots_played: 0,
            pattern_time_elapsed: 0.0,
            run_start_time: 0.0,
            available_entries: VecDeque::new(),
            last_played_entry: None,
            last_was_shot: false,
            current_entry: None,
            pass_shots: 0,
            pass_time: 0.0,
            events_emitted: 0,
            rng,
        }
    }

    /// Reset per-run counters for a run starting at `now`
    pub fn begin_run(&mut self, now: f64, order: Vec<usize>) {
        self.run_active = true;
        self.pattern_shots_played = 0;
        self.pattern_time_elapsed = 0.0;
        self.run_start_time = now;
        self.last_was_shot = false;
        self.current_entry = None;
        self.refill(order);
    }

    /// Load the next pass into the shuffle bag
    pub fn refill(&mut self, order: Vec<usize>) {
        self.available_entries = order.into();
        self.pass_shots = 0;
        self.pass_time = 0.0;
    }

    pub fn has_more_runs(&self) -> bool {
        self.pattern_runs_completed < self.pattern_runs_total
    }
}

/// Resumable cursor over one generation run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorState {
    pub workout_seed: u64,
    pub supersets: Supersets,
    pub current_superset: u32,
    /// Progress made during the current superset pass
    pub superset_events: u64,
    pub superset_shots: u32,
    pub superset_time: f64,
    /// Source index of the active pattern
    pub pattern_index: Option<usize>,
    /// Arranged pattern order for the current pass; `None` until the pass begins
    pub pattern_order: Option<Vec<usize>>,
    pub pattern_order_index: usize,
    pub workout_iteration_type: IterationType,
    pub current_time: f64,
    pub workout_total_shots: u32,
    pub workout_total_time: f64,
    pub workout_last_was_shot: bool,
    pub total_events_generated: u64,
    /// Budget of the most recent call
    pub max_events: Option<usize>,
    /// Produced, in order, not yet returned to a caller
    pub pending_events: VecDeque<TimelineEvent>,
    /// A skip-at-end message waiting to learn whether anything follows it
    pub held_for_end: Option<TimelineEvent>,
    pub finished: bool,
    pub workout_rng: SeededRng,
    pub pattern_run: Option<PatternRunState>,
}

impl GeneratorState {
    pub fn new(
        workout_seed: u64,
        supersets: Supersets,
        workout_iteration_type: IterationType,
        workout_rng: SeededRng,
    ) -> Self {
        Self {
            workout_seed,
            supersets,
            current_superset: 0,
            superset_events: 0,
            superset_shots: 0,
            superset_time: 0.0,
            pattern_index: None,
            pattern_order: None,
            pattern_order_index: 0,
            workout_iteration_type,
            current_time: 0.0,
            workout_total_shots: 0,
            workout_total_time: 0.0,
            workout_last_was_shot: false,
            total_events_generated: 0,
            max_events: None,
            pending_events: VecDeque::new(),
            held_for_end: None,
            finished: false,
            workout_rng,
            pattern_run: None,
        }
    }

    /// Start counting progress for a new superset pass
    pub fn begin_superset(&mut self) {
        self.superset_events = 0;
        self.superset_shots = 0;
        self.superset_time = 0.0;
        self.pattern_order = None;
        self.pattern_order_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supersets_allow() {
        assert!(Supersets::Count(2).allows(1));
        assert!(!Supersets::Count(2).allows(2));
        assert!(Supersets::Unbounded.allows(10_000));
    }

    #[test]
    fn test_begin_run_resets_counters() {
        let mut run = PatternRunState::new(0, 2, SeededRng::new(1, 1));
        run.pattern_shots_played = 4;
        run.pattern_time_elapsed = 12.0;
        run.begin_run(30.0, vec![2, 0, 1]);

        assert!(run.run_active);
        assert_eq!(run.pattern_shots_played, 0);
        assert_eq!(run.run_start_time, 30.0);
        assert_eq!(run.available_entries, VecDeque::from(vec![2, 0, 1]));
    }

    #[test]
    fn test_state_roundtrips_through_json() {
        let mut state = GeneratorState::new(
            9,
            Supersets::Unbounded,
            IterationType::Shuffle,
            SeededRng::new(9, 0),
        );
        state.pattern_run = Some(PatternRunState::new(1, 3, SeededRng::new(9, 2)));
        state.current_time = 17.25;

        let json = serde_json::to_string(&state).unwrap();
        let restored: GeneratorState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
