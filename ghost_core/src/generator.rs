//! Timeline generation.
//!
//! The generator is a pull-based state machine: each call to
//! [`TimelineGenerator::generate`] continues from an optional
//! [`GeneratorState`], produces at most `max_events` events, and returns
//! either `Done` or `Paused` with the cursor needed to continue. Splitting a
//! run across any sequence of budgets yields the same events as one
//! unbounded call with the same seed.

use crate::config::{default_timing, TimingConfig};
use crate::cursor::{EntryRepeat, GenerationRequest, GeneratorState, PatternRunState, Supersets};
use crate::ordering::arrange;
use crate::resolver::ConfigResolver;
use crate::rng::{pattern_stream, SeededRng, WORKOUT_STREAM};
use crate::timing::{message_timing, shot_timing, MessageSlot, ShotSlot};
use crate::validate::ensure_valid;
use crate::{
    Entry, EntryKind, Error, IntervalOffsetType, Limit, NodeRef, Pattern, RepeatCount, Result,
    SubEvents, TimelineEvent, Workout,
};

/// Outcome of one generation call
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// Every superset has been generated
    Done,
    /// The call's budget was reached; continue from this cursor
    Paused(GeneratorState),
}

impl Progress {
    pub fn is_done(&self) -> bool {
        matches!(self, Progress::Done)
    }
}

/// Events produced by one call plus how to continue
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub events: Vec<TimelineEvent>,
    pub progress: Progress,
}

/// An event fresh from the entry loop, before hold-back is applied
struct Produced {
    event: TimelineEvent,
    skip_at_end: bool,
}

enum RunStep {
    Event(Produced),
    RunEnded,
    WorkoutEnded,
}

/// Produces timeline events for one validated workout
#[derive(Clone, Debug)]
pub struct TimelineGenerator<'a> {
    resolver: ConfigResolver<'a>,
    timing: &'a TimingConfig,
}

impl<'a> TimelineGenerator<'a> {
    pub fn new(workout: &'a Workout, timing: &'a TimingConfig) -> Self {
        Self {
            resolver: ConfigResolver::new(workout),
            timing,
        }
    }

    /// Generator using the built-in timing policy
    pub fn with_default_timing(workout: &'a Workout) -> Self {
        Self::new(workout, default_timing())
    }

    pub fn workout(&self) -> &'a Workout {
        self.resolver.workout()
    }

    /// Fresh cursor for `request`
    pub fn start(&self, request: GenerationRequest) -> Result<GeneratorState> {
        let mut workout_rng = SeededRng::new(request.seed, WORKOUT_STREAM);
        let supersets = match request.supersets {
            Some(supersets) => supersets,
            None => {
                let count = self.resolver.repeat_count(NodeRef::Workout)?;
                Supersets::Count(draw_repeat(count, &mut workout_rng))
            }
        };
        let iteration = self.resolver.iteration_type(NodeRef::Workout)?;

        tracing::info!(
            "Generating timeline for '{}' (seed {}, supersets {:?}, {:?})",
            self.workout().name,
            request.seed,
            supersets,
            iteration
        );
        Ok(GeneratorState::new(request.seed, supersets, iteration, workout_rng))
    }

    /// Produce up to `max_events` events, continuing from `state` when given.
    ///
    /// `request` is only consulted when starting fresh.
    pub fn generate(
        &self,
        state: Option<GeneratorState>,
        request: GenerationRequest,
        max_events: Option<usize>,
    ) -> Result<Batch> {
        if max_events == Some(0) {
            return Err(Error::Other("event budget must be at least 1".into()));
        }
        let mut st = match state {
            Some(st) => st,
            None => self.start(request)?,
        };
        if st.supersets == Supersets::Unbounded
            && max_events.is_none()
            && self.limit_at(NodeRef::Workout)? == Limit::AllShots
        {
            return Err(Error::Other(
                "unbounded supersets need an event budget or a workout limit".into(),
            ));
        }
        st.max_events = max_events;
        let budget = max_events.unwrap_or(usize::MAX);

        let mut events = Vec::new();
        loop {
            while events.len() < budget {
                match st.pending_events.pop_front() {
                    Some(event) => events.push(event),
                    None => break,
                }
            }
            if events.len() >= budget {
                break;
            }
            if st.finished {
                break;
            }

            match self.next_raw(&mut st)? {
                Some(produced) => {
                    if let Some(held) = st.held_for_end.take() {
                        st.pending_events.push_back(held);
                    }
                    if produced.skip_at_end {
                        st.held_for_end = Some(produced.event);
                    } else {
                        st.pending_events.push_back(produced.event);
                    }
                }
                None => {
                    if let Some(held) = st.held_for_end.take() {
                        tracing::debug!("Dropping trailing message '{}'", held.name);
                    }
                    st.finished = true;
                }
            }
        }
        st.total_events_generated += events.len() as u64;

        if st.finished && st.pending_events.is_empty() {
            tracing::info!(
                "Timeline complete: {} events, {:.1}s",
                st.total_events_generated,
                st.current_time
            );
            Ok(Batch {
                events,
                progress: Progress::Done,
            })
        } else {
            tracing::debug!(
                "Generation paused after {} events at {:.1}s",
                st.total_events_generated,
                st.current_time
            );
            Ok(Batch {
                events,
                progress: Progress::Paused(st),
            })
        }
    }

    /// The whole timeline in one call
    pub fn generate_all(&self, request: GenerationRequest) -> Result<Vec<TimelineEvent>> {
        let batch = self.generate(None, request, None)?;
        match batch.progress {
            Progress::Done => Ok(batch.events),
            Progress::Paused(_) => Err(Error::Other("unbudgeted generation paused".into())),
        }
    }

    fn limit_at(&self, node: NodeRef) -> Result<Limit> {
        let limits = self.resolver.limits(node)?;
        limits.to_limit().ok_or_else(|| Error::ConfigResolution {
            key: "limits.value".to_string(),
            node: node.to_string(),
        })
    }

    fn pattern_at(&self, index: usize) -> Result<&'a Pattern> {
        self.workout()
            .pattern(index)
            .ok_or_else(|| Error::Checkpoint(format!("cursor names missing pattern {}", index)))
    }

    /// Next element in play order, before hold-back; `None` once generation ends
    fn next_raw(&self, st: &mut GeneratorState) -> Result<Option<Produced>> {
        let workout_limit = self.limit_at(NodeRef::Workout)?;
        loop {
            if let Some(mut run) = st.pattern_run.take() {
                if run.run_active {
                    match self.step_run(st, &mut run, workout_limit)? {
                        RunStep::Event(produced) => {
                            st.pattern_run = Some(run);
                            return Ok(Some(produced));
                        }
                        RunStep::WorkoutEnded => {
                            tracing::info!(
                                "Workout limit {:?} reached at {:.1}s",
                                workout_limit,
                                st.current_time
                            );
                            return Ok(None);
                        }
                        RunStep::RunEnded => {
                            run.run_active = false;
                            run.pattern_runs_completed += 1;
                            tracing::debug!(
                                "Pattern {} run {}/{} ended at {:.1}s",
                                run.pattern,
                                run.pattern_runs_completed,
                                run.pattern_runs_total,
                                st.current_time
                            );
                        }
                    }
                }
                if run.has_more_runs() {
                    let order = self.arrange_entries(run.pattern, &mut run.rng, None)?;
                    run.begin_run(st.current_time, order);
                    st.pattern_run = Some(run);
                    continue;
                }
                if run.events_emitted == 0 && run.pattern_runs_total > 0 {
                    let id = self.pattern_at(run.pattern)?.id.as_str();
                    tracing::warn!("Pattern '{}' produced no events, moving on", id);
                }
                st.pattern_index = None;
            }

            if st.pattern_order.is_none() {
                if !st.supersets.allows(st.current_superset) {
                    return Ok(None);
                }
                let positions: Vec<_> = self
                    .workout()
                    .patterns
                    .iter()
                    .map(|p| p.position_type)
                    .collect();
                let order = arrange(
                    &positions,
                    st.workout_iteration_type,
                    &mut st.workout_rng,
                    None,
                );
                tracing::debug!("Superset {} pattern order {:?}", st.current_superset, order);
                st.pattern_order = Some(order);
                st.pattern_order_index = 0;
            }

            let next = st
                .pattern_order
                .as_ref()
                .and_then(|order| order.get(st.pattern_order_index).copied());
            match next {
                Some(p) => {
                    st.pattern_order_index += 1;
                    self.start_pattern(st, p)?;
                }
                None => {
                    if st.supersets == Supersets::Unbounded
                        && superset_stalled(st, workout_limit)
                    {
                        tracing::warn!(
                            "Superset {} made no progress; stopping unbounded generation",
                            st.current_superset
                        );
                        return Ok(None);
                    }
                    st.current_superset += 1;
                    st.begin_superset();
                }
            }
        }
    }

    fn start_pattern(&self, st: &mut GeneratorState, p: usize) -> Result<()> {
        let pattern = self.pattern_at(p)?;
        if pattern.entries.is_empty() {
            tracing::warn!("Pattern '{}' has no playable entries, skipping", pattern.id);
            return Ok(());
        }
        let stream = pattern_stream(st.current_superset, self.workout().patterns.len(), p);
        let mut rng = SeededRng::new(st.workout_seed, stream);
        let count = self.resolver.repeat_count(NodeRef::Pattern { pattern: p })?;
        let runs = draw_repeat(count, &mut rng);
        tracing::debug!(
            "Pattern '{}' starting with {} run(s) at {:.1}s",
            pattern.id,
            runs,
            st.current_time
        );
        st.pattern_index = Some(p);
        st.pattern_run = Some(PatternRunState::new(p, runs, rng));
        Ok(())
    }

    fn arrange_entries(
        &self,
        p: usize,
        rng: &mut SeededRng,
        avoid_first: Option<usize>,
    ) -> Result<Vec<usize>> {
        let pattern = self.pattern_at(p)?;
        let iteration = self.resolver.iteration_type(NodeRef::Pattern { pattern: p })?;
        let positions: Vec<_> = pattern.entries.iter().map(|e| e.position_type).collect();
        Ok(arrange(&positions, iteration, rng, avoid_first))
    }

    /// Advance the active run by one element
    fn step_run(
        &self,
        st: &mut GeneratorState,
        run: &mut PatternRunState,
        workout_limit: Limit,
    ) -> Result<RunStep> {
        let p = run.pattern;
        let pattern = self.pattern_at(p)?;
        let limit = self.limit_at(NodeRef::Pattern { pattern: p })?;

        let entry_index = loop {
            if let Some(current) = run.current_entry {
                if current.remaining > 0 {
                    break current.entry;
                }
                run.current_entry = None;
            }
            match run.available_entries.pop_front() {
                Some(e) => {
                    let node = NodeRef::Entry { pattern: p, entry: e };
                    let reps = draw_repeat(self.resolver.repeat_count(node)?, &mut run.rng);
                    if reps > 0 {
                        run.current_entry = Some(EntryRepeat {
                            entry: e,
                            remaining: reps,
                        });
                    }
                }
                None => {
                    if limit == Limit::AllShots
                        || exhausted(limit, run.pattern_shots_played, run.pattern_time_elapsed)
                    {
                        return Ok(RunStep::RunEnded);
                    }
                    let stalled = match limit {
                        Limit::ShotLimit(_) => run.pass_shots == 0,
                        _ => run.pass_time <= 0.0,
                    };
                    if stalled {
                        tracing::warn!(
                            "Pattern '{}' pass made no progress under {:?}; ending run",
                            pattern.id,
                            limit
                        );
                        return Ok(RunStep::RunEnded);
                    }
                    let order = self.arrange_entries(p, &mut run.rng, run.last_played_entry)?;
                    run.refill(order);
                }
            }
        };

        let entry = pattern.entries.get(entry_index).ok_or_else(|| {
            Error::Checkpoint(format!("cursor names missing entry {} in '{}'", entry_index, pattern.id))
        })?;
        if !admits(
            limit,
            run.pattern_shots_played,
            run.pattern_time_elapsed,
            run.last_was_shot,
            entry.kind,
        ) {
            return Ok(RunStep::RunEnded);
        }
        if !admits(
            workout_limit,
            st.workout_total_shots,
            st.workout_total_time,
            st.workout_last_was_shot,
            entry.kind,
        ) {
            return Ok(RunStep::WorkoutEnded);
        }

        let node = NodeRef::Entry {
            pattern: p,
            entry: entry_index,
        };
        let produced = self.build_event(pattern, entry, node, st.current_time, &mut run.rng)?;

        let duration = produced.event.duration;
        st.current_time = produced.event.end_time;
        st.workout_total_time += duration;
        st.superset_time += duration;
        st.superset_events += 1;
        run.pattern_time_elapsed += duration;
        run.pass_time += duration;
        run.events_emitted += 1;

        let is_shot = entry.is_shot();
        if is_shot {
            st.workout_total_shots += 1;
            st.superset_shots += 1;
            run.pattern_shots_played += 1;
            run.pass_shots += 1;
        }
        st.workout_last_was_shot = is_shot;
        run.last_was_shot = is_shot;
        run.last_played_entry = Some(entry_index);
        if let Some(current) = run.current_entry.as_mut() {
            current.remaining -= 1;
        }

        Ok(RunStep::Event(produced))
    }

    fn build_event(
        &self,
        pattern: &Pattern,
        entry: &Entry,
        node: NodeRef,
        start: f64,
        rng: &mut SeededRng,
    ) -> Result<Produced> {
        let r = &self.resolver;
        let interval = r.interval(node)?;
        let voice = r.voice(node)?;
        let speech_rate = r.speech_rate(node)?;

        let (end_time, sub_events, skip_at_end) = match entry.kind {
            EntryKind::Shot => {
                let bounds = r.offset(node)?;
                let offset = match r.offset_type(node)? {
                    IntervalOffsetType::Fixed => bounds.min,
                    IntervalOffsetType::Random => rng.uniform(bounds.min, bounds.max),
                };
                let timing = shot_timing(
                    self.timing,
                    ShotSlot {
                        start,
                        slot_duration: (interval + offset).max(0.0),
                        lead_time: r.lead_time(node)?,
                        split_step: r.split_step_speed(node)?,
                        auto_voice_split_step: r.auto_voice_split_step(node)?,
                    },
                );
                (timing.beep_time, SubEvents::Shot(timing), false)
            }
            EntryKind::Message => {
                let text = r.message(node)?;
                let (end, timing) = message_timing(
                    self.timing,
                    MessageSlot {
                        start,
                        text: &text,
                        speech_rate,
                        interval,
                        interval_type: r.interval_type(node)?,
                        countdown: r.countdown(node)?,
                    },
                );
                (end, SubEvents::Message(timing), r.skip_at_end_of_workout(node)?)
            }
        };

        Ok(Produced {
            event: TimelineEvent {
                id: entry.id.clone(),
                name: entry.name.clone(),
                kind: entry.kind,
                pattern_id: pattern.id.clone(),
                start_time: start,
                end_time,
                duration: end_time - start,
                voice,
                speech_rate,
                sub_events,
            },
            skip_at_end,
        })
    }
}

/// Validate `workout` and generate its full timeline with the default policy
pub fn generate_timeline(workout: &Workout, seed: u64) -> Result<Vec<TimelineEvent>> {
    ensure_valid(workout)?;
    TimelineGenerator::with_default_timing(workout).generate_all(GenerationRequest::seeded(seed))
}

fn draw_repeat(count: RepeatCount, rng: &mut SeededRng) -> u32 {
    match count {
        RepeatCount::Fixed(n) => n,
        RepeatCount::Random { min, max } => rng.int_inclusive(min, max),
    }
}

/// Whether an element of `kind` may start given progress so far
fn admits(limit: Limit, shots: u32, elapsed: f64, last_was_shot: bool, kind: EntryKind) -> bool {
    match limit {
        Limit::AllShots => true,
        // A message right after the final shot still plays.
        Limit::ShotLimit(n) => shots < n || (kind == EntryKind::Message && last_was_shot),
        Limit::TimeLimit(d) => elapsed < d,
    }
}

fn exhausted(limit: Limit, shots: u32, elapsed: f64) -> bool {
    match limit {
        Limit::AllShots => false,
        Limit::ShotLimit(n) => shots >= n,
        Limit::TimeLimit(d) => elapsed >= d,
    }
}

fn superset_stalled(st: &GeneratorState, workout_limit: Limit) -> bool {
    match workout_limit {
        Limit::AllShots => st.superset_events == 0,
        Limit::ShotLimit(_) => st.superset_shots == 0,
        Limit::TimeLimit(_) => st.superset_time <= 0.0,
    }
}
