//! Playback lookup over a materialized timeline.
//!
//! A [`PlaybackIndex`] answers two questions a player asks every tick: which
//! event is active at time `t` (and in which phase), and which sound cues
//! became due since the previous tick. A [`PlaybackCursor`] carries the
//! played-marks so scrubbing never replays or loses cues.

use crate::{SplitStepSpeed, SubEvents, TimelineEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Sound cues
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum CueKind {
    /// Shot name narrated ahead of the beep
    Announcement,
    SplitStep,
    Beep,
    /// Message text narrated at message start
    Narration,
}

/// Stable identity of a cue, used for played-marks
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CueKey {
    /// Position of the owning event in the timeline
    pub event: usize,
    pub kind: CueKind,
    pub at_micros: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    Beep,
    SplitStep(SplitStepSpeed),
}

/// What a cue asks the audio layer to do
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CueAction {
    Narrate {
        text: String,
        voice: String,
        speech_rate: f64,
    },
    Tone(Tone),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SoundCue {
    pub key: CueKey,
    /// Trigger time in seconds
    pub at: f64,
    pub action: CueAction,
}

fn to_micros(t: f64) -> i64 {
    (t * 1_000_000.0).round() as i64
}

// ============================================================================
// Active event
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Before a shot's beep
    Preparing,
    /// At or after a shot's beep
    Executing,
    /// Message narration in progress
    Tts,
    /// Narration over, counting down to the next element
    Countdown,
    /// Narration over, no countdown configured
    Waiting,
}

/// The event under the playhead
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveEvent<'a> {
    pub event: &'a TimelineEvent,
    pub phase: Phase,
    /// Seconds until the current phase ends
    pub remaining: f64,
    /// Whole seconds left, only during a countdown
    pub countdown_seconds: Option<u32>,
}

// ============================================================================
// Index
// ============================================================================

/// Read-only lookup structure built once per timeline
#[derive(Clone, Debug, Default)]
pub struct PlaybackIndex {
    events: Vec<TimelineEvent>,
    /// Event positions sorted by start time
    shots: Vec<usize>,
    messages: Vec<usize>,
    cues: Vec<SoundCue>,
}

impl PlaybackIndex {
    pub fn new(events: Vec<TimelineEvent>) -> Self {
        let by_start = |kind_is_shot: bool| {
            let mut ids: Vec<usize> = events
                .iter()
                .enumerate()
                .filter(|(_, e)| e.is_shot() == kind_is_shot)
                .map(|(i, _)| i)
                .collect();
            ids.sort_by(|&a, &b| events[a].start_time.total_cmp(&events[b].start_time));
            ids
        };
        let shots = by_start(true);
        let messages = by_start(false);

        let mut cues = Vec::new();
        for (i, event) in events.iter().enumerate() {
            collect_cues(i, event, &mut cues);
        }
        cues.sort_by(|a, b| a.at.total_cmp(&b.at).then(a.key.cmp(&b.key)));

        tracing::debug!(
            "Playback index: {} shots, {} messages, {} cues",
            shots.len(),
            messages.len(),
            cues.len()
        );
        Self {
            events,
            shots,
            messages,
            cues,
        }
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn cues(&self) -> &[SoundCue] {
        &self.cues
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last event
    pub fn duration(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.end_time)
            .fold(0.0, f64::max)
    }

    fn active_in(&self, ids: &[usize], t: f64) -> Option<usize> {
        let after = ids.partition_point(|&i| self.events[i].start_time <= t);
        let candidate = *ids.get(after.checked_sub(1)?)?;
        self.events[candidate].contains(t).then_some(candidate)
    }

    /// The event whose `[start, end)` contains `t`; messages win ties
    pub fn find_active_event(&self, t: f64) -> Option<&TimelineEvent> {
        self.active_in(&self.messages, t)
            .or_else(|| self.active_in(&self.shots, t))
            .map(|i| &self.events[i])
    }

    /// Active event plus its phase at `t`
    pub fn active_at(&self, t: f64) -> Option<ActiveEvent<'_>> {
        let event = self.find_active_event(t)?;
        let (phase, remaining, countdown_seconds) = match &event.sub_events {
            SubEvents::Shot(shot) => {
                if t < shot.beep_time {
                    (Phase::Preparing, shot.beep_time - t, None)
                } else {
                    (Phase::Executing, event.end_time - t, None)
                }
            }
            SubEvents::Message(message) => {
                if t < message.tts_end {
                    (Phase::Tts, message.tts_end - t, None)
                } else if let Some(window) = message.countdown {
                    let left = window.end - t;
                    (Phase::Countdown, left, Some(left.ceil().max(0.0) as u32))
                } else {
                    (Phase::Waiting, event.end_time - t, None)
                }
            }
        };
        Some(ActiveEvent {
            event,
            phase,
            remaining,
            countdown_seconds,
        })
    }

    /// Cues triggering in `(prev, t]`
    pub fn due_sound_events(&self, prev: f64, t: f64) -> &[SoundCue] {
        if t <= prev {
            return &[];
        }
        let lo = self.cues.partition_point(|c| c.at <= prev);
        let hi = self.cues.partition_point(|c| c.at <= t);
        &self.cues[lo..hi]
    }

    /// Cues triggering in `[from, t]`
    fn cues_from(&self, from: f64, t: f64) -> &[SoundCue] {
        if t < from {
            return &[];
        }
        let lo = self.cues.partition_point(|c| c.at < from);
        let hi = self.cues.partition_point(|c| c.at <= t);
        &self.cues[lo..hi]
    }

    fn cues_before(&self, t: f64) -> &[SoundCue] {
        &self.cues[..self.cues.partition_point(|c| c.at < t)]
    }
}

fn collect_cues(index: usize, event: &TimelineEvent, cues: &mut Vec<SoundCue>) {
    let mut push = |kind: CueKind, at: f64, action: CueAction| {
        cues.push(SoundCue {
            key: CueKey {
                event: index,
                kind,
                at_micros: to_micros(at),
            },
            at,
            action,
        });
    };
    let narrate = |text: &str| CueAction::Narrate {
        text: text.to_string(),
        voice: event.voice.clone(),
        speech_rate: event.speech_rate,
    };

    match &event.sub_events {
        SubEvents::Shot(shot) => {
            push(CueKind::Announcement, shot.announced_time, narrate(&event.name));
            if let (Some(at), Some(speed), true) = (
                shot.split_step_time,
                shot.split_step_speed,
                shot.auto_voice_split_step,
            ) {
                push(CueKind::SplitStep, at, CueAction::Tone(Tone::SplitStep(speed)));
            }
            push(CueKind::Beep, shot.beep_time, CueAction::Tone(Tone::Beep));
        }
        SubEvents::Message(message) => {
            push(CueKind::Narration, message.message_start, narrate(&message.text));
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Playhead plus the set of cues already played
#[derive(Clone, Debug)]
pub struct PlaybackCursor {
    position: f64,
    /// Whether cues exactly at `position` are still due
    inclusive: bool,
    played: BTreeSet<CueKey>,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            inclusive: true,
            played: BTreeSet::new(),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_played(&self, key: &CueKey) -> bool {
        self.played.contains(key)
    }

    /// Advance to `t`, returning cues newly due and marking them played.
    ///
    /// A `t` behind the playhead is treated as a backward scrub.
    pub fn sample(&mut self, index: &PlaybackIndex, t: f64) -> Vec<SoundCue> {
        if t < self.position {
            self.seek(index, t);
        }
        let window = if self.inclusive {
            index.cues_from(self.position, t)
        } else {
            index.due_sound_events(self.position, t)
        };
        let due: Vec<SoundCue> = window
            .iter()
            .filter(|cue| self.played.insert(cue.key))
            .cloned()
            .collect();

        self.position = t;
        self.inclusive = false;
        due
    }

    /// Jump the playhead to `t` without firing anything
    pub fn seek(&mut self, index: &PlaybackIndex, t: f64) {
        if t < self.position {
            let cutoff = to_micros(t);
            let before = self.played.len();
            self.played.retain(|key| key.at_micros < cutoff);
            tracing::debug!(
                "Scrubbed back to {:.2}s, cleared {} cue(s)",
                t,
                before - self.played.len()
            );
        } else if t > self.position {
            for cue in index.cues_before(t) {
                self.played.insert(cue.key);
            }
        }
        self.position = t;
        self.inclusive = true;
    }
}
