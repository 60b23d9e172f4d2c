//! Core domain types for ghosting workouts.
//!
//! This module defines the fundamental types used throughout the system:
//! - The workout document (workout, patterns, entries) in its saved JSON form
//! - Sparse per-node configuration
//! - Position locking/linking
//! - Generated timeline events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lead time the editor writes into newly created shots.
///
/// Distinct from [`crate::resolver::DEFAULT_ANNOUNCEMENT_LEAD_TIME`], which is
/// what a shot with no explicit lead time anywhere in its chain resolves to.
pub const EDITOR_DEFAULT_ANNOUNCEMENT_LEAD_TIME: f64 = 2.5;

// ============================================================================
// Configuration value types
// ============================================================================

/// How many times a node repeats: a fixed count or a seeded draw in `[min, max]`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RepeatCount {
    Fixed(u32),
    Random { min: u32, max: u32 },
}

/// Bounds for the per-repetition interval offset, in seconds
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntervalOffset {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntervalOffsetType {
    Fixed,
    Random,
}

/// Split step cue tempo
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStepSpeed {
    None,
    Slow,
    Medium,
    Fast,
    /// Resolved to slow/medium/fast from the slot duration
    AutoScale,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IterationType {
    InOrder,
    Shuffle,
}

/// How a message's interval relates to its narration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    /// Interval measured from the message start
    Fixed,
    /// Interval added after the narration ends
    Additional,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LimitType {
    AllShots,
    ShotLimit,
    TimeLimit,
}

/// Limits as stored in the saved document
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Limits {
    #[serde(rename = "type")]
    pub kind: LimitType,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Typed view of [`Limits`] after validation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Limit {
    AllShots,
    ShotLimit(u32),
    TimeLimit(f64),
}

impl Limits {
    pub fn all_shots() -> Self {
        Self {
            kind: LimitType::AllShots,
            value: None,
        }
    }

    pub fn shot_limit(n: u32) -> Self {
        Self {
            kind: LimitType::ShotLimit,
            value: Some(n as f64),
        }
    }

    pub fn time_limit(seconds: f64) -> Self {
        Self {
            kind: LimitType::TimeLimit,
            value: Some(seconds),
        }
    }

    /// Typed limit, or `None` when a capped limit is missing its value
    pub fn to_limit(&self) -> Option<Limit> {
        match self.kind {
            LimitType::AllShots => Some(Limit::AllShots),
            LimitType::ShotLimit => self.value.map(|v| Limit::ShotLimit(v.max(0.0) as u32)),
            LimitType::TimeLimit => self.value.map(Limit::TimeLimit),
        }
    }
}

// ============================================================================
// Position locking/linking
// ============================================================================

/// Where an entry (or pattern) sits when its siblings are arranged
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PositionType {
    #[default]
    Normal,
    /// Travels with the preceding sibling
    LinkedToPrevious,
    /// Pinned to a 0-based slot
    LockedAtIndex(usize),
    /// Pinned after everything else
    LockedLast,
}

impl PositionType {
    pub fn is_normal(&self) -> bool {
        matches!(self, PositionType::Normal)
    }
}

// ============================================================================
// Sparse node configuration
// ============================================================================

/// Explicitly customized settings of one node.
///
/// A `None` field means "inherit", never zero or false.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<RepeatCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_announcement_lead_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_offset_type: Option<IntervalOffsetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_offset: Option<IntervalOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_step_speed: Option<SplitStepSpeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_voice_split_step: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_type: Option<IntervalType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_at_end_of_workout: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_type: Option<IterationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
}

// ============================================================================
// Workout document
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Shot,
    Message,
}

/// A shot or message inside a pattern
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub position_type: PositionType,
    #[serde(default)]
    pub config: NodeConfig,
}

impl Entry {
    pub fn shot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Shot,
            position_type: PositionType::Normal,
            config: NodeConfig::default(),
        }
    }

    /// A shot as the editor creates it, with the editor's lead time written out
    pub fn new_for_editor(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut entry = Self::shot(id, name);
        entry.config.shot_announcement_lead_time = Some(EDITOR_DEFAULT_ANNOUNCEMENT_LEAD_TIME);
        entry
    }

    pub fn message(
        id: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Message,
            position_type: PositionType::Normal,
            config: NodeConfig {
                message: Some(text.into()),
                ..NodeConfig::default()
            },
        }
    }

    pub fn with_position(mut self, position: PositionType) -> Self {
        self.position_type = position;
        self
    }

    /// Overlay the keys set in `config`, keeping any already set
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config.overlay(&config);
        self
    }

    pub fn is_shot(&self) -> bool {
        self.kind == EntryKind::Shot
    }
}

/// A named, ordered group of entries
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position_type: PositionType,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Pattern {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position_type: PositionType::Normal,
            config: NodeConfig::default(),
            entries,
        }
    }

    /// Overlay the keys set in `config`, keeping any already set
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config.overlay(&config);
        self
    }

    pub fn with_position(mut self, position: PositionType) -> Self {
        self.position_type = position;
        self
    }

    pub fn shot_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_shot()).count()
    }
}

/// The complete workout document
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub name: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl Workout {
    pub fn new(name: impl Into<String>, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            config: NodeConfig::default(),
            patterns,
        }
    }

    /// Overlay the keys set in `config`, keeping any already set
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config.overlay(&config);
        self
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn entry(&self, pattern: usize, entry: usize) -> Option<&Entry> {
        self.patterns.get(pattern).and_then(|p| p.entries.get(entry))
    }

    /// Config stored on a node, if the node exists
    pub fn node_config(&self, node: NodeRef) -> Option<&NodeConfig> {
        match node {
            NodeRef::Workout => Some(&self.config),
            NodeRef::Pattern { pattern } => self.pattern(pattern).map(|p| &p.config),
            NodeRef::Entry { pattern, entry } => self.entry(pattern, entry).map(|e| &e.config),
        }
    }

    pub fn node_config_mut(&mut self, node: NodeRef) -> Option<&mut NodeConfig> {
        match node {
            NodeRef::Workout => Some(&mut self.config),
            NodeRef::Pattern { pattern } => self.patterns.get_mut(pattern).map(|p| &mut p.config),
            NodeRef::Entry { pattern, entry } => self
                .patterns
                .get_mut(pattern)
                .and_then(|p| p.entries.get_mut(entry))
                .map(|e| &mut e.config),
        }
    }
}

/// Address of a node in a workout document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    Workout,
    Pattern { pattern: usize },
    Entry { pattern: usize, entry: usize },
}

impl NodeRef {
    /// The node one level up, `None` for the workout itself
    pub fn parent(&self) -> Option<NodeRef> {
        match *self {
            NodeRef::Workout => None,
            NodeRef::Pattern { .. } => Some(NodeRef::Workout),
            NodeRef::Entry { pattern, .. } => Some(NodeRef::Pattern { pattern }),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Workout => write!(f, "workout"),
            NodeRef::Pattern { pattern } => write!(f, "patterns[{}]", pattern),
            NodeRef::Entry { pattern, entry } => {
                write!(f, "patterns[{}].entries[{}]", pattern, entry)
            }
        }
    }
}

// ============================================================================
// Timeline
// ============================================================================

/// Shot sub-event timestamps, absolute seconds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShotTiming {
    pub announced_time: f64,
    pub beep_time: f64,
    pub split_step_time: Option<f64>,
    pub split_step_speed: Option<SplitStepSpeed>,
    pub auto_voice_split_step: bool,
}

/// Window in which a playback layer counts down whole seconds
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CountdownWindow {
    pub start: f64,
    pub end: f64,
}

/// Message sub-event timestamps, absolute seconds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageTiming {
    pub message_start: f64,
    pub tts_end: f64,
    pub text: String,
    pub countdown: Option<CountdownWindow>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SubEvents {
    Shot(ShotTiming),
    Message(MessageTiming),
}

/// One scheduled element of the generated timeline
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    pub pattern_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub voice: String,
    pub speech_rate: f64,
    pub sub_events: SubEvents,
}

impl TimelineEvent {
    pub fn is_shot(&self) -> bool {
        self.kind == EntryKind::Shot
    }

    pub fn shot_timing(&self) -> Option<&ShotTiming> {
        match &self.sub_events {
            SubEvents::Shot(timing) => Some(timing),
            SubEvents::Message(_) => None,
        }
    }

    pub fn message_timing(&self) -> Option<&MessageTiming> {
        match &self.sub_events {
            SubEvents::Message(timing) => Some(timing),
            SubEvents::Shot(_) => None,
        }
    }

    /// Whether `t` falls in `[start_time, end_time)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_type_wire_form() {
        assert_eq!(
            serde_json::to_string(&PositionType::LinkedToPrevious).unwrap(),
            "\"linkedToPrevious\""
        );
        assert_eq!(
            serde_json::to_string(&PositionType::LockedAtIndex(2)).unwrap(),
            "{\"lockedAtIndex\":2}"
        );
        let parsed: PositionType = serde_json::from_str("\"lockedLast\"").unwrap();
        assert_eq!(parsed, PositionType::LockedLast);
    }

    #[test]
    fn test_repeat_count_forms() {
        let fixed: RepeatCount = serde_json::from_str("3").unwrap();
        assert_eq!(fixed, RepeatCount::Fixed(3));

        let random: RepeatCount = serde_json::from_str(r#"{"min": 1, "max": 4}"#).unwrap();
        assert_eq!(random, RepeatCount::Random { min: 1, max: 4 });
    }

    #[test]
    fn test_sparse_config_serializes_only_set_keys() {
        let config = NodeConfig {
            interval: Some(4.0),
            ..NodeConfig::default()
        };
        assert_eq!(serde_json::to_string(&config).unwrap(), r#"{"interval":4.0}"#);
    }

    #[test]
    fn test_limits_typed_view() {
        assert_eq!(Limits::all_shots().to_limit(), Some(Limit::AllShots));
        assert_eq!(Limits::shot_limit(3).to_limit(), Some(Limit::ShotLimit(3)));
        let missing = Limits {
            kind: LimitType::TimeLimit,
            value: None,
        };
        assert_eq!(missing.to_limit(), None);
    }

    #[test]
    fn test_editor_shot_carries_editor_lead_time() {
        let shot = Entry::new_for_editor("s1", "Front Forehand");
        assert_eq!(
            shot.config.shot_announcement_lead_time,
            Some(EDITOR_DEFAULT_ANNOUNCEMENT_LEAD_TIME)
        );
    }

    #[test]
    fn test_node_ref_paths() {
        assert_eq!(NodeRef::Entry { pattern: 1, entry: 2 }.to_string(), "patterns[1].entries[2]");
        assert_eq!(
            NodeRef::Entry { pattern: 1, entry: 2 }.parent(),
            Some(NodeRef::Pattern { pattern: 1 })
        );
        assert_eq!(NodeRef::Workout.parent(), None);
    }
}
