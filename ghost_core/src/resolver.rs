//! Effective-value resolution over the workout tree.
//!
//! A node's config only holds keys the author customized. Resolving a key
//! walks entry → pattern → workout and falls back to [`ConfigDefaults`].
//! Node-scoped keys (`repeatCount`, `iterationType`, `limits`) describe the
//! node they sit on and skip the ancestors.

use crate::{
    Error, IntervalOffset, IntervalOffsetType, IntervalType, IterationType, Limits, NodeConfig,
    NodeRef, RepeatCount, Result, SplitStepSpeed, Workout,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lead time a shot resolves to when nothing in its chain sets one
pub const DEFAULT_ANNOUNCEMENT_LEAD_TIME: f64 = 1.0;

/// Voice name meaning "the host's default voice"
pub const DEFAULT_VOICE: &str = "Default";

/// A configurable setting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigKey {
    RepeatCount,
    Interval,
    ShotAnnouncementLeadTime,
    IntervalOffsetType,
    IntervalOffset,
    SplitStepSpeed,
    AutoVoiceSplitStep,
    Voice,
    SpeechRate,
    Message,
    IntervalType,
    Countdown,
    SkipAtEndOfWorkout,
    IterationType,
    Limits,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 15] = [
        ConfigKey::RepeatCount,
        ConfigKey::Interval,
        ConfigKey::ShotAnnouncementLeadTime,
        ConfigKey::IntervalOffsetType,
        ConfigKey::IntervalOffset,
        ConfigKey::SplitStepSpeed,
        ConfigKey::AutoVoiceSplitStep,
        ConfigKey::Voice,
        ConfigKey::SpeechRate,
        ConfigKey::Message,
        ConfigKey::IntervalType,
        ConfigKey::Countdown,
        ConfigKey::SkipAtEndOfWorkout,
        ConfigKey::IterationType,
        ConfigKey::Limits,
    ];

    /// Whether descendants inherit this key from their ancestors
    pub fn is_inherited(&self) -> bool {
        !matches!(
            self,
            ConfigKey::RepeatCount
                | ConfigKey::IterationType
                | ConfigKey::Limits
                | ConfigKey::Message
        )
    }

    /// Name as it appears in the saved document
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::RepeatCount => "repeatCount",
            ConfigKey::Interval => "interval",
            ConfigKey::ShotAnnouncementLeadTime => "shotAnnouncementLeadTime",
            ConfigKey::IntervalOffsetType => "intervalOffsetType",
            ConfigKey::IntervalOffset => "intervalOffset",
            ConfigKey::SplitStepSpeed => "splitStepSpeed",
            ConfigKey::AutoVoiceSplitStep => "autoVoiceSplitStep",
            ConfigKey::Voice => "voice",
            ConfigKey::SpeechRate => "speechRate",
            ConfigKey::Message => "message",
            ConfigKey::IntervalType => "intervalType",
            ConfigKey::Countdown => "countdown",
            ConfigKey::SkipAtEndOfWorkout => "skipAtEndOfWorkout",
            ConfigKey::IterationType => "iterationType",
            ConfigKey::Limits => "limits",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting together with its value
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    RepeatCount(RepeatCount),
    Interval(f64),
    ShotAnnouncementLeadTime(f64),
    IntervalOffsetType(IntervalOffsetType),
    IntervalOffset(IntervalOffset),
    SplitStepSpeed(SplitStepSpeed),
    AutoVoiceSplitStep(bool),
    Voice(String),
    SpeechRate(f64),
    Message(String),
    IntervalType(IntervalType),
    Countdown(bool),
    SkipAtEndOfWorkout(bool),
    IterationType(IterationType),
    Limits(Limits),
}

impl ConfigValue {
    pub fn key(&self) -> ConfigKey {
        match self {
            ConfigValue::RepeatCount(_) => ConfigKey::RepeatCount,
            ConfigValue::Interval(_) => ConfigKey::Interval,
            ConfigValue::ShotAnnouncementLeadTime(_) => ConfigKey::ShotAnnouncementLeadTime,
            ConfigValue::IntervalOffsetType(_) => ConfigKey::IntervalOffsetType,
            ConfigValue::IntervalOffset(_) => ConfigKey::IntervalOffset,
            ConfigValue::SplitStepSpeed(_) => ConfigKey::SplitStepSpeed,
            ConfigValue::AutoVoiceSplitStep(_) => ConfigKey::AutoVoiceSplitStep,
            ConfigValue::Voice(_) => ConfigKey::Voice,
            ConfigValue::SpeechRate(_) => ConfigKey::SpeechRate,
            ConfigValue::Message(_) => ConfigKey::Message,
            ConfigValue::IntervalType(_) => ConfigKey::IntervalType,
            ConfigValue::Countdown(_) => ConfigKey::Countdown,
            ConfigValue::SkipAtEndOfWorkout(_) => ConfigKey::SkipAtEndOfWorkout,
            ConfigValue::IterationType(_) => ConfigKey::IterationType,
            ConfigValue::Limits(_) => ConfigKey::Limits,
        }
    }
}

impl NodeConfig {
    /// The explicit value stored for `key`, if any
    pub fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        match key {
            ConfigKey::RepeatCount => self.repeat_count.map(ConfigValue::RepeatCount),
            ConfigKey::Interval => self.interval.map(ConfigValue::Interval),
            ConfigKey::ShotAnnouncementLeadTime => self
                .shot_announcement_lead_time
                .map(ConfigValue::ShotAnnouncementLeadTime),
            ConfigKey::IntervalOffsetType => {
                self.interval_offset_type.map(ConfigValue::IntervalOffsetType)
            }
            ConfigKey::IntervalOffset => self.interval_offset.map(ConfigValue::IntervalOffset),
            ConfigKey::SplitStepSpeed => self.split_step_speed.map(ConfigValue::SplitStepSpeed),
            ConfigKey::AutoVoiceSplitStep => {
                self.auto_voice_split_step.map(ConfigValue::AutoVoiceSplitStep)
            }
            ConfigKey::Voice => self.voice.clone().map(ConfigValue::Voice),
            ConfigKey::SpeechRate => self.speech_rate.map(ConfigValue::SpeechRate),
            ConfigKey::Message => self.message.clone().map(ConfigValue::Message),
            ConfigKey::IntervalType => self.interval_type.map(ConfigValue::IntervalType),
            ConfigKey::Countdown => self.countdown.map(ConfigValue::Countdown),
            ConfigKey::SkipAtEndOfWorkout => {
                self.skip_at_end_of_workout.map(ConfigValue::SkipAtEndOfWorkout)
            }
            ConfigKey::IterationType => self.iteration_type.map(ConfigValue::IterationType),
            ConfigKey::Limits => self.limits.map(ConfigValue::Limits),
        }
    }

    pub fn has(&self, key: ConfigKey) -> bool {
        self.get(key).is_some()
    }

    /// Store an explicit override
    pub fn set(&mut self, value: ConfigValue) {
        match value {
            ConfigValue::RepeatCount(v) => self.repeat_count = Some(v),
            ConfigValue::Interval(v) => self.interval = Some(v),
            ConfigValue::ShotAnnouncementLeadTime(v) => self.shot_announcement_lead_time = Some(v),
            ConfigValue::IntervalOffsetType(v) => self.interval_offset_type = Some(v),
            ConfigValue::IntervalOffset(v) => self.interval_offset = Some(v),
            ConfigValue::SplitStepSpeed(v) => self.split_step_speed = Some(v),
            ConfigValue::AutoVoiceSplitStep(v) => self.auto_voice_split_step = Some(v),
            ConfigValue::Voice(v) => self.voice = Some(v),
            ConfigValue::SpeechRate(v) => self.speech_rate = Some(v),
            ConfigValue::Message(v) => self.message = Some(v),
            ConfigValue::IntervalType(v) => self.interval_type = Some(v),
            ConfigValue::Countdown(v) => self.countdown = Some(v),
            ConfigValue::SkipAtEndOfWorkout(v) => self.skip_at_end_of_workout = Some(v),
            ConfigValue::IterationType(v) => self.iteration_type = Some(v),
            ConfigValue::Limits(v) => self.limits = Some(v),
        }
    }

    /// Copy every key explicitly set in `other` over this config
    pub fn overlay(&mut self, other: &NodeConfig) {
        for key in ConfigKey::ALL {
            if let Some(value) = other.get(key) {
                self.set(value);
            }
        }
    }

    /// Drop an explicit override so the key inherits again
    pub fn clear(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::RepeatCount => self.repeat_count = None,
            ConfigKey::Interval => self.interval = None,
            ConfigKey::ShotAnnouncementLeadTime => self.shot_announcement_lead_time = None,
            ConfigKey::IntervalOffsetType => self.interval_offset_type = None,
            ConfigKey::IntervalOffset => self.interval_offset = None,
            ConfigKey::SplitStepSpeed => self.split_step_speed = None,
            ConfigKey::AutoVoiceSplitStep => self.auto_voice_split_step = None,
            ConfigKey::Voice => self.voice = None,
            ConfigKey::SpeechRate => self.speech_rate = None,
            ConfigKey::Message => self.message = None,
            ConfigKey::IntervalType => self.interval_type = None,
            ConfigKey::Countdown => self.countdown = None,
            ConfigKey::SkipAtEndOfWorkout => self.skip_at_end_of_workout = None,
            ConfigKey::IterationType => self.iteration_type = None,
            ConfigKey::Limits => self.limits = None,
        }
    }
}

/// Values every key falls back to when no node in the chain sets it
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDefaults {
    pub voice: String,
    pub speech_rate: f64,
    pub interval: f64,
    pub split_step_speed: SplitStepSpeed,
    pub shot_announcement_lead_time: f64,
    pub interval_offset_type: IntervalOffsetType,
    pub interval_offset: IntervalOffset,
    pub auto_voice_split_step: bool,
    pub interval_type: IntervalType,
    pub countdown: bool,
    pub skip_at_end_of_workout: bool,
    pub iteration_type: IterationType,
    pub limits: Limits,
    pub repeat_count: RepeatCount,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            speech_rate: 1.0,
            interval: 5.0,
            split_step_speed: SplitStepSpeed::AutoScale,
            shot_announcement_lead_time: DEFAULT_ANNOUNCEMENT_LEAD_TIME,
            interval_offset_type: IntervalOffsetType::Fixed,
            interval_offset: IntervalOffset { min: 0.0, max: 0.0 },
            auto_voice_split_step: true,
            interval_type: IntervalType::Fixed,
            countdown: false,
            skip_at_end_of_workout: false,
            iteration_type: IterationType::InOrder,
            limits: Limits::all_shots(),
            repeat_count: RepeatCount::Fixed(1),
        }
    }
}

impl ConfigDefaults {
    /// Default for `key`; `None` only for keys with no meaningful default
    pub fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        let value = match key {
            ConfigKey::RepeatCount => ConfigValue::RepeatCount(self.repeat_count),
            ConfigKey::Interval => ConfigValue::Interval(self.interval),
            ConfigKey::ShotAnnouncementLeadTime => {
                ConfigValue::ShotAnnouncementLeadTime(self.shot_announcement_lead_time)
            }
            ConfigKey::IntervalOffsetType => {
                ConfigValue::IntervalOffsetType(self.interval_offset_type)
            }
            ConfigKey::IntervalOffset => ConfigValue::IntervalOffset(self.interval_offset),
            ConfigKey::SplitStepSpeed => ConfigValue::SplitStepSpeed(self.split_step_speed),
            ConfigKey::AutoVoiceSplitStep => {
                ConfigValue::AutoVoiceSplitStep(self.auto_voice_split_step)
            }
            ConfigKey::Voice => ConfigValue::Voice(self.voice.clone()),
            ConfigKey::SpeechRate => ConfigValue::SpeechRate(self.speech_rate),
            ConfigKey::Message => return None,
            ConfigKey::IntervalType => ConfigValue::IntervalType(self.interval_type),
            ConfigKey::Countdown => ConfigValue::Countdown(self.countdown),
            ConfigKey::SkipAtEndOfWorkout => {
                ConfigValue::SkipAtEndOfWorkout(self.skip_at_end_of_workout)
            }
            ConfigKey::IterationType => ConfigValue::IterationType(self.iteration_type),
            ConfigKey::Limits => ConfigValue::Limits(self.limits),
        };
        Some(value)
    }
}

/// Read-only resolver over one workout
#[derive(Clone, Debug)]
pub struct ConfigResolver<'w> {
    workout: &'w Workout,
    defaults: ConfigDefaults,
}

impl<'w> ConfigResolver<'w> {
    pub fn new(workout: &'w Workout) -> Self {
        Self::with_defaults(workout, ConfigDefaults::default())
    }

    pub fn with_defaults(workout: &'w Workout, defaults: ConfigDefaults) -> Self {
        Self { workout, defaults }
    }

    pub fn workout(&self) -> &'w Workout {
        self.workout
    }

    pub fn defaults(&self) -> &ConfigDefaults {
        &self.defaults
    }

    /// Effective value of `key` at `node`
    pub fn resolve(&self, node: NodeRef, key: ConfigKey) -> Result<ConfigValue> {
        if let Some(value) = self.explicit(node, key) {
            return Ok(value);
        }
        self.defaults.get(key).ok_or_else(|| Error::ConfigResolution {
            key: key.to_string(),
            node: node.to_string(),
        })
    }

    /// The node in the chain that explicitly sets `key`, if any
    pub fn source_of(&self, node: NodeRef, key: ConfigKey) -> Option<NodeRef> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.workout.node_config(n)?.has(key) {
                return Some(n);
            }
            if !key.is_inherited() {
                return None;
            }
            current = n.parent();
        }
        None
    }

    fn explicit(&self, node: NodeRef, key: ConfigKey) -> Option<ConfigValue> {
        let source = self.source_of(node, key)?;
        self.workout.node_config(source)?.get(key)
    }

    /// Descendants of `node` whose explicit `key` would shadow a change made at `node`
    pub fn conflicting_descendants(&self, node: NodeRef, key: ConfigKey) -> Vec<NodeRef> {
        if !key.is_inherited() {
            return Vec::new();
        }
        let mut conflicts = Vec::new();
        let patterns = match node {
            NodeRef::Workout => 0..self.workout.patterns.len(),
            NodeRef::Pattern { pattern } => pattern..pattern + 1,
            NodeRef::Entry { .. } => return conflicts,
        };
        for p in patterns {
            let Some(pattern) = self.workout.pattern(p) else {
                continue;
            };
            if node == NodeRef::Workout && pattern.config.has(key) {
                conflicts.push(NodeRef::Pattern { pattern: p });
            }
            for (e, entry) in pattern.entries.iter().enumerate() {
                if entry.config.has(key) {
                    conflicts.push(NodeRef::Entry {
                        pattern: p,
                        entry: e,
                    });
                }
            }
        }
        conflicts
    }

    // Typed accessors used by the generator. All of these keys have defaults.

    fn typed<T>(
        &self,
        node: NodeRef,
        key: ConfigKey,
        pick: impl Fn(ConfigValue) -> Option<T>,
    ) -> Result<T> {
        let value = self.resolve(node, key)?;
        pick(value).ok_or_else(|| Error::ConfigResolution {
            key: key.to_string(),
            node: node.to_string(),
        })
    }

    pub fn interval(&self, node: NodeRef) -> Result<f64> {
        self.typed(node, ConfigKey::Interval, |v| match v {
            ConfigValue::Interval(x) => Some(x),
            _ => None,
        })
    }

    pub fn lead_time(&self, node: NodeRef) -> Result<f64> {
        self.typed(node, ConfigKey::ShotAnnouncementLeadTime, |v| match v {
            ConfigValue::ShotAnnouncementLeadTime(x) => Some(x),
            _ => None,
        })
    }

    pub fn offset_type(&self, node: NodeRef) -> Result<IntervalOffsetType> {
        self.typed(node, ConfigKey::IntervalOffsetType, |v| match v {
            ConfigValue::IntervalOffsetType(x) => Some(x),
            _ => None,
        })
    }

    pub fn offset(&self, node: NodeRef) -> Result<IntervalOffset> {
        self.typed(node, ConfigKey::IntervalOffset, |v| match v {
            ConfigValue::IntervalOffset(x) => Some(x),
            _ => None,
        })
    }

    pub fn split_step_speed(&self, node: NodeRef) -> Result<SplitStepSpeed> {
        self.typed(node, ConfigKey::SplitStepSpeed, |v| match v {
            ConfigValue::SplitStepSpeed(x) => Some(x),
            _ => None,
        })
    }

    pub fn auto_voice_split_step(&self, node: NodeRef) -> Result<bool> {
        self.typed(node, ConfigKey::AutoVoiceSplitStep, |v| match v {
            ConfigValue::AutoVoiceSplitStep(x) => Some(x),
            _ => None,
        })
    }

    pub fn voice(&self, node: NodeRef) -> Result<String> {
        self.typed(node, ConfigKey::Voice, |v| match v {
            ConfigValue::Voice(x) => Some(x),
            _ => None,
        })
    }

    pub fn speech_rate(&self, node: NodeRef) -> Result<f64> {
        self.typed(node, ConfigKey::SpeechRate, |v| match v {
            ConfigValue::SpeechRate(x) => Some(x),
            _ => None,
        })
    }

    pub fn message(&self, node: NodeRef) -> Result<String> {
        self.typed(node, ConfigKey::Message, |v| match v {
            ConfigValue::Message(x) => Some(x),
            _ => None,
        })
    }

    pub fn interval_type(&self, node: NodeRef) -> Result<IntervalType> {
        self.typed(node, ConfigKey::IntervalType, |v| match v {
            ConfigValue::IntervalType(x) => Some(x),
            _ => None,
        })
    }

    pub fn countdown(&self, node: NodeRef) -> Result<bool> {
        self.typed(node, ConfigKey::Countdown, |v| match v {
            ConfigValue::Countdown(x) => Some(x),
            _ => None,
        })
    }

    pub fn skip_at_end_of_workout(&self, node: NodeRef) -> Result<bool> {
        self.typed(node, ConfigKey::SkipAtEndOfWorkout, |v| match v {
            ConfigValue::SkipAtEndOfWorkout(x) => Some(x),
            _ => None,
        })
    }

    pub fn iteration_type(&self, node: NodeRef) -> Result<IterationType> {
        self.typed(node, ConfigKey::IterationType, |v| match v {
            ConfigValue::IterationType(x) => Some(x),
            _ => None,
        })
    }

    pub fn limits(&self, node: NodeRef) -> Result<Limits> {
        self.typed(node, ConfigKey::Limits, |v| match v {
            ConfigValue::Limits(x) => Some(x),
            _ => None,
        })
    }

    pub fn repeat_count(&self, node: NodeRef) -> Result<RepeatCount> {
        self.typed(node, ConfigKey::RepeatCount, |v| match v {
            ConfigValue::RepeatCount(x) => Some(x),
            _ => None,
        })
    }
}

impl Workout {
    /// Set an explicit override on `node`; returns false if the node does not exist
    pub fn set_override(&mut self, node: NodeRef, value: ConfigValue) -> bool {
        match self.node_config_mut(node) {
            Some(config) => {
                config.set(value);
                true
            }
            None => false,
        }
    }

    /// Clear an override on `node`; returns false if the node does not exist
    pub fn clear_override(&mut self, node: NodeRef, key: ConfigKey) -> bool {
        match self.node_config_mut(node) {
            Some(config) => {
                config.clear(key);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entry, Pattern};

    fn layered_workout() -> Workout {
        let shot = Entry::shot("s1", "Front Drive");
        let pinned = Entry::shot("s2", "Back Boast").with_config(NodeConfig {
            interval: Some(2.0),
            ..NodeConfig::default()
        });
        let pattern = Pattern::new("p1", "Front Court", vec![shot, pinned]).with_config(NodeConfig {
            interval: Some(4.0),
            ..NodeConfig::default()
        });
        Workout::new("Session", vec![pattern]).with_config(NodeConfig {
            interval: Some(6.0),
            voice: Some("Serena".into()),
            ..NodeConfig::default()
        })
    }

    const SHOT: NodeRef = NodeRef::Entry {
        pattern: 0,
        entry: 0,
    };
    const PINNED: NodeRef = NodeRef::Entry {
        pattern: 0,
        entry: 1,
    };

    #[test]
    fn test_nearest_override_wins() {
        let workout = layered_workout();
        let resolver = ConfigResolver::new(&workout);

        assert_eq!(resolver.interval(SHOT).unwrap(), 4.0);
        assert_eq!(resolver.interval(PINNED).unwrap(), 2.0);
        assert_eq!(resolver.interval(NodeRef::Workout).unwrap(), 6.0);
    }

    #[test]
    fn test_falls_through_to_workout_then_defaults() {
        let workout = layered_workout();
        let resolver = ConfigResolver::new(&workout);

        assert_eq!(resolver.voice(SHOT).unwrap(), "Serena");
        assert_eq!(resolver.speech_rate(SHOT).unwrap(), 1.0);
        assert_eq!(resolver.lead_time(SHOT).unwrap(), DEFAULT_ANNOUNCEMENT_LEAD_TIME);
        assert_eq!(
            resolver.split_step_speed(SHOT).unwrap(),
            SplitStepSpeed::AutoScale
        );
        assert!(resolver.auto_voice_split_step(SHOT).unwrap());
    }

    #[test]
    fn test_explicit_false_is_not_inherit() {
        let mut workout = layered_workout();
        workout.config.auto_voice_split_step = Some(true);
        workout.patterns[0].entries[0].config.auto_voice_split_step = Some(false);
        let resolver = ConfigResolver::new(&workout);

        assert!(!resolver.auto_voice_split_step(SHOT).unwrap());
        assert!(resolver.auto_voice_split_step(PINNED).unwrap());
    }

    #[test]
    fn test_node_scoped_keys_skip_ancestors() {
        let mut workout = layered_workout();
        workout.config.repeat_count = Some(RepeatCount::Fixed(3));
        workout.config.limits = Some(Limits::shot_limit(10));
        let resolver = ConfigResolver::new(&workout);

        let pattern = NodeRef::Pattern { pattern: 0 };
        assert_eq!(resolver.repeat_count(pattern).unwrap(), RepeatCount::Fixed(1));
        assert_eq!(resolver.limits(pattern).unwrap(), Limits::all_shots());
        assert_eq!(
            resolver.repeat_count(NodeRef::Workout).unwrap(),
            RepeatCount::Fixed(3)
        );
    }

    #[test]
    fn test_message_without_text_is_resolution_error() {
        let workout = layered_workout();
        let resolver = ConfigResolver::new(&workout);

        let err = resolver.message(SHOT).unwrap_err();
        assert!(matches!(err, Error::ConfigResolution { .. }));
    }

    #[test]
    fn test_source_of_reports_defining_node() {
        let workout = layered_workout();
        let resolver = ConfigResolver::new(&workout);

        assert_eq!(
            resolver.source_of(SHOT, ConfigKey::Interval),
            Some(NodeRef::Pattern { pattern: 0 })
        );
        assert_eq!(
            resolver.source_of(SHOT, ConfigKey::Voice),
            Some(NodeRef::Workout)
        );
        assert_eq!(resolver.source_of(SHOT, ConfigKey::SpeechRate), None);
    }

    #[test]
    fn test_conflicting_descendants_of_workout_change() {
        let workout = layered_workout();
        let resolver = ConfigResolver::new(&workout);

        let conflicts = resolver.conflicting_descendants(NodeRef::Workout, ConfigKey::Interval);
        assert_eq!(conflicts, vec![NodeRef::Pattern { pattern: 0 }, PINNED]);

        let from_pattern =
            resolver.conflicting_descendants(NodeRef::Pattern { pattern: 0 }, ConfigKey::Interval);
        assert_eq!(from_pattern, vec![PINNED]);
    }

    #[test]
    fn test_set_and_clear_override() {
        let mut workout = layered_workout();
        assert!(workout.clear_override(PINNED, ConfigKey::Interval));
        assert!(workout.set_override(SHOT, ConfigValue::SpeechRate(1.5)));
        assert!(!workout.set_override(
            NodeRef::Entry {
                pattern: 9,
                entry: 0
            },
            ConfigValue::Interval(1.0)
        ));

        let resolver = ConfigResolver::new(&workout);
        assert_eq!(resolver.interval(PINNED).unwrap(), 4.0);
        assert_eq!(resolver.speech_rate(SHOT).unwrap(), 1.5);
    }

    #[test]
    fn test_every_key_roundtrips_through_node_config() {
        let defaults = ConfigDefaults::default();
        for key in ConfigKey::ALL {
            let Some(value) = defaults.get(key) else {
                assert_eq!(key, ConfigKey::Message);
                continue;
            };
            let mut config = NodeConfig::default();
            config.set(value.clone());
            assert_eq!(config.get(key), Some(value));
            config.clear(key);
            assert!(!config.has(key));
        }
    }

    #[test]
    fn test_overlay_keeps_unset_keys() {
        let message = Entry::message("m1", "Rest", "Catch your breath").with_config(NodeConfig {
            countdown: Some(true),
            ..NodeConfig::default()
        });
        assert_eq!(message.config.message.as_deref(), Some("Catch your breath"));
        assert_eq!(message.config.countdown, Some(true));
    }
}
