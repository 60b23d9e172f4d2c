//! Sub-event timing for shots and messages.

use crate::config::TimingConfig;
use crate::{CountdownWindow, IntervalType, MessageTiming, ShotTiming, SplitStepSpeed};

/// Concrete speed for a slot; `AutoScale` is looked up in the policy table
pub fn resolve_split_step(
    policy: &TimingConfig,
    speed: SplitStepSpeed,
    slot_duration: f64,
) -> SplitStepSpeed {
    if speed != SplitStepSpeed::AutoScale {
        return speed;
    }
    policy
        .auto_scale
        .iter()
        .find(|rule| slot_duration < rule.max_slot_seconds)
        .map(|rule| rule.speed)
        .unwrap_or(policy.auto_scale_fallback)
}

/// Seconds between split step and beep; `None` when no split step is cued
pub fn split_step_duration(policy: &TimingConfig, speed: SplitStepSpeed) -> Option<f64> {
    match speed {
        SplitStepSpeed::None | SplitStepSpeed::AutoScale => None,
        SplitStepSpeed::Slow => Some(policy.split_step.slow),
        SplitStepSpeed::Medium => Some(policy.split_step.medium),
        SplitStepSpeed::Fast => Some(policy.split_step.fast),
    }
}

/// Narration length from word count at the baseline pace, floored, scaled by rate
pub fn estimate_tts_duration(policy: &TimingConfig, text: &str, speech_rate: f64) -> f64 {
    let words = text.split_whitespace().count() as f64;
    let at_baseline = words / policy.narration.words_per_minute * 60.0;
    let rate = if speech_rate > 0.0 { speech_rate } else { 1.0 };
    at_baseline.max(policy.narration.min_seconds) / rate
}

/// Settings that shape one shot slot
#[derive(Clone, Copy, Debug)]
pub struct ShotSlot {
    pub start: f64,
    pub slot_duration: f64,
    pub lead_time: f64,
    pub split_step: SplitStepSpeed,
    pub auto_voice_split_step: bool,
}

/// Timing of a shot whose beep lands at the end of its slot
pub fn shot_timing(policy: &TimingConfig, slot: ShotSlot) -> ShotTiming {
    let slot_duration = slot.slot_duration.max(0.0);
    let beep_time = slot.start + slot_duration;
    let announced_time = (beep_time - slot.lead_time).max(slot.start);

    let speed = resolve_split_step(policy, slot.split_step, slot_duration);
    let split_step_time =
        split_step_duration(policy, speed).map(|d| (beep_time - d).max(slot.start));

    ShotTiming {
        announced_time,
        beep_time,
        split_step_time,
        split_step_speed: split_step_time.map(|_| speed),
        auto_voice_split_step: slot.auto_voice_split_step,
    }
}

/// Settings that shape one message
#[derive(Clone, Debug)]
pub struct MessageSlot<'a> {
    pub start: f64,
    pub text: &'a str,
    pub speech_rate: f64,
    pub interval: f64,
    pub interval_type: IntervalType,
    pub countdown: bool,
}

/// Timing of a message plus its end time
pub fn message_timing(policy: &TimingConfig, slot: MessageSlot<'_>) -> (f64, MessageTiming) {
    let message_start = slot.start;
    let tts_end = message_start + estimate_tts_duration(policy, slot.text, slot.speech_rate);
    let interval = slot.interval.max(0.0);

    let end_time = match slot.interval_type {
        IntervalType::Fixed => (message_start + interval).max(tts_end),
        IntervalType::Additional => tts_end + interval,
    };

    let countdown = (slot.countdown && end_time - tts_end > policy.countdown_min_gap).then_some(
        CountdownWindow {
            start: tts_end,
            end: end_time,
        },
    );

    (
        end_time,
        MessageTiming {
            message_start,
            tts_end,
            text: slot.text.to_string(),
            countdown,
        },
    )
}
