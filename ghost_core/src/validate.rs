//! Structural and semantic checks on a workout document.
//!
//! Validation runs before generation; the generator assumes its input passed.

use crate::{
    Entry, EntryKind, Error, IntervalOffset, LimitType, Limits, NodeConfig, PositionType,
    RepeatCount, Result, ValidationErrors, ValidationIssue, Workout,
};
use std::collections::HashSet;

/// Collects issues with their document paths
struct Collector {
    issues: Vec<ValidationIssue>,
}

impl Collector {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a workout, returning every issue found
pub fn validate(workout: &Workout) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut c = Collector { issues: Vec::new() };

    if workout.name.trim().is_empty() {
        c.push("name", "workout name must not be empty");
    }
    if workout.patterns.is_empty() {
        c.push("patterns", "workout has no patterns");
    }

    check_config(&mut c, "config", &workout.config);
    check_positions(
        &mut c,
        "patterns",
        workout.patterns.iter().map(|p| p.position_type),
    );

    let mut pattern_ids = HashSet::new();
    for (p, pattern) in workout.patterns.iter().enumerate() {
        let base = format!("patterns[{}]", p);
        if pattern.id.is_empty() {
            c.push(format!("{}.id", base), "pattern id must not be empty");
        } else if !pattern_ids.insert(pattern.id.as_str()) {
            c.push(format!("{}.id", base), format!("duplicate pattern id '{}'", pattern.id));
        }
        check_config(&mut c, &format!("{}.config", base), &pattern.config);
        check_positions(
            &mut c,
            &format!("{}.entries", base),
            pattern.entries.iter().map(|e| e.position_type),
        );

        for (e, entry) in pattern.entries.iter().enumerate() {
            check_entry(&mut c, &format!("{}.entries[{}]", base, e), entry);
        }
    }

    if c.issues.is_empty() {
        Ok(())
    } else {
        Err(c.issues)
    }
}

/// [`validate`] lifted into the crate error type
pub fn ensure_valid(workout: &Workout) -> Result<()> {
    validate(workout).map_err(|issues| Error::Validation(ValidationErrors(issues)))
}

fn check_entry(c: &mut Collector, base: &str, entry: &Entry) {
    if entry.id.is_empty() {
        c.push(format!("{}.id", base), "entry id must not be empty");
    }
    check_config(c, &format!("{}.config", base), &entry.config);

    match entry.kind {
        EntryKind::Message => {
            let text = entry.config.message.as_deref().unwrap_or("");
            if text.trim().is_empty() {
                c.push(
                    format!("{}.config.message", base),
                    "message entries need message text",
                );
            }
        }
        EntryKind::Shot => {
            if entry.config.message.is_some() {
                c.push(
                    format!("{}.config.message", base),
                    "message text is only valid on message entries",
                );
            }
        }
    }
}

fn check_positions(c: &mut Collector, base: &str, positions: impl Iterator<Item = PositionType>) {
    let positions: Vec<PositionType> = positions.collect();
    let mut slots = HashSet::new();
    for (i, position) in positions.iter().enumerate() {
        let path = format!("{}[{}].positionType", base, i);
        match position {
            PositionType::LinkedToPrevious if i == 0 => {
                c.push(path, "first item cannot be linked to a previous item");
            }
            PositionType::LockedAtIndex(slot) => {
                if *slot >= positions.len() {
                    c.push(
                        path,
                        format!("locked index {} is outside 0..{}", slot, positions.len()),
                    );
                } else if !slots.insert(*slot) {
                    c.push(path, format!("index {} is locked more than once", slot));
                }
            }
            _ => {}
        }
    }
}

fn check_config(c: &mut Collector, base: &str, config: &NodeConfig) {
    if let Some(RepeatCount::Random { min, max }) = config.repeat_count {
        if min > max {
            c.push(
                format!("{}.repeatCount", base),
                format!("min {} exceeds max {}", min, max),
            );
        }
    }
    if let Some(interval) = config.interval {
        check_non_negative(c, &format!("{}.interval", base), interval);
    }
    if let Some(lead) = config.shot_announcement_lead_time {
        check_non_negative(c, &format!("{}.shotAnnouncementLeadTime", base), lead);
    }
    if let Some(IntervalOffset { min, max }) = config.interval_offset {
        let path = format!("{}.intervalOffset", base);
        if !min.is_finite() || !max.is_finite() {
            c.push(path, "offset bounds must be finite");
        } else if min > max {
            c.push(path, format!("min {} exceeds max {}", min, max));
        }
    }
    if let Some(rate) = config.speech_rate {
        if !rate.is_finite() || rate <= 0.0 {
            c.push(format!("{}.speechRate", base), "speech rate must be positive");
        }
    }
    if let Some(voice) = &config.voice {
        if voice.trim().is_empty() {
            c.push(format!("{}.voice", base), "voice must not be empty");
        }
    }
    if let Some(limits) = config.limits {
        check_limits(c, &format!("{}.limits", base), limits);
    }
}

fn check_limits(c: &mut Collector, path: &str, limits: Limits) {
    match (limits.kind, limits.value) {
        (LimitType::AllShots, _) => {}
        (_, None) => c.push(format!("{}.value", path), "value is required for this limit type"),
        (LimitType::ShotLimit, Some(v)) => {
            if !v.is_finite() || v < 1.0 || v.fract() != 0.0 {
                c.push(format!("{}.value", path), "shot limit must be a positive whole number");
            }
        }
        (LimitType::TimeLimit, Some(v)) => {
            if !v.is_finite() || v <= 0.0 {
                c.push(format!("{}.value", path), "time limit must be positive");
            }
        }
    }
}

fn check_non_negative(c: &mut Collector, path: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        c.push(path, "must be a non-negative number of seconds");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pattern;

    fn valid_workout() -> Workout {
        Workout::new(
            "Court Sprints",
            vec![Pattern::new(
                "p1",
                "Corners",
                vec![
                    Entry::shot("s1", "Front Left"),
                    Entry::shot("s2", "Back Right"),
                    Entry::message("m1", "Rest", "Take a breather"),
                ],
            )],
        )
    }

    fn paths(workout: &Workout) -> Vec<String> {
        validate(workout)
            .unwrap_err()
            .into_iter()
            .map(|i| i.path)
            .collect()
    }

    #[test]
    fn test_valid_workout_passes() {
        assert!(validate(&valid_workout()).is_ok());
        assert!(ensure_valid(&valid_workout()).is_ok());
    }

    #[test]
    fn test_repeat_count_bounds() {
        let mut workout = valid_workout();
        workout.patterns[0].entries[0].config.repeat_count =
            Some(RepeatCount::Random { min: 4, max: 2 });
        assert_eq!(
            paths(&workout),
            vec!["patterns[0].entries[0].config.repeatCount"]
        );
    }

    #[test]
    fn test_offset_bounds() {
        let mut workout = valid_workout();
        workout.patterns[0].config.interval_offset = Some(IntervalOffset { min: 1.0, max: -1.0 });
        assert_eq!(paths(&workout), vec!["patterns[0].config.intervalOffset"]);
    }

    #[test]
    fn test_limit_value_required() {
        let mut workout = valid_workout();
        workout.patterns[0].config.limits = Some(Limits {
            kind: LimitType::ShotLimit,
            value: None,
        });
        assert_eq!(paths(&workout), vec!["patterns[0].config.limits.value"]);

        workout.patterns[0].config.limits = Some(Limits {
            kind: LimitType::AllShots,
            value: None,
        });
        assert!(validate(&workout).is_ok());
    }

    #[test]
    fn test_message_needs_text() {
        let mut workout = valid_workout();
        workout.patterns[0].entries[2].config.message = Some("   ".into());
        assert_eq!(
            paths(&workout),
            vec!["patterns[0].entries[2].config.message"]
        );
    }

    #[test]
    fn test_position_rules() {
        let mut workout = valid_workout();
        workout.patterns[0].entries[0].position_type = PositionType::LinkedToPrevious;
        workout.patterns[0].entries[1].position_type = PositionType::LockedAtIndex(7);
        let found = paths(&workout);
        assert!(found.contains(&"patterns[0].entries[0].positionType".to_string()));
        assert!(found.contains(&"patterns[0].entries[1].positionType".to_string()));
    }

    #[test]
    fn test_duplicate_locks_reported() {
        let mut workout = valid_workout();
        workout.patterns[0].entries[0].position_type = PositionType::LockedAtIndex(1);
        workout.patterns[0].entries[1].position_type = PositionType::LockedAtIndex(1);
        assert_eq!(
            paths(&workout),
            vec!["patterns[0].entries[1].positionType"]
        );
    }

    #[test]
    fn test_empty_workout_rejected() {
        let workout = Workout::new("Empty", vec![]);
        let err = ensure_valid(&workout).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_empty_pattern_is_allowed() {
        let mut workout = valid_workout();
        workout.patterns.push(Pattern::new("p2", "Empty", vec![]));
        assert!(validate(&workout).is_ok());
    }
}
