//! Routing sound cues to the audio collaborators.
//!
//! The host supplies a [`Narrator`] and a [`TonePlayer`]; either may be
//! missing. Audio trouble never stops playback: a missing collaborator is
//! reported once and its cues are skipped, a failed narration is retried
//! once and then dropped.

use crate::playback::{CueAction, SoundCue, Tone};
use crate::{AudioCapability, Error, Result};
use std::collections::HashSet;

/// Speaks text
pub trait Narrator {
    fn speak(&mut self, text: &str, voice: &str, speech_rate: f64) -> Result<()>;
}

/// Plays short tones
pub trait TonePlayer {
    fn play(&mut self, tone: Tone) -> Result<()>;
}

/// What happened to one cue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Played,
    /// Played on the second attempt
    Retried,
    /// Attempted and failed; playback carries on
    Skipped,
    /// No collaborator for this cue
    Unavailable(AudioCapability),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub played: u32,
    pub retried: u32,
    pub skipped: u32,
    pub unavailable: u32,
}

pub struct CueDispatcher {
    narrator: Option<Box<dyn Narrator>>,
    tones: Option<Box<dyn TonePlayer>>,
    reported: HashSet<AudioCapability>,
    reports: Vec<Error>,
    stats: DispatchStats,
}

impl CueDispatcher {
    pub fn new(narrator: Option<Box<dyn Narrator>>, tones: Option<Box<dyn TonePlayer>>) -> Self {
        Self {
            narrator,
            tones,
            reported: HashSet::new(),
            reports: Vec::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Problems worth surfacing to the host, oldest first
    pub fn take_reports(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.reports)
    }

    pub fn dispatch_all(&mut self, cues: &[SoundCue]) -> Vec<DispatchOutcome> {
        cues.iter().map(|cue| self.dispatch(cue)).collect()
    }

    pub fn dispatch(&mut self, cue: &SoundCue) -> DispatchOutcome {
        let outcome = match &cue.action {
            CueAction::Narrate {
                text,
                voice,
                speech_rate,
            } => match self.narrator.as_mut() {
                None => DispatchOutcome::Unavailable(AudioCapability::Narration),
                Some(narrator) => match narrator.speak(text, voice, *speech_rate) {
                    Ok(()) => DispatchOutcome::Played,
                    Err(first) => {
                        tracing::warn!("Narration of '{}' failed ({}), retrying", text, first);
                        match narrator.speak(text, voice, *speech_rate) {
                            Ok(()) => DispatchOutcome::Retried,
                            Err(second) => {
                                tracing::warn!("Narration of '{}' failed again, skipping", text);
                                self.reports.push(Error::Audio(format!(
                                    "narration of '{}' at {:.2}s skipped: {}",
                                    text, cue.at, second
                                )));
                                DispatchOutcome::Skipped
                            }
                        }
                    }
                },
            },
            CueAction::Tone(tone) => match self.tones.as_mut() {
                None => DispatchOutcome::Unavailable(AudioCapability::Tones),
                Some(player) => match player.play(*tone) {
                    Ok(()) => DispatchOutcome::Played,
                    Err(e) => {
                        tracing::warn!("Tone {:?} at {:.2}s failed: {}", tone, cue.at, e);
                        DispatchOutcome::Skipped
                    }
                },
            },
        };

        match outcome {
            DispatchOutcome::Played => self.stats.played += 1,
            DispatchOutcome::Retried => {
                self.stats.played += 1;
                self.stats.retried += 1;
            }
            DispatchOutcome::Skipped => self.stats.skipped += 1,
            DispatchOutcome::Unavailable(capability) => {
                self.stats.unavailable += 1;
                if self.reported.insert(capability) {
                    tracing::warn!("No {} collaborator; continuing without it", capability);
                    self.reports.push(Error::MissingAudioCapability(capability));
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{CueKey, CueKind};
    use crate::SplitStepSpeed;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Fails the first `failures` calls, then records what it speaks
    struct FlakyNarrator {
        failures: u32,
        spoken: Rc<RefCell<Vec<String>>>,
    }

    impl Narrator for FlakyNarrator {
        fn speak(&mut self, text: &str, _voice: &str, _speech_rate: f64) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(Error::Audio("engine busy".into()));
            }
            self.spoken.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct RecordingTones(Rc<RefCell<Vec<Tone>>>);

    impl TonePlayer for RecordingTones {
        fn play(&mut self, tone: Tone) -> Result<()> {
            self.0.borrow_mut().push(tone);
            Ok(())
        }
    }

    fn narration(text: &str, at: f64) -> SoundCue {
        SoundCue {
            key: CueKey {
                event: 0,
                kind: CueKind::Narration,
                at_micros: (at * 1e6) as i64,
            },
            at,
            action: CueAction::Narrate {
                text: text.into(),
                voice: "Default".into(),
                speech_rate: 1.0,
            },
        }
    }

    fn tone(tone: Tone, at: f64) -> SoundCue {
        SoundCue {
            key: CueKey {
                event: 0,
                kind: CueKind::Beep,
                at_micros: (at * 1e6) as i64,
            },
            at,
            action: CueAction::Tone(tone),
        }
    }

    fn narrator(failures: u32) -> (Box<dyn Narrator>, Rc<RefCell<Vec<String>>>) {
        let spoken = Rc::new(RefCell::new(Vec::new()));
        let narrator = FlakyNarrator {
            failures,
            spoken: spoken.clone(),
        };
        (Box::new(narrator), spoken)
    }

    #[test]
    fn test_routes_cues() {
        let (narrator, spoken) = narrator(0);
        let tones = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher =
            CueDispatcher::new(Some(narrator), Some(Box::new(RecordingTones(tones.clone()))));

        let outcomes = dispatcher.dispatch_all(&[
            narration("Front left", 4.0),
            tone(Tone::SplitStep(SplitStepSpeed::Fast), 4.5),
            tone(Tone::Beep, 5.0),
        ]);
        assert!(outcomes.iter().all(|o| *o == DispatchOutcome::Played));
        assert_eq!(*spoken.borrow(), vec!["Front left".to_string()]);
        assert_eq!(
            *tones.borrow(),
            vec![Tone::SplitStep(SplitStepSpeed::Fast), Tone::Beep]
        );
    }

    #[test]
    fn test_failed_narration_retried_once() {
        let (narrator, spoken) = narrator(1);
        let mut dispatcher = CueDispatcher::new(Some(narrator), None);
        assert_eq!(
            dispatcher.dispatch(&narration("Rest", 0.0)),
            DispatchOutcome::Retried
        );
        assert_eq!(spoken.borrow().len(), 1);
        assert!(dispatcher.take_reports().is_empty());
    }

    #[test]
    fn test_narration_skipped_after_second_failure() {
        let (narrator, spoken) = narrator(2);
        let mut dispatcher = CueDispatcher::new(Some(narrator), None);
        assert_eq!(
            dispatcher.dispatch(&narration("Rest", 0.0)),
            DispatchOutcome::Skipped
        );
        // The next cue still plays.
        assert_eq!(
            dispatcher.dispatch(&narration("Go", 3.0)),
            DispatchOutcome::Played
        );
        assert_eq!(*spoken.borrow(), vec!["Go".to_string()]);
        assert!(matches!(dispatcher.take_reports().as_slice(), [Error::Audio(_)]));
    }

    #[test]
    fn test_missing_capability_reported_once() {
        let mut dispatcher = CueDispatcher::new(None, None);
        for at in [1.0, 2.0, 3.0] {
            assert_eq!(
                dispatcher.dispatch(&tone(Tone::Beep, at)),
                DispatchOutcome::Unavailable(AudioCapability::Tones)
            );
        }
        dispatcher.dispatch(&narration("Rest", 4.0));

        let reports = dispatcher.take_reports();
        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0],
            Error::MissingAudioCapability(AudioCapability::Tones)
        ));
        assert_eq!(dispatcher.stats().unavailable, 4);
    }
}
