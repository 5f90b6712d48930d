//! Timed quiz attempt: `Intro -> Playing -> Finished`.
//!
//! The session never sleeps. Whenever it needs a timer it hands back a
//! [`TimerRequest`] carrying a [`TimerTag`]; the host schedules it and later
//! feeds the tag back through `on_tick`, `on_deadline` or `on_settle`. Every
//! callback is checked against the current tag first, so a timer the host
//! failed to cancel is ignored instead of advancing the wrong question.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classification::{AttemptTally, Choice, Classification};
use crate::config::QuizConfig;
use crate::constants::TICK_INTERVAL;
use crate::data::{Question, QuestionCatalog};
use crate::ledger::{KeyValueStore, LedgerPatch, RewardLedger, StoredBalls};

/// Identity of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerTag {
    pub generation: u64,
    pub question: usize,
}

/// Timers the host must schedule on behalf of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    /// Repeating display tick.
    Tick { tag: TimerTag, every: Duration },
    /// One-shot timeout for the current question.
    Deadline { tag: TimerTag, after: Duration },
    /// One-shot pause after a pick before advancing.
    Settle { tag: TimerTag, after: Duration },
}

impl TimerRequest {
    #[must_use]
    pub const fn tag(&self) -> TimerTag {
        match self {
            Self::Tick { tag, .. } | Self::Deadline { tag, .. } | Self::Settle { tag, .. } => *tag,
        }
    }
}

/// Final outcome of an attempt, available once the ledger writes are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub classification: Classification,
    pub tally: AttemptTally,
    pub previous_max: u32,
    pub new_max: u32,
    /// False when the ledger write failed; the result is still shown.
    pub persisted: bool,
}

impl AttemptResult {
    #[must_use]
    pub const fn correct(&self) -> u32 {
        self.tally.correct
    }

    #[must_use]
    pub const fn raised_max(&self) -> bool {
        self.new_max > self.previous_max
    }
}

/// In-progress question state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayState {
    pub question: usize,
    pub tally: AttemptTally,
    pub picked: Option<Choice>,
    pub seconds_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Intro,
    Playing(PlayState),
    Finished(AttemptResult),
}

/// What a timer callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Stale or out-of-phase callback; nothing changed.
    Ignored,
    /// Moved to the next question; schedule these timers.
    NextQuestion {
        index: usize,
        timers: Vec<TimerRequest>,
    },
    /// Attempt finished and finalized.
    Finished(AttemptResult),
}

/// One quiz screen's worth of state.
#[derive(Debug, Clone)]
pub struct QuizSession {
    catalog: QuestionCatalog,
    config: QuizConfig,
    phase: QuizPhase,
    generation: u64,
    last_classification: Option<Classification>,
}

impl QuizSession {
    #[must_use]
    pub const fn new(catalog: QuestionCatalog, config: QuizConfig) -> Self {
        Self {
            catalog,
            config,
            phase: QuizPhase::Intro,
            generation: 0,
            last_classification: None,
        }
    }

    /// Load the previously stored classification when the screen opens.
    pub fn resume_result<S: KeyValueStore>(
        &mut self,
        ledger: &RewardLedger<S>,
    ) -> Option<Classification> {
        self.last_classification = ledger.read_classification();
        self.last_classification
    }

    #[must_use]
    pub const fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    #[must_use]
    pub const fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub const fn last_classification(&self) -> Option<Classification> {
        self.last_classification
    }

    #[must_use]
    pub const fn play_state(&self) -> Option<&PlayState> {
        match &self.phase {
            QuizPhase::Playing(play) => Some(play),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        let play = self.play_state()?;
        self.catalog
            .question(play.question)
            .map(|q| (play.question, q))
    }

    /// Tag of the timers that are currently allowed to fire.
    #[must_use]
    pub fn current_tag(&self) -> Option<TimerTag> {
        self.play_state().map(|play| TimerTag {
            generation: self.generation,
            question: play.question,
        })
    }

    /// Countdown and position, e.g. `"7s • 3/12"`.
    #[must_use]
    pub fn progress_label(&self) -> Option<String> {
        self.play_state().map(|play| {
            format!(
                "{}s • {}/{}",
                play.seconds_left,
                play.question + 1,
                self.catalog.len()
            )
        })
    }

    /// Begin a fresh attempt. Restarts from scratch when already playing.
    pub fn start(&mut self) -> Vec<TimerRequest> {
        if matches!(self.phase, QuizPhase::Playing(_)) {
            debug!("restarting attempt in progress");
        }
        self.phase = QuizPhase::Playing(PlayState {
            question: 0,
            tally: AttemptTally::default(),
            picked: None,
            seconds_left: self.config.question_secs,
        });
        self.arm_countdown(0)
    }

    /// Record a pick for the current question.
    ///
    /// Returns the settle timer to schedule, or `None` when the pick is
    /// ignored (not playing, or this question already has a pick).
    pub fn pick(&mut self, choice: Choice) -> Option<TimerRequest> {
        let QuizPhase::Playing(play) = &mut self.phase else {
            return None;
        };
        if play.picked.is_some() {
            return None;
        }
        let expected = self.catalog.expected(play.question)?;
        play.tally.record(choice, expected);
        play.picked = Some(choice);
        let question = play.question;
        // Invalidates the pending tick and deadline for this question.
        self.generation += 1;
        debug!("question {question}: picked {choice}");
        Some(TimerRequest::Settle {
            tag: TimerTag {
                generation: self.generation,
                question,
            },
            after: self.config.settle_delay(),
        })
    }

    /// Display tick. Returns whether the tag was current.
    pub fn on_tick(&mut self, tag: TimerTag) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        if let QuizPhase::Playing(play) = &mut self.phase {
            play.seconds_left = play.seconds_left.saturating_sub(1);
        }
        true
    }

    /// Countdown reached zero with no pick: nothing is tallied, then advance.
    pub fn on_deadline<S: KeyValueStore>(
        &mut self,
        tag: TimerTag,
        ledger: &RewardLedger<S>,
    ) -> Step {
        if !self.is_current(tag) {
            debug!("discarding stale deadline {tag:?}");
            return Step::Ignored;
        }
        match &mut self.phase {
            QuizPhase::Playing(play) if play.picked.is_none() => {
                play.seconds_left = 0;
                debug!("question {}: timed out", play.question);
            }
            _ => return Step::Ignored,
        }
        self.advance(ledger)
    }

    /// Settle pause after a pick elapsed: advance.
    pub fn on_settle<S: KeyValueStore>(
        &mut self,
        tag: TimerTag,
        ledger: &RewardLedger<S>,
    ) -> Step {
        if !self.is_current(tag) {
            debug!("discarding stale settle {tag:?}");
            return Step::Ignored;
        }
        match self.play_state() {
            Some(play) if play.picked.is_some() => self.advance(ledger),
            _ => Step::Ignored,
        }
    }

    /// Abandon the attempt without finalizing (screen lost focus).
    pub fn leave(&mut self) {
        if matches!(self.phase, QuizPhase::Playing(_)) {
            debug!("attempt abandoned");
        }
        self.generation += 1;
        self.phase = QuizPhase::Intro;
    }

    fn is_current(&self, tag: TimerTag) -> bool {
        self.current_tag() == Some(tag)
    }

    fn arm_countdown(&mut self, question: usize) -> Vec<TimerRequest> {
        self.generation += 1;
        let tag = TimerTag {
            generation: self.generation,
            question,
        };
        vec![
            TimerRequest::Tick {
                tag,
                every: TICK_INTERVAL,
            },
            TimerRequest::Deadline {
                tag,
                after: self.config.question_duration(),
            },
        ]
    }

    fn advance<S: KeyValueStore>(&mut self, ledger: &RewardLedger<S>) -> Step {
        let QuizPhase::Playing(play) = self.phase else {
            return Step::Ignored;
        };
        let next = play.question + 1;
        if next < self.catalog.len() {
            self.phase = QuizPhase::Playing(PlayState {
                question: next,
                tally: play.tally,
                picked: None,
                seconds_left: self.config.question_secs,
            });
            let timers = self.arm_countdown(next);
            Step::NextQuestion {
                index: next,
                timers,
            }
        } else {
            self.generation += 1;
            let result = finalize(&play.tally, ledger);
            self.last_classification = Some(result.classification);
            self.phase = QuizPhase::Finished(result);
            Step::Finished(result)
        }
    }
}

/// Classify the tally and persist classification, score and, when beaten or
/// unreadable, the balance. Runs once per completed attempt.
pub fn finalize<S: KeyValueStore>(tally: &AttemptTally, ledger: &RewardLedger<S>) -> AttemptResult {
    let classification = tally.classify();
    let correct = tally.correct;
    let stored = ledger.stored_max_balls();
    let previous_max = stored.value();

    let mut patch = LedgerPatch::new()
        .classification(classification)
        .last_score(correct);
    let new_max = if matches!(stored, StoredBalls::Invalid) || correct > previous_max {
        patch = patch.max_balls(correct);
        correct
    } else {
        previous_max
    };

    let persisted = match ledger.write(&patch) {
        Ok(()) => true,
        Err(err) => {
            warn!("attempt result not saved: {err}");
            false
        }
    };
    info!(
        "attempt finished: {classification} with {correct} correct (A {} / B {} / C {})",
        tally.count_a, tally.count_b, tally.count_c
    );

    AttemptResult {
        classification,
        tally: *tally,
        previous_max,
        new_max,
        persisted,
    }
}
