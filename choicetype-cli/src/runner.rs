//! Tokio host for the quiz and activity state machines.
//!
//! The core hands back [`TimerRequest`] values; this module arms them as
//! tokio sleeps/intervals and feeds each expiry back with its tag. Stale
//! callbacks are rejected by the core, and re-arming also drops the old
//! timers here.
use anyhow::{Context, Result};
use choicetype_core::{
    ActivityPhase, ActivityTimer, AttemptResult, Choice, KeyValueStore, QuizSession,
    RewardLedger, Step, TimerRequest, TimerTag,
};
use colored::Colorize;
use log::debug;
use rand::Rng;
use std::future::pending;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

/// Forward stdin lines into a channel. The channel closes at EOF.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Default)]
struct ArmedTimers {
    tick: Option<(TimerTag, Interval)>,
    deadline: Option<(TimerTag, Instant)>,
    settle: Option<(TimerTag, Instant)>,
}

impl ArmedTimers {
    fn arm(&mut self, request: TimerRequest) {
        let now = Instant::now();
        match request {
            TimerRequest::Tick { tag, every } => {
                let mut ticks = interval_at(now + every, every);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.tick = Some((tag, ticks));
            }
            TimerRequest::Deadline { tag, after } => self.deadline = Some((tag, now + after)),
            TimerRequest::Settle { tag, after } => self.settle = Some((tag, now + after)),
        }
    }

    fn arm_all(&mut self, requests: Vec<TimerRequest>) {
        self.clear();
        for request in requests {
            self.arm(request);
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

enum Event {
    Line(Option<String>),
    Tick(TimerTag),
    Deadline(TimerTag),
    Settle(TimerTag),
}

async fn next_tick(slot: &mut Option<(TimerTag, Interval)>) -> TimerTag {
    match slot {
        Some((tag, ticks)) => {
            ticks.tick().await;
            *tag
        }
        None => pending().await,
    }
}

async fn fire_at(slot: Option<(TimerTag, Instant)>) -> TimerTag {
    match slot {
        Some((tag, when)) => {
            sleep_until(when).await;
            tag
        }
        None => pending().await,
    }
}

/// Wait for the next input line or timer. Input is only read while
/// `accepting`; lines typed during the settle pause wait for the next question.
async fn next_event(
    timers: &mut ArmedTimers,
    input: &mut mpsc::Receiver<String>,
    accepting: bool,
) -> Event {
    tokio::select! {
        line = input.recv(), if accepting => Event::Line(line),
        tag = next_tick(&mut timers.tick) => Event::Tick(tag),
        tag = fire_at(timers.deadline) => Event::Deadline(tag),
        tag = fire_at(timers.settle) => Event::Settle(tag),
    }
}

fn show_question<W: Write>(session: &QuizSession, out: &mut W) -> Result<()> {
    let (Some((_, question)), Some(label)) = (session.current_question(), session.progress_label())
    else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(out, "{}", label.bright_cyan())?;
    writeln!(out, "{}", question.prompt.bold())?;
    for choice in Choice::ALL {
        writeln!(out, "  {}) {}", choice, question.option(choice))?;
    }
    out.flush()?;
    Ok(())
}

/// Run one interactive attempt. Returns `None` if input closed or the user
/// quit before the last question; the attempt is then abandoned unsaved.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub async fn run_quiz<S: KeyValueStore, W: Write>(
    session: &mut QuizSession,
    ledger: &RewardLedger<S>,
    input: &mut mpsc::Receiver<String>,
    out: &mut W,
) -> Result<Option<AttemptResult>> {
    let mut timers = ArmedTimers::default();
    timers.arm_all(session.start());
    show_question(session, out)?;

    loop {
        let accepting = session
            .play_state()
            .is_some_and(|play| play.picked.is_none());
        let step = match next_event(&mut timers, input, accepting).await {
            Event::Line(None) => {
                session.leave();
                writeln!(out, "Attempt abandoned.")?;
                return Ok(None);
            }
            Event::Line(Some(text)) => {
                if text.trim().eq_ignore_ascii_case("q") {
                    session.leave();
                    writeln!(out, "Attempt abandoned.")?;
                    return Ok(None);
                }
                match Choice::from_letter(&text) {
                    Some(choice) => {
                        if let Some(settle) = session.pick(choice) {
                            timers.clear();
                            timers.arm(settle);
                            writeln!(out, "→ {choice}")?;
                        }
                    }
                    None => writeln!(out, "Type a, b or c.")?,
                }
                Step::Ignored
            }
            Event::Tick(tag) => {
                if session.on_tick(tag)
                    && let Some(play) = session.play_state()
                    && (1..=3).contains(&play.seconds_left)
                {
                    writeln!(out, "  {}s", play.seconds_left)?;
                }
                Step::Ignored
            }
            Event::Deadline(tag) => {
                timers.deadline = None;
                let step = session.on_deadline(tag, ledger);
                if step != Step::Ignored {
                    writeln!(out, "{}", "⏰ Time's up".yellow())?;
                }
                step
            }
            Event::Settle(tag) => {
                timers.settle = None;
                session.on_settle(tag, ledger)
            }
        };

        match step {
            Step::Ignored => {}
            Step::NextQuestion { timers: next, .. } => {
                timers.arm_all(next);
                show_question(session, out)?;
            }
            Step::Finished(result) => {
                timers.clear();
                return Ok(Some(result));
            }
        }
    }
}

/// Run the activity timer until Enter (reward), expiry, or closed input.
/// Returns the new balance when the task was finished.
///
/// # Errors
///
/// Returns an error if the reward cannot be saved or output fails.
pub async fn run_activity<S: KeyValueStore, W: Write, R: Rng + ?Sized>(
    timer: &mut ActivityTimer,
    ledger: &RewardLedger<S>,
    input: &mut mpsc::Receiver<String>,
    out: &mut W,
    rng: &mut R,
) -> Result<Option<u32>> {
    let mut timers = ArmedTimers::default();
    if let Some(tick) = timer.start(rng) {
        timers.arm(tick);
    }
    let task = timer.task().unwrap_or_default().to_string();
    writeln!(out, "{}", task.bold())?;
    writeln!(out, "Time left: {}  (press Enter when done)", timer.remaining_label())?;
    out.flush()?;

    loop {
        match next_event(&mut timers, input, true).await {
            Event::Line(None) => {
                writeln!(out, "Activity abandoned.")?;
                return Ok(None);
            }
            Event::Line(Some(_)) => {
                let balance = timer
                    .finish(ledger)
                    .context("saving activity reward")?;
                if let Some(balance) = balance {
                    writeln!(out, "{} Balls: {balance}", "+1 ball!".green().bold())?;
                    timer.dismiss();
                    return Ok(Some(balance));
                }
            }
            Event::Tick(tag) => {
                if !timer.on_tick(tag) {
                    continue;
                }
                if *timer.phase() == ActivityPhase::Idle {
                    writeln!(out, "{}", "Time ran out. No ball this time.".yellow())?;
                    return Ok(None);
                }
                let left = timer.remaining_secs();
                if left % 60 == 0 || left <= 5 {
                    debug!("activity tick, {left}s left");
                    writeln!(out, "Time left: {}", timer.remaining_label())?;
                }
            }
            Event::Deadline(_) | Event::Settle(_) => {}
        }
    }
}
