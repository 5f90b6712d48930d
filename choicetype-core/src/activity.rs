//! Activity timer: pick a small task, finish it before the countdown ends,
//! earn one ball.
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ActivityConfig;
use crate::constants::{ACTIVITY_REWARD, TICK_INTERVAL};
use crate::data::CatalogError;
use crate::ledger::{KeyValueStore, LedgerError, RewardLedger};
use crate::session::{TimerRequest, TimerTag};

const TASKS_JSON: &str = include_str!("../assets/data/tasks.json");

/// Short tasks offered by the activity timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    tasks: Vec<String>,
}

impl TaskList {
    /// # Errors
    ///
    /// Returns an error if the list is empty.
    pub fn new(tasks: Vec<String>) -> Result<Self, CatalogError> {
        if tasks.is_empty() {
            return Err(CatalogError::Empty("task"));
        }
        Ok(Self { tasks })
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the list is empty.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.tasks)
    }

    /// # Errors
    ///
    /// Returns an error if the embedded asset is malformed.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(TASKS_JSON)
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let idx = rng.gen_range(0..self.tasks.len());
        &self.tasks[idx]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityPhase {
    Idle,
    Active { task: String },
    Done { task: String, balance: u32 },
}

/// Countdown plus reward bookkeeping for one activity screen.
#[derive(Debug, Clone)]
pub struct ActivityTimer {
    tasks: TaskList,
    duration_secs: u32,
    remaining_secs: u32,
    phase: ActivityPhase,
    generation: u64,
}

impl ActivityTimer {
    #[must_use]
    pub const fn new(tasks: TaskList, config: &ActivityConfig) -> Self {
        Self {
            tasks,
            duration_secs: config.duration_secs,
            remaining_secs: config.duration_secs,
            phase: ActivityPhase::Idle,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> &ActivityPhase {
        &self.phase
    }

    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn remaining_label(&self) -> String {
        format_hms(self.remaining_secs)
    }

    #[must_use]
    pub fn task(&self) -> Option<&str> {
        match &self.phase {
            ActivityPhase::Active { task } | ActivityPhase::Done { task, .. } => Some(task),
            ActivityPhase::Idle => None,
        }
    }

    /// Pick a task and arm the countdown. Returns `None` unless idle.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TimerRequest> {
        if self.phase != ActivityPhase::Idle {
            return None;
        }
        let task = self.tasks.pick(rng).to_string();
        debug!("activity started: {task}");
        self.phase = ActivityPhase::Active { task };
        self.remaining_secs = self.duration_secs;
        self.generation += 1;
        Some(TimerRequest::Tick {
            tag: self.tag(),
            every: TICK_INTERVAL,
        })
    }

    /// One-second tick. Expiry returns to idle without a reward.
    /// Returns whether the tag was current.
    pub fn on_tick(&mut self, tag: TimerTag) -> bool {
        if !matches!(self.phase, ActivityPhase::Active { .. }) || tag != self.tag() {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            info!("activity expired without completion");
            self.reset();
        }
        true
    }

    /// Complete the active task and add the reward to the balance.
    ///
    /// Returns `Ok(None)` when no task is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the balance cannot be written; the task stays active.
    pub fn finish<S: KeyValueStore>(
        &mut self,
        ledger: &RewardLedger<S>,
    ) -> Result<Option<u32>, LedgerError<S::Error>> {
        let ActivityPhase::Active { task } = &self.phase else {
            return Ok(None);
        };
        let balance = ledger.add_balls(ACTIVITY_REWARD)?;
        info!("activity finished, balance now {balance}");
        self.phase = ActivityPhase::Done {
            task: task.clone(),
            balance,
        };
        self.generation += 1;
        Ok(Some(balance))
    }

    /// Close the completion view and restore the full countdown.
    pub fn dismiss(&mut self) {
        if matches!(self.phase, ActivityPhase::Done { .. }) {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.phase = ActivityPhase::Idle;
        self.remaining_secs = self.duration_secs;
        self.generation += 1;
    }

    const fn tag(&self) -> TimerTag {
        TimerTag {
            generation: self.generation,
            question: 0,
        }
    }
}

/// `HH:MM:SS`, hours not wrapped.
#[must_use]
pub fn format_hms(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
