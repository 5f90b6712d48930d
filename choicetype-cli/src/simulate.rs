//! Scripted attempts driven without wall-clock time.
use anyhow::{Result, bail};
use choicetype_core::{
    AttemptResult, Choice, Classification, KeyValueStore, QuestionCatalog, QuizConfig,
    QuizSession, RewardLedger, Step, TimerRequest,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One entry per question; `None` lets the countdown expire.
pub type PickScript = Vec<Option<Choice>>;

/// Parse `a`/`b`/`c` for picks and `-` for timeouts; whitespace is ignored.
///
/// # Errors
///
/// Returns an error on any other character or a length mismatch.
pub fn parse_script(text: &str, expected_len: usize) -> Result<PickScript> {
    let mut script = Vec::with_capacity(expected_len);
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        let entry = match ch.to_ascii_lowercase() {
            'a' => Some(Choice::A),
            'b' => Some(Choice::B),
            'c' => Some(Choice::C),
            '-' => None,
            other => bail!("invalid pick '{other}' (use a, b, c or -)"),
        };
        script.push(entry);
    }
    if script.len() != expected_len {
        bail!(
            "script has {} entries but the quiz has {expected_len} questions",
            script.len()
        );
    }
    Ok(script)
}

pub fn random_script<R: Rng + ?Sized>(rng: &mut R, len: usize) -> PickScript {
    (0..len)
        .map(|_| match rng.gen_range(0..4) {
            0 => Some(Choice::A),
            1 => Some(Choice::B),
            2 => Some(Choice::C),
            _ => None,
        })
        .collect()
}

#[must_use]
pub fn script_label(script: &[Option<Choice>]) -> String {
    script
        .iter()
        .map(|entry| entry.map_or('-', |c| c.letter().to_ascii_lowercase()))
        .collect()
}

/// Play one attempt from a script, feeding deadlines and settles directly.
///
/// # Errors
///
/// Returns an error if the session stops before finishing.
pub fn run_script<S: KeyValueStore>(
    catalog: &QuestionCatalog,
    config: &QuizConfig,
    ledger: &RewardLedger<S>,
    script: &[Option<Choice>],
) -> Result<AttemptResult> {
    let mut session = QuizSession::new(catalog.clone(), config.clone());
    let mut timers = session.start();
    for (index, entry) in script.iter().enumerate() {
        let step = match entry {
            Some(choice) => match session.pick(*choice) {
                Some(settle) => session.on_settle(settle.tag(), ledger),
                None => bail!("pick refused at question {}", index + 1),
            },
            None => {
                let Some(deadline) = timers
                    .iter()
                    .find(|t| matches!(t, TimerRequest::Deadline { .. }))
                else {
                    bail!("no countdown armed at question {}", index + 1);
                };
                session.on_deadline(deadline.tag(), ledger)
            }
        };
        match step {
            Step::NextQuestion { timers: next, .. } => timers = next,
            Step::Finished(result) => return Ok(result),
            Step::Ignored => bail!("question {} did not advance", index + 1),
        }
    }
    bail!("script ended before the last question")
}

/// One simulated attempt as it appears in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub attempt: usize,
    pub script: String,
    pub classification: Classification,
    pub correct: u32,
    pub count_a: u32,
    pub count_b: u32,
    pub count_c: u32,
    pub previous_max: u32,
    pub new_max: u32,
}

impl SimulationRecord {
    #[must_use]
    pub fn new(attempt: usize, script: &[Option<Choice>], result: &AttemptResult) -> Self {
        Self {
            attempt,
            script: script_label(script),
            classification: result.classification,
            correct: result.correct(),
            count_a: result.tally.count_a,
            count_b: result.tally.count_b,
            count_c: result.tally.count_c,
            previous_max: result.previous_max,
            new_max: result.new_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choicetype_core::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn parses_picks_and_timeouts() {
        let script = parse_script("ab c-", 4).unwrap();
        assert_eq!(
            script,
            vec![Some(Choice::A), Some(Choice::B), Some(Choice::C), None]
        );
        assert_eq!(script_label(&script), "abc-");
        assert!(parse_script("abx", 3).is_err());
        assert!(parse_script("ab", 3).is_err());
    }

    #[test]
    fn random_scripts_repeat_for_a_seed() {
        let a = random_script(&mut ChaCha20Rng::seed_from_u64(11), 12);
        let b = random_script(&mut ChaCha20Rng::seed_from_u64(11), 12);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn scripted_attempt_matches_answer_key() {
        let catalog = QuestionCatalog::load_from_static().unwrap();
        let ledger = RewardLedger::new(MemoryStore::new());
        let script = parse_script("bbbb cccc ----", 12).unwrap();
        let result = run_script(&catalog, &QuizConfig::default(), &ledger, &script).unwrap();
        assert_eq!(result.correct(), 4);
        assert_eq!(result.classification, Classification::Steady);
        let record = SimulationRecord::new(1, &script, &result);
        assert_eq!(record.script, "bbbbcccc----");
        assert_eq!(record.new_max, 4);
    }

    #[test]
    fn short_script_is_rejected() {
        let catalog = QuestionCatalog::load_from_static().unwrap();
        let ledger = RewardLedger::new(MemoryStore::new());
        let script = vec![Some(Choice::B); 3];
        assert!(run_script(&catalog, &QuizConfig::default(), &ledger, &script).is_err());
    }
}
