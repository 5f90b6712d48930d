use choicetype_core::constants::{KEY_CLASSIFICATION, KEY_LAST_SCORE, KEY_MAX_BALLS};
use choicetype_core::{
    ActivityTimer, AppConfig, Choice, Classification, KeyValueStore, MemoryStore, PurchaseOutcome,
    QuestionCatalog, QuizConfig, QuizPhase, QuizSession, RewardLedger, Step, TaskList,
    TimerRequest, WallpaperCatalog, purchase,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Drive one attempt: `Some(choice)` picks, `None` lets the deadline fire.
fn run_attempt(
    session: &mut QuizSession,
    ledger: &RewardLedger<MemoryStore>,
    picks: &[Option<Choice>],
) -> Step {
    let mut timers = session.start();
    let mut last = Step::Ignored;
    for pick in picks {
        last = match pick {
            Some(choice) => {
                let settle = session.pick(*choice).expect("pick accepted");
                session.on_settle(settle.tag(), ledger)
            }
            None => {
                let deadline = timers
                    .iter()
                    .find(|t| matches!(t, TimerRequest::Deadline { .. }))
                    .expect("deadline armed")
                    .tag();
                session.on_deadline(deadline, ledger)
            }
        };
        if let Step::NextQuestion { timers: next, .. } = &last {
            timers = next.clone();
        }
    }
    last
}

#[test]
fn full_attempt_persists_result_and_raises_balance() {
    let ledger = RewardLedger::new(MemoryStore::with_entries([(KEY_MAX_BALLS, "3")]));
    let mut session = QuizSession::new(
        QuestionCatalog::load_from_static().unwrap(),
        QuizConfig::default(),
    );

    let mut picks = vec![Some(Choice::B); 8];
    picks.extend([Some(Choice::A), Some(Choice::C), None, None]);
    let Step::Finished(result) = run_attempt(&mut session, &ledger, &picks) else {
        panic!("attempt did not finish");
    };

    assert_eq!(result.correct(), 8);
    assert_eq!(result.tally.count_a, 1);
    assert_eq!(result.tally.count_c, 1);
    assert_eq!(result.classification, Classification::Steady);
    assert_eq!(result.previous_max, 3);
    assert_eq!(result.new_max, 8);
    assert!(result.persisted);
    assert!(matches!(session.phase(), QuizPhase::Finished(_)));

    let store = ledger.store();
    assert_eq!(store.get(KEY_CLASSIFICATION).unwrap().as_deref(), Some("steady"));
    assert_eq!(store.get(KEY_LAST_SCORE).unwrap().as_deref(), Some("8"));
    assert_eq!(store.get(KEY_MAX_BALLS).unwrap().as_deref(), Some("8"));
}

#[test]
fn all_timeouts_classify_calm_and_keep_balance() {
    let ledger = RewardLedger::new(MemoryStore::with_entries([("@maxBalls", "5")]));
    let mut session = QuizSession::new(
        QuestionCatalog::load_from_static().unwrap(),
        QuizConfig::default(),
    );
    let Step::Finished(result) = run_attempt(&mut session, &ledger, &[None; 12]) else {
        panic!("attempt did not finish");
    };
    assert_eq!(result.classification, Classification::Calm);
    assert_eq!(result.correct(), 0);
    assert_eq!(ledger.read_max_balls(), 5);
    assert_eq!(ledger.store().raw(KEY_MAX_BALLS), None);
}

#[test]
fn quiz_activity_and_store_share_one_balance() {
    let ledger = RewardLedger::new(MemoryStore::new());
    let mut session = QuizSession::new(
        QuestionCatalog::load_from_static().unwrap(),
        QuizConfig::default(),
    );
    let mut picks = vec![Some(Choice::B); 2];
    picks.extend([Some(Choice::C); 10]);
    let Step::Finished(result) = run_attempt(&mut session, &ledger, &picks) else {
        panic!("attempt did not finish");
    };
    assert_eq!(result.classification, Classification::Quick);
    assert_eq!(ledger.read_max_balls(), 2);

    let mut activity = ActivityTimer::new(
        TaskList::load_from_static().unwrap(),
        &AppConfig::default().activity,
    );
    activity.start(&mut ChaCha20Rng::seed_from_u64(42));
    assert_eq!(activity.finish(&ledger).unwrap(), Some(3));

    let catalog = WallpaperCatalog::load_from_static().unwrap();
    let item = catalog.find_item("moment").unwrap();
    let outcome = purchase(item, &ledger.read()).unwrap();
    ledger.apply_purchase(&outcome).unwrap();
    assert!(matches!(outcome, PurchaseOutcome::Unlocked { balance: 0, .. }));

    let snapshot = ledger.read();
    assert_eq!(snapshot.max_balls, 0);
    assert!(snapshot.is_unlocked("moment"));
    assert_eq!(snapshot.classification, Some(Classification::Quick));
}
