//! Choice Type core
//!
//! Platform-agnostic logic for the Choice Type quiz app: the timed quiz and
//! its classification, the persisted reward ledger, wallpaper unlocks and
//! the activity timer. Hosts supply storage and media export.

pub mod activity;
pub mod classification;
pub mod config;
pub mod constants;
pub mod data;
pub mod export;
pub mod ledger;
pub mod onboarding;
pub mod session;
pub mod store;

use anyhow::Context;
use log::{info, warn};
use std::path::PathBuf;

// Re-export commonly used types
pub use activity::{ActivityPhase, ActivityTimer, TaskList, format_hms};
pub use classification::{AttemptTally, Choice, Classification, UNCLASSIFIED_PROMPT, classify};
pub use config::{ActivityConfig, AppConfig, ConfigError, QuizConfig};
pub use data::{CatalogError, Question, QuestionCatalog};
pub use export::{ExportError, ExportRequest, ExportSource, MediaExport};
pub use ledger::{
    KeyValueStore, KvError, LedgerError, LedgerPatch, LedgerSnapshot, MemoryStore, RewardLedger,
    StoredBalls, parse_count,
};
pub use onboarding::{OnboardingFlow, OnboardingStep, Slide, SlideDeck};
pub use session::{AttemptResult, QuizPhase, QuizSession, Step, TimerRequest, TimerTag, finalize};
pub use store::{
    PurchaseError, PurchaseOutcome, ShelfEntry, StoreError, WallpaperCatalog, WallpaperItem,
    WallpaperShelf, can_afford, purchase,
};

/// Every embedded catalog, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub questions: QuestionCatalog,
    pub wallpapers: WallpaperCatalog,
    pub slides: SlideDeck,
    pub tasks: TaskList,
}

impl Catalogs {
    /// # Errors
    ///
    /// Returns an error naming the first embedded catalog that fails to load.
    pub fn load_from_static() -> anyhow::Result<Self> {
        Ok(Self {
            questions: QuestionCatalog::load_from_static().context("loading question catalog")?,
            wallpapers: WallpaperCatalog::load_from_static()
                .context("loading wallpaper catalog")?,
            slides: SlideDeck::load_from_static().context("loading onboarding slides")?,
            tasks: TaskList::load_from_static().context("loading activity tasks")?,
        })
    }
}

/// Home screen summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStatus {
    pub classification: Option<Classification>,
    pub last_score: u32,
    pub balance: u32,
    pub unlocked: usize,
}

impl ProfileStatus {
    #[must_use]
    pub fn headline(&self) -> &'static str {
        self.classification
            .map_or(UNCLASSIFIED_PROMPT, Classification::title)
    }
}

/// Binds the app's logic to a host's storage and media export.
pub struct ChoiceTypeEngine<S, M>
where
    S: KeyValueStore,
    M: MediaExport,
{
    ledger: RewardLedger<S>,
    exporter: M,
    catalogs: Catalogs,
    config: AppConfig,
}

impl<S, M> ChoiceTypeEngine<S, M>
where
    S: KeyValueStore,
    M: MediaExport,
{
    /// Load the embedded catalogs and validate `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog is malformed or the config is invalid.
    pub fn new(store: S, exporter: M, config: AppConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;
        let catalogs = Catalogs::load_from_static()?;
        Ok(Self::with_catalogs(store, exporter, catalogs, config))
    }

    pub const fn with_catalogs(store: S, exporter: M, catalogs: Catalogs, config: AppConfig) -> Self {
        Self {
            ledger: RewardLedger::new(store),
            exporter,
            catalogs,
            config,
        }
    }

    pub const fn ledger(&self) -> &RewardLedger<S> {
        &self.ledger
    }

    pub const fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn exporter(&self) -> &M {
        &self.exporter
    }

    pub fn status(&self) -> ProfileStatus {
        let snapshot = self.ledger.read();
        ProfileStatus {
            classification: snapshot.classification,
            last_score: snapshot.last_score,
            balance: snapshot.max_balls,
            unlocked: snapshot.unlocked.len(),
        }
    }

    /// A quiz session with the previous classification already loaded.
    pub fn quiz_session(&self) -> QuizSession {
        let mut session = QuizSession::new(self.catalogs.questions.clone(), self.config.quiz.clone());
        session.resume_result(&self.ledger);
        session
    }

    pub fn activity_timer(&self) -> ActivityTimer {
        ActivityTimer::new(self.catalogs.tasks.clone(), &self.config.activity)
    }

    pub fn onboarding(&self) -> OnboardingFlow {
        OnboardingFlow::new(self.catalogs.slides.clone())
    }

    pub fn shelf(&self) -> WallpaperShelf<'_> {
        self.catalogs.wallpapers.shelf(&self.ledger.read())
    }

    /// Spend balls on a wallpaper and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown, the balance is too low, or the
    /// ledger write fails.
    pub fn buy(&self, id: &str) -> Result<PurchaseOutcome, PurchaseError<S::Error>> {
        let item = self
            .catalogs
            .wallpapers
            .find_item(id)
            .ok_or_else(|| StoreError::UnknownItem(id.to_string()))?;
        let outcome = purchase(item, &self.ledger.read())?;
        self.ledger.apply_purchase(&outcome)?;
        if outcome == PurchaseOutcome::AlreadyUnlocked {
            info!("wallpaper {id} already unlocked");
        }
        Ok(outcome)
    }

    /// Export an unlocked wallpaper into the configured album.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Locked`] if the wallpaper is not unlocked, or
    /// whatever the exporter reports.
    pub fn save_wallpaper(&self, id: &str) -> Result<PathBuf, ExportError> {
        let request = self.export_request(id)?;
        let result = self.exporter.export_image(&request);
        match &result {
            Ok(path) => info!("wallpaper {id} saved to {}", path.display()),
            Err(err) => warn!("saving wallpaper {id} failed: {err}"),
        }
        result
    }

    /// # Errors
    ///
    /// Returns [`ExportError::Locked`] for unknown or locked wallpapers.
    pub fn export_request(&self, id: &str) -> Result<ExportRequest, ExportError> {
        let item = self
            .catalogs
            .wallpapers
            .find_item(id)
            .filter(|item| self.ledger.read_unlocked().contains(&item.id))
            .ok_or_else(|| ExportError::Locked(id.to_string()))?;
        Ok(ExportRequest {
            source: ExportSource::Bundled(item.asset.clone()),
            file_stem: format!("wall_{}", item.id),
            album: self.config.album.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::KEY_MAX_BALLS;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingExport {
        requests: Rc<RefCell<Vec<ExportRequest>>>,
        fail: bool,
    }

    impl MediaExport for RecordingExport {
        fn export_image(&self, request: &ExportRequest) -> Result<PathBuf, ExportError> {
            if self.fail {
                return Err(ExportError::PermissionDenied);
            }
            self.requests.borrow_mut().push(request.clone());
            Ok(PathBuf::from(&request.album).join(format!("{}.png", request.file_stem)))
        }
    }

    fn engine(entries: &[(&str, &str)]) -> ChoiceTypeEngine<MemoryStore, RecordingExport> {
        ChoiceTypeEngine::new(
            MemoryStore::with_entries(entries.iter().copied()),
            RecordingExport::default(),
            AppConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn fresh_install_status() {
        let engine = engine(&[]);
        let status = engine.status();
        assert_eq!(status.classification, None);
        assert_eq!(status.balance, 0);
        assert_eq!(status.headline(), "Find out how you react.");
    }

    #[test]
    fn buy_then_save_wallpaper() {
        let engine = engine(&[(KEY_MAX_BALLS, "4")]);
        assert!(matches!(
            engine.save_wallpaper("calm"),
            Err(ExportError::Locked(id)) if id == "calm"
        ));

        let outcome = engine.buy("calm").unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Unlocked { balance: 1, .. }));
        assert_eq!(engine.buy("calm").unwrap(), PurchaseOutcome::AlreadyUnlocked);

        let path = engine.save_wallpaper("calm").unwrap();
        assert_eq!(path, PathBuf::from("RooBall").join("wall_calm.png"));
        let requests = engine.exporter().requests.borrow();
        assert_eq!(
            requests[0].source,
            ExportSource::Bundled("wall_calm.png".to_string())
        );
        assert_eq!(engine.status().unlocked, 1);
    }

    #[test]
    fn buy_rejects_poor_and_unknown() {
        let engine = engine(&[(KEY_MAX_BALLS, "2")]);
        assert!(matches!(
            engine.buy("quick"),
            Err(PurchaseError::Rejected(StoreError::InsufficientFunds {
                needed: 3,
                available: 2
            }))
        ));
        assert!(matches!(
            engine.buy("nope"),
            Err(PurchaseError::Rejected(StoreError::UnknownItem(_)))
        ));
        assert_eq!(engine.status().balance, 2);
        assert_eq!(engine.shelf().unlocked_count(), 0);
    }

    #[test]
    fn exporter_failure_is_passed_through() {
        let engine = ChoiceTypeEngine::new(
            MemoryStore::with_entries([(KEY_MAX_BALLS, "3")]),
            RecordingExport {
                fail: true,
                ..RecordingExport::default()
            },
            AppConfig::default(),
        )
        .unwrap();
        engine.buy("flow").unwrap();
        let err = engine.save_wallpaper("flow").unwrap_err();
        assert_eq!(err.user_message(), "Failed to save file.");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.quiz.question_secs = 0;
        let result = ChoiceTypeEngine::new(MemoryStore::new(), RecordingExport::default(), config);
        assert!(result.is_err());
    }

    #[test]
    fn quiz_session_resumes_last_classification() {
        let engine = engine(&[("@choice_type", "steady")]);
        let session = engine.quiz_session();
        assert_eq!(session.last_classification(), Some(Classification::Steady));
        assert_eq!(session.catalog().len(), 12);
    }
}
