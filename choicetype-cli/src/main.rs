mod media;
mod reports;
mod runner;
mod simulate;
mod storage;

use anyhow::{Context, Result};
use choicetype_core::{
    AppConfig, ChoiceTypeEngine, ExportError, LedgerPatch, MemoryStore, OnboardingStep,
    PurchaseError, PurchaseOutcome, RewardLedger, StoreError,
    constants::INSUFFICIENT_FUNDS_MESSAGE,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use media::FsMediaExport;
use reports::{ReportFormat, SimulationReport, write_report};
use simulate::{SimulationRecord, parse_script, random_script, run_script};
use storage::FileStore;

const DATA_DIR_ENV: &str = "CHOICETYPE_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".choicetype";

type Engine = ChoiceTypeEngine<FileStore, FsMediaExport>;

#[derive(Debug, Parser)]
#[command(name = "choicetype", version)]
#[command(about = "Timed reaction quiz with a ball-powered wallpaper store")]
struct Args {
    /// Directory holding the ledger (default: $CHOICETYPE_DATA_DIR or ./.choicetype)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON file overriding timings and the gallery album
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the current type and balance
    Status,
    /// Walk through the introduction slides
    Onboarding {
        #[arg(long)]
        skip: bool,
    },
    /// Take the timed quiz (type a, b or c then Enter; q quits)
    Quiz,
    /// Run scripted attempts instantly without touching the saved ledger
    Simulate {
        /// Pick script, one character per question: a, b, c or - for a timeout
        #[arg(long = "picks", required_unless_present = "random")]
        picks: Vec<String>,

        /// Generate random scripts instead
        #[arg(long, conflicts_with = "picks")]
        random: bool,

        #[arg(long, default_value_t = 1337)]
        seed: u64,

        /// Number of random attempts
        #[arg(long, default_value_t = 1)]
        count: usize,

        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        report: ReportFormat,

        /// Optional path to write the report output instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Do a short task for one ball (press Enter when done)
    Activity {
        #[arg(long)]
        duration_secs: Option<u32>,

        /// Seed for the task pick
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Browse, buy and save wallpapers
    Store {
        #[command(subcommand)]
        action: StoreCommand,
    },
}

#[derive(Debug, Subcommand)]
enum StoreCommand {
    List,
    Buy {
        id: String,
    },
    Save {
        id: String,
        /// Gallery root; the album is created inside it
        #[arg(long)]
        dest: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let data_dir = resolve_data_dir(args.data_dir.clone(), std::env::var(DATA_DIR_ENV).ok());
    let mut config = load_config(args.config.as_deref())?;
    if let Command::Activity {
        duration_secs: Some(secs),
        ..
    } = &args.command
    {
        config.activity.duration_secs = *secs;
    }
    let gallery = match &args.command {
        Command::Store {
            action: StoreCommand::Save {
                dest: Some(dest), ..
            },
        } => dest.clone(),
        _ => data_dir.join("gallery"),
    };
    info!("data directory: {}", data_dir.display());

    let engine = ChoiceTypeEngine::new(
        FileStore::in_dir(&data_dir),
        FsMediaExport::new(gallery),
        config,
    )?;

    match args.command {
        Command::Status => show_status(&engine),
        Command::Onboarding { skip } => run_onboarding(&engine, skip),
        Command::Quiz => run_quiz(&engine).await,
        Command::Simulate {
            picks,
            random,
            seed,
            count,
            report,
            output,
        } => run_simulation(&engine, &picks, random.then_some((seed, count)), report, output),
        Command::Activity { seed, .. } => run_activity(&engine, seed).await,
        Command::Store { action } => match action {
            StoreCommand::List => list_store(&engine),
            StoreCommand::Buy { id } => buy(&engine, &id),
            StoreCommand::Save { id, .. } => save(&engine, &id),
        },
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// `--data-dir`, then the environment, then `./.choicetype`.
fn resolve_data_dir(flag: Option<PathBuf>, env_value: Option<String>) -> PathBuf {
    flag.or_else(|| env_value.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    AppConfig::from_json(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn show_status(engine: &Engine) -> Result<ExitCode> {
    let status = engine.status();
    println!("{}", status.headline().bright_cyan().bold());
    if let Some(class) = status.classification {
        println!("{}", class.description());
    }
    println!();
    println!("Balls: {}", status.balance.to_string().yellow());
    println!("Last score: {}", status.last_score);
    println!("Wallpapers unlocked: {}", status.unlocked);
    Ok(ExitCode::SUCCESS)
}

fn run_onboarding(engine: &Engine, skip: bool) -> Result<ExitCode> {
    let mut flow = engine.onboarding();
    if skip {
        flow.skip();
        println!("Onboarding skipped.");
        return Ok(ExitCode::SUCCESS);
    }
    while let Some(slide) = flow.current() {
        println!("{}", slide.title.bold());
        println!("{}", slide.subtitle);
        println!("[{}]", slide.cta.cyan());
        println!();
        if flow.next() == OnboardingStep::Complete {
            break;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_quiz(engine: &Engine) -> Result<ExitCode> {
    let mut session = engine.quiz_session();
    if let Some(previous) = session.last_classification() {
        println!("Last result: {}", previous.title().bold());
    }
    println!(
        "{} questions, {} seconds each. Type a, b or c then Enter.",
        session.catalog().len(),
        session.config().question_secs
    );
    let mut input = runner::spawn_stdin_lines();
    let mut out = stdout();
    let Some(result) = runner::run_quiz(&mut session, engine.ledger(), &mut input, &mut out).await?
    else {
        return Ok(ExitCode::SUCCESS);
    };

    println!();
    println!("{}", result.classification.title().bright_cyan().bold());
    println!("{}", result.classification.description());
    println!();
    println!("Correct: {}/{}", result.correct(), session.catalog().len());
    if result.raised_max() {
        println!(
            "{}",
            format!("New best! Balls: {}", result.new_max).green().bold()
        );
    } else {
        println!("Balls: {}", result.new_max);
    }
    if !result.persisted {
        eprintln!("{}", "Result could not be saved.".red());
    }
    println!();
    println!("Share:\n{}", result.classification.share_message());
    Ok(ExitCode::SUCCESS)
}

fn run_simulation(
    engine: &Engine,
    picks: &[String],
    random: Option<(u64, usize)>,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let catalog = &engine.catalogs().questions;
    let scripts = match random {
        Some((seed, count)) => {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (0..count)
                .map(|_| random_script(&mut rng, catalog.len()))
                .collect::<Vec<_>>()
        }
        None => picks
            .iter()
            .map(|text| parse_script(text, catalog.len()))
            .collect::<Result<Vec<_>>>()?,
    };

    // Dry run: start from the saved balance but never write back.
    let ledger = RewardLedger::new(MemoryStore::new());
    ledger
        .write(&LedgerPatch::new().max_balls(engine.ledger().read_max_balls()))
        .context("seeding simulation ledger")?;

    let mut records = Vec::with_capacity(scripts.len());
    for (index, script) in scripts.iter().enumerate() {
        let result = run_script(catalog, &engine.config().quiz, &ledger, script)?;
        records.push(SimulationRecord::new(index + 1, script, &result));
    }
    let report = SimulationReport::new(records, ledger.read_max_balls());

    let mut target = OutputTarget::new(output)?;
    write_report(&mut target, &report, format)?;
    target.flush_inner()?;
    Ok(ExitCode::SUCCESS)
}

async fn run_activity(engine: &Engine, seed: Option<u64>) -> Result<ExitCode> {
    let mut timer = engine.activity_timer();
    let mut rng = seed.map_or_else(ChaCha20Rng::from_entropy, ChaCha20Rng::seed_from_u64);
    let mut input = runner::spawn_stdin_lines();
    let mut out = stdout();
    runner::run_activity(&mut timer, engine.ledger(), &mut input, &mut out, &mut rng).await?;
    Ok(ExitCode::SUCCESS)
}

fn list_store(engine: &Engine) -> Result<ExitCode> {
    let shelf = engine.shelf();
    println!("Balls: {}", shelf.balance.to_string().yellow());
    for entry in &shelf.entries {
        let state = if entry.unlocked {
            "unlocked".green()
        } else if entry.affordable {
            format!("{} balls", entry.item.cost).cyan()
        } else {
            format!("{} balls (locked)", entry.item.cost).dimmed()
        };
        println!("  {:<8} {:<14} {}", entry.item.id, entry.item.title, state);
    }
    Ok(ExitCode::SUCCESS)
}

fn buy(engine: &Engine, id: &str) -> Result<ExitCode> {
    match engine.buy(id) {
        Ok(PurchaseOutcome::Unlocked { balance, .. }) => {
            println!("{} Balls left: {balance}", format!("Unlocked {id}!").green().bold());
            Ok(ExitCode::SUCCESS)
        }
        Ok(PurchaseOutcome::AlreadyUnlocked) => {
            println!("{id} is already unlocked.");
            Ok(ExitCode::SUCCESS)
        }
        Err(PurchaseError::Rejected(StoreError::InsufficientFunds { needed, available })) => {
            eprintln!("{}", INSUFFICIENT_FUNDS_MESSAGE.red().bold());
            eprintln!("Need {needed}, have {available}.");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err).context("purchase failed"),
    }
}

fn save(engine: &Engine, id: &str) -> Result<ExitCode> {
    match engine.save_wallpaper(id) {
        Ok(path) => {
            println!("Saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if matches!(err, ExportError::Locked(_)) {
                eprintln!("{id} is locked. Buy it first.");
            }
            eprintln!("{}", err.user_message().red());
            Ok(ExitCode::FAILURE)
        }
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod test_support {
    use std::path::PathBuf;

    pub fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "choicetype-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }
}
