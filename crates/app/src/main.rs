use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lesson_core::model::{CourseId, LessonId, UserId};
use services::playback::UNLOCK_FLAG_KEY;
use services::{
    CertificateTrigger, Clock, CompletionCheck, HttpCompletionCheck, ModuleGateService,
    NoopCompletionCheck, PlaybackTracker, TrackerConfig, TracingNotifier, completion_channel,
};
use storage::{FlagRepository, ProgressRepository, Storage};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingUser,
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingUser => write!(f, "--user (or LEARN_USER_ID) is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app simulate --user <uuid> --lesson <id> --duration <secs> [--until <secs>] [--tick-ms <ms>]");
    eprintln!("  app drip     --user <uuid> --course <id>");
    eprintln!("  app unlock   --user <uuid> [--off]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: sqlite://dev.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID, LEARN_COMPLETION_THRESHOLD,");
    eprintln!("  LEARN_PERSIST_INTERVAL_SECS, LEARN_CERTIFICATE_URL, LEARN_API_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Simulate,
    Drip,
    Unlock,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "simulate" => Some(Self::Simulate),
            "drip" => Some(Self::Drip),
            "unlock" => Some(Self::Unlock),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    user_id: Option<UserId>,
    lesson_id: LessonId,
    course_id: CourseId,
    duration_secs: u32,
    until_secs: Option<u32>,
    tick_ms: u64,
    unlock: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("LEARN_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url),
            user_id: std::env::var("LEARN_USER_ID")
                .ok()
                .and_then(|value| value.parse::<UserId>().ok()),
            lesson_id: LessonId::new(1),
            course_id: CourseId::new(1),
            duration_secs: 100,
            until_secs: None,
            tick_ms: 0,
            unlock: true,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    let user = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    parsed.user_id = Some(user);
                }
                "--lesson" => parsed.lesson_id = LessonId::new(parse_number(args, "--lesson")?),
                "--course" => parsed.course_id = CourseId::new(parse_number(args, "--course")?),
                "--duration" => parsed.duration_secs = parse_number(args, "--duration")?,
                "--until" => parsed.until_secs = Some(parse_number(args, "--until")?),
                "--tick-ms" => parsed.tick_ms = parse_number(args, "--tick-ms")?,
                "--off" => parsed.unlock = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn user(&self) -> Result<UserId, ArgsError> {
        self.user_id.ok_or(ArgsError::MissingUser)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn simulate(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = args.user()?;
    let config = TrackerConfig::from_env()?;

    let http = HttpCompletionCheck::from_env();
    let checker: Arc<dyn CompletionCheck> = if http.enabled() {
        Arc::new(http)
    } else {
        tracing::info!("LEARN_CERTIFICATE_URL not set; certificate checks disabled");
        Arc::new(NoopCompletionCheck)
    };
    let (tx, rx) = completion_channel();
    let trigger = CertificateTrigger::new(checker, Arc::new(TracingNotifier)).spawn(rx);

    let mut tracker = PlaybackTracker::new(
        config,
        Clock::default_clock(),
        Arc::clone(&storage.progress),
        Arc::clone(&storage.flags),
    )
    .with_completions(tx);
    tracker.initialize(user_id, args.lesson_id).await;

    let duration = f64::from(args.duration_secs);
    let until = args.until_secs.unwrap_or(args.duration_secs).min(args.duration_secs);
    let start = tracker.watched_seconds().min(until);
    for position in start..=until {
        tracker.update_progress(f64::from(position), duration).await;
        if args.tick_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.tick_ms)).await;
        }
    }
    let shown = tracker.display_progress();
    tracker.teardown().await;
    drop(tracker);
    trigger.await?;

    match storage.progress.read_progress(user_id, args.lesson_id).await? {
        Some(record) => println!(
            "lesson {} user {}: watched {}s, completed {}, completed_at {}, shown {}%",
            record.lesson_id(),
            record.user_id(),
            record.watched_seconds(),
            record.is_completed(),
            record
                .completed_at()
                .map_or_else(|| "-".to_owned(), |at| at.to_rfc3339()),
            (shown.display * 100.0).round()
        ),
        None => println!("no progress persisted for lesson {}", args.lesson_id),
    }
    Ok(())
}

async fn drip(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = args.user()?;
    let gate = ModuleGateService::new(
        Clock::default_clock(),
        Arc::clone(&storage.enrollments),
        Arc::clone(&storage.flags),
    );
    let statuses = gate.module_statuses(user_id, args.course_id).await?;
    if statuses.is_empty() {
        println!("course {} has no modules", args.course_id);
    }
    for status in statuses {
        let gate = &status.availability;
        if gate.is_available {
            println!("[open]   {} {}", status.module.id, status.module.title);
        } else {
            println!(
                "[locked] {} {} ({}; {} day(s))",
                status.module.id, status.module.title, gate.message, gate.days_until_available
            );
        }
    }
    Ok(())
}

async fn unlock(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = args.user()?;
    storage
        .flags
        .set_flag(user_id, UNLOCK_FLAG_KEY, args.unlock)
        .await?;
    println!("unlock override for {user_id}: {}", args.unlock);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    // Open + migrate SQLite here so core/services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Simulate => simulate(&storage, &parsed).await,
        Command::Drip => drip(&storage, &parsed).await,
        Command::Unlock => unlock(&storage, &parsed).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
