use std::fmt;

use chrono::{DateTime, Utc};
use lesson_core::model::{CourseId, CourseModule, Enrollment, ModuleId, UserId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    course_id: CourseId,
    modules: u32,
    drip_step_days: u32,
    enrolled_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidCourseId { raw: String },
    InvalidModules { raw: String },
    InvalidDripStep { raw: String },
    InvalidDbUrl { raw: String },
    InvalidEnrolledAt { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw}"),
            ArgsError::InvalidModules { raw } => write!(f, "invalid --modules value: {raw}"),
            ArgsError::InvalidDripStep { raw } => write!(f, "invalid --drip-step value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidEnrolledAt { raw } => {
                write!(f, "invalid --enrolled-at value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LEARN_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user_id = std::env::var("LEARN_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(UserId::random);
        let mut course_id = CourseId::new(1);
        let mut modules = 4_u32;
        let mut drip_step_days = 7_u32;
        let mut enrolled_at: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--course" => {
                    let value = require_value(&mut args, "--course")?;
                    course_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                }
                "--modules" => {
                    let value = require_value(&mut args, "--modules")?;
                    modules = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidModules { raw: value.clone() })?;
                }
                "--drip-step" => {
                    let value = require_value(&mut args, "--drip-step")?;
                    drip_step_days = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDripStep { raw: value.clone() })?;
                }
                "--enrolled-at" => {
                    let value = require_value(&mut args, "--enrolled-at")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidEnrolledAt { raw: value.clone() })?
                        .with_timezone(&Utc);
                    enrolled_at = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            course_id,
            modules,
            drip_step_days,
            enrolled_at,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --user <uuid>             Student to enroll (default: random)");
    eprintln!("  --course <id>             Course id (default: 1)");
    eprintln!("  --modules <n>             Number of modules to upsert (default: 4)");
    eprintln!("  --drip-step <days>        Drip offset added per module (default: 7)");
    eprintln!("  --enrolled-at <rfc3339>   Enrollment time (default: now)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let enrolled_at = args.enrolled_at.unwrap_or_else(Utc::now);

    for i in 0..args.modules {
        let module = CourseModule::new(
            ModuleId::new(
                args.course_id
                    .value()
                    .saturating_mul(1_000)
                    .saturating_add(u64::from(i) + 1),
            ),
            args.course_id,
            format!("Module {}", i + 1),
            i,
            i.saturating_mul(args.drip_step_days),
        );
        storage.enrollments.upsert_module(&module).await?;
    }

    storage
        .enrollments
        .upsert_enrollment(&Enrollment::new(args.user_id, args.course_id, enrolled_at))
        .await?;

    println!(
        "Seeded course {} with {} modules and enrolled user {} at {} into {}",
        args.course_id,
        args.modules,
        args.user_id,
        enrolled_at.to_rfc3339(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
