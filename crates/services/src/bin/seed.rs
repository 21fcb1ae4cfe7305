use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::fixtures::sample_questions;
use quiz_core::model::{FinishReason, PlayerProfile, QuizResult, ResultError, SessionId};
use quiz_core::progress::AchievementId;
use services::ProgressService;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    results: u32,
    player: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidResults { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidResults { raw } => write!(f, "invalid --results value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
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
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut results = std::env::var("QUIZ_SEED_RESULTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut player = std::env::var("QUIZ_SEED_PLAYER").unwrap_or_else(|_| "Demo".into());
        let mut now: Option<DateTime<Utc>> = None;

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
                "--results" => {
                    let value = require_value(&mut args, "--results")?;
                    results = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidResults { raw: value.clone() })?;
                }
                "--player" => {
                    player = require_value(&mut args, "--player")?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
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
            results,
            player,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p services --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --results <n>             Number of demo results to record (default: 3)");
    eprintln!("  --player <name>           Player name on demo results (default: Demo)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED_RESULTS, QUIZ_SEED_PLAYER");
}

/// A finished demo game, `index` days before `now`, with a rotating number of
/// correct answers.
fn demo_result(
    player: &str,
    index: u32,
    count: u32,
    total: u32,
    now: DateTime<Utc>,
) -> Result<QuizResult, ResultError> {
    let total = total.max(1);
    let started_at = now - Duration::days(i64::from(count - index)) - Duration::minutes(10);
    let finished_at = started_at + Duration::seconds(45 + i64::from(index) * 15);
    let correct = (index % total) + 1;
    let reason = if correct == total {
        FinishReason::Completed
    } else {
        FinishReason::WrongAnswer
    };

    QuizResult::from_persisted(
        SessionId::generate(),
        PlayerProfile::from_persisted(player.to_owned(), "Pune".into(), "9876543210".into()),
        u64::from(correct) * 5000,
        total,
        u64::from(total) * 5000,
        started_at,
        finished_at,
        reason,
    )
}

/// Record `count` demo results through the progress store.
async fn seed_results(
    progress: &ProgressService,
    player: &str,
    count: u32,
    total: u32,
    now: DateTime<Utc>,
) -> Result<Vec<AchievementId>, Box<dyn std::error::Error>> {
    let mut unlocked = Vec::new();
    for index in 0..count {
        let result = demo_result(player, index, count, total, now)?;
        unlocked.extend(progress.record(result).await?.newly_unlocked);
    }
    Ok(unlocked)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let questions = sample_questions()?;
    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }

    let progress = ProgressService::new(storage.progress.clone(), storage.results.clone());
    let existing = progress.load().await?.stats.total_quizzes();

    let total = u32::try_from(questions.len())?;
    let unlocked = seed_results(&progress, &args.player, args.results, total, now).await?;

    println!(
        "Seeded {} questions and {} results on top of {} ({} achievements newly unlocked) into {}",
        questions.len(),
        args.results,
        existing,
        unlocked.len(),
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
