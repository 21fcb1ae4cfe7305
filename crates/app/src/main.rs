use std::fmt;

use chrono::NaiveDate;
use quiz_core::model::{GameRules, PlayerDraft, PlayerProfile};
use quiz_core::progress::AchievementId;
use quiz_core::timer::format_mm_ss;
use services::{AppServices, BackendConfig, Clock};
use tracing_subscriber::EnvFilter;

mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimeLimit { raw: String },
    InvalidDate { raw: String },
    MissingPlayerField { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeLimit { raw } => write!(f, "invalid --time-limit value: {raw}"),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --date value (expected dd-mm-yyyy): {raw}")
            }
            ArgsError::MissingPlayerField { flag } => write!(f, "{flag} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum CliError {
    BackendNotConfigured,
    ResetNotConfirmed,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::BackendNotConfigured => {
                write!(f, "this command needs a backend; set QUIZ_BACKEND_URL")
            }
            CliError::ResetNotConfirmed => write!(
                f,
                "reset deletes every result, stat and achievement; rerun with --yes"
            ),
        }
    }
}

impl std::error::Error for CliError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play        [--db <url>] [--name <n> --city <c> --mobile <m>]");
    eprintln!("                                  [--time-limit <secs>] [--shuffle] [--daily]");
    eprintln!("  cargo run -p app -- stats       [--db <url>]");
    eprintln!("  cargo run -p app -- leaderboard [--db <url>] [--date <dd-mm-yyyy>]");
    eprintln!("  cargo run -p app -- register    [--db <url>] --name <n> --city <c> --mobile <m>");
    eprintln!("  cargo run -p app -- reset       [--db <url>] --yes");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --time-limit 600");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_TIME_LIMIT, QUIZ_BACKEND_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Stats,
    Leaderboard,
    Register,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "stats" => Some(Self::Stats),
            "leaderboard" => Some(Self::Leaderboard),
            "register" => Some(Self::Register),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn accepts(self, flag: &str) -> bool {
        match flag {
            "--db" => true,
            "--name" | "--city" | "--mobile" => matches!(self, Self::Play | Self::Register),
            "--time-limit" | "--shuffle" | "--daily" => self == Self::Play,
            "--date" => self == Self::Leaderboard,
            "--yes" => self == Self::Reset,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
struct PlayerArgs {
    name: Option<String>,
    city: Option<String>,
    mobile: Option<String>,
}

impl PlayerArgs {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.city.is_none() && self.mobile.is_none()
    }

    /// All three fields, validated. Missing flags are reported before validation.
    fn into_profile(self) -> Result<PlayerProfile, Box<dyn std::error::Error>> {
        let name = self
            .name
            .ok_or(ArgsError::MissingPlayerField { flag: "--name" })?;
        let city = self
            .city
            .ok_or(ArgsError::MissingPlayerField { flag: "--city" })?;
        let mobile = self
            .mobile
            .ok_or(ArgsError::MissingPlayerField { flag: "--mobile" })?;
        Ok(PlayerDraft::new(name, city, mobile).validate()?)
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    player: PlayerArgs,
    time_limit_secs: u32,
    shuffle: bool,
    daily: bool,
    date: Option<NaiveDate>,
    confirmed: bool,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut time_limit_secs = std::env::var("QUIZ_TIME_LIMIT")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(GameRules::DEFAULT_TIME_LIMIT_SECS);
        let mut player = PlayerArgs::default();
        let mut shuffle = false;
        let mut daily = false;
        let mut date = None;
        let mut confirmed = false;

        while let Some(arg) = args.next() {
            if matches!(arg.as_str(), "--help" | "-h") {
                print_usage();
                std::process::exit(0);
            }
            if !cmd.accepts(&arg) {
                return Err(ArgsError::UnknownArg(arg));
            }
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--name" => player.name = Some(require_value(args, "--name")?),
                "--city" => player.city = Some(require_value(args, "--city")?),
                "--mobile" => player.mobile = Some(require_value(args, "--mobile")?),
                "--time-limit" => {
                    let value = require_value(args, "--time-limit")?;
                    time_limit_secs = value
                        .parse::<u32>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or(ArgsError::InvalidTimeLimit { raw: value })?;
                }
                "--shuffle" => shuffle = true,
                "--daily" => daily = true,
                "--date" => {
                    let value = require_value(args, "--date")?;
                    let parsed = NaiveDate::parse_from_str(&value, "%d-%m-%Y")
                        .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?;
                    date = Some(parsed);
                }
                "--yes" => confirmed = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            player,
            time_limit_secs,
            shuffle,
            daily,
            date,
            confirmed,
        })
    }

    fn rules(&self) -> GameRules {
        let rules = if self.daily {
            GameRules::daily()
        } else {
            GameRules::default()
        };
        rules.with_time_limit(self.time_limit_secs)
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show_stats(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let state = services.progress().snapshot()?;
    let stats = &state.stats;

    println!("Quizzes played   {}", stats.total_quizzes());
    println!("Average score    {}%", stats.average_score());
    println!("Best score       {}%", stats.best_score());
    println!(
        "Time played      {}",
        format_mm_ss(u32::try_from(stats.total_time_secs()).unwrap_or(u32::MAX))
    );

    println!();
    println!("Achievements");
    for id in AchievementId::ALL {
        let mark = if state.unlocked.contains(id) { "x" } else { " " };
        println!("  [{mark}] {:<22} {}", id.title(), id.description());
    }

    if !state.history.is_empty() {
        println!();
        println!("Recent games");
        for result in state.history.recent(5) {
            println!(
                "  {}  {:>6}  {:>3}%  {}",
                result.date().format("%d-%m-%Y"),
                result.score(),
                result.percentage(),
                result.reason().as_str()
            );
        }
    }
    Ok(())
}

async fn show_leaderboard(
    services: &AppServices,
    date: Option<NaiveDate>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = services.backend().ok_or(CliError::BackendNotConfigured)?;
    let date = date.unwrap_or_else(|| services.clock().now().date_naive());
    let entries = backend.leaderboard(date).await?;

    println!("Leaderboard for {}", date.format("%d-%m-%Y"));
    if entries.is_empty() {
        println!("  no results yet");
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {:<20} {:<12} {:>6}  {:.2}s",
            rank + 1,
            entry.name,
            entry.city,
            entry.score,
            entry.time_duration
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().peekable();
    if iter.peek().is_some_and(|first| !first.starts_with("--")) {
        iter.next();
    }

    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    if cmd == Command::Reset && !parsed.confirmed {
        return Err(CliError::ResetNotConfirmed.into());
    }

    init_tracing();
    tracing::debug!(command = ?cmd, db = %parsed.db_url, "starting");

    // Open + migrate SQLite in the binary glue so services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let clock = Clock::system();
    let backend = BackendConfig::from_env()?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, clock, parsed.rules(), backend).await?;

    match cmd {
        Command::Play => {
            let player = if parsed.player.is_empty() {
                PlayerProfile::anonymous()
            } else {
                parsed.player.into_profile()?
            };
            let game_loop = services
                .game_loop()
                .as_ref()
                .clone()
                .with_shuffle(parsed.shuffle);
            play::play(&game_loop, player).await
        }
        Command::Stats => show_stats(&services),
        Command::Leaderboard => show_leaderboard(&services, parsed.date).await,
        Command::Register => {
            let backend = services.backend().ok_or(CliError::BackendNotConfigured)?;
            let player = parsed.player.into_profile()?;
            backend.register_player(&player, clock.now()).await?;
            println!("Registered {} from {}", player.name(), player.city());
            Ok(())
        }
        Command::Reset => {
            services.progress().reset().await?;
            println!("Progress reset");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
