use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use learn_core::model::{LessonId, QuizId};
use services::{
    AdvanceOutcome, Clock, FEEDBACK_DELAY, LearningContext, QuizConfig, QuizRun, QuizState,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

const DEFAULT_DB_PATH: &str = "learn.sqlite3";
const SAMPLE_QUIZ_ID: &str = "sample-quiz";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidFeedbackMs { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLessonId { raw: String },
    MissingLessons,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidFeedbackMs { raw } => {
                write!(f, "invalid --feedback-ms value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid lesson id: {raw:?}"),
            ArgsError::MissingLessons => write!(f, "complete requires at least one lesson id"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- quiz      [--db <sqlite_url>] [--feedback-ms <n>]");
    eprintln!("  cargo run -p app -- complete  <lesson-id>... [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- dashboard [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:{DEFAULT_DB_PATH}");
    eprintln!("  --feedback-ms {}", FEEDBACK_DELAY.as_millis());
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_FEEDBACK_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Complete,
    Dashboard,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "complete" => Some(Self::Complete),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db: DbTarget,
    feedback_delay: Duration,
    lessons: Vec<LessonId>,
}

impl Args {
    fn defaults(env: impl Fn(&str) -> Option<String>) -> Self {
        let db = env("LEARN_DB_URL")
            .and_then(|raw| DbTarget::parse(&raw).ok())
            .unwrap_or_else(DbTarget::default_file);
        let feedback_delay = env("LEARN_FEEDBACK_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map_or(FEEDBACK_DELAY, Duration::from_millis);
        Self {
            db,
            feedback_delay,
            lessons: Vec::new(),
        }
    }

    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::defaults(env);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    parsed.db = DbTarget::parse(&value)?;
                }
                "--feedback-ms" => {
                    let value = require_value(args, "--feedback-ms")?;
                    let millis: u64 = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidFeedbackMs { raw: value.clone() })?;
                    parsed.feedback_delay = Duration::from_millis(millis);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Complete && !arg.starts_with("--") => {
                    let lesson = arg
                        .parse::<LessonId>()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: arg.clone() })?;
                    parsed.lessons.push(lesson);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Complete && parsed.lessons.is_empty() {
            return Err(ArgsError::MissingLessons);
        }
        Ok(parsed)
    }
}

/// Where progress is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DbTarget {
    /// Nothing survives the process.
    Memory,
    /// An absolute path to a `SQLite` file, created on first use.
    File(PathBuf),
}

impl DbTarget {
    fn default_file() -> Self {
        Self::File(absolute(Path::new(DEFAULT_DB_PATH)))
    }

    /// Accepts `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare path.
    fn parse(raw: &str) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if matches!(trimmed, "sqlite::memory:" | ":memory:") {
            return Ok(Self::Memory);
        }
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);
        if path.is_empty() {
            return Err(ArgsError::InvalidDbUrl {
                raw: raw.to_string(),
            });
        }
        Ok(Self::File(absolute(Path::new(path))))
    }

    fn url(&self) -> String {
        match self {
            DbTarget::Memory => "sqlite::memory:".to_string(),
            DbTarget::File(path) => format!("sqlite://{}", path.display()),
        }
    }

    /// Create the database file and its directory; the driver only opens
    /// existing files.
    fn prepare(&self) -> std::io::Result<()> {
        let DbTarget::File(path) = self else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(())
    }
}

impl fmt::Display for DbTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbTarget::Memory => f.write_str("in-memory"),
            DbTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

async fn build_context(args: &Args) -> Result<LearningContext, Box<dyn std::error::Error>> {
    let clock = Clock::system();
    let config = QuizConfig {
        feedback_delay: args.feedback_delay,
    };

    info!(db = %args.db, "opening progress storage");
    match &args.db {
        // Each pooled connection would get its own private in-memory database.
        DbTarget::Memory => {
            let ctx = LearningContext::in_memory(clock).await?;
            Ok(ctx.with_quiz_loop(services::QuizLoopService::new(config)))
        }
        DbTarget::File(_) => {
            args.db.prepare()?;
            Ok(LearningContext::sqlite(&args.db.url(), clock, config).await?)
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn run_complete(ctx: &mut LearningContext, lessons: Vec<LessonId>) {
    for lesson in lessons {
        println!("✅ Completed {lesson}");
        for notice in ctx.complete_lesson(lesson).await {
            println!("🏆 Achievement unlocked: {} ({})", notice.title, notice.description);
        }
    }
    println!(
        "Lessons completed: {}",
        ctx.progress().record().completed_lesson_count()
    );
}

fn run_dashboard(ctx: &LearningContext) {
    let record = ctx.progress().record();
    println!("Lessons completed: {}", record.completed_lesson_count());
    for (id, lesson) in record.lessons() {
        if lesson.completed {
            println!("  {id}  {}", lesson.completed_at.format("%Y-%m-%d %H:%M"));
        }
    }

    println!("Quiz scores:");
    if record.quizzes().is_empty() {
        println!("  (none yet)");
    }
    for (id, quiz) in record.quizzes() {
        println!("  {id}  {}%", quiz.score);
    }

    println!("Achievements:");
    for badge in ctx.gallery() {
        let mark = if badge.unlocked { "✔" } else { " " };
        println!(
            "  [{mark}] {} {}: {}",
            badge.icon, badge.title, badge.description
        );
    }
}

type InputLines = Lines<BufReader<Stdin>>;

/// Prompt until the learner enters an option number; `None` on end of input.
async fn read_choice(
    input: &mut InputLines,
    options: usize,
) -> Result<Option<usize>, std::io::Error> {
    loop {
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=options).contains(&choice) => return Ok(Some(choice - 1)),
            _ => println!("Enter a number between 1 and {options}:"),
        }
    }
}

async fn run_quiz(ctx: &mut LearningContext) -> Result<(), Box<dyn std::error::Error>> {
    let quiz_id = QuizId::new(SAMPLE_QUIZ_ID);
    let Some(mut run) = ctx.start_quiz(&quiz_id) else {
        return Err(format!("unknown quiz: {quiz_id}").into());
    };
    println!("📝 {}", run.session().title());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while run.session().state() == QuizState::AwaitingAnswer {
        if !ask_current(ctx, &mut run, &mut input).await? {
            debug!("input closed, abandoning quiz run");
            return Ok(());
        }
    }

    if let Some(outcome) = run.outcome() {
        let verdict = outcome.result.verdict();
        println!(
            "{} {}/{} ({}%) {}",
            verdict.emoji(),
            outcome.result.score,
            outcome.result.total,
            outcome.result.percentage,
            verdict.message()
        );
        if !outcome.persisted {
            println!("(score could not be saved)");
        }
    }
    Ok(())
}

/// Ask one question and wait out its feedback. Returns `false` if input ended.
async fn ask_current(
    ctx: &mut LearningContext,
    run: &mut QuizRun,
    input: &mut InputLines,
) -> Result<bool, Box<dyn std::error::Error>> {
    let Some(question) = run.session().current_question() else {
        return Ok(true);
    };
    let progress = run.session().progress();
    println!();
    println!(
        "Question {}/{}: {}",
        progress.answered + 1,
        progress.total,
        question.prompt()
    );
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
    let options = question.options().len();

    let Some(choice) = read_choice(input, options).await? else {
        return Ok(false);
    };
    let feedback = ctx.select_answer(run, choice)?;
    if feedback.was_correct {
        println!("✅ Correct! {}", feedback.explanation);
    } else {
        println!(
            "❌ Not quite. The answer was {}. {}",
            feedback.correct_index + 1,
            feedback.explanation
        );
    }

    while let Some(event) = run.next_event().await {
        match ctx.handle_quiz_event(run, event).await? {
            AdvanceOutcome::Ignored => continue,
            AdvanceOutcome::NextQuestion | AdvanceOutcome::Completed(_) => break,
        }
    }
    Ok(true)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut iter = argv.into_iter();

    let cmd = match iter.next().as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut ctx = build_context(&parsed).await?;
    match cmd {
        Command::Quiz => run_quiz(&mut ctx).await,
        Command::Complete => {
            run_complete(&mut ctx, parsed.lessons).await;
            Ok(())
        }
        Command::Dashboard => {
            run_dashboard(&ctx);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter, no_env)
    }

    #[test]
    fn defaults_apply_without_flags() {
        let args = parse(Command::Dashboard, &[]).unwrap();
        assert_eq!(args.db, DbTarget::default_file());
        assert_eq!(args.feedback_delay, FEEDBACK_DELAY);
    }

    #[test]
    fn environment_overrides_defaults() {
        let env = |key: &str| match key {
            "LEARN_DB_URL" => Some("sqlite::memory:".to_string()),
            "LEARN_FEEDBACK_MS" => Some("250".to_string()),
            _ => None,
        };
        let args = Args::parse(Command::Quiz, &mut std::iter::empty(), env).unwrap();
        assert_eq!(args.db, DbTarget::Memory);
        assert_eq!(args.feedback_delay, Duration::from_millis(250));
    }

    #[test]
    fn complete_collects_lesson_ids() {
        let args = parse(
            Command::Complete,
            &["intro", "--db", "sqlite::memory:", "variables"],
        )
        .unwrap();
        assert_eq!(
            args.lessons,
            vec![LessonId::new("intro"), LessonId::new("variables")]
        );
        assert!(matches!(
            parse(Command::Complete, &[]),
            Err(ArgsError::MissingLessons)
        ));
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(matches!(
            parse(Command::Quiz, &["--feedback-ms", "soon"]),
            Err(ArgsError::InvalidFeedbackMs { .. })
        ));
        assert!(matches!(
            parse(Command::Quiz, &["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(Command::Quiz, &["intro"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn db_targets_resolve_to_absolute_files() {
        let target = DbTarget::parse("sqlite:data/learn.db").unwrap();
        let url = target.url();
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/learn.db"));

        assert_eq!(
            DbTarget::parse("sqlite:///tmp/learn.db").unwrap(),
            DbTarget::File(PathBuf::from("/tmp/learn.db"))
        );
        assert_eq!(
            DbTarget::parse("/tmp/learn.db").unwrap().url(),
            "sqlite:///tmp/learn.db"
        );
        assert_eq!(DbTarget::parse(" sqlite::memory: ").unwrap(), DbTarget::Memory);
        assert_eq!(DbTarget::Memory.url(), "sqlite::memory:");
        assert!(matches!(
            DbTarget::parse("sqlite:"),
            Err(ArgsError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn invalid_db_in_environment_falls_back_to_default() {
        let env = |key: &str| (key == "LEARN_DB_URL").then(|| "  ".to_string());
        let args = Args::parse(Command::Dashboard, &mut std::iter::empty(), env).unwrap();
        assert_eq!(args.db, DbTarget::default_file());
    }
}
