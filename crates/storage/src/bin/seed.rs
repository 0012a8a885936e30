use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{Answer, AnswerId, Question, QuestionId, UserId, UserProfile, UserRole};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    professor_id: UserId,
    student_id: UserId,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_user_id(flag: &'static str, raw: String) -> Result<UserId, ArgsError> {
    raw.parse::<UserId>()
        .map_err(|_| ArgsError::InvalidUserId { flag, raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3?mode=rwc".into());
        let mut professor_id = UserId::new(1);
        let mut student_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or(UserId::new(2));
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
                "--professor-id" => {
                    let value = require_value(&mut args, "--professor-id")?;
                    professor_id = parse_user_id("--professor-id", value)?;
                }
                "--student-id" => {
                    let value = require_value(&mut args, "--student-id")?;
                    student_id = parse_user_id("--student-id", value)?;
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
            professor_id,
            student_id,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3?mode=rwc)");
    eprintln!("  --professor-id <id>       Professor account id (default: 1)");
    eprintln!("  --student-id <id>         Student account id (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID (student id)");
}

/// Sample operating-systems bank: `(topic, question, [(answer, correct)])`.
const SAMPLE_BANK: &[(Option<&str>, &str, &[(&str, bool)])] = &[
    (
        Some("CPU Scheduling"),
        "Which algorithm can starve long-running processes?",
        &[
            ("Shortest Job First", true),
            ("Round Robin", false),
            ("First Come First Served", false),
        ],
    ),
    (
        Some("CPU Scheduling"),
        "What does the time quantum bound in Round Robin?",
        &[
            ("How long a process runs before preemption", true),
            ("The number of processes in the ready queue", false),
            ("The size of a page frame", false),
        ],
    ),
    (
        Some("Memory Management"),
        "What maps virtual pages to physical frames?",
        &[
            ("The page table", true),
            ("The process control block", false),
            ("The file allocation table", false),
        ],
    ),
    (
        Some("Memory Management"),
        "Which problem does paging eliminate?",
        &[
            ("External fragmentation", true),
            ("Internal fragmentation", false),
            ("Deadlock", false),
        ],
    ),
    (
        Some("Concurrency"),
        "Which condition is NOT required for deadlock?",
        &[
            ("Preemption", true),
            ("Mutual exclusion", false),
            ("Hold and wait", false),
            ("Circular wait", false),
        ],
    ),
    (
        None,
        "What is the kernel's main responsibility?",
        &[
            ("Managing hardware resources for processes", true),
            ("Compiling user programs", false),
            ("Rendering the desktop", false),
        ],
    ),
];

fn sample_questions() -> Result<Vec<Question>, quiz_core::model::QuestionError> {
    let mut out = Vec::with_capacity(SAMPLE_BANK.len());
    let mut next_answer = 1_u64;
    for (index, (topic, text, answers)) in SAMPLE_BANK.iter().enumerate() {
        let answers = answers
            .iter()
            .map(|(answer, correct)| {
                let id = AnswerId::new(next_answer);
                next_answer += 1;
                Answer::new(id, *answer, *correct)
            })
            .collect();
        out.push(Question::new(
            QuestionId::new(index as u64 + 1),
            *text,
            topic.map(str::to_owned),
            answers,
        )?);
    }
    Ok(out)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    storage
        .users
        .upsert_user(&UserProfile {
            user_id: args.professor_id,
            name: "Professor".into(),
            role: UserRole::Professor,
            created_at: now,
        })
        .await?;
    storage
        .users
        .upsert_user(&UserProfile {
            user_id: args.student_id,
            name: "Student".into(),
            role: UserRole::Student,
            created_at: now,
        })
        .await?;

    let questions = sample_questions()?;
    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }

    println!(
        "Seeded professor {} and student {} with {} questions into {}",
        args.professor_id,
        args.student_id,
        questions.len(),
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
