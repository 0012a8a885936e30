use std::fmt;

use quiz_core::model::{UserId, UserRole};
use services::ai::MAX_GENERATED_QUESTIONS;

pub(crate) const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub(crate) const DEFAULT_USER_ID: u64 = 2;
pub(crate) const DEFAULT_RESULT_LIMIT: u32 = 10;
pub(crate) const DEFAULT_PRACTICE_COUNT: usize = 3;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidRole { raw: String },
    MissingTopic,
    MissingName,
    ConflictingActions,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidRole { raw } => {
                write!(f, "invalid --role value: {raw} (expected student or professor)")
            }
            ArgsError::MissingTopic => write!(f, "practice requires --topic"),
            ArgsError::MissingName => write!(f, "--edit requires --name"),
            ArgsError::ConflictingActions => {
                write!(f, "use only one of --add, --edit and --delete")
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

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Take,
    Results,
    Practice,
    Students,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "results" => Some(Self::Results),
            "practice" => Some(Self::Practice),
            "students" => Some(Self::Students),
            "help" | "--help" | "-h" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Account change requested through `quiz students`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum StudentAction {
    #[default]
    List,
    Add {
        name: String,
        role: UserRole,
    },
    Edit {
        id: UserId,
        name: String,
        role: Option<UserRole>,
    },
    Delete(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Args {
    pub command: Command,
    pub db_url: String,
    pub user_id: UserId,
    pub exam_title: Option<String>,
    pub limit: u32,
    pub topic: Option<String>,
    pub count: usize,
    pub students: StudentAction,
}

impl Args {
    /// Parse `argv` (without the program name), reading defaults through `env`.
    pub(crate) fn parse<I, F>(argv: I, env: F) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = argv.into_iter().peekable();

        // No subcommand means take the quiz.
        let command = match args.next_if(|first| !first.starts_with("--")) {
            Some(first) => Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
            None => Command::Take,
        };

        let mut db_url = env("QUIZ_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut user_id = match env("QUIZ_USER_ID") {
            Some(raw) => raw
                .parse::<UserId>()
                .map_err(|_| ArgsError::InvalidUserId { raw })?,
            None => UserId::new(DEFAULT_USER_ID),
        };
        let mut exam_title = env("QUIZ_EXAM_TITLE").filter(|t| !t.trim().is_empty());
        let mut limit = DEFAULT_RESULT_LIMIT;
        let mut topic: Option<String> = None;
        let mut count = DEFAULT_PRACTICE_COUNT;
        let mut add: Option<String> = None;
        let mut edit: Option<UserId> = None;
        let mut delete: Option<UserId> = None;
        let mut name: Option<String> = None;
        let mut role: Option<UserRole> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value })?;
                }
                "--title" => {
                    exam_title = Some(require_value(&mut args, "--title")?);
                }
                "--limit" => {
                    limit = parse_number("--limit", require_value(&mut args, "--limit")?)?;
                }
                "--topic" => {
                    topic = Some(require_value(&mut args, "--topic")?);
                }
                "--count" => {
                    count = parse_number("--count", require_value(&mut args, "--count")?)?;
                    if count == 0 || count > MAX_GENERATED_QUESTIONS {
                        return Err(ArgsError::InvalidNumber {
                            flag: "--count",
                            raw: count.to_string(),
                        });
                    }
                }
                "--add" => {
                    add = Some(require_value(&mut args, "--add")?);
                }
                "--edit" => {
                    edit = Some(parse_number("--edit", require_value(&mut args, "--edit")?)?);
                }
                "--delete" => {
                    delete = Some(parse_number(
                        "--delete",
                        require_value(&mut args, "--delete")?,
                    )?);
                }
                "--name" => {
                    name = Some(require_value(&mut args, "--name")?);
                }
                "--role" => {
                    let value = require_value(&mut args, "--role")?;
                    role = Some(
                        value
                            .parse::<UserRole>()
                            .map_err(|_| ArgsError::InvalidRole { raw: value })?,
                    );
                }
                "--help" | "-h" => {
                    return Ok(Self {
                        command: Command::Help,
                        db_url,
                        user_id,
                        exam_title,
                        limit,
                        topic,
                        count,
                        students: StudentAction::List,
                    });
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Practice && topic.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ArgsError::MissingTopic);
        }

        let students = match (add, edit, delete) {
            (None, None, None) => StudentAction::List,
            (Some(name), None, None) => StudentAction::Add {
                name,
                role: role.unwrap_or(UserRole::Student),
            },
            (None, Some(id), None) => StudentAction::Edit {
                id,
                name: name.ok_or(ArgsError::MissingName)?,
                role,
            },
            (None, None, Some(id)) => StudentAction::Delete(id),
            _ => return Err(ArgsError::ConflictingActions),
        };

        Ok(Self {
            command,
            db_url,
            user_id,
            exam_title,
            limit,
            topic,
            count,
            students,
        })
    }
}

pub(crate) fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [take]    [--db <sqlite_url>] [--user <id>] [--title <exam title>]");
    eprintln!("  quiz results   [--db <sqlite_url>] [--user <id>] [--limit <n>]");
    eprintln!("  quiz practice  --topic <topic> [--count <n>] [--user <id>]");
    eprintln!("  quiz students  [--add <name> [--role <role>]] [--user <professor id>]");
    eprintln!("  quiz students  --edit <id> --name <name> [--role <role>]");
    eprintln!("  quiz students  --delete <id>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --user {DEFAULT_USER_ID}");
    eprintln!("  --limit {DEFAULT_RESULT_LIMIT}");
    eprintln!("  --count {DEFAULT_PRACTICE_COUNT} (at most {MAX_GENERATED_QUESTIONS})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_EXAM_TITLE");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_MODEL, QUIZ_AI_BASE_URL (practice)");
    eprintln!("  RUST_LOG (log filter, logs go to stderr)");
}

pub(crate) fn normalize_sqlite_url(raw: String) -> String {
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

/// Make sure the database file and its directory exist before connecting.
pub(crate) fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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
