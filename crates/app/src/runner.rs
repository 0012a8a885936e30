use std::io::{self, BufRead, Write};

use quiz_core::model::{Identity, group_by_topic};
use quiz_core::session::{QuizSession, SessionStateKind};
use rand::Rng;
use services::{AdvanceOutcome, QuizService, QuizServiceError, SubmissionOutcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum RunnerError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Quiz(#[from] QuizServiceError),
}

/// One line of user input while a quiz is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    /// 1-based answer number.
    Choose(usize),
    Next,
    Previous,
    /// 1-based topic number.
    Topic(usize),
    Submit,
    Restart,
    Quit,
    Help,
}

impl Input {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or("");
        let arg = parts.next();
        if parts.next().is_some() {
            return None;
        }

        match (head.to_ascii_lowercase().as_str(), arg) {
            ("" | "n" | "next", None) => Some(Self::Next),
            ("p" | "prev", None) => Some(Self::Previous),
            ("s" | "submit", None) => Some(Self::Submit),
            ("r" | "restart", None) => Some(Self::Restart),
            ("q" | "quit", None) => Some(Self::Quit),
            ("h" | "help" | "?", None) => Some(Self::Help),
            ("t" | "topic", Some(k)) => one_based(k).map(Self::Topic),
            (number, None) => one_based(number).map(Self::Choose),
            _ => None,
        }
    }
}

fn one_based(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|n| *n > 0)
}

const HELP: &str = "\
Commands:
  <number>   select that answer
  n, Enter   next question (on the last one this submits)
  p          previous question
  t <number> jump to the first question of a topic
  s          submit now
  r          take the quiz again (after submitting)
  q          quit";

/// Drive a student through the quiz over `input` and `out`.
///
/// Returns the outcome of the last submission, if any. End of input counts as quitting.
///
/// # Errors
///
/// Returns `RunnerError` on I/O failures and on service errors other than
/// rejected session transitions, which are reported to the user instead.
pub(crate) async fn take_quiz<R, W, G>(
    quiz: &QuizService,
    identity: &Identity,
    rng: &mut G,
    input: &mut R,
    out: &mut W,
) -> Result<Option<SubmissionOutcome>, RunnerError>
where
    R: BufRead,
    W: Write,
    G: Rng + ?Sized,
{
    let mut session = quiz.load_session().await?;
    if session.total_questions() == 0 {
        writeln!(out, "No questions are available yet.")?;
        return Ok(None);
    }

    quiz.start_with_rng(identity, &mut session, rng)?;
    writeln!(out, "{}, welcome to {}.", identity.name, quiz.exam_title())?;
    print_topics(&session, out)?;
    writeln!(out, "Type h for help.")?;

    let mut last = None;
    loop {
        match session.state() {
            SessionStateKind::InProgress => print_question(&session, out)?,
            SessionStateKind::Completed => writeln!(out, "Enter r to retake or q to quit.")?,
            SessionStateKind::NotStarted => {}
        }
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = read_line(input)? else {
            break;
        };
        let Some(command) = Input::parse(&line) else {
            writeln!(out, "Unrecognized command {:?}; type h for help.", line.trim())?;
            continue;
        };

        match command {
            Input::Choose(number) => choose(&mut session, number, out)?,
            Input::Next => match quiz.advance(identity, &mut session).await {
                Ok(AdvanceOutcome::Moved(_)) => {}
                Ok(AdvanceOutcome::Completed(outcome)) => {
                    print_outcome(&outcome, out)?;
                    last = Some(outcome);
                }
                Err(QuizServiceError::Session(err)) => writeln!(out, "{err}")?,
                Err(err) => return Err(err.into()),
            },
            Input::Previous => {
                if session.state() == SessionStateKind::InProgress && session.is_first_position()
                {
                    writeln!(out, "Already at the first question.")?;
                } else if let Err(err) = session.retreat() {
                    writeln!(out, "{err}")?;
                }
            }
            Input::Topic(number) => {
                if let Err(err) = session.jump_to_topic(number - 1) {
                    writeln!(out, "{err}")?;
                }
            }
            Input::Submit => match quiz.submit(identity, &mut session).await {
                Ok(outcome) => {
                    print_outcome(&outcome, out)?;
                    last = Some(outcome);
                }
                Err(QuizServiceError::Session(err)) => writeln!(out, "{err}")?,
                Err(err) => return Err(err.into()),
            },
            Input::Restart => {
                if session.state() == SessionStateKind::Completed {
                    session.reset();
                    quiz.start_with_rng(identity, &mut session, rng)?;
                    print_topics(&session, out)?;
                } else {
                    writeln!(out, "Submit the quiz before starting over.")?;
                }
            }
            Input::Quit => break,
            Input::Help => writeln!(out, "{HELP}")?,
        }
    }

    Ok(last)
}

/// Print the whole question bank grouped by topic, marking correct answers.
///
/// # Errors
///
/// Returns `RunnerError` when the bank cannot be loaded or written.
pub(crate) async fn browse_bank<W: Write>(
    quiz: &QuizService,
    out: &mut W,
) -> Result<(), RunnerError> {
    let session = quiz.load_session().await?;
    let buckets = group_by_topic(session.questions());
    if buckets.is_empty() {
        writeln!(out, "The question bank is empty.")?;
        return Ok(());
    }

    writeln!(
        out,
        "Question bank: {} questions in {} topics (professors cannot take the quiz).",
        session.total_questions(),
        buckets.len()
    )?;
    for bucket in &buckets {
        writeln!(out)?;
        writeln!(out, "== {} ==", bucket.name())?;
        for question in bucket.questions() {
            writeln!(out, "[{}] {}", question.id(), question.text())?;
            for answer in question.answers() {
                let mark = if answer.is_correct { "+" } else { " " };
                writeln!(out, "   {mark} {}", answer.text)?;
            }
        }
    }
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn choose<W: Write>(session: &mut QuizSession, number: usize, out: &mut W) -> io::Result<()> {
    let picked = session
        .current_question()
        .and_then(|q| q.answers().get(number - 1).map(|a| (q.id(), a.id)));
    match picked {
        Some((question, answer)) => {
            if let Err(err) = session.select_answer(question, answer) {
                writeln!(out, "{err}")?;
            }
        }
        None if session.state() == SessionStateKind::InProgress => {
            writeln!(out, "There is no answer {number}.")?;
        }
        None => writeln!(out, "The quiz is not in progress.")?,
    }
    Ok(())
}

fn print_topics<W: Write>(session: &QuizSession, out: &mut W) -> io::Result<()> {
    writeln!(out, "Topics:")?;
    for (index, topic) in session.topics().iter().enumerate() {
        writeln!(out, "  {}. {} ({} questions)", index + 1, topic.name(), topic.len())?;
    }
    Ok(())
}

fn print_question<W: Write>(session: &QuizSession, out: &mut W) -> io::Result<()> {
    let (Some(cursor), Some(topic), Some(question), Some(progress)) = (
        session.cursor(),
        session.current_topic(),
        session.current_question(),
        session.progress(),
    ) else {
        return Ok(());
    };
    let selected = session.selection_for(question.id());

    writeln!(out)?;
    writeln!(
        out,
        "[{}/{}] {} - question {}/{} ({} of {} answered)",
        cursor.topic_index + 1,
        progress.topic_count,
        topic.name(),
        cursor.question_index + 1,
        topic.len(),
        progress.answered,
        progress.total
    )?;
    writeln!(out, "{}", question.text())?;
    for (index, answer) in question.answers().iter().enumerate() {
        let mark = if selected == Some(answer.id) { "*" } else { " " };
        writeln!(out, " {mark} {}) {}", index + 1, answer.text)?;
    }
    if session.is_last_position() {
        writeln!(out, "(last question: n submits)")?;
    }
    Ok(())
}

fn print_outcome<W: Write>(outcome: &SubmissionOutcome, out: &mut W) -> io::Result<()> {
    let report = &outcome.report;
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}/{} ({:.1}%), {} incorrect or unanswered.",
        report.correct_count(),
        report.total_count(),
        report.percentage(),
        report.incorrect_count()
    )?;
    match &outcome.warning {
        Some(warning) => writeln!(out, "Warning: {warning}")?,
        None => writeln!(out, "Result saved.")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use quiz_core::model::{
        Answer, AnswerId, ExamResult, Question, QuestionId, UserId, UserProfile, UserRole,
    };
    use quiz_core::time::{fixed_clock, fixed_now};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::{
        ExamResultRepository, InMemoryRepository, QuestionRepository, UserRepository,
    };

    const STUDENT: u64 = 2;

    async fn setup() -> (InMemoryRepository, QuizService) {
        let repo = InMemoryRepository::new();
        // One topic with a single question keeps the shuffled order fixed.
        let question = Question::new(
            QuestionId::new(1),
            "Which structure holds process state?",
            Some("Processes".into()),
            vec![
                Answer::wrong(AnswerId::new(10), "Page table"),
                Answer::correct(AnswerId::new(11), "Process control block"),
            ],
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();
        repo.upsert_user(&UserProfile {
            user_id: UserId::new(STUDENT),
            name: "Ana".into(),
            role: UserRole::Student,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
        let service = QuizService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()));
        (repo, service)
    }

    async fn run(service: &QuizService, script: &str) -> (Option<SubmissionOutcome>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let outcome = take_quiz(
            service,
            &Identity::student(UserId::new(STUDENT), "Ana"),
            &mut StdRng::seed_from_u64(42),
            &mut input,
            &mut out,
        )
        .await
        .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    async fn stored(repo: &InMemoryRepository) -> Vec<ExamResult> {
        repo.list_results_for_student(UserId::new(STUDENT), 10)
            .await
            .unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("2\n"), Some(Input::Choose(2)));
        assert_eq!(Input::parse(""), Some(Input::Next));
        assert_eq!(Input::parse(" N "), Some(Input::Next));
        assert_eq!(Input::parse("t 3"), Some(Input::Topic(3)));
        assert_eq!(Input::parse("s"), Some(Input::Submit));
        assert_eq!(Input::parse("0"), None);
        assert_eq!(Input::parse("t"), None);
        assert_eq!(Input::parse("t 1 2"), None);
        assert_eq!(Input::parse("jump"), None);
    }

    #[tokio::test]
    async fn answering_and_advancing_past_the_end_records_score() {
        let (repo, service) = setup().await;

        let (outcome, output) = run(&service, "2\nn\nq\n").await;

        let outcome = outcome.unwrap();
        assert_eq!(outcome.report.correct_count(), 1);
        assert!(outcome.is_persisted());
        assert!(output.contains("Score: 1/1 (100.0%)"));
        assert!(output.contains(" * 2) Process control block"));
        assert_eq!(stored(&repo).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_moves_are_reported_and_session_continues() {
        let (repo, service) = setup().await;

        let (outcome, output) = run(&service, "p\n9\nt 4\nbogus\ns\n").await;

        assert!(output.contains("Already at the first question."));
        assert!(output.contains("There is no answer 9."));
        assert!(output.contains("topic index 3 is out of range"));
        assert!(output.contains("Unrecognized command \"bogus\""));
        assert_eq!(outcome.unwrap().report.correct_count(), 0);
        assert_eq!(stored(&repo).await.len(), 1);
    }

    #[tokio::test]
    async fn restart_starts_a_fresh_attempt() {
        let (repo, service) = setup().await;

        let (outcome, output) = run(&service, "r\n2\ns\nr\ns\n").await;

        assert!(output.contains("Submit the quiz before starting over."));
        assert_eq!(outcome.unwrap().report.correct_count(), 0);
        let scores: Vec<u32> = stored(&repo).await.iter().map(ExamResult::score).collect();
        assert_eq!(scores.len(), 2);
        assert!(scores.contains(&1));
    }

    #[tokio::test]
    async fn failed_save_is_a_warning() {
        let (repo, service) = setup().await;
        repo.set_fail_result_writes(true);

        let (outcome, output) = run(&service, "s\n").await;

        assert!(!outcome.unwrap().is_persisted());
        assert!(output.contains("Warning: score could not be saved"));
    }

    #[tokio::test]
    async fn empty_bank_ends_immediately() {
        let repo = InMemoryRepository::new();
        let service = QuizService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo));

        let (outcome, output) = run(&service, "").await;

        assert!(outcome.is_none());
        assert!(output.contains("No questions are available yet."));
    }

    #[tokio::test]
    async fn browse_marks_correct_answers() {
        let (_repo, service) = setup().await;
        let mut out = Vec::new();

        browse_bank(&service, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("== Processes =="));
        assert!(output.contains("   + Process control block"));
        assert!(output.contains("     Page table"));
    }
}
