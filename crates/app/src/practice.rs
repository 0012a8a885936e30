use std::io::{self, BufRead, Write};

use quiz_core::model::{AiEvaluation, AiQuestion, AiQuestionKind, StudentAnswer};
use services::{AiQuizError, AiQuizService};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum PracticeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ai(#[from] AiQuizError),
}

/// Tally of one practice run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PracticeSummary {
    pub asked: usize,
    pub answered: usize,
    pub correct: usize,
}

/// Generate questions on `topic`, ask each one and print the model's verdict.
///
/// A blank answer skips the question. Code answers span several lines and end
/// with a line holding a single `.`. Evaluation failures are reported and the
/// run moves on; generation failures abort it.
///
/// # Errors
///
/// Returns `PracticeError` on I/O failures or when no questions could be generated.
pub(crate) async fn run_practice<R: BufRead, W: Write>(
    ai: &AiQuizService,
    topic: &str,
    count: usize,
    input: &mut R,
    out: &mut W,
) -> Result<PracticeSummary, PracticeError> {
    let questions = ai.generate_questions(topic, count).await?;
    let mut summary = PracticeSummary {
        asked: questions.len(),
        ..PracticeSummary::default()
    };
    if questions.is_empty() {
        writeln!(out, "The model returned no usable questions for {topic:?}.")?;
        return Ok(summary);
    }

    for (index, question) in questions.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "Question {}/{} [{}]", index + 1, questions.len(), question.question_type())?;
        print_question(question, out)?;

        let Some(answer) = read_answer(question, input, out)? else {
            writeln!(out, "Skipped.")?;
            continue;
        };
        summary.answered += 1;

        match ai.evaluate_answer(question, &answer).await {
            Ok(evaluation) => {
                if evaluation.is_correct {
                    summary.correct += 1;
                }
                print_evaluation(&evaluation, out)?;
            }
            Err(err) => {
                tracing::warn!("Evaluation failed for {}: {}", question.id, err);
                writeln!(out, "Could not evaluate this answer: {err}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Practice finished: {} correct out of {} answered ({} asked).",
        summary.correct, summary.answered, summary.asked
    )?;
    Ok(summary)
}

fn print_question<W: Write>(question: &AiQuestion, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", question.text)?;
    match &question.kind {
        AiQuestionKind::MultipleChoice { choices } => {
            for (index, choice) in choices.iter().enumerate() {
                writeln!(out, "  {}) {}", index + 1, choice.answer_text)?;
            }
            writeln!(out, "Answer with option numbers separated by commas.")?;
        }
        AiQuestionKind::FillInBlank { .. } => writeln!(out, "Type the missing word or phrase.")?,
        AiQuestionKind::CodeEval {
            language,
            initial_code,
            ..
        } => {
            if let Some(language) = language {
                writeln!(out, "Language: {language}")?;
            }
            if let Some(code) = initial_code {
                writeln!(out, "Starting code:\n{code}")?;
            }
            writeln!(out, "Enter your code, then a line with a single '.'.")?;
        }
    }
    Ok(())
}

fn read_answer<R: BufRead, W: Write>(
    question: &AiQuestion,
    input: &mut R,
    out: &mut W,
) -> io::Result<Option<StudentAnswer>> {
    match &question.kind {
        AiQuestionKind::MultipleChoice { choices } => loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                return Ok(None);
            }
            let texts: Vec<&str> = choices.iter().map(|c| c.answer_text.as_str()).collect();
            match pick_choices(&line, &texts) {
                Some(picked) => return Ok(Some(StudentAnswer::Choices(picked))),
                None => writeln!(out, "Pick numbers between 1 and {}.", choices.len())?,
            }
        },
        AiQuestionKind::FillInBlank { .. } => {
            write!(out, "> ")?;
            out.flush()?;
            Ok(read_line(input)?
                .map(|line| line.trim().to_owned())
                .filter(|line| !line.is_empty())
                .map(StudentAnswer::Text))
        }
        AiQuestionKind::CodeEval { .. } => {
            let mut code = Vec::new();
            while let Some(line) = read_line(input)? {
                let line = line.trim_end_matches(['\r', '\n']);
                if line.trim() == "." {
                    break;
                }
                code.push(line.to_owned());
            }
            let code = code.join("\n");
            Ok((!code.trim().is_empty()).then_some(StudentAnswer::Text(code)))
        }
    }
}

/// Map "1, 3" to the texts of options 1 and 3, keeping the order given.
fn pick_choices(line: &str, texts: &[&str]) -> Option<Vec<String>> {
    let mut picked: Vec<String> = Vec::new();
    for raw in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let number: usize = raw.parse().ok()?;
        let text = texts.get(number.checked_sub(1)?)?;
        if !picked.iter().any(|p| p == text) {
            picked.push((*text).to_owned());
        }
    }
    (!picked.is_empty()).then_some(picked)
}

fn print_evaluation<W: Write>(evaluation: &AiEvaluation, out: &mut W) -> io::Result<()> {
    let verdict = if evaluation.is_correct {
        "Correct"
    } else {
        "Incorrect"
    };
    writeln!(out, "{verdict}. {}", evaluation.evaluation)
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
