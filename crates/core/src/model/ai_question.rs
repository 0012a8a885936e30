use serde::{Deserialize, Serialize};
use std::fmt;

/// Question formats the generative model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiQuestionType {
    MultipleChoice,
    FillInBlank,
    CodeEval,
}

impl AiQuestionType {
    pub const ALL: [AiQuestionType; 3] = [
        AiQuestionType::MultipleChoice,
        AiQuestionType::FillInBlank,
        AiQuestionType::CodeEval,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AiQuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            AiQuestionType::FillInBlank => "FILL_IN_BLANK",
            AiQuestionType::CodeEval => "CODE_EVAL",
        }
    }
}

impl fmt::Display for AiQuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One option of a generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswerChoice {
    pub answer_text: String,
    pub is_correct: bool,
}

/// Per-format payload of a generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiQuestionKind {
    MultipleChoice {
        choices: Vec<AiAnswerChoice>,
    },
    FillInBlank {
        expected: String,
    },
    CodeEval {
        criteria: String,
        language: Option<String>,
        initial_code: Option<String>,
    },
}

impl AiQuestionKind {
    #[must_use]
    pub fn question_type(&self) -> AiQuestionType {
        match self {
            AiQuestionKind::MultipleChoice { .. } => AiQuestionType::MultipleChoice,
            AiQuestionKind::FillInBlank { .. } => AiQuestionType::FillInBlank,
            AiQuestionKind::CodeEval { .. } => AiQuestionType::CodeEval,
        }
    }
}

/// A question produced by the generative-language service.
///
/// The id is assigned locally for tracking in a single run; these questions
/// never enter the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiQuestion {
    pub id: String,
    pub text: String,
    pub topic: Option<String>,
    #[serde(flatten)]
    pub kind: AiQuestionKind,
}

impl AiQuestion {
    #[must_use]
    pub fn question_type(&self) -> AiQuestionType {
        self.kind.question_type()
    }

    /// Texts of the options flagged correct; empty for non multiple-choice questions.
    #[must_use]
    pub fn correct_choice_texts(&self) -> Vec<&str> {
        match &self.kind {
            AiQuestionKind::MultipleChoice { choices } => choices
                .iter()
                .filter(|c| c.is_correct)
                .map(|c| c.answer_text.as_str())
                .collect(),
            AiQuestionKind::FillInBlank { .. } | AiQuestionKind::CodeEval { .. } => Vec::new(),
        }
    }
}

/// What the student submitted for a generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentAnswer {
    Text(String),
    Choices(Vec<String>),
}

impl StudentAnswer {
    /// Answer as a list of selected option texts.
    #[must_use]
    pub fn as_choices(&self) -> Vec<&str> {
        match self {
            StudentAnswer::Text(text) => vec![text.as_str()],
            StudentAnswer::Choices(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Answer as free text; multiple choices are joined with ", ".
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            StudentAnswer::Text(text) => text.clone(),
            StudentAnswer::Choices(items) => items.join(", "),
        }
    }
}

/// Verdict and feedback returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEvaluation {
    pub evaluation: String,
    pub is_correct: bool,
}
