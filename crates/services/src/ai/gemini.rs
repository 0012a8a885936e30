use quiz_core::model::{AiAnswerChoice, AiQuestion, AiQuestionKind, AiQuestionType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AiQuizError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    /// A single-turn user prompt constrained to JSON matching `schema`.
    pub(crate) fn json(prompt: String, schema: Value) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    pub(crate) fn into_text(self) -> Result<String, AiQuizError> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AiQuizError::EmptyResponse)
    }
}

/// One question as the model returns it, before validation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawQuestion {
    question_text: Option<String>,
    question_type: Option<String>,
    correct_answer_reference: Option<String>,
    #[serde(default)]
    answers: Vec<AiAnswerChoice>,
    language: Option<String>,
    initial_code: Option<String>,
}

fn parse_type(raw: &str) -> Option<AiQuestionType> {
    AiQuestionType::ALL
        .into_iter()
        .find(|t| t.as_str() == raw.trim())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn raw model output into typed questions.
///
/// Ids follow `<TYPE>-<position>-<millis>` where position is 1-based in the
/// raw list. Entries with an unknown type or no text are dropped, and the
/// result is cut to `limit`.
pub(crate) fn normalize_questions(
    raw: Vec<RawQuestion>,
    topic: &str,
    millis: i64,
    limit: usize,
) -> Vec<AiQuestion> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, q)| {
            let Some(question_type) = q.question_type.as_deref().and_then(parse_type) else {
                tracing::debug!("Dropping generated question {} with unknown type", index + 1);
                return None;
            };
            let text = non_blank(q.question_text)?;
            let reference = q.correct_answer_reference.unwrap_or_default();
            let kind = match question_type {
                AiQuestionType::MultipleChoice => AiQuestionKind::MultipleChoice { choices: q.answers },
                AiQuestionType::FillInBlank => AiQuestionKind::FillInBlank {
                    expected: reference,
                },
                AiQuestionType::CodeEval => AiQuestionKind::CodeEval {
                    criteria: reference,
                    language: non_blank(q.language),
                    initial_code: non_blank(q.initial_code),
                },
            };
            Some(AiQuestion {
                id: format!("{}-{}-{}", question_type, index + 1, millis),
                text,
                topic: Some(topic.to_owned()),
                kind,
            })
        })
        .take(limit)
        .collect()
}
