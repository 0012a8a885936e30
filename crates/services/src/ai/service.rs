use reqwest::Client;
use serde::de::DeserializeOwned;

use quiz_core::model::{AiEvaluation, AiQuestion, StudentAnswer};

use super::config::AiConfig;
use super::gemini::{GenerateRequest, GenerateResponse, RawQuestion, normalize_questions};
use super::prompt;
use crate::Clock;
use crate::error::AiQuizError;

/// Largest batch a single generation request may ask for.
pub const MAX_GENERATED_QUESTIONS: usize = 20;

/// Header carrying the API key; it never goes into the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct AiQuizService {
    client: Client,
    clock: Clock,
    config: Option<AiConfig>,
}

impl AiQuizService {
    #[must_use]
    pub fn from_env(clock: Clock) -> Self {
        Self::new(AiConfig::from_env(), clock)
    }

    #[must_use]
    pub fn new(config: Option<AiConfig>, clock: Clock) -> Self {
        Self {
            client: Client::new(),
            clock,
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the model for `count` questions about `topic`.
    ///
    /// # Errors
    ///
    /// Returns `AiQuizError` when the service is disabled, the arguments are
    /// out of range, the request fails, or the reply is empty or not a JSON array.
    pub async fn generate_questions(
        &self,
        topic: &str,
        count: usize,
    ) -> Result<Vec<AiQuestion>, AiQuizError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AiQuizError::InvalidRequest("topic cannot be empty".into()));
        }
        if count == 0 || count > MAX_GENERATED_QUESTIONS {
            return Err(AiQuizError::InvalidRequest(format!(
                "question count must be between 1 and {MAX_GENERATED_QUESTIONS}, got {count}"
            )));
        }

        let request = GenerateRequest::json(
            prompt::generation_prompt(topic, count),
            prompt::question_list_schema(),
        );
        let raw: Vec<RawQuestion> = self.call(&request).await?;
        let raw_len = raw.len();
        let questions = normalize_questions(raw, topic, self.clock.timestamp_millis(), count);
        tracing::debug!(
            "Generated {} questions on {:?} ({} returned by the model)",
            questions.len(),
            topic,
            raw_len
        );
        Ok(questions)
    }

    /// Ask the model to grade `answer` for `question`.
    ///
    /// # Errors
    ///
    /// Returns `AiQuizError` when the service is disabled, the request fails,
    /// or the reply is empty or malformed.
    pub async fn evaluate_answer(
        &self,
        question: &AiQuestion,
        answer: &StudentAnswer,
    ) -> Result<AiEvaluation, AiQuizError> {
        let request = GenerateRequest::json(
            prompt::evaluation_prompt(question, answer),
            prompt::evaluation_schema(),
        );
        let evaluation: AiEvaluation = self.call(&request).await?;
        tracing::debug!(
            "Evaluated answer for {}: correct={}",
            question.id,
            evaluation.is_correct
        );
        Ok(evaluation)
    }

    async fn call<T: DeserializeOwned>(&self, request: &GenerateRequest) -> Result<T, AiQuizError> {
        let config = self.config.as_ref().ok_or(AiQuizError::Disabled)?;

        tracing::debug!("Calling generative model {}", config.model);
        let response = self
            .client
            .post(config.endpoint())
            .header(API_KEY_HEADER, &config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("Generative model request failed: {}", response.status());
            return Err(AiQuizError::HttpStatus(response.status()));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.into_text()?;
        Ok(serde_json::from_str(&text)?)
    }
}
