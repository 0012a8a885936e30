//! Generation and grading of open-ended questions through a generative-language API.

mod config;
mod gemini;
mod prompt;
mod service;

pub use config::AiConfig;
pub use service::{AiQuizService, MAX_GENERATED_QUESTIONS};
