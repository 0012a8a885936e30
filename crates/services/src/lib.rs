#![forbid(unsafe_code)]

pub mod ai;
pub mod app_services;
pub mod error;
pub mod profile_service;
pub mod quiz_service;

pub use quiz_core::Clock;

pub use ai::{AiConfig, AiQuizService};
pub use app_services::AppServices;
pub use error::{AiQuizError, AppServicesError, ProfileError, QuizServiceError};
pub use profile_service::{PROFILE_RESULT_LIMIT, ProfileService, ProfileView, StudentScores};
pub use quiz_service::{AdvanceOutcome, DEFAULT_EXAM_TITLE, QuizService, SubmissionOutcome};
