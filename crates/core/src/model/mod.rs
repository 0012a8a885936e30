mod ai_question;
mod exam_result;
mod ids;
mod question;
mod score;
mod topic;
mod user;

pub use ids::{AnswerId, ExamResultId, ParseIdError, QuestionId, UserId};

pub use ai_question::{
    AiAnswerChoice, AiEvaluation, AiQuestion, AiQuestionKind, AiQuestionType, StudentAnswer,
};
pub use exam_result::{ExamResult, ExamResultError, NewExamResult};
pub use question::{Answer, DEFAULT_TOPIC, Question, QuestionError};
pub use score::{ScoreError, ScoreReport};
pub use topic::{TopicBucket, group_by_topic};
pub use user::{Identity, ParseRoleError, UserProfile, UserRole};
