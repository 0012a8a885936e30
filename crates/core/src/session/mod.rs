//! Quiz attempt state machine and its helpers.

mod error;
mod quiz;
mod selection;
mod shuffle;

pub use error::{Operation, QuizSessionError, SessionStateKind};
pub use quiz::{Advance, Cursor, QuizProgress, QuizSession};
pub use selection::SelectionRecord;
pub use shuffle::shuffled;
