mod helper;
mod service;
mod source;
mod workflow;

// Public API of the game subsystem.
pub use crate::error::GameError;
pub use helper::RandomAhead;
pub use service::{GameEvent, GameService};
pub use source::{QuestionSource, StaticQuestions, StoredQuestions};
pub use workflow::{FinishedGame, GameLoopService, ResultSink, SubmissionStatus};
