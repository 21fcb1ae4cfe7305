mod ids;
mod player;
mod question;
mod result;
mod rules;

pub use ids::{ParseIdError, QuestionId, SessionId};
pub use player::{PlayerDraft, PlayerError, PlayerProfile};
pub use question::{Answer, Question, QuestionDraft, QuestionError};
pub use result::{FinishReason, Performance, QuizResult, ResultError, ScoreBand, percentage};
pub use rules::GameRules;
