#![forbid(unsafe_code)]

pub mod app_services;
pub mod backend;
pub mod error;
pub mod game;
pub mod progress_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use backend::{BackendClient, BackendConfig, LeaderboardEntry};
pub use error::{AppServicesError, BackendError, GameError, ProgressServiceError, SourceError};
pub use game::{
    FinishedGame, GameEvent, GameLoopService, GameService, QuestionSource, RandomAhead, ResultSink,
    StaticQuestions, StoredQuestions, SubmissionStatus,
};
pub use progress_service::{ProgressService, RecordOutcome};
