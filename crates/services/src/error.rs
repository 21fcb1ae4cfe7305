//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{PlayerError, QuestionError};
use quiz_core::session::SessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the game layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no question source produced any questions")]
    NoQuestions,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

impl GameError {
    /// True when the error is a rejected player action the UI should just warn about.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, GameError::Session(err) if err.is_warning())
    }
}

/// Errors emitted while loading questions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("progress store lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BackendClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend is not configured")]
    Disabled,
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
