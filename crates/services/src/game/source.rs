use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::fixtures::sample_questions;
use quiz_core::model::{Question, QuestionError};
use storage::repository::QuestionRepository;

use crate::error::SourceError;

/// Anything that can hand out a question list for a new game.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns `SourceError` when the questions cannot be obtained or decoded.
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError>;
}

/// A fixed list, by default the bundled question set.
#[derive(Debug, Clone)]
pub struct StaticQuestions {
    questions: Vec<Question>,
}

impl StaticQuestions {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// # Errors
    ///
    /// Returns `QuestionError` if a bundled question fails validation.
    pub fn bundled() -> Result<Self, QuestionError> {
        Ok(Self::new(sample_questions()?))
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

#[async_trait]
impl QuestionSource for StaticQuestions {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        Ok(self.questions.clone())
    }
}

/// Questions cached in the local database.
#[derive(Clone)]
pub struct StoredQuestions {
    repo: Arc<dyn QuestionRepository>,
    limit: u32,
}

impl StoredQuestions {
    pub const DEFAULT_LIMIT: u32 = 100;

    #[must_use]
    pub fn new(repo: Arc<dyn QuestionRepository>) -> Self {
        Self {
            repo,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl std::fmt::Debug for StoredQuestions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredQuestions")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QuestionSource for StoredQuestions {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        Ok(self.repo.list_questions(self.limit).await?)
    }
}
