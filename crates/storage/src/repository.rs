use async_trait::async_trait;
use quiz_core::model::{Question, QuizResult};
use quiz_core::progress::{AggregateStats, UnlockedAchievements};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted part of the progress store.
///
/// History is not stored here; it is rebuilt from the most recent results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub stats: AggregateStats,
    pub unlocked: UnlockedAchievements,
}

/// A stored result together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub result: QuizResult,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, result: QuizResult) -> Self {
        Self { id, result }
    }
}

/// Repository contract for the locally bundled or cached question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a question or replace the one with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Up to `limit` questions in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;
}

/// Read access to finished results. Writes go through [`ProgressRepository`].
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Most recently recorded first, at most `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError>;
}

/// Repository contract for aggregate stats and unlocked achievements.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the snapshot, or `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn load_progress(&self) -> Result<Option<ProgressSnapshot>, StorageError>;

    /// Append `result` and store `snapshot` as one unit of work.
    ///
    /// Nothing is written when either part fails.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result for the same session exists.
    async fn record_result(
        &self,
        result: &QuizResult,
        snapshot: &ProgressSnapshot,
    ) -> Result<i64, StorageError>;

    /// Delete every result and store an empty snapshot as one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be cleared.
    async fn clear_progress(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    results: Arc<Mutex<Vec<ResultRow>>>,
    progress: Arc<Mutex<Option<ProgressSnapshot>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => *existing = question.clone(),
            None => guard.push(question.clone()),
        }
        Ok(())
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<Option<ProgressSnapshot>, StorageError> {
        Ok(self.progress.lock().map_err(poisoned)?.clone())
    }

    async fn record_result(
        &self,
        result: &QuizResult,
        snapshot: &ProgressSnapshot,
    ) -> Result<i64, StorageError> {
        let mut results = self.results.lock().map_err(poisoned)?;
        let mut progress = self.progress.lock().map_err(poisoned)?;
        if results
            .iter()
            .any(|row| row.result.session_id() == result.session_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = results.last().map_or(1, |row| row.id + 1);
        results.push(ResultRow::new(id, result.clone()));
        *progress = Some(snapshot.clone());
        Ok(id)
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        let mut results = self.results.lock().map_err(poisoned)?;
        let mut progress = self.progress.lock().map_err(poisoned)?;
        results.clear();
        *progress = Some(ProgressSnapshot::default());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            questions: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{FinishReason, PlayerProfile, QuestionDraft, SessionId};
    use quiz_core::progress::AchievementId;
    use quiz_core::time::fixed_now;

    fn result_at(offset_secs: i64) -> QuizResult {
        let start = fixed_now() + Duration::seconds(offset_secs);
        QuizResult::from_persisted(
            SessionId::generate(),
            PlayerProfile::anonymous(),
            5000,
            2,
            10_000,
            start,
            start + Duration::seconds(10),
            FinishReason::WrongAnswer,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_question_in_place() {
        let repo = InMemoryRepository::new();
        let q1 = QuestionDraft::yes_no("a", "First?", "YES").validate().unwrap();
        let q2 = QuestionDraft::yes_no("b", "Second?", "NO").validate().unwrap();
        repo.upsert_question(&q1).await.unwrap();
        repo.upsert_question(&q2).await.unwrap();

        let edited = QuestionDraft::yes_no("a", "First, edited?", "NO")
            .validate()
            .unwrap();
        repo.upsert_question(&edited).await.unwrap();

        let listed = repo.list_questions(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].prompt(), "First, edited?");
        assert_eq!(repo.list_questions(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn results_list_in_recording_order() {
        let repo = InMemoryRepository::new();
        let snapshot = ProgressSnapshot::default();
        let finished_later = result_at(100);
        let recorded_later = result_at(0);
        repo.record_result(&finished_later, &snapshot).await.unwrap();
        let last_id = repo.record_result(&recorded_later, &snapshot).await.unwrap();

        let rows = repo.list_recent_results(10).await.unwrap();
        assert_eq!(rows[0].id, last_id);
        assert_eq!(rows[1].result, finished_later);
        assert_eq!(repo.list_recent_results(1).await.unwrap().len(), 1);
        assert_eq!(rows[0].result, recorded_later);

        repo.clear_progress().await.unwrap();
        assert!(repo.list_recent_results(10).await.unwrap().is_empty());
        assert_eq!(
            repo.load_progress().await.unwrap(),
            Some(ProgressSnapshot::default())
        );
    }

    #[tokio::test]
    async fn conflicting_record_leaves_snapshot_untouched() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.load_progress().await.unwrap(), None);
        let result = result_at(0);
        let first = ProgressSnapshot {
            stats: AggregateStats::from_persisted(1, 50, 10, 50),
            unlocked: UnlockedAchievements::from_persisted([AchievementId::FirstQuiz]),
        };
        repo.record_result(&result, &first).await.unwrap();

        let doubled = ProgressSnapshot {
            stats: AggregateStats::from_persisted(2, 50, 20, 100),
            ..first.clone()
        };
        assert_eq!(repo.load_progress().await.unwrap(), Some(first.clone()));

        let err = repo.record_result(&result, &doubled).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.load_progress().await.unwrap(), Some(first));
        assert_eq!(repo.list_recent_results(10).await.unwrap().len(), 1);
    }
}
