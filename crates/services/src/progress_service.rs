use std::sync::{Arc, Mutex};

use quiz_core::model::QuizResult;
use quiz_core::progress::{
    AchievementId, AggregateStats, HISTORY_LIMIT, ProgressAction, ProgressState, QuizHistory,
};
use storage::repository::{ProgressRepository, ProgressSnapshot, ResultRepository};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ProgressServiceError;

/// What recording one result changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub result_id: i64,
    pub stats: AggregateStats,
    pub newly_unlocked: Vec<AchievementId>,
}

/// The single owner of progress state.
///
/// Every mutation goes through [`ProgressService::record`] or
/// [`ProgressService::reset`]. Writers are serialized, and the in-memory state
/// only changes after storage accepted the write.
#[derive(Clone)]
pub struct ProgressService {
    state: Arc<Mutex<ProgressState>>,
    writer: Arc<AsyncMutex<()>>,
    progress: Arc<dyn ProgressRepository>,
    results: Arc<dyn ResultRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            writer: Arc::new(AsyncMutex::new(())),
            progress,
            results,
        }
    }

    /// Replace in-memory state with what storage holds.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if storage cannot be read.
    pub async fn load(&self) -> Result<ProgressState, ProgressServiceError> {
        let _writer = self.writer.lock().await;
        let snapshot = self.progress.load_progress().await?.unwrap_or_default();
        let limit = u32::try_from(HISTORY_LIMIT).unwrap_or(u32::MAX);
        let recent = self.results.list_recent_results(limit).await?;

        let loaded = ProgressState {
            stats: snapshot.stats,
            history: QuizHistory::from_newest_first(recent.into_iter().map(|row| row.result)),
            unlocked: snapshot.unlocked,
        };
        *self.lock()? = loaded.clone();

        tracing::debug!(
            quizzes = loaded.stats.total_quizzes(),
            history = loaded.history.len(),
            unlocked = loaded.unlocked.len(),
            "progress loaded"
        );
        Ok(loaded)
    }

    /// Store a finished result and fold it into the aggregate.
    ///
    /// The result row and the new snapshot are written together. A result
    /// whose session was already recorded is rejected by storage with
    /// `Conflict`; on any error the state is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the result or snapshot cannot be stored.
    pub async fn record(&self, result: QuizResult) -> Result<RecordOutcome, ProgressServiceError> {
        let _writer = self.writer.lock().await;
        let current = self.snapshot()?;
        let (next, newly_unlocked) = current.reduce(ProgressAction::RecordResult(result.clone()));
        let snapshot = ProgressSnapshot {
            stats: next.stats.clone(),
            unlocked: next.unlocked.clone(),
        };

        let result_id = self.progress.record_result(&result, &snapshot).await?;
        let stats = next.stats.clone();
        *self.lock()? = next;

        for id in &newly_unlocked {
            tracing::info!(achievement = id.as_str(), "achievement unlocked");
        }
        Ok(RecordOutcome {
            result_id,
            stats,
            newly_unlocked,
        })
    }

    /// Forget every result, stat and achievement.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if storage cannot be cleared.
    pub async fn reset(&self) -> Result<(), ProgressServiceError> {
        let _writer = self.writer.lock().await;
        self.progress.clear_progress().await?;
        let current = self.snapshot()?;
        let (next, _) = current.reduce(ProgressAction::ResetProgress);
        *self.lock()? = next;
        tracing::info!("progress reset");
        Ok(())
    }

    /// A copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Poisoned` if a writer panicked.
    pub fn snapshot(&self) -> Result<ProgressState, ProgressServiceError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ProgressState>, ProgressServiceError> {
        self.state.lock().map_err(|_| ProgressServiceError::Poisoned)
    }
}

impl std::fmt::Debug for ProgressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{FinishReason, PlayerProfile, SessionId};
    use quiz_core::time::fixed_now;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    fn service(repo: &InMemoryRepository) -> ProgressService {
        ProgressService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    fn result(score: u64, offset_secs: i64) -> QuizResult {
        let start = fixed_now() + Duration::seconds(offset_secs);
        QuizResult::from_persisted(
            SessionId::generate(),
            PlayerProfile::anonymous(),
            score,
            4,
            20_000,
            start,
            start + Duration::seconds(30),
            FinishReason::WrongAnswer,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn record_updates_state_and_storage() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);

        let outcome = svc.record(result(20_000, 0)).await.unwrap();
        assert_eq!(outcome.stats.total_quizzes(), 1);
        assert_eq!(
            outcome.newly_unlocked,
            vec![
                AchievementId::FirstQuiz,
                AchievementId::PerfectScore,
                AchievementId::ConsistentPerformer,
            ]
        );

        let outcome = svc.record(result(10_000, 60)).await.unwrap();
        assert!(outcome.newly_unlocked.is_empty());
        assert_eq!(outcome.stats.average_score(), 75);

        let stored = repo.load_progress().await.unwrap().unwrap();
        assert_eq!(stored.stats, outcome.stats);
        assert_eq!(stored.unlocked.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_result_is_rejected_without_double_counting() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let r = result(5_000, 0);

        svc.record(r.clone()).await.unwrap();
        let err = svc.record(r).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Storage(StorageError::Conflict)
        ));
        assert_eq!(svc.snapshot().unwrap().stats.total_quizzes(), 1);
    }

    #[tokio::test]
    async fn load_rebuilds_history_from_results() {
        let repo = InMemoryRepository::new();
        let first = service(&repo);
        first.record(result(5_000, 0)).await.unwrap();
        let newest = result(15_000, 100);
        first.record(newest.clone()).await.unwrap();

        let second = service(&repo);
        let loaded = second.load().await.unwrap();
        assert_eq!(loaded.stats.total_quizzes(), 2);
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.history.latest(), Some(&newest));
        assert!(loaded.unlocked.contains(AchievementId::FirstQuiz));
    }

    /// Fails the first `record_result` call, then delegates.
    struct FlakyProgress {
        inner: InMemoryRepository,
        failed_once: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ProgressRepository for FlakyProgress {
        async fn load_progress(&self) -> Result<Option<ProgressSnapshot>, StorageError> {
            self.inner.load_progress().await
        }

        async fn record_result(
            &self,
            result: &QuizResult,
            snapshot: &ProgressSnapshot,
        ) -> Result<i64, StorageError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.inner.record_result(result, snapshot).await
        }

        async fn clear_progress(&self) -> Result<(), StorageError> {
            self.inner.clear_progress().await
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged_and_can_be_retried() {
        let repo = InMemoryRepository::new();
        let flaky = Arc::new(FlakyProgress {
            inner: repo.clone(),
            failed_once: AtomicBool::new(false),
        });
        let svc = ProgressService::new(flaky, Arc::new(repo.clone()));
        let r = result(20_000, 0);

        let err = svc.record(r.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Storage(StorageError::Connection(_))
        ));
        assert_eq!(svc.snapshot().unwrap(), ProgressState::default());
        assert!(repo.list_recent_results(10).await.unwrap().is_empty());

        let outcome = svc.record(r).await.unwrap();
        assert_eq!(outcome.stats.total_quizzes(), 1);

        let reloaded = service(&repo).load().await.unwrap();
        assert_eq!(reloaded.stats.total_quizzes(), 1);
        assert_eq!(reloaded.history.len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_memory_and_storage() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        svc.record(result(20_000, 0)).await.unwrap();

        svc.reset().await.unwrap();
        assert_eq!(svc.snapshot().unwrap(), ProgressState::default());
        assert_eq!(
            repo.load_progress().await.unwrap(),
            Some(ProgressSnapshot::default())
        );
        assert!(repo.list_recent_results(10).await.unwrap().is_empty());
    }
}
