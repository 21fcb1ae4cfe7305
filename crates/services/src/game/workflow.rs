use std::sync::Arc;

use async_trait::async_trait;
use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::{GameRules, PlayerProfile, Question, QuizResult};
use quiz_core::progress::AchievementId;

use super::service::GameService;
use super::source::QuestionSource;
use crate::Clock;
use crate::error::{BackendError, GameError};
use crate::progress_service::{ProgressService, RecordOutcome};

/// Receives finished results, e.g. a remote leaderboard.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `BackendError` if the result could not be delivered.
    async fn submit_result(&self, result: &QuizResult) -> Result<(), BackendError>;
}

/// Whether a finished result reached the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Submitted,
    /// Delivery failed. Local progress is unaffected and nothing is retried.
    Failed(String),
    /// No sink configured.
    Skipped,
}

/// Everything that happened when a game was wrapped up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedGame {
    pub result: QuizResult,
    pub result_id: i64,
    pub newly_unlocked: Vec<AchievementId>,
    pub submission: SubmissionStatus,
}

/// Orchestrates question loading, game start and result hand-off.
#[derive(Clone)]
pub struct GameLoopService {
    clock: Clock,
    rules: GameRules,
    progress: Arc<ProgressService>,
    primary: Arc<dyn QuestionSource>,
    fallback: Option<Arc<dyn QuestionSource>>,
    sink: Option<Arc<dyn ResultSink>>,
    shuffle: bool,
}

impl GameLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<ProgressService>,
        primary: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            clock,
            rules: GameRules::default(),
            progress,
            primary,
            fallback: None,
            sink: None,
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn QuestionSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// Questions for a new game.
    ///
    /// The primary source is tried first; when it fails or comes back empty the
    /// fallback is used with a warning.
    ///
    /// # Errors
    ///
    /// Returns the primary's error when there is no fallback, the fallback's
    /// error when both fail, or `GameError::NoQuestions` when every source is empty.
    pub async fn load_questions(&self) -> Result<Vec<Question>, GameError> {
        let mut questions = match self.primary.fetch_questions().await {
            Ok(questions) if !questions.is_empty() => questions,
            outcome => {
                let Some(fallback) = &self.fallback else {
                    return match outcome {
                        Err(err) => Err(err.into()),
                        Ok(_) => Err(GameError::NoQuestions),
                    };
                };
                match &outcome {
                    Err(err) => tracing::warn!(
                        source = self.primary.name(),
                        fallback = fallback.name(),
                        error = %err,
                        "question source failed, using fallback"
                    ),
                    Ok(_) => tracing::warn!(
                        source = self.primary.name(),
                        fallback = fallback.name(),
                        "question source returned nothing, using fallback"
                    ),
                }
                fallback.fetch_questions().await?
            }
        };

        if questions.is_empty() {
            return Err(GameError::NoQuestions);
        }
        if self.shuffle {
            questions.shuffle(&mut rng());
        }
        Ok(questions)
    }

    /// Load questions and start a game for `player`.
    ///
    /// # Errors
    ///
    /// Returns `GameError` if no questions are available.
    pub async fn start_game(&self, player: PlayerProfile) -> Result<GameService, GameError> {
        let questions = self.load_questions().await?;
        let mut game = GameService::new(self.rules, player, self.clock);
        game.start(questions)?;
        Ok(game)
    }

    /// Record a finished result locally, then hand it to the sink.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Progress` if the local record fails. Sink failures
    /// are reported through `SubmissionStatus::Failed`, not as errors.
    pub async fn finish(&self, result: QuizResult) -> Result<FinishedGame, GameError> {
        let RecordOutcome {
            result_id,
            newly_unlocked,
            ..
        } = self.progress.record(result.clone()).await?;

        let submission = match &self.sink {
            None => SubmissionStatus::Skipped,
            Some(sink) => match sink.submit_result(&result).await {
                Ok(()) => SubmissionStatus::Submitted,
                Err(err) => {
                    tracing::warn!(
                        session = %result.session_id(),
                        error = %err,
                        "result submission failed"
                    );
                    SubmissionStatus::Failed(err.to_string())
                }
            },
        };

        Ok(FinishedGame {
            result,
            result_id,
            newly_unlocked,
            submission,
        })
    }
}

impl std::fmt::Debug for GameLoopService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoopService")
            .field("clock", &self.clock)
            .field("rules", &self.rules)
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .field("sink", &self.sink.is_some())
            .field("shuffle", &self.shuffle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::game::StaticQuestions;
    use quiz_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    struct Failing;

    #[async_trait]
    impl QuestionSource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
            Err(StorageError::Connection("offline".into()).into())
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl ResultSink for RejectingSink {
        async fn submit_result(&self, _result: &QuizResult) -> Result<(), BackendError> {
            Err(BackendError::Disabled)
        }
    }

    fn progress() -> Arc<ProgressService> {
        let repo = InMemoryRepository::new();
        Arc::new(ProgressService::new(
            Arc::new(repo.clone()),
            Arc::new(repo),
        ))
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let svc = GameLoopService::new(fixed_clock(), progress(), Arc::new(Failing))
            .with_fallback(Arc::new(StaticQuestions::bundled().unwrap()));
        assert_eq!(svc.load_questions().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn primary_error_surfaces_without_fallback() {
        let svc = GameLoopService::new(fixed_clock(), progress(), Arc::new(Failing));
        assert!(matches!(
            svc.load_questions().await,
            Err(GameError::Source(SourceError::Storage(_)))
        ));
    }

    #[tokio::test]
    async fn empty_sources_report_no_questions() {
        let svc = GameLoopService::new(
            fixed_clock(),
            progress(),
            Arc::new(StaticQuestions::new(Vec::new())),
        )
        .with_fallback(Arc::new(StaticQuestions::new(Vec::new())));
        assert!(matches!(
            svc.load_questions().await,
            Err(GameError::NoQuestions)
        ));
    }

    #[tokio::test]
    async fn shuffle_keeps_every_question() {
        let bundled = StaticQuestions::bundled().unwrap();
        let svc = GameLoopService::new(fixed_clock(), progress(), Arc::new(bundled.clone()))
            .with_shuffle(true);
        let mut ids: Vec<_> = svc
            .load_questions()
            .await
            .unwrap()
            .iter()
            .map(|q| q.id().as_str().to_owned())
            .collect();
        ids.sort();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn sink_failure_does_not_touch_progress() {
        let progress = progress();
        let svc = GameLoopService::new(
            fixed_clock(),
            Arc::clone(&progress),
            Arc::new(StaticQuestions::bundled().unwrap()),
        )
        .with_sink(Arc::new(RejectingSink));

        let mut game = svc.start_game(PlayerProfile::anonymous()).await.unwrap();
        let crate::game::GameEvent::Finished(result) = game.quit().unwrap() else {
            panic!("quit should finish");
        };

        let finished = svc.finish(result).await.unwrap();
        assert!(matches!(finished.submission, SubmissionStatus::Failed(_)));
        assert_eq!(finished.newly_unlocked.first(), Some(&AchievementId::FirstQuiz));
        assert_eq!(progress.snapshot().unwrap().stats.total_quizzes(), 1);
    }

    #[tokio::test]
    async fn no_sink_means_skipped() {
        let svc = GameLoopService::new(
            fixed_clock(),
            progress(),
            Arc::new(StaticQuestions::bundled().unwrap()),
        );
        let mut game = svc.start_game(PlayerProfile::anonymous()).await.unwrap();
        let crate::game::GameEvent::Finished(result) = game.quit().unwrap() else {
            panic!("quit should finish");
        };
        assert_eq!(
            svc.finish(result).await.unwrap().submission,
            SubmissionStatus::Skipped
        );
    }
}
