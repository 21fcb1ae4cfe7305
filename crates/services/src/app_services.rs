use std::sync::Arc;

use quiz_core::model::GameRules;
use storage::repository::{QuestionRepository, Storage};

use crate::Clock;
use crate::backend::{BackendClient, BackendConfig};
use crate::error::AppServicesError;
use crate::game::{GameLoopService, QuestionSource, ResultSink, StaticQuestions, StoredQuestions};
use crate::progress_service::ProgressService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    progress: Arc<ProgressService>,
    game_loop: Arc<GameLoopService>,
    backend: Option<Arc<BackendClient>>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization, bundled question
    /// seeding, or progress loading fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        rules: GameRules,
        backend: Option<BackendConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, rules, backend).await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// Questions come from the backend when one is configured, falling back to
    /// the local question table. An empty table is filled with the bundled set.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding or progress loading fails.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        rules: GameRules,
        backend: Option<BackendConfig>,
    ) -> Result<Self, AppServicesError> {
        ensure_bundled_questions(storage.questions.as_ref()).await?;

        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.results),
        ));
        progress.load().await?;

        let backend = backend.map(BackendClient::new).transpose()?.map(Arc::new);
        let stored: Arc<dyn QuestionSource> =
            Arc::new(StoredQuestions::new(Arc::clone(&storage.questions)));

        let game_loop = match &backend {
            Some(client) => GameLoopService::new(
                clock,
                Arc::clone(&progress),
                Arc::clone(client) as Arc<dyn QuestionSource>,
            )
            .with_fallback(stored)
            .with_sink(Arc::clone(client) as Arc<dyn ResultSink>),
            None => GameLoopService::new(clock, Arc::clone(&progress), stored),
        }
        .with_rules(rules);

        tracing::debug!(backend = backend.is_some(), "app services ready");
        Ok(Self {
            clock,
            progress,
            game_loop: Arc::new(game_loop),
            backend,
        })
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn game_loop(&self) -> Arc<GameLoopService> {
        Arc::clone(&self.game_loop)
    }

    #[must_use]
    pub fn backend(&self) -> Option<Arc<BackendClient>> {
        self.backend.clone()
    }
}

async fn ensure_bundled_questions(
    questions: &dyn QuestionRepository,
) -> Result<(), AppServicesError> {
    if !questions.list_questions(1).await?.is_empty() {
        return Ok(());
    }

    let bundled = StaticQuestions::bundled()?;
    for question in bundled.questions() {
        questions.upsert_question(question).await?;
    }
    tracing::info!(count = bundled.questions().len(), "seeded bundled questions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::PlayerProfile;
    use quiz_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_seed_and_play() {
        let storage = Storage::in_memory();
        let services =
            AppServices::from_storage(storage.clone(), fixed_clock(), GameRules::default(), None)
                .await
                .unwrap();

        assert_eq!(storage.questions.list_questions(10).await.unwrap().len(), 5);
        assert!(services.backend().is_none());

        let game = services
            .game_loop()
            .start_game(PlayerProfile::anonymous())
            .await
            .unwrap();
        assert_eq!(game.session().total_questions(), 5);
    }
}
