use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates questions, results, aggregate stats and unlocked achievements.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    position INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    prompt TEXT NOT NULL,
                    correct_answer TEXT NOT NULL,
                    options TEXT NOT NULL,
                    remark TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_results (
                    id INTEGER PRIMARY KEY,
                    session_id BLOB NOT NULL UNIQUE,
                    player_name TEXT NOT NULL,
                    player_city TEXT NOT NULL,
                    player_mobile TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    max_score INTEGER NOT NULL CHECK (max_score >= score),
                    started_at TEXT NOT NULL,
                    finished_at TEXT NOT NULL,
                    reason TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_stats (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    total_quizzes INTEGER NOT NULL CHECK (total_quizzes >= 0),
                    best_score INTEGER NOT NULL CHECK (best_score BETWEEN 0 AND 100),
                    total_time_secs INTEGER NOT NULL CHECK (total_time_secs >= 0),
                    percentage_sum INTEGER NOT NULL CHECK (percentage_sum >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS unlocked_achievements (
                    position INTEGER PRIMARY KEY,
                    achievement_id TEXT NOT NULL UNIQUE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_results_finished
                    ON quiz_results (finished_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
