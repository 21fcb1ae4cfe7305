use quiz_core::model::QuizResult;
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{conn, map_result_row, u64_to_i64};
use crate::repository::{ResultRepository, ResultRow, StorageError};

/// Insert one result row inside the caller's transaction.
pub(super) async fn insert_result(
    db: &mut SqliteConnection,
    result: &QuizResult,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r"
            INSERT INTO quiz_results (
                session_id, player_name, player_city, player_mobile,
                score, total_questions, max_score, started_at, finished_at, reason
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ",
    )
    .bind(result.session_id().as_uuid())
    .bind(result.player().name())
    .bind(result.player().city())
    .bind(result.player().mobile())
    .bind(u64_to_i64("score", result.score())?)
    .bind(i64::from(result.total_questions()))
    .bind(u64_to_i64("max_score", result.max_score())?)
    .bind(result.started_at())
    .bind(result.finished_at())
    .bind(result.reason().as_str())
    .execute(db)
    .await
    .map_err(conn)?;

    Ok(res.last_insert_rowid())
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, session_id, player_name, player_city, player_mobile,
                       score, total_questions, max_score, started_at, finished_at, reason
                FROM quiz_results
                ORDER BY id DESC
                LIMIT ?1
            ",
        )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
