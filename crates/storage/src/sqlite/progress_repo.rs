use quiz_core::model::QuizResult;
use quiz_core::progress::{AchievementId, AggregateStats, UnlockedAchievements};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, i64_to_u64, ser, u64_to_i64};
use super::result_repo::insert_result;
use crate::repository::{ProgressRepository, ProgressSnapshot, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Option<ProgressSnapshot>, StorageError> {
        let Some(row) = sqlx::query(
            r"
                SELECT total_quizzes, best_score, total_time_secs, percentage_sum
                FROM progress_stats
                WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let stats = AggregateStats::from_persisted(
            i64_to_u32("total_quizzes", row.try_get("total_quizzes").map_err(ser)?)?,
            i64_to_u32("best_score", row.try_get("best_score").map_err(ser)?)?,
            i64_to_u64("total_time_secs", row.try_get("total_time_secs").map_err(ser)?)?,
            i64_to_u64("percentage_sum", row.try_get("percentage_sum").map_err(ser)?)?,
        );

        let rows = sqlx::query(
            "SELECT achievement_id FROM unlocked_achievements ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row.try_get("achievement_id").map_err(ser)?;
            match AchievementId::parse(&raw) {
                Some(id) => ids.push(id),
                None => tracing::warn!(achievement = %raw, "skipping unknown achievement id"),
            }
        }

        Ok(Some(ProgressSnapshot {
            stats,
            unlocked: UnlockedAchievements::from_persisted(ids),
        }))
    }

    async fn record_result(
        &self,
        result: &QuizResult,
        snapshot: &ProgressSnapshot,
    ) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let id = insert_result(&mut tx, result).await?;
        write_snapshot(&mut tx, snapshot).await?;
        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        sqlx::query("DELETE FROM quiz_results")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        write_snapshot(&mut tx, &ProgressSnapshot::default()).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}

async fn write_snapshot(
    db: &mut SqliteConnection,
    snapshot: &ProgressSnapshot,
) -> Result<(), StorageError> {
    let stats = &snapshot.stats;
    sqlx::query(
        r"
            INSERT INTO progress_stats (
                id, total_quizzes, best_score, total_time_secs, percentage_sum
            )
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                total_quizzes = excluded.total_quizzes,
                best_score = excluded.best_score,
                total_time_secs = excluded.total_time_secs,
                percentage_sum = excluded.percentage_sum
        ",
    )
    .bind(i64::from(stats.total_quizzes()))
    .bind(i64::from(stats.best_score()))
    .bind(u64_to_i64("total_time_secs", stats.total_time_secs())?)
    .bind(u64_to_i64("percentage_sum", stats.percentage_sum())?)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    sqlx::query("DELETE FROM unlocked_achievements")
        .execute(&mut *db)
        .await
        .map_err(conn)?;

    for (position, id) in (0_i64..).zip(snapshot.unlocked.iter()) {
        sqlx::query("INSERT INTO unlocked_achievements (position, achievement_id) VALUES (?1, ?2)")
            .bind(position)
            .bind(id.as_str())
            .execute(&mut *db)
            .await
            .map_err(conn)?;
    }
    Ok(())
}
