use quiz_core::model::Question;

use super::SqliteRepository;
use super::mapping::{conn, map_question_row, options_to_json};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let options = options_to_json(question)?;

        sqlx::query(
            r"
                INSERT INTO questions (id, prompt, correct_answer, options, remark)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    prompt = excluded.prompt,
                    correct_answer = excluded.correct_answer,
                    options = excluded.options,
                    remark = excluded.remark
            ",
        )
        .bind(question.id().as_str())
        .bind(question.prompt())
        .bind(question.correct_answer().as_str())
        .bind(options)
        .bind(question.remark())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, prompt, correct_answer, options, remark
                FROM questions
                ORDER BY position ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }
}
