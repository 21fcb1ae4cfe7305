use quiz_core::model::{
    FinishReason, PlayerProfile, Question, QuestionDraft, QuizResult, SessionId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn options_to_json(question: &Question) -> Result<String, StorageError> {
    let labels: Vec<&str> = question.options().iter().map(|o| o.as_str()).collect();
    serde_json::to_string(&labels).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;

    QuestionDraft {
        id: row.try_get("id").map_err(ser)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        options,
        remark: row.try_get("remark").map_err(ser)?,
    }
    .validate()
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let session_id: uuid::Uuid = row.try_get("session_id").map_err(ser)?;
    let player = PlayerProfile::from_persisted(
        row.try_get("player_name").map_err(ser)?,
        row.try_get("player_city").map_err(ser)?,
        row.try_get("player_mobile").map_err(ser)?,
    );
    let score = i64_to_u64("score", row.try_get("score").map_err(ser)?)?;
    let total_questions = i64_to_u32(
        "total_questions",
        row.try_get("total_questions").map_err(ser)?,
    )?;
    let max_score = i64_to_u64("max_score", row.try_get("max_score").map_err(ser)?)?;
    let reason: String = row.try_get("reason").map_err(ser)?;

    let result = QuizResult::from_persisted(
        SessionId::from_uuid(session_id),
        player,
        score,
        total_questions,
        max_score,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("finished_at").map_err(ser)?,
        FinishReason::parse(&reason).map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(ResultRow::new(id, result))
}
