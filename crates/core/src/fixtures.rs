//! Bundled question set used when no backend is configured or reachable.

use crate::model::{Question, QuestionDraft, QuestionError};

#[must_use]
pub fn sample_drafts() -> Vec<QuestionDraft> {
    vec![
        QuestionDraft::yes_no("1", "The Pacific is the largest ocean on Earth.", "YES")
            .with_remark("It covers roughly a third of the planet's surface."),
        QuestionDraft::yes_no("2", "Spiders are insects.", "NO")
            .with_remark("Spiders are arachnids: eight legs, two body segments."),
        QuestionDraft::yes_no("3", "Light travels faster than sound.", "YES")
            .with_remark("Which is why lightning is seen before thunder is heard."),
        QuestionDraft::yes_no("4", "The Great Wall of China is visible from the Moon.", "NO")
            .with_remark("It is far too narrow to be seen with the naked eye from that distance."),
        QuestionDraft::yes_no("5", "Water boils at a lower temperature at high altitude.", "YES")
            .with_remark("Lower air pressure lowers the boiling point."),
    ]
}

/// The bundled questions, validated.
///
/// # Errors
///
/// Returns `QuestionError` if a bundled draft fails validation.
pub fn sample_questions() -> Result<Vec<Question>, QuestionError> {
    sample_drafts()
        .into_iter()
        .map(QuestionDraft::validate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_questions_validate() {
        let questions = sample_questions().unwrap();
        assert_eq!(questions.len(), 5);
        assert!(questions.iter().all(|q| q.remark().is_some()));
    }
}
