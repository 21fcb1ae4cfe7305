use std::fmt;

use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("answer label cannot be empty")]
    EmptyAnswer,

    #[error("correct answer {answer} is not one of the options")]
    AnswerNotInOptions { answer: Answer },
}

//
// ─── ANSWER ───────────────────────────────────────────────────────────────────
//

/// A normalized option label (trimmed and upper-cased).
///
/// Labels compare case-insensitively through normalization, so `"yes"` and
/// `" YES "` are the same answer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Answer(String);

impl Answer {
    pub const YES: &'static str = "YES";
    pub const NO: &'static str = "NO";

    /// Parses and normalizes an option label.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyAnswer` if the label is blank.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn yes() -> Self {
        Self(Self::YES.to_owned())
    }

    #[must_use]
    pub fn no() -> Self {
        Self(Self::NO.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Answer({})", self.0)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// Unvalidated question as received from a content provider.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub id: String,
    pub prompt: String,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub remark: Option<String>,
}

impl QuestionDraft {
    #[must_use]
    pub fn yes_no(id: impl Into<String>, prompt: impl Into<String>, correct: &str) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            correct_answer: correct.to_owned(),
            options: Vec::new(),
            remark: None,
        }
    }

    #[must_use]
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    /// Validates the draft into an immutable `Question`.
    ///
    /// Options default to `YES`/`NO` when none are given; duplicates are dropped
    /// while keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or any label is blank, or if the
    /// correct answer is not among the options.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let correct = Answer::parse(&self.correct_answer)?;

        let mut options: Vec<Answer> = Vec::with_capacity(self.options.len().max(2));
        if self.options.is_empty() {
            options.push(Answer::yes());
            options.push(Answer::no());
        } else {
            for raw in &self.options {
                let option = Answer::parse(raw)?;
                if !options.contains(&option) {
                    options.push(option);
                }
            }
        }

        if !options.contains(&correct) {
            return Err(QuestionError::AnswerNotInOptions { answer: correct });
        }

        let remark = self
            .remark
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty());

        Ok(Question {
            id: QuestionId::new(self.id.trim()),
            prompt,
            correct,
            options,
            remark,
        })
    }
}

/// A read-only question used during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    correct: Answer,
    options: Vec<Answer>,
    remark: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn correct_answer(&self) -> &Answer {
        &self.correct
    }

    #[must_use]
    pub fn options(&self) -> &[Answer] {
        &self.options
    }

    #[must_use]
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, answer: &Answer) -> bool {
        self.options.contains(answer)
    }

    #[must_use]
    pub fn is_correct(&self, answer: &Answer) -> bool {
        &self.correct == answer
    }

    /// Converts back into a draft, e.g. for persistence.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id.as_str().to_owned(),
            prompt: self.prompt.clone(),
            correct_answer: self.correct.as_str().to_owned(),
            options: self.options.iter().map(|o| o.as_str().to_owned()).collect(),
            remark: self.remark.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_question_gets_default_options() {
        let q = QuestionDraft::yes_no("1", "Is water wet?", "yes")
            .validate()
            .unwrap();
        assert_eq!(q.options(), &[Answer::yes(), Answer::no()]);
        assert!(q.is_correct(&Answer::parse(" Yes ").unwrap()));
        assert!(!q.is_correct(&Answer::no()));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let err = QuestionDraft::yes_no("1", "   ", "YES")
            .validate()
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let draft = QuestionDraft {
            id: "7".into(),
            prompt: "Pick a colour".into(),
            correct_answer: "green".into(),
            options: vec!["red".into(), "blue".into()],
            remark: None,
        };
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, QuestionError::AnswerNotInOptions { .. }));
    }

    #[test]
    fn duplicate_options_collapse_and_blank_remark_is_dropped() {
        let draft = QuestionDraft {
            id: "8".into(),
            prompt: "Pick".into(),
            correct_answer: "a".into(),
            options: vec!["A".into(), "a ".into(), "b".into()],
            remark: Some("  ".into()),
        };
        let q = draft.validate().unwrap();
        assert_eq!(q.options().len(), 2);
        assert_eq!(q.remark(), None);
    }

    #[test]
    fn blank_answer_label_is_rejected() {
        assert_eq!(Answer::parse(" "), Err(QuestionError::EmptyAnswer));
        assert_eq!(Answer::parse("no").unwrap().as_str(), "NO");
    }
}
