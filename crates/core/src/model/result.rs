use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::ids::SessionId;
use crate::model::player::PlayerProfile;
use crate::time::elapsed_secs;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("score {score} exceeds maximum {max}")]
    ScoreExceedsMax { score: u64, max: u64 },

    #[error("unknown finish reason: {0}")]
    UnknownReason(String),
}

//
// ─── FINISH REASON ────────────────────────────────────────────────────────────
//

/// Why a session reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// Every question was answered correctly.
    Completed,
    /// A wrong answer ended the game.
    WrongAnswer,
    /// The countdown ran out.
    TimeExpired,
    /// The player walked away.
    Quit,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::WrongAnswer => "wrong_answer",
            FinishReason::TimeExpired => "time_expired",
            FinishReason::Quit => "quit",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::UnknownReason` for unrecognised values.
    pub fn parse(raw: &str) -> Result<Self, ResultError> {
        match raw {
            "completed" => Ok(FinishReason::Completed),
            "wrong_answer" => Ok(FinishReason::WrongAnswer),
            "time_expired" => Ok(FinishReason::TimeExpired),
            "quit" => Ok(FinishReason::Quit),
            other => Err(ResultError::UnknownReason(other.to_owned())),
        }
    }
}

//
// ─── PERCENTAGE ───────────────────────────────────────────────────────────────
//

/// `round(score / max × 100)`, rounding halves up. Zero when `max` is zero.
#[must_use]
pub fn percentage(score: u64, max: u64) -> u32 {
    if max == 0 {
        return 0;
    }
    let score = u128::from(score.min(max));
    let max = u128::from(max);
    let rounded = (score * 200 + max) / (2 * max);
    u32::try_from(rounded).unwrap_or(100)
}

//
// ─── RESULT ───────────────────────────────────────────────────────────────────
//

/// Immutable summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    session_id: SessionId,
    player: PlayerProfile,
    score: u64,
    total_questions: u32,
    max_score: u64,
    percentage: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    reason: FinishReason,
}

impl QuizResult {
    /// Build a result, deriving the percentage from `score` and `max_score`.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::InvalidTimeRange` if `finished_at < started_at` and
    /// `ResultError::ScoreExceedsMax` if the score is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        player: PlayerProfile,
        score: u64,
        total_questions: u32,
        max_score: u64,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        reason: FinishReason,
    ) -> Result<Self, ResultError> {
        if finished_at < started_at {
            return Err(ResultError::InvalidTimeRange);
        }
        if score > max_score {
            return Err(ResultError::ScoreExceedsMax {
                score,
                max: max_score,
            });
        }

        Ok(Self {
            session_id,
            player,
            score,
            total_questions,
            max_score,
            percentage: percentage(score, max_score),
            started_at,
            finished_at,
            reason,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn player(&self) -> &PlayerProfile {
        &self.player
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn max_score(&self) -> u64 {
        self.max_score
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        elapsed_secs(self.started_at, self.finished_at)
    }

    #[must_use]
    pub fn reason(&self) -> FinishReason {
        self.reason
    }

    /// Calendar date (UTC) the session finished on.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.finished_at.date_naive()
    }

    #[must_use]
    pub fn performance(&self) -> Performance {
        Performance::from_percentage(self.percentage)
    }

    #[must_use]
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

//
// ─── FEEDBACK ─────────────────────────────────────────────────────────────────
//

/// Feedback tier keyed on the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Performance {
    KeepTrying,
    NotBad,
    GoodJob,
    Excellent,
    Outstanding,
}

impl Performance {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Performance::Outstanding,
            80..=89 => Performance::Excellent,
            70..=79 => Performance::GoodJob,
            50..=69 => Performance::NotBad,
            _ => Performance::KeepTrying,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Performance::Outstanding => "Outstanding!",
            Performance::Excellent => "Excellent!",
            Performance::GoodJob => "Good Job!",
            Performance::NotBad => "Not Bad!",
            Performance::KeepTrying => "Keep Trying!",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Performance::Outstanding => "Perfect performance! You're a quiz master!",
            Performance::Excellent => "Great job! You really know your stuff!",
            Performance::GoodJob => "Well done! You're on the right track!",
            Performance::NotBad => "Keep practicing, you're getting better!",
            Performance::KeepTrying => "Practice makes perfect! Don't give up!",
        }
    }
}

/// Closing message band keyed on the raw game score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    Encouragement,
}

impl ScoreBand {
    #[must_use]
    pub fn from_score(score: u64) -> Self {
        if score >= 50_000 {
            ScoreBand::Excellent
        } else if score >= 25_000 {
            ScoreBand::Good
        } else {
            ScoreBand::Encouragement
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Congratulations! Outstanding performance!",
            ScoreBand::Good => "Good performance!",
            ScoreBand::Encouragement => "Best wishes for next time!",
        }
    }
}
