/// Scoring and timing knobs for one kind of game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    points_per_question: u32,
    time_limit_secs: u32,
}

impl GameRules {
    pub const DEFAULT_POINTS_PER_QUESTION: u32 = 5000;
    pub const DEFAULT_TIME_LIMIT_SECS: u32 = 600;

    #[must_use]
    pub fn new(points_per_question: u32, time_limit_secs: u32) -> Self {
        Self {
            points_per_question: points_per_question.max(1),
            time_limit_secs,
        }
    }

    /// Rules of the daily quiz form: two points per correct answer.
    #[must_use]
    pub fn daily() -> Self {
        Self::new(2, Self::DEFAULT_TIME_LIMIT_SECS)
    }

    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = secs;
        self
    }

    #[must_use]
    pub fn points_per_question(&self) -> u32 {
        self.points_per_question
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// Highest reachable score for `question_count` questions.
    #[must_use]
    pub fn max_score(&self, question_count: usize) -> u64 {
        let count = u64::try_from(question_count).unwrap_or(u64::MAX);
        count.saturating_mul(u64::from(self.points_per_question))
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_POINTS_PER_QUESTION,
            Self::DEFAULT_TIME_LIMIT_SECS,
        )
    }
}
