use chrono::Duration;

use quiz_core::model::{Answer, GameRules, PlayerProfile, Question, QuizResult};
use quiz_core::session::{HelperStrategy, Phase, QuizSession, SubmitOutcome};
use quiz_core::timer::{Countdown, Tick};

use crate::Clock;
use crate::error::GameError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// What a game action produced, for the front-end to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Started { total: usize, time_limit_secs: u32 },
    AnswerSelected(Answer),
    Advanced { score: u64, next_index: usize },
    Flipped { index: usize },
    Tick { remaining_secs: u32 },
    /// Emitted once per game, whichever way it ended.
    Finished(QuizResult),
}

//
// ─── GAME ──────────────────────────────────────────────────────────────────────
//

/// One running game: the session state machine plus its countdown and clock.
///
/// The countdown lives here rather than in the session so the session stays a
/// pure state machine driven by caller-supplied timestamps.
#[derive(Debug)]
pub struct GameService {
    clock: Clock,
    session: QuizSession,
    countdown: Countdown,
}

impl GameService {
    #[must_use]
    pub fn new(rules: GameRules, player: PlayerProfile, clock: Clock) -> Self {
        Self {
            clock,
            countdown: Countdown::new(rules.time_limit_secs()),
            session: QuizSession::new(rules, player),
        }
    }

    #[must_use]
    pub fn with_helper_strategy(mut self, helper: impl HelperStrategy + 'static) -> Self {
        self.session = self.session.with_helper_strategy(helper);
        self
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Start the game and arm a fresh countdown.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Session` if the session rejects the start.
    pub fn start(&mut self, questions: Vec<Question>) -> Result<GameEvent, GameError> {
        self.session.start(questions, self.clock.now())?;
        let time_limit_secs = self.session.rules().time_limit_secs();
        self.countdown = Countdown::new(time_limit_secs);

        tracing::info!(
            session = %self.session.id(),
            questions = self.session.total_questions(),
            time_limit_secs,
            "game started"
        );
        Ok(GameEvent::Started {
            total: self.session.total_questions(),
            time_limit_secs,
        })
    }

    /// # Errors
    ///
    /// Returns `GameError::Session` if the selection is rejected.
    pub fn select(&mut self, answer: Answer) -> Result<GameEvent, GameError> {
        self.session.select_answer(answer.clone())?;
        Ok(GameEvent::AnswerSelected(answer))
    }

    /// # Errors
    ///
    /// Returns `GameError::Session` if nothing is selected or the game is not running.
    pub fn submit(&mut self) -> Result<GameEvent, GameError> {
        match self.session.submit(self.clock.now())? {
            SubmitOutcome::Correct { score, next_index } => {
                tracing::debug!(score, next_index, "correct answer");
                Ok(GameEvent::Advanced { score, next_index })
            }
            SubmitOutcome::Finished(result) => Ok(self.finished(result)),
        }
    }

    /// # Errors
    ///
    /// Returns `GameError::Session` if the helper is spent or has nowhere to go.
    pub fn use_helper(&mut self) -> Result<GameEvent, GameError> {
        let index = self.session.use_helper()?;
        tracing::debug!(index, "question flipped");
        Ok(GameEvent::Flipped { index })
    }

    /// # Errors
    ///
    /// Returns `GameError::Session` if the game is not running.
    pub fn quit(&mut self) -> Result<GameEvent, GameError> {
        let result = self.session.quit(self.clock.now())?;
        Ok(self.finished(result))
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` when no game is running. A fixed clock is moved forward
    /// along with the countdown so elapsed times stay consistent.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Session` if the expiry cannot be applied.
    pub fn tick(&mut self) -> Result<Option<GameEvent>, GameError> {
        if self.session.phase() != Phase::InProgress {
            return Ok(None);
        }

        self.clock.advance(Duration::seconds(1));
        match self.countdown.tick() {
            Tick::Running { remaining_secs } => Ok(Some(GameEvent::Tick { remaining_secs })),
            Tick::Expired => {
                let result = self.session.expire_timer(self.clock.now())?;
                Ok(Some(self.finished(result)))
            }
            Tick::Idle => Ok(None),
        }
    }

    /// Back to a fresh, not-started game with the same rules and player.
    pub fn reset(&mut self) {
        self.session.reset();
        self.countdown = Countdown::new(self.session.rules().time_limit_secs());
    }

    fn finished(&mut self, result: QuizResult) -> GameEvent {
        self.countdown.stop();
        tracing::info!(
            session = %result.session_id(),
            score = result.score(),
            percentage = result.percentage(),
            reason = result.reason().as_str(),
            "game finished"
        );
        GameEvent::Finished(result)
    }
}
