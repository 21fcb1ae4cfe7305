//! Single play-through of a timed question sequence.
//!
//! The session is a synchronous state machine, `NotStarted → InProgress → Finished`.
//! Only `reset` leaves `Finished`, and it lands in `NotStarted`. Time never comes from
//! inside: every transition that needs a timestamp takes it as an argument, and the
//! countdown lives with the caller, who reports expiry through [`QuizSession::expire_timer`].

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Answer, FinishReason, GameRules, PlayerProfile, Question, QuizResult, ResultError, SessionId,
};

//
// ─── PHASE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::NotStarted => "not started",
            Phase::InProgress => "in progress",
            Phase::Finished => "finished",
        })
    }
}

/// Operation names used in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Start,
    SelectAnswer,
    Submit,
    UseHelper,
    ExpireTimer,
    Quit,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionAction::Start => "start",
            SessionAction::SelectAnswer => "select an answer",
            SessionAction::Submit => "submit",
            SessionAction::UseHelper => "use the helper",
            SessionAction::ExpireTimer => "expire the timer",
            SessionAction::Quit => "quit",
        })
    }
}

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Rejected operations. None of these are fatal and none change the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions supplied")]
    EmptyContent,

    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition { action: SessionAction, phase: Phase },

    #[error("no answer selected")]
    NoPendingAnswer,

    #[error("helper already used")]
    HelperExhausted,

    #[error("no alternate question available")]
    NoAlternateQuestion,

    #[error("{answer} is not an option for the current question")]
    UnknownOption { answer: Answer },

    #[error(transparent)]
    Result(#[from] ResultError),
}

impl SessionError {
    /// True for conditions the UI should show as a warning rather than a state problem.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SessionError::NoPendingAnswer
                | SessionError::HelperExhausted
                | SessionError::NoAlternateQuestion
                | SessionError::UnknownOption { .. }
        )
    }
}

//
// ─── HELPER STRATEGY ──────────────────────────────────────────────────────────
//

/// Chooses the question the "flip question" helper jumps to.
///
/// Implementations return an index strictly greater than `current` and below
/// `total`, or `None` when no alternate exists. Anything else is treated as `None`.
pub trait HelperStrategy: Send {
    fn alternate(&mut self, current: usize, total: usize) -> Option<usize>;
}

/// Moves to the next question in the sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextInSequence;

impl HelperStrategy for NextInSequence {
    fn alternate(&mut self, current: usize, total: usize) -> Option<usize> {
        let next = current + 1;
        (next < total).then_some(next)
    }
}

//
// ─── OUTCOMES ─────────────────────────────────────────────────────────────────
//

/// What happened after a successful `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Correct answer; the session moved on to `next_index`.
    Correct { score: u64, next_index: usize },
    /// The session finished, either by completing the last question or by a wrong answer.
    Finished(QuizResult),
}

/// Position within the session, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub number: usize,
    pub total: usize,
    pub score: u64,
    pub max_score: u64,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct SessionState {
    id: SessionId,
    questions: Vec<Question>,
    current: usize,
    score: u64,
    pending: Option<Answer>,
    helper_used: bool,
    phase: Phase,
    started_at: Option<DateTime<Utc>>,
    result: Option<QuizResult>,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            id: SessionId::generate(),
            questions: Vec::new(),
            current: 0,
            score: 0,
            pending: None,
            helper_used: false,
            phase: Phase::NotStarted,
            started_at: None,
            result: None,
        }
    }
}

/// One quiz game, owned by whoever drives the screen.
pub struct QuizSession {
    rules: GameRules,
    player: PlayerProfile,
    helper: Box<dyn HelperStrategy>,
    state: SessionState,
}

impl QuizSession {
    #[must_use]
    pub fn new(rules: GameRules, player: PlayerProfile) -> Self {
        Self {
            rules,
            player,
            helper: Box::new(NextInSequence),
            state: SessionState::fresh(),
        }
    }

    /// Swap the alternate-question policy used by [`Self::use_helper`].
    #[must_use]
    pub fn with_helper_strategy(mut self, helper: impl HelperStrategy + 'static) -> Self {
        self.helper = Box::new(helper);
        self
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.state.id
    }

    #[must_use]
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    #[must_use]
    pub fn player(&self) -> &PlayerProfile {
        &self.player
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.state.score
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.state.questions.len()
    }

    #[must_use]
    pub fn pending_answer(&self) -> Option<&Answer> {
        self.state.pending.as_ref()
    }

    #[must_use]
    pub fn helper_used(&self) -> bool {
        self.state.helper_used
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.started_at
    }

    /// The result, once the session has finished.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.state.result.as_ref()
    }

    /// The question being asked, only while in progress.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.state.phase != Phase::InProgress {
            return None;
        }
        self.state.questions.get(self.state.current)
    }

    /// The question that ended the game, when it ended on a wrong answer.
    #[must_use]
    pub fn missed_question(&self) -> Option<&Question> {
        let result = self.state.result.as_ref()?;
        if result.reason() != FinishReason::WrongAnswer {
            return None;
        }
        self.state.questions.get(self.state.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.state.questions.len();
        SessionProgress {
            number: (self.state.current + 1).min(total),
            total,
            score: self.state.score,
            max_score: self.rules.max_score(total),
        }
    }

    /// Begin the game with the supplied questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyContent` if `questions` is empty and
    /// `SessionError::InvalidTransition` unless the session is `NotStarted`.
    /// The session is unchanged in both cases.
    pub fn start(
        &mut self,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.require(SessionAction::Start, Phase::NotStarted)?;
        if questions.is_empty() {
            return Err(SessionError::EmptyContent);
        }

        self.state = SessionState {
            questions,
            phase: Phase::InProgress,
            started_at: Some(now),
            ..SessionState::fresh()
        };
        Ok(())
    }

    /// Pick an answer for the current question. Overwrites any earlier pick.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress` and
    /// `SessionError::UnknownOption` if the value is not one of the options.
    pub fn select_answer(&mut self, answer: Answer) -> Result<(), SessionError> {
        self.require(SessionAction::SelectAnswer, Phase::InProgress)?;
        let question = self.active_question(SessionAction::SelectAnswer)?;
        if !question.has_option(&answer) {
            return Err(SessionError::UnknownOption { answer });
        }
        self.state.pending = Some(answer);
        Ok(())
    }

    /// Check the pending answer against the current question.
    ///
    /// A correct answer adds the per-question points and either advances or, on the
    /// last question, finishes. A wrong answer finishes immediately with the score
    /// accumulated so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress` and
    /// `SessionError::NoPendingAnswer` when nothing is selected.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SubmitOutcome, SessionError> {
        self.require(SessionAction::Submit, Phase::InProgress)?;
        let Some(answer) = self.state.pending.as_ref() else {
            return Err(SessionError::NoPendingAnswer);
        };

        let correct = self
            .active_question(SessionAction::Submit)?
            .is_correct(answer);
        if !correct {
            let result = self.finish(now, FinishReason::WrongAnswer)?;
            return Ok(SubmitOutcome::Finished(result));
        }

        self.state.score = self
            .state
            .score
            .saturating_add(u64::from(self.rules.points_per_question()));

        if self.state.current + 1 >= self.state.questions.len() {
            let result = self.finish(now, FinishReason::Completed)?;
            return Ok(SubmitOutcome::Finished(result));
        }

        self.advance_to(self.state.current + 1);
        Ok(SubmitOutcome::Correct {
            score: self.state.score,
            next_index: self.state.current,
        })
    }

    /// Replace the current question once per session, without touching the score.
    ///
    /// Returns the index of the question now being asked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::HelperExhausted` on a second use,
    /// `SessionError::NoAlternateQuestion` when the strategy finds nothing to
    /// switch to (the helper stays available), and
    /// `SessionError::InvalidTransition` outside `InProgress`.
    pub fn use_helper(&mut self) -> Result<usize, SessionError> {
        self.require(SessionAction::UseHelper, Phase::InProgress)?;
        if self.state.helper_used {
            return Err(SessionError::HelperExhausted);
        }

        let current = self.state.current;
        let total = self.state.questions.len();
        let next = self
            .helper
            .alternate(current, total)
            .filter(|&idx| idx > current && idx < total)
            .ok_or(SessionError::NoAlternateQuestion)?;

        self.state.helper_used = true;
        self.advance_to(next);
        Ok(next)
    }

    /// The countdown reached zero: finish with the score so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress`.
    pub fn expire_timer(&mut self, now: DateTime<Utc>) -> Result<QuizResult, SessionError> {
        self.require(SessionAction::ExpireTimer, Phase::InProgress)?;
        self.finish(now, FinishReason::TimeExpired)
    }

    /// The player leaves early: finish with the score so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress`.
    pub fn quit(&mut self, now: DateTime<Utc>) -> Result<QuizResult, SessionError> {
        self.require(SessionAction::Quit, Phase::InProgress)?;
        self.finish(now, FinishReason::Quit)
    }

    /// Discard everything and return to `NotStarted`. Allowed from any phase.
    pub fn reset(&mut self) {
        self.state = SessionState::fresh();
    }

    fn require(&self, action: SessionAction, phase: Phase) -> Result<(), SessionError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.state.phase,
            })
        }
    }

    fn active_question(&self, action: SessionAction) -> Result<&Question, SessionError> {
        self.state
            .questions
            .get(self.state.current)
            .ok_or(SessionError::InvalidTransition {
                action,
                phase: self.state.phase,
            })
    }

    fn advance_to(&mut self, index: usize) {
        self.state.current = index;
        self.state.pending = None;
    }

    fn finish(
        &mut self,
        now: DateTime<Utc>,
        reason: FinishReason,
    ) -> Result<QuizResult, SessionError> {
        let started_at = self.state.started_at.unwrap_or(now);
        let finished_at = now.max(started_at);
        let total = self.state.questions.len();

        let result = QuizResult::from_persisted(
            self.state.id,
            self.player.clone(),
            self.state.score,
            u32::try_from(total).unwrap_or(u32::MAX),
            self.rules.max_score(total),
            started_at,
            finished_at,
            reason,
        )?;

        self.state.phase = Phase::Finished;
        self.state.pending = None;
        self.state.result = Some(result.clone());
        Ok(result)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.state.id)
            .field("phase", &self.state.phase)
            .field("questions_len", &self.state.questions.len())
            .field("current", &self.state.current)
            .field("score", &self.state.score)
            .field("helper_used", &self.state.helper_used)
            .field("started_at", &self.state.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionDraft;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn questions(answers: &[&str]) -> Vec<Question> {
        answers
            .iter()
            .enumerate()
            .map(|(i, a)| {
                QuestionDraft::yes_no(format!("{}", i + 1), format!("Q{}", i + 1), a)
                    .validate()
                    .unwrap()
            })
            .collect()
    }

    fn started(answers: &[&str]) -> QuizSession {
        let mut session = QuizSession::new(GameRules::default(), PlayerProfile::anonymous());
        session.start(questions(answers), fixed_now()).unwrap();
        session
    }

    fn answer(session: &mut QuizSession, value: Answer) -> SubmitOutcome {
        session.select_answer(value).unwrap();
        session.submit(fixed_now() + Duration::seconds(30)).unwrap()
    }

    #[test]
    fn two_right_then_wrong_scores_ten_thousand() {
        let mut session = started(&["YES", "NO", "YES"]);

        assert_eq!(
            answer(&mut session, Answer::yes()),
            SubmitOutcome::Correct {
                score: 5000,
                next_index: 1
            }
        );
        assert_eq!(
            answer(&mut session, Answer::no()),
            SubmitOutcome::Correct {
                score: 10_000,
                next_index: 2
            }
        );
        let SubmitOutcome::Finished(result) = answer(&mut session, Answer::no()) else {
            panic!("wrong answer must finish the session");
        };

        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(result.score(), 10_000);
        assert_eq!(result.percentage(), 67);
        assert_eq!(result.reason(), FinishReason::WrongAnswer);
        assert_eq!(result.elapsed_secs(), 30);
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn wrong_answer_on_first_question_finishes_immediately() {
        let mut session = started(&["YES", "YES", "YES"]);
        let SubmitOutcome::Finished(result) = answer(&mut session, Answer::no()) else {
            panic!("expected finish");
        };
        assert_eq!(result.score(), 0);
        assert_eq!(session.current_question(), None);
    }

    #[test]
    fn missed_question_is_the_one_answered_wrongly() {
        let mut session = started(&["YES", "NO", "YES"]);
        assert_eq!(session.missed_question(), None);

        answer(&mut session, Answer::yes());
        answer(&mut session, Answer::yes());

        let missed = session.missed_question().unwrap();
        assert_eq!(missed.prompt(), "Q2");
        assert_eq!(missed.correct_answer(), &Answer::no());
    }

    #[test]
    fn no_missed_question_after_completion_or_quit() {
        let mut session = started(&["NO"]);
        answer(&mut session, Answer::no());
        assert_eq!(session.missed_question(), None);

        let mut session = started(&["YES", "YES"]);
        session.quit(fixed_now()).unwrap();
        assert_eq!(session.missed_question(), None);

        session.reset();
        assert_eq!(session.missed_question(), None);
    }

    #[test]
    fn correct_final_answer_completes() {
        let mut session = started(&["NO"]);
        let SubmitOutcome::Finished(result) = answer(&mut session, Answer::no()) else {
            panic!("expected finish");
        };
        assert_eq!(result.reason(), FinishReason::Completed);
        assert_eq!(result.percentage(), 100);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn pending_answer_is_cleared_on_advance_and_overwritten_on_reselect() {
        let mut session = started(&["YES", "NO"]);
        session.select_answer(Answer::no()).unwrap();
        session.select_answer(Answer::yes()).unwrap();
        assert_eq!(session.pending_answer(), Some(&Answer::yes()));

        session.submit(fixed_now()).unwrap();
        assert_eq!(session.pending_answer(), None);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn submit_without_selection_is_rejected() {
        let mut session = started(&["YES"]);
        let err = session.submit(fixed_now()).unwrap_err();
        assert_eq!(err, SessionError::NoPendingAnswer);
        assert!(err.is_warning());
        assert_eq!(session.phase(), Phase::InProgress);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut session = started(&["YES"]);
        let err = session
            .select_answer(Answer::parse("maybe").unwrap())
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownOption { .. }));
        assert_eq!(session.pending_answer(), None);
    }

    #[test]
    fn empty_start_stays_not_started_and_submit_is_rejected() {
        let mut session = QuizSession::new(GameRules::default(), PlayerProfile::anonymous());
        assert_eq!(
            session.start(Vec::new(), fixed_now()),
            Err(SessionError::EmptyContent)
        );
        assert_eq!(session.phase(), Phase::NotStarted);

        let err = session.submit(fixed_now()).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                action: SessionAction::Submit,
                phase: Phase::NotStarted
            }
        );
    }

    #[test]
    fn helper_works_once() {
        let mut session = started(&["YES", "NO", "YES"]);
        assert_eq!(session.use_helper().unwrap(), 1);
        assert!(session.helper_used());

        let before = (session.score(), session.current_index());
        assert_eq!(session.use_helper(), Err(SessionError::HelperExhausted));
        assert!(session.helper_used());
        assert_eq!((session.score(), session.current_index()), before);
    }

    #[test]
    fn helper_on_last_question_is_not_consumed() {
        let mut session = started(&["YES"]);
        assert_eq!(session.use_helper(), Err(SessionError::NoAlternateQuestion));
        assert!(!session.helper_used());
    }

    #[test]
    fn helper_clears_pending_answer() {
        let mut session = started(&["YES", "NO"]);
        session.select_answer(Answer::yes()).unwrap();
        session.use_helper().unwrap();
        assert_eq!(session.pending_answer(), None);
    }

    #[test]
    fn out_of_range_strategy_is_treated_as_no_alternate() {
        struct Backwards;
        impl HelperStrategy for Backwards {
            fn alternate(&mut self, _current: usize, _total: usize) -> Option<usize> {
                Some(0)
            }
        }

        let mut session = QuizSession::new(GameRules::default(), PlayerProfile::anonymous())
            .with_helper_strategy(Backwards);
        session
            .start(questions(&["YES", "NO"]), fixed_now())
            .unwrap();
        assert_eq!(session.use_helper(), Err(SessionError::NoAlternateQuestion));
    }

    #[test]
    fn timer_expiry_keeps_accumulated_score() {
        let mut session = started(&["YES", "YES"]);
        answer(&mut session, Answer::yes());
        let result = session
            .expire_timer(fixed_now() + Duration::seconds(600))
            .unwrap();
        assert_eq!(result.score(), 5000);
        assert_eq!(result.reason(), FinishReason::TimeExpired);
        assert_eq!(result.elapsed_secs(), 600);

        assert!(matches!(
            session.expire_timer(fixed_now()),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn quit_finishes_with_current_score() {
        let mut session = started(&["YES", "YES"]);
        answer(&mut session, Answer::yes());
        let result = session.quit(fixed_now()).unwrap();
        assert_eq!(result.reason(), FinishReason::Quit);
        assert_eq!(result.score(), 5000);
    }

    #[test]
    fn finished_session_requires_reset_before_restart() {
        let mut session = started(&["YES"]);
        answer(&mut session, Answer::no());

        let err = session.start(questions(&["YES"]), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));

        let old_id = session.id();
        session.reset();
        assert_eq!(session.phase(), Phase::NotStarted);
        assert_eq!(session.result(), None);
        assert_eq!(session.total_questions(), 0);
        assert_ne!(session.id(), old_id);

        session.start(questions(&["YES"]), fixed_now()).unwrap();
        assert!(!session.helper_used());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn start_while_in_progress_is_rejected() {
        let mut session = started(&["YES"]);
        let err = session.start(questions(&["NO"]), fixed_now()).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                action: SessionAction::Start,
                phase: Phase::InProgress
            }
        );
    }

    #[test]
    fn score_is_bounded_by_max_for_any_path() {
        let answers = ["YES", "NO", "YES", "NO"];
        for wrong_at in 0..=answers.len() {
            let mut session = started(&answers);
            for (i, expected) in answers.iter().enumerate() {
                if session.phase() == Phase::Finished {
                    break;
                }
                let value = if i == wrong_at {
                    if *expected == "YES" { Answer::no() } else { Answer::yes() }
                } else {
                    Answer::parse(expected).unwrap()
                };
                answer(&mut session, value);
            }
            let result = session.result().unwrap();
            assert_eq!(result.score() % 5000, 0);
            assert!(result.score() <= session.rules().max_score(answers.len()));
        }
    }
}
