use std::error::Error;
use std::time::Duration;

use quiz_core::model::{Answer, PlayerProfile, Question, QuizResult};
use quiz_core::timer::format_mm_ss;
use services::{
    FinishedGame, GameError, GameEvent, GameLoopService, GameService, SubmissionStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of player input during a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Select(Answer),
    SelectAndSubmit(Answer),
    Submit,
    Flip,
    Quit,
    Help,
}

impl Input {
    /// `y`/`n` pick YES/NO, any other text picks that option label, and a
    /// trailing `!` submits right away.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "" => return None,
            "s" => return Some(Self::Submit),
            "f" => return Some(Self::Flip),
            "q" => return Some(Self::Quit),
            "?" | "h" => return Some(Self::Help),
            _ => {}
        }

        let (label, submit) = match raw.strip_suffix('!') {
            Some(label) => (label, true),
            None => (raw, false),
        };
        let answer = match label.to_ascii_lowercase().as_str() {
            "y" => Answer::yes(),
            "n" => Answer::no(),
            _ => Answer::parse(label).ok()?,
        };
        Some(if submit {
            Self::SelectAndSubmit(answer)
        } else {
            Self::Select(answer)
        })
    }
}

fn print_help() {
    println!("  y / n      select YES / NO (or type an option label)");
    println!("  y! / n!    select and submit");
    println!("  s          submit the selected answer");
    println!("  f          flip the question (once per game)");
    println!("  q          quit with the current score");
}

fn print_question(game: &GameService) {
    let Some(question) = game.session().current_question() else {
        return;
    };
    let progress = game.session().progress();
    println!();
    println!(
        "Question {}/{}  score {}  time left {}",
        progress.number,
        progress.total,
        progress.score,
        game.countdown().format_mm_ss()
    );
    println!("{}", question.prompt());
    println!("  options: {}", options_line(question));
}

fn options_line(question: &Question) -> String {
    question
        .options()
        .iter()
        .map(Answer::as_str)
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Apply one input. Returns the result once the game has finished.
fn handle_input(game: &mut GameService, input: Input) -> Result<Option<QuizResult>, GameError> {
    let event = match input {
        Input::Help => {
            print_help();
            return Ok(None);
        }
        Input::Select(answer) => game.select(answer)?,
        Input::SelectAndSubmit(answer) => {
            game.select(answer)?;
            game.submit()?
        }
        Input::Submit => game.submit()?,
        Input::Flip => game.use_helper()?,
        Input::Quit => game.quit()?,
    };

    match event {
        GameEvent::AnswerSelected(answer) => println!("  selected {answer}, press s to submit"),
        GameEvent::Advanced { score, .. } => {
            println!("  correct! score {score}");
            print_question(game);
        }
        GameEvent::Flipped { .. } => {
            println!("  question flipped");
            print_question(game);
        }
        GameEvent::Finished(result) => return Ok(Some(result)),
        GameEvent::Started { .. } | GameEvent::Tick { .. } => {}
    }
    Ok(None)
}

/// Run one interactive game on stdin/stdout and record its result.
///
/// # Errors
///
/// Returns an error if questions cannot be loaded, stdin fails, or the result
/// cannot be recorded locally.
pub async fn play(
    game_loop: &GameLoopService,
    player: PlayerProfile,
) -> Result<(), Box<dyn Error>> {
    let mut game = game_loop.start_game(player).await?;

    println!(
        "{} questions, {} points each, {} on the clock. Type ? for help.",
        game.session().total_questions(),
        game.session().rules().points_per_question(),
        game.countdown().format_mm_ss()
    );
    print_question(&game);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    let result = loop {
        tokio::select! {
            _ = interval.tick() => match game.tick()? {
                Some(GameEvent::Tick { remaining_secs }) => {
                    if remaining_secs <= 10 || remaining_secs % 60 == 0 {
                        println!("  {} left", format_mm_ss(remaining_secs));
                    }
                }
                Some(GameEvent::Finished(result)) => {
                    println!("  time is up!");
                    break result;
                }
                _ => {}
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let GameEvent::Finished(result) = game.quit()? else {
                        continue;
                    };
                    break result;
                };
                let Some(input) = Input::parse(&line) else {
                    println!("  unrecognised input, type ? for help");
                    continue;
                };
                match handle_input(&mut game, input) {
                    Ok(Some(result)) => break result,
                    Ok(None) => {}
                    Err(err) if matches!(err, GameError::Session(_)) => println!("  ! {err}"),
                    Err(err) => return Err(err.into()),
                }
            }
        }
    };

    let missed = game.session().missed_question().cloned();
    let finished = game_loop.finish(result).await?;
    print_summary(&finished, missed.as_ref());
    Ok(())
}

/// What the player is told about the question they got wrong.
fn missed_lines(question: &Question) -> Vec<String> {
    let mut lines = vec![
        format!("  {}", question.prompt()),
        format!("  correct answer: {}", question.correct_answer()),
    ];
    if let Some(remark) = question.remark() {
        lines.push(format!("  {remark}"));
    }
    lines
}

fn print_summary(finished: &FinishedGame, missed: Option<&Question>) {
    let result = &finished.result;
    let performance = result.performance();
    println!();
    println!("Game over ({})", result.reason().as_str().replace('_', " "));
    if let Some(question) = missed {
        for line in missed_lines(question) {
            println!("{line}");
        }
    }
    println!(
        "  score {} / {}  ({}%)",
        result.score(),
        result.max_score(),
        result.percentage()
    );
    println!(
        "  time {}",
        format_mm_ss(u32::try_from(result.elapsed_secs()).unwrap_or(u32::MAX))
    );
    println!("  {}: {}", performance.title(), performance.message());
    println!("  {}", result.score_band().message());

    for id in &finished.newly_unlocked {
        println!("  achievement unlocked: {} ({})", id.title(), id.description());
    }

    match &finished.submission {
        SubmissionStatus::Submitted => println!("  result submitted to the leaderboard"),
        SubmissionStatus::Failed(reason) => {
            println!("  could not submit result ({reason}); it is saved locally");
        }
        SubmissionStatus::Skipped => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse(" s "), Some(Input::Submit));
        assert_eq!(Input::parse("F"), Some(Input::Flip));
        assert_eq!(Input::parse("q"), Some(Input::Quit));
        assert_eq!(Input::parse("?"), Some(Input::Help));
        assert_eq!(Input::parse("   "), None);
    }

    #[test]
    fn parses_answers() {
        assert_eq!(Input::parse("y"), Some(Input::Select(Answer::yes())));
        assert_eq!(Input::parse("N!"), Some(Input::SelectAndSubmit(Answer::no())));
        assert_eq!(
            Input::parse("maybe"),
            Some(Input::Select(Answer::parse("MAYBE").unwrap()))
        );
        assert_eq!(Input::parse("!"), None);
    }

    #[test]
    fn missed_question_shows_answer_and_remark() {
        let question = QuestionDraft::yes_no("7", "Spiders are insects.", "no")
            .with_remark("They are arachnids.")
            .validate()
            .unwrap();
        assert_eq!(
            missed_lines(&question),
            vec![
                "  Spiders are insects.".to_owned(),
                "  correct answer: NO".to_owned(),
                "  They are arachnids.".to_owned(),
            ]
        );

        let bare = QuestionDraft::yes_no("8", "Is water wet?", "YES")
            .validate()
            .unwrap();
        assert_eq!(missed_lines(&bare).len(), 2);
    }
}
