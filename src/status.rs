use chrono::{DateTime, Utc};

use crate::events::{goal_tally, parse_timeline};
use crate::model::{CanonicalLiveMatch, Game, GameStatus, GameUpdate, LiveStatus, Sport};
use crate::providers::format_period;

pub const FINAL_PERIOD: &str = "FT";

#[derive(Debug, Clone, PartialEq)]
pub enum FeedStep {
    Update(GameUpdate),
    PreMatchNoise,
    /// Provider says finished but gives no score; the game is parked as stale.
    ScorelessFinish(GameUpdate),
    NoChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockStep {
    Update(GameUpdate),
    /// Past the cutoff with no score from anywhere; waits for an operator.
    StaleCoverageGap(GameUpdate),
    NoChange,
}

pub fn feed_step(game: &Game, live: &CanonicalLiveMatch) -> FeedStep {
    if live.status == LiveStatus::Live && !live.has_score() && live.elapsed.is_none() {
        return FeedStep::PreMatchNoise;
    }

    // A game finished without a score still takes its final score.
    let filling_score = game.status == GameStatus::Finished
        && game.final_score().is_none()
        && live.status == LiveStatus::Finished
        && live.has_score();
    if game.status.is_terminal() && !filling_score {
        return FeedStep::NoChange;
    }

    let target = live.status.as_game_status();
    if !filling_score && !game.status.can_transition_to(target) {
        return FeedStep::NoChange;
    }

    let (home_score, away_score) = if live.has_score() {
        (live.home_score, live.away_score)
    } else if live.status == LiveStatus::Live && !live.timeline.is_empty() {
        let events = parse_timeline(&live.timeline);
        let (h, a) = goal_tally(&events, &game.home_team, &game.away_team);
        (Some(h), Some(a))
    } else {
        (game.home_score, game.away_score)
    };

    let current_period = match (target, live.elapsed.clone()) {
        (GameStatus::Finished, None) => Some(FINAL_PERIOD.to_string()),
        (_, Some(text)) => Some(text),
        (_, None) => game.current_period.clone(),
    };

    let update = GameUpdate {
        status: target,
        home_score,
        away_score,
        current_period,
    };
    if target == GameStatus::Finished && (home_score.is_none() || away_score.is_none()) {
        return FeedStep::ScorelessFinish(update);
    }
    if is_same(game, &update) {
        return FeedStep::NoChange;
    }
    FeedStep::Update(update)
}

pub fn clock_step(game: &Game, now: DateTime<Utc>, cutoff_minutes: i64) -> ClockStep {
    if game.status.is_terminal() {
        return ClockStep::NoChange;
    }
    let elapsed = (now - game.scheduled_at).num_minutes();
    if elapsed <= 0 {
        return ClockStep::NoChange;
    }

    if elapsed >= cutoff_minutes {
        let update = GameUpdate {
            status: GameStatus::Finished,
            home_score: game.home_score,
            away_score: game.away_score,
            current_period: Some(FINAL_PERIOD.to_string()),
        };
        if game.final_score().is_none() {
            return ClockStep::StaleCoverageGap(update);
        }
        return ClockStep::Update(update);
    }

    let update = GameUpdate {
        status: GameStatus::Live,
        home_score: game.home_score,
        away_score: game.away_score,
        current_period: Some(clock_period(game.sport, elapsed as u32)),
    };
    if is_same(game, &update) {
        return ClockStep::NoChange;
    }
    ClockStep::Update(update)
}

pub fn clock_period(sport: Sport, minutes: u32) -> String {
    match sport {
        Sport::Soccer => match minutes {
            0..=45 => format_period(sport, 1, Some(minutes), None),
            46..=50 => "Halftime".to_string(),
            51..=90 => format_period(sport, 2, Some(minutes - 45), None),
            _ => format_period(sport, 3, Some(minutes - 90), None),
        },
        Sport::Basketball => segment_period(sport, minutes, 12, 4),
        Sport::AmericanFootball => segment_period(sport, minutes, 15, 4),
        Sport::Hockey => segment_period(sport, minutes, 20, 3),
    }
}

fn segment_period(sport: Sport, minutes: u32, length: u32, segments: u32) -> String {
    let index = minutes.div_ceil(length).clamp(1, segments);
    let within = match minutes % length {
        0 => length,
        rem => rem,
    };
    format_period(sport, index, Some(within), None)
}

fn is_same(game: &Game, update: &GameUpdate) -> bool {
    game.status == update.status
        && game.home_score == update.home_score
        && game.away_score == update.away_score
        && game.current_period == update.current_period
}
