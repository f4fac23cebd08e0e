use chrono::{TimeZone, Utc};

use pickwire::model::{BetType, Game, GameStatus, Market, Pick, PickResult, Sport};
use pickwire::settlement::{Scoreline, classify, settle_pick};

fn soccer(home: i32, away: i32) -> Scoreline<'static> {
    Scoreline {
        sport: Sport::Soccer,
        home_team: "Man City",
        away_team: "Everton",
        home,
        away,
    }
}

fn basketball(home: i32, away: i32) -> Scoreline<'static> {
    Scoreline {
        sport: Sport::Basketball,
        home_team: "Boston Celtics",
        away_team: "Los Angeles Lakers",
        home,
        away,
    }
}

fn text(score: Scoreline<'_>, pick: &str) -> Option<PickResult> {
    classify(&score, pick, None)
}

#[test]
fn team_name_win_picks() {
    assert_eq!(text(soccer(3, 1), "Manchester City to Win"), Some(PickResult::Win));
    assert_eq!(text(soccer(3, 1), "Man City"), Some(PickResult::Win));
    assert_eq!(text(soccer(3, 1), "Everton to win"), Some(PickResult::Loss));
    assert_eq!(text(soccer(0, 2), "Away Win"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 0), "home win"), Some(PickResult::Win));
}

#[test]
fn strict_win_pick_loses_on_a_tie() {
    assert_eq!(text(soccer(1, 1), "Home Win"), Some(PickResult::Loss));
    assert_eq!(text(soccer(1, 1), "Man City ML"), Some(PickResult::Loss));
}

#[test]
fn tie_pushes_where_the_market_refunds_a_draw() {
    assert_eq!(text(soccer(1, 1), "Man City (DNB)"), Some(PickResult::Push));
    assert_eq!(text(soccer(1, 1), "Everton draw no bet"), Some(PickResult::Push));
    assert_eq!(
        text(basketball(100, 100), "Boston Celtics ML"),
        Some(PickResult::Push)
    );
}

#[test]
fn draw_picks() {
    assert_eq!(text(soccer(1, 1), "Draw"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 1), "draw"), Some(PickResult::Loss));
    assert_eq!(text(soccer(0, 0), "X"), Some(PickResult::Win));
}

#[test]
fn double_chance_picks() {
    assert_eq!(text(soccer(1, 1), "1X"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 1), "X2"), Some(PickResult::Loss));
    assert_eq!(text(soccer(0, 1), "Man City or Draw"), Some(PickResult::Loss));
    assert_eq!(text(soccer(1, 1), "Everton or Draw"), Some(PickResult::Win));
    assert_eq!(text(soccer(1, 1), "12"), Some(PickResult::Loss));
    assert_eq!(text(soccer(0, 1), "12"), Some(PickResult::Win));
}

#[test]
fn totals_push_exactly_on_the_line() {
    assert_eq!(text(soccer(2, 1), "Over 2.5"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 1), "Under 3"), Some(PickResult::Push));
    assert_eq!(text(soccer(2, 1), "Over 3"), Some(PickResult::Push));
    assert_eq!(text(soccer(2, 1), "Over 3.5 Goals"), Some(PickResult::Loss));
    assert_eq!(text(soccer(0, 1), "U2.5"), Some(PickResult::Win));
}

#[test]
fn both_teams_to_score() {
    assert_eq!(text(soccer(2, 1), "BTTS - Yes"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 0), "BTTS No"), Some(PickResult::Win));
    assert_eq!(text(soccer(2, 0), "Both Teams To Score"), Some(PickResult::Loss));
    assert_eq!(text(soccer(1, 1), "btts: no"), Some(PickResult::Loss));
}

#[test]
fn spreads_apply_to_the_named_side() {
    assert_eq!(text(basketball(110, 100), "Celtics -8.5"), Some(PickResult::Win));
    assert_eq!(text(basketball(105, 100), "Celtics -8.5"), Some(PickResult::Loss));
    assert_eq!(text(basketball(110, 100), "Lakers +3.5"), Some(PickResult::Loss));
    assert_eq!(text(basketball(103, 100), "Home -3"), Some(PickResult::Push));
}

#[test]
fn unrecognised_text_stays_pending() {
    assert_eq!(text(soccer(3, 1), "Anytime scorer: Haaland"), None);
    assert_eq!(text(soccer(3, 1), ""), None);
    assert_eq!(text(soccer(3, 1), "Arsenal to win"), None);
}

#[test]
fn structured_market_takes_precedence_over_text() {
    let score = soccer(2, 1);
    assert_eq!(classify(&score, "Over 2.5", None), Some(PickResult::Win));
    assert_eq!(
        classify(&score, "Over 2.5", Some(Market::Totals(3.5))),
        Some(PickResult::Loss)
    );
    assert_eq!(
        classify(&score, "Over", Some(Market::Totals(3.0))),
        Some(PickResult::Push)
    );
}

#[test]
fn structured_markets() {
    let score = soccer(3, 1);
    assert_eq!(classify(&score, "Everton", Some(Market::H2h)), Some(PickResult::Loss));
    assert_eq!(classify(&score, "Draw", Some(Market::H2h)), Some(PickResult::Loss));
    assert_eq!(
        classify(&score, "Man City", Some(Market::Spread(-1.5))),
        Some(PickResult::Win)
    );
    assert_eq!(
        classify(&soccer(1, 0), "No", Some(Market::Btts)),
        Some(PickResult::Win)
    );
    assert_eq!(
        classify(&soccer(1, 1), "X2", Some(Market::DoubleChance)),
        Some(PickResult::Win)
    );
    assert_eq!(classify(&score, "Total", Some(Market::Totals(2.5))), None);
}

fn game(status: GameStatus, home: Option<i32>, away: Option<i32>) -> Game {
    Game {
        id: 1,
        sport: Sport::Soccer,
        home_team: "Man City".to_string(),
        away_team: "Everton".to_string(),
        league: "Premier League".to_string(),
        scheduled_at: Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap(),
        status,
        home_score: home,
        away_score: away,
        current_period: None,
        stale: false,
    }
}

fn pick(text: &str, bet_type: Option<BetType>, line: Option<f64>) -> Pick {
    Pick {
        id: 1,
        bundle_id: 1,
        game_id: 1,
        pick: text.to_string(),
        odds: 1.5,
        bet_type,
        line,
        result: None,
    }
}

#[test]
fn settle_pick_depends_on_game_state() {
    let p = pick("Manchester City to Win", None, None);
    assert_eq!(
        settle_pick(&game(GameStatus::Finished, Some(3), Some(1)), &p),
        Some(PickResult::Win)
    );
    assert_eq!(
        settle_pick(&game(GameStatus::Cancelled, None, None), &p),
        Some(PickResult::Push)
    );
    assert_eq!(settle_pick(&game(GameStatus::Finished, None, None), &p), None);
    assert_eq!(settle_pick(&game(GameStatus::Live, Some(3), Some(1)), &p), None);
}

#[test]
fn settle_pick_uses_stored_line() {
    let finished = game(GameStatus::Finished, Some(2), Some(1));
    let with_line = pick("Over", Some(BetType::Totals), Some(3.0));
    assert_eq!(settle_pick(&finished, &with_line), Some(PickResult::Push));
    let without_line = pick("Over 2.5", Some(BetType::Totals), None);
    assert_eq!(settle_pick(&finished, &without_line), Some(PickResult::Win));
}

#[test]
fn settlement_is_idempotent() {
    let finished = game(GameStatus::Finished, Some(2), Some(2));
    for text in ["Draw", "Over 3.5", "BTTS Yes", "Man City -1", "Home Win"] {
        let p = pick(text, None, None);
        assert_eq!(settle_pick(&finished, &p), settle_pick(&finished, &p), "{text}");
    }
}
