use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Game, GameStatus, Market, Pick, PickResult, Sport};

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern"));
static SIGNED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]\d+(?:\.\d+)?").expect("signed number pattern"));
static OVER_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(over|under)\b|^[ou]\s?\d").expect("over/under pattern"));
static NO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bno\b").expect("no pattern"));

const WIN_MARKERS: &[&str] = &[
    "draw no bet",
    "(dnb)",
    "dnb",
    "moneyline",
    "to win",
    "win",
    "ml",
];
const NOISE_TOKENS: &[&str] = &["fc", "cf", "sc", "afc", "the"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy)]
pub struct Scoreline<'a> {
    pub sport: Sport,
    pub home_team: &'a str,
    pub away_team: &'a str,
    pub home: i32,
    pub away: i32,
}

impl<'a> Scoreline<'a> {
    pub fn from_game(game: &'a Game) -> Option<Self> {
        let (home, away) = game.final_score()?;
        Some(Self {
            sport: game.sport,
            home_team: &game.home_team,
            away_team: &game.away_team,
            home,
            away,
        })
    }

    fn side_scores(&self, side: Side) -> (i32, i32) {
        match side {
            Side::Home => (self.home, self.away),
            Side::Away => (self.away, self.home),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoubleChance {
    Favoring(Side),
    NoDraw,
}

/// `None` keeps the pick pending.
pub fn settle_pick(game: &Game, pick: &Pick) -> Option<PickResult> {
    match game.status {
        GameStatus::Cancelled => Some(PickResult::Push),
        GameStatus::Finished => {
            let score = Scoreline::from_game(game)?;
            classify(&score, &pick.pick, pick.market())
        }
        GameStatus::Upcoming | GameStatus::Live => None,
    }
}

pub fn classify(score: &Scoreline<'_>, text: &str, market: Option<Market>) -> Option<PickResult> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    match market {
        Some(market) => classify_market(score, &lowered, market),
        None => classify_text(score, &lowered),
    }
}

fn classify_market(score: &Scoreline<'_>, t: &str, market: Market) -> Option<PickResult> {
    match market {
        Market::H2h => {
            if is_plain_draw(t) {
                return Some(draw_result(score));
            }
            win_rule(score, t)
        }
        Market::DoubleChance => double_chance_rule(score, t),
        Market::Totals(line) => {
            let over = if t.contains("under") || t.starts_with('u') {
                false
            } else if t.contains("over") || t.starts_with('o') {
                true
            } else {
                return None;
            };
            Some(totals_result(score, line, over))
        }
        Market::Btts => Some(btts_result(score, !NO_RE.is_match(t))),
        Market::Spread(value) => {
            let side = side_of(score, t).unwrap_or(Side::Home);
            Some(spread_result(score, side, value))
        }
    }
}

fn classify_text(score: &Scoreline<'_>, t: &str) -> Option<PickResult> {
    if let Some(result) = win_rule(score, t) {
        return Some(result);
    }
    if is_plain_draw(t) {
        return Some(draw_result(score));
    }
    if let Some(result) = double_chance_rule(score, t) {
        return Some(result);
    }
    if OVER_UNDER_RE.is_match(t) {
        let line = NUMBER_RE.find(t)?.as_str().parse::<f64>().ok()?;
        let over = !(t.contains("under") || t.starts_with('u'));
        return Some(totals_result(score, line, over));
    }
    if t.contains("btts") || t.contains("both teams to score") || t.contains("both teams score") {
        return Some(btts_result(score, !NO_RE.is_match(t)));
    }
    if let Some(found) = SIGNED_RE.find(t) {
        let value = found.as_str().parse::<f64>().ok()?;
        let side = side_of(score, t).unwrap_or(Side::Home);
        return Some(spread_result(score, side, value));
    }
    None
}

/// "Home win", "Everton to win", "Celtics ML", "Man City (DNB)" or a bare team name.
fn win_rule(score: &Scoreline<'_>, t: &str) -> Option<PickResult> {
    let mut name = t.trim().to_string();
    let mut draw_refunds = false;
    let mut moneyline = false;
    loop {
        let Some(marker) = WIN_MARKERS
            .iter()
            .find(|m| name == **m || name.ends_with(&format!(" {m}")))
        else {
            break;
        };
        match *marker {
            "draw no bet" | "(dnb)" | "dnb" => draw_refunds = true,
            "moneyline" | "ml" => moneyline = true,
            _ => {}
        }
        name = name[..name.len() - marker.len()].trim().to_string();
    }

    let side = match name.as_str() {
        "home" | "1" => Side::Home,
        "away" | "2" => Side::Away,
        "" => return None,
        other => {
            if same_team(other, score.home_team) {
                Side::Home
            } else if same_team(other, score.away_team) {
                Side::Away
            } else {
                return None;
            }
        }
    };

    let (mine, theirs) = score.side_scores(side);
    Some(if mine > theirs {
        PickResult::Win
    } else if mine == theirs && (draw_refunds || (moneyline && score.sport != Sport::Soccer)) {
        PickResult::Push
    } else {
        PickResult::Loss
    })
}

fn is_plain_draw(t: &str) -> bool {
    matches!(
        normalize(t).as_str(),
        "draw" | "x" | "tie" | "the draw" | "match drawn" | "draw tie"
    )
}

fn draw_result(score: &Scoreline<'_>) -> PickResult {
    if score.home == score.away {
        PickResult::Win
    } else {
        PickResult::Loss
    }
}

fn double_chance_rule(score: &Scoreline<'_>, t: &str) -> Option<PickResult> {
    let chance = double_chance_of(score, t)?;
    let won = match chance {
        DoubleChance::Favoring(side) => {
            let (mine, theirs) = score.side_scores(side);
            mine >= theirs
        }
        DoubleChance::NoDraw => score.home != score.away,
    };
    Some(if won { PickResult::Win } else { PickResult::Loss })
}

fn double_chance_of(score: &Scoreline<'_>, t: &str) -> Option<DoubleChance> {
    let n = normalize(t);
    match n.as_str() {
        "1x" | "home or draw" | "home draw" | "draw or home" => {
            return Some(DoubleChance::Favoring(Side::Home));
        }
        "x2" | "away or draw" | "away draw" | "draw or away" => {
            return Some(DoubleChance::Favoring(Side::Away));
        }
        "12" | "home or away" | "either team to win" => return Some(DoubleChance::NoDraw),
        _ => {}
    }
    if !(n.contains("or draw") || n.contains("draw or") || n.contains("double chance")) {
        return None;
    }
    let name = n
        .replace("double chance", " ")
        .replace("or draw", " ")
        .replace("draw or", " ");
    let name = name.trim();
    if name == "home" || same_team(name, score.home_team) {
        Some(DoubleChance::Favoring(Side::Home))
    } else if name == "away" || same_team(name, score.away_team) {
        Some(DoubleChance::Favoring(Side::Away))
    } else {
        None
    }
}

fn totals_result(score: &Scoreline<'_>, line: f64, over: bool) -> PickResult {
    let total = f64::from(score.home + score.away);
    if total == line {
        return PickResult::Push;
    }
    if (total > line) == over {
        PickResult::Win
    } else {
        PickResult::Loss
    }
}

fn btts_result(score: &Scoreline<'_>, yes: bool) -> PickResult {
    let both = score.home > 0 && score.away > 0;
    if both == yes {
        PickResult::Win
    } else {
        PickResult::Loss
    }
}

fn spread_result(score: &Scoreline<'_>, side: Side, value: f64) -> PickResult {
    let (mine, theirs) = score.side_scores(side);
    let adjusted = f64::from(mine) + value;
    let theirs = f64::from(theirs);
    if adjusted > theirs {
        PickResult::Win
    } else if adjusted == theirs {
        PickResult::Push
    } else {
        PickResult::Loss
    }
}

fn side_of(score: &Scoreline<'_>, t: &str) -> Option<Side> {
    let without_numbers = SIGNED_RE.replace_all(t, " ");
    let without_numbers = NUMBER_RE.replace_all(&without_numbers, " ");
    let cleaned = normalize(&without_numbers)
        .split_whitespace()
        .filter(|w| {
            !matches!(
                *w,
                "spread" | "handicap" | "ah" | "line" | "ats" | "pts" | "points" | "goals"
            )
        })
        .collect::<Vec<_>>()
        .join(" ");
    match cleaned.as_str() {
        "" => return None,
        "home" => return Some(Side::Home),
        "away" => return Some(Side::Away),
        _ => {}
    }
    if same_team(&cleaned, score.home_team) {
        Some(Side::Home)
    } else if same_team(&cleaned, score.away_team) {
        Some(Side::Away)
    } else {
        None
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| !NOISE_TOKENS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

// Words pair in order when equal or when one abbreviates the other ("man" / "manchester").
pub fn same_team(pick_name: &str, team: &str) -> bool {
    let pick = normalize(pick_name);
    let team = normalize(team);
    if pick.is_empty() || team.is_empty() {
        return false;
    }
    if pick == team {
        return true;
    }
    let pick_words = pick.split_whitespace().collect::<Vec<_>>();
    let team_words = team.split_whitespace().collect::<Vec<_>>();
    if pair_in_order(&pick_words, &team_words).is_some() {
        return true;
    }
    match pair_in_order(&team_words, &pick_words) {
        Some(leftover) => leftover
            .iter()
            .all(|w| w.chars().all(char::is_alphabetic) && !MARKET_WORDS.contains(w)),
        None => false,
    }
}

const MARKET_WORDS: &[&str] = &[
    "or", "draw", "over", "under", "win", "to", "yes", "no", "btts", "and", "x", "dnb", "ml",
];

fn pair_in_order<'a>(needles: &[&str], haystack: &[&'a str]) -> Option<Vec<&'a str>> {
    let mut leftover = Vec::new();
    let mut rest = haystack.iter();
    for needle in needles {
        loop {
            let candidate = rest.next()?;
            if words_pair(needle, candidate) {
                break;
            }
            leftover.push(*candidate);
        }
    }
    leftover.extend(rest.copied());
    Some(leftover)
}

fn words_pair(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 3 && long.starts_with(short)
}
