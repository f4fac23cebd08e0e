use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Soccer,
    Basketball,
    Hockey,
    AmericanFootball,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::Soccer,
        Sport::Basketball,
        Sport::Hockey,
        Sport::AmericanFootball,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sport::Soccer => "soccer",
            Sport::Basketball => "basketball",
            Sport::Hockey => "hockey",
            Sport::AmericanFootball => "american_football",
        }
    }

    pub fn parse(raw: &str) -> Option<Sport> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "soccer" | "football_soccer" => Some(Sport::Soccer),
            "basketball" | "nba" => Some(Sport::Basketball),
            "hockey" | "ice_hockey" | "nhl" => Some(Sport::Hockey),
            "american_football" | "nfl" | "football" => Some(Sport::AmericanFootball),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Upcoming,
    Live,
    Finished,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Upcoming => "UPCOMING",
            GameStatus::Live => "LIVE",
            GameStatus::Finished => "FINISHED",
            GameStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<GameStatus> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UPCOMING" => Some(GameStatus::Upcoming),
            "LIVE" => Some(GameStatus::Live),
            "FINISHED" => Some(GameStatus::Finished),
            "CANCELLED" => Some(GameStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Finished | GameStatus::Cancelled)
    }

    fn rank(self) -> u8 {
        match self {
            GameStatus::Upcoming => 0,
            GameStatus::Live => 1,
            GameStatus::Finished | GameStatus::Cancelled => 2,
        }
    }

    /// Forward-only lifecycle. Staying put is allowed; terminal states never move.
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub current_period: Option<String>,
    /// Past the clock cutoff with no score from any provider; waits for an operator.
    #[serde(default)]
    pub stale: bool,
}

impl Game {
    pub fn final_score(&self) -> Option<(i32, i32)> {
        Some((self.home_score?, self.away_score?))
    }
}

/// Fields written by one upsert. `None` scores clear nothing; they mean "no score known".
#[derive(Debug, Clone, PartialEq)]
pub struct GameUpdate {
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub current_period: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickResult {
    Win,
    Loss,
    Push,
}

impl PickResult {
    pub fn as_str(self) -> &'static str {
        match self {
            PickResult::Win => "WIN",
            PickResult::Loss => "LOSS",
            PickResult::Push => "PUSH",
        }
    }

    pub fn parse(raw: &str) -> Option<PickResult> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WIN" => Some(PickResult::Win),
            "LOSS" => Some(PickResult::Loss),
            "PUSH" => Some(PickResult::Push),
            _ => None,
        }
    }
}

/// Legacy market tag stored next to a pick. Older rows carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BetType {
    H2h,
    DoubleChance,
    Totals,
    Btts,
    Spread,
}

impl BetType {
    pub fn as_str(self) -> &'static str {
        match self {
            BetType::H2h => "h2h",
            BetType::DoubleChance => "doubleChance",
            BetType::Totals => "totals",
            BetType::Btts => "btts",
            BetType::Spread => "spread",
        }
    }

    pub fn parse(raw: &str) -> Option<BetType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "h2h" | "moneyline" => Some(BetType::H2h),
            "doublechance" | "double_chance" => Some(BetType::DoubleChance),
            "totals" | "over_under" => Some(BetType::Totals),
            "btts" => Some(BetType::Btts),
            "spread" | "handicap" => Some(BetType::Spread),
            _ => None,
        }
    }
}

/// Structured market a pick settles against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Market {
    H2h,
    DoubleChance,
    Totals(f64),
    Btts,
    Spread(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub id: i64,
    pub bundle_id: i64,
    pub game_id: i64,
    pub pick: String,
    pub odds: f64,
    pub bet_type: Option<BetType>,
    /// Totals line or spread value for picks created with a structured market.
    pub line: Option<f64>,
    pub result: Option<PickResult>,
}

impl Pick {
    /// Structured market when the row carries enough to build one. Totals and
    /// spreads without a stored line fall back to the text.
    pub fn market(&self) -> Option<Market> {
        match self.bet_type? {
            BetType::H2h => Some(Market::H2h),
            BetType::DoubleChance => Some(Market::DoubleChance),
            BetType::Btts => Some(Market::Btts),
            BetType::Totals => self.line.map(Market::Totals),
            BetType::Spread => self.line.map(Market::Spread),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub pending: u32,
    pub actual_return: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: i64,
    pub name: String,
    pub expected_return: f64,
    pub active: bool,
    pub picks: Vec<Pick>,
    pub performance: Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    NotStarted,
    Live,
    Finished,
    Cancelled,
}

impl LiveStatus {
    pub fn as_game_status(self) -> GameStatus {
        match self {
            LiveStatus::NotStarted => GameStatus::Upcoming,
            LiveStatus::Live => GameStatus::Live,
            LiveStatus::Finished => GameStatus::Finished,
            LiveStatus::Cancelled => GameStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possession: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shots_on_target: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fouls: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yellow_cards: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_cards: Option<u32>,
}

impl SideStats {
    pub fn is_empty(&self) -> bool {
        *self == SideStats::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub home: SideStats,
    pub away: SideStats,
}

/// One provider's view of a fixture, in the shape every provider agrees on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLiveMatch {
    pub provider: String,
    pub external_id: String,
    pub sport: Sport,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: LiveStatus,
    /// Period/clock descriptor, e.g. "Second Half - 63'".
    pub elapsed: Option<String>,
    pub kickoff: Option<DateTime<Utc>>,
    pub timeline: Vec<String>,
    pub stats: Option<MatchStats>,
}

impl CanonicalLiveMatch {
    pub fn has_score(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_forward_only() {
        use GameStatus::*;
        assert!(Upcoming.can_transition_to(Live));
        assert!(Live.can_transition_to(Finished));
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(Live.can_transition_to(Live));
        assert!(!Live.can_transition_to(Upcoming));
        assert!(!Finished.can_transition_to(Live));
        assert!(!Finished.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Finished));
    }

    #[test]
    fn market_needs_line_for_totals_and_spread() {
        let mut pick = Pick {
            id: 1,
            bundle_id: 1,
            game_id: 1,
            pick: "Over 2.5".to_string(),
            odds: 1.9,
            bet_type: Some(BetType::Totals),
            line: None,
            result: None,
        };
        assert_eq!(pick.market(), None);
        pick.line = Some(2.5);
        assert_eq!(pick.market(), Some(Market::Totals(2.5)));
        pick.bet_type = None;
        assert_eq!(pick.market(), None);
    }

    #[test]
    fn sport_aliases() {
        assert_eq!(Sport::parse("Ice Hockey"), Some(Sport::Hockey));
        assert_eq!(Sport::parse("american-football"), Some(Sport::AmericanFootball));
        assert_eq!(Sport::parse("curling"), None);
    }
}
