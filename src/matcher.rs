use tracing::warn;

use crate::model::{CanonicalLiveMatch, Game};

pub fn name_prefix(name: &str, chars: usize) -> String {
    name.trim().to_lowercase().chars().take(chars).collect()
}

/// Either name contains the other's truncated prefix (case-insensitive).
pub fn teams_match(a: &str, b: &str, prefix_chars: usize) -> bool {
    let pa = name_prefix(a, prefix_chars);
    let pb = name_prefix(b, prefix_chars);
    if pa.is_empty() || pb.is_empty() {
        return false;
    }
    let la = a.trim().to_lowercase();
    let lb = b.trim().to_lowercase();
    lb.contains(&pa) || la.contains(&pb)
}

fn fixture_matches(live: &CanonicalLiveMatch, game: &Game, prefix_chars: usize) -> bool {
    game.sport == live.sport
        && teams_match(&live.home_team, &game.home_team, prefix_chars)
        && teams_match(&live.away_team, &game.away_team, prefix_chars)
}

/// `games` must already be limited to games referenced by active bundles.
pub fn find_game<'a>(
    live: &CanonicalLiveMatch,
    games: &'a [Game],
    prefix_chars: usize,
) -> Option<&'a Game> {
    let same_league = |g: &&Game| {
        live.league
            .as_deref()
            .is_some_and(|league| league.trim() == g.league.trim())
    };
    let mut candidates: Vec<&Game> = games
        .iter()
        .filter(|g| fixture_matches(live, g, prefix_chars))
        .collect();
    if candidates.iter().any(same_league) {
        candidates.retain(same_league);
    }
    if candidates.len() > 1 {
        warn!(
            provider = %live.provider,
            home = %live.home_team,
            away = %live.away_team,
            candidates = candidates.len(),
            "ambiguous fixture match"
        );
        if let Some(kickoff) = live.kickoff {
            return candidates
                .into_iter()
                .min_by_key(|g| (g.scheduled_at - kickoff).num_seconds().abs());
        }
    }
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameStatus, LiveStatus, Sport};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap()
    }

    fn game(id: i64, sport: Sport, league: &str, scheduled_at: DateTime<Utc>) -> Game {
        Game {
            id,
            sport,
            home_team: "Manchester City".to_string(),
            away_team: "Everton".to_string(),
            league: league.to_string(),
            scheduled_at,
            status: GameStatus::Upcoming,
            home_score: None,
            away_score: None,
            current_period: None,
            stale: false,
        }
    }

    fn live(sport: Sport, league: Option<&str>, at: Option<DateTime<Utc>>) -> CanonicalLiveMatch {
        CanonicalLiveMatch {
            provider: "api_sports".to_string(),
            external_id: "1".to_string(),
            sport,
            league: league.map(str::to_string),
            home_team: "Manchester City FC".to_string(),
            away_team: "Everton".to_string(),
            home_score: Some(1),
            away_score: Some(0),
            status: LiveStatus::Live,
            elapsed: Some("First Half - 12'".to_string()),
            kickoff: at,
            timeline: Vec::new(),
            stats: None,
        }
    }

    #[test]
    fn same_league_candidate_wins() {
        let games = vec![
            game(1, Sport::Soccer, "Premier League", kickoff()),
            game(2, Sport::Soccer, "FA Cup", kickoff() + Duration::days(3)),
        ];
        let hit = find_game(&live(Sport::Soccer, Some("FA Cup"), Some(kickoff())), &games, 15);
        assert_eq!(hit.map(|g| g.id), Some(2));
    }

    #[test]
    fn unknown_league_falls_back_to_any_league() {
        let games = vec![game(7, Sport::Soccer, "Premier League", kickoff())];
        let hit = find_game(&live(Sport::Soccer, Some("England - Premier"), None), &games, 15);
        assert_eq!(hit.map(|g| g.id), Some(7));
        let hit = find_game(&live(Sport::Soccer, None, None), &games, 15);
        assert_eq!(hit.map(|g| g.id), Some(7));
    }

    #[test]
    fn nearest_kickoff_breaks_ties() {
        let games = vec![
            game(1, Sport::Soccer, "Premier League", kickoff() - Duration::days(7)),
            game(2, Sport::Soccer, "Premier League", kickoff()),
            game(3, Sport::Soccer, "Premier League", kickoff() + Duration::days(7)),
        ];
        let at = kickoff() + Duration::minutes(5);
        let hit = find_game(&live(Sport::Soccer, Some("Premier League"), Some(at)), &games, 15);
        assert_eq!(hit.map(|g| g.id), Some(2));
    }

    #[test]
    fn ambiguity_without_kickoff_takes_the_first() {
        let games = vec![
            game(4, Sport::Soccer, "Premier League", kickoff() + Duration::days(7)),
            game(5, Sport::Soccer, "Premier League", kickoff()),
        ];
        let hit = find_game(&live(Sport::Soccer, Some("Premier League"), None), &games, 15);
        assert_eq!(hit.map(|g| g.id), Some(4));
    }

    #[test]
    fn other_sports_never_match() {
        let games = vec![game(1, Sport::Soccer, "Premier League", kickoff())];
        assert!(find_game(&live(Sport::Hockey, Some("Premier League"), None), &games, 15).is_none());
        assert!(find_game(&live(Sport::Soccer, None, None), &[], 15).is_none());
    }

    #[test]
    fn prefix_containment() {
        assert!(teams_match("Manchester United FC", "Manchester United", 15));
        assert!(teams_match("Everton", "Everton FC", 15));
        assert!(!teams_match("Everton", "Arsenal", 15));
        assert!(!teams_match("", "Arsenal", 15));
    }
}
