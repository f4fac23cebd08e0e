use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::blocking::Client;
use serde_json::Value;

use super::{
    LiveProvider, as_i32_any, as_u32_any, format_period, leading_minute, parse_json_root,
    percent_value, pick_string, timeline_line,
};
use crate::http_client::fetch_body;
use crate::model::{CanonicalLiveMatch, LiveStatus, MatchStats, SideStats, Sport};

const PROVIDER: &str = "api_sports";
const KEY_HEADER: &str = "x-apisports-key";

pub struct ApiSportsAdapter {
    client: Client,
    api_key: Option<String>,
}

impl ApiSportsAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    fn get(&self, url: &str) -> Result<String> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(anyhow::anyhow!("API_SPORTS_KEY missing"));
        };
        fetch_body(&self.client, url, &[(KEY_HEADER, key)])
    }
}

impl LiveProvider for ApiSportsAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn serves(&self, _sport: Sport) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, sport: Sport, day: NaiveDate) -> Result<Vec<CanonicalLiveMatch>> {
        let date = day.format("%Y-%m-%d");
        let base = match sport {
            Sport::Soccer => return self.fetch_soccer(day),
            Sport::Basketball => "https://v1.basketball.api-sports.io",
            Sport::Hockey => "https://v1.hockey.api-sports.io",
            Sport::AmericanFootball => "https://v1.american-football.api-sports.io",
        };
        let body = self.get(&format!("{base}/games?date={date}&timezone=UTC"))?;
        parse_api_sports_json(&body, sport)
    }
}

impl ApiSportsAdapter {
    fn fetch_soccer(&self, day: NaiveDate) -> Result<Vec<CanonicalLiveMatch>> {
        // Only the live endpoint carries events and statistics; the dated
        // list fills in finished fixtures.
        let live = self.get("https://v3.football.api-sports.io/fixtures?live=all")?;
        let mut out = parse_api_sports_json(&live, Sport::Soccer)?;
        let dated = self.get(&format!(
            "https://v3.football.api-sports.io/fixtures?date={}&timezone=UTC",
            day.format("%Y-%m-%d")
        ))?;
        let seen: HashSet<String> = out.iter().map(|m| m.external_id.clone()).collect();
        out.extend(
            parse_api_sports_json(&dated, Sport::Soccer)?
                .into_iter()
                .filter(|m| !seen.contains(&m.external_id)),
        );
        Ok(out)
    }
}

pub fn parse_api_sports_json(raw: &str, sport: Sport) -> Result<Vec<CanonicalLiveMatch>> {
    let root = parse_json_root(raw)?;
    let Some(list) = root.get("response").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };
    Ok(list
        .iter()
        .filter_map(|entry| match sport {
            Sport::Soccer => parse_soccer_fixture(entry),
            Sport::AmericanFootball => parse_football_game(entry),
            Sport::Basketball | Sport::Hockey => parse_game(entry, sport),
        })
        .collect())
}

fn parse_soccer_fixture(v: &Value) -> Option<CanonicalLiveMatch> {
    let fixture = v.get("fixture")?;
    let id = fixture.get("id").and_then(super::as_string)?;
    let status = fixture.get("status").unwrap_or(&Value::Null);
    let short = pick_string(status, &["short"]).unwrap_or_default();
    let elapsed = status.get("elapsed").and_then(as_u32_any);
    let extra = status.get("extra").and_then(as_u32_any);

    let (home_team, away_team) = team_names(v)?;
    let goals = v.get("goals").unwrap_or(&Value::Null);

    let timeline = v
        .get("events")
        .and_then(|e| e.as_array())
        .map(|events| events.iter().filter_map(render_event).collect())
        .unwrap_or_default();

    Some(CanonicalLiveMatch {
        provider: PROVIDER.to_string(),
        external_id: id,
        sport: Sport::Soccer,
        league: v.get("league").and_then(|l| pick_string(l, &["name"])),
        home_team,
        away_team,
        home_score: goals.get("home").and_then(as_i32_any),
        away_score: goals.get("away").and_then(as_i32_any),
        status: classify_status(&short),
        elapsed: period_text(Sport::Soccer, &short, elapsed, extra),
        kickoff: fixture.get("date").and_then(|d| d.as_str()).and_then(parse_rfc3339),
        timeline,
        stats: v.get("statistics").and_then(parse_statistics),
    })
}

fn parse_game(v: &Value, sport: Sport) -> Option<CanonicalLiveMatch> {
    let id = v.get("id").and_then(super::as_string)?;
    let status = v.get("status").unwrap_or(&Value::Null);
    let short = pick_string(status, &["short"]).unwrap_or_default();
    let minute = pick_string(status, &["timer"]).and_then(|t| leading_minute(&t));
    let (home_team, away_team) = team_names(v)?;
    let scores = v.get("scores").unwrap_or(&Value::Null);

    Some(CanonicalLiveMatch {
        provider: PROVIDER.to_string(),
        external_id: id,
        sport,
        league: v.get("league").and_then(|l| pick_string(l, &["name"])),
        home_team,
        away_team,
        home_score: scores.get("home").and_then(side_total),
        away_score: scores.get("away").and_then(side_total),
        status: classify_status(&short),
        elapsed: period_text(sport, &short, minute, None),
        kickoff: v.get("date").and_then(|d| d.as_str()).and_then(parse_rfc3339),
        timeline: Vec::new(),
        stats: None,
    })
}

fn parse_football_game(v: &Value) -> Option<CanonicalLiveMatch> {
    let game = v.get("game")?;
    let id = game.get("id").and_then(super::as_string)?;
    let status = game.get("status").unwrap_or(&Value::Null);
    let short = pick_string(status, &["short"]).unwrap_or_default();
    let minute = pick_string(status, &["timer"]).and_then(|t| leading_minute(&t));
    let (home_team, away_team) = team_names(v)?;
    let scores = v.get("scores").unwrap_or(&Value::Null);
    let kickoff = game
        .get("date")
        .and_then(|d| d.get("timestamp"))
        .and_then(|t| t.as_i64())
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

    Some(CanonicalLiveMatch {
        provider: PROVIDER.to_string(),
        external_id: id,
        sport: Sport::AmericanFootball,
        league: v.get("league").and_then(|l| pick_string(l, &["name"])),
        home_team,
        away_team,
        home_score: scores.get("home").and_then(side_total),
        away_score: scores.get("away").and_then(side_total),
        status: classify_status(&short),
        elapsed: period_text(Sport::AmericanFootball, &short, minute, None),
        kickoff,
        timeline: Vec::new(),
        stats: None,
    })
}

fn team_names(v: &Value) -> Option<(String, String)> {
    let teams = v.get("teams")?;
    let home = teams.get("home").and_then(|t| pick_string(t, &["name"]))?;
    let away = teams.get("away").and_then(|t| pick_string(t, &["name"]))?;
    Some((home, away))
}

/// Basketball and football nest the running total; hockey reports a bare number.
fn side_total(v: &Value) -> Option<i32> {
    if v.is_object() {
        return v.get("total").and_then(as_i32_any);
    }
    as_i32_any(v)
}

fn classify_status(short: &str) -> LiveStatus {
    match short.trim().to_ascii_uppercase().as_str() {
        "" | "NS" | "TBD" => LiveStatus::NotStarted,
        "FT" | "AET" | "PEN" | "AOT" | "AP" => LiveStatus::Finished,
        "PST" | "CANC" | "ABD" | "AWD" | "WO" => LiveStatus::Cancelled,
        _ => LiveStatus::Live,
    }
}

fn period_text(sport: Sport, short: &str, minute: Option<u32>, extra: Option<u32>) -> Option<String> {
    let code = short.trim().to_ascii_uppercase();
    let text = match code.as_str() {
        "" | "NS" | "TBD" => return None,
        "HT" => "Halftime".to_string(),
        "BT" => "Break".to_string(),
        "P" => "Penalties".to_string(),
        "PT" => "Shootout".to_string(),
        "FT" | "AET" | "PEN" | "AOT" | "AP" => "FT".to_string(),
        "PST" | "CANC" | "ABD" | "AWD" | "WO" => code.clone(),
        "1H" => format_period(sport, 1, minute, extra),
        "2H" => format_period(sport, 2, minute, extra),
        "ET" => format_period(sport, 3, minute, extra),
        "OT" => {
            let period = if sport == Sport::Hockey { 4 } else { 5 };
            format_period(sport, period, minute, None)
        }
        other => {
            let quarter = other
                .strip_prefix('Q')
                .or_else(|| other.strip_prefix('P'))
                .and_then(|n| n.parse::<u32>().ok());
            match (quarter, minute) {
                (Some(q), _) => format_period(sport, q, minute, None),
                (None, Some(m)) => format!("{m}'"),
                (None, None) => return None,
            }
        }
    };
    Some(text)
}

fn render_event(v: &Value) -> Option<String> {
    let time = v.get("time")?;
    let minute = time.get("elapsed").and_then(as_u32_any)?;
    let added = time.get("extra").and_then(as_u32_any);
    let team = v.get("team").and_then(|t| pick_string(t, &["name"]))?;
    let kind = pick_string(v, &["type"]).unwrap_or_default();
    let detail = pick_string(v, &["detail"]).unwrap_or_else(|| kind.clone());
    let lowered = detail.to_ascii_lowercase();
    let detail = if kind.eq_ignore_ascii_case("subst") {
        "Substitution".to_string()
    } else if kind.eq_ignore_ascii_case("goal") {
        if lowered.contains("missed") {
            return None;
        }
        if lowered.contains("goal") {
            detail
        } else {
            format!("{detail} Goal")
        }
    } else {
        detail
    };
    if detail.is_empty() {
        return None;
    }
    Some(timeline_line(minute, added, &detail, &team))
}

fn parse_statistics(v: &Value) -> Option<MatchStats> {
    let sides = v.as_array()?;
    let home = sides.first().map(parse_side_stats).unwrap_or_default();
    let away = sides.get(1).map(parse_side_stats).unwrap_or_default();
    if home.is_empty() && away.is_empty() {
        return None;
    }
    Some(MatchStats { home, away })
}

fn parse_side_stats(v: &Value) -> SideStats {
    let mut out = SideStats::default();
    let Some(list) = v.get("statistics").and_then(|s| s.as_array()) else {
        return out;
    };
    for stat in list {
        let Some(kind) = pick_string(stat, &["type"]) else {
            continue;
        };
        let Some(value) = stat.get("value").filter(|v| !v.is_null()) else {
            continue;
        };
        match kind.as_str() {
            "Ball Possession" => {
                out.possession = super::as_string(value).and_then(|s| percent_value(&s));
            }
            "Total Shots" => out.shots = as_u32_any(value),
            "Shots on Goal" => out.shots_on_target = as_u32_any(value),
            "Corner Kicks" => out.corners = as_u32_any(value),
            "Fouls" => out.fouls = as_u32_any(value),
            "Yellow Cards" => out.yellow_cards = as_u32_any(value),
            "Red Cards" => out.red_cards = as_u32_any(value),
            _ => {}
        }
    }
    out
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
