use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::blocking::Client;
use serde_json::Value;

use super::{
    LiveProvider, as_i32_any, as_string, format_period, leading_minute, parse_json_root,
    percent_value, pick_string, timeline_line,
};
use crate::http_client::fetch_body;
use crate::model::{CanonicalLiveMatch, LiveStatus, MatchStats, SideStats, Sport};

const PROVIDER: &str = "espn";
const SCOREBOARD_BASE: &str = "https://site.api.espn.com/apis/site/v2/sports";

/// Public scoreboards; no credential, only an on/off switch.
pub struct EspnAdapter {
    client: Client,
    enabled: bool,
}

impl EspnAdapter {
    pub fn new(client: Client, enabled: bool) -> Self {
        Self { client, enabled }
    }
}

impl LiveProvider for EspnAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn serves(&self, _sport: Sport) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.enabled
    }

    fn fetch(&self, sport: Sport, day: NaiveDate) -> Result<Vec<CanonicalLiveMatch>> {
        let path = match sport {
            Sport::Soccer => "soccer/eng.1",
            Sport::Basketball => "basketball/nba",
            Sport::Hockey => "hockey/nhl",
            Sport::AmericanFootball => "football/nfl",
        };
        let url = format!(
            "{SCOREBOARD_BASE}/{path}/scoreboard?dates={}",
            day.format("%Y%m%d")
        );
        let body = fetch_body(&self.client, &url, &[])?;
        parse_espn_json(&body, sport)
    }
}

pub fn parse_espn_json(raw: &str, sport: Sport) -> Result<Vec<CanonicalLiveMatch>> {
    let root = parse_json_root(raw)?;
    let league = root
        .get("leagues")
        .and_then(|l| l.as_array())
        .and_then(|l| l.first())
        .and_then(|l| pick_string(l, &["name"]));
    let Some(events) = root.get("events").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };
    Ok(events
        .iter()
        .filter_map(|e| parse_event(e, sport, league.clone()))
        .collect())
}

fn parse_event(v: &Value, sport: Sport, league: Option<String>) -> Option<CanonicalLiveMatch> {
    let id = pick_string(v, &["id"])?;
    let competition = v.get("competitions")?.as_array()?.first()?;
    let competitors = competition.get("competitors")?.as_array()?;
    let home = competitors
        .iter()
        .find(|c| c.get("homeAway").and_then(|h| h.as_str()) == Some("home"))?;
    let away = competitors
        .iter()
        .find(|c| c.get("homeAway").and_then(|h| h.as_str()) == Some("away"))?;
    let home_team = team_name(home)?;
    let away_team = team_name(away)?;

    let status_v = competition
        .get("status")
        .or_else(|| v.get("status"))
        .unwrap_or(&Value::Null);
    let status_name = status_v
        .get("type")
        .and_then(|t| pick_string(t, &["name"]))
        .unwrap_or_default();
    let status = classify_status(&status_name);
    let period = status_v.get("period").and_then(|p| p.as_u64()).unwrap_or(0) as u32;
    let clock = pick_string(status_v, &["displayClock"]);
    let elapsed = period_text(sport, status, &status_name, period, clock.as_deref());

    let (home_score, away_score) = if status == LiveStatus::NotStarted {
        (None, None)
    } else {
        (
            home.get("score").and_then(as_i32_any),
            away.get("score").and_then(as_i32_any),
        )
    };

    let timeline = competition
        .get("details")
        .and_then(|d| d.as_array())
        .map(|details| {
            details
                .iter()
                .filter_map(|d| render_detail(d, home, away))
                .collect()
        })
        .unwrap_or_default();

    let home_stats = side_stats(home);
    let away_stats = side_stats(away);
    let stats = if home_stats.is_empty() && away_stats.is_empty() {
        None
    } else {
        Some(MatchStats {
            home: home_stats,
            away: away_stats,
        })
    };

    Some(CanonicalLiveMatch {
        provider: PROVIDER.to_string(),
        external_id: id,
        sport,
        league,
        home_team,
        away_team,
        home_score,
        away_score,
        status,
        elapsed,
        kickoff: pick_string(v, &["date"]).and_then(|d| parse_espn_date(&d)),
        timeline,
        stats,
    })
}

fn team_name(competitor: &Value) -> Option<String> {
    competitor
        .get("team")
        .and_then(|t| pick_string(t, &["displayName", "shortDisplayName", "name"]))
}

fn classify_status(name: &str) -> LiveStatus {
    let name = name.trim().to_ascii_uppercase();
    match name.as_str() {
        "" | "STATUS_SCHEDULED" | "STATUS_DELAYED" => LiveStatus::NotStarted,
        "STATUS_POSTPONED" | "STATUS_CANCELED" | "STATUS_ABANDONED" | "STATUS_FORFEIT" => {
            LiveStatus::Cancelled
        }
        "STATUS_FULL_TIME" => LiveStatus::Finished,
        other if other.starts_with("STATUS_FINAL") => LiveStatus::Finished,
        _ => LiveStatus::Live,
    }
}

fn period_text(
    sport: Sport,
    status: LiveStatus,
    status_name: &str,
    period: u32,
    clock: Option<&str>,
) -> Option<String> {
    match status {
        LiveStatus::NotStarted => return None,
        LiveStatus::Finished => return Some("FT".to_string()),
        LiveStatus::Cancelled => return Some(status_name.trim_start_matches("STATUS_").to_string()),
        LiveStatus::Live => {}
    }
    if status_name.eq_ignore_ascii_case("STATUS_HALFTIME") {
        return Some("Halftime".to_string());
    }
    let shown = clock.and_then(leading_minute);
    let minute = match sport {
        // Soccer clocks count up; the others count down from the period length.
        Sport::Soccer => shown,
        Sport::Basketball => shown.map(|left| 12u32.saturating_sub(left)),
        Sport::AmericanFootball => shown.map(|left| 15u32.saturating_sub(left)),
        Sport::Hockey => shown.map(|left| 20u32.saturating_sub(left)),
    };
    let added = clock.and_then(super::added_minutes);
    Some(format_period(sport, period.max(1), minute, added))
}

fn render_detail(detail: &Value, home: &Value, away: &Value) -> Option<String> {
    let text = detail.get("type").and_then(|t| pick_string(t, &["text"]))?;
    let clock = detail
        .get("clock")
        .and_then(|c| pick_string(c, &["displayValue"]))?;
    let minute = leading_minute(&clock)?;
    let added = super::added_minutes(&clock);
    let team_id = detail
        .get("team")
        .and_then(|t| t.get("id"))
        .and_then(as_string)?;
    let team = [home, away]
        .into_iter()
        .find(|c| {
            c.get("team")
                .and_then(|t| t.get("id"))
                .and_then(as_string)
                .is_some_and(|id| id == team_id)
        })
        .and_then(team_name)?;
    Some(timeline_line(minute, added, &text, &team))
}

fn side_stats(competitor: &Value) -> SideStats {
    let mut out = SideStats::default();
    let Some(list) = competitor.get("statistics").and_then(|s| s.as_array()) else {
        return out;
    };
    for stat in list {
        let Some(name) = pick_string(stat, &["name"]) else {
            continue;
        };
        let Some(shown) = pick_string(stat, &["displayValue"]) else {
            continue;
        };
        let count = || shown.trim().parse::<u32>().ok();
        match name.as_str() {
            "possessionPct" => out.possession = percent_value(&shown),
            "totalShots" => out.shots = count(),
            "shotsOnTarget" => out.shots_on_target = count(),
            "wonCorners" => out.corners = count(),
            "foulsCommitted" => out.fouls = count(),
            "yellowCards" => out.yellow_cards = count(),
            "redCards" => out.red_cards = count(),
            _ => {}
        }
    }
    out
}

fn parse_espn_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}
