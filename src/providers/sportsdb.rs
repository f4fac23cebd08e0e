use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use super::{
    LiveProvider, added_minutes, as_i32_any, format_period, leading_minute, parse_json_root,
    parse_score_string, pick_string,
};
use crate::http_client::fetch_body;
use crate::model::{CanonicalLiveMatch, LiveStatus, Sport};

const PROVIDER: &str = "sportsdb";
const LIVESCORE_URL: &str = "https://www.thesportsdb.com/api/v2/json/livescore";

pub struct SportsDbAdapter {
    client: Client,
    api_key: Option<String>,
}

impl SportsDbAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

impl LiveProvider for SportsDbAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn serves(&self, sport: Sport) -> bool {
        path_segment(sport).is_some()
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, sport: Sport, _day: NaiveDate) -> Result<Vec<CanonicalLiveMatch>> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(anyhow::anyhow!("SPORTSDB_KEY missing"));
        };
        let Some(segment) = path_segment(sport) else {
            return Ok(Vec::new());
        };
        let url = format!("{LIVESCORE_URL}/{segment}");
        let body = fetch_body(&self.client, &url, &[("X-API-KEY", key)])?;
        parse_sportsdb_json(&body, sport)
    }
}

fn path_segment(sport: Sport) -> Option<&'static str> {
    match sport {
        Sport::Soccer => Some("Soccer"),
        Sport::Basketball => Some("Basketball"),
        Sport::Hockey => Some("Ice_Hockey"),
        Sport::AmericanFootball => None,
    }
}

pub fn parse_sportsdb_json(raw: &str, sport: Sport) -> Result<Vec<CanonicalLiveMatch>> {
    let root = parse_json_root(raw)?;
    let Some(list) = root
        .get("livescore")
        .or_else(|| root.get("events"))
        .and_then(|v| v.as_array())
    else {
        return Ok(Vec::new());
    };
    Ok(list.iter().filter_map(|v| parse_event(v, sport)).collect())
}

fn parse_event(v: &Value, sport: Sport) -> Option<CanonicalLiveMatch> {
    let id = pick_string(v, &["idEvent", "idLiveScore"])?;
    let home_team = pick_string(v, &["strHomeTeam"])?;
    let away_team = pick_string(v, &["strAwayTeam"])?;
    let status_raw = pick_string(v, &["strStatus"]).unwrap_or_default();
    let progress = pick_string(v, &["strProgress"]);

    // A score string, when present, is authoritative; a malformed one drops the entity.
    let (home_score, away_score) = match pick_string(v, &["strScore", "strResult"]) {
        Some(score) => {
            let Some((h, a)) = parse_score_string(&score) else {
                debug!(provider = PROVIDER, id = %id, score = %score, "malformed score string, entity skipped");
                return None;
            };
            (Some(h), Some(a))
        }
        None => (
            v.get("intHomeScore").and_then(as_i32_any),
            v.get("intAwayScore").and_then(as_i32_any),
        ),
    };

    let status = classify_status(&status_raw);
    let elapsed = period_text(sport, &status_raw, status, progress.as_deref());

    let timeline = pick_string(v, &["strTimeline"])
        .map(|raw| {
            raw.split(['\n', ';'])
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(CanonicalLiveMatch {
        provider: PROVIDER.to_string(),
        external_id: id,
        sport,
        league: pick_string(v, &["strLeague"]),
        home_team,
        away_team,
        home_score,
        away_score,
        status,
        elapsed,
        kickoff: pick_string(v, &["strTimestamp"]).and_then(|t| parse_timestamp(&t)),
        timeline,
        stats: None,
    })
}

fn classify_status(raw: &str) -> LiveStatus {
    let code = raw.trim().to_ascii_uppercase();
    match code.as_str() {
        "" | "NS" | "NOT STARTED" | "TBD" => LiveStatus::NotStarted,
        "FT" | "AET" | "PEN" | "AOT" | "AP" | "MATCH FINISHED" | "FINISHED" => {
            LiveStatus::Finished
        }
        "PST" | "CANC" | "ABD" | "POSTPONED" | "CANCELLED" | "ABANDONED" => LiveStatus::Cancelled,
        _ => LiveStatus::Live,
    }
}

fn period_text(sport: Sport, raw: &str, status: LiveStatus, progress: Option<&str>) -> Option<String> {
    match status {
        LiveStatus::NotStarted => return None,
        LiveStatus::Finished => return Some("FT".to_string()),
        LiveStatus::Cancelled => return Some(raw.trim().to_string()),
        LiveStatus::Live => {}
    }
    let code = raw.trim().to_ascii_uppercase();
    if code == "HT" {
        return Some("Halftime".to_string());
    }
    let minute = progress.and_then(leading_minute);
    let added = progress.and_then(added_minutes);

    let period = match (sport, code.as_str()) {
        (Sport::Soccer, "1H") => Some(1),
        (Sport::Soccer, "2H") => Some(2),
        (Sport::Soccer, "ET") => Some(3),
        (Sport::Soccer, _) => minute.map(|m| match m {
            0..=45 => 1,
            46..=90 => 2,
            _ => 3,
        }),
        (Sport::Hockey, "OT") => Some(4),
        (_, "OT") => Some(5),
        (_, other) => other
            .strip_prefix('Q')
            .or_else(|| other.strip_prefix('P'))
            .and_then(|n| n.parse::<u32>().ok()),
    };
    match (period, minute) {
        (Some(p), _) => Some(format_period(sport, p, minute, added)),
        (None, Some(m)) => Some(format!("{m}'")),
        (None, None) => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soccer_period_falls_back_to_minute() {
        assert_eq!(
            period_text(Sport::Soccer, "LIVE", LiveStatus::Live, Some("63")).as_deref(),
            Some("Second Half - 63'")
        );
        assert_eq!(
            period_text(Sport::Soccer, "1H", LiveStatus::Live, Some("45+2")).as_deref(),
            Some("First Half - 45+2'")
        );
        assert_eq!(
            period_text(Sport::Soccer, "HT", LiveStatus::Live, None).as_deref(),
            Some("Halftime")
        );
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let ts = parse_timestamp("2026-10-18T14:00:00").expect("timestamp");
        assert_eq!(ts.to_rfc3339(), "2026-10-18T14:00:00+00:00");
    }
}
