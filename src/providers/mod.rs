use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::model::{CanonicalLiveMatch, Sport};

pub mod api_sports;
pub mod espn;
pub mod sportsdb;

pub use api_sports::ApiSportsAdapter;
pub use espn::EspnAdapter;
pub use sportsdb::SportsDbAdapter;

pub trait LiveProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn serves(&self, sport: Sport) -> bool;

    fn is_configured(&self) -> bool;

    /// Live and finished fixtures for `sport` on `day`.
    fn fetch(&self, sport: Sport, day: NaiveDate) -> Result<Vec<CanonicalLiveMatch>>;
}

// Priority order.
pub fn default_providers(cfg: &EngineConfig, client: Client) -> Vec<Box<dyn LiveProvider>> {
    vec![
        Box::new(ApiSportsAdapter::new(client.clone(), cfg.api_sports_key.clone())),
        Box::new(SportsDbAdapter::new(client.clone(), cfg.sportsdb_key.clone())),
        Box::new(EspnAdapter::new(client, cfg.espn_enabled)),
    ]
}

/// First configured provider per sport, grouped as `(provider index, sports)`.
pub fn resolve_plan(providers: &[Box<dyn LiveProvider>], sports: &[Sport]) -> Vec<(usize, Vec<Sport>)> {
    let mut plan: Vec<(usize, Vec<Sport>)> = Vec::new();
    for sport in sports {
        let Some(idx) = providers
            .iter()
            .position(|p| p.serves(*sport) && p.is_configured())
        else {
            continue;
        };
        match plan.iter_mut().find(|(i, _)| *i == idx) {
            Some((_, list)) => {
                if !list.contains(sport) {
                    list.push(*sport);
                }
            }
            None => plan.push((idx, vec![*sport])),
        }
    }
    plan.sort_by_key(|(idx, _)| *idx);
    plan
}

pub fn parse_score_string(raw: &str) -> Option<(i32, i32)> {
    let (home, away) = raw.trim().split_once('-')?;
    let home = home.trim().parse::<i32>().ok()?;
    let away = away.trim().parse::<i32>().ok()?;
    if home < 0 || away < 0 {
        return None;
    }
    Some((home, away))
}

pub fn format_period(sport: Sport, period: u32, minute: Option<u32>, added: Option<u32>) -> String {
    let label = match sport {
        Sport::Soccer => match period {
            0 | 1 => "First Half".to_string(),
            2 => "Second Half".to_string(),
            _ => "Extra Time".to_string(),
        },
        Sport::Basketball | Sport::AmericanFootball => {
            if period <= 4 {
                format!("Q{}", period.max(1))
            } else if period == 5 {
                "OT".to_string()
            } else {
                format!("{}OT", period - 4)
            }
        }
        Sport::Hockey => {
            if period <= 3 {
                format!("P{}", period.max(1))
            } else {
                "OT".to_string()
            }
        }
    };
    match (minute, added) {
        (Some(m), Some(x)) if x > 0 => format!("{label} - {m}+{x}'"),
        (Some(m), _) => format!("{label} - {m}'"),
        (None, _) => label,
    }
}

pub(crate) fn timeline_line(minute: u32, added: Option<u32>, detail: &str, team: &str) -> String {
    match added {
        Some(x) if x > 0 => format!("{minute}+{x}' - {detail} - ({team}) -"),
        _ => format!("{minute}' - {detail} - ({team}) -"),
    }
}

pub(crate) fn parse_json_root(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).context("invalid provider json")
}

pub(crate) fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(*key)
            && let Some(s) = as_string(v)
            && !s.is_empty()
        {
            return Some(s);
        }
    }
    None
}

pub(crate) fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn as_i32_any(v: &Value) -> Option<i32> {
    if let Some(n) = v.as_i64() {
        return i32::try_from(n).ok();
    }
    v.as_str()?.trim().parse::<i32>().ok()
}

pub(crate) fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_i32_any(v)?;
    u32::try_from(n).ok()
}

pub(crate) fn leading_minute(raw: &str) -> Option<u32> {
    let digits = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();
    digits.parse::<u32>().ok()
}

pub(crate) fn added_minutes(raw: &str) -> Option<u32> {
    let (_, rest) = raw.split_once('+')?;
    leading_minute(rest)
}

pub(crate) fn percent_value(raw: &str) -> Option<f32> {
    raw.trim().trim_end_matches('%').trim().parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_string_is_strict() {
        assert_eq!(parse_score_string("3-1"), Some((3, 1)));
        assert_eq!(parse_score_string(" 0 - 0 "), Some((0, 0)));
        assert_eq!(parse_score_string("3:1"), None);
        assert_eq!(parse_score_string("3-"), None);
        assert_eq!(parse_score_string("a-b"), None);
    }

    #[test]
    fn period_labels_per_sport() {
        assert_eq!(format_period(Sport::Soccer, 2, Some(63), None), "Second Half - 63'");
        assert_eq!(format_period(Sport::Soccer, 1, Some(45), Some(2)), "First Half - 45+2'");
        assert_eq!(format_period(Sport::Basketball, 3, Some(7), None), "Q3 - 7'");
        assert_eq!(format_period(Sport::AmericanFootball, 6, None, None), "2OT");
        assert_eq!(format_period(Sport::Hockey, 2, Some(14), None), "P2 - 14'");
        assert_eq!(format_period(Sport::Hockey, 4, None, None), "OT");
    }

    #[test]
    fn clock_helpers() {
        assert_eq!(leading_minute("05:12"), Some(5));
        assert_eq!(leading_minute("45+2"), Some(45));
        assert_eq!(added_minutes("45+2"), Some(2));
        assert_eq!(added_minutes("63"), None);
        assert_eq!(percent_value("55%"), Some(55.0));
    }
}
