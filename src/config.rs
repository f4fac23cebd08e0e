use std::env;
use std::path::PathBuf;

use crate::model::Sport;

const APP_DIR: &str = "pickwire";
const DB_FILE: &str = "pickwire.sqlite";

const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_PARALLELISM: usize = 4;
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 120;
const DEFAULT_MATCH_PREFIX_CHARS: usize = 15;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_sports_key: Option<String>,
    pub sportsdb_key: Option<String>,
    pub espn_enabled: bool,
    pub sports: Vec<Sport>,
    pub cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub fetch_parallelism: usize,
    pub stale_after_minutes: i64,
    pub match_prefix_chars: usize,
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_sports_key: None,
            sportsdb_key: None,
            espn_enabled: true,
            sports: Sport::ALL.to_vec(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            fetch_parallelism: DEFAULT_FETCH_PARALLELISM,
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
            match_prefix_chars: DEFAULT_MATCH_PREFIX_CHARS,
            db_path: default_db_path(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let sports = env::var("SETTLE_SPORTS")
            .ok()
            .map(|raw| parse_sports(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| Sport::ALL.to_vec());

        Self {
            api_sports_key: env_secret("API_SPORTS_KEY"),
            sportsdb_key: env_secret("SPORTSDB_KEY"),
            espn_enabled: env_bool("ESPN_ENABLED", true),
            sports,
            cache_ttl_secs: env_parse("LIVE_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS).clamp(5, 300),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
                .clamp(2, 60),
            fetch_parallelism: env_parse("FETCH_PARALLELISM", DEFAULT_FETCH_PARALLELISM)
                .clamp(1, 16),
            stale_after_minutes: env_parse("STALE_AFTER_MINUTES", DEFAULT_STALE_AFTER_MINUTES)
                .max(DEFAULT_STALE_AFTER_MINUTES),
            match_prefix_chars: env_parse("MATCH_PREFIX_CHARS", DEFAULT_MATCH_PREFIX_CHARS)
                .clamp(5, 40),
            db_path: env::var("PICKWIRE_DB")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(default_db_path),
        }
    }
}

pub fn parse_sports(raw: &str) -> Vec<Sport> {
    let mut out = Vec::new();
    for part in raw.split([',', ';']) {
        if let Some(sport) = Sport::parse(part)
            && !out.contains(&sport)
        {
            out.push(sport);
        }
    }
    out
}

pub fn default_db_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(DB_FILE))
}

fn app_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

/// `--name value` or `--name=value` from a command line.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn db_path_arg(args: &[String]) -> Option<PathBuf> {
    arg_value(args, "--db").map(PathBuf::from)
}

fn env_secret(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{arg_value, parse_sports};
    use crate::model::Sport;

    #[test]
    fn arg_value_accepts_both_forms() {
        let args = ["--game", "7", "--score=2-1"].map(String::from).to_vec();
        assert_eq!(arg_value(&args, "--game").as_deref(), Some("7"));
        assert_eq!(arg_value(&args, "--score").as_deref(), Some("2-1"));
        assert_eq!(arg_value(&args, "--db"), None);
    }

    #[test]
    fn parse_sports_dedups_and_skips_unknown() {
        assert_eq!(
            parse_sports("soccer, nba;soccer,cricket"),
            vec![Sport::Soccer, Sport::Basketball]
        );
        assert!(parse_sports("").is_empty());
    }
}
