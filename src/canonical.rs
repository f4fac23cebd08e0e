use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::live_cache::LiveCache;
use crate::model::{CanonicalLiveMatch, Sport};
use crate::providers::{LiveProvider, resolve_plan};

pub const LIVE_MATCHES_KEY: &str = "live_matches";

#[derive(Debug, Default)]
pub struct LiveSnapshot {
    pub matches: Vec<CanonicalLiveMatch>,
    /// `provider/sport` pairs that contributed nothing this pass.
    pub failures: Vec<String>,
    pub from_cache: bool,
}

pub fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("pickwire-fetch-{i}"))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: Option<&rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool {
        pool.install(action)
    } else {
        action()
    }
}

/// Merged canonical matches for the sports in scope, across every day in `days`.
///
/// A fresh cache entry short-circuits every provider call. On a miss each
/// planned provider runs as its own task; a failing provider contributes no
/// rows and does not affect the others. Output keeps provider priority order.
pub fn collect_live_matches(
    providers: &[Box<dyn LiveProvider>],
    sports: &[Sport],
    days: &[NaiveDate],
    cache: &LiveCache,
    now: DateTime<Utc>,
    pool: Option<&rayon::ThreadPool>,
) -> LiveSnapshot {
    let key = cache_key(days);
    if let Some(matches) = cache.get(&key, now) {
        debug!(count = matches.len(), "live cache hit");
        return LiveSnapshot {
            matches,
            failures: Vec::new(),
            from_cache: true,
        };
    }
    debug!("live cache miss");

    let plan = resolve_plan(providers, sports);
    let results: Vec<(Vec<CanonicalLiveMatch>, Vec<String>)> = with_fetch_pool(pool, || {
        plan.par_iter()
            .map(|(idx, sports)| fetch_provider(providers[*idx].as_ref(), sports, days))
            .collect()
    });

    let mut snapshot = LiveSnapshot::default();
    for (matches, failures) in results {
        snapshot.matches.extend(matches);
        snapshot.failures.extend(failures);
    }
    cache.put(&key, snapshot.matches.clone(), now);
    snapshot
}

fn cache_key(days: &[NaiveDate]) -> String {
    let mut key = LIVE_MATCHES_KEY.to_string();
    for day in days {
        key.push(':');
        key.push_str(&day.format("%Y%m%d").to_string());
    }
    key
}

fn fetch_provider(
    provider: &dyn LiveProvider,
    sports: &[Sport],
    days: &[NaiveDate],
) -> (Vec<CanonicalLiveMatch>, Vec<String>) {
    let mut out: Vec<CanonicalLiveMatch> = Vec::new();
    let mut seen: HashSet<(Sport, String)> = HashSet::new();
    let mut failures = Vec::new();
    for sport in sports {
        for day in days {
            match provider.fetch(*sport, *day) {
                Ok(matches) => {
                    debug!(provider = provider.name(), sport = sport.as_str(), %day, count = matches.len(), "provider fetched");
                    for m in matches {
                        if m.sport == *sport && seen.insert((m.sport, m.external_id.clone())) {
                            out.push(m);
                        }
                    }
                }
                Err(err) => {
                    warn!(provider = provider.name(), sport = sport.as_str(), %day, error = %err, "provider unavailable");
                    failures.push(format!("{}/{}/{}", provider.name(), sport.as_str(), day));
                }
            }
        }
    }
    (out, failures)
}
