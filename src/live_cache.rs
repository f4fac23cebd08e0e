use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::model::CanonicalLiveMatch;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<CanonicalLiveMatch>,
    expires_at: DateTime<Utc>,
}

/// Short-lived memo of merged provider results, keyed by logical query name.
#[derive(Debug)]
pub struct LiveCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl LiveCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<CanonicalLiveMatch>> {
        let mut guard = self.entries.lock().expect("live cache lock poisoned");
        match guard.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: Vec<CanonicalLiveMatch>, now: DateTime<Utc>) {
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        self.entries
            .lock()
            .expect("live cache lock poisoned")
            .insert(key.to_string(), entry);
    }
}
