//! Short-lived key/value cache
//!
//! Backs captcha codes, refresh tokens and the access token blacklist.
//! Entries carry their own deadline and read as absent once it passes.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Number of writes between opportunistic sweeps of expired entries
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    deadline: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

#[derive(Debug, Default)]
pub struct TtlCache {
    entries: DashMap<String, Entry>,
    writes: AtomicUsize,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let entry = Entry {
            value: value.into(),
            deadline: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            entry.is_live(now).then(|| entry.value.clone())
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        value
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove the entry and return its value if it was still live.
    ///
    /// Two concurrent callers can never both observe the same value.
    pub fn take(&self, key: &str) -> Option<String> {
        let (_, entry) = self.entries.remove(key)?;
        entry.is_live(Instant::now()).then_some(entry.value)
    }

    /// Drop every expired entry
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!("Cache sweep removed {} expired entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
