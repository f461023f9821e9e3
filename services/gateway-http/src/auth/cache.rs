use super::{Clock, Identity};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Memoizes token verification: raw token string to the identity it decodes to.
///
/// Implementations must be safe under concurrent use from many request tasks
/// and must never return an identity whose token has expired.
pub trait IdentityCache: Send + Sync {
    fn get(&self, token: &str) -> Option<Arc<Identity>>;

    fn put(&self, token: &str, identity: Arc<Identity>, expires_at: DateTime<Utc>);

    fn clear(&self, token: &str);

    /// Drops every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    identity: Arc<Identity>,
    expires_at: DateTime<Utc>,
}

pub struct MemoryIdentityCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryIdentityCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityCache for MemoryIdentityCache {
    fn get(&self, token: &str) -> Option<Arc<Identity>> {
        let now = self.clock.now();

        let found = self.entries.get(token).map(|entry| {
            if entry.expires_at > now {
                Some(Arc::clone(&entry.identity))
            } else {
                None
            }
        });

        match found {
            Some(Some(identity)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(identity)
            }
            Some(None) => {
                // Only drop it if nobody refreshed the entry in between.
                self.entries.remove_if(token, |_, entry| entry.expires_at <= now);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, token: &str, identity: Arc<Identity>, expires_at: DateTime<Utc>) {
        self.entries.insert(
            token.to_string(),
            CacheEntry {
                identity,
                expires_at,
            },
        );
    }

    fn clear(&self, token: &str) {
        self.entries.remove(token);
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

/// Periodically evicts expired identities so the cache cannot grow without bound.
pub fn start_sweeper(cache: Arc<dyn IdentityCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            let stats = cache.stats();
            if purged > 0 {
                info!(
                    purged,
                    entries = stats.entries,
                    hits = stats.hits,
                    misses = stats.misses,
                    "Evicted expired identities"
                );
            } else {
                debug!(entries = stats.entries, "Identity cache sweep found nothing to evict");
            }
        }
    })
}
