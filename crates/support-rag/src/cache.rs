//! Response cache
//!
//! Best-effort cache keyed by (account, normalized query), explicitly
//! constructed and passed into the engine rather than living in ambient
//! global state. Entries carry a TTL; a stale or missing entry simply means
//! the pipeline runs in full. Never a correctness dependency.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::types::GeneratedResponse;

#[derive(Debug, Clone)]
pub struct CachedTurn {
    pub response: GeneratedResponse,
    pub confidence: f32,
    pub context_relevance: f32,
}

struct Entry {
    turn: CachedTurn,
    inserted_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.capacity.max(1)).expect("capacity is at least one");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(config.ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, account_id: &str, query: &str) -> Option<CachedTurn> {
        let key = Self::cache_key(account_id, query);
        let mut entries = self.entries.lock();

        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.turn.clone())
            }
            Some(_) => {
                entries.pop(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, account_id: &str, query: &str, turn: CachedTurn) {
        let key = Self::cache_key(account_id, query);
        self.entries.lock().put(
            key,
            Entry {
                turn,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry for an account. Called when its knowledge base
    /// changes, since cached answers may cite stale articles.
    pub fn invalidate_account(&self, account_id: &str) {
        let prefix = format!("{}::", account_id);
        let mut entries = self.entries.lock();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Case- and whitespace-insensitive key so trivial rephrasings hit.
    fn cache_key(account_id: &str, query: &str) -> String {
        let normalized = query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}::{}", account_id, normalized)
    }
}
