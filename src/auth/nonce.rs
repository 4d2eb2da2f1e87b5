//! Replay protection for signed requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::hawk::SeenNonce;

/// How many inserts between lazy sweeps of expired entries.
const CLEANUP_INTERVAL: u64 = 1024;

/// Backing-store capability: atomic insert-if-absent with a per-entry
/// TTL.
pub trait NonceStore: Send + Sync {
    /// Record `key` for `ttl` unless a live entry already exists.
    ///
    /// Returns `false` when the key was already present; the existing
    /// entry's TTL is not extended. The check and the record must be a
    /// single atomic state transition.
    fn insert_if_absent(&self, key: &str, ttl: Duration) -> bool;
}

/// In-process store over a concurrent map.
///
/// Expired entries are ignored on lookup and reclaimed lazily every
/// [`CLEANUP_INTERVAL`] inserts.
pub struct InMemoryNonceStore {
    /// Key -> expiry deadline.
    entries: DashMap<String, Instant>,
    insert_counter: AtomicU64,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            insert_counter: AtomicU64::new(0),
        }
    }

    /// Drop entries whose deadline has passed.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, deadline| now < *deadline);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryNonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceStore for InMemoryNonceStore {
    fn insert_if_absent(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        // The entry API makes the existence check and the record one
        // state transition.
        let inserted = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if now < *entry.get() {
                    false
                } else {
                    entry.insert(now + ttl);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now + ttl);
                true
            }
        };

        if inserted {
            let count = self.insert_counter.fetch_add(1, Ordering::Relaxed);
            if count % CLEANUP_INTERVAL == 0 {
                self.cleanup_expired();
            }
        }

        inserted
    }
}

/// Check-and-set view over a store, keyed by
/// (credential id, nonce, timestamp).
pub struct NonceRegistry {
    store: Arc<dyn NonceStore>,
    ttl: Duration,
}

impl NonceRegistry {
    /// `ttl` should outlive the message expiration so a nonce cannot be
    /// replayed while its message is still within skew.
    pub fn new(store: Arc<dyn NonceStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn cache_key(credential_id: &str, nonce: &str, timestamp: i64) -> String {
        format!("{credential_id}:{nonce}:{timestamp}")
    }
}

impl SeenNonce for NonceRegistry {
    fn seen_and_record(&self, credential_id: &str, nonce: &str, timestamp: i64) -> bool {
        let key = Self::cache_key(credential_id, nonce, timestamp);
        if self.store.insert_if_absent(&key, self.ttl) {
            tracing::debug!(key = %key, "caching nonce");
            false
        } else {
            tracing::warn!(key = %key, "replay attack? already processed nonce");
            true
        }
    }
}
