//! Memoized locator scans.
//!
//! Keyed by (search text, page url) with a short TTL so repeated mark
//! passes skip full-document scans. Purely advisory: entries may be
//! dropped at any time and a stale hit is caught by re-checking node
//! content at use sites.

use std::collections::HashMap;

use ego_tree::NodeId;
use litmark_core::limits;
use tokio::time::{Duration, Instant};

struct CacheEntry {
    nodes: Vec<NodeId>,
    stored_at: Instant,
}

/// TTL + capacity bounded cache of text-node scan results.
pub struct NodeCache {
    entries: HashMap<(String, String), CacheEntry>,
    capacity: usize,
    ttl: Duration,
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(limits::NODE_CACHE_CAP, limits::NODE_CACHE_TTL)
    }
}

impl NodeCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { entries: HashMap::new(), capacity, ttl }
    }

    /// Look up a scan result. Expired entries read as misses and are
    /// removed on the spot.
    pub fn get(&mut self, text: &str, url: &str) -> Option<Vec<NodeId>> {
        let key = (text.to_string(), url.to_string());
        let entry = self.entries.get(&key)?;
        if entry.stored_at.elapsed() > self.ttl {
            self.entries.remove(&key);
            return None;
        }
        Some(self.entries[&key].nodes.clone())
    }

    /// Store a scan result, evicting oldest-timestamp buckets when the
    /// write pushes the cache over capacity.
    pub fn put(&mut self, text: &str, url: &str, nodes: Vec<NodeId>) {
        self.entries
            .insert((text.to_string(), url.to_string()), CacheEntry { nodes, stored_at: Instant::now() });

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.entries.values().map(|e| e.stored_at).min() else {
                break;
            };
            self.entries.retain(|_, e| e.stored_at != oldest);
        }
    }

    /// Drop expired entries; returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.stored_at.elapsed() <= ttl);
        before - self.entries.len()
    }

    /// Drop everything (page teardown).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
