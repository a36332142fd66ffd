//! DNS response cache with TTL-based expiration.

use rustc_hash::FxHashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use crate::dns::Message;

/// A cached upstream answer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The decoded response, used for expiry and logging.
    pub message: Message,
    /// The upstream datagram as received, replayed on a hit.
    pub wire: Vec<u8>,
}

impl CacheEntry {
    /// The cached datagram with its ID replaced by `id`.
    pub fn response_for(&self, id: u16) -> Vec<u8> {
        let mut response = self.wire.clone();
        if response.len() >= 2 {
            response[..2].copy_from_slice(&id.to_be_bytes());
        }
        response
    }
}

/// Result of a cache lookup.
#[derive(Debug)]
pub enum Lookup {
    /// Fresh entry, already carrying the requester's ID.
    Hit(Vec<u8>),
    /// An entry existed but had aged out and was evicted.
    Expired,
    Miss,
}

/// Query-name keyed response cache.
///
/// Entries age from the moment they were parsed; a hit never refreshes them.
/// There is no eviction sweep: stale entries are removed by the lookup that
/// finds them.
pub struct ResponseCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Fetch a copy of the entry for `name`, fresh or not.
    pub fn get(&self, name: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().ok()?;
        entries.get(name).cloned()
    }

    /// Look up `name` at `now`, evicting it if expired.
    ///
    /// On a hit the returned bytes carry `id` in place of the cached ID.
    pub fn lookup_at(&self, name: &str, id: u16, now: SystemTime) -> Lookup {
        {
            let Ok(entries) = self.entries.read() else {
                return Lookup::Miss;
            };
            match entries.get(name) {
                None => return Lookup::Miss,
                Some(entry) if !entry.message.is_expired_at(now) => {
                    return Lookup::Hit(entry.response_for(id));
                }
                Some(_) => {}
            }
        }

        let Ok(mut entries) = self.entries.write() else {
            return Lookup::Miss;
        };
        // Re-check under the write lock: another task may have replaced it.
        match entries.get(name) {
            None => return Lookup::Miss,
            Some(entry) if !entry.message.is_expired_at(now) => {
                return Lookup::Hit(entry.response_for(id));
            }
            Some(_) => {}
        }
        entries.remove(name);
        Lookup::Expired
    }

    pub fn lookup(&self, name: &str, id: u16) -> Lookup {
        self.lookup_at(name, id, SystemTime::now())
    }

    /// Insert or overwrite the entry for `name`.
    pub fn store(&self, name: &str, message: Message, wire: &[u8]) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(
            name.to_string(),
            CacheEntry {
                message,
                wire: wire.to_vec(),
            },
        );
    }

    /// Remove the entry for `name`, returning whether one existed.
    pub fn evict(&self, name: &str) -> bool {
        self.entries
            .write()
            .map(|mut e| e.remove(name).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
