//! Request-dedup cache mapping a currency pair to its pending update id.
//!
//! Losing an entry never affects correctness, only deduplication: a cold
//! cache costs exactly one extra database round-trip on the schedule path.

use crate::domain::RatePair;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

/// Capability set for the schedule-path dedup cache.
pub trait RateUpdateCache: Send + Sync {
    fn get(&self, pair: &RatePair) -> Option<Uuid>;
    fn set(&self, pair: RatePair, update_id: Uuid);
    /// Removes exactly the given pairs; unrelated entries stay.
    fn clean_batch(&self, pairs: &[RatePair]);
    fn close(&self);
}

struct Entry {
    update_id: Uuid,
    hits: AtomicU64,
}

/// Bounded in-memory cache with approximate-LFU eviction.
///
/// Every `get` bumps the entry's hit counter; when the map is full, admitting
/// a new pair evicts the entry with the fewest hits. The scan on eviction is
/// linear, which is fine at the configured capacities.
pub struct InMemoryRateUpdateCache {
    max_items: usize,
    entries: RwLock<HashMap<RatePair, Entry>>,
}

impl InMemoryRateUpdateCache {
    pub fn new(max_items: usize) -> Self {
        InMemoryRateUpdateCache {
            max_items: max_items.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RatePair, Entry>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RatePair, Entry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl RateUpdateCache for InMemoryRateUpdateCache {
    fn get(&self, pair: &RatePair) -> Option<Uuid> {
        let entries = self.read_entries();
        entries.get(pair).map(|entry| {
            entry.hits.fetch_add(1, Ordering::Relaxed);
            entry.update_id
        })
    }

    fn set(&self, pair: RatePair, update_id: Uuid) {
        let mut entries = self.write_entries();

        if let Some(entry) = entries.get_mut(&pair) {
            entry.update_id = update_id;
            return;
        }

        if entries.len() >= self.max_items {
            let coldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.hits.load(Ordering::Relaxed))
                .map(|(pair, _)| pair.clone());
            if let Some(coldest) = coldest {
                entries.remove(&coldest);
            }
        }

        entries.insert(
            pair,
            Entry {
                update_id,
                hits: AtomicU64::new(0),
            },
        );
    }

    fn clean_batch(&self, pairs: &[RatePair]) {
        let mut entries = self.write_entries();
        for pair in pairs {
            entries.remove(pair);
        }
    }

    fn close(&self) {
        self.write_entries().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(base: &str, quote: &str) -> RatePair {
        RatePair::new(base, quote)
    }

    #[test]
    fn test_set_and_get() {
        let cache = InMemoryRateUpdateCache::new(128);
        let id = Uuid::new_v4();

        cache.set(pair("USD", "EUR"), id);
        assert_eq!(cache.get(&pair("USD", "EUR")), Some(id));
    }

    #[test]
    fn test_get_miss_when_empty() {
        let cache = InMemoryRateUpdateCache::new(64);
        assert_eq!(cache.get(&pair("EUR", "USD")), None);
    }

    #[test]
    fn test_set_overwrites_existing_pair() {
        let cache = InMemoryRateUpdateCache::new(64);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        cache.set(pair("USD", "EUR"), first);
        cache.set(pair("USD", "EUR"), second);
        assert_eq!(cache.get(&pair("USD", "EUR")), Some(second));
    }

    #[test]
    fn test_clean_batch_evicts_only_specified_pairs() {
        let cache = InMemoryRateUpdateCache::new(256);
        let keep_id = Uuid::new_v4();

        cache.set(pair("USD", "EUR"), Uuid::new_v4());
        cache.set(pair("EUR", "USD"), Uuid::new_v4());
        cache.set(pair("USD", "JPY"), keep_id);

        cache.clean_batch(&[pair("USD", "EUR"), pair("EUR", "USD")]);

        assert_eq!(cache.get(&pair("USD", "EUR")), None);
        assert_eq!(cache.get(&pair("EUR", "USD")), None);
        assert_eq!(cache.get(&pair("USD", "JPY")), Some(keep_id));
    }

    #[test]
    fn test_capacity_bound_evicts_coldest() {
        let cache = InMemoryRateUpdateCache::new(2);
        let hot_id = Uuid::new_v4();

        cache.set(pair("USD", "EUR"), hot_id);
        cache.set(pair("USD", "JPY"), Uuid::new_v4());

        // Touch the first entry so the second is the eviction candidate.
        assert!(cache.get(&pair("USD", "EUR")).is_some());

        cache.set(pair("EUR", "JPY"), Uuid::new_v4());

        assert_eq!(cache.get(&pair("USD", "EUR")), Some(hot_id));
        assert_eq!(cache.get(&pair("USD", "JPY")), None);
        assert!(cache.get(&pair("EUR", "JPY")).is_some());
    }

    #[test]
    fn test_close_clears_all_entries() {
        let cache = InMemoryRateUpdateCache::new(16);
        cache.set(pair("USD", "EUR"), Uuid::new_v4());
        cache.set(pair("EUR", "JPY"), Uuid::new_v4());

        cache.close();

        assert_eq!(cache.get(&pair("USD", "EUR")), None);
        assert_eq!(cache.get(&pair("EUR", "JPY")), None);
    }
}
