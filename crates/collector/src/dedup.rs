//! Bounded, time-windowed membership cache for change fingerprints.
//!
//! The initial listing and the live subscription observe the same objects, and
//! a resumed stream re-delivers recent events; this cache suppresses
//! re-emission of any fingerprint seen within the TTL window. Entries are
//! bounded both by age and by count.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

use crate::k8s::types::WorkloadKind;

/// Change-identity fingerprint: `(namespace, kind, name, resourceVersion)`.
/// Two observations with the same fingerprint represent the same logical state.
pub(crate) type Fingerprint = (String, WorkloadKind, String, String);

pub(crate) struct SeenCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<Fingerprint, Instant>,
    /// Insertion/refresh order, oldest first. A refresh pushes a new slot; the
    /// superseded slot is skipped lazily when it reaches the front.
    order: VecDeque<(Fingerprint, Instant)>,
}

impl SeenCache {
    pub(crate) fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Record the fingerprint and report whether it was already present.
    ///
    /// Expired entries are purged from the oldest end first; if recording the
    /// key pushes the cache over its entry bound, the single oldest entry is
    /// evicted even when not yet expired.
    pub(crate) fn seen(&mut self, key: Fingerprint) -> bool {
        self.seen_at(key, Instant::now())
    }

    fn seen_at(&mut self, key: Fingerprint, now: Instant) -> bool {
        self.purge_expired(now);

        let existed = self.entries.insert(key.clone(), now).is_some();
        self.order.push_back((key, now));

        if self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
        existed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn purge_expired(&mut self, now: Instant) {
        while let Some((_, stamp)) = self.order.front() {
            if now.duration_since(*stamp) <= self.ttl {
                break;
            }
            if let Some((key, stamp)) = self.order.pop_front() {
                self.remove_if_current(&key, stamp);
            }
        }
    }

    /// Evict the single oldest live entry.
    fn evict_oldest(&mut self) {
        while let Some((key, stamp)) = self.order.pop_front() {
            if self.remove_if_current(&key, stamp) {
                break;
            }
        }
    }

    /// Drop the map entry only when this queue slot is still its latest record.
    fn remove_if_current(&mut self, key: &Fingerprint, stamp: Instant) -> bool {
        if self.entries.get(key) == Some(&stamp) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Fingerprint {
        (
            "default".to_string(),
            WorkloadKind::Deployment,
            name.to_string(),
            "1".to_string(),
        )
    }

    #[test]
    fn second_observation_is_seen() {
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);
        let start = Instant::now();

        assert!(!cache.seen_at(key("a"), start));
        assert!(cache.seen_at(key("a"), start + Duration::from_millis(1)));
    }

    #[test]
    fn expired_fingerprints_are_forgotten() {
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);
        let start = Instant::now();

        assert!(!cache.seen_at(key("a"), start));
        assert!(cache.seen_at(key("a"), start + Duration::from_secs(5)));
        // the refresh at +5s is itself past the TTL by +16s
        assert!(!cache.seen_at(key("a"), start + Duration::from_secs(16)));
    }

    #[test]
    fn capacity_bound_evicts_the_single_oldest() {
        let mut cache = SeenCache::new(Duration::from_secs(60), 3);
        let start = Instant::now();

        for (offset, name) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.seen_at(key(name), start + Duration::from_millis(offset as u64));
        }

        assert_eq!(cache.len(), 3);
        assert!(!cache.entries.contains_key(&key("a")));
        assert!(cache.entries.contains_key(&key("b")));
        assert!(cache.entries.contains_key(&key("d")));
    }

    #[test]
    fn refresh_moves_key_to_newest_position() {
        let mut cache = SeenCache::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        cache.seen_at(key("a"), start);
        cache.seen_at(key("b"), start + Duration::from_millis(1));
        // refreshing `a` makes `b` the oldest entry
        cache.seen_at(key("a"), start + Duration::from_millis(2));
        cache.seen_at(key("c"), start + Duration::from_millis(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.entries.contains_key(&key("a")));
        assert!(!cache.entries.contains_key(&key("b")));
        assert!(cache.entries.contains_key(&key("c")));
    }

    #[test]
    fn distinct_resource_versions_are_distinct_events() {
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);
        let start = Instant::now();

        let first = ("ns".to_string(), WorkloadKind::Job, "j".to_string(), "100".to_string());
        let second = ("ns".to_string(), WorkloadKind::Job, "j".to_string(), "101".to_string());

        assert!(!cache.seen_at(first, start));
        assert!(!cache.seen_at(second, start + Duration::from_millis(1)));
    }
}
