use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Results older than this are recomputed
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub result: V,
    pub computed_at: DateTime<Utc>,
}

/// Process-lifetime cache keyed per analysis subject
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_window(clock, FRESHNESS_WINDOW)
    }

    pub fn with_window(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self { entries: DashMap::new(), window, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fresh entry for `key`, evicting it if stale
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::TimeDelta::MAX);

        let entry = self.entries.get(key)?.value().clone();
        if now.signed_duration_since(entry.computed_at) < window {
            Some(entry)
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: K, result: V, computed_at: DateTime<Utc>) -> CacheEntry<V> {
        let entry = CacheEntry { result, computed_at };
        self.entries.insert(key, entry.clone());
        entry
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::*;
    use parking_lot::Mutex;

    /// Clock advanced by hand
    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock();
            *now += chrono::Duration::from_std(by).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;

    #[test]
    fn entries_expire_after_window() {
        let clock = ManualClock::new();
        let cache: TtlCache<String, u32> = TtlCache::new(clock.clone());

        let stored = cache.insert("0xabc".into(), 7, clock.now());
        assert_eq!(cache.get(&"0xabc".to_string()), Some(stored.clone()));

        clock.advance(Duration::from_secs(59 * 60));
        assert_eq!(cache.get(&"0xabc".to_string()).map(|e| e.computed_at), Some(stored.computed_at));

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get(&"0xabc".to_string()), None);
        assert!(cache.is_empty());
    }
}
