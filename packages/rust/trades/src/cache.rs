//! In-memory TTL cache of monthly transaction records.
//!
//! Keyed by `(region code, year-month)`. A zero TTL disables caching.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::parser::TradeRecord;

type Key = (String, String);

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    records: Arc<Vec<TradeRecord>>,
}

/// Shared cache of raw monthly records.
#[derive(Debug)]
pub struct TradeCache {
    ttl: Duration,
    entries: Mutex<HashMap<Key, Entry>>,
}

impl TradeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Records for `(region_code, year_month)` if present and fresh.
    pub async fn get(&self, region_code: &str, year_month: &str) -> Option<Arc<Vec<TradeRecord>>> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().await;
        let key = (region_code.to_string(), year_month.to_string());
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.records.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store records, dropping any entries that have gone stale.
    pub async fn insert(&self, region_code: &str, year_month: &str, records: Arc<Vec<TradeRecord>>) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            (region_code.to_string(), year_month.to_string()),
            Entry {
                stored_at: Instant::now(),
                records,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Arc<Vec<TradeRecord>> {
        Arc::new(vec![TradeRecord {
            sub_district: "진위면".into(),
            area: "84.97".into(),
            amount: "45,000".into(),
        }])
    }

    #[tokio::test]
    async fn hit_within_ttl() {
        let cache = TradeCache::new(Duration::from_secs(60));
        cache.insert("41220", "202506", records()).await;
        assert_eq!(cache.get("41220", "202506").await.unwrap().len(), 1);
        assert!(cache.get("41220", "202505").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_evicted() {
        let cache = TradeCache::new(Duration::from_millis(10));
        cache.insert("41220", "202506", records()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("41220", "202506").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn insert_prunes_stale_keys() {
        let cache = TradeCache::new(Duration::from_millis(20));
        cache.insert("41220", "202504", records()).await;
        cache.insert("41220", "202505", records()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.insert("41220", "202506", records()).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_disables() {
        let cache = TradeCache::new(Duration::ZERO);
        cache.insert("41220", "202506", records()).await;
        assert!(cache.get("41220", "202506").await.is_none());
        assert_eq!(cache.len().await, 0);
    }
}
