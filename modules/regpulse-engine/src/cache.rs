//! Time-bounded dashboard cache.
//!
//! Whole dashboards only — a build is cached after it completes, so readers
//! never see a partial payload. The clock is injected so TTL expiry is
//! testable without real timers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use regpulse_common::Dashboard;

/// Default dashboard time-to-live.
pub const DEFAULT_TTL_MINUTES: i64 = 30;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    built_at: DateTime<Utc>,
    dashboard: Arc<Dashboard>,
}

/// Process-wide cache of built dashboards, keyed by firm profile id (or
/// `"all"`).
pub struct DashboardCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DashboardCache {
    pub fn new(ttl_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
            clock,
        }
    }

    /// Return the cached dashboard for `key` if it is still inside its TTL.
    pub fn get(&self, key: &str) -> Option<Arc<Dashboard>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if self.clock.now() - entry.built_at < self.ttl {
            Some(Arc::clone(&entry.dashboard))
        } else {
            None
        }
    }

    pub fn set(&self, key: &str, dashboard: Arc<Dashboard>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            CacheEntry { built_at: self.clock.now(), dashboard },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use regpulse_common::{Dashboard, MomentumBoard, PredictionLanes};

    use super::*;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(start) }
        }

        fn advance(&self, minutes: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn empty_dashboard(at: DateTime<Utc>) -> Arc<Dashboard> {
        Arc::new(Dashboard {
            generated_at: at,
            predictions: PredictionLanes::default(),
            momentum: MomentumBoard::default(),
            alerts: Vec::new(),
            methodology: Vec::new(),
        })
    }

    #[test]
    fn hit_inside_ttl_miss_after() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let cache = DashboardCache::new(30, clock.clone());

        assert!(cache.get("all").is_none());
        cache.set("all", empty_dashboard(start));
        assert!(cache.get("all").is_some());

        clock.advance(29);
        assert!(cache.get("all").is_some());

        clock.advance(1);
        assert!(cache.get("all").is_none(), "entry must expire at the TTL");
    }

    #[test]
    fn keys_are_independent() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let cache = DashboardCache::new(30, clock);

        cache.set("firm-a", empty_dashboard(start));
        assert!(cache.get("firm-a").is_some());
        assert!(cache.get("firm-b").is_none());
    }

    #[test]
    fn set_replaces_existing_entry() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let cache = DashboardCache::new(30, clock.clone());

        cache.set("all", empty_dashboard(start));
        clock.advance(29);
        cache.set("all", empty_dashboard(clock.now()));
        clock.advance(29);
        // Refreshed entry counts from its own build time
        assert!(cache.get("all").is_some());
    }
}
