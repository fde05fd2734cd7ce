//! Dashboard orchestration: fetch → normalize → aggregate → classify →
//! synthesize → cache.
//!
//! `build_dashboard` is the pure core — given the same updates and `now` it
//! produces byte-identical output. The `Orchestrator` wraps it with the one
//! async fetch and the TTL cache; concurrent readers share completed builds
//! through `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use regpulse_common::{Dashboard, FirmProfile, RegPulseError, Update};

use crate::aggregate::aggregate;
use crate::cache::{Clock, DashboardCache};
use crate::extract::normalize;
use crate::metrics::{calculate_topic_metrics, TopicMetrics};
use crate::momentum::{build_alerts, build_momentum};
use crate::source::UpdateSource;
use crate::synthesis::build_lanes;

/// Fixed description of the approach, displayed alongside the dashboard.
pub fn methodology() -> Vec<String> {
    [
        "Topics are normalized keywords (four or more letters, stop words removed) \
         extracted from update headlines and summaries.",
        "Activity is bucketed into four trailing 7-day windows; acceleration compares \
         this week to the trailing three-window average.",
        "A surge is a weekly count more than two standard deviations above the trailing \
         baseline.",
        "Coordination means two or more authorities active on the same theme within \
         the past 7 days.",
        "Confidence starts at 45 and accumulates capped bonuses for acceleration, \
         surges, coordination, deadlines, volume, and emergence; it is bounded to 40-96.",
        "Predictions are ranked by priority score and grouped into act-now, \
         prepare-next, and monitor lanes, five per lane.",
        "Historical accuracy figures are static benchmarks shown for context; no \
         feedback loop adjusts them.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Build the full dashboard payload from an in-memory update snapshot.
///
/// Pure and synchronous. A profile with sectors narrows the update stream to
/// those sectors (plus unattributed "General" records) before aggregation.
pub fn build_dashboard(
    updates: &[Update],
    now: DateTime<Utc>,
    profile: Option<&FirmProfile>,
) -> Dashboard {
    let narrowed: Vec<Update>;
    let updates = match profile.filter(|p| !p.sectors.is_empty()) {
        Some(p) => {
            narrowed = updates
                .iter()
                .filter(|u| {
                    u.sectors
                        .iter()
                        .any(|s| s == "General" || p.sectors.contains(s))
                })
                .cloned()
                .collect();
            &narrowed[..]
        }
        None => updates,
    };

    let agg = aggregate(updates, now);
    let all_metrics: BTreeMap<String, TopicMetrics> = agg
        .topics
        .iter()
        .filter_map(|(token, stats)| {
            calculate_topic_metrics(stats, now).map(|m| (token.clone(), m))
        })
        .collect();

    let predictions = build_lanes(&agg, &all_metrics, now);
    let momentum = build_momentum(&agg, &all_metrics);
    let alerts = build_alerts(&agg, &all_metrics);

    Dashboard {
        generated_at: now,
        predictions,
        momentum,
        alerts,
        methodology: methodology(),
    }
}

/// Top-level entry point: one async fetch from the update source, then the
/// pure pipeline, behind a time-bounded cache.
pub struct Orchestrator {
    source: Arc<dyn UpdateSource>,
    cache: DashboardCache,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn UpdateSource>, clock: Arc<dyn Clock>, ttl_minutes: i64) -> Self {
        Self {
            cache: DashboardCache::new(ttl_minutes, clock.clone()),
            source,
            clock,
        }
    }

    /// Fetch, build, and cache the dashboard for the given profile.
    pub async fn dashboard(
        &self,
        profile: Option<&FirmProfile>,
    ) -> Result<Arc<Dashboard>, RegPulseError> {
        let key = profile.map(|p| p.id.as_str()).unwrap_or("all").to_string();

        if let Some(cached) = self.cache.get(&key) {
            debug!(key = key.as_str(), "Dashboard cache hit");
            return Ok(cached);
        }

        let raw = self.source.fetch_updates().await?;
        let fetched = raw.len();
        let updates: Vec<Update> = raw.into_iter().filter_map(normalize).collect();

        let now = self.clock.now();
        let dashboard = Arc::new(build_dashboard(&updates, now, profile));
        info!(
            fetched,
            normalized = updates.len(),
            imminent = dashboard.predictions.imminent.len(),
            near_term = dashboard.predictions.near_term.len(),
            strategic = dashboard.predictions.strategic.len(),
            alerts = dashboard.alerts.len(),
            "Dashboard built"
        );

        self.cache.set(&key, Arc::clone(&dashboard));
        Ok(dashboard)
    }
}
