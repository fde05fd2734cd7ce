//! Momentum & alerts: independent summarization of authority, topic, and
//! sector movement from the same aggregation snapshot the lanes use.
//!
//! Momentum is week-over-week change; alerts are cross-cutting patterns
//! (an authority surging, several authorities converging on one theme, a
//! brand-new theme accelerating) capped at ten per build.

use std::collections::BTreeMap;

use regpulse_common::{
    Alert, AlertKind, AuthorityMomentum, MomentumBoard, MomentumClass, SectorMomentum, Severity,
    TopicMomentum,
};

use crate::aggregate::Aggregates;
use crate::metrics::{change_percent, TopicMetrics};

/// Entries kept per momentum list.
pub const MOMENTUM_TOP_N: usize = 6;

/// Maximum pattern alerts per build.
pub const ALERT_CAP: usize = 10;

/// Week-over-week change needed before an authority-velocity alert fires.
const AUTHORITY_ALERT_MIN_CHANGE: f64 = 150.0;

/// Recent volume needed before an authority-velocity alert fires.
const AUTHORITY_ALERT_MIN_RECENT: u32 = 4;

/// Change above which an authority-velocity alert escalates to critical.
const AUTHORITY_ALERT_CRITICAL_CHANGE: f64 = 250.0;

/// Classify a week-over-week percent change into a movement label.
pub fn classify_momentum(change: f64) -> MomentumClass {
    if change > 80.0 {
        MomentumClass::Accelerating
    } else if change > 0.0 {
        MomentumClass::Increasing
    } else if change < -30.0 {
        MomentumClass::Decreasing
    } else {
        MomentumClass::Stable
    }
}

/// Generic severity for a percent change, shared by authority and sector
/// summaries.
pub fn classify_change_severity(change: f64) -> Severity {
    if change >= 120.0 {
        Severity::Critical
    } else if change >= 60.0 {
        Severity::High
    } else if change >= 25.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Build the three momentum lists, each top-6 by change (topics by
/// acceleration).
pub fn build_momentum(
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
) -> MomentumBoard {
    let mut authorities: Vec<AuthorityMomentum> = agg
        .authorities
        .iter()
        .map(|(name, stats)| {
            let change = change_percent(stats.recent, stats.previous);
            AuthorityMomentum {
                authority: name.clone(),
                recent: stats.recent,
                previous: stats.previous,
                change_percent: change,
                classification: classify_momentum(change),
                severity: classify_change_severity(change),
            }
        })
        .collect();
    authorities.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
    authorities.truncate(MOMENTUM_TOP_N);

    let mut topics: Vec<TopicMomentum> = all_metrics
        .iter()
        .filter(|(_, m)| m.recent >= 2)
        .map(|(token, m)| TopicMomentum {
            topic: token.clone(),
            recent: m.recent,
            acceleration: m.acceleration,
            urgency: m.urgency,
        })
        .collect();
    topics.sort_by(|a, b| b.acceleration.total_cmp(&a.acceleration));
    topics.truncate(MOMENTUM_TOP_N);

    let mut sectors: Vec<SectorMomentum> = agg
        .sectors
        .iter()
        .map(|(name, stats)| {
            let change = change_percent(stats.recent, stats.previous);
            SectorMomentum {
                sector: name.clone(),
                recent: stats.recent,
                previous: stats.previous,
                change_percent: change,
                classification: classify_momentum(change),
                severity: classify_change_severity(change),
            }
        })
        .collect();
    sectors.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
    sectors.truncate(MOMENTUM_TOP_N);

    MomentumBoard { authorities, topics, sectors }
}

/// Cross-cutting pattern alerts, in insertion order, capped at
/// [`ALERT_CAP`].
pub fn build_alerts(
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for (name, stats) in &agg.authorities {
        let change = change_percent(stats.recent, stats.previous);
        if change >= AUTHORITY_ALERT_MIN_CHANGE && stats.recent >= AUTHORITY_ALERT_MIN_RECENT {
            let severity = if change > AUTHORITY_ALERT_CRITICAL_CHANGE {
                Severity::Critical
            } else {
                Severity::High
            };
            alerts.push(Alert {
                kind: AlertKind::AuthorityVelocity,
                severity,
                headline: format!("{name} publishing at {change:.0}% above last week"),
                detail: format!(
                    "{} updates in the past 7 days vs {} the week before",
                    stats.recent, stats.previous
                ),
            });
        }
    }

    for (token, metrics) in all_metrics {
        if metrics.coordination_detected {
            let active = agg
                .topics
                .get(token)
                .map(|s| s.authorities.values().filter(|t| t.recent > 0).count())
                .unwrap_or(0);
            alerts.push(Alert {
                kind: AlertKind::Coordination,
                severity: metrics.urgency.into(),
                headline: format!("{active} authorities converging on \"{token}\""),
                detail: format!(
                    "Simultaneous recent activity from multiple authorities; acceleration {:.1}x",
                    metrics.acceleration
                ),
            });
        }
    }

    for (token, metrics) in all_metrics {
        if metrics.is_emerging && metrics.acceleration >= 1.2 {
            alerts.push(Alert {
                kind: AlertKind::Emergence,
                severity: Severity::Medium,
                headline: format!("New theme emerging: \"{token}\""),
                detail: format!(
                    "First seen within 30 days and accelerating at {:.1}x",
                    metrics.acceleration
                ),
            });
        }
    }

    alerts.truncate(ALERT_CAP);
    alerts
}
