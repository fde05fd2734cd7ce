//! Metrics & classification: raw topic counts → velocity, acceleration,
//! surge, and urgency.
//!
//! Four trailing 7-day windows are re-bucketed from the weekly aggregates by
//! each week-start's day-offset from `now`:
//!
//!   window 0 = days 0–6   (this week)       → `recent`
//!   windows 1–3 = days 7–27                 → trailing baseline
//!
//! `acceleration` = recent / mean(windows 1–3); a surge is a recent count
//! more than two standard deviations above that baseline.

use chrono::{DateTime, Utc};

use regpulse_common::{Bucket, ConfidenceBucket, Urgency};

use crate::aggregate::TopicStats;

/// Length of each trailing window, in days.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Number of trailing windows considered (one recent + three baseline).
pub const WINDOW_COUNT: usize = 4;

/// A topic is "emerging" when first seen within this many days.
pub const EMERGING_DAYS: i64 = 30;

/// A deadline is "soon" when it falls within this many days ahead.
pub const DEADLINE_SOON_DAYS: i64 = 14;

/// Confidence floor and ceiling for any classified topic.
pub const CONFIDENCE_MIN: f64 = 40.0;
pub const CONFIDENCE_MAX: f64 = 96.0;

/// Classification result for one topic. Derived per build, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMetrics {
    pub bucket: Bucket,
    pub timeframe: &'static str,
    pub urgency: Urgency,
    pub confidence: f64,
    pub confidence_factors: Vec<String>,
    pub acceleration: f64,
    pub recent: u32,
    pub previous_mean: f64,
    pub surge_detected: bool,
    pub is_emerging: bool,
    pub coordination_detected: bool,
    pub deadlines_soon: bool,
}

/// Re-bucket weekly counts into the four trailing windows.
fn trailing_windows(stats: &TopicStats, now: DateTime<Utc>) -> [u32; WINDOW_COUNT] {
    let today = now.date_naive();
    let span = RECENT_WINDOW_DAYS * WINDOW_COUNT as i64;
    let mut windows = [0u32; WINDOW_COUNT];

    for (week, count) in &stats.weeks {
        let offset = (today - *week).num_days();
        if (0..span).contains(&offset) {
            windows[(offset / RECENT_WINDOW_DAYS) as usize] += count;
        }
    }
    windows
}

/// Week-over-week percent change; a zero baseline scales the raw count.
pub fn change_percent(recent: u32, previous: u32) -> f64 {
    if previous > 0 {
        (recent as f64 - previous as f64) / previous as f64 * 100.0
    } else {
        recent as f64 * 100.0
    }
}

/// Derive velocity/acceleration/confidence metrics for one topic.
///
/// Returns `None` when the topic has no activity inside the four trailing
/// windows — such topics are silently excluded from synthesis.
pub fn calculate_topic_metrics(stats: &TopicStats, now: DateTime<Utc>) -> Option<TopicMetrics> {
    let windows = trailing_windows(stats, now);
    if windows.iter().all(|w| *w == 0) {
        return None;
    }

    let recent = windows[0];
    let baseline = &windows[1..];
    let previous_mean = baseline.iter().sum::<u32>() as f64 / baseline.len() as f64;
    let variance = baseline
        .iter()
        .map(|w| (*w as f64 - previous_mean).powi(2))
        .sum::<f64>()
        / baseline.len() as f64;
    let std_dev = variance.sqrt();

    let acceleration = if previous_mean > 0.0 {
        recent as f64 / previous_mean
    } else {
        recent as f64
    };
    let surge_detected = recent as f64 > previous_mean + 2.0 * std_dev;
    let is_emerging = (now - stats.first_seen).num_days() <= EMERGING_DAYS;
    let coordination_detected = stats.authorities.values().filter(|t| t.recent > 0).count() >= 2;
    let deadlines_soon = stats.deadlines.iter().any(|d| {
        let days_ahead = (*d - now).num_days();
        (0..=DEADLINE_SOON_DAYS).contains(&days_ahead)
    });
    let three_window_sum = windows[..3].iter().sum::<u32>();

    // First matching rule wins.
    let (bucket, urgency) =
        if (recent >= 3 && acceleration >= 2.0 && surge_detected) || deadlines_soon {
            (Bucket::Imminent, Urgency::Critical)
        } else if acceleration >= 1.5 || coordination_detected {
            (Bucket::Near, Urgency::High)
        } else if is_emerging || three_window_sum >= 4 {
            (Bucket::Strategic, Urgency::Medium)
        } else {
            (Bucket::Strategic, Urgency::Watching)
        };

    let mut confidence = 45.0;
    let mut factors = Vec::new();

    if acceleration >= 2.0 {
        confidence += ((acceleration - 1.0) * 12.0).min(20.0);
        factors.push(format!(
            "Mentions running at {acceleration:.1}x the trailing weekly average"
        ));
    }
    if surge_detected {
        confidence += 10.0;
        factors.push("Recent volume is a statistical surge above baseline".to_string());
    }
    if coordination_detected {
        confidence += 8.0;
        factors.push("Multiple authorities active on this theme in the same week".to_string());
    }
    if deadlines_soon {
        confidence += 6.0;
        factors.push("A compliance deadline falls within 14 days".to_string());
    }
    if recent >= 4 {
        confidence += 5.0;
        factors.push(format!("{recent} mentions in the current window"));
    }
    if three_window_sum >= 6 {
        confidence += 5.0;
        factors.push("Sustained multi-week activity".to_string());
    }
    if is_emerging {
        confidence += 4.0;
        factors.push("Theme first appeared within the past 30 days".to_string());
    }

    let confidence = confidence.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX).round();

    Some(TopicMetrics {
        bucket,
        timeframe: bucket.timeframe(),
        urgency,
        confidence,
        confidence_factors: factors,
        acceleration,
        recent,
        previous_mean,
        surge_detected,
        is_emerging,
        coordination_detected,
        deadlines_soon,
    })
}

/// Map numeric confidence to its display bucket; first satisfied threshold
/// from the top wins.
pub fn classify_confidence(confidence: f64) -> ConfidenceBucket {
    if confidence >= 85.0 {
        ConfidenceBucket::Critical
    } else if confidence >= 70.0 {
        ConfidenceBucket::High
    } else if confidence >= 55.0 {
        ConfidenceBucket::Medium
    } else {
        ConfidenceBucket::Watching
    }
}
