//! End-to-end dashboard scenarios: raw records in, ranked predictions out.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use regpulse_common::{AlertKind, EvidenceKind, Severity, Urgency};
use regpulse_engine::aggregate::aggregate;
use regpulse_engine::extract::{normalize, parse_datetime, RawUpdate};
use regpulse_engine::metrics::calculate_topic_metrics;
use regpulse_engine::{build_dashboard, Clock, Orchestrator, RawUpdate as Raw, StaticSource};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn utc(s: &str) -> DateTime<Utc> {
    parse_datetime(s).expect("test date must parse")
}

/// A Wednesday; the current week started two days earlier.
fn now() -> DateTime<Utc> {
    utc("2026-03-04T12:00:00Z")
}

fn raw(headline: &str, authority: &str, published: &str) -> RawUpdate {
    RawUpdate {
        headline: Some(headline.to_string()),
        authority: Some(authority.to_string()),
        published_date: Some(published.to_string()),
        ..Default::default()
    }
}

fn normalized(records: Vec<RawUpdate>) -> Vec<regpulse_common::Update> {
    records.into_iter().filter_map(normalize).collect()
}

fn climate_records() -> Vec<RawUpdate> {
    let mut records = vec![
        raw("Climate disclosure framework tightening", "FCA", "2026-03-02T09:00:00Z"),
        raw("Climate stress testing expectations", "FCA", "2026-03-03T09:00:00Z"),
        raw("Climate transition plans review", "FCA", "2026-03-04T08:00:00Z"),
        raw("Climate risk survey published", "FCA", "2026-02-25T09:00:00Z"),
    ];
    let mut with_deadline = raw(
        "Climate reporting deadline approaches",
        "FCA",
        "2026-03-04T09:00:00Z",
    );
    with_deadline.compliance_deadline = Some("2026-03-09".to_string());
    records.push(with_deadline);
    records
}

// ---------------------------------------------------------------------------
// Spec scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_update_list_builds_empty_dashboard() {
    let dashboard = build_dashboard(&[], now(), None);

    assert!(dashboard.predictions.imminent.is_empty());
    assert!(dashboard.predictions.near_term.is_empty());
    assert!(dashboard.predictions.strategic.is_empty());
    assert!(dashboard.momentum.authorities.is_empty());
    assert!(dashboard.momentum.topics.is_empty());
    assert!(dashboard.momentum.sectors.is_empty());
    assert!(dashboard.alerts.is_empty());
    assert!(!dashboard.methodology.is_empty());
    assert_eq!(dashboard.generated_at, now());
}

#[test]
fn climate_surge_with_deadline_is_imminent_critical() {
    let updates = normalized(climate_records());

    // 0 in weeks -4..-2, 1 in week -1, 4 this week, deadline five days out
    let agg = aggregate(&updates, now());
    let metrics = calculate_topic_metrics(&agg.topics["climate"], now()).unwrap();
    assert_eq!(metrics.recent, 4);
    assert!(metrics.deadlines_soon);
    assert_eq!(metrics.urgency, Urgency::Critical);

    let dashboard = build_dashboard(&updates, now(), None);
    let deadline_backed = dashboard
        .predictions
        .imminent
        .iter()
        .find(|p| p.evidence.iter().any(|e| e.kind == EvidenceKind::Deadline))
        .expect("an imminent prediction backed by deadline evidence");
    assert_eq!(deadline_backed.urgency, Urgency::Critical);
    assert_eq!(deadline_backed.timeframe, "7-14 days");
}

#[test]
fn authority_surge_emits_high_velocity_alert() {
    // FCA: 5 updates ≤7 days old, 2 at 8-14 days → +150% week-over-week
    let updates = normalized(vec![
        raw("Payments oversight expanding", "FCA", "2026-02-28T09:00:00Z"),
        raw("Wholesale markets notice", "FCA", "2026-03-01T09:00:00Z"),
        raw("Listings regime changes", "FCA", "2026-03-02T09:00:00Z"),
        raw("Consumer credit reminder", "FCA", "2026-03-03T09:00:00Z"),
        raw("Prudential returns guidance", "FCA", "2026-03-04T09:00:00Z"),
        raw("Mortgage reporting circular", "FCA", "2026-02-22T09:00:00Z"),
        raw("Conduct questionnaire issued", "FCA", "2026-02-20T09:00:00Z"),
    ]);

    let dashboard = build_dashboard(&updates, now(), None);

    let alert = dashboard
        .alerts
        .iter()
        .find(|a| a.kind == AlertKind::AuthorityVelocity)
        .expect("authority-velocity alert");
    assert_eq!(alert.severity, Severity::High);

    let fca = dashboard
        .momentum
        .authorities
        .iter()
        .find(|m| m.authority == "FCA")
        .expect("FCA momentum entry");
    assert_eq!(fca.recent, 5);
    assert_eq!(fca.previous, 2);
    assert_eq!(fca.change_percent, 150.0);
}

#[test]
fn two_authorities_on_one_theme_is_coordination() {
    let updates = normalized(vec![
        raw("FCA review of outsourcing arrangements", "FCA", "2026-03-03T09:00:00Z"),
        raw("PRA statement on outsourcing resilience", "PRA", "2026-03-04T09:00:00Z"),
    ]);

    let agg = aggregate(&updates, now());
    let metrics = calculate_topic_metrics(&agg.topics["outsourcing"], now()).unwrap();
    assert!(metrics.coordination_detected);

    let dashboard = build_dashboard(&updates, now(), None);
    assert!(
        dashboard
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::Coordination),
        "coordination alert expected"
    );
}

// ---------------------------------------------------------------------------
// Cross-cutting properties
// ---------------------------------------------------------------------------

#[test]
fn identical_input_builds_byte_identical_dashboards() {
    let mut records = climate_records();
    records.push(raw("PRA statement on outsourcing resilience", "PRA", "2026-03-04T09:00:00Z"));
    records.push(raw("FCA review of outsourcing arrangements", "FCA", "2026-03-03T09:00:00Z"));
    let updates = normalized(records);

    let a = serde_json::to_string(&build_dashboard(&updates, now(), None)).unwrap();
    let b = serde_json::to_string(&build_dashboard(&updates, now(), None)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn predictions_stay_in_bounds_across_lanes() {
    let mut records = climate_records();
    records.push(raw("PRA statement on outsourcing resilience", "PRA", "2026-03-04T09:00:00Z"));
    records.push(raw("FCA review of outsourcing arrangements", "FCA", "2026-03-03T09:00:00Z"));
    records.push(raw("BoE speech on stablecoins oversight", "BoE", "2026-03-01T09:00:00Z"));
    let updates = normalized(records);

    let dashboard = build_dashboard(&updates, now(), None);
    let lanes = [
        &dashboard.predictions.imminent,
        &dashboard.predictions.near_term,
        &dashboard.predictions.strategic,
    ];

    let mut seen_ids = std::collections::BTreeSet::new();
    for lane in lanes {
        assert!(lane.len() <= 5);
        for p in lane {
            assert!((40.0..=96.0).contains(&p.confidence), "confidence out of bounds");
            assert_eq!(
                p.confidence_bucket,
                regpulse_engine::metrics::classify_confidence(p.confidence)
            );
            assert!(!p.evidence.is_empty(), "evidence must never be empty");
            assert!(seen_ids.insert(p.id), "prediction id {} duplicated across lanes", p.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator + cache
// ---------------------------------------------------------------------------

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    fn advance(&self, minutes: i64) {
        *self.now.lock().unwrap() += Duration::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[tokio::test]
async fn orchestrator_caches_until_ttl_expires() {
    let source = Arc::new(StaticSource::new(climate_records()));
    let clock = Arc::new(ManualClock::new(now()));
    let orchestrator = Orchestrator::new(source, clock.clone(), 30);

    let first = orchestrator.dashboard(None).await.unwrap();
    clock.advance(10);
    let second = orchestrator.dashboard(None).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second), "inside TTL the cached build is shared");

    clock.advance(25);
    let third = orchestrator.dashboard(None).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third), "past TTL a fresh build is produced");
    assert!(third.generated_at > first.generated_at);
}

#[tokio::test]
async fn orchestrator_skips_unparseable_records() {
    let mut records: Vec<Raw> = climate_records();
    records.push(raw("Headline with bad date", "FCA", "not a date"));
    records.push(RawUpdate::default()); // no headline at all

    let source = Arc::new(StaticSource::new(records));
    let clock = Arc::new(ManualClock::new(now()));
    let orchestrator = Orchestrator::new(source, clock, 30);

    // Defective records are dropped, the rest still build
    let dashboard = orchestrator.dashboard(None).await.unwrap();
    assert!(!dashboard.predictions.imminent.is_empty());
}
