use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Regulatory lifecycle phase inferred for an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Final,
    Consultation,
    Enforcement,
    Informal,
    Proposal,
    Update,
}

impl Stage {
    /// Rank used when picking the single most load-bearing sample mention
    /// for a prediction. Lower wins: an enforcement notice beats a speech.
    pub fn mention_priority(self) -> u8 {
        match self {
            Stage::Enforcement => 0,
            Stage::Final => 1,
            Stage::Consultation => 2,
            Stage::Proposal => 3,
            Stage::Update => 5,
            Stage::Informal => 7,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Final => write!(f, "final"),
            Stage::Consultation => write!(f, "consultation"),
            Stage::Enforcement => write!(f, "enforcement"),
            Stage::Informal => write!(f, "informal"),
            Stage::Proposal => write!(f, "proposal"),
            Stage::Update => write!(f, "update"),
        }
    }
}

/// Urgency tier assigned by topic classification. Ordered so that
/// comparisons express "at least this urgent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Watching,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Watching => write!(f, "WATCHING"),
            Urgency::Medium => write!(f, "MEDIUM"),
            Urgency::High => write!(f, "HIGH"),
            Urgency::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Label derived from a prediction's numeric confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    Watching,
    Medium,
    High,
    Critical,
}

/// Forecast horizon bucket for a classified topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Imminent,
    Near,
    Strategic,
}

impl Bucket {
    pub fn lane(self) -> Lane {
        match self {
            Bucket::Imminent => Lane::ActNow,
            Bucket::Near => Lane::PrepareNext,
            Bucket::Strategic => Lane::Monitor,
        }
    }

    pub fn timeframe(self) -> &'static str {
        match self {
            Bucket::Imminent => "7-14 days",
            Bucket::Near => "15-30 days",
            Bucket::Strategic => "30-90 days",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Imminent => write!(f, "imminent"),
            Bucket::Near => write!(f, "near"),
            Bucket::Strategic => write!(f, "strategic"),
        }
    }
}

/// Action lane the dashboard groups predictions into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    ActNow,
    PrepareNext,
    Monitor,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lane::ActNow => write!(f, "act_now"),
            Lane::PrepareNext => write!(f, "prepare_next"),
            Lane::Monitor => write!(f, "monitor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Urgency> for Severity {
    fn from(u: Urgency) -> Self {
        match u {
            Urgency::Critical => Severity::Critical,
            Urgency::High => Severity::High,
            Urgency::Medium => Severity::Medium,
            Urgency::Watching => Severity::Low,
        }
    }
}

// --- Canonical input ---

/// A regulatory-publication record after ingestion normalization.
///
/// Every alias spelling the upstream stores use (`publishedDate`,
/// `published_date`, `fetchedDate`, ...) has already been resolved; all
/// downstream stages operate on this one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub headline: String,
    pub summary: String,
    pub authority: String,
    pub published: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    /// Resolved sector list, never empty (`["General"]` when unattributed).
    pub sectors: Vec<String>,
    pub stage: Stage,
    /// Normalized topic keywords extracted from headline + summary.
    pub tokens: BTreeSet<String>,
    pub url: Option<String>,
}

// --- Prediction output ---

/// One sample update backing a topic, kept for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub headline: String,
    pub authority: String,
    pub date: DateTime<Utc>,
    pub stage: Stage,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    Velocity,
    Coordination,
    Deadline,
    HistoricalPattern,
    Emergence,
}

/// A typed, severity-tagged statement supporting a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub severity: Severity,
    pub statement: String,
}

/// Static benchmark context attached to each prediction. Illustrative
/// only — there is no feedback loop updating these figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAccuracy {
    pub rate: f64,
    pub sample: String,
    pub window: String,
}

/// Nested context bundle on a prediction: the raw signals behind the
/// classification plus the sample updates that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionContext {
    pub recent_mentions: u32,
    pub trailing_weekly_mean: f64,
    pub acceleration: f64,
    pub surge_detected: bool,
    pub is_emerging: bool,
    pub coordination_detected: bool,
    pub deadlines_soon: bool,
    pub historical_accuracy: HistoricalAccuracy,
    pub triggering_updates: Vec<Mention>,
}

/// A ranked, explainable forward-looking call about a regulatory theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub prediction_title: String,
    pub timeframe: String,
    pub confidence: f64,
    pub urgency: Urgency,
    pub confidence_bucket: ConfidenceBucket,
    pub priority_lane: Lane,
    pub priority_score: f64,
    pub focus: String,
    pub stage: Stage,
    pub evidence: Vec<Evidence>,
    pub affected_sectors: Vec<String>,
    pub why_this_matters: String,
    pub recommended_actions: Vec<String>,
    pub supporting_topics: Vec<String>,
    pub confidence_factors: Vec<String>,
    pub context: PredictionContext,
}

// --- Momentum & alerts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumClass {
    Accelerating,
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityMomentum {
    pub authority: String,
    pub recent: u32,
    pub previous: u32,
    pub change_percent: f64,
    pub classification: MomentumClass,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMomentum {
    pub topic: String,
    pub recent: u32,
    pub acceleration: f64,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorMomentum {
    pub sector: String,
    pub recent: u32,
    pub previous: u32,
    pub change_percent: f64,
    pub classification: MomentumClass,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    AuthorityVelocity,
    Coordination,
    Emergence,
}

/// Cross-cutting pattern alert surfaced alongside the prediction lanes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub headline: String,
    pub detail: String,
}

// --- Dashboard payload ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionLanes {
    pub imminent: Vec<Prediction>,
    pub near_term: Vec<Prediction>,
    pub strategic: Vec<Prediction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumBoard {
    pub authorities: Vec<AuthorityMomentum>,
    pub topics: Vec<TopicMomentum>,
    pub sectors: Vec<SectorMomentum>,
}

/// The full payload handed to the dashboard UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub predictions: PredictionLanes,
    pub momentum: MomentumBoard,
    pub alerts: Vec<Alert>,
    pub methodology: Vec<String>,
}

/// Optional per-firm view: only used to key the dashboard cache and to
/// narrow the update stream to sectors the firm cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmProfile {
    pub id: String,
    #[serde(default)]
    pub sectors: Vec<String>,
}
