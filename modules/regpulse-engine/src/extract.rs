//! Feature extraction: raw record → canonical [`Update`].
//!
//! Upstream stores spell the same concept several ways (`publishedDate`,
//! `published_date`, `fetchedDate`...). All of that tolerance lives here, in
//! one normalization step; every later stage sees exactly one shape.
//! Extraction is pure and defensive: unparseable dates become `None` or drop
//! the record, missing fields fall back to sentinels, nothing panics.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use regpulse_common::{Stage, Update};

/// Minimum keyword length worth tracking as a topic.
const MIN_TOKEN_LEN: usize = 4;

/// Common English words that carry no thematic signal.
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "among", "area",
    "around", "because", "been", "before", "being", "below", "between", "both",
    "could", "does", "doing", "down", "during", "each", "firm", "firms",
    "from", "further", "have", "having", "here", "including", "into", "just",
    "made", "make", "more", "most", "must", "once", "only", "other", "over",
    "said", "same", "should", "some", "such", "than", "that", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "under",
    "until", "upon", "very", "were", "what", "when", "where", "which",
    "while", "will", "with", "within", "would", "your",
];

/// A regulatory-publication record as it arrives from an update source,
/// before normalization. Every field is optional; serde aliases absorb the
/// spelling variants seen across stores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawUpdate {
    #[serde(alias = "title")]
    pub headline: Option<String>,
    #[serde(alias = "description")]
    pub summary: Option<String>,
    #[serde(alias = "regulator", alias = "source")]
    pub authority: Option<String>,
    #[serde(
        alias = "published_date",
        alias = "fetchedDate",
        alias = "fetched_date",
        alias = "date"
    )]
    pub published_date: Option<String>,
    #[serde(alias = "compliance_deadline", alias = "deadline")]
    pub compliance_deadline: Option<String>,
    #[serde(alias = "primary_sectors")]
    pub primary_sectors: Option<Vec<serde_json::Value>>,
    #[serde(alias = "firm_types_affected")]
    pub firm_types_affected: Option<Vec<serde_json::Value>>,
    pub sector: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    #[serde(alias = "type", alias = "update_type")]
    pub update_type: Option<String>,
    pub url: Option<String>,
}

/// Normalize a raw record into the canonical shape.
///
/// Returns `None` when the record lacks a headline or a parseable published
/// date — those are the two fields nothing downstream can work without.
pub fn normalize(raw: RawUpdate) -> Option<Update> {
    let headline = raw.headline.as_deref().map(str::trim).unwrap_or("");
    if headline.is_empty() {
        debug!("Dropping update without headline");
        return None;
    }

    let published = match raw.published_date.as_deref().and_then(parse_datetime) {
        Some(dt) => dt,
        None => {
            debug!(headline, "Dropping update without parseable published date");
            return None;
        }
    };

    let summary = raw.summary.as_deref().map(str::trim).unwrap_or("").to_string();
    let authority = raw
        .authority
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let mut sectors = collect_sectors(&raw);
    if sectors.is_empty() {
        sectors.push("General".to_string());
    }

    let stage = detect_stage(&raw);
    let deadline = raw.compliance_deadline.as_deref().and_then(parse_datetime);
    let tokens = tokenize(&format!("{headline} {summary}"));

    Some(Update {
        headline: headline.to_string(),
        summary,
        authority,
        published,
        deadline,
        sectors,
        stage,
        tokens,
        url: raw.url,
    })
}

/// Extract normalized topic keywords: lowercase alphabetic runs of length
/// ≥4, minus stop words. Returns a set, so a repeated word inside one
/// update counts once per aggregation step.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|run| run.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(run))
        .map(str::to_string)
        .collect()
}

/// Union every sector-like field into one deduplicated list, first-come
/// order. Empty result means the caller substitutes `["General"]`.
pub fn collect_sectors(raw: &RawUpdate) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut sectors = Vec::new();

    let mut push = |value: String| {
        let value = value.trim().to_string();
        if !value.is_empty() && seen.insert(value.clone()) {
            sectors.push(value);
        }
    };

    for list in [&raw.primary_sectors, &raw.firm_types_affected].into_iter().flatten() {
        for value in list {
            match value {
                serde_json::Value::String(s) => push(s.clone()),
                serde_json::Value::Number(n) => push(n.to_string()),
                _ => {}
            }
        }
    }
    for field in [&raw.sector, &raw.category, &raw.area].into_iter().flatten() {
        push(field.clone());
    }

    sectors
}

/// Infer the regulatory lifecycle stage from type/category/summary/headline
/// text. First match wins — summaries often contain several stage keywords,
/// so the priority order here is load-bearing.
pub fn detect_stage(raw: &RawUpdate) -> Stage {
    let haystack = [
        raw.update_type.as_deref(),
        raw.category.as_deref(),
        raw.summary.as_deref(),
        raw.headline.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    let matches_any = |needles: &[&str]| needles.iter().any(|n| haystack.contains(n));

    if matches_any(&["final rule", "policy statement", "final guidance"]) {
        Stage::Final
    } else if matches_any(&["consultation", "request for comment"]) {
        Stage::Consultation
    } else if matches_any(&["enforcement", "penalty", "fine"]) {
        Stage::Enforcement
    } else if matches_any(&["speech", "remarks", "roundtable"]) {
        Stage::Informal
    } else if matches_any(&["draft", "proposal"]) {
        Stage::Proposal
    } else {
        Stage::Update
    }
}

/// Parse a date-like string. Accepts RFC 3339, a naive datetime, or a plain
/// `YYYY-MM-DD`. Returns `None` rather than erroring on anything else.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    None
}
