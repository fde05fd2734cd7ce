//! Aggregation layer: one pass over the update list, relative to a fixed
//! `now`, producing per-topic, per-authority, and per-sector rolling stats.
//!
//! Everything here is ordinary additive counting into `BTreeMap`s — ordered
//! maps so a rebuilt dashboard serializes byte-identically. Nothing is
//! persisted; the maps live for a single dashboard build.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use regpulse_common::{Mention, Stage, Update};

/// Sample mentions kept per topic for explainability.
pub const MENTION_CAP: usize = 10;

/// Days an update counts as "recent" activity.
pub const RECENT_DAYS: i64 = 7;

/// Upper bound of the "previous" comparison window.
pub const PREVIOUS_DAYS: i64 = 14;

/// Per-authority counters inside one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorityTally {
    pub total: u32,
    pub recent: u32,
}

/// Rolling statistics for one topic token.
#[derive(Debug, Clone)]
pub struct TopicStats {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Monday week-start → number of updates mentioning this topic.
    pub weeks: BTreeMap<NaiveDate, u32>,
    pub authorities: BTreeMap<String, AuthorityTally>,
    pub sectors: BTreeMap<String, u32>,
    pub stage_dates: BTreeMap<Stage, Vec<DateTime<Utc>>>,
    pub deadlines: Vec<DateTime<Utc>>,
    /// First-come sample of backing updates, capped at [`MENTION_CAP`].
    pub mentions: Vec<Mention>,
}

impl TopicStats {
    fn new(seen: DateTime<Utc>) -> Self {
        Self {
            first_seen: seen,
            last_seen: seen,
            weeks: BTreeMap::new(),
            authorities: BTreeMap::new(),
            sectors: BTreeMap::new(),
            stage_dates: BTreeMap::new(),
            deadlines: Vec::new(),
            mentions: Vec::new(),
        }
    }
}

/// Rolling statistics for one authority.
#[derive(Debug, Clone, Default)]
pub struct AuthorityStats {
    pub total: u32,
    /// Updates ≤7 days old.
    pub recent: u32,
    /// Updates 8–14 days old.
    pub previous: u32,
    /// Month-of-year histogram (January = slot 0).
    pub monthly: [u32; 12],
    pub consultations: Vec<DateTime<Utc>>,
    pub finals: Vec<DateTime<Utc>>,
    pub enforcements: Vec<DateTime<Utc>>,
    /// Average days from a consultation to the first final publication
    /// strictly after it. `None` when no pairing exists.
    pub consultation_to_final_avg: Option<f64>,
    pub consultation_to_enforcement_avg: Option<f64>,
}

/// Rolling statistics for one sector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorStats {
    pub recent: u32,
    pub previous: u32,
    pub older: u32,
}

/// The full aggregation snapshot one dashboard build works from.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub topics: BTreeMap<String, TopicStats>,
    pub authorities: BTreeMap<String, AuthorityStats>,
    pub sectors: BTreeMap<String, SectorStats>,
}

impl Aggregates {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.authorities.is_empty() && self.sectors.is_empty()
    }
}

/// Monday of the update's ISO week, as a date (UTC midnight).
pub fn week_start(dt: DateTime<Utc>) -> NaiveDate {
    let date = dt.date_naive();
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Build the aggregation snapshot for a fixed `now`.
pub fn aggregate(updates: &[Update], now: DateTime<Utc>) -> Aggregates {
    let mut agg = Aggregates::default();

    for update in updates {
        let age_days = (now - update.published).num_days();
        let week = week_start(update.published);

        for token in &update.tokens {
            let stats = agg
                .topics
                .entry(token.clone())
                .or_insert_with(|| TopicStats::new(update.published));

            stats.first_seen = stats.first_seen.min(update.published);
            stats.last_seen = stats.last_seen.max(update.published);
            *stats.weeks.entry(week).or_default() += 1;

            let tally = stats.authorities.entry(update.authority.clone()).or_default();
            tally.total += 1;
            if age_days <= RECENT_DAYS {
                tally.recent += 1;
            }

            for sector in &update.sectors {
                *stats.sectors.entry(sector.clone()).or_default() += 1;
            }

            if matches!(update.stage, Stage::Consultation | Stage::Final | Stage::Enforcement) {
                stats
                    .stage_dates
                    .entry(update.stage)
                    .or_default()
                    .push(update.published);
            }

            if let Some(deadline) = update.deadline {
                stats.deadlines.push(deadline);
            }

            if stats.mentions.len() < MENTION_CAP {
                stats.mentions.push(Mention {
                    headline: update.headline.clone(),
                    authority: update.authority.clone(),
                    date: update.published,
                    stage: update.stage,
                    url: update.url.clone(),
                });
            }
        }

        let authority = agg.authorities.entry(update.authority.clone()).or_default();
        authority.total += 1;
        if age_days <= RECENT_DAYS {
            authority.recent += 1;
        } else if age_days <= PREVIOUS_DAYS {
            authority.previous += 1;
        }
        authority.monthly[update.published.month0() as usize] += 1;
        match update.stage {
            Stage::Consultation => authority.consultations.push(update.published),
            Stage::Final => authority.finals.push(update.published),
            Stage::Enforcement => authority.enforcements.push(update.published),
            _ => {}
        }

        // Sector bucketing is once per sector per update, not per token.
        for sector in &update.sectors {
            let stats = agg.sectors.entry(sector.clone()).or_default();
            if age_days <= RECENT_DAYS {
                stats.recent += 1;
            } else if age_days <= PREVIOUS_DAYS {
                stats.previous += 1;
            } else {
                stats.older += 1;
            }
        }
    }

    for authority in agg.authorities.values_mut() {
        authority.consultation_to_final_avg =
            calculate_stage_lag(&authority.consultations, &authority.finals);
        authority.consultation_to_enforcement_avg =
            calculate_stage_lag(&authority.consultations, &authority.enforcements);
    }

    agg
}

/// Average days from each start date to the earliest end date strictly after
/// it. `None` when either list is empty or no start found a later end.
pub fn calculate_stage_lag(starts: &[DateTime<Utc>], ends: &[DateTime<Utc>]) -> Option<f64> {
    if starts.is_empty() || ends.is_empty() {
        return None;
    }

    let mut lags = Vec::new();
    for start in starts {
        let earliest_after = ends.iter().filter(|end| *end > start).min();
        if let Some(end) = earliest_after {
            lags.push((*end - *start).num_days() as f64);
        }
    }

    if lags.is_empty() {
        return None;
    }
    Some(lags.iter().sum::<f64>() / lags.len() as f64)
}
