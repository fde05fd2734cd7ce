//! RegPulse predictive intelligence engine.
//!
//! Ingests regulatory-publication update records and produces ranked,
//! explainable predictions about accelerating themes, unusually active
//! authorities, and cross-authority coordination, grouped into action lanes
//! for a dashboard. The engine is a pure computation over an in-memory
//! snapshot — it owns no storage and no network I/O.

pub mod aggregate;
pub mod cache;
pub mod extract;
pub mod metrics;
pub mod momentum;
pub mod pipeline;
pub mod source;
pub mod synthesis;

pub use cache::{Clock, DashboardCache, SystemClock, DEFAULT_TTL_MINUTES};
pub use extract::RawUpdate;
pub use pipeline::{build_dashboard, Orchestrator};
pub use source::{JsonFileSource, StaticSource, UpdateSource};
