//! Triage and aggregation over resident infrastructure reports.
//!
//! Write side: [`ReportService`] validates submissions, resolves the parish,
//! classifies priority and applies confirm/resolve transitions.
//! Read side: hotspots and power-source classification are recomputed from a
//! fresh snapshot on every query and never cached.

pub mod classifier;
pub mod hotspot;
pub mod lifecycle;
pub mod power_source;
pub mod service;

pub use classifier::{
    classifier_from_config, classify_by_keywords, AssistedClassifier, ClassifierInput,
    KeywordClassifier, PriorityClassifier,
};
pub use hotspot::{detect_hotspots, HotspotParams};
pub use lifecycle::{report_state, ReportState, Submission};
pub use power_source::{infer_power_sources, ParishPowerStatus, PowerRule};
pub use service::{AreaFilter, BackfillStats, ParishStatus, ReportService, Situation};
