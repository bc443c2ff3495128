//! Report lifecycle rules: submission validation and the derived
//! Active / Stale / Resolved / Expired view.
//!
//! Staleness is never stored. It is recomputed from `(now, created_at,
//! last_upvoted_at)` each time it is asked for.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use faultmap_common::{clean_optional, BoundingBox, Report, ReportType, ValidationError};

/// Unresolved reports older than this drop out of every active view.
pub const VISIBILITY_WINDOW_DAYS: i64 = 7;
/// An active report must be at least this old to go stale...
pub const STALE_MIN_AGE_HOURS: i64 = 48;
/// ...and have had no confirmation for this long.
pub const STALE_QUIET_HOURS: i64 = 24;

pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const STREET_MAX_CHARS: usize = 200;
const OPERATOR_MAX_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Active,
    Stale,
    Resolved,
    /// Unresolved but outside the visibility window. Kept, never shown.
    Expired,
}

pub fn visibility_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(VISIBILITY_WINDOW_DAYS)
}

pub fn is_active(report: &Report, now: DateTime<Utc>) -> bool {
    !report.resolved && report.created_at >= visibility_cutoff(now)
}

pub fn is_stale(report: &Report, now: DateTime<Utc>) -> bool {
    is_active(report, now)
        && now - report.created_at > Duration::hours(STALE_MIN_AGE_HOURS)
        && now - report.last_upvoted_at > Duration::hours(STALE_QUIET_HOURS)
}

pub fn report_state(report: &Report, now: DateTime<Utc>) -> ReportState {
    if report.resolved {
        ReportState::Resolved
    } else if !is_active(report, now) {
        ReportState::Expired
    } else if is_stale(report, now) {
        ReportState::Stale
    } else {
        ReportState::Active
    }
}

/// Triage order: priority tier first (urgente, importante, normal), newest
/// first within a tier.
pub fn sort_for_triage(reports: &mut [Report]) {
    reports.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Raw submission as it arrives from the outer interface.
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(rename = "type", default)]
    #[builder(setter(into))]
    pub report_type: String,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub operator: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub street: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub lat: Option<f64>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub lng: Option<f64>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub image_url: Option<String>,
}

/// A submission that passed validation, with text fields normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub report_type: ReportType,
    pub operator: Option<String>,
    pub description: Option<String>,
    pub street: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub image_url: Option<String>,
}

impl Submission {
    /// Reject before any state change: missing fields, unknown type,
    /// coordinates outside the district. Long text is truncated, not rejected.
    pub fn validate(&self, district: &BoundingBox) -> Result<ValidSubmission, ValidationError> {
        let raw_type = self.report_type.trim();
        if raw_type.is_empty() {
            return Err(ValidationError::MissingField("type"));
        }
        let report_type: ReportType = raw_type.parse()?;

        let lat = self.lat.ok_or(ValidationError::MissingField("lat"))?;
        let lng = self.lng.ok_or(ValidationError::MissingField("lng"))?;
        if !lat.is_finite() || !lng.is_finite() || !district.contains(lat, lng) {
            return Err(ValidationError::OutOfBounds { lat, lng });
        }

        let operator = if report_type.is_telecom() {
            clean_optional(self.operator.as_deref(), OPERATOR_MAX_CHARS)
        } else {
            None
        };

        Ok(ValidSubmission {
            report_type,
            operator,
            description: clean_optional(self.description.as_deref(), DESCRIPTION_MAX_CHARS),
            street: clean_optional(self.street.as_deref(), STREET_MAX_CHARS),
            lat,
            lng,
            image_url: clean_optional(self.image_url.as_deref(), usize::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultmap_common::{config::DEFAULT_DISTRICT_BOUNDS, Priority};
    use uuid::Uuid;

    fn report_aged(now: DateTime<Utc>, age: Duration, since_upvote: Duration) -> Report {
        Report {
            id: Uuid::new_v4(),
            report_type: ReportType::Water,
            operator: None,
            description: None,
            street: None,
            parish: None,
            concelho: None,
            lat: 39.74,
            lng: -8.81,
            resolved: false,
            resolved_at: None,
            power_source: None,
            upvotes: 1,
            priority: Priority::Normal,
            created_at: now - age,
            last_upvoted_at: now - since_upvote,
            image_url: None,
        }
    }

    #[test]
    fn old_unconfirmed_report_is_stale() {
        let now = Utc::now();
        let r = report_aged(now, Duration::hours(50), Duration::hours(30));
        assert_eq!(report_state(&r, now), ReportState::Stale);
    }

    #[test]
    fn recent_confirmation_revives_stale_report() {
        let now = Utc::now();
        let r = report_aged(now, Duration::hours(50), Duration::hours(1));
        assert_eq!(report_state(&r, now), ReportState::Active);
    }

    #[test]
    fn young_report_is_never_stale() {
        let now = Utc::now();
        let r = report_aged(now, Duration::hours(40), Duration::hours(40));
        assert_eq!(report_state(&r, now), ReportState::Active);
    }

    #[test]
    fn report_past_window_is_expired() {
        let now = Utc::now();
        let r = report_aged(now, Duration::days(8), Duration::days(8));
        assert_eq!(report_state(&r, now), ReportState::Expired);
    }

    #[test]
    fn resolved_wins_over_age() {
        let now = Utc::now();
        let mut r = report_aged(now, Duration::days(8), Duration::days(8));
        r.resolved = true;
        assert_eq!(report_state(&r, now), ReportState::Resolved);
    }

    #[test]
    fn triage_order_is_priority_then_newest() {
        let now = Utc::now();
        let mut old_urgent = report_aged(now, Duration::hours(5), Duration::hours(5));
        old_urgent.priority = Priority::Urgente;
        let mut new_urgent = report_aged(now, Duration::hours(1), Duration::hours(1));
        new_urgent.priority = Priority::Urgente;
        let normal = report_aged(now, Duration::minutes(1), Duration::minutes(1));
        let mut reports = vec![normal.clone(), old_urgent.clone(), new_urgent.clone()];

        sort_for_triage(&mut reports);

        let ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new_urgent.id, old_urgent.id, normal.id]);
    }

    #[test]
    fn operator_is_dropped_for_non_telecom() {
        let s = Submission::builder()
            .report_type("water")
            .operator("MEO")
            .lat(39.74)
            .lng(-8.81)
            .build();
        assert_eq!(s.validate(&DEFAULT_DISTRICT_BOUNDS).unwrap().operator, None);
    }

    #[test]
    fn operator_is_kept_for_telecom() {
        let s = Submission::builder()
            .report_type("telecom_fixed")
            .operator(" NOS ")
            .lat(39.74)
            .lng(-8.81)
            .build();
        assert_eq!(s.validate(&DEFAULT_DISTRICT_BOUNDS).unwrap().operator.as_deref(), Some("NOS"));
    }

    #[test]
    fn long_text_is_truncated_silently() {
        let s = Submission::builder()
            .report_type("roads")
            .description("x".repeat(800))
            .street("r".repeat(300))
            .lat(39.74)
            .lng(-8.81)
            .build();
        let valid = s.validate(&DEFAULT_DISTRICT_BOUNDS).unwrap();
        assert_eq!(valid.description.unwrap().chars().count(), DESCRIPTION_MAX_CHARS);
        assert_eq!(valid.street.unwrap().chars().count(), STREET_MAX_CHARS);
    }

    #[test]
    fn rejects_unknown_type() {
        let s = Submission::builder().report_type("gas").lat(39.74).lng(-8.81).build();
        assert!(matches!(
            s.validate(&DEFAULT_DISTRICT_BOUNDS),
            Err(ValidationError::InvalidReportType(_))
        ));
    }

    #[test]
    fn rejects_missing_coordinates() {
        let s = Submission::builder().report_type("water").lat(39.74).build();
        assert!(matches!(
            s.validate(&DEFAULT_DISTRICT_BOUNDS),
            Err(ValidationError::MissingField("lng"))
        ));
    }

    #[test]
    fn rejects_coordinates_outside_district() {
        // Lisbon
        let s = Submission::builder().report_type("water").lat(38.72).lng(-9.14).build();
        assert!(matches!(
            s.validate(&DEFAULT_DISTRICT_BOUNDS),
            Err(ValidationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn deserializes_wire_submission() {
        let s: Submission = serde_json::from_str(
            r#"{"type":"electricity","lat":39.74,"lng":-8.81,"description":"poste caído"}"#,
        )
        .unwrap();
        assert_eq!(s.report_type, "electricity");
        assert_eq!(s.description.as_deref(), Some("poste caído"));
    }
}
