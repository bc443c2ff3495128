use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// --- Geo ---

/// Haversine great-circle distance between two lat/lng points in meters.
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Axis-aligned lat/lng box. Used for the district envelope that every
/// submitted coordinate must fall inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

// --- Enums ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Electricity,
    TelecomMobile,
    TelecomFixed,
    Water,
    Roads,
}

impl ReportType {
    pub const ALL: [ReportType; 5] = [
        ReportType::Electricity,
        ReportType::TelecomMobile,
        ReportType::TelecomFixed,
        ReportType::Water,
        ReportType::Roads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Electricity => "electricity",
            ReportType::TelecomMobile => "telecom_mobile",
            ReportType::TelecomFixed => "telecom_fixed",
            ReportType::Water => "water",
            ReportType::Roads => "roads",
        }
    }

    /// Only telecom reports carry an operator.
    pub fn is_telecom(&self) -> bool {
        matches!(self, ReportType::TelecomMobile | ReportType::TelecomFixed)
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidReportType(s.to_string()))
    }
}

/// Urgency tier. Variant order is the triage order: `Urgente` sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgente,
    Importante,
    Normal,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Urgente, Priority::Importante, Priority::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgente => "urgente",
            Priority::Importante => "importante",
            Priority::Normal => "normal",
        }
    }

    /// Exact label lookup. Anything outside the three labels is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Priority::ALL.into_iter().find(|p| p.as_str() == label)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supply source a reporter asserts when closing an electricity report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PowerSourceTag {
    Grid,
    Generator,
}

impl PowerSourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerSourceTag::Grid => "grid",
            PowerSourceTag::Generator => "generator",
        }
    }
}

impl FromStr for PowerSourceTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(PowerSourceTag::Grid),
            "generator" => Ok(PowerSourceTag::Generator),
            other => Err(ValidationError::InvalidPowerSource(other.to_string())),
        }
    }
}

/// Inferred per-parish electricity supply state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    Grid,
    Generator,
    NoPower,
    Unknown,
}

impl std::fmt::Display for PowerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerSource::Grid => write!(f, "grid"),
            PowerSource::Generator => write!(f, "generator"),
            PowerSource::NoPower => write!(f, "no_power"),
            PowerSource::Unknown => write!(f, "unknown"),
        }
    }
}

// --- Reports ---

/// A resident's infrastructure report.
///
/// `upvotes` starts at 1 and only grows, `resolved` only goes false → true,
/// and `priority` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub operator: Option<String>,
    pub description: Option<String>,
    pub street: Option<String>,
    pub parish: Option<String>,
    pub concelho: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub power_source: Option<PowerSourceTag>,
    pub upvotes: u32,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub last_upvoted_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// A resolved electricity report's source tag, as fed to power-source inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPowerTag {
    pub parish: String,
    pub tag: PowerSourceTag,
    pub resolved_at: DateTime<Utc>,
}

/// Latest authoritative outage count for one concelho.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageTelemetry {
    pub concelho: String,
    pub outages: u32,
    pub observed_at: DateTime<Utc>,
}

/// Ephemeral cluster of nearby recent reports. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub centroid_lat: f64,
    pub centroid_lng: f64,
    pub report_ids: Vec<Uuid>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_sorts_urgente_first() {
        let mut tiers = vec![Priority::Normal, Priority::Urgente, Priority::Importante];
        tiers.sort();
        assert_eq!(tiers, vec![Priority::Urgente, Priority::Importante, Priority::Normal]);
    }

    #[test]
    fn report_type_parses_wire_names() {
        assert_eq!("telecom_fixed".parse::<ReportType>().unwrap(), ReportType::TelecomFixed);
        assert!(matches!(
            "gas".parse::<ReportType>(),
            Err(ValidationError::InvalidReportType(t)) if t == "gas"
        ));
    }

    #[test]
    fn report_type_serializes_snake_case() {
        let json = serde_json::to_string(&ReportType::TelecomMobile).unwrap();
        assert_eq!(json, "\"telecom_mobile\"");
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let d = haversine_meters(39.0, -8.8, 40.0, -8.8);
        assert!((d - 111_195.0).abs() < 100.0, "Expected ~111km, got {d}m");
    }

    #[test]
    fn bounding_box_is_inclusive() {
        let bbox = BoundingBox { min_lat: 39.0, max_lat: 40.0, min_lng: -9.0, max_lng: -8.0 };
        assert!(bbox.contains(39.0, -8.0));
        assert!(!bbox.contains(40.01, -8.5));
    }
}
