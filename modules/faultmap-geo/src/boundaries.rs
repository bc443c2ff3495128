use std::path::Path;

use anyhow::{anyhow, Context, Result};
use faultmap_common::BoundingBox;
use serde::Deserialize;
use tracing::info;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A polygon in (lng, lat) vertex order, as GeoJSON stores it.
/// The first ring is the exterior; any further rings are holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<(f64, f64)>,
    holes: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> Self {
        Self { exterior, holes }
    }

    /// Axis-aligned rectangle, handy for fixtures.
    pub fn rectangle(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self::new(
            vec![
                (min_lng, min_lat),
                (max_lng, min_lat),
                (max_lng, max_lat),
                (min_lng, max_lat),
                (min_lng, min_lat),
            ],
            Vec::new(),
        )
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        ring_contains(&self.exterior, lng, lat)
            && !self.holes.iter().any(|hole| ring_contains(hole, lng, lat))
    }

    fn bounds(&self) -> Option<BoundingBox> {
        bounds_of(self.exterior.iter().copied())
    }
}

/// Even-odd ray casting. Points exactly on an edge may land either side.
fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn bounds_of(points: impl Iterator<Item = (f64, f64)>) -> Option<BoundingBox> {
    points.fold(None, |acc, (lng, lat)| {
        Some(match acc {
            None => BoundingBox { min_lat: lat, max_lat: lat, min_lng: lng, max_lng: lng },
            Some(b) => BoundingBox {
                min_lat: b.min_lat.min(lat),
                max_lat: b.max_lat.max(lat),
                min_lng: b.min_lng.min(lng),
                max_lng: b.max_lng.max(lng),
            },
        })
    })
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// One parish (freguesia) and the concelho it belongs to.
#[derive(Debug, Clone)]
pub struct ParishBoundary {
    pub parish: String,
    pub concelho: String,
    polygons: Vec<Polygon>,
    bounds: Option<BoundingBox>,
}

impl ParishBoundary {
    pub fn new(parish: impl Into<String>, concelho: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        let bounds = polygons
            .iter()
            .filter_map(Polygon::bounds)
            .fold(None, |acc: Option<BoundingBox>, b| {
                Some(match acc {
                    None => b,
                    Some(a) => BoundingBox {
                        min_lat: a.min_lat.min(b.min_lat),
                        max_lat: a.max_lat.max(b.max_lat),
                        min_lng: a.min_lng.min(b.min_lng),
                        max_lng: a.max_lng.max(b.max_lng),
                    },
                })
            });
        Self {
            parish: parish.into(),
            concelho: concelho.into(),
            polygons,
            bounds,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        match self.bounds {
            Some(b) if b.contains(lat, lng) => self.polygons.iter().any(|p| p.contains(lat, lng)),
            _ => false,
        }
    }
}

/// Read-only collection of parish boundaries, kept in load order.
/// Load order is the tie-break when polygons overlap.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    boundaries: Vec<ParishBoundary>,
}

impl BoundarySet {
    pub fn new(boundaries: Vec<ParishBoundary>) -> Self {
        Self { boundaries }
    }

    /// Load a GeoJSON FeatureCollection from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading boundaries from {}", path.display()))?;
        let set = Self::from_geojson_str(&raw)
            .with_context(|| format!("parsing boundaries from {}", path.display()))?;
        info!(path = %path.display(), parishes = set.len(), "Loaded parish boundaries");
        Ok(set)
    }

    /// Parse a GeoJSON FeatureCollection whose features carry `parish`
    /// (or `freguesia`) and `concelho` (or `municipio`) properties.
    pub fn from_geojson_str(raw: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(raw)?;
        let boundaries = collection
            .features
            .into_iter()
            .map(|feature| {
                let polygons = feature.geometry.into_polygons().with_context(|| {
                    format!("invalid geometry for parish {}", feature.properties.parish)
                })?;
                Ok(ParishBoundary::new(
                    feature.properties.parish,
                    feature.properties.concelho,
                    polygons,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { boundaries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParishBoundary> {
        self.boundaries.iter()
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// GeoJSON wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct FeatureProperties {
    #[serde(alias = "freguesia")]
    parish: String,
    #[serde(alias = "municipio")]
    concelho: String,
}

type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    fn into_polygons(self) -> Result<Vec<Polygon>> {
        match self {
            Geometry::Polygon(rings) => Ok(vec![polygon_from_rings(rings)?]),
            Geometry::MultiPolygon(polys) => polys.into_iter().map(polygon_from_rings).collect(),
        }
    }
}

fn polygon_from_rings(rings: Vec<Vec<Position>>) -> Result<Polygon> {
    let mut rings = rings
        .into_iter()
        .map(|ring| ring.into_iter().map(position_to_pair).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon has no exterior ring"))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn position_to_pair(position: Position) -> Result<(f64, f64)> {
    match position.as_slice() {
        [lng, lat, ..] => Ok((*lng, *lat)),
        _ => Err(anyhow!("position needs at least two coordinates")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_contains_interior_point() {
        let rect = Polygon::rectangle(39.0, -9.0, 40.0, -8.0);
        assert!(rect.contains(39.5, -8.5));
        assert!(!rect.contains(40.5, -8.5));
    }

    #[test]
    fn hole_is_excluded() {
        let outer = Polygon::rectangle(39.0, -9.0, 40.0, -8.0);
        let hole = Polygon::rectangle(39.4, -8.6, 39.6, -8.4);
        let donut = Polygon::new(outer.exterior.clone(), vec![hole.exterior.clone()]);
        assert!(!donut.contains(39.5, -8.5));
        assert!(donut.contains(39.1, -8.9));
    }

    #[test]
    fn altitude_in_positions_is_ignored() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "freguesia": "Batalha", "municipio": "Batalha" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-8.9, 39.6, 10.0], [-8.7, 39.6, 10.0], [-8.7, 39.7, 10.0], [-8.9, 39.7, 10.0], [-8.9, 39.6, 10.0]]]
                }
            }]
        }"#;
        let set = BoundarySet::from_geojson_str(raw).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.iter().next().unwrap().contains(39.65, -8.8));
    }

    #[test]
    fn short_position_is_rejected() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "parish": "X", "concelho": "Y" },
                "geometry": { "type": "Polygon", "coordinates": [[[-8.9]]] }
            }]
        }"#;
        assert!(BoundarySet::from_geojson_str(raw).is_err());
    }
}
