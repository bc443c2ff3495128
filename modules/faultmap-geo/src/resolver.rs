use std::collections::BTreeSet;

use serde::Serialize;

use crate::boundaries::BoundarySet;

/// Administrative area a coordinate falls in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaMatch {
    pub parish: String,
    pub concelho: String,
}

/// Point-in-polygon lookup against the injected boundary set.
#[derive(Debug, Clone)]
pub struct ParishResolver {
    boundaries: BoundarySet,
}

impl ParishResolver {
    pub fn new(boundaries: BoundarySet) -> Self {
        Self { boundaries }
    }

    /// First boundary (in load order) containing the point wins.
    /// `None` means the point is outside every known parish.
    pub fn resolve(&self, lat: f64, lng: f64) -> Option<AreaMatch> {
        self.boundaries
            .iter()
            .find(|b| b.contains(lat, lng))
            .map(|b| AreaMatch {
                parish: b.parish.clone(),
                concelho: b.concelho.clone(),
            })
    }

    /// Every parish of a concelho, sorted by name. Empty for an unknown concelho.
    pub fn parishes_of(&self, concelho: &str) -> BTreeSet<String> {
        self.boundaries
            .iter()
            .filter(|b| b.concelho == concelho)
            .map(|b| b.parish.clone())
            .collect()
    }

    /// Concelho owning a parish name, by first occurrence.
    pub fn concelho_of(&self, parish: &str) -> Option<&str> {
        self.boundaries
            .iter()
            .find(|b| b.parish == parish)
            .map(|b| b.concelho.as_str())
    }

    pub fn concelhos(&self) -> BTreeSet<String> {
        self.boundaries.iter().map(|b| b.concelho.clone()).collect()
    }
}
