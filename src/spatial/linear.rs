//! Linear-scan spatial index: the fallback representation used below the
//! bulk-load threshold.

use std::collections::HashSet;

use crate::feature::Feature;
use crate::spatial::bbox::Bounds;

/// A plain `Vec<Feature>` scanned in full on every query.
#[derive(Debug, Default)]
pub struct LinearIndex {
    features: Vec<Feature>,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn add_all(&mut self, features: Vec<Feature>) {
        self.features.extend(features);
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    pub fn query_bounds(&self, bounds: &Bounds) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| Bounds::of_geometry(&f.geometry).intersects(bounds))
            .collect()
    }

    pub fn query_point(&self, lat: f64, lon: f64, radius_degrees: f64) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| within_radius(f, lat, lon, radius_degrees))
            .collect()
    }

    pub fn query_by_type(&self, acronym: &str) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.object_class.acronym == acronym)
            .collect()
    }

    pub fn query_types(&self, types: &HashSet<&str>) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| types.contains(f.object_class.acronym))
            .collect()
    }
}

/// True if any coordinate of `feature`'s geometry is within `radius`
/// (Euclidean, degree space) of `(lat, lon)`.
pub fn within_radius(feature: &Feature, lat: f64, lon: f64, radius: f64) -> bool {
    Bounds::coords_of(&feature.geometry).iter().any(|c| {
        let dx = c.lon - lon;
        let dy = c.lat - lat;
        (dx * dx + dy * dy).sqrt() <= radius
    })
}
