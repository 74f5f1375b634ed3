//! The public spatial-index contract: linear scan below a threshold,
//! bulk-loaded R-tree above it.

use std::collections::HashSet;

use crate::feature::Feature;
use crate::spatial::bbox::Bounds;
use crate::spatial::linear::{self, LinearIndex};
use crate::spatial::rtree::{RTree, DEFAULT_MAX_NODE_ENTRIES};

/// Below this feature count (and whenever `force_linear` is set), the
/// index stays a linear scan instead of bulk-loading an R-tree.
pub const LINEAR_THRESHOLD: usize = 200;

const NAV_AID_TYPES: &[&str] = &[
    "LIGHTS", "BCNLAT", "BCNCAR", "BCNISD", "BCNSAW", "BCNSPP", "BOYLAT", "BOYCAR", "BOYISD",
    "BOYSAW", "BOYSPP", "DAYMAR",
];

const DEPTH_FEATURE_TYPES: &[&str] = &["DEPCNT", "DEPARE", "SOUNDG"];

enum Repr {
    Linear(LinearIndex),
    Tree { features: Vec<Feature>, tree: RTree },
}

/// Selects linear scan or a bulk-loaded R-tree depending on the feature
/// count; the query surface is identical either way.
pub struct SpatialIndex {
    repr: Repr,
    force_linear: bool,
    max_node_entries: usize,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::with_options(false, DEFAULT_MAX_NODE_ENTRIES)
    }

    pub fn with_options(force_linear: bool, max_node_entries: usize) -> Self {
        Self {
            repr: Repr::Linear(LinearIndex::new()),
            force_linear,
            max_node_entries,
        }
    }

    /// Build an index over a full feature set in one shot, choosing
    /// representation once up front.
    pub fn build(features: Vec<Feature>, force_linear: bool, max_node_entries: usize) -> Self {
        let mut index = Self::with_options(force_linear, max_node_entries);
        index.add_features(features);
        index
    }

    fn should_be_tree(&self, count: usize) -> bool {
        !self.force_linear && count >= LINEAR_THRESHOLD
    }

    /// A bulk-loaded tree has no incremental insert, so every mutation
    /// collapses the current representation back to a plain `Vec` and
    /// rebuilds whichever representation fits the new total.
    fn rebuild(&mut self, features: Vec<Feature>) {
        if self.should_be_tree(features.len()) {
            let entries: Vec<(Bounds, usize)> = features
                .iter()
                .enumerate()
                .map(|(i, f)| (Bounds::of_geometry(&f.geometry), i))
                .collect();
            let tree = RTree::build(entries, self.max_node_entries);
            self.repr = Repr::Tree { features, tree };
        } else {
            let mut linear = LinearIndex::new();
            linear.add_all(features);
            self.repr = Repr::Linear(linear);
        }
    }

    fn take_features(&mut self) -> Vec<Feature> {
        match std::mem::replace(&mut self.repr, Repr::Linear(LinearIndex::new())) {
            Repr::Linear(l) => l.into_features(),
            Repr::Tree { features, .. } => features,
        }
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.add_features(vec![feature]);
    }

    pub fn add_features(&mut self, features: Vec<Feature>) {
        if features.is_empty() {
            return;
        }
        let mut all = self.take_features();
        all.extend(features);
        self.rebuild(all);
    }

    pub fn clear(&mut self) {
        self.repr = Repr::Linear(LinearIndex::new());
    }

    pub fn query_bounds(&self, bounds: &Bounds) -> Vec<&Feature> {
        match &self.repr {
            Repr::Linear(l) => l.query_bounds(bounds),
            Repr::Tree { features, tree } => tree
                .query_bounds(bounds)
                .into_iter()
                .map(|i| &features[i])
                .collect(),
        }
    }

    /// Features with at least one coordinate within `radius_degrees` of
    /// `(lat, lon)`, Euclidean in degree space.
    pub fn query_point(&self, lat: f64, lon: f64, radius_degrees: f64) -> Vec<&Feature> {
        let search_box = Bounds::new(
            lon - radius_degrees,
            lat - radius_degrees,
            lon + radius_degrees,
            lat + radius_degrees,
        );
        self.query_bounds(&search_box)
            .into_iter()
            .filter(|f| linear::within_radius(f, lat, lon, radius_degrees))
            .collect()
    }

    pub fn query_by_type(&self, acronym: &str) -> Vec<&Feature> {
        self.all_features()
            .filter(|f| f.object_class.acronym == acronym)
            .collect()
    }

    pub fn query_types(&self, types: &HashSet<&str>, bounds: Option<&Bounds>) -> Vec<&Feature> {
        match bounds {
            Some(b) => self
                .query_bounds(b)
                .into_iter()
                .filter(|f| types.contains(f.object_class.acronym))
                .collect(),
            None => self
                .all_features()
                .filter(|f| types.contains(f.object_class.acronym))
                .collect(),
        }
    }

    /// Union of {lighthouse, beacon, buoy variants, daymark}.
    pub fn query_navigation_aids(&self) -> Vec<&Feature> {
        let types: HashSet<&str> = NAV_AID_TYPES.iter().copied().collect();
        self.query_types(&types, None)
    }

    /// Union of {depth contour, depth area, sounding}.
    pub fn query_depth_features(&self) -> Vec<&Feature> {
        let types: HashSet<&str> = DEPTH_FEATURE_TYPES.iter().copied().collect();
        self.query_types(&types, None)
    }

    pub fn all_features(&self) -> impl Iterator<Item = &Feature> {
        match &self.repr {
            Repr::Linear(l) => l.features().iter(),
            Repr::Tree { features, .. } => features.iter(),
        }
    }

    pub fn get_all_features(&self) -> Vec<&Feature> {
        self.all_features().collect()
    }

    pub fn feature_count(&self) -> usize {
        match &self.repr {
            Repr::Linear(l) => l.len(),
            Repr::Tree { features, .. } => features.len(),
        }
    }

    pub fn present_feature_types(&self) -> HashSet<&str> {
        self.all_features().map(|f| f.object_class.acronym).collect()
    }

    pub fn calculate_bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        for f in self.all_features() {
            bounds.expand(&Bounds::of_geometry(&f.geometry));
        }
        bounds
    }

    /// Whether the index is currently bulk-loaded as an R-tree (versus a
    /// linear scan) — mostly useful for tests asserting the threshold
    /// behavior.
    pub fn is_tree(&self) -> bool {
        matches!(self.repr, Repr::Tree { .. })
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
