//! The primitive store: isolated nodes and edges decoded from VRID/SG2D
//! records.

use std::collections::HashMap;

/// A single vector coordinate, WGS-84 decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Strict value comparison, bit-equal after the COMF division.
    pub fn exactly_eq(&self, other: &Coord) -> bool {
        self.lon == other.lon && self.lat == other.lat
    }

    fn approx_eq(&self, other: &Coord, epsilon: f64) -> bool {
        (self.lon - other.lon).abs() < epsilon && (self.lat - other.lat).abs() < epsilon
    }

    pub fn approx_eq_default(&self, other: &Coord) -> bool {
        self.approx_eq(other, 1e-6)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: u32,
    pub coord: Coord,
}

/// An edge: an ordered chain of node coordinates. An edge with fewer than
/// 2 nodes is degenerate and unusable as a chain.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: u32,
    pub nodes: Vec<Coord>,
}

impl Edge {
    pub fn is_degenerate(&self) -> bool {
        self.nodes.len() < 2
    }
}

/// Owns every vector primitive decoded from VRID(/SG2D/SG3D) records in
/// one parse session, keyed by RCID.
#[derive(Debug, Default)]
pub struct PrimitiveStore {
    nodes: HashMap<u32, Node>,
    edges: HashMap<u32, Edge>,
}

impl PrimitiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn insert_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.id, edge);
    }

    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: u32) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_nodes() {
        let mut store = PrimitiveStore::new();
        store.insert_node(Node {
            id: 1,
            coord: Coord::new(-122.34, 47.64),
        });
        let node = store.node(1).expect("node 1 present");
        assert_eq!(node.coord, Coord::new(-122.34, 47.64));
        assert!(store.node(2).is_none());
    }

    #[test]
    fn edge_with_one_node_is_degenerate() {
        let edge = Edge {
            id: 10,
            nodes: vec![Coord::new(0.0, 0.0)],
        };
        assert!(edge.is_degenerate());
    }

    #[test]
    fn edge_with_two_or_more_nodes_is_not_degenerate() {
        let edge = Edge {
            id: 10,
            nodes: vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)],
        };
        assert!(!edge.is_degenerate());
    }
}
