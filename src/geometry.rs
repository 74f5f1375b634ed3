//! The geometry assembler: stitches a feature's spatial pointers against
//! the primitive store into a typed geometry, closing rings and
//! classifying the result as a point, line, or polygon.

use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::primitives::{Coord, PrimitiveStore};
use crate::s57::SpatialPointer;

/// A feature's assembled geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    Line(Vec<Coord>),
    /// Each ring is closed: first coordinate equals last, length ≥ 4.
    Polygon(Vec<Vec<Coord>>),
}

/// Resolve `pointers` against `store` into a [`Geometry`]. Never fails
/// outright: total assembly failure falls back to `Point(0, 0)` with a
/// warning.
///
/// `check_self_intersection` is off by default: when set, the assembled
/// ring or line is run through an O(n²) pairwise segment check and a
/// `SELF_INTERSECTION` warning is emitted on the first crossing found. It's
/// a diagnostic, not a correctness gate — the geometry is returned either
/// way.
pub fn assemble(
    pointers: &[SpatialPointer],
    store: &PrimitiveStore,
    collector: &mut Collector,
    feature_id: &str,
) -> Geometry {
    assemble_with_options(pointers, store, collector, feature_id, false)
}

/// As [`assemble`], with the self-intersection check selectable per call.
pub fn assemble_with_options(
    pointers: &[SpatialPointer],
    store: &PrimitiveStore,
    collector: &mut Collector,
    feature_id: &str,
    check_self_intersection: bool,
) -> Geometry {
    if pointers.is_empty() {
        let _ = collector.warn_ctx(
            WarningCode::EMPTY_REQUIRED_FIELD,
            Severity::Warning,
            "empty spatial pointer list".to_string(),
            None,
            Some(feature_id.to_string()),
        );
        return Geometry::Point(Coord::new(0.0, 0.0));
    }

    if pointers.len() == 1 && !pointers[0].is_edge {
        return match store.node(pointers[0].ref_id) {
            Some(node) => Geometry::Point(node.coord),
            None => {
                let _ = collector.warn_ctx(
                    WarningCode::DANGLING_POINTER,
                    Severity::Warning,
                    format!("node {} not found", pointers[0].ref_id),
                    None,
                    Some(feature_id.to_string()),
                );
                Geometry::Point(Coord::new(0.0, 0.0))
            }
        };
    }

    let mut accumulated: Vec<Coord> = Vec::new();
    for ptr in pointers {
        if let Some(chain) = resolve_chain(ptr, store, collector, feature_id) {
            stitch(&mut accumulated, &chain);
        }
    }

    let geometry = classify(accumulated, collector, feature_id);
    if check_self_intersection {
        check_self_intersection_warn(&geometry, collector, feature_id);
    }
    geometry
}

/// Emit `SELF_INTERSECTION` if any two non-adjacent segments of `geometry`
/// cross. O(n²) in the segment count; only ever run when explicitly asked
/// for.
fn check_self_intersection_warn(geometry: &Geometry, collector: &mut Collector, feature_id: &str) {
    let rings: Vec<&[Coord]> = match geometry {
        Geometry::Point(_) => return,
        Geometry::Line(coords) => vec![coords.as_slice()],
        Geometry::Polygon(rings) => rings.iter().map(|r| r.as_slice()).collect(),
    };

    for ring in rings {
        if ring.len() < 4 {
            continue;
        }
        let is_closed = ring.first().unwrap().exactly_eq(ring.last().unwrap());
        let segment_count = ring.len() - 1;
        for i in 0..segment_count {
            for j in (i + 1)..segment_count {
                // Adjacent segments legitimately share an endpoint; for a
                // closed ring the first and last segment also wrap around.
                if j == i + 1 || (is_closed && i == 0 && j == segment_count - 1) {
                    continue;
                }
                if segments_intersect(ring[i], ring[i + 1], ring[j], ring[j + 1]) {
                    let _ = collector.warn_ctx(
                        WarningCode::SELF_INTERSECTION,
                        Severity::Warning,
                        format!("segments {i} and {j} of the assembled geometry cross"),
                        None,
                        Some(feature_id.to_string()),
                    );
                    return;
                }
            }
        }
    }
}

fn orientation(a: Coord, b: Coord, c: Coord) -> f64 {
    (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon)
}

fn on_segment(a: Coord, b: Coord, p: Coord) -> bool {
    p.lon <= a.lon.max(b.lon) && p.lon >= a.lon.min(b.lon) && p.lat <= a.lat.max(b.lat) && p.lat >= a.lat.min(b.lat)
}

/// Standard orientation-based segment intersection test, including the
/// collinear-overlap edge cases.
fn segments_intersect(p1: Coord, q1: Coord, p2: Coord, q2: Coord) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0) && o1 != 0.0 && o2 != 0.0 && o3 != 0.0 && o4 != 0.0 {
        return true;
    }

    if o1 == 0.0 && on_segment(p1, q1, p2) {
        return true;
    }
    if o2 == 0.0 && on_segment(p1, q1, q2) {
        return true;
    }
    if o3 == 0.0 && on_segment(p2, q2, p1) {
        return true;
    }
    if o4 == 0.0 && on_segment(p2, q2, q1) {
        return true;
    }

    false
}

fn resolve_chain(
    ptr: &SpatialPointer,
    store: &PrimitiveStore,
    collector: &mut Collector,
    feature_id: &str,
) -> Option<Vec<Coord>> {
    if ptr.is_edge {
        let edge = store.edge(ptr.ref_id);
        match edge {
            None => {
                let _ = collector.warn_ctx(
                    WarningCode::DANGLING_POINTER,
                    Severity::Warning,
                    format!("edge {} not found", ptr.ref_id),
                    None,
                    Some(feature_id.to_string()),
                );
                None
            }
            Some(edge) if edge.is_degenerate() => {
                let _ = collector.warn_ctx(
                    WarningCode::DEGENERATE_EDGE,
                    Severity::Warning,
                    format!("edge {} has fewer than 2 nodes", ptr.ref_id),
                    None,
                    Some(feature_id.to_string()),
                );
                None
            }
            Some(edge) => {
                let mut chain = edge.nodes.clone();
                if ptr.reverse {
                    chain.reverse();
                }
                Some(chain)
            }
        }
    } else {
        match store.node(ptr.ref_id) {
            Some(node) => Some(vec![node.coord]),
            None => {
                let _ = collector.warn_ctx(
                    WarningCode::DANGLING_POINTER,
                    Severity::Warning,
                    format!("node {} not found", ptr.ref_id),
                    None,
                    Some(feature_id.to_string()),
                );
                None
            }
        }
    }
}

/// Append `chain` onto `accumulated`, skipping the duplicate point where
/// the two chains meet.
fn stitch(accumulated: &mut Vec<Coord>, chain: &[Coord]) {
    if chain.is_empty() {
        return;
    }
    match accumulated.last() {
        Some(last) if last.exactly_eq(&chain[0]) => accumulated.extend_from_slice(&chain[1..]),
        _ => accumulated.extend_from_slice(chain),
    }
}

fn classify(coords: Vec<Coord>, collector: &mut Collector, feature_id: &str) -> Geometry {
    if coords.is_empty() {
        return Geometry::Point(Coord::new(0.0, 0.0));
    }
    if coords.len() == 1 {
        return Geometry::Point(coords[0]);
    }

    let first = coords[0];
    let last = *coords.last().expect("non-empty");

    if coords.len() >= 4 && first.exactly_eq(&last) {
        return Geometry::Polygon(vec![ensure_closed(coords)]);
    }
    if coords.len() >= 4 && first.approx_eq_default(&last) {
        let _ = collector.warn_ctx(
            WarningCode::POLYGON_CLOSED_AUTO,
            Severity::Warning,
            "ring closed automatically from near-matching endpoints".to_string(),
            None,
            Some(feature_id.to_string()),
        );
        return Geometry::Polygon(vec![ensure_closed(coords)]);
    }

    Geometry::Line(coords)
}

/// Append the ring's first coordinate if it isn't already exactly equal
/// to the last.
fn ensure_closed(mut ring: Vec<Coord>) -> Vec<Coord> {
    let first = ring[0];
    if ring.last().is_none_or(|l| !l.exactly_eq(&first)) {
        ring.push(first);
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Collector;
    use crate::primitives::{Edge, Node};

    #[test]
    fn empty_pointer_list_falls_back_to_origin_point() {
        let store = PrimitiveStore::new();
        let mut collector = Collector::new();
        let geometry = assemble(&[], &store, &mut collector, "f1");
        assert_eq!(geometry, Geometry::Point(Coord::new(0.0, 0.0)));
        assert_eq!(collector.warnings().len(), 1);
    }

    #[test]
    fn single_node_pointer_yields_point() {
        let mut store = PrimitiveStore::new();
        store.insert_node(Node {
            id: 1,
            coord: Coord::new(-122.34, 47.64),
        });
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 1,
            is_edge: false,
            reverse: false,
        }];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        assert_eq!(geometry, Geometry::Point(Coord::new(-122.34, 47.64)));
        assert!(collector.warnings().is_empty());
    }

    #[test]
    fn dangling_edge_pointer_falls_back_with_warning() {
        let store = PrimitiveStore::new();
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 99,
            is_edge: true,
            reverse: false,
        }];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        assert_eq!(geometry, Geometry::Point(Coord::new(0.0, 0.0)));
        assert_eq!(collector.warnings()[0].code, WarningCode::DANGLING_POINTER);
    }

    #[test]
    fn edge_plus_closing_node_auto_closes_polygon() {
        let mut store = PrimitiveStore::new();
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 0.0);
        let c = Coord::new(1.0, 1.0);
        store.insert_edge(Edge {
            id: 10,
            nodes: vec![a, b, c],
        });
        // Deliberately not bit-identical to `a` to exercise the epsilon
        // auto-close path rather than the already-closed path.
        store.insert_node(Node {
            id: 1,
            coord: Coord::new(a.lon + 1e-9, a.lat),
        });
        let mut collector = Collector::new();
        let pointers = [
            SpatialPointer {
                ref_id: 10,
                is_edge: true,
                reverse: false,
            },
            SpatialPointer {
                ref_id: 1,
                is_edge: false,
                reverse: false,
            },
        ];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        match geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert!(rings[0].len() >= 4);
                assert!(rings[0].first().unwrap().exactly_eq(rings[0].last().unwrap()));
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        assert!(collector
            .warnings()
            .iter()
            .any(|w| w.code == WarningCode::POLYGON_CLOSED_AUTO));
    }

    #[test]
    fn already_closed_edge_yields_polygon_without_warning() {
        let mut store = PrimitiveStore::new();
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 0.0);
        let c = Coord::new(1.0, 1.0);
        store.insert_edge(Edge {
            id: 20,
            nodes: vec![a, b, c, a],
        });
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 20,
            is_edge: true,
            reverse: false,
        }];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert!(collector.warnings().is_empty());
    }

    #[test]
    fn two_identical_coordinates_yield_a_line_not_a_polygon() {
        let mut store = PrimitiveStore::new();
        store.insert_node(Node {
            id: 1,
            coord: Coord::new(0.0, 0.0),
        });
        store.insert_node(Node {
            id: 2,
            coord: Coord::new(0.0, 0.0),
        });
        let mut collector = Collector::new();
        let pointers = [
            SpatialPointer {
                ref_id: 1,
                is_edge: false,
                reverse: false,
            },
            SpatialPointer {
                ref_id: 2,
                is_edge: false,
                reverse: false,
            },
        ];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        match geometry {
            Geometry::Line(coords) => assert_eq!(coords.len(), 2),
            other => panic!("expected line, got {other:?}"),
        }
    }

    fn bowtie_edge(store: &mut PrimitiveStore, id: u32) {
        // a -> b -> c -> d traces an hourglass: segment a-b crosses c-d.
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 1.0);
        let c = Coord::new(1.0, 0.0);
        let d = Coord::new(0.0, 1.0);
        store.insert_edge(Edge {
            id,
            nodes: vec![a, b, c, d],
        });
    }

    #[test]
    fn self_intersection_check_off_by_default() {
        let mut store = PrimitiveStore::new();
        bowtie_edge(&mut store, 30);
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 30,
            is_edge: true,
            reverse: false,
        }];
        let geometry = assemble(&pointers, &store, &mut collector, "f1");
        assert!(matches!(geometry, Geometry::Line(_)));
        assert!(collector.warnings().is_empty());
    }

    #[test]
    fn self_intersection_check_flags_crossing_segments() {
        let mut store = PrimitiveStore::new();
        bowtie_edge(&mut store, 31);
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 31,
            is_edge: true,
            reverse: false,
        }];
        let geometry = assemble_with_options(&pointers, &store, &mut collector, "f1", true);
        assert!(matches!(geometry, Geometry::Line(_)));
        assert!(collector
            .warnings()
            .iter()
            .any(|w| w.code == WarningCode::SELF_INTERSECTION));
    }

    #[test]
    fn non_self_intersecting_polygon_does_not_warn_when_checked() {
        let mut store = PrimitiveStore::new();
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 0.0);
        let c = Coord::new(1.0, 1.0);
        store.insert_edge(Edge {
            id: 32,
            nodes: vec![a, b, c, a],
        });
        let mut collector = Collector::new();
        let pointers = [SpatialPointer {
            ref_id: 32,
            is_edge: true,
            reverse: false,
        }];
        let geometry = assemble_with_options(&pointers, &store, &mut collector, "f1", true);
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert!(!collector
            .warnings()
            .iter()
            .any(|w| w.code == WarningCode::SELF_INTERSECTION));
    }
}
