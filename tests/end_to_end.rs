//! Crate-level integration tests assembling raw ISO 8211 byte buffers the
//! same way the unit tests in `src/session.rs` do, but driving the whole
//! public `ParseSession` -> `FeatureStore` -> `SpatialIndex` pipeline.

use openenc_core::diagnostics::WarningCode;
use openenc_core::geometry::Geometry;
use openenc_core::iso8211::leader::FIELD_TERMINATOR;
use openenc_core::s57::decode::{RCNM_EDGE, RCNM_ISOLATED_NODE};
use openenc_core::s57::AttributeValue;
use openenc_core::session::ParseSession;
use openenc_core::spatial::{Bounds, SpatialIndex};
use openenc_core::store::FeatureStore;

fn le16(v: u16) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

fn le32(v: u32) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

/// Pack `fields` into a single well-formed (non-DDR) ISO 8211 record.
fn build_record(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let tag_size = 4;
    let len_size = 4;
    let pos_size = 4;
    let entry_size = tag_size + len_size + pos_size;
    let dir_len = fields.len() * entry_size + 1;
    let base_address = 24 + dir_len;

    let mut field_area = Vec::new();
    let mut directory = Vec::new();
    for (tag, payload) in fields {
        let position = field_area.len();
        let mut data = payload.to_vec();
        data.push(FIELD_TERMINATOR);
        directory.push(format!(
            "{:width_t$}{:0width_l$}{:0width_p$}",
            tag,
            data.len(),
            position,
            width_t = tag_size,
            width_l = len_size,
            width_p = pos_size,
        ));
        field_area.extend(data);
    }

    let record_length = base_address + field_area.len();
    let mut bytes = vec![b' '; 24];
    bytes[0..5].copy_from_slice(format!("{:05}", record_length).as_bytes());
    bytes[5] = b'3';
    bytes[6] = b'D';
    bytes[7] = b'1';
    bytes[8..13].copy_from_slice(format!("{:05}", base_address).as_bytes());
    bytes[13..16].copy_from_slice(b" ! ");
    bytes[16] = b'4';
    bytes[17] = b'4';
    bytes[18] = b'0';
    bytes[19] = b'4';
    bytes[20..24].copy_from_slice(b"2001");

    for d in directory {
        bytes.extend(d.into_bytes());
    }
    bytes.push(FIELD_TERMINATOR);
    bytes.extend(field_area);
    bytes
}

fn node_record(rcnm: u8, rcid: u32, lon: f64, lat: f64) -> Vec<u8> {
    let mut vrid = vec![rcnm];
    vrid.extend(le32(rcid));
    vrid.extend(le16(1)); // RVER
    vrid.push(1); // RUIN = insert

    let x = (lon * 10_000_000.0) as i32;
    let y = (lat * 10_000_000.0) as i32;
    let mut sg2d = Vec::new();
    sg2d.extend(x.to_le_bytes());
    sg2d.extend(y.to_le_bytes());

    build_record(&[("VRID", &vrid), ("SG2D", &sg2d)])
}

/// A node built from raw pre-scaled integers rather than floating-point
/// degrees, so a deliberately tiny offset survives the COMF round-trip
/// exactly instead of rounding away.
fn node_record_raw(rcnm: u8, rcid: u32, x_raw: i32, y_raw: i32) -> Vec<u8> {
    let mut vrid = vec![rcnm];
    vrid.extend(le32(rcid));
    vrid.extend(le16(1)); // RVER
    vrid.push(1); // RUIN = insert

    let mut sg2d = Vec::new();
    sg2d.extend(x_raw.to_le_bytes());
    sg2d.extend(y_raw.to_le_bytes());

    build_record(&[("VRID", &vrid), ("SG2D", &sg2d)])
}

fn edge_record(rcid: u32, nodes: &[(f64, f64)]) -> Vec<u8> {
    let mut vrid = vec![RCNM_EDGE];
    vrid.extend(le32(rcid));
    vrid.extend(le16(1)); // RVER
    vrid.push(1); // RUIN = insert

    let mut sg2d = Vec::new();
    for (lon, lat) in nodes {
        let x = (lon * 10_000_000.0) as i32;
        let y = (lat * 10_000_000.0) as i32;
        sg2d.extend(x.to_le_bytes());
        sg2d.extend(y.to_le_bytes());
    }

    build_record(&[("VRID", &vrid), ("SG2D", &sg2d)])
}

/// One (ATTL, ATNV) tuple, raw-coerced per the attribute's catalog type.
fn attf_entry(attl: u16, atnv: u32) -> Vec<u8> {
    let mut out = le16(attl);
    out.extend(le32(atnv));
    out
}

struct Pointer {
    rcnm: u8,
    ref_id: u32,
    ornt: u8,
}

fn fspt_bytes(pointers: &[Pointer]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in pointers {
        let name = ((p.rcnm as u32) << 24) | p.ref_id;
        out.extend(name.to_le_bytes());
        out.push(p.ornt);
        out.push(0); // USAG
        out.push(0); // MASK
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn frid_feature_record(
    rcid: u32,
    objl: u16,
    rver: u16,
    ruin: u8,
    agen: u16,
    fidn: u32,
    fids: u16,
    attf: Option<Vec<u8>>,
    fspt: Option<Vec<u8>>,
) -> Vec<u8> {
    let mut frid = vec![1u8]; // RCNM = point/feature
    frid.extend(le32(rcid));
    frid.push(1); // PRIM
    frid.push(1); // GRUP
    frid.extend(le16(objl));
    frid.extend(le16(rver));
    frid.push(ruin);

    let mut foid = le16(agen);
    foid.extend(le32(fidn));
    foid.extend(le16(fids));

    let mut fields: Vec<(&str, &[u8])> = vec![("FRID", &frid), ("FOID", &foid)];
    if let Some(a) = &attf {
        fields.push(("ATTF", a));
    }
    if let Some(f) = &fspt {
        fields.push(("FSPT", f));
    }
    build_record(&fields)
}

/// A minimal point feature decodes its node and attribute correctly.
#[test]
fn minimal_point_feature() {
    let mut bytes = node_record(RCNM_ISOLATED_NODE, 1, -122.34, 47.64);
    let attf = attf_entry(
        openenc_core::catalog::attributes::by_acronym("HEIGHT").unwrap().code,
        25,
    );
    let fspt = fspt_bytes(&[Pointer {
        rcnm: RCNM_ISOLATED_NODE,
        ref_id: 1,
        ornt: 1,
    }]);
    bytes.extend(frid_feature_record(900, 75, 1, 1, 1, 100, 0, Some(attf), Some(fspt)));

    let mut session = ParseSession::new();
    let store = session.parse_base_cell(&bytes).expect("base cell parses");

    assert_eq!(store.len(), 1);
    let vf = store.get("1_100_0").expect("FOID 1_100_0 present");
    assert_eq!(vf.feature.object_class.acronym, "LIGHTS");
    match vf.feature.geometry {
        Geometry::Point(c) => {
            assert!((c.lat - 47.64).abs() < 1e-9);
            assert!((c.lon - (-122.34)).abs() < 1e-9);
        }
        ref other => panic!("expected point geometry, got {other:?}"),
    }
    assert_eq!(
        vf.feature.attributes.get("HEIGHT"),
        Some(&AttributeValue::Float(25.0))
    );
    assert!(session.collector.warnings().is_empty());
}

/// Polygon auto-close from an edge plus a closing node.
#[test]
fn polygon_auto_close_on_near_matching_endpoints() {
    let a = (0.0, 0.0);
    let b = (1.0, 0.0);
    let c = (1.0, 1.0);
    let mut bytes = edge_record(10, &[a, b, c]);
    // A separate closing node, 2 raw COMF units (2e-7 degrees) off from `a`
    // -- within the auto-close epsilon but never bit-identical, so this
    // exercises the epsilon auto-close path rather than the already-closed
    // path. Built from raw integers so the offset survives the round-trip
    // exactly instead of rounding away in floating point.
    bytes.extend(node_record_raw(RCNM_ISOLATED_NODE, 1, 2, 0));

    let fspt = fspt_bytes(&[
        Pointer {
            rcnm: RCNM_EDGE,
            ref_id: 10,
            ornt: 1,
        },
        Pointer {
            rcnm: RCNM_ISOLATED_NODE,
            ref_id: 1,
            ornt: 1,
        },
    ]);
    bytes.extend(frid_feature_record(900, 42, 1, 1, 1, 200, 0, None, Some(fspt)));

    let mut session = ParseSession::new();
    let store = session.parse_base_cell(&bytes).expect("base cell parses");

    let vf = store.get("1_200_0").expect("feature present");
    match &vf.feature.geometry {
        Geometry::Polygon(rings) => {
            assert_eq!(rings.len(), 1);
            assert!(rings[0].len() >= 4);
            assert!(rings[0].first().unwrap().exactly_eq(rings[0].last().unwrap()));
        }
        other => panic!("expected polygon, got {other:?}"),
    }
    assert!(session
        .collector
        .warnings()
        .iter()
        .any(|w| w.code == WarningCode::POLYGON_CLOSED_AUTO));
}

/// A dangling edge pointer falls back to Point(0, 0) with a warning.
#[test]
fn dangling_pointer_falls_back_to_origin() {
    let fspt = fspt_bytes(&[Pointer {
        rcnm: RCNM_EDGE,
        ref_id: 99,
        ornt: 1,
    }]);
    let bytes = frid_feature_record(900, 75, 1, 1, 1, 300, 0, None, Some(fspt));

    let mut session = ParseSession::new();
    let store = session.parse_base_cell(&bytes).expect("base cell parses");

    let vf = store.get("1_300_0").expect("feature present");
    assert_eq!(
        vf.feature.geometry,
        Geometry::Point(openenc_core::primitives::Coord::new(0.0, 0.0))
    );
    assert!(session
        .collector
        .warnings()
        .iter()
        .any(|w| w.code == WarningCode::DANGLING_POINTER));
}

/// Sequential updates modify, delete, and insert features in order.
#[test]
fn sequential_updates_apply_in_order() {
    let drval1_code = openenc_core::catalog::attributes::by_acronym("DRVAL1").unwrap().code;

    // Base cell: F1 (DEPARE, DRVAL1=10.0) and F2 (LIGHTS).
    let mut base = frid_feature_record(
        1,
        42,
        1,
        1,
        1,
        1,
        0,
        Some(attf_entry(drval1_code, 10)),
        None,
    );
    base.extend(frid_feature_record(2, 75, 1, 1, 1, 2, 0, None, None));

    let mut session = ParseSession::new();
    let mut store: FeatureStore = session.parse_base_cell(&base).expect("base cell parses");
    assert_eq!(store.len(), 2);

    // .001 modifies F1's DRVAL1 to 12.5.
    let update1 = frid_feature_record(
        10,
        42,
        2,
        3, // RUIN = Modify
        1,
        1,
        0,
        Some(attf_entry(drval1_code, 1250)), // raw ATNV reinterpreted as float by catalog type
        None,
    );
    // .002 deletes F2.
    let update2 = frid_feature_record(11, 0, 2, 2 /* Delete */, 1, 2, 0, None, None);
    // .003 inserts F3.
    let update3 = frid_feature_record(12, 75, 3, 1 /* Insert */, 1, 3, 0, None, None);

    let updates = vec![
        ("CELL.001".to_string(), update1),
        ("CELL.002".to_string(), update2),
        ("CELL.003".to_string(), update3),
    ];

    let summary = session
        .apply_updates(&mut store, "CELL", &updates)
        .expect("updates apply cleanly");

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.final_rver, 3);
    assert_eq!(
        summary.applied_filenames,
        vec!["CELL.001".to_string(), "CELL.002".to_string(), "CELL.003".to_string()]
    );

    assert_eq!(store.len(), 2);
    assert!(store.get("1_2_0").is_none());
    let f1 = store.get("1_1_0").expect("F1 survives");
    assert_eq!(f1.version, 2);
    assert_eq!(
        f1.feature.attributes.get("DRVAL1"),
        Some(&AttributeValue::Float(1250.0))
    );
    assert!(store.get("1_3_0").is_some());
}

/// A sequence gap (.001, .003 with no .002) is fatal and leaves the store
/// at its post-.001 state.
#[test]
fn update_gap_is_fatal() {
    let mut session = ParseSession::new();
    let mut store = FeatureStore::new();

    let update1 = node_record(RCNM_ISOLATED_NODE, 1, 0.0, 0.0);
    let update3 = node_record(RCNM_ISOLATED_NODE, 2, 0.0, 0.0);
    let updates = vec![
        ("CELL.001".to_string(), update1),
        ("CELL.003".to_string(), update3),
    ];

    let err = session
        .apply_updates(&mut store, "CELL", &updates)
        .expect_err("a gap must be fatal");
    assert!(matches!(
        err,
        openenc_core::OpenEncError::UpdateGap {
            expected: 2,
            found: 3
        }
    ));
}

/// A spatial bounds query returns the same feature set from the R-tree
/// and a linear scan over a 1,000-feature cell.
#[test]
fn spatial_query_agrees_between_linear_and_tree() {
    let mut bytes = Vec::new();
    for i in 0..1000u32 {
        let lon = -123.0 + (i as f64) * 0.001;
        let lat = 37.0 + (i as f64) * 0.001;
        bytes.extend(node_record(RCNM_ISOLATED_NODE, i, lon, lat));
        let fspt = fspt_bytes(&[Pointer {
            rcnm: RCNM_ISOLATED_NODE,
            ref_id: i,
            ornt: 1,
        }]);
        bytes.extend(frid_feature_record(1000 + i, 75, 1, 1, 1, i, 0, None, Some(fspt)));
    }

    let mut session = ParseSession::new();
    let store = session.parse_base_cell(&bytes).expect("base cell parses");
    assert_eq!(store.len(), 1000);

    let features: Vec<_> = store.get_all_features().into_iter().cloned().collect();
    let tree_index = SpatialIndex::build(features.clone(), false, 16);
    let linear_index = SpatialIndex::build(features, true, 16);
    assert!(tree_index.is_tree());
    assert!(!linear_index.is_tree());

    let query = Bounds::new(-122.6, 37.4, -122.5, 37.5);
    let mut tree_ids: Vec<u32> = tree_index
        .query_bounds(&query)
        .iter()
        .map(|f| f.foid.fidn)
        .collect();
    let mut linear_ids: Vec<u32> = linear_index
        .query_bounds(&query)
        .iter()
        .map(|f| f.foid.fidn)
        .collect();
    tree_ids.sort_unstable();
    linear_ids.sort_unstable();

    assert_eq!(tree_ids, linear_ids);
    assert!(!tree_ids.is_empty());
    for f in tree_index.query_bounds(&query) {
        assert!(Bounds::of_geometry(&f.geometry).intersects(&query));
    }
}

/// Applying an empty update list is a no-op.
#[test]
fn empty_update_list_is_a_no_op() {
    let base = node_record(RCNM_ISOLATED_NODE, 1, 0.0, 0.0);
    let mut session = ParseSession::new();
    let mut store = session.parse_base_cell(&base).expect("base cell parses");
    let before = store.len();

    let summary = session
        .apply_updates(&mut store, "CELL", &[])
        .expect("empty update list applies cleanly");

    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.modified, 0);
    assert_eq!(summary.deleted, 0);
    assert_eq!(store.len(), before);
}

/// Parsing identical bytes twice yields identical warning lists.
#[test]
fn parsing_the_same_bytes_twice_yields_identical_warnings() {
    let fspt = fspt_bytes(&[Pointer {
        rcnm: RCNM_EDGE,
        ref_id: 42,
        ornt: 1,
    }]);
    let bytes = frid_feature_record(1, 75, 1, 1, 1, 1, 0, None, Some(fspt));

    let mut session_a = ParseSession::new();
    let _ = session_a.parse_base_cell(&bytes).unwrap();
    let codes_a: Vec<_> = session_a.collector.warnings().iter().map(|w| w.code).collect();

    let mut session_b = ParseSession::new();
    let _ = session_b.parse_base_cell(&bytes).unwrap();
    let codes_b: Vec<_> = session_b.collector.warnings().iter().map(|w| w.code).collect();

    assert_eq!(codes_a, codes_b);
}
