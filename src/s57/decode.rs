//! S-57 field decoders: routes raw ISO 8211 field bytes to structured
//! values.

use crate::catalog::{self, AttributeType};
use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::s57::value::AttributeValue;

/// Coordinate and sounding multiplication factors. Threaded explicitly
/// through decode calls rather than kept as module constants,
/// so a DSPM-derived override can apply per-session without global state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordFactors {
    pub comf: f64,
    pub somf: f64,
}

impl Default for CoordFactors {
    fn default() -> Self {
        Self {
            comf: 10_000_000.0,
            somf: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DsidInfo {
    pub producer: Option<String>,
    pub edition: Option<String>,
    pub cell_name: Option<String>,
    pub compilation_scale: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct FridInfo {
    pub rcnm: u8,
    pub rcid: u32,
    pub prim: u8,
    pub grup: u8,
    pub objl: u16,
    pub rver: u16,
    pub ruin: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoidInfo {
    pub agen: u16,
    pub fidn: u32,
    pub fids: u16,
}

impl FoidInfo {
    /// The FOID canonical string form, `agency_featureId_subdivision`.
    pub fn canonical(&self) -> String {
        format!("{}_{}_{}", self.agen, self.fidn, self.fids)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VridInfo {
    pub rcnm: u8,
    pub rcid: u32,
    pub rver: u16,
    pub ruin: u8,
}

/// A single decoded spatial pointer (FSPT) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialPointer {
    pub ref_id: u32,
    pub is_edge: bool,
    pub reverse: bool,
}

#[derive(Debug, Clone)]
pub struct FeaturePointer {
    pub lnam: FoidInfo,
    pub relationship: u8,
    pub comment: String,
}

pub const RCNM_ISOLATED_NODE: u8 = 110;
pub const RCNM_CONNECTED_NODE: u8 = 120;
pub const RCNM_EDGE: u8 = 130;
pub const RCNM_FACE: u8 = 140;

/// ASCII integer parsing with leading/trailing whitespace trimmed; an
/// empty field decodes to 0.
pub fn ascii_int(bytes: &[u8]) -> i64 {
    let s = String::from_utf8_lossy(bytes);
    let trimmed = s.trim();
    if trimmed.is_empty() {
        0
    } else {
        trimmed.parse::<i64>().unwrap_or(0)
    }
}

fn le_u16(bytes: &[u8]) -> Option<u16> {
    bytes.get(0..2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn le_u32(bytes: &[u8]) -> Option<u32> {
    bytes
        .get(0..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_i32(bytes: &[u8]) -> Option<i32> {
    le_u32(bytes).map(|v| v as i32)
}

fn split_subfields(data: &[u8]) -> Vec<&[u8]> {
    data.split(|&b| b == crate::iso8211::leader::SUBFIELD_DELIMITER)
        .collect()
}

/// Decode a DSID field: producer, edition, cell name, compilation scale.
///
/// Subfield order follows the standard S-57 DSID layout: RCNM, RCID, EXPP,
/// INTU, DSNM, EDTN, UPDN, UADT, ISDT, STED, PRSP, PSDN, PRED, PROF, AGEN,
/// COMT. Compilation scale is not itself a DSID subfield; it is populated
/// only when COMT happens to carry a bare integer.
pub fn dsid(data: &[u8]) -> DsidInfo {
    let parts = split_subfields(data);
    let text = |i: usize| -> Option<String> {
        parts.get(i).and_then(|p| {
            let s = String::from_utf8_lossy(p).trim().to_string();
            if s.is_empty() { None } else { Some(s) }
        })
    };
    DsidInfo {
        cell_name: text(4),
        edition: text(5),
        producer: text(14),
        compilation_scale: text(15).and_then(|s| s.parse::<u32>().ok()),
    }
}

/// Decode a DSPM field's COMF/SOMF multipliers (Open Question 2).
pub fn dspm(data: &[u8]) -> Option<CoordFactors> {
    let parts = split_subfields(data);
    let comf = parts.get(10).map(|p| ascii_int(p))?;
    let somf = parts.get(11).map(|p| ascii_int(p))?;
    if comf <= 0 || somf <= 0 {
        return None;
    }
    Some(CoordFactors {
        comf: comf as f64,
        somf: somf as f64,
    })
}

/// Decode a FRID (feature record id) field.
pub fn frid(data: &[u8]) -> Option<FridInfo> {
    if data.len() < 12 {
        return None;
    }
    Some(FridInfo {
        rcnm: data[0],
        rcid: le_u32(&data[1..5])?,
        prim: data[5],
        grup: data[6],
        objl: le_u16(&data[7..9])?,
        rver: le_u16(&data[9..11])?,
        ruin: data[11],
    })
}

/// Decode a FOID (feature object identifier) field.
pub fn foid(data: &[u8]) -> Option<FoidInfo> {
    if data.len() < 8 {
        return None;
    }
    Some(FoidInfo {
        agen: le_u16(&data[0..2])?,
        fidn: le_u32(&data[2..6])?,
        fids: le_u16(&data[6..8])?,
    })
}

/// Decode a VRID (vector record id) field.
pub fn vrid(data: &[u8]) -> Option<VridInfo> {
    if data.len() < 8 {
        return None;
    }
    Some(VridInfo {
        rcnm: data[0],
        rcid: le_u32(&data[1..5])?,
        rver: le_u16(&data[5..7])?,
        ruin: data[7],
    })
}

/// Reinterpret one ATTF ATNV raw u32 per the attribute's catalog type.
fn coerce_atnv(attl: u16, raw: u32) -> AttributeValue {
    match catalog::attributes::by_code(attl) {
        Some(def) => match def.kind {
            AttributeType::Int => AttributeValue::Int(raw as i64),
            AttributeType::Float => AttributeValue::Float(raw as f64),
            AttributeType::Enum => {
                let code = raw.to_string();
                let label = def.label_for(&code).map(str::to_string);
                AttributeValue::Enum { code, label }
            }
            AttributeType::String => coerce_as_text(raw),
        },
        None => coerce_generic(raw),
    }
}

fn coerce_as_text(raw: u32) -> AttributeValue {
    let bytes = raw.to_le_bytes();
    match std::str::from_utf8(&bytes) {
        Ok(s) => {
            let trimmed = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            AttributeValue::Str(trimmed.to_string())
        }
        Err(_) => AttributeValue::Int(raw as i64),
    }
}

/// Generic "try int, then float, then trimmed string" coercion for
/// attribute codes absent from the catalog.
fn coerce_generic(raw: u32) -> AttributeValue {
    let bytes = raw.to_le_bytes();
    if let Ok(s) = std::str::from_utf8(&bytes) {
        let trimmed = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if !trimmed.is_empty() {
            if let Ok(i) = trimmed.parse::<i64>() {
                return AttributeValue::Int(i);
            }
            if let Ok(f) = trimmed.parse::<f64>() {
                return AttributeValue::Float(f);
            }
        }
    }
    AttributeValue::Int(raw as i64)
}

/// Decode an ATTF field into (attribute acronym, value) pairs.
///
/// Unrecognized ATTL codes are preserved under a synthetic `ATTL#<code>`
/// acronym rather than dropped, per the Design Notes' "preserve unknown
/// acronyms with raw values" guidance.
pub fn attf(data: &[u8], collector: &mut Collector, record_id: &str) -> Vec<(String, AttributeValue)> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + 6 <= data.len() {
        let chunk = &data[offset..offset + 6];
        if chunk[0] == 0x20 && chunk[1] == 0x20 {
            break;
        }
        let Some(attl) = le_u16(&chunk[0..2]) else {
            let _ = collector.warn_ctx(
                WarningCode::SUBFIELD_PARSE,
                Severity::Warning,
                format!("unreadable ATTL at offset {offset}"),
                Some(record_id.to_string()),
                None,
            );
            offset += 6;
            continue;
        };
        let Some(raw) = le_u32(&chunk[2..6]) else {
            let _ = collector.warn_ctx(
                WarningCode::SUBFIELD_PARSE,
                Severity::Warning,
                format!("unreadable ATNV at offset {offset}"),
                Some(record_id.to_string()),
                None,
            );
            offset += 6;
            continue;
        };

        let acronym = catalog::attributes::by_code(attl)
            .map(|def| def.acronym.to_string())
            .unwrap_or_else(|| format!("ATTL#{attl}"));
        out.push((acronym, coerce_atnv(attl, raw)));
        offset += 6;
    }
    out
}

/// Decode an FSPT field into an ordered list of spatial pointers.
pub fn fspt(data: &[u8]) -> Vec<SpatialPointer> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + 7 <= data.len() {
        let chunk = &data[offset..offset + 7];
        if let Some(name) = le_u32(&chunk[0..4]) {
            let rcnm = (name >> 24) as u8;
            let ref_id = name & 0x00FF_FFFF;
            let ornt = chunk[4];
            out.push(SpatialPointer {
                ref_id,
                is_edge: rcnm == RCNM_EDGE,
                reverse: ornt == 2,
            });
        }
        offset += 7;
    }
    out
}

/// Decode an FFPT field into feature-to-feature pointers.
pub fn ffpt(data: &[u8]) -> Vec<FeaturePointer> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + 9 <= data.len() {
        let lnam_bytes = &data[offset..offset + 8];
        let rind = data[offset + 8];
        if let Some(lnam) = foid(lnam_bytes) {
            let comment_end = data[offset + 9..]
                .iter()
                .position(|&b| b == crate::iso8211::leader::FIELD_TERMINATOR)
                .map(|p| offset + 9 + p)
                .unwrap_or(data.len());
            let comment = String::from_utf8_lossy(&data[offset + 9..comment_end]).to_string();
            out.push(FeaturePointer {
                lnam,
                relationship: rind,
                comment,
            });
            break;
        }
        offset += 9;
    }
    out
}

/// Decode an SG2D field into a list of (x, y) raw scaled integer pairs,
/// already divided by `factors.comf`.
pub fn sg2d(data: &[u8], factors: &CoordFactors) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + 8 <= data.len() {
        if let (Some(x), Some(y)) = (le_i32(&data[offset..offset + 4]), le_i32(&data[offset + 4..offset + 8])) {
            out.push((x as f64 / factors.comf, y as f64 / factors.comf));
        }
        offset += 8;
    }
    out
}

/// Decode an SG3D field into a list of (x, y, depth) triples.
pub fn sg3d(data: &[u8], factors: &CoordFactors) -> Vec<(f64, f64, f64)> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + 12 <= data.len() {
        if let (Some(x), Some(y), Some(z)) = (
            le_i32(&data[offset..offset + 4]),
            le_i32(&data[offset + 4..offset + 8]),
            le_i32(&data[offset + 8..offset + 12]),
        ) {
            out.push((x as f64 / factors.comf, y as f64 / factors.comf, z as f64 / factors.somf));
        }
        offset += 12;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_int_trims_and_defaults_to_zero() {
        assert_eq!(ascii_int(b"  42  "), 42);
        assert_eq!(ascii_int(b""), 0);
        assert_eq!(ascii_int(b"   "), 0);
    }

    #[test]
    fn foid_round_trips_canonical_form() {
        let mut data = Vec::new();
        data.extend(1u16.to_le_bytes());
        data.extend(100u32.to_le_bytes());
        data.extend(0u16.to_le_bytes());
        let decoded = foid(&data).unwrap();
        assert_eq!(decoded.canonical(), "1_100_0");
    }

    #[test]
    fn frid_decodes_fixed_offsets() {
        let mut data = Vec::new();
        data.push(1); // RCNM
        data.extend(42u32.to_le_bytes()); // RCID
        data.push(1); // PRIM
        data.push(2); // GRUP
        data.extend(75u16.to_le_bytes()); // OBJL = LIGHTS
        data.extend(1u16.to_le_bytes()); // RVER
        data.push(1); // RUIN = Insert
        let decoded = frid(&data).unwrap();
        assert_eq!(decoded.objl, 75);
        assert_eq!(decoded.ruin, 1);
    }

    #[test]
    fn sg2d_applies_coordinate_factor() {
        let mut data = Vec::new();
        data.extend((-1223400000i32).to_le_bytes());
        data.extend(476400000i32.to_le_bytes());
        let points = sg2d(&data, &CoordFactors::default());
        assert_eq!(points.len(), 1);
        let (lon, lat) = points[0];
        assert!((lon - (-122.34)).abs() < 1e-9);
        assert!((lat - 47.64).abs() < 1e-9);
    }

    #[test]
    fn fspt_tags_edge_vs_node_pointers() {
        let mut data = Vec::new();
        let edge_name = ((RCNM_EDGE as u32) << 24) | 10;
        data.extend(edge_name.to_le_bytes());
        data.push(2); // ORNT = reverse
        data.push(0);
        data.push(0);
        let pointers = fspt(&data);
        assert_eq!(pointers.len(), 1);
        assert!(pointers[0].is_edge);
        assert!(pointers[0].reverse);
        assert_eq!(pointers[0].ref_id, 10);
    }

    #[test]
    fn attf_stops_at_padding_sentinel() {
        let mut collector = Collector::new();
        let height_code = catalog::attributes::by_acronym("HEIGHT").unwrap().code;
        let mut data = Vec::new();
        data.extend(height_code.to_le_bytes());
        data.extend(25u32.to_le_bytes());
        data.extend([0x20, 0x20, 0, 0]);
        let decoded = attf(&data, &mut collector, "rec1");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, "HEIGHT");
        assert_eq!(decoded[0].1, AttributeValue::Float(25.0));
    }

    #[test]
    fn attf_preserves_unknown_codes() {
        let mut collector = Collector::new();
        let mut data = Vec::new();
        data.extend(60000u16.to_le_bytes());
        data.extend(7u32.to_le_bytes());
        let decoded = attf(&data, &mut collector, "rec1");
        assert_eq!(decoded[0].0, "ATTL#60000");
    }

    #[test]
    fn dspm_decodes_comf_and_somf() {
        let mut parts: Vec<Vec<u8>> = vec![Vec::new(); 12];
        parts[10] = b"20000000".to_vec();
        parts[11] = b"200".to_vec();
        let data = parts.join(&0x1Fu8);
        let factors = dspm(&data).expect("comf/somf present");
        assert_eq!(factors.comf, 20_000_000.0);
        assert_eq!(factors.somf, 200.0);
    }
}
