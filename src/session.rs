//! Parse session orchestration: wires the ISO 8211 reader, S-57 field
//! decoders, primitive store, geometry assembler and feature store/updater
//! into base-cell parsing and sequential update application.

use std::collections::HashMap;

use crate::catalog;
use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::error::OpenEncError;
use crate::feature;
use crate::geometry;
use crate::iso8211::{Record, Records};
use crate::primitives::{Edge, Node, PrimitiveStore};
use crate::s57::decode::{self, RCNM_CONNECTED_NODE, RCNM_EDGE, RCNM_ISOLATED_NODE};
use crate::s57::{CoordFactors, DsidInfo};
use crate::store::{self, ApplyOutcome, FeatureStore, RuinOp, RuinRecord, UpdateSummary};

/// Owns the state that must persist across a dataset's records: the
/// decoded coordinate factors, the DSID metadata, and the vector
/// primitives accumulated so far.
pub struct ParseSession {
    pub collector: Collector,
    pub factors: CoordFactors,
    pub dsid: DsidInfo,
    primitives: PrimitiveStore,
    /// Off by default: an O(n²) pairwise segment check run over every
    /// assembled geometry, warning on the first self-intersection found.
    pub check_self_intersection: bool,
}

impl ParseSession {
    pub fn new() -> Self {
        Self {
            collector: Collector::new(),
            factors: CoordFactors::default(),
            dsid: DsidInfo::default(),
            primitives: PrimitiveStore::new(),
            check_self_intersection: false,
        }
    }

    pub fn with_collector(collector: Collector) -> Self {
        Self {
            collector,
            factors: CoordFactors::default(),
            dsid: DsidInfo::default(),
            primitives: PrimitiveStore::new(),
            check_self_intersection: false,
        }
    }

    /// Parse a base cell's raw bytes into a fully populated [`FeatureStore`].
    /// VRID records populate the primitive store in a first pass; FRID
    /// records are deferred to a second pass so geometry assembly always
    /// sees every primitive the cell carries, regardless of record order.
    pub fn parse_base_cell(&mut self, bytes: &[u8]) -> Result<FeatureStore, OpenEncError> {
        self.parse_base_cell_cancellable(bytes, &|| false)
    }

    /// As [`Self::parse_base_cell`], but `should_cancel` is polled between
    /// ISO 8211 records. On cancellation, parsing stops and the store built
    /// from records decoded so far is returned — not an error, since a
    /// caller-requested stop isn't a parse failure.
    pub fn parse_base_cell_cancellable(
        &mut self,
        bytes: &[u8],
        should_cancel: &dyn Fn() -> bool,
    ) -> Result<FeatureStore, OpenEncError> {
        let frid_records = self.ingest_records(bytes, should_cancel)?;

        let mut store = FeatureStore::new();
        for (index, record) in frid_records.iter().enumerate() {
            let Some(feature) = self.build_feature(record, index) else {
                continue;
            };
            let key = feature.foid.canonical();
            store.put(&key, store::VersionedFeature {
                version: feature.version,
                feature,
            });
        }
        Ok(store)
    }

    /// Apply a sequence of update files to `store`. Update filenames are
    /// expected to carry a contiguous `.001`, `.002`, ... suffix; a gap or
    /// a cell-name mismatch is fatal.
    pub fn apply_updates(
        &mut self,
        store: &mut FeatureStore,
        base_cell_name: &str,
        updates: &[(String, Vec<u8>)],
    ) -> Result<UpdateSummary, OpenEncError> {
        self.apply_updates_cancellable(store, base_cell_name, updates, &|| false)
    }

    /// As [`Self::apply_updates`], but `should_cancel` is polled between
    /// update files and between individual RUIN records within a file. On
    /// cancellation, the summary reflects whatever was applied before the
    /// stop.
    pub fn apply_updates_cancellable(
        &mut self,
        store: &mut FeatureStore,
        base_cell_name: &str,
        updates: &[(String, Vec<u8>)],
        should_cancel: &dyn Fn() -> bool,
    ) -> Result<UpdateSummary, OpenEncError> {
        let mut ordered: Vec<(u32, &(String, Vec<u8>))> = updates
            .iter()
            .filter_map(|u| update_sequence_number(&u.0).map(|n| (n, u)))
            .collect();
        ordered.sort_by_key(|(n, _)| *n);

        let mut expected = 1u32;
        for (n, _) in &ordered {
            if *n != expected {
                return Err(OpenEncError::UpdateGap {
                    expected,
                    found: *n,
                });
            }
            expected += 1;
        }

        let mut summary = UpdateSummary::default();
        for (n, (filename, bytes)) in ordered {
            if should_cancel() {
                return Ok(summary);
            }

            let frid_records = self.ingest_records(bytes, should_cancel)?;

            if let Some(cell_name) = &self.dsid.cell_name {
                if cell_name.as_str() != base_cell_name {
                    return Err(OpenEncError::CellNameMismatch {
                        base: base_cell_name.to_string(),
                        file: filename.clone(),
                        found: cell_name.clone(),
                    });
                }
            }

            for record in &frid_records {
                if should_cancel() {
                    return Ok(summary);
                }

                let Some(ruin_record) = self.build_ruin_record(record) else {
                    continue;
                };
                let geometry = if ruin_record.pointers.is_empty() {
                    None
                } else {
                    Some(geometry::assemble_with_options(
                        &ruin_record.pointers,
                        &self.primitives,
                        &mut self.collector,
                        &ruin_record.foid.canonical(),
                        self.check_self_intersection,
                    ))
                };
                match store::apply_ruin(store, ruin_record, geometry, &mut self.collector) {
                    ApplyOutcome::Inserted => summary.inserted += 1,
                    ApplyOutcome::Modified => summary.modified += 1,
                    ApplyOutcome::Deleted => summary.deleted += 1,
                    ApplyOutcome::SkippedConflict
                    | ApplyOutcome::SkippedMissing
                    | ApplyOutcome::SkippedInvalidRuin => {}
                }
            }

            summary.applied_filenames.push(filename.clone());
            summary.final_rver = n as u16;
        }

        Ok(summary)
    }

    /// First pass over a dataset's records: decode DSID/DSPM metadata and
    /// populate the primitive store, returning the FRID records for a
    /// caller-driven second pass. `should_cancel` is polled once per record;
    /// cancellation stops the scan early.
    ///
    /// `self.collector` is moved out for the duration of the scan (the
    /// `Records` iterator needs to borrow it mutably for as long as it
    /// lives) and moved back once the iterator is done with it, so the
    /// per-record handlers below can still take `&mut self` for the
    /// primitive store without fighting that borrow.
    fn ingest_records(
        &mut self,
        bytes: &[u8],
        should_cancel: &dyn Fn() -> bool,
    ) -> Result<Vec<Record>, OpenEncError> {
        let mut frid_records = Vec::new();
        let mut collector = std::mem::take(&mut self.collector);
        let mut cancelled = false;

        let mut records = Records::new(bytes, &mut collector);
        for record in &mut records {
            if should_cancel() {
                cancelled = true;
                break;
            }
            if let Some(data) = record.field("DSID") {
                self.dsid = decode::dsid(data);
            }
            if let Some(data) = record.field("DSPM") {
                if let Some(factors) = decode::dspm(data) {
                    self.factors = factors;
                }
            }
            if record.field("VRID").is_some() {
                self.ingest_vector_record(&record, &mut collector);
            }
            if record.field("FRID").is_some() {
                frid_records.push(record);
            }
        }
        let fatal = if cancelled { None } else { records.take_fatal() };
        self.collector = collector;

        if let Some(fatal) = fatal {
            return Err(fatal);
        }
        Ok(frid_records)
    }

    /// Decode a VRID record into the primitive store: edges get their
    /// SG2D/SG3D chain, isolated/connected nodes get their single
    /// coordinate.
    fn ingest_vector_record(&mut self, record: &Record, collector: &mut Collector) {
        let Some(vrid_data) = record.field("VRID") else {
            return;
        };
        let Some(vrid) = decode::vrid(vrid_data) else {
            return;
        };

        let coords: Vec<(f64, f64)> = record
            .field("SG2D")
            .map(|d| decode::sg2d(d, &self.factors))
            .or_else(|| {
                record
                    .field("SG3D")
                    .map(|d| decode::sg3d(d, &self.factors).into_iter().map(|(x, y, _)| (x, y)).collect())
            })
            .unwrap_or_default();

        if vrid.rcnm == RCNM_EDGE {
            let nodes = coords
                .into_iter()
                .map(|(lon, lat)| crate::primitives::Coord::new(lon, lat))
                .collect();
            self.primitives.insert_edge(Edge {
                id: vrid.rcid,
                nodes,
            });
        } else if vrid.rcnm == RCNM_ISOLATED_NODE || vrid.rcnm == RCNM_CONNECTED_NODE {
            if coords.len() != 1 {
                let _ = collector.warn_ctx(
                    WarningCode::COORD_COUNT_MISMATCH,
                    Severity::Warning,
                    format!(
                        "node {} carries {} coordinates, expected 1",
                        vrid.rcid,
                        coords.len()
                    ),
                    None,
                    None,
                );
            }
            if let Some(&(lon, lat)) = coords.first() {
                self.primitives.insert_node(Node {
                    id: vrid.rcid,
                    coord: crate::primitives::Coord::new(lon, lat),
                });
            }
        }
    }

    /// Decode a base-cell FRID record into a [`feature::Feature`], skipping
    /// it (with a warning already emitted by the decoder) if FRID/FOID are
    /// unreadable.
    fn build_feature(&mut self, record: &Record, decode_order: usize) -> Option<feature::Feature> {
        let frid_data = record.field("FRID")?;
        let frid = decode::frid(frid_data)?;
        let foid_data = record.field("FOID")?;
        let foid = decode::foid(foid_data)?;

        let record_id = format!("FRID#{}", frid.rcid);
        let attributes = record
            .field("ATTF")
            .map(|d| decode::attf(d, &mut self.collector, &record_id))
            .unwrap_or_default()
            .into_iter()
            .collect::<HashMap<_, _>>();
        let pointers = record.field("FSPT").map(decode::fspt).unwrap_or_default();
        let geometry = geometry::assemble_with_options(
            &pointers,
            &self.primitives,
            &mut self.collector,
            &foid.canonical(),
            self.check_self_intersection,
        );
        let feature_relations = record.field("FFPT").map(decode::ffpt).unwrap_or_default();

        Some(feature::build(
            record_id,
            foid,
            frid.objl,
            attributes,
            geometry,
            frid.rver,
            decode_order,
            feature_relations,
            &mut self.collector,
        ))
    }

    /// Decode an update FRID record into a [`RuinRecord`], emitting
    /// `INVALID_RUIN_CODE` and skipping it if the RUIN subfield isn't one of
    /// Insert/Delete/Modify.
    fn build_ruin_record(&mut self, record: &Record) -> Option<RuinRecord> {
        let frid_data = record.field("FRID")?;
        let frid = decode::frid(frid_data)?;
        let foid_data = record.field("FOID")?;
        let foid = decode::foid(foid_data)?;

        let record_id = format!("FRID#{}", frid.rcid);
        let Some(op) = RuinOp::from_code(frid.ruin) else {
            let _ = self.collector.warn_ctx(
                WarningCode::INVALID_RUIN_CODE,
                Severity::Warning,
                format!("unrecognized RUIN code {}", frid.ruin),
                Some(record_id),
                Some(foid.canonical()),
            );
            return None;
        };

        let attributes = record
            .field("ATTF")
            .map(|d| decode::attf(d, &mut self.collector, &record_id))
            .unwrap_or_default()
            .into_iter()
            .collect::<HashMap<_, _>>();
        let pointers = record.field("FSPT").map(decode::fspt).unwrap_or_default();
        let feature_relations = record.field("FFPT").map(decode::ffpt);
        // Modify keeps the existing object class when the update's OBJL doesn't
        // resolve to a known catalog entry; only a recognized code overrides it.
        let objl = match op {
            RuinOp::Delete => None,
            RuinOp::Insert => Some(frid.objl),
            RuinOp::Modify => catalog::object_classes::by_code(frid.objl).map(|_| frid.objl),
        };

        Some(RuinRecord {
            foid,
            op,
            record_id,
            rver: frid.rver,
            objl,
            attributes,
            pointers,
            feature_relations,
        })
    }
}

impl Default for ParseSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the numeric suffix from an update filename (`CA123456.001` ->
/// `1`). Valid sequence numbers are `1..=999`; anything outside that range
/// (including a 4+-digit suffix) is not a sequence number and is dropped.
fn update_sequence_number(filename: &str) -> Option<u32> {
    let n = filename.rsplit('.').next()?.parse::<u32>().ok()?;
    (1..1000).contains(&n).then_some(n)
}
