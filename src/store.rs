//! The feature store and sequential RUIN updater.

use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::feature::{self, Feature};
use crate::geometry::Geometry;
use crate::s57::{AttributeValue, FeaturePointer, FoidInfo, SpatialPointer};

/// A feature paired with its RVER at time of storage.
#[derive(Debug, Clone)]
pub struct VersionedFeature {
    pub feature: Feature,
    pub version: u16,
}

/// The RUIN operation carried by an update record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuinOp {
    Insert,
    Delete,
    Modify,
}

impl RuinOp {
    /// RUIN subfield codes: 1 = Insert, 2 = Delete, 3 = Modify.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RuinOp::Insert),
            2 => Some(RuinOp::Delete),
            3 => Some(RuinOp::Modify),
            _ => None,
        }
    }
}

/// One decoded update record: the FOID it targets, the operation, and (for
/// Insert/Modify) the new payload.
#[derive(Debug, Clone)]
pub struct RuinRecord {
    pub foid: FoidInfo,
    pub op: RuinOp,
    pub record_id: String,
    pub rver: u16,
    /// `None` when the update record carries no OBJL (Delete, or a Modify
    /// that doesn't change object class).
    pub objl: Option<u16>,
    pub attributes: HashMap<String, AttributeValue>,
    pub pointers: Vec<SpatialPointer>,
    /// `None` when the update record carries no FFPT field at all; `Some`
    /// (even if empty) when one was present and should replace whatever
    /// relations the existing feature (for Modify) had.
    pub feature_relations: Option<Vec<FeaturePointer>>,
}

/// What happened when a single [`RuinRecord`] was applied — used to tally
/// an [`UpdateSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Deleted,
    Modified,
    SkippedConflict,
    SkippedMissing,
    SkippedInvalidRuin,
}

/// Keyed by the FOID canonical string.
///
/// `BTreeMap` rather than `HashMap` so iteration (`get_all_features`, debug
/// output) has a deterministic order independent of hashing; the original
/// decode/insertion order is tracked separately in `order` as its own
/// guarantee, distinct from key order.
#[derive(Debug, Default)]
pub struct FeatureStore {
    entries: BTreeMap<String, VersionedFeature>,
    order: Vec<String>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite.
    pub fn put(&mut self, foid: &str, vf: VersionedFeature) {
        if !self.entries.contains_key(foid) {
            self.order.push(foid.to_string());
        }
        self.entries.insert(foid.to_string(), vf);
    }

    /// Insert, failing (returning `false`) if the FOID is already present.
    pub fn insert(&mut self, foid: &str, vf: VersionedFeature) -> bool {
        if self.entries.contains_key(foid) {
            return false;
        }
        self.order.push(foid.to_string());
        self.entries.insert(foid.to_string(), vf);
        true
    }

    pub fn get(&self, foid: &str) -> Option<&VersionedFeature> {
        self.entries.get(foid)
    }

    pub fn remove(&mut self, foid: &str) -> bool {
        let removed = self.entries.remove(foid).is_some();
        if removed {
            self.order.retain(|k| k != foid);
        }
        removed
    }

    pub fn contains(&self, foid: &str) -> bool {
        self.entries.contains_key(foid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All features in decode/insertion order.
    pub fn get_all_features(&self) -> Vec<&Feature> {
        self.order
            .iter()
            .filter_map(|foid| self.entries.get(foid))
            .map(|vf| &vf.feature)
            .collect()
    }
}

/// Tallies from applying a sequence of updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub inserted: usize,
    pub modified: usize,
    pub deleted: usize,
    pub applied_filenames: Vec<String>,
    pub final_rver: u16,
}

/// Apply one decoded [`RuinRecord`] to `store`. Recoverable conflicts
/// (insert-conflict, delete/modify-missing, invalid RUIN code) are
/// warnings, never fatal.
///
/// `geometry` is pre-assembled by the caller (see [`crate::session`]),
/// since an update's spatial pointers may reference primitives the update
/// file itself introduces — this function stays a pure store/merge
/// operation with no dependency on the live primitive store. For Insert,
/// `None` falls back to `Point(0, 0)`; for Modify, `None` means "keep the
/// existing feature's geometry". `ruin.feature_relations` follows the same
/// keep-or-replace rule as geometry: `None` keeps what the existing feature
/// (Modify) already had, `Some` replaces it outright.
pub fn apply_ruin(
    store: &mut FeatureStore,
    ruin: RuinRecord,
    geometry: Option<Geometry>,
    collector: &mut Collector,
) -> ApplyOutcome {
    let key = ruin.foid.canonical();
    match ruin.op {
        RuinOp::Insert => {
            if store.contains(&key) {
                let _ = collector.warn_ctx(
                    WarningCode::UPDATE_INSERT_CONFLICT,
                    Severity::Warning,
                    format!("insert conflict: FOID {key} already present"),
                    Some(ruin.record_id.clone()),
                    Some(key),
                );
                return ApplyOutcome::SkippedConflict;
            }
            let objl = ruin.objl.unwrap_or(0);
            let geometry = geometry.unwrap_or(Geometry::Point(crate::primitives::Coord::new(0.0, 0.0)));
            let feature_relations = ruin.feature_relations.unwrap_or_default();
            let feature = feature::build(
                ruin.record_id,
                ruin.foid,
                objl,
                ruin.attributes,
                geometry,
                ruin.rver,
                0,
                feature_relations,
                collector,
            );
            store.insert(&key, VersionedFeature {
                feature,
                version: ruin.rver,
            });
            ApplyOutcome::Inserted
        }
        RuinOp::Delete => {
            if !store.remove(&key) {
                let _ = collector.warn_ctx(
                    WarningCode::UPDATE_DELETE_MISSING,
                    Severity::Warning,
                    format!("delete of missing FOID {key}"),
                    Some(ruin.record_id.clone()),
                    Some(key),
                );
                return ApplyOutcome::SkippedMissing;
            }
            ApplyOutcome::Deleted
        }
        RuinOp::Modify => {
            let Some(existing) = store.get(&key) else {
                let _ = collector.warn_ctx(
                    WarningCode::UPDATE_DELETE_MISSING,
                    Severity::Warning,
                    format!("modify of missing FOID {key}"),
                    Some(ruin.record_id.clone()),
                    Some(key),
                );
                return ApplyOutcome::SkippedMissing;
            };

            let mut attributes = existing.feature.attributes.clone();
            for (k, v) in ruin.attributes {
                attributes.insert(k, v);
            }
            let geometry = geometry.unwrap_or_else(|| existing.feature.geometry.clone());
            let objl = ruin.objl.unwrap_or(existing.feature.object_class.code);
            let decode_order = existing.feature.decode_order;
            let feature_relations = ruin
                .feature_relations
                .unwrap_or_else(|| existing.feature.feature_relations.clone());

            let feature = feature::build(
                ruin.record_id,
                ruin.foid,
                objl,
                attributes,
                geometry,
                ruin.rver,
                decode_order,
                feature_relations,
                collector,
            );
            store.put(&key, VersionedFeature {
                feature,
                version: ruin.rver,
            });
            ApplyOutcome::Modified
        }
    }
}
