//! The feature builder and required-attribute validator.

use std::collections::HashMap;

use crate::catalog::{self, ObjectClass};
use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::geometry::Geometry;
use crate::s57::{AttributeValue, FeaturePointer, FoidInfo};

/// A generic object class used when a decoded OBJL code isn't in the
/// bundled catalog.
fn generic_object_class(code: u16) -> ObjectClass {
    ObjectClass {
        code,
        acronym: "UNKNOWN",
        name: "Unknown object class",
    }
}

/// A fully built, validated S-57 feature.
#[derive(Debug, Clone)]
pub struct Feature {
    pub record_id: String,
    pub foid: FoidInfo,
    pub object_class: ObjectClass,
    pub geometry: Geometry,
    pub attributes: HashMap<String, AttributeValue>,
    pub label: String,
    pub version: u16,
    /// This feature's position in ISO 8211 record decode order, independent
    /// of the feature store's FOID-keyed ordering.
    pub decode_order: usize,
    /// FFPT-derived feature-to-feature relationships, carried as foreign-key
    /// ids (`FeaturePointer::lnam`) resolved lazily through the feature
    /// store rather than eagerly into borrowed references.
    pub feature_relations: Vec<FeaturePointer>,
}

/// `(objl_acronym, required_attribute_acronyms)` rule table.
const REQUIRED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("DEPARE", &["DRVAL1"]),
    ("SOUNDG", &["VALSOU"]),
    ("BOYLAT", &["CATBOY"]),
    ("BOYISD", &["CATBOY"]),
    ("BOYSPP", &["CATBOY"]),
];

const DEPTH_ATTRIBUTES: &[&str] = &["VALSOU", "DRVAL1", "DRVAL2", "VALDCO"];
const DEPTH_RANGE_METERS: std::ops::RangeInclusive<f64> = -100.0..=15000.0;

/// Resolve the object class for `objl`, emitting `UNKNOWN_OBJ_CODE` and
/// falling back to a generic class when the catalog doesn't know it.
pub fn resolve_object_class(
    objl: u16,
    collector: &mut Collector,
    record_id: &str,
) -> ObjectClass {
    match catalog::object_classes::by_code(objl) {
        Some(class) => class.clone(),
        None => {
            let _ = collector.warn_ctx(
                WarningCode::UNKNOWN_OBJ_CODE,
                Severity::Warning,
                format!("unknown object class code {objl}"),
                Some(record_id.to_string()),
                None,
            );
            generic_object_class(objl)
        }
    }
}

/// Validate required attributes per the object class. Missing attributes
/// are warnings, not fatal.
pub fn validate_required_attributes(
    object_class: &ObjectClass,
    attributes: &HashMap<String, AttributeValue>,
    collector: &mut Collector,
    feature_id: &str,
) {
    let Some((_, required)) = REQUIRED_ATTRIBUTES
        .iter()
        .find(|(acronym, _)| *acronym == object_class.acronym)
    else {
        return;
    };
    for attr in *required {
        if !attributes.contains_key(*attr) {
            let _ = collector.warn_ctx(
                WarningCode::MISSING_REQUIRED_ATTR,
                Severity::Warning,
                format!("{} missing required attribute {attr}", object_class.acronym),
                None,
                Some(feature_id.to_string()),
            );
        }
    }
}

/// Sanity-check depth attributes against a plausible physical range.
pub fn check_depth_sanity(
    attributes: &HashMap<String, AttributeValue>,
    collector: &mut Collector,
    feature_id: &str,
) {
    for acronym in DEPTH_ATTRIBUTES {
        let Some(value) = attributes.get(*acronym).and_then(AttributeValue::as_f64) else {
            continue;
        };
        if !DEPTH_RANGE_METERS.contains(&value) {
            let _ = collector.warn_ctx(
                WarningCode::DEPTH_OUT_OF_RANGE,
                Severity::Info,
                format!("{acronym} = {value} is outside [-100, 15000] meters"),
                None,
                Some(feature_id.to_string()),
            );
        }
    }
}

/// Derive the feature's display label: prefer `OBJNAM`, else the object
/// class name, else its acronym.
pub fn derive_label(
    attributes: &HashMap<String, AttributeValue>,
    object_class: &ObjectClass,
) -> String {
    if let Some(name) = attributes.get("OBJNAM").and_then(AttributeValue::as_str) {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if !object_class.name.is_empty() {
        return object_class.name.to_string();
    }
    object_class.acronym.to_string()
}

/// Build a [`Feature`] from decoded parts, running the full validator
/// pipeline.
#[allow(clippy::too_many_arguments)]
pub fn build(
    record_id: String,
    foid: FoidInfo,
    objl: u16,
    attributes: HashMap<String, AttributeValue>,
    geometry: Geometry,
    version: u16,
    decode_order: usize,
    feature_relations: Vec<FeaturePointer>,
    collector: &mut Collector,
) -> Feature {
    let feature_id = foid.canonical();
    let object_class = resolve_object_class(objl, collector, &record_id);
    validate_required_attributes(&object_class, &attributes, collector, &feature_id);
    check_depth_sanity(&attributes, collector, &feature_id);
    let label = derive_label(&attributes, &object_class);

    Feature {
        record_id,
        foid,
        object_class,
        geometry,
        attributes,
        label,
        version,
        decode_order,
        feature_relations,
    }
}
