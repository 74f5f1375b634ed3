//! Attribute catalog: the attribute label/type table.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

/// The attribute value's expected shape, used by the field decoder to pick
/// an [`crate::s57::value::AttributeValue`] variant and by the feature
/// validator to sanity-check ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Int,
    Float,
    String,
    Enum,
}

impl AttributeType {
    fn parse(s: &str) -> Self {
        match s {
            "int" => AttributeType::Int,
            "float" => AttributeType::Float,
            "enum" => AttributeType::Enum,
            _ => AttributeType::String,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawAttribute {
    acronym: String,
    code: u16,
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    domain: HashMap<String, String>,
}

/// A single row of the attribute catalog.
#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub acronym: &'static str,
    /// The numeric attribute label (ATTL) this acronym decodes from in ATTF.
    pub code: u16,
    pub kind: AttributeType,
    pub name: &'static str,
    /// Enum code -> label, populated only when `kind` is [`AttributeType::Enum`].
    pub domain: HashMap<String, String>,
}

impl AttributeDef {
    /// Resolve an enum code's label, if this attribute has a domain entry
    /// for it. Always `None` for non-enum attributes.
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.domain.get(code).map(String::as_str)
    }
}

static BY_ACRONYM: LazyLock<HashMap<&'static str, AttributeDef>> = LazyLock::new(|| {
    let raw: Vec<RawAttribute> = serde_json::from_str(include_str!("../data/attributes.json"))
        .expect("bundled attributes.json must parse");
    raw.into_iter()
        .map(|r| {
            let acronym: &'static str = Box::leak(r.acronym.into_boxed_str());
            let def = AttributeDef {
                acronym,
                code: r.code,
                kind: AttributeType::parse(&r.kind),
                name: Box::leak(r.name.into_boxed_str()),
                domain: r.domain,
            };
            (acronym, def)
        })
        .collect()
});

static BY_CODE: LazyLock<HashMap<u16, &'static str>> =
    LazyLock::new(|| BY_ACRONYM.values().map(|d| (d.code, d.acronym)).collect());

/// Look up an attribute definition by its acronym, e.g. `"DRVAL1"`.
pub fn by_acronym(acronym: &str) -> Option<&'static AttributeDef> {
    BY_ACRONYM.get(acronym)
}

/// Look up an attribute definition by its numeric ATTL code, as decoded
/// from an ATTF field.
pub fn by_code(code: u16) -> Option<&'static AttributeDef> {
    BY_CODE.get(&code).and_then(|acr| BY_ACRONYM.get(acr))
}

/// Total number of attributes in the bundled catalog.
pub fn len() -> usize {
    BY_ACRONYM.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_float_attribute_resolves() {
        let drval1 = by_acronym("DRVAL1").expect("DRVAL1 must be in the bundled catalog");
        assert_eq!(drval1.kind, AttributeType::Float);
    }

    #[test]
    fn known_enum_attribute_has_domain() {
        let colour = by_acronym("COLOUR").expect("COLOUR must be in the bundled catalog");
        assert_eq!(colour.kind, AttributeType::Enum);
        assert_eq!(colour.label_for("1"), Some("White"));
    }

    #[test]
    fn synthetic_catboy_attribute_is_present() {
        let catboy = by_acronym("CATBOY").expect("CATBOY must be bundled for required-attr rules");
        assert_eq!(catboy.kind, AttributeType::Enum);
    }

    #[test]
    fn unknown_acronym_is_none() {
        assert!(by_acronym("ZZZZZZ").is_none());
    }

    #[test]
    fn code_lookup_matches_acronym_lookup() {
        let by_acr = by_acronym("DRVAL1").unwrap();
        let by_c = by_code(by_acr.code).unwrap();
        assert_eq!(by_acr.acronym, by_c.acronym);
    }
}
