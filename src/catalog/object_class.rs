//! Object class catalog: the 6-digit OBJL code table.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct RawObjectClass {
    code: u16,
    acronym: String,
    name: String,
}

/// A single row of the object class catalog: an OBJL code, its 6-character
/// acronym (`DEPARE`, `LIGHTS`, ...), and its human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClass {
    pub code: u16,
    pub acronym: &'static str,
    pub name: &'static str,
}

static BY_CODE: LazyLock<HashMap<u16, ObjectClass>> = LazyLock::new(|| {
    let raw: Vec<RawObjectClass> =
        serde_json::from_str(include_str!("../data/object_classes.json"))
            .expect("bundled object_classes.json must parse");
    raw.into_iter()
        .map(|r| {
            let class = ObjectClass {
                code: r.code,
                acronym: Box::leak(r.acronym.into_boxed_str()),
                name: Box::leak(r.name.into_boxed_str()),
            };
            (class.code, class)
        })
        .collect()
});

static BY_ACRONYM: LazyLock<HashMap<&'static str, u16>> =
    LazyLock::new(|| BY_CODE.values().map(|c| (c.acronym, c.code)).collect());

/// Look up an object class by its numeric OBJL code.
pub fn by_code(code: u16) -> Option<&'static ObjectClass> {
    BY_CODE.get(&code)
}

/// Look up an object class by its acronym, e.g. `"DEPARE"`.
pub fn by_acronym(acronym: &str) -> Option<&'static ObjectClass> {
    BY_ACRONYM
        .get(acronym)
        .and_then(|code| BY_CODE.get(code))
}

/// Total number of object classes in the bundled catalog.
pub fn len() -> usize {
    BY_CODE.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_resolves() {
        let depare = by_code(42).expect("DEPARE must be in the bundled catalog");
        assert_eq!(depare.acronym, "DEPARE");
    }

    #[test]
    fn known_acronym_resolves() {
        let lights = by_acronym("LIGHTS").expect("LIGHTS must be in the bundled catalog");
        assert_eq!(lights.code, 75);
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(by_code(65000).is_none());
    }

    #[test]
    fn catalog_is_nonempty() {
        assert!(len() > 100);
    }
}
