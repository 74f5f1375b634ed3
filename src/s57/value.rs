//! The decoded attribute value sum type.

use std::fmt;

/// A decoded S-57 attribute value.
///
/// Modeled as a tagged sum rather than a dynamic `Object?`, per the Design
/// Notes' "dynamic attribute maps" guidance: downstream consumers
/// pattern-match instead of downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Str(String),
    Enum {
        code: String,
        label: Option<String>,
    },
    List(Vec<AttributeValue>),
    Bytes(Vec<u8>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(x) => write!(f, "{x}"),
            AttributeValue::Str(s) => write!(f, "{s}"),
            AttributeValue::Enum { code, label } => match label {
                Some(l) => write!(f, "{code} ({l})"),
                None => write!(f, "{code}"),
            },
            AttributeValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttributeValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(x) => Some(*x),
            AttributeValue::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s.as_str()),
            AttributeValue::Enum { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
