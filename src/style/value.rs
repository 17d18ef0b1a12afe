use simd_json::{OwnedValue, StaticNode};
use std::collections::HashMap;
use std::fmt;

/// Property key injected at decode time holding the geometry kind
pub const TYPE_KEY: &str = "$type";

/// Feature property map keyed by property name
pub type Properties = HashMap<String, PropertyValue>;

/// Scalar property value attached to a feature or used as a filter literal.
///
/// All numeric encodings (signed, unsigned, float, double) collapse into
/// `Number(f64)`, so equality between numbers is always floating point.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Arrays and objects have no scalar form.
    pub fn from_json(value: &OwnedValue) -> Option<Self> {
        match value {
            OwnedValue::String(s) => Some(PropertyValue::String(s.clone())),
            OwnedValue::Static(node) => Some(Self::from_static(node)),
            _ => None,
        }
    }

    #[allow(unreachable_patterns)]
    fn from_static(node: &StaticNode) -> Self {
        match node {
            StaticNode::I64(i) => PropertyValue::Number(*i as f64),
            StaticNode::U64(u) => PropertyValue::Number(*u as f64),
            StaticNode::F64(f) => PropertyValue::Number(*f),
            StaticNode::Bool(b) => PropertyValue::Bool(*b),
            StaticNode::Null => PropertyValue::Null,
            _ => PropertyValue::Null,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Null => f.write_str("null"),
        }
    }
}
