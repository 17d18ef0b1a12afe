//! Compiler for the legacy Mapbox GL filter syntax.
//!
//! Filters are JSON arrays of the form `[operator, ...args]`. They compile
//! once into a [`Filter`] tree which is then evaluated against a feature's
//! property map for every feature in every tile.

use crate::error::FilterError;
use crate::style::value::{Properties, PropertyValue};
use simd_json::OwnedValue;

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Empty filter: matches everything
    Always,
    /// Disabled rule: matches nothing
    Never,
    All(Vec<Filter>),
    Any(Vec<Filter>),
    None(Vec<Filter>),
    Eq(String, PropertyValue),
    Ne(String, PropertyValue),
    Gt(String, f64),
    Ge(String, f64),
    Lt(String, f64),
    Le(String, f64),
    In(String, Vec<PropertyValue>),
    NotIn(String, Vec<PropertyValue>),
    Has(String),
    NotHas(String),
}

impl Filter {
    /// Compile a filter expression. `null` and `[]` compile to [`Filter::Always`].
    pub fn compile(expr: &OwnedValue) -> Result<Filter, FilterError> {
        match expr {
            OwnedValue::Array(items) => Self::compile_array(items),
            OwnedValue::Static(simd_json::StaticNode::Null) => Ok(Filter::Always),
            other => Err(FilterError::Malformed(format!(
                "expected an array, got {:?}",
                other
            ))),
        }
    }

    fn compile_array(items: &[OwnedValue]) -> Result<Filter, FilterError> {
        let Some(first) = items.first() else {
            return Ok(Filter::Always);
        };
        let op = match first {
            OwnedValue::String(op) => op.as_str(),
            _ => return Err(FilterError::Malformed("operator must be a string".into())),
        };
        let args = &items[1..];

        match op {
            "all" => Ok(Filter::All(compile_all(args)?)),
            "any" => Ok(Filter::Any(compile_all(args)?)),
            "none" => Ok(Filter::None(compile_all(args)?)),
            "==" | "!=" => {
                require(op, args, 2)?;
                let key = key(op, &args[0])?;
                let value = scalar(op, &args[1])?;
                Ok(if op == "==" {
                    Filter::Eq(key, value)
                } else {
                    Filter::Ne(key, value)
                })
            }
            ">" | ">=" | "<" | "<=" => {
                require(op, args, 2)?;
                let key = key(op, &args[0])?;
                let bound = scalar(op, &args[1])?
                    .as_number()
                    .ok_or_else(|| FilterError::NotNumeric(op.to_string()))?;
                Ok(match op {
                    ">" => Filter::Gt(key, bound),
                    ">=" => Filter::Ge(key, bound),
                    "<" => Filter::Lt(key, bound),
                    _ => Filter::Le(key, bound),
                })
            }
            "in" | "!in" => {
                require(op, args, 2)?;
                let key = key(op, &args[0])?;
                let values = literal_set(op, &args[1..])?;
                Ok(if op == "in" {
                    Filter::In(key, values)
                } else {
                    Filter::NotIn(key, values)
                })
            }
            "has" | "!has" => {
                require(op, args, 1)?;
                let key = key(op, &args[0])?;
                Ok(if op == "has" {
                    Filter::Has(key)
                } else {
                    Filter::NotHas(key)
                })
            }
            unknown => Err(FilterError::UnknownOperator(unknown.to_string())),
        }
    }

    /// Evaluate against a feature's properties. Combinators short-circuit.
    pub fn matches(&self, props: &Properties) -> bool {
        match self {
            Filter::Always => true,
            Filter::Never => false,
            Filter::All(subs) => subs.iter().all(|f| f.matches(props)),
            Filter::Any(subs) => subs.iter().any(|f| f.matches(props)),
            Filter::None(subs) => !subs.iter().any(|f| f.matches(props)),
            Filter::Eq(key, value) => props.get(key).is_some_and(|v| v == value),
            // a missing property is never equal to the literal
            Filter::Ne(key, value) => props.get(key) != Some(value),
            Filter::Gt(key, bound) => number(props, key).is_some_and(|n| n > *bound),
            Filter::Ge(key, bound) => number(props, key).is_some_and(|n| n >= *bound),
            Filter::Lt(key, bound) => number(props, key).is_some_and(|n| n < *bound),
            Filter::Le(key, bound) => number(props, key).is_some_and(|n| n <= *bound),
            Filter::In(key, values) => props.get(key).is_some_and(|v| values.contains(v)),
            Filter::NotIn(key, values) => props.get(key).map_or(true, |v| !values.contains(v)),
            Filter::Has(key) => props.contains_key(key),
            Filter::NotHas(key) => !props.contains_key(key),
        }
    }
}

fn compile_all(args: &[OwnedValue]) -> Result<Vec<Filter>, FilterError> {
    args.iter().map(Filter::compile).collect()
}

fn require(op: &str, args: &[OwnedValue], expected: usize) -> Result<(), FilterError> {
    if args.len() < expected {
        return Err(FilterError::Arity {
            op: op.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn key(op: &str, value: &OwnedValue) -> Result<String, FilterError> {
    match value {
        OwnedValue::String(s) => Ok(s.clone()),
        _ => Err(FilterError::KeyNotString(op.to_string())),
    }
}

fn scalar(op: &str, value: &OwnedValue) -> Result<PropertyValue, FilterError> {
    PropertyValue::from_json(value)
        .ok_or_else(|| FilterError::Malformed(format!("operator `{}` expects a scalar literal", op)))
}

/// `["in", key, a, b]` and `["in", key, [a, b]]` are both accepted.
fn literal_set(op: &str, args: &[OwnedValue]) -> Result<Vec<PropertyValue>, FilterError> {
    if let [OwnedValue::Array(items)] = args {
        return items.iter().map(|v| scalar(op, v)).collect();
    }
    args.iter().map(|v| scalar(op, v)).collect()
}

fn number(props: &Properties, key: &str) -> Option<f64> {
    props.get(key).and_then(PropertyValue::as_number)
}
