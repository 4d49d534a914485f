//! Type inference for parameters discovered in the runtime configuration.
//!
//! The configuration resolver reports every default as a string. [`infer`]
//! turns such a string into a typed [`ScalarProperty`] so a newly discovered
//! parameter can be added to the schema.

use serde_json::{Number, Value};

use crate::{ParamType, ScalarProperty};

/// Builds a scalar property from an untyped configuration value.
///
/// Numbers become `integer` or `number`, the literal `True` becomes a
/// `boolean`, everything else is a `string`. Placeholder values (`false`
/// and the empty string) produce no default.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::{infer, ParamType};
/// use serde_json::json;
///
/// let prop = infer("'2.5'");
/// assert_eq!(prop.param_type, ParamType::Number);
/// assert_eq!(prop.default, Some(json!(2.5)));
///
/// let prop = infer("True");
/// assert_eq!(prop.param_type, ParamType::Boolean);
/// assert_eq!(prop.default, Some(json!(true)));
///
/// let prop = infer("false");
/// assert_eq!(prop.param_type, ParamType::Boolean);
/// assert_eq!(prop.default, None);
/// ```
pub fn infer(raw: &str) -> ScalarProperty {
    let value = strip_quotes(raw);

    // Only "True" is trusted as a boolean: unset params are commonly
    // initialised as false and filled with a string later.
    if value == "True" {
        return ScalarProperty::new(ParamType::Boolean).with_default(true);
    }
    if value == "false" {
        return ScalarProperty::new(ParamType::Boolean);
    }
    if value.is_empty() {
        return ScalarProperty::new(ParamType::String);
    }

    match parse_number(value) {
        Some((param_type, number)) => {
            ScalarProperty::new(param_type).with_default(Value::Number(number))
        }
        None => ScalarProperty::new(ParamType::String).with_default(value),
    }
}

/// Removes one layer of matching `'` or `"` quotes.
fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Integer literals are exact up to the `u64` range. Larger literals, and
/// integral floats outside the `i64`/`u64` range, become `number`.
fn parse_number(value: &str) -> Option<(ParamType, Number)> {
    if let Ok(int) = value.parse::<i64>() {
        return Some((ParamType::Integer, Number::from(int)));
    }
    if let Ok(int) = value.parse::<u64>() {
        return Some((ParamType::Integer, Number::from(int)));
    }
    let float = value.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if float.fract() == 0.0 {
        if float.abs() < i64::MAX as f64 {
            return Some((ParamType::Integer, Number::from(float as i64)));
        }
        if float > 0.0 && float < u64::MAX as f64 {
            return Some((ParamType::Integer, Number::from(float as u64)));
        }
    }
    Number::from_f64(float).map(|n| (ParamType::Number, n))
}
