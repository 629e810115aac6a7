//! Pure predicates over primitive input values.
//!
//! Nothing in here touches the database; services call these before deciding
//! whether a repository is consulted at all.

use std::collections::HashMap;

/// A valid identifier is a strictly positive integer
pub fn is_valid_id(id: i64) -> bool {
    id > 0
}

/// Parse a raw identifier the way callers supply it (path segments, query values).
///
/// Integer-valued numerals such as `"7"` or `"7.0"` are accepted; anything that is
/// not a finite positive integer (`"0"`, `"-3"`, `"1.5"`, `"NaN"`, `"abc"`, `""`) is not.
pub fn parse_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return is_valid_id(id).then_some(id);
    }

    let number = raw.parse::<f64>().ok()?;
    if !number.is_finite() || number.fract() != 0.0 || number > i64::MAX as f64 {
        return None;
    }

    let id = number as i64;
    is_valid_id(id).then_some(id)
}

pub fn is_valid_string(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn is_valid_strings(values: &[&str]) -> bool {
    values.iter().all(|value| is_valid_string(value))
}

/// Check that a key names one of the declared attributes
pub fn is_property_of(key: &str, declared: &[&str]) -> bool {
    declared.contains(&key)
}

pub fn is_empty_object<K, V>(object: &HashMap<K, V>) -> bool {
    object.is_empty()
}

/// Prices, quantities and ratings are finite and never negative
pub fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
