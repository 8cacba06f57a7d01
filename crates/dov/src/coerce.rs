//! Conversion of raw XML text into typed values.
//!
//! Each [`ValueType`] has one converter in a static table. Absent input and
//! present but blank input are null for every type.

use chrono::{Days, NaiveDate};

use crate::error::CoercionError;
use crate::value::{Value, ValueType};

type Converter = fn(&str) -> Result<Value, String>;

/// Source format of DOV dates: an ISO date with a literal `Z` suffix.
pub const DATE_FORMAT: &str = "%Y-%m-%dZ";

static CONVERTERS: [(ValueType, Converter); 5] = [
    (ValueType::String, to_string),
    (ValueType::Integer, to_integer),
    (ValueType::Float, to_float),
    (ValueType::Date, to_date),
    (ValueType::Boolean, to_boolean),
];

fn converter(target: ValueType) -> Converter {
    CONVERTERS
        .iter()
        .find(|(ty, _)| *ty == target)
        .map(|(_, f)| *f)
        .unwrap_or(to_string)
}

/// Converts raw text to a value of `target`.
///
/// Returns `Ok(None)` for a null value.
pub fn coerce(raw: Option<&str>, target: ValueType) -> Result<Option<Value>, CoercionError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    converter(target)(trimmed)
        .map(Some)
        .map_err(|message| CoercionError::new(raw, target, message))
}

fn to_string(raw: &str) -> Result<Value, String> {
    Ok(Value::String(raw.to_string()))
}

fn to_integer(raw: &str) -> Result<Value, String> {
    raw.parse::<i64>()
        .map(Value::Integer)
        .map_err(|e| e.to_string())
}

fn to_float(raw: &str) -> Result<Value, String> {
    raw.parse::<f64>()
        .map(Value::Float)
        .map_err(|e| e.to_string())
}

// The service publishes dates one day early; the extra day is part of the
// published output format.
fn to_date(raw: &str) -> Result<Value, String> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| e.to_string())?;
    date.checked_add_days(Days::new(1))
        .map(Value::Date)
        .ok_or_else(|| "date out of range".to_string())
}

fn to_boolean(raw: &str) -> Result<Value, String> {
    match raw.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(Value::Boolean(true)),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(Value::Boolean(false)),
        _ => Err("expected one of true/false/yes/no/1/0".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_null_for_every_type() {
        for (ty, _) in CONVERTERS.iter() {
            assert_eq!(coerce(None, *ty).unwrap(), None);
        }
    }

    #[test]
    fn test_string_is_trimmed() {
        assert_eq!(
            coerce(Some("  Gent \n"), ValueType::String).unwrap(),
            Some(Value::String("Gent".to_string()))
        );
        assert_eq!(coerce(Some(""), ValueType::String).unwrap(), None);
        assert_eq!(coerce(Some(" \n\t"), ValueType::String).unwrap(), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            coerce(Some(" 42 "), ValueType::Integer).unwrap(),
            Some(Value::Integer(42))
        );
        assert_eq!(
            coerce(Some("-3.75"), ValueType::Float).unwrap(),
            Some(Value::Float(-3.75))
        );
        assert_eq!(coerce(Some("   "), ValueType::Float).unwrap(), None);
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let err = coerce(Some("12,5"), ValueType::Float).unwrap_err();
        assert_eq!(err.raw, "12,5");
        assert_eq!(err.target, ValueType::Float);
        assert!(coerce(Some("1.5"), ValueType::Integer).is_err());
    }

    #[test]
    fn test_date_adds_one_day() {
        assert_eq!(
            coerce(Some("2004-04-06Z"), ValueType::Date).unwrap(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2004, 4, 7).unwrap()))
        );
        assert_eq!(
            coerce(Some("2016-12-31Z"), ValueType::Date).unwrap(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()))
        );
        assert!(coerce(Some("2004-04-06"), ValueType::Date).is_err());
        assert!(coerce(Some("06/04/2004Z"), ValueType::Date).is_err());
    }

    #[test]
    fn test_booleans() {
        for raw in ["true", "TRUE", "1", "yes", "y"] {
            assert_eq!(
                coerce(Some(raw), ValueType::Boolean).unwrap(),
                Some(Value::Boolean(true))
            );
        }
        for raw in ["false", "0", "No", "off"] {
            assert_eq!(
                coerce(Some(raw), ValueType::Boolean).unwrap(),
                Some(Value::Boolean(false))
            );
        }
        assert!(coerce(Some("misschien"), ValueType::Boolean).is_err());
    }
}
