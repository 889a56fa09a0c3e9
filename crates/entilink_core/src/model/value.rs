use super::PrimitiveKind;
use crate::error::{AccessError, AccessResult};
use serde_json::Value as Json;
use std::fmt;

/// Value held by a primitive field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// Character data.
    Text(String),
    /// Epoch milliseconds.
    Date(i64),
    /// Decimal in canonical string form, e.g. `"-12.50"`.
    Numeric(String),
    /// Enumeration option name.
    Enum(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload of text, numeric and enum values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Numeric(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Checks that the value may be stored in a field of `kind`.
    ///
    /// `Null` is accepted for every kind.
    pub fn validate(&self, field: &str, kind: &PrimitiveKind) -> AccessResult<()> {
        match (kind, self) {
            (_, Self::Null)
            | (PrimitiveKind::Int, Self::Int(_))
            | (PrimitiveKind::Boolean, Self::Bool(_))
            | (PrimitiveKind::Date, Self::Date(_)) => Ok(()),
            (PrimitiveKind::Text { max_len }, Self::Text(s)) => {
                let len = s.chars().count();
                if len > *max_len {
                    Err(AccessError::invalid_value(
                        field,
                        format!("{len} characters exceed the maximum of {max_len}"),
                    ))
                } else {
                    Ok(())
                }
            }
            (PrimitiveKind::Numeric { precision, scale }, Self::Numeric(s)) => {
                check_numeric(s, *precision, *scale)
                    .map_err(|message| AccessError::invalid_value(field, message))
            }
            (PrimitiveKind::Enum { name, options }, Self::Enum(option)) => {
                if options.iter().any(|o| o == option) {
                    Ok(())
                } else {
                    Err(AccessError::invalid_value(
                        field,
                        format!("{option} is not an option of {name}"),
                    ))
                }
            }
            (kind, value) => Err(AccessError::invalid_value(
                field,
                format!("{value:?} does not fit a {kind:?} field"),
            )),
        }
    }

    /// Converts a wire value into a validated field value.
    pub fn from_json(field: &str, kind: &PrimitiveKind, json: &Json) -> AccessResult<Self> {
        if json.is_null() {
            return Ok(Self::Null);
        }
        let mismatch = || AccessError::invalid_value(field, format!("unexpected value {json}"));
        let value = match kind {
            PrimitiveKind::Int => Self::Int(json.as_i64().ok_or_else(mismatch)?),
            PrimitiveKind::Boolean => Self::Bool(json.as_bool().ok_or_else(mismatch)?),
            PrimitiveKind::Date => Self::Date(json.as_i64().ok_or_else(mismatch)?),
            PrimitiveKind::Text { .. } => Self::Text(json.as_str().ok_or_else(mismatch)?.to_owned()),
            PrimitiveKind::Enum { .. } => Self::Enum(json.as_str().ok_or_else(mismatch)?.to_owned()),
            PrimitiveKind::Numeric { .. } => match json {
                Json::String(s) => Self::Numeric(s.clone()),
                Json::Number(n) => Self::Numeric(n.to_string()),
                _ => return Err(mismatch()),
            },
        };
        value.validate(field, kind)?;
        Ok(value)
    }

    /// Converts the value into its wire form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Int(v) | Self::Date(v) => Json::from(*v),
            Self::Bool(v) => Json::Bool(*v),
            Self::Text(s) | Self::Numeric(s) | Self::Enum(s) => Json::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(v) | Self::Date(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(s) | Self::Numeric(s) | Self::Enum(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Checks a decimal string against precision and scale limits.
fn check_numeric(text: &str, precision: u32, scale: u32) -> Result<(), String> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(format!("{text} is not a decimal number"));
    }
    let frac_digits = frac_part.len() as u32;
    if frac_digits > scale {
        return Err(format!("{text} has {frac_digits} fractional digits, scale is {scale}"));
    }
    let int_digits = int_part.trim_start_matches('0').len() as u32;
    if int_digits + frac_digits > precision {
        return Err(format!(
            "{text} has {} significant digits, precision is {precision}",
            int_digits + frac_digits
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numeric(precision: u32, scale: u32) -> PrimitiveKind {
        PrimitiveKind::Numeric { precision, scale }
    }

    #[test]
    fn null_fits_every_kind() {
        for kind in [
            PrimitiveKind::Int,
            PrimitiveKind::Boolean,
            PrimitiveKind::Date,
            PrimitiveKind::Text { max_len: 1 },
            numeric(2, 0),
        ] {
            assert!(Value::Null.validate("f", &kind).is_ok());
        }
    }

    #[test]
    fn text_longer_than_max_len_is_rejected() {
        let kind = PrimitiveKind::Text { max_len: 4 };
        assert!(Value::from("abcd").validate("name", &kind).is_ok());
        let err = Value::from("abcde").validate("name", &kind).unwrap_err();
        assert!(matches!(err, AccessError::InvalidValue { ref field, .. } if field == "name"));
    }

    #[test]
    fn numeric_precision_and_scale() {
        let kind = numeric(5, 2);
        assert!(Value::Numeric("123.45".into()).validate("price", &kind).is_ok());
        assert!(Value::Numeric("-0.5".into()).validate("price", &kind).is_ok());
        assert!(Value::Numeric("1234.5".into()).validate("price", &kind).is_ok());
        assert!(Value::Numeric("123456".into()).validate("price", &kind).is_err());
        assert!(Value::Numeric("9999.99".into()).validate("price", &kind).is_err());
        assert!(Value::Numeric("1.234".into()).validate("price", &kind).is_err());
        assert!(Value::Numeric("1e5".into()).validate("price", &kind).is_err());
        assert!(Value::Numeric(".".into()).validate("price", &kind).is_err());
    }

    #[test]
    fn enum_option_must_be_declared() {
        let kind = PrimitiveKind::Enum {
            name: "Genre".into(),
            options: vec!["Fiction".into(), "Poetry".into()],
        };
        assert!(Value::Enum("Poetry".into()).validate("genre", &kind).is_ok());
        assert!(Value::Enum("Drama".into()).validate("genre", &kind).is_err());
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        assert!(Value::Bool(true).validate("pages", &PrimitiveKind::Int).is_err());
        assert!(Value::from(3).validate("title", &PrimitiveKind::Text { max_len: 8 }).is_err());
    }

    #[test]
    fn json_conversion_follows_kind() {
        let value = Value::from_json("price", &numeric(6, 2), &serde_json::json!(12.5)).unwrap();
        assert_eq!(value, Value::Numeric("12.5".into()));
        let date = Value::from_json("published", &PrimitiveKind::Date, &serde_json::json!(1000)).unwrap();
        assert_eq!(date, Value::Date(1000));
        assert_eq!(date.to_json(), serde_json::json!(1000));
        assert!(Value::from_json("pages", &PrimitiveKind::Int, &serde_json::json!("x")).is_err());
        assert_eq!(
            Value::from_json("pages", &PrimitiveKind::Int, &serde_json::Value::Null).unwrap(),
            Value::Null
        );
    }

    proptest! {
        #[test]
        fn text_within_limit_is_accepted(s in "[a-z]{0,16}") {
            let kind = PrimitiveKind::Text { max_len: 16 };
            prop_assert!(Value::Text(s).validate("t", &kind).is_ok());
        }

        #[test]
        fn integer_decimals_respect_precision(n in 0u32..100_000) {
            let text = n.to_string();
            let kind = numeric(5, 0);
            prop_assert!(Value::Numeric(text).validate("n", &kind).is_ok());
        }
    }
}
