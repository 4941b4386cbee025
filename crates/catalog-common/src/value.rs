//! Canonical attribute values.
//!
//! Raw values read from binary metadata stores are converted once into an
//! [`AttrValue`]; everything downstream matches on the variant instead of
//! inspecting runtime types again.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;

use crate::time::to_iso;

/// A JSON-safe attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Naive wall-clock timestamp, serialized as ISO-8601.
    Timestamp(NaiveDateTime),
    /// Start/end pair, serialized as a two-element array of ISO-8601 strings.
    TimestampRange(NaiveDateTime, NaiveDateTime),
    Array(Vec<AttrValue>),
}

impl AttrValue {
    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Convert into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttrValue::Null => serializer.serialize_none(),
            AttrValue::Bool(v) => serializer.serialize_bool(*v),
            AttrValue::Int(v) => serializer.serialize_i64(*v),
            AttrValue::Float(v) => serializer.serialize_f64(*v),
            AttrValue::Text(v) => serializer.serialize_str(v),
            AttrValue::Timestamp(dt) => serializer.serialize_str(&to_iso(dt)),
            AttrValue::TimestampRange(start, end) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&to_iso(start))?;
                seq.serialize_element(&to_iso(end))?;
                seq.end()
            }
            AttrValue::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_ras_datetime;
    use serde_json::json;

    #[test]
    fn test_serialize_variants() {
        let start = parse_ras_datetime("01JAN2020 0000").unwrap();
        let end = parse_ras_datetime("02JAN2020 0000").unwrap();

        assert_eq!(AttrValue::Null.to_json(), json!(null));
        assert_eq!(AttrValue::Int(3).to_json(), json!(3));
        assert_eq!(AttrValue::Float(2.5).to_json(), json!(2.5));
        assert_eq!(AttrValue::Timestamp(start).to_json(), json!("2020-01-01T00:00:00"));
        assert_eq!(
            AttrValue::TimestampRange(start, end).to_json(),
            json!(["2020-01-01T00:00:00", "2020-01-02T00:00:00"])
        );
        assert_eq!(
            AttrValue::Array(vec![AttrValue::Bool(true), AttrValue::from("x")]).to_json(),
            json!([true, "x"])
        );
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(AttrValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(AttrValue::Float(4.5).as_i64(), None);
        assert_eq!(AttrValue::from("abc").as_str(), Some("abc"));
    }
}
