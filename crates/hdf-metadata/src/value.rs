//! Raw attribute values and their coercion into [`AttrValue`].

use catalog_common::{parse_ras_datetime, parse_ras_window, AttrValue};

/// An attribute value as read from an HDF5 attribute, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    /// Fixed or variable length string, undecoded
    Bytes(Vec<u8>),
    Array(Vec<RawValue>),
    /// Any type without a direct mapping (compound, enum, reference),
    /// already rendered as text
    Other(String),
}

impl RawValue {
    pub fn text(s: &str) -> Self {
        RawValue::Bytes(s.as_bytes().to_vec())
    }
}

/// Convert a raw value into its canonical form. Never fails.
///
/// - NaN becomes `Null`
/// - strings become booleans (`True`/`False`), timestamps, timestamp ranges
///   or stay text
/// - single-element arrays collapse to their element
pub fn coerce(raw: &RawValue) -> AttrValue {
    match raw {
        RawValue::Float(v) if v.is_nan() => AttrValue::Null,
        RawValue::Float(v) => AttrValue::Float(*v),
        RawValue::Int(v) => AttrValue::Int(*v),
        RawValue::UInt(v) => match i64::try_from(*v) {
            Ok(v) => AttrValue::Int(v),
            Err(_) => AttrValue::Float(*v as f64),
        },
        RawValue::Bool(v) => AttrValue::Bool(*v),
        RawValue::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            coerce_text(text.trim_end_matches('\0'))
        }
        RawValue::Array(items) => match items.as_slice() {
            [only] => coerce(only),
            _ => AttrValue::Array(items.iter().map(coerce).collect()),
        },
        RawValue::Other(s) => AttrValue::Text(s.clone()),
    }
}

/// Classify decoded attribute text.
pub fn coerce_text(s: &str) -> AttrValue {
    match s {
        "True" => return AttrValue::Bool(true),
        "False" => return AttrValue::Bool(false),
        _ => {}
    }
    if let Some((start, end)) = parse_ras_window(s) {
        return AttrValue::TimestampRange(start, end);
    }
    if let Some(dt) = parse_ras_datetime(s) {
        return AttrValue::Timestamp(dt);
    }
    AttrValue::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_common::time::to_iso;
    use chrono::NaiveDate;

    #[test]
    fn test_nan_is_null() {
        assert_eq!(coerce(&RawValue::Float(f64::NAN)), AttrValue::Null);
        assert_eq!(
            coerce(&RawValue::Array(vec![RawValue::Float(f64::NAN)])),
            AttrValue::Null
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce(&RawValue::Int(-3)), AttrValue::Int(-3));
        assert_eq!(coerce(&RawValue::UInt(7)), AttrValue::Int(7));
        assert_eq!(coerce(&RawValue::UInt(u64::MAX)), AttrValue::Float(u64::MAX as f64));
        assert_eq!(coerce(&RawValue::Float(2.5)), AttrValue::Float(2.5));
    }

    #[test]
    fn test_booleans_from_text() {
        assert_eq!(coerce(&RawValue::text("True")), AttrValue::Bool(true));
        assert_eq!(coerce(&RawValue::text("False")), AttrValue::Bool(false));
        assert_eq!(coerce(&RawValue::text("true")), AttrValue::Text("true".into()));
    }

    #[test]
    fn test_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2019, 12, 31)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            coerce(&RawValue::text("31DEC2019 12:30:00")),
            AttrValue::Timestamp(expected)
        );
        assert_eq!(
            coerce(&RawValue::text("31Dec2019 1230")),
            AttrValue::Timestamp(expected)
        );
    }

    #[test]
    fn test_timestamp_round_trip() {
        for text in ["01JAN2020 00:00:00", "29Feb2024 23:59:59", "15Jul1999 0615"] {
            let value = coerce(&RawValue::text(text));
            let AttrValue::Timestamp(dt) = value else {
                panic!("{} did not coerce to a timestamp", text);
            };
            let iso = to_iso(&dt);
            let reparsed =
                chrono::NaiveDateTime::parse_from_str(&iso, catalog_common::time::ISO_NAIVE_FORMAT)
                    .unwrap();
            assert_eq!(reparsed, parse_ras_datetime(text).unwrap());
        }
    }

    #[test]
    fn test_window() {
        let value = coerce(&RawValue::text("01JAN2020 0000 to 05JAN2020 2400"));
        let AttrValue::TimestampRange(start, end) = value else {
            panic!("expected a range");
        };
        assert_eq!(to_iso(&start), "2020-01-01T00:00:00");
        assert_eq!(to_iso(&end), "2020-01-06T00:00:00");
    }

    #[test]
    fn test_unrecognized_text_passes_through() {
        assert_eq!(
            coerce(&RawValue::text("32JAN2020 1200")),
            AttrValue::Text("32JAN2020 1200".into())
        );
        assert_eq!(
            coerce(&RawValue::text("Kanawha 2D Area")),
            AttrValue::Text("Kanawha 2D Area".into())
        );
    }

    #[test]
    fn test_null_padding_is_stripped() {
        let raw = RawValue::Bytes(b"Elk Middle\0\0\0".to_vec());
        assert_eq!(coerce(&raw), AttrValue::Text("Elk Middle".into()));
    }

    #[test]
    fn test_singleton_arrays_collapse() {
        for raw in [
            RawValue::Int(4),
            RawValue::Float(0.5),
            RawValue::text("True"),
            RawValue::text("01JAN2020 1200"),
        ] {
            let wrapped = RawValue::Array(vec![raw.clone()]);
            assert_eq!(coerce(&wrapped), coerce(&raw));
        }
    }

    #[test]
    fn test_arrays_coerce_elementwise() {
        let raw = RawValue::Array(vec![
            RawValue::Float(1.0),
            RawValue::Float(f64::NAN),
            RawValue::text("False"),
        ]);
        assert_eq!(
            coerce(&raw),
            AttrValue::Array(vec![AttrValue::Float(1.0), AttrValue::Null, AttrValue::Bool(false)])
        );
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(coerce(&RawValue::Array(vec![])), AttrValue::Array(vec![]));
    }

    #[test]
    fn test_other_is_text() {
        assert_eq!(
            coerce(&RawValue::Other("(1, 2)".into())),
            AttrValue::Text("(1, 2)".into())
        );
    }
}
