//! Conversions between Rust field types and [`FieldValue`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::{FieldValue, Timestamp, ValueType};
use crate::codec::CodecError;

/// Converts a value into a [`FieldValue`]. Implemented for every field type
/// and for borrowed literals such as `&str`.
pub trait IntoFieldValue {
    fn to_field_value(&self) -> FieldValue;
}

/// A type that can be stored in an entity field.
pub trait FieldType: IntoFieldValue + Sized {
    const VALUE_TYPE: ValueType;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError>;
}

fn mismatch(expected: ValueType, found: &FieldValue) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

fn out_of_range(expected: ValueType, value: impl ToString) -> CodecError {
    CodecError::OutOfRange {
        expected,
        value: value.to_string(),
    }
}

macro_rules! signed_field {
    ($($ty:ty => $vt:ident),* $(,)?) => {$(
        impl IntoFieldValue for $ty {
            fn to_field_value(&self) -> FieldValue {
                FieldValue::Int(i64::from(*self))
            }
        }

        impl FieldType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$vt;

            fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
                match value {
                    FieldValue::Int(n) => {
                        <$ty>::try_from(n).map_err(|_| out_of_range(Self::VALUE_TYPE, n))
                    }
                    FieldValue::UInt(n) => {
                        <$ty>::try_from(n).map_err(|_| out_of_range(Self::VALUE_TYPE, n))
                    }
                    other => Err(mismatch(Self::VALUE_TYPE, &other)),
                }
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty => $vt:ident),* $(,)?) => {$(
        impl IntoFieldValue for $ty {
            fn to_field_value(&self) -> FieldValue {
                FieldValue::UInt(u64::from(*self))
            }
        }

        impl FieldType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$vt;

            fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
                match value {
                    FieldValue::UInt(n) => {
                        <$ty>::try_from(n).map_err(|_| out_of_range(Self::VALUE_TYPE, n))
                    }
                    FieldValue::Int(n) => {
                        <$ty>::try_from(n).map_err(|_| out_of_range(Self::VALUE_TYPE, n))
                    }
                    other => Err(mismatch(Self::VALUE_TYPE, &other)),
                }
            }
        }
    )*};
}

signed_field!(i16 => Int16, i32 => Int32, i64 => Int64);
unsigned_field!(u8 => Byte, u16 => UInt16, u32 => UInt32, u64 => UInt64);

impl IntoFieldValue for FieldValue {
    fn to_field_value(&self) -> FieldValue {
        self.clone()
    }
}

impl IntoFieldValue for f64 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }
}

impl FieldType for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Float(f) => Ok(f),
            FieldValue::Int(n) => Ok(n as f64),
            FieldValue::UInt(n) => Ok(n as f64),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl IntoFieldValue for f32 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(f64::from(*self))
    }
}

impl FieldType for f32 {
    const VALUE_TYPE: ValueType = ValueType::Single;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        f64::from_field_value(value).map(|f| f as f32)
    }
}

impl IntoFieldValue for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }
}

impl FieldType for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Bool(b) => Ok(b),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl IntoFieldValue for char {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Char(*self)
    }
}

impl FieldType for char {
    const VALUE_TYPE: ValueType = ValueType::Char;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Char(c) => Ok(c),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl IntoFieldValue for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Str(self.clone())
    }
}

impl IntoFieldValue for &str {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Str((*self).to_string())
    }
}

impl FieldType for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Str(s) => Ok(s),
            FieldValue::Null => Ok(String::new()),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl IntoFieldValue for DateTime<Utc> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(Timestamp::from_utc(self))
    }
}

impl FieldType for DateTime<Utc> {
    const VALUE_TYPE: ValueType = ValueType::DateTime;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::DateTime(ts) => ts.to_utc(),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl IntoFieldValue for NaiveDateTime {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(Timestamp::from_local(self))
    }
}

impl FieldType for NaiveDateTime {
    const VALUE_TYPE: ValueType = ValueType::DateTime;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::DateTime(ts) => ts.to_naive(),
            other => Err(mismatch(Self::VALUE_TYPE, &other)),
        }
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Null,
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

/// Reads a composite field as a JSON value. Used by `#[branch(json)]` fields.
pub fn json_value<V: Serialize>(value: &V) -> Result<FieldValue, CodecError> {
    serde_json::to_value(value)
        .map(FieldValue::Json)
        .map_err(|e| CodecError::Json(e.to_string()))
}

/// Restores a composite field from a JSON value.
pub fn json_field<V: DeserializeOwned>(value: FieldValue) -> Result<V, CodecError> {
    let json = match value {
        FieldValue::Json(json) => json,
        FieldValue::Null => serde_json::Value::Null,
        other => return Err(mismatch(ValueType::Composite, &other)),
    };
    serde_json::from_value(json).map_err(|e| CodecError::Json(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integers_check_range() {
        assert_eq!(u8::from_field_value(FieldValue::UInt(200)), Ok(200));
        assert!(matches!(
            u8::from_field_value(FieldValue::UInt(300)),
            Err(CodecError::OutOfRange { .. })
        ));
        assert_eq!(i16::from_field_value(FieldValue::Int(-12)), Ok(-12));
        assert!(matches!(
            u32::from_field_value(FieldValue::Int(-1)),
            Err(CodecError::OutOfRange { .. })
        ));
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(f64::from_field_value(FieldValue::Int(10)), Ok(10.0));
        assert_eq!(f32::from_field_value(FieldValue::Float(2.5)), Ok(2.5));
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i32>::None.to_field_value(), FieldValue::Null);
        assert_eq!(Option::<i32>::from_field_value(FieldValue::Null), Ok(None));
        assert_eq!(
            Option::<i32>::from_field_value(FieldValue::Int(7)),
            Ok(Some(7))
        );
    }

    #[test]
    fn utc_datetime_round_trip() {
        let dt = Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap();
        let value = dt.to_field_value();
        assert_eq!(DateTime::<Utc>::from_field_value(value), Ok(dt));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let err = bool::from_field_value(FieldValue::Str("yes".into())).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: ValueType::Boolean,
                found: "string"
            }
        );
    }

    #[test]
    fn json_round_trip() {
        let value = json_value(&vec![1, 2, 3]).unwrap();
        let back: Vec<i32> = json_field(value).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
