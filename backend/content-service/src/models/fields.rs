/// Static field schema and typed field values
///
/// The cache stores items as flat string hashes and the store builds SQL from
/// field names, so each kind declares its persisted fields with a [`FieldType`].
use super::Content;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    TextList,
    SmallInt,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("missing field: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FieldError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FieldError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A value for one schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    TextList(Vec<String>),
    SmallInt(i16),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::TextList(_) => FieldType::TextList,
            FieldValue::SmallInt(_) => FieldType::SmallInt,
            FieldValue::Timestamp(_) => FieldType::Timestamp,
        }
    }

    /// Convert a JSON value into the field's declared type.
    pub fn from_json(field: &str, ty: FieldType, value: &Value) -> Result<Self, FieldError> {
        match ty {
            FieldType::Text => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(|| FieldError::invalid(field, "expected a string")),
            FieldType::TextList => {
                let items = value
                    .as_array()
                    .ok_or_else(|| FieldError::invalid(field, "expected an array of strings"))?;
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| FieldError::invalid(field, "expected an array of strings"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::TextList)
            }
            FieldType::SmallInt => value
                .as_i64()
                .and_then(|n| i16::try_from(n).ok())
                .map(FieldValue::SmallInt)
                .ok_or_else(|| FieldError::invalid(field, "expected a small integer")),
            FieldType::Timestamp => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| FieldError::invalid(field, "expected an RFC 3339 timestamp"))?;
                Self::decode(field, ty, raw)
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::TextList(items) => Value::from(items.clone()),
            FieldValue::SmallInt(n) => Value::from(*n),
            FieldValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        }
    }

    /// Cache hash encoding: text raw, lists as a JSON array, integers in
    /// decimal, timestamps as RFC 3339.
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::TextList(items) => Value::from(items.clone()).to_string(),
            FieldValue::SmallInt(n) => n.to_string(),
            FieldValue::Timestamp(ts) => ts.to_rfc3339(),
        }
    }

    /// Inverse of [`FieldValue::encode`].
    pub fn decode(field: &str, ty: FieldType, raw: &str) -> Result<Self, FieldError> {
        match ty {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldType::TextList => serde_json::from_str::<Vec<String>>(raw)
                .map(FieldValue::TextList)
                .map_err(|e| FieldError::invalid(field, e.to_string())),
            FieldType::SmallInt => raw
                .trim()
                .parse::<i16>()
                .map(FieldValue::SmallInt)
                .map_err(|e| FieldError::invalid(field, e.to_string())),
            FieldType::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
                .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| FieldError::invalid(field, e.to_string())),
        }
    }
}

/// Every schema field of `item`, in schema order.
pub fn item_fields<T: Content>(item: &T) -> Result<Vec<(&'static str, FieldValue)>, FieldError> {
    let value = serde_json::to_value(item)?;
    let object = value
        .as_object()
        .ok_or_else(|| FieldError::invalid(T::TABLE, "item must serialize to an object"))?;

    T::FIELDS
        .iter()
        .map(|spec| {
            let raw = object.get(spec.name).ok_or(FieldError::Missing(spec.name))?;
            Ok((spec.name, FieldValue::from_json(spec.name, spec.ty, raw)?))
        })
        .collect()
}

/// Flatten an item into a cache hash record.
pub fn encode_record<T: Content>(item: &T) -> Result<Vec<(&'static str, String)>, FieldError> {
    Ok(item_fields(item)?
        .into_iter()
        .map(|(name, value)| (name, value.encode()))
        .collect())
}

/// Rebuild an item from a cache hash record.
pub fn decode_record<T: Content>(record: &HashMap<String, String>) -> Result<T, FieldError> {
    let mut object = Map::new();
    for spec in T::FIELDS {
        let raw = record.get(spec.name).ok_or(FieldError::Missing(spec.name))?;
        let value = FieldValue::decode(spec.name, spec.ty, raw)?;
        object.insert(spec.name.to_string(), value.to_json());
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}
