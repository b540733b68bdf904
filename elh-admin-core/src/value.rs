//! Typed document field values and their Firestore REST JSON encoding.
//!
//! Firestore's REST surface wraps every field in a single-key object naming
//! its type (`{"stringValue": "x"}`, `{"integerValue": "3"}`, ...). This
//! module keeps that wire shape out of the rest of the crate: content types
//! build [`Fields`] maps, and only the store client calls [`encode_fields`] /
//! [`decode_fields`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value as Json};
use thiserror::Error;

/// Field name → value map of a single document (or of a nested map value).
pub type Fields = BTreeMap<String, Value>;

/// A single field value as stored in the document database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Map(Fields),
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("expected a typed value object, got: {0}")]
    NotAnObject(String),
    #[error("unsupported value type `{0}`")]
    UnsupportedType(String),
    #[error("invalid {kind} payload: {raw}")]
    Invalid { kind: &'static str, raw: String },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Encodes into the Firestore REST `Value` JSON object.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => json!({ "nullValue": null }),
            Value::Boolean(b) => json!({ "booleanValue": b }),
            // int64 travels as a decimal string on the wire
            Value::Integer(i) => json!({ "integerValue": i.to_string() }),
            Value::Double(d) => json!({ "doubleValue": d }),
            Value::String(s) => json!({ "stringValue": s }),
            Value::Timestamp(ts) => json!({
                "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }),
            Value::Array(values) => json!({
                "arrayValue": { "values": values.iter().map(Value::to_json).collect::<Vec<_>>() }
            }),
            Value::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
        }
    }

    /// Decodes a Firestore REST `Value` JSON object.
    pub fn from_json(json: &Json) -> Result<Self, ValueError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ValueError::NotAnObject(json.to_string()))?;
        let (kind, payload) = obj
            .iter()
            .next()
            .ok_or_else(|| ValueError::NotAnObject(json.to_string()))?;

        match kind.as_str() {
            "nullValue" => Ok(Value::Null),
            "booleanValue" => payload
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| invalid("booleanValue", payload)),
            "integerValue" => {
                // Usually a string, but tolerate a bare number.
                let parsed = match payload {
                    Json::String(s) => s.parse::<i64>().ok(),
                    Json::Number(n) => n.as_i64(),
                    _ => None,
                };
                parsed
                    .map(Value::Integer)
                    .ok_or_else(|| invalid("integerValue", payload))
            }
            "doubleValue" => payload
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| invalid("doubleValue", payload)),
            "stringValue" | "referenceValue" | "bytesValue" => payload
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| invalid("stringValue", payload)),
            "timestampValue" => payload
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .ok_or_else(|| invalid("timestampValue", payload)),
            "arrayValue" => {
                let values = match payload.get("values") {
                    Some(Json::Array(items)) => items
                        .iter()
                        .map(Value::from_json)
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => Vec::new(),
                };
                Ok(Value::Array(values))
            }
            "mapValue" => Ok(Value::Map(decode_fields(
                payload.get("fields").unwrap_or(&Json::Null),
            )?)),
            "geoPointValue" => {
                let mut fields = Fields::new();
                for axis in ["latitude", "longitude"] {
                    let coord = payload.get(axis).and_then(Json::as_f64).unwrap_or_default();
                    fields.insert(axis.to_string(), Value::Double(coord));
                }
                Ok(Value::Map(fields))
            }
            other => Err(ValueError::UnsupportedType(other.to_string())),
        }
    }
}

fn invalid(kind: &'static str, payload: &Json) -> ValueError {
    ValueError::Invalid {
        kind,
        raw: payload.to_string(),
    }
}

/// Encodes a field map into the REST `fields` object.
pub fn encode_fields(fields: &Fields) -> Json {
    let map: Map<String, Json> = fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Json::Object(map)
}

/// Decodes a REST `fields` object. A missing or null object is an empty map.
pub fn decode_fields(json: &Json) -> Result<Fields, ValueError> {
    match json {
        Json::Null => Ok(Fields::new()),
        Json::Object(map) => map
            .iter()
            .map(|(name, raw)| Ok((name.clone(), Value::from_json(raw)?)))
            .collect(),
        other => Err(ValueError::NotAnObject(other.to_string())),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Value::String(s) => write!(f, "'{s}'")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Map(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{name}': {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::Array(items.into_iter().map(Value::String).collect())
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Map(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integers_are_encoded_as_strings() {
        assert_eq!(Value::Integer(12).to_json(), json!({ "integerValue": "12" }));
    }

    #[test]
    fn decodes_nested_document_fields() {
        let raw = json!({
            "title": { "stringValue": "Tides" },
            "level": { "integerValue": "7" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "sea" }] } },
            "empty": { "arrayValue": {} },
            "correctAnswer": { "mapValue": { "fields": { "choiceId": { "stringValue": "B" } } } },
            "publishedAt": { "timestampValue": "2024-05-01T00:00:00Z" }
        });
        let fields = decode_fields(&raw).expect("fields decode");

        assert_eq!(fields["title"].as_str(), Some("Tides"));
        assert_eq!(fields["level"].as_i64(), Some(7));
        assert_eq!(fields["tags"], Value::from(vec!["sea".to_string()]));
        assert_eq!(fields["empty"], Value::Array(vec![]));
        assert_eq!(
            fields["correctAnswer"].as_map().and_then(|m| m["choiceId"].as_str()),
            Some("B")
        );
        assert_eq!(
            fields["publishedAt"],
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_unknown_value_kinds() {
        let err = Value::from_json(&json!({ "vectorValue": {} })).unwrap_err();
        assert!(matches!(err, ValueError::UnsupportedType(k) if k == "vectorValue"));
    }

    #[test]
    fn display_matches_cli_listing_format() {
        let tags = Value::from(vec!["history".to_string(), "science".to_string()]);
        assert_eq!(tags.to_string(), "['history', 'science']");
        assert_eq!(Value::Null.to_string(), "None");
    }
}
