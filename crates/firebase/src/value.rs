//! # Firestore ⇄ Snapshot Value Encoding
//!
//! Snapshot records are plain JSON. Firestore has a few value types JSON
//! lacks; they are encoded like the JavaScript admin SDK serializes them, so
//! snapshots written by older tooling load unchanged:
//!
//! - timestamp → `{"_seconds": i64, "_nanoseconds": i32}`, written back as a timestamp
//! - geo point → `{"_latitude": f64, "_longitude": f64}`, written back as a map
//! - reference → the document path as a string
//! - bytes → standard base64 string
//! - NaN and ±infinity doubles → `{"_double": "NaN" | "Infinity" | "-Infinity"}`,
//!   written back as doubles

use base64::Engine;
use chrono::{TimeZone, Utc};
use firestore::{FirestoreDocument, FirestoreTimestamp};
use gcloud_sdk::google::firestore::v1 as firestore_v1;
use missao_sync::Record;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

const SECONDS_KEY: &str = "_seconds";
const NANOS_KEY: &str = "_nanoseconds";
const DOUBLE_KEY: &str = "_double";

/// Splits a Firestore document into its record key and JSON fields.
pub fn document_to_record(doc: &FirestoreDocument) -> (String, Record) {
    let key = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let fields = doc
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), firestore_value_to_json(value)))
        .collect();
    (key, fields)
}

/// Converts one Firestore value into its snapshot JSON form.
pub fn firestore_value_to_json(value: &firestore_v1::Value) -> Value {
    use firestore_v1::value::ValueType;

    match &value.value_type {
        Some(ValueType::NullValue(_)) | None => Value::Null,
        Some(ValueType::BooleanValue(b)) => Value::Bool(*b),
        Some(ValueType::IntegerValue(i)) => Value::Number((*i).into()),
        Some(ValueType::DoubleValue(d)) => json_f64(*d),
        Some(ValueType::StringValue(s)) => Value::String(s.clone()),
        Some(ValueType::TimestampValue(ts)) => encode_timestamp(ts.seconds, ts.nanos),
        Some(ValueType::BytesValue(bytes)) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        Some(ValueType::ReferenceValue(path)) => Value::String(path.clone()),
        Some(ValueType::GeoPointValue(point)) => {
            let mut map = Map::new();
            map.insert("_latitude".to_string(), json_f64(point.latitude));
            map.insert("_longitude".to_string(), json_f64(point.longitude));
            Value::Object(map)
        }
        Some(ValueType::ArrayValue(array)) => {
            Value::Array(array.values.iter().map(firestore_value_to_json).collect())
        }
        Some(ValueType::MapValue(map)) => Value::Object(
            map.fields
                .iter()
                .map(|(name, value)| (name.clone(), firestore_value_to_json(value)))
                .collect(),
        ),
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

fn json_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| {
            let name = if value.is_nan() {
                "NaN"
            } else if value > 0.0 {
                "Infinity"
            } else {
                "-Infinity"
            };
            let mut map = Map::new();
            map.insert(DOUBLE_KEY.to_string(), Value::String(name.to_string()));
            Value::Object(map)
        })
}

/// Recognizes the encoding of a double JSON cannot hold.
pub fn decode_special_double(map: &Map<String, Value>) -> Option<f64> {
    if map.len() != 1 {
        return None;
    }
    match map.get(DOUBLE_KEY)?.as_str()? {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// True for maps that stand for a single native Firestore value rather than
/// a nested map.
pub fn is_native_encoding(map: &Map<String, Value>) -> bool {
    decode_timestamp(map).is_some() || decode_special_double(map).is_some()
}

fn encode_timestamp(seconds: i64, nanos: i32) -> Value {
    let mut map = Map::new();
    map.insert(SECONDS_KEY.to_string(), Value::Number(seconds.into()));
    map.insert(NANOS_KEY.to_string(), Value::Number(nanos.into()));
    Value::Object(map)
}

/// Recognizes the timestamp encoding: an object with exactly the two
/// timestamp keys, both integers, describing a representable instant.
pub fn decode_timestamp(map: &Map<String, Value>) -> Option<FirestoreTimestamp> {
    if map.len() != 2 {
        return None;
    }
    let seconds = map.get(SECONDS_KEY)?.as_i64()?;
    let nanos = u32::try_from(map.get(NANOS_KEY)?.as_i64()?).ok()?;
    if nanos >= 1_000_000_000 {
        return None;
    }
    Utc.timestamp_opt(seconds, nanos)
        .single()
        .map(FirestoreTimestamp)
}

/// Serializes a record for a Firestore write, turning encoded timestamps back
/// into native timestamps.
pub struct OutboundRecord<'a>(pub &'a Record);

impl Serialize for OutboundRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_map(self.0, serializer)
    }
}

struct OutboundValue<'a>(&'a Value);

impl Serialize for OutboundValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                if let Some(timestamp) = decode_timestamp(map) {
                    timestamp.serialize(serializer)
                } else if let Some(double) = decode_special_double(map) {
                    serializer.serialize_f64(double)
                } else {
                    serialize_map(map, serializer)
                }
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&OutboundValue(item))?;
                }
                seq.end()
            }
            other => other.serialize(serializer),
        }
    }
}

fn serialize_map<S: Serializer>(map: &Map<String, Value>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (name, value) in map {
        out.serialize_entry(name, &OutboundValue(value))?;
    }
    out.end()
}
