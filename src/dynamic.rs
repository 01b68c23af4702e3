//! Dynamic values for server-defined metadata.
//!
//! Match records carry an open-ended `metadata` object whose schema belongs to
//! the server. [`DynamicValue`] is the explicit sum type those values decode
//! into, so every use site matches exhaustively instead of probing an untyped
//! blob.
//!
//! # Decoding order
//!
//! Candidates are tried in a fixed order:
//!
//! ```text
//! string → integer → float → boolean → mapping → sequence → null
//! ```
//!
//! A quoted `"1"` stays a string, a bare `1` (or `1.0`) is an integer and
//! `1.5` is a float. Anything the decoder cannot represent (raw bytes that are not UTF-8,
//! integers wider than `i64` that do not fit `f64` either) becomes
//! [`DynamicValue::Null`] instead of failing the surrounding document.
//!
//! ```rust
//! use deferlink::DynamicValue;
//!
//! let quoted: DynamicValue = serde_json::from_str(r#""1""#).unwrap();
//! let bare: DynamicValue = serde_json::from_str("1").unwrap();
//!
//! assert_eq!(quoted, DynamicValue::String("1".into()));
//! assert_eq!(bare, DynamicValue::Int(1));
//! ```
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

/// String-keyed mapping of dynamic values; ordered so encoding is stable.
pub type DynamicMap = BTreeMap<String, DynamicValue>;

/// A JSON value whose shape is decided by the server at runtime.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Map(DynamicMap),
    Seq(Vec<DynamicValue>),
    /// Explicit JSON null, and the fallback for anything undecodable.
    #[default]
    Null,
}

impl DynamicValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats as-is, integers widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Float(f) => Some(*f),
            DynamicValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DynamicMap> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Short tag naming the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DynamicValue::String(_) => "string",
            DynamicValue::Int(_) => "int",
            DynamicValue::Float(_) => "float",
            DynamicValue::Bool(_) => "bool",
            DynamicValue::Map(_) => "map",
            DynamicValue::Seq(_) => "seq",
            DynamicValue::Null => "null",
        }
    }

    /// Converts to a `serde_json::Value`. Non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            DynamicValue::String(s) => JsonValue::String(s.clone()),
            DynamicValue::Int(i) => JsonValue::from(*i),
            DynamicValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DynamicValue::Bool(b) => JsonValue::Bool(*b),
            DynamicValue::Map(m) => JsonValue::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            DynamicValue::Seq(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            DynamicValue::Null => JsonValue::Null,
        }
    }
}

impl From<JsonValue> for DynamicValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(s) => DynamicValue::String(s),
            JsonValue::Number(n) => number_to_dynamic(&n),
            JsonValue::Bool(b) => DynamicValue::Bool(b),
            JsonValue::Object(obj) => DynamicValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, DynamicValue::from(v)))
                    .collect(),
            ),
            JsonValue::Array(items) => {
                DynamicValue::Seq(items.into_iter().map(DynamicValue::from).collect())
            }
            JsonValue::Null => DynamicValue::Null,
        }
    }
}

fn number_to_dynamic(n: &serde_json::Number) -> DynamicValue {
    if let Some(i) = n.as_i64() {
        DynamicValue::Int(i)
    } else if let Some(f) = n.as_f64() {
        float_to_dynamic(f)
    } else {
        DynamicValue::Null
    }
}

/// Whole floats inside the `i64` range are integers.
fn float_to_dynamic(f: f64) -> DynamicValue {
    // 2^63 itself is out of range; i64::MIN is exact.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        DynamicValue::Int(f as i64)
    } else {
        DynamicValue::Float(f)
    }
}

impl From<&str> for DynamicValue {
    fn from(value: &str) -> Self {
        DynamicValue::String(value.to_owned())
    }
}

impl From<String> for DynamicValue {
    fn from(value: String) -> Self {
        DynamicValue::String(value)
    }
}

impl From<i64> for DynamicValue {
    fn from(value: i64) -> Self {
        DynamicValue::Int(value)
    }
}

impl From<f64> for DynamicValue {
    fn from(value: f64) -> Self {
        DynamicValue::Float(value)
    }
}

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        DynamicValue::Bool(value)
    }
}

impl Serialize for DynamicValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DynamicValue::String(s) => serializer.serialize_str(s),
            DynamicValue::Int(i) => serializer.serialize_i64(*i),
            DynamicValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            DynamicValue::Float(_) => serializer.serialize_unit(),
            DynamicValue::Bool(b) => serializer.serialize_bool(*b),
            DynamicValue::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            DynamicValue::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DynamicValue::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DynamicValueVisitor)
    }
}

/// Decodes an open-ended object field. `null` or any non-object value
/// becomes an empty map instead of failing the surrounding record.
pub(crate) fn map_or_empty<'de, D>(deserializer: D) -> Result<DynamicMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match DynamicValue::deserialize(deserializer)? {
        DynamicValue::Map(map) => map,
        _ => DynamicMap::new(),
    })
}

struct DynamicValueVisitor;

impl<'de> Visitor<'de> for DynamicValueVisitor {
    type Value = DynamicValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(DynamicValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(DynamicValue::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(match std::str::from_utf8(v) {
            Ok(s) => DynamicValue::String(s.to_owned()),
            Err(_) => DynamicValue::Null,
        })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(DynamicValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => DynamicValue::Int(i),
            Err(_) => DynamicValue::Float(v as f64),
        })
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => DynamicValue::Int(i),
            Err(_) => DynamicValue::Null,
        })
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => DynamicValue::Int(i),
            Err(_) => DynamicValue::Null,
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(float_to_dynamic(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(DynamicValue::Bool(v))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = DynamicMap::new();
        while let Some((key, value)) = access.next_entry::<String, DynamicValue>()? {
            map.insert(key, value);
        }
        Ok(DynamicValue::Map(map))
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element::<DynamicValue>()? {
            items.push(item);
        }
        Ok(DynamicValue::Seq(items))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        DynamicValue::deserialize(deserializer)
    }
}
