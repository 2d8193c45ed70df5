use std::collections::BTreeMap;

use crate::firestore::model::{DatabaseId, DocumentKey, GeoPoint, Timestamp};
use crate::firestore::value::server_timestamps;
use crate::firestore::value::{ArrayValue, BytesValue, MapValue};

/// A single typed value as stored by the backend.
///
/// Values are immutable once built; the array and map payloads share their
/// storage between clones so passing values around is cheap.
#[derive(Clone, Debug)]
pub struct FirestoreValue {
    kind: ValueKind,
}

#[derive(Clone, Debug)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    Bytes(BytesValue),
    Reference(ReferenceValue),
    GeoPoint(GeoPoint),
    Array(ArrayValue),
    Map(MapValue),
}

/// Pointer to another document, possibly in another database.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceValue {
    database_id: DatabaseId,
    key: DocumentKey,
}

impl ReferenceValue {
    pub fn new(database_id: DatabaseId, key: DocumentKey) -> Self {
        Self { database_id, key }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// `projects/{project}/databases/{database}/documents/{path}`
    pub fn resource_name(&self) -> String {
        format!(
            "{}/documents/{}",
            self.database_id.database_name(),
            self.key.path().canonical_string()
        )
    }
}

impl FirestoreValue {
    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_timestamp(value: Timestamp) -> Self {
        Self {
            kind: ValueKind::Timestamp(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_bytes(value: BytesValue) -> Self {
        Self {
            kind: ValueKind::Bytes(value),
        }
    }

    pub fn from_reference(value: ReferenceValue) -> Self {
        Self {
            kind: ValueKind::Reference(value),
        }
    }

    pub fn reference(database_id: DatabaseId, key: DocumentKey) -> Self {
        Self::from_reference(ReferenceValue::new(database_id, key))
    }

    pub fn from_geo_point(value: GeoPoint) -> Self {
        Self {
            kind: ValueKind::GeoPoint(value),
        }
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        Self::from_array_value(ArrayValue::new(values))
    }

    pub fn from_array_value(value: ArrayValue) -> Self {
        Self {
            kind: ValueKind::Array(value),
        }
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        Self::from_map_value(MapValue::new(map))
    }

    pub fn from_map_value(value: MapValue) -> Self {
        Self {
            kind: ValueKind::Map(value),
        }
    }

    pub fn empty_map() -> Self {
        Self::from_map_value(MapValue::empty())
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, ValueKind::Integer(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self.kind, ValueKind::Double(_))
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_double()
    }

    pub fn is_nan(&self) -> bool {
        matches!(self.kind, ValueKind::Double(value) if value.is_nan())
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    /// True for plain maps only; pending server timestamps are excluded.
    pub fn is_map(&self) -> bool {
        matches!(self.kind, ValueKind::Map(_)) && !server_timestamps::is_server_timestamp(self)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Double(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self.kind {
            ValueKind::Timestamp(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match &self.kind {
            ValueKind::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match &self.kind {
            ValueKind::Map(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn as_map_mut(&mut self) -> Option<&mut MapValue> {
        match &mut self.kind {
            ValueKind::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Turns a non-map value into an empty map, then exposes the map.
    pub(crate) fn ensure_map_mut(&mut self) -> &mut MapValue {
        if !matches!(self.kind, ValueKind::Map(_)) {
            self.kind = ValueKind::Map(MapValue::empty());
        }
        let ValueKind::Map(map) = &mut self.kind else {
            unreachable!("value was just replaced with a map")
        };
        map
    }

    /// Rough in-memory footprint used for cache accounting.
    pub fn estimate_byte_size(&self) -> usize {
        match &self.kind {
            ValueKind::Null | ValueKind::Boolean(_) => 4,
            ValueKind::Integer(_) | ValueKind::Double(_) => 8,
            ValueKind::Timestamp(_) | ValueKind::GeoPoint(_) => 16,
            ValueKind::String(value) => value.len() * 2,
            ValueKind::Bytes(value) => value.len(),
            ValueKind::Reference(value) => value.resource_name().len(),
            ValueKind::Array(array) => array.iter().map(Self::estimate_byte_size).sum(),
            ValueKind::Map(_) if server_timestamps::is_server_timestamp(self) => {
                16 + server_timestamps::get_previous_value(self)
                    .map(Self::estimate_byte_size)
                    .unwrap_or(0)
            }
            ValueKind::Map(map) => map
                .fields()
                .iter()
                .map(|(key, value)| key.len() + value.estimate_byte_size())
                .sum(),
        }
    }

    /// Deterministic string form, stable across equal values.
    pub fn canonical_id(&self) -> String {
        let mut out = String::new();
        self.write_canonical_id(&mut out);
        out
    }

    fn write_canonical_id(&self, out: &mut String) {
        match &self.kind {
            ValueKind::Null => out.push_str("null"),
            ValueKind::Boolean(value) => out.push_str(if *value { "true" } else { "false" }),
            ValueKind::Integer(value) => out.push_str(&value.to_string()),
            ValueKind::Double(value) => out.push_str(&format_double(*value)),
            ValueKind::Timestamp(value) => {
                out.push_str(&format!("time({},{})", value.seconds, value.nanos))
            }
            ValueKind::String(value) => out.push_str(value),
            ValueKind::Bytes(value) => out.push_str(&value.to_base64()),
            ValueKind::Reference(value) => out.push_str(&value.key().path().canonical_string()),
            ValueKind::GeoPoint(value) => out.push_str(&format!(
                "geo({},{})",
                format_double(value.latitude()),
                format_double(value.longitude())
            )),
            ValueKind::Array(array) => {
                out.push('[');
                for (index, value) in array.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    value.write_canonical_id(out);
                }
                out.push(']');
            }
            ValueKind::Map(map) => {
                out.push('{');
                for (index, (key, value)) in map.fields().iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    out.push_str(key);
                    out.push(':');
                    value.write_canonical_id(out);
                }
                out.push('}');
            }
        }
    }
}

pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn doubles_equal(left: f64, right: f64) -> bool {
    if left.is_nan() || right.is_nan() {
        return left.is_nan() && right.is_nan();
    }
    left == right && left.is_sign_negative() == right.is_sign_negative()
}

impl PartialEq for FirestoreValue {
    /// Strict identity: `1` and `1.0` compare as equal but are not equal
    /// values, while `NaN` equals itself.
    fn eq(&self, other: &Self) -> bool {
        let left_pending = server_timestamps::is_server_timestamp(self);
        let right_pending = server_timestamps::is_server_timestamp(other);
        if left_pending || right_pending {
            return left_pending
                && right_pending
                && server_timestamps::get_local_write_time(self)
                    == server_timestamps::get_local_write_time(other);
        }

        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Boolean(left), ValueKind::Boolean(right)) => left == right,
            (ValueKind::Integer(left), ValueKind::Integer(right)) => left == right,
            (ValueKind::Double(left), ValueKind::Double(right)) => doubles_equal(*left, *right),
            (ValueKind::Timestamp(left), ValueKind::Timestamp(right)) => left == right,
            (ValueKind::String(left), ValueKind::String(right)) => left == right,
            (ValueKind::Bytes(left), ValueKind::Bytes(right)) => left == right,
            (ValueKind::Reference(left), ValueKind::Reference(right)) => left == right,
            (ValueKind::GeoPoint(left), ValueKind::GeoPoint(right)) => {
                doubles_equal(left.latitude(), right.latitude())
                    && doubles_equal(left.longitude(), right.longitude())
            }
            (ValueKind::Array(left), ValueKind::Array(right)) => left == right,
            (ValueKind::Map(left), ValueKind::Map(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for FirestoreValue {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::test_support::{array, map, reference};

    #[test]
    fn builds_basic_values() {
        let v = FirestoreValue::from_string("hello");
        match v.kind() {
            ValueKind::String(value) => assert_eq!(value, "hello"),
            _ => panic!("unexpected kind"),
        }
    }

    #[test]
    fn integer_and_double_are_different_values() {
        assert_ne!(FirestoreValue::from_integer(1), FirestoreValue::from_double(1.0));
        assert_eq!(FirestoreValue::from_double(1.0), FirestoreValue::from_double(1.0));
    }

    #[test]
    fn nan_equals_nan_and_zero_signs_differ() {
        assert_eq!(
            FirestoreValue::from_double(f64::NAN),
            FirestoreValue::from_double(f64::NAN)
        );
        assert_ne!(
            FirestoreValue::from_double(0.0),
            FirestoreValue::from_double(-0.0)
        );
    }

    #[test]
    fn estimates_sizes() {
        assert_eq!(FirestoreValue::null().estimate_byte_size(), 4);
        assert_eq!(FirestoreValue::from_integer(3).estimate_byte_size(), 8);
        assert_eq!(FirestoreValue::from_string("abc").estimate_byte_size(), 6);
        let nested = map(vec![("ab", array(vec![FirestoreValue::from_bool(true)]))]);
        assert_eq!(nested.estimate_byte_size(), 2 + 4);
        let reference = reference("project", "coll/doc");
        assert_eq!(
            reference.estimate_byte_size(),
            "projects/project/databases/(default)/documents/coll/doc".len()
        );
    }

    #[test]
    fn canonical_ids() {
        let value = map(vec![
            ("b", array(vec![FirestoreValue::from_integer(1), FirestoreValue::null()])),
            ("a", FirestoreValue::from_double(f64::INFINITY)),
        ]);
        assert_eq!(value.canonical_id(), "{a:Infinity,b:[1,null]}");
        assert_eq!(
            FirestoreValue::from_timestamp(Timestamp::new(1, 2)).canonical_id(),
            "time(1,2)"
        );
        assert_eq!(reference("p", "coll/doc").canonical_id(), "coll/doc");
        assert_eq!(FirestoreValue::from_double(1.5).canonical_id(), "1.5");
    }
}
