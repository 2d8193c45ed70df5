use std::cmp::Ordering;

use crate::firestore::model::ResourcePath;
use crate::firestore::value::server_timestamps;
use crate::firestore::value::{FirestoreValue, ReferenceValue, ValueKind};

/// Rank of each value type in the backend's cross-type sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeOrder {
    Null,
    Boolean,
    Number,
    Timestamp,
    ServerTimestamp,
    String,
    Blob,
    Reference,
    GeoPoint,
    Array,
    Map,
}

impl FirestoreValue {
    pub fn type_order(&self) -> TypeOrder {
        match self.kind() {
            ValueKind::Null => TypeOrder::Null,
            ValueKind::Boolean(_) => TypeOrder::Boolean,
            ValueKind::Integer(_) | ValueKind::Double(_) => TypeOrder::Number,
            ValueKind::Timestamp(_) => TypeOrder::Timestamp,
            ValueKind::String(_) => TypeOrder::String,
            ValueKind::Bytes(_) => TypeOrder::Blob,
            ValueKind::Reference(_) => TypeOrder::Reference,
            ValueKind::GeoPoint(_) => TypeOrder::GeoPoint,
            ValueKind::Array(_) => TypeOrder::Array,
            ValueKind::Map(_) if server_timestamps::is_server_timestamp(self) => {
                TypeOrder::ServerTimestamp
            }
            ValueKind::Map(_) => TypeOrder::Map,
        }
    }

    /// Total order used by the backend when sorting query results.
    ///
    /// Integers and doubles share one numeric domain, so `1` and `1.0`
    /// compare as equal even though they are different values.
    pub fn compare(&self, other: &FirestoreValue) -> Ordering {
        let left_order = self.type_order();
        let right_order = other.type_order();
        if left_order != right_order {
            return left_order.cmp(&right_order);
        }

        match (self.kind(), other.kind()) {
            (ValueKind::Null, ValueKind::Null) => Ordering::Equal,
            (ValueKind::Boolean(left), ValueKind::Boolean(right)) => left.cmp(right),
            (ValueKind::Integer(left), ValueKind::Integer(right)) => left.cmp(right),
            (ValueKind::Double(left), ValueKind::Double(right)) => compare_doubles(*left, *right),
            (ValueKind::Integer(left), ValueKind::Double(right)) => {
                compare_integer_to_double(*left, *right)
            }
            (ValueKind::Double(left), ValueKind::Integer(right)) => {
                compare_integer_to_double(*right, *left).reverse()
            }
            (ValueKind::Timestamp(left), ValueKind::Timestamp(right)) => left.cmp(right),
            (ValueKind::String(left), ValueKind::String(right)) => {
                left.as_bytes().cmp(right.as_bytes())
            }
            (ValueKind::Bytes(left), ValueKind::Bytes(right)) => left.cmp(right),
            (ValueKind::Reference(left), ValueKind::Reference(right)) => {
                compare_references(left, right)
            }
            (ValueKind::GeoPoint(left), ValueKind::GeoPoint(right)) => left.compare(right),
            (ValueKind::Array(left), ValueKind::Array(right)) => {
                compare_sequences(left.values(), right.values())
            }
            (ValueKind::Map(_), ValueKind::Map(_))
                if left_order == TypeOrder::ServerTimestamp =>
            {
                server_timestamps::get_local_write_time(self)
                    .cmp(&server_timestamps::get_local_write_time(other))
            }
            (ValueKind::Map(left), ValueKind::Map(right)) => {
                let mut left_entries = left.fields().iter();
                let mut right_entries = right.fields().iter();
                loop {
                    match (left_entries.next(), right_entries.next()) {
                        (Some((left_key, left_value)), Some((right_key, right_value))) => {
                            let ordering = left_key
                                .as_bytes()
                                .cmp(right_key.as_bytes())
                                .then_with(|| left_value.compare(right_value));
                            if ordering != Ordering::Equal {
                                return ordering;
                            }
                        }
                        (Some(_), None) => return Ordering::Greater,
                        (None, Some(_)) => return Ordering::Less,
                        (None, None) => return Ordering::Equal,
                    }
                }
            }
            // Same type order implies the same variant pairing handled above.
            _ => Ordering::Equal,
        }
    }
}

fn compare_sequences(left: &[FirestoreValue], right: &[FirestoreValue]) -> Ordering {
    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = l.compare(r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

fn compare_references(left: &ReferenceValue, right: &ReferenceValue) -> Ordering {
    let left_db = left.database_id();
    let right_db = right.database_id();
    left_db
        .project_id()
        .as_bytes()
        .cmp(right_db.project_id().as_bytes())
        .then_with(|| left_db.database().as_bytes().cmp(right_db.database().as_bytes()))
        .then_with(|| ResourcePath::comparator(left.key().path(), right.key().path()))
}

/// NaN sorts before every other number; `-0.0` equals `0.0`.
fn compare_doubles(left: f64, right: f64) -> Ordering {
    match left.partial_cmp(&right) {
        Some(ordering) => ordering,
        None => match (left.is_nan(), right.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            _ => Ordering::Greater,
        },
    }
}

/// Exact comparison without rounding the integer through `f64`.
fn compare_integer_to_double(integer: i64, double: f64) -> Ordering {
    // 2^63 is exactly representable as f64.
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return Ordering::Greater;
    }
    if double >= TWO_POW_63 {
        return Ordering::Less;
    }
    if double < -TWO_POW_63 {
        return Ordering::Greater;
    }

    let truncated = double.trunc();
    match integer.cmp(&(truncated as i64)) {
        Ordering::Equal => {
            let fraction = double - truncated;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ordering => ordering,
    }
}
