use crate::firestore::model::{FieldPath, Timestamp};
use crate::firestore::value::{server_timestamp, FirestoreValue, ValueKind};

/// A write that is computed from the field's current value instead of
/// being supplied by the caller.
///
/// Every operation has two application rules: one for the optimistic local
/// view, and one for when the backend acknowledges the write with its own
/// result.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformOperation {
    ServerTimestamp,
    ArrayUnion(Vec<FirestoreValue>),
    ArrayRemove(Vec<FirestoreValue>),
    NumericIncrement(FirestoreValue),
}

impl TransformOperation {
    /// Value shown locally until the backend acknowledges the write.
    pub fn apply_to_local_view(
        &self,
        previous_value: Option<&FirestoreValue>,
        local_write_time: Timestamp,
    ) -> FirestoreValue {
        match self {
            TransformOperation::ServerTimestamp => {
                server_timestamp(local_write_time, previous_value)
            }
            TransformOperation::ArrayUnion(elements) => array_union(previous_value, elements),
            TransformOperation::ArrayRemove(elements) => array_remove(previous_value, elements),
            TransformOperation::NumericIncrement(operand) => {
                numeric_increment(previous_value, operand)
            }
        }
    }

    /// Value after the backend acknowledged the write.
    ///
    /// Array operations are recomputed locally with the exact same rule as
    /// the local view; the other operations adopt the backend's result.
    pub fn apply_to_remote_document(
        &self,
        previous_value: Option<&FirestoreValue>,
        transform_result: Option<&FirestoreValue>,
    ) -> FirestoreValue {
        match self {
            TransformOperation::ArrayUnion(elements) => array_union(previous_value, elements),
            TransformOperation::ArrayRemove(elements) => array_remove(previous_value, elements),
            TransformOperation::ServerTimestamp | TransformOperation::NumericIncrement(_) => {
                transform_result.cloned().unwrap_or_else(FirestoreValue::null)
            }
        }
    }

    /// Value the transform should be re-applied on top of when the mutation
    /// is replayed, or `None` when replaying is idempotent.
    pub fn compute_base_value(
        &self,
        previous_value: Option<&FirestoreValue>,
    ) -> Option<FirestoreValue> {
        match self {
            TransformOperation::NumericIncrement(_) => Some(match previous_value {
                Some(value) if value.is_number() => value.clone(),
                _ => FirestoreValue::from_integer(0),
            }),
            _ => None,
        }
    }

    pub fn is_idempotent(&self) -> bool {
        !matches!(self, TransformOperation::NumericIncrement(_))
    }
}

fn coerced_elements(previous_value: Option<&FirestoreValue>) -> Vec<FirestoreValue> {
    previous_value
        .and_then(FirestoreValue::as_array)
        .map(|array| array.values().to_vec())
        .unwrap_or_default()
}

fn array_union(
    previous_value: Option<&FirestoreValue>,
    elements: &[FirestoreValue],
) -> FirestoreValue {
    let mut values = coerced_elements(previous_value);
    for element in elements {
        if !values.contains(element) {
            values.push(element.clone());
        }
    }
    FirestoreValue::from_array(values)
}

fn array_remove(
    previous_value: Option<&FirestoreValue>,
    elements: &[FirestoreValue],
) -> FirestoreValue {
    let mut values = coerced_elements(previous_value);
    values.retain(|candidate| !elements.contains(candidate));
    FirestoreValue::from_array(values)
}

/// Integer plus integer saturates at the `i64` bounds, which is how the
/// backend resolves overflow. Any double operand yields a double.
fn numeric_increment(
    previous_value: Option<&FirestoreValue>,
    operand: &FirestoreValue,
) -> FirestoreValue {
    let zero = FirestoreValue::from_integer(0);
    let base = match previous_value {
        Some(value) if value.is_number() => value,
        _ => &zero,
    };
    match (base.kind(), operand.kind()) {
        (ValueKind::Integer(base), ValueKind::Integer(delta)) => {
            FirestoreValue::from_integer(base.saturating_add(*delta))
        }
        (base, delta) => FirestoreValue::from_double(as_f64(base) + as_f64(delta)),
    }
}

fn as_f64(kind: &ValueKind) -> f64 {
    match kind {
        ValueKind::Integer(value) => *value as f64,
        ValueKind::Double(value) => *value,
        _ => 0.0,
    }
}

/// A transform bound to the field it writes.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldTransform {
    field: FieldPath,
    transform: TransformOperation,
}

impl FieldTransform {
    pub fn new(field: FieldPath, transform: TransformOperation) -> Self {
        Self { field, transform }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn transform(&self) -> &TransformOperation {
        &self.transform
    }
}
