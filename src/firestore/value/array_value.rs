use std::sync::Arc;

use crate::firestore::value::FirestoreValue;

/// Ordered list of values. Clones share storage until one side is edited.
#[derive(Clone, Debug, Default)]
pub struct ArrayValue {
    values: Arc<Vec<FirestoreValue>>,
}

impl ArrayValue {
    pub fn new(values: Vec<FirestoreValue>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn values(&self) -> &[FirestoreValue] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Vec<FirestoreValue> {
        Arc::make_mut(&mut self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Membership by value equality, not by comparison order.
    pub fn contains(&self, needle: &FirestoreValue) -> bool {
        self.values.iter().any(|value| value == needle)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FirestoreValue> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<FirestoreValue> {
        Arc::try_unwrap(self.values).unwrap_or_else(|shared| (*shared).clone())
    }

    pub(crate) fn shares_storage_with(&self, other: &ArrayValue) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage_with(other) || self.values == other.values
    }
}

impl From<Vec<FirestoreValue>> for ArrayValue {
    fn from(values: Vec<FirestoreValue>) -> Self {
        Self::new(values)
    }
}
