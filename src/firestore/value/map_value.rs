use std::collections::BTreeMap;
use std::sync::Arc;

use crate::firestore::value::FirestoreValue;

/// String keyed fields, iterated in key order. Clones share storage until
/// one side is edited.
#[derive(Clone, Debug, Default)]
pub struct MapValue {
    fields: Arc<BTreeMap<String, FirestoreValue>>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut BTreeMap<String, FirestoreValue> {
        Arc::make_mut(&mut self.fields)
    }

    pub fn get(&self, key: &str) -> Option<&FirestoreValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> BTreeMap<String, FirestoreValue> {
        Arc::try_unwrap(self.fields).unwrap_or_else(|shared| (*shared).clone())
    }

    pub(crate) fn shares_storage_with(&self, other: &MapValue) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage_with(other) || self.fields == other.fields
    }
}

impl From<BTreeMap<String, FirestoreValue>> for MapValue {
    fn from(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self::new(fields)
    }
}
