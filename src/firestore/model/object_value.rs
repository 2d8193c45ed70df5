use std::collections::BTreeMap;

use crate::firestore::model::{FieldMask, FieldPath};
use crate::firestore::value::{FirestoreValue, MapValue};

/// A document's fields, addressable by [`FieldPath`].
///
/// Edits copy only the maps along the edited path; untouched subtrees stay
/// shared with every earlier clone, so a snapshot taken before an edit keeps
/// its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectValue {
    value: FirestoreValue,
}

impl Default for ObjectValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl ObjectValue {
    pub fn empty() -> Self {
        Self {
            value: FirestoreValue::empty_map(),
        }
    }

    pub fn new(map: MapValue) -> Self {
        Self {
            value: FirestoreValue::from_map_value(map),
        }
    }

    pub fn from_map(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self::new(MapValue::new(fields))
    }

    /// Wraps `value` when it is a map.
    pub fn from_value(value: FirestoreValue) -> Option<Self> {
        value.as_map()?;
        Some(Self { value })
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }

    pub fn into_value(self) -> FirestoreValue {
        self.value
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        static EMPTY: BTreeMap<String, FirestoreValue> = BTreeMap::new();
        self.value.as_map().map(MapValue::fields).unwrap_or(&EMPTY)
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Value at `path`, or `None` when a segment is missing or crosses a
    /// non-map value. The empty path yields the whole object.
    pub fn field(&self, path: &FieldPath) -> Option<&FirestoreValue> {
        let mut current = &self.value;
        for segment in path.segments() {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Writes `value` at `path`, replacing any non-map value found on the way.
    pub fn set(&mut self, path: &FieldPath, value: FirestoreValue) {
        let Some((last, parents)) = path.segments().split_last() else {
            if value.as_map().is_some() {
                self.value = value;
            }
            return;
        };

        let mut current = self.value.ensure_map_mut();
        for segment in parents {
            let entry = current
                .fields_mut()
                .entry(segment.clone())
                .or_insert_with(FirestoreValue::empty_map);
            current = entry.ensure_map_mut();
        }
        current.fields_mut().insert(last.clone(), value);
    }

    /// Applies every entry; `None` deletes the field.
    pub fn set_all(&mut self, data: BTreeMap<FieldPath, Option<FirestoreValue>>) {
        for (path, value) in data {
            match value {
                Some(value) => self.set(&path, value),
                None => self.delete(&path),
            }
        }
    }

    /// Removes the field at `path`. Missing paths and paths through non-map
    /// values are left alone; emptied parents are kept.
    pub fn delete(&mut self, path: &FieldPath) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let parent_has_field = self
            .field(&FieldPath::from_segments_unchecked(parents.to_vec()))
            .and_then(FirestoreValue::as_map)
            .is_some_and(|map| map.get(last).is_some());
        if !parent_has_field {
            return;
        }

        let mut current = self.value.ensure_map_mut();
        for segment in parents {
            let Some(next) = current
                .fields_mut()
                .get_mut(segment)
                .and_then(FirestoreValue::as_map_mut)
            else {
                return;
            };
            current = next;
        }
        current.fields_mut().remove(last);
    }

    pub fn with_field(&self, path: &FieldPath, value: FirestoreValue) -> Self {
        let mut copy = self.clone();
        copy.set(path, value);
        copy
    }

    pub fn without_field(&self, path: &FieldPath) -> Self {
        let mut copy = self.clone();
        copy.delete(path);
        copy
    }

    /// Paths of every leaf. An empty nested map counts as a leaf so that
    /// patching with the mask recreates it.
    pub fn field_mask(&self) -> FieldMask {
        let mut paths = Vec::new();
        collect_leaf_paths(self.fields(), &FieldPath::empty(), &mut paths);
        FieldMask::new(paths)
    }
}

fn collect_leaf_paths(
    fields: &BTreeMap<String, FirestoreValue>,
    prefix: &FieldPath,
    out: &mut Vec<FieldPath>,
) {
    for (key, value) in fields {
        let path = prefix.child(key.clone());
        match value.as_map() {
            Some(map) if value.is_map() && !map.is_empty() => {
                collect_leaf_paths(map.fields(), &path, out)
            }
            _ => out.push(path),
        }
    }
}

/// Accumulates edits against a base object and produces a new one.
#[derive(Clone, Debug, Default)]
pub struct ObjectValueBuilder {
    object: ObjectValue,
}

impl ObjectValueBuilder {
    pub fn new(base: &ObjectValue) -> Self {
        Self {
            object: base.clone(),
        }
    }

    pub fn set(&mut self, path: &FieldPath, value: FirestoreValue) -> &mut Self {
        self.object.set(path, value);
        self
    }

    pub fn delete(&mut self, path: &FieldPath) -> &mut Self {
        self.object.delete(path);
        self
    }

    pub fn build(&self) -> ObjectValue {
        self.object.clone()
    }
}
