use std::collections::BTreeSet;

use crate::firestore::model::FieldPath;

/// Set of field paths a patch treats as authoritative.
///
/// A path in the mask either overwrites the field with the patch value or,
/// when the patch data has no value there, deletes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMask {
    fields: BTreeSet<FieldPath>,
}

impl FieldMask {
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = FieldPath>,
    {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.fields.contains(path)
    }

    pub fn insert(&mut self, path: FieldPath) {
        self.fields.insert(path);
    }

    /// True when some entry equals `path` or is one of its parents.
    pub fn covers(&self, path: &FieldPath) -> bool {
        self.fields.iter().any(|entry| entry.is_prefix_of(path))
    }

    pub fn union_with<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = FieldPath>,
    {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Self { fields }
    }
}

impl FromIterator<FieldPath> for FieldMask {
    fn from_iter<T: IntoIterator<Item = FieldPath>>(iter: T) -> Self {
        Self::new(iter)
    }
}
