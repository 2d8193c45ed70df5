use crate::firestore::api::UserData;

/// Markers that ask for a field to be deleted or computed during a write
/// instead of being stored as given.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldValue {
    kind: FieldValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FieldValueKind {
    Delete,
    ServerTimestamp,
    ArrayUnion(Vec<UserData>),
    ArrayRemove(Vec<UserData>),
    Increment(Box<UserData>),
}

impl FieldValue {
    /// Removes the field. Allowed in updates and merging sets only.
    pub fn delete() -> Self {
        Self {
            kind: FieldValueKind::Delete,
        }
    }

    /// Replaced by the backend's commit time.
    pub fn server_timestamp() -> Self {
        Self {
            kind: FieldValueKind::ServerTimestamp,
        }
    }

    /// Adds each element not already present in the stored array.
    pub fn array_union<I, T>(elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<UserData>,
    {
        Self {
            kind: FieldValueKind::ArrayUnion(elements.into_iter().map(Into::into).collect()),
        }
    }

    /// Removes every occurrence of each element from the stored array.
    pub fn array_remove<I, T>(elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<UserData>,
    {
        Self {
            kind: FieldValueKind::ArrayRemove(elements.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds `operand` to the stored number. The operand must be numeric.
    pub fn increment(operand: impl Into<UserData>) -> Self {
        Self {
            kind: FieldValueKind::Increment(Box::new(operand.into())),
        }
    }

    pub(crate) fn kind(&self) -> &FieldValueKind {
        &self.kind
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.kind, FieldValueKind::Delete)
    }

    /// Name used when reporting misuse.
    pub fn method_name(&self) -> &'static str {
        match self.kind {
            FieldValueKind::Delete => "FieldValue.delete",
            FieldValueKind::ServerTimestamp => "FieldValue.serverTimestamp",
            FieldValueKind::ArrayUnion(_) => "FieldValue.arrayUnion",
            FieldValueKind::ArrayRemove(_) => "FieldValue.arrayRemove",
            FieldValueKind::Increment(_) => "FieldValue.increment",
        }
    }
}
