use std::fmt::{Display, Formatter};

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DatabaseId, DocumentKey, ResourcePath};

/// Pointer to a document, usable as a field value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    database_id: DatabaseId,
    key: DocumentKey,
}

impl DocumentReference {
    pub fn new(database_id: DatabaseId, key: DocumentKey) -> Self {
        Self { database_id, key }
    }

    /// Parses a slash separated document path such as `rooms/eros`.
    pub fn from_path(database_id: DatabaseId, path: &str) -> FirestoreResult<Self> {
        Ok(Self::new(database_id, DocumentKey::from_string(path)?))
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// The full resource path to the document.
    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path().canonical_string())
    }
}
