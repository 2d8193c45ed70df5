use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::ResourcePath;

/// Path of a single document: an even, non-zero number of segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> FirestoreResult<Self> {
        if path.is_empty() || path.len() % 2 != 0 {
            return Err(invalid_argument(format!(
                "Invalid document reference. Document references must have an even number of segments, but {} has {}.",
                path.canonical_string(),
                path.len()
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let resource = ResourcePath::from_string(path)?;
        Self::from_path(resource)
    }

    pub fn collection_path(&self) -> ResourcePath {
        self.path.without_last()
    }

    pub fn collection_group(&self) -> &str {
        self.path.get(self.path.len() - 2).unwrap_or_default()
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    pub fn has_collection_id(&self, collection_id: &str) -> bool {
        self.collection_group() == collection_id
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
