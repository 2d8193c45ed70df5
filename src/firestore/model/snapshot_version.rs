use std::fmt::{Display, Formatter};

use crate::firestore::model::Timestamp;

/// Version of a document as assigned by the backend's commit clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotVersion {
    timestamp: Timestamp,
}

impl SnapshotVersion {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Version zero, used for documents that were never observed on the backend.
    pub fn min() -> Self {
        Self::new(Timestamp::new(0, 0))
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_min(&self) -> bool {
        *self == Self::min()
    }
}

impl Default for SnapshotVersion {
    fn default() -> Self {
        Self::min()
    }
}

impl From<Timestamp> for SnapshotVersion {
    fn from(timestamp: Timestamp) -> Self {
        Self::new(timestamp)
    }
}

impl Display for SnapshotVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SnapshotVersion({})", self.timestamp)
    }
}
