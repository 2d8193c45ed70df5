use crate::firestore::model::{DocumentKey, FieldPath, ObjectValue, SnapshotVersion};
use crate::firestore::value::FirestoreValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentType {
    /// Not yet known; the cache has no information about the document.
    Invalid,
    Found,
    No,
    /// Exists on the backend at a known version but its contents are unknown.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentState {
    Synced,
    HasLocalMutations,
    HasCommittedMutations,
}

/// Cached state of a single document.
///
/// A document starts out as [`DocumentType::Invalid`] and only changes type
/// through the `convert_to_*` methods used when mutations are applied.
#[derive(Clone, Debug)]
pub struct MutableDocument {
    key: DocumentKey,
    document_type: DocumentType,
    version: SnapshotVersion,
    read_time: SnapshotVersion,
    data: ObjectValue,
    document_state: DocumentState,
}

impl MutableDocument {
    fn with_parts(
        key: DocumentKey,
        document_type: DocumentType,
        version: SnapshotVersion,
        data: ObjectValue,
        document_state: DocumentState,
    ) -> Self {
        Self {
            key,
            document_type,
            version,
            read_time: SnapshotVersion::min(),
            data,
            document_state,
        }
    }

    pub fn new_invalid_document(key: DocumentKey) -> Self {
        Self::with_parts(
            key,
            DocumentType::Invalid,
            SnapshotVersion::min(),
            ObjectValue::empty(),
            DocumentState::Synced,
        )
    }

    pub fn new_found_document(key: DocumentKey, version: SnapshotVersion, data: ObjectValue) -> Self {
        Self::with_parts(key, DocumentType::Found, version, data, DocumentState::Synced)
    }

    pub fn new_no_document(key: DocumentKey, version: SnapshotVersion) -> Self {
        Self::with_parts(
            key,
            DocumentType::No,
            version,
            ObjectValue::empty(),
            DocumentState::Synced,
        )
    }

    pub fn new_unknown_document(key: DocumentKey, version: SnapshotVersion) -> Self {
        Self::with_parts(
            key,
            DocumentType::Unknown,
            version,
            ObjectValue::empty(),
            DocumentState::HasCommittedMutations,
        )
    }

    pub fn convert_to_found_document(
        &mut self,
        version: SnapshotVersion,
        data: ObjectValue,
    ) -> &mut Self {
        self.version = version;
        self.document_type = DocumentType::Found;
        self.data = data;
        self.document_state = DocumentState::Synced;
        self
    }

    pub fn convert_to_no_document(&mut self, version: SnapshotVersion) -> &mut Self {
        self.version = version;
        self.document_type = DocumentType::No;
        self.data = ObjectValue::empty();
        self.document_state = DocumentState::Synced;
        self
    }

    pub fn convert_to_unknown_document(&mut self, version: SnapshotVersion) -> &mut Self {
        self.version = version;
        self.document_type = DocumentType::Unknown;
        self.data = ObjectValue::empty();
        self.document_state = DocumentState::HasCommittedMutations;
        self
    }

    pub fn set_has_committed_mutations(&mut self) -> &mut Self {
        self.document_state = DocumentState::HasCommittedMutations;
        self
    }

    pub fn set_has_local_mutations(&mut self) -> &mut Self {
        self.document_state = DocumentState::HasLocalMutations;
        self
    }

    pub fn set_read_time(&mut self, read_time: SnapshotVersion) -> &mut Self {
        self.read_time = read_time;
        self
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn read_time(&self) -> SnapshotVersion {
        self.read_time
    }

    pub fn data(&self) -> &ObjectValue {
        &self.data
    }

    pub fn field(&self, path: &FieldPath) -> Option<&FirestoreValue> {
        self.data.field(path)
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn document_state(&self) -> DocumentState {
        self.document_state
    }

    pub fn has_local_mutations(&self) -> bool {
        self.document_state == DocumentState::HasLocalMutations
    }

    pub fn has_committed_mutations(&self) -> bool {
        self.document_state == DocumentState::HasCommittedMutations
    }

    pub fn has_pending_writes(&self) -> bool {
        self.has_local_mutations() || self.has_committed_mutations()
    }

    pub fn is_valid_document(&self) -> bool {
        self.document_type != DocumentType::Invalid
    }

    pub fn is_found_document(&self) -> bool {
        self.document_type == DocumentType::Found
    }

    pub fn is_no_document(&self) -> bool {
        self.document_type == DocumentType::No
    }

    pub fn is_unknown_document(&self) -> bool {
        self.document_type == DocumentType::Unknown
    }
}

/// Read time is bookkeeping for the cache and is ignored.
impl PartialEq for MutableDocument {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.version == other.version
            && self.document_type == other.document_type
            && self.document_state == other.document_state
            && self.data == other.data
    }
}
