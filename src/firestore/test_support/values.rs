use std::collections::BTreeMap;

use crate::firestore::model::{
    DatabaseId, MutableDocument, ObjectValue, SnapshotVersion, Timestamp,
};
use crate::firestore::test_support::doc_key;
use crate::firestore::value::FirestoreValue;

pub fn test_db() -> DatabaseId {
    DatabaseId::default("test-project")
}

pub fn ts(seconds: i64) -> Timestamp {
    Timestamp::new(seconds, 0)
}

pub fn map(entries: Vec<(&str, FirestoreValue)>) -> FirestoreValue {
    let fields: BTreeMap<String, FirestoreValue> = entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    FirestoreValue::from_map(fields)
}

pub fn array(values: Vec<FirestoreValue>) -> FirestoreValue {
    FirestoreValue::from_array(values)
}

pub fn reference(project: &str, path: &str) -> FirestoreValue {
    FirestoreValue::reference(DatabaseId::default(project), doc_key(path))
}

pub fn wrap_object(entries: Vec<(&str, FirestoreValue)>) -> ObjectValue {
    ObjectValue::from_value(map(entries)).unwrap()
}

/// Found document at `version` seconds.
pub fn doc(path: &str, version: i64, entries: Vec<(&str, FirestoreValue)>) -> MutableDocument {
    MutableDocument::new_found_document(
        doc_key(path),
        SnapshotVersion::new(ts(version)),
        wrap_object(entries),
    )
}
