use crate::firestore::model::{DocumentKey, FieldPath, ResourcePath};

pub fn resource_path(segments: &[&str]) -> ResourcePath {
    ResourcePath::from_segments(segments.iter().copied())
}

/// Dotted path; panics on invalid input.
pub fn field_path(path: &str) -> FieldPath {
    FieldPath::from_dot_separated(path).unwrap()
}

pub fn doc_key(path: &str) -> DocumentKey {
    DocumentKey::from_string(path).unwrap()
}
