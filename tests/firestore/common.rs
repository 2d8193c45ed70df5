use firebase_firestore_model::firestore::model::{DatabaseId, DocumentKey, FieldPath};

pub fn db() -> DatabaseId {
    DatabaseId::new("integration", "(default)")
}

pub fn key(path: &str) -> DocumentKey {
    DocumentKey::from_string(path).expect("valid document path")
}

pub fn field(path: &str) -> FieldPath {
    FieldPath::from_dot_separated(path).expect("valid field path")
}
