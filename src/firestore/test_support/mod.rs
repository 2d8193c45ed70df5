//! Builders shared by the unit tests of the Firestore modules.

mod path;
mod values;

pub use path::{doc_key, field_path, resource_path};
pub use values::{array, doc, map, reference, test_db, ts, wrap_object};
