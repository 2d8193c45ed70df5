pub mod api;
pub mod constants;
pub mod core;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{DocumentReference, FieldValue, SetOptions, UserData, UserDataReader};
pub use self::core::{Transaction, TransactionOptions};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, DocumentKey, FieldPath, MutableDocument, Mutation, Timestamp};
pub use remote::{Datastore, InMemoryDatastore, JsonProtoSerializer};
pub use value::FirestoreValue;
