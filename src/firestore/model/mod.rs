mod database_id;
mod document;
mod document_key;
mod field_mask;
mod field_path;
mod geo_point;
mod mutation;
mod mutation_batch;
mod object_value;
mod resource_path;
mod snapshot_version;
mod timestamp;
mod transform_operation;

pub use database_id::DatabaseId;
pub use document::{DocumentState, DocumentType, MutableDocument};
pub use document_key::DocumentKey;
pub use field_mask::FieldMask;
pub use field_path::{FieldPath, IntoFieldPath};
pub use geo_point::GeoPoint;
pub use mutation::{Mutation, MutationKind, MutationResult, Precondition};
pub use mutation_batch::{MutationBatch, MutationBatchResult};
pub use object_value::{ObjectValue, ObjectValueBuilder};
pub use resource_path::ResourcePath;
pub use snapshot_version::SnapshotVersion;
pub use timestamp::Timestamp;
pub use transform_operation::{FieldTransform, TransformOperation};
