pub mod datastore;
pub mod serializer;

pub use datastore::{Datastore, DatastoreArc, InMemoryDatastore};
pub use serializer::{JsonProtoSerializer, SerializerOptions};
