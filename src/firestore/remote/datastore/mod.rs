use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DocumentKey, MutableDocument, Mutation, MutationResult};

pub mod in_memory;

/// Backend operations a transaction needs.
///
/// `lookup` returns one document per requested key, in request order, as a
/// found document or a no-document. `commit` applies every mutation or none
/// and returns one result per mutation in submission order.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Datastore: Send + Sync + 'static {
    async fn lookup(&self, keys: &[DocumentKey]) -> FirestoreResult<Vec<MutableDocument>>;
    async fn commit(&self, mutations: Vec<Mutation>) -> FirestoreResult<Vec<MutationResult>>;
}

pub type DatastoreArc = Arc<dyn Datastore>;

pub use in_memory::InMemoryDatastore;
