use std::collections::BTreeMap;
use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;

use crate::firestore::error::{failed_precondition, FirestoreResult};
use crate::firestore::model::{
    DocumentKey, MutableDocument, Mutation, MutationResult, ObjectValue, SnapshotVersion,
    Timestamp, TransformOperation,
};
use crate::firestore::value::FirestoreValue;

use super::Datastore;

/// Process local backend. Every commit advances a logical clock by one
/// second and is applied atomically.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<DocumentKey, MutableDocument>,
    clock: i64,
    commit_count: usize,
}

impl StoreState {
    fn advance_clock(&mut self) -> SnapshotVersion {
        self.clock += 1;
        SnapshotVersion::new(Timestamp::new(self.clock, 0))
    }

    fn read_version(&self) -> SnapshotVersion {
        SnapshotVersion::new(Timestamp::new(self.clock, 0))
    }
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `key` outside of any commit and returns the
    /// version it was written at.
    pub async fn seed(&self, key: DocumentKey, data: ObjectValue) -> SnapshotVersion {
        let mut state = self.state.lock().await;
        let version = state.advance_clock();
        state.documents.insert(
            key.clone(),
            MutableDocument::new_found_document(key, version, data),
        );
        version
    }

    /// Current stored copy of a document, if it exists.
    pub async fn document(&self, key: &DocumentKey) -> Option<MutableDocument> {
        self.state.lock().await.documents.get(key).cloned()
    }

    /// Number of commits that reached the store, successful or not.
    pub async fn commit_count(&self) -> usize {
        self.state.lock().await.commit_count
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Datastore for InMemoryDatastore {
    async fn lookup(&self, keys: &[DocumentKey]) -> FirestoreResult<Vec<MutableDocument>> {
        let state = self.state.lock().await;
        let read_time = state.read_version();
        Ok(keys
            .iter()
            .map(|key| {
                let mut document = state
                    .documents
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| MutableDocument::new_no_document(key.clone(), read_time));
                document.set_read_time(read_time);
                document
            })
            .collect())
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> FirestoreResult<Vec<MutationResult>> {
        let mut state = self.state.lock().await;
        state.commit_count += 1;
        let commit_version = SnapshotVersion::new(Timestamp::new(state.clock + 1, 0));
        log::debug!(
            "in-memory commit of {} writes at {}",
            mutations.len(),
            commit_version
        );

        // Work on a copy so a failed precondition leaves the store untouched.
        let mut working = state.documents.clone();
        let mut results = Vec::with_capacity(mutations.len());
        for mutation in &mutations {
            let key = mutation.key();
            let mut document = working
                .remove(key)
                .unwrap_or_else(|| MutableDocument::new_no_document(key.clone(), SnapshotVersion::min()));

            if !mutation.precondition().is_valid_for(&document) {
                log::debug!("precondition {:?} failed for {key}", mutation.precondition());
                return Err(failed_precondition(format!(
                    "Precondition failed for document {key}"
                )));
            }

            let transform_results = mutation
                .field_transforms()
                .iter()
                .map(|field_transform| match field_transform.transform() {
                    TransformOperation::ServerTimestamp => {
                        FirestoreValue::from_timestamp(commit_version.timestamp())
                    }
                    operation => operation.apply_to_local_view(
                        document.field(field_transform.field()),
                        commit_version.timestamp(),
                    ),
                })
                .collect();
            let result = MutationResult::new(commit_version, transform_results);
            mutation.apply_to_remote_document(&mut document, &result)?;
            results.push(result);

            if document.is_found_document() {
                working.insert(key.clone(), document);
            }
        }

        state.documents = working;
        state.clock = commit_version.timestamp().seconds;
        Ok(results)
    }
}
