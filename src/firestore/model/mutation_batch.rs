use std::collections::{BTreeMap, BTreeSet};

use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::model::{
    DocumentKey, FieldMask, MutableDocument, Mutation, MutationResult, SnapshotVersion, Timestamp,
};

/// Mutations written together by one user operation.
///
/// `base_mutations` capture the values non-idempotent transforms were
/// computed from; they only affect the local view.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationBatch {
    /// Monotonic identifier assigned locally when the batch is queued.
    pub batch_id: i32,
    pub local_write_time: Timestamp,
    pub base_mutations: Vec<Mutation>,
    pub mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new(
        batch_id: i32,
        local_write_time: Timestamp,
        base_mutations: Vec<Mutation>,
        mutations: Vec<Mutation>,
    ) -> Self {
        Self {
            batch_id,
            local_write_time,
            base_mutations,
            mutations,
        }
    }

    /// Returns `true` when the batch contains no writes.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<DocumentKey> {
        self.mutations
            .iter()
            .map(|mutation| mutation.key().clone())
            .collect()
    }

    /// Applies every acknowledged mutation of this batch that targets
    /// `document`.
    pub fn apply_to_remote_document(
        &self,
        document: &mut MutableDocument,
        batch_result: &MutationBatchResult,
    ) -> FirestoreResult<()> {
        if batch_result.mutation_results.len() != self.mutations.len() {
            return Err(internal_error(format!(
                "Mismatch between mutations length ({}) and results length ({})",
                self.mutations.len(),
                batch_result.mutation_results.len()
            )));
        }

        for (mutation, result) in self.mutations.iter().zip(&batch_result.mutation_results) {
            if mutation.key() == document.key() {
                mutation.apply_to_remote_document(document, result)?;
            }
        }
        Ok(())
    }

    /// Applies the batch to the local view and returns the fields it touched
    /// (`None` once any mutation replaced the whole document).
    pub fn apply_to_local_view(
        &self,
        document: &mut MutableDocument,
        mut mutated_fields: Option<FieldMask>,
    ) -> Option<FieldMask> {
        for mutation in self.base_mutations.iter().chain(self.mutations.iter()) {
            if mutation.key() == document.key() {
                mutated_fields =
                    mutation.apply_to_local_view(document, mutated_fields, self.local_write_time);
            }
        }
        mutated_fields
    }
}

/// Backend acknowledgement of a [`MutationBatch`].
#[derive(Clone, Debug, PartialEq)]
pub struct MutationBatchResult {
    pub batch: MutationBatch,
    pub commit_version: SnapshotVersion,
    pub mutation_results: Vec<MutationResult>,
    /// Version each written document ended up at.
    pub doc_versions: BTreeMap<DocumentKey, SnapshotVersion>,
}

impl MutationBatchResult {
    pub fn from(
        batch: MutationBatch,
        commit_version: SnapshotVersion,
        mutation_results: Vec<MutationResult>,
    ) -> FirestoreResult<Self> {
        if batch.mutations.len() != mutation_results.len() {
            return Err(internal_error(format!(
                "Mutations sent {} must equal results received {}",
                batch.mutations.len(),
                mutation_results.len()
            )));
        }

        let doc_versions = batch
            .mutations
            .iter()
            .zip(&mutation_results)
            .map(|(mutation, result)| (mutation.key().clone(), result.version))
            .collect();

        Ok(Self {
            batch,
            commit_version,
            mutation_results,
            doc_versions,
        })
    }
}
