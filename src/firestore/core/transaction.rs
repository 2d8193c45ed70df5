use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::firestore::api::{ParsedSetData, ParsedUpdateData};
use crate::firestore::error::{
    aborted, failed_precondition, internal_error, invalid_argument, FirestoreError,
    FirestoreResult,
};
use crate::firestore::model::{
    DocumentKey, MutableDocument, Mutation, MutationResult, Precondition, SnapshotVersion,
};
use crate::firestore::remote::Datastore;

/// Settings for a single [`Transaction`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Send a `verify` write for each document that was read but not
    /// written, instead of rejecting the commit locally.
    pub verify_unwritten_reads: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    Failed,
}

/// Reads and writes performed as one atomic unit.
///
/// All reads must happen before the first write. Each write carries a
/// precondition derived from the version its document was read at, so the
/// commit fails on the backend if any read document changed in between.
/// A transaction is driven by a single caller and ends after one commit
/// attempt; conflicts are retried by running a fresh transaction.
pub struct Transaction {
    datastore: Arc<dyn Datastore>,
    options: TransactionOptions,
    read_versions: BTreeMap<DocumentKey, SnapshotVersion>,
    mutations: Vec<Mutation>,
    written_docs: BTreeSet<DocumentKey>,
    last_error: Option<FirestoreError>,
    state: TransactionState,
}

impl Transaction {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self::with_options(datastore, TransactionOptions::default())
    }

    pub fn with_options(datastore: Arc<dyn Datastore>, options: TransactionOptions) -> Self {
        Self {
            datastore,
            options,
            read_versions: BTreeMap::new(),
            mutations: Vec::new(),
            written_docs: BTreeSet::new(),
            last_error: None,
            state: TransactionState::Active,
        }
    }

    /// Reads `keys` and records the version each one was observed at.
    pub async fn lookup(&mut self, keys: &[DocumentKey]) -> FirestoreResult<Vec<MutableDocument>> {
        self.ensure_active()?;
        if !self.mutations.is_empty() {
            return Err(invalid_argument(
                "Firestore transactions require all reads to be executed before all writes.",
            ));
        }

        log::debug!("transaction lookup of {} documents", keys.len());
        let documents = self.datastore.lookup(keys).await?;
        for document in &documents {
            self.record_version(document)?;
        }
        Ok(documents)
    }

    pub fn set(&mut self, key: DocumentKey, data: &ParsedSetData) -> FirestoreResult<()> {
        self.ensure_active()?;
        let precondition = self.precondition(&key);
        self.write(data.to_mutation(key, precondition));
        Ok(())
    }

    /// Queues an update. Updating a document that was read as missing fails
    /// now and also fails the eventual commit.
    pub fn update(&mut self, key: DocumentKey, data: &ParsedUpdateData) -> FirestoreResult<()> {
        self.ensure_active()?;
        match self.precondition_for_update(&key) {
            Ok(precondition) => {
                self.write(data.to_mutation(key, precondition));
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                self.written_docs.insert(key);
                Err(err)
            }
        }
    }

    pub fn delete(&mut self, key: DocumentKey) -> FirestoreResult<()> {
        self.ensure_active()?;
        let precondition = self.precondition(&key);
        self.write(Mutation::delete(key, precondition));
        Ok(())
    }

    /// Mutations queued so far, in submission order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Sends every queued write in one atomic commit.
    ///
    /// Local consistency failures are reported before anything is sent. The
    /// transaction cannot be used again afterwards, whatever the outcome.
    pub async fn commit(&mut self) -> FirestoreResult<Vec<MutationResult>> {
        self.ensure_active()?;
        self.state = TransactionState::Failed;

        if let Some(err) = self.last_error.take() {
            log::warn!("transaction aborted before commit: {err}");
            return Err(err);
        }

        let written: BTreeSet<&DocumentKey> =
            self.mutations.iter().map(Mutation::key).collect();
        let unwritten: Vec<DocumentKey> = self
            .read_versions
            .keys()
            .filter(|key| !written.contains(key))
            .cloned()
            .collect();

        let mut mutations = std::mem::take(&mut self.mutations);
        if !unwritten.is_empty() {
            if !self.options.verify_unwritten_reads {
                log::warn!(
                    "transaction rejected: {} documents read but not written",
                    unwritten.len()
                );
                return Err(failed_precondition(
                    "Every document read in a transaction must also be written.",
                ));
            }
            for key in unwritten {
                let precondition = self.precondition(&key);
                mutations.push(Mutation::verify(key, precondition));
            }
        }

        log::debug!("committing transaction with {} writes", mutations.len());
        let mutation_count = mutations.len();
        let results = self.datastore.commit(mutations).await?;
        if results.len() != mutation_count {
            return Err(internal_error(format!(
                "Commit returned {} results for {} writes",
                results.len(),
                mutation_count
            )));
        }
        self.state = TransactionState::Committed;
        Ok(results)
    }

    pub fn is_committed(&self) -> bool {
        self.state == TransactionState::Committed
    }

    fn ensure_active(&self) -> FirestoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed | TransactionState::Failed => Err(failed_precondition(
                "A transaction object cannot be used after its commit has been attempted.",
            )),
        }
    }

    fn record_version(&mut self, document: &MutableDocument) -> FirestoreResult<()> {
        let version = if document.is_found_document() {
            document.version()
        } else if document.is_no_document() {
            SnapshotVersion::min()
        } else {
            return Err(internal_error(format!(
                "Document {} in a transaction was neither found nor missing",
                document.key()
            )));
        };

        match self.read_versions.get(document.key()) {
            Some(existing) if *existing != version => {
                let err = aborted("Document version changed between two reads.");
                log::warn!("transaction read of {} saw {version}, expected {existing}", document.key());
                self.last_error = Some(err.clone());
                Err(err)
            }
            Some(_) => Ok(()),
            None => {
                self.read_versions.insert(document.key().clone(), version);
                Ok(())
            }
        }
    }

    /// Precondition for sets and deletes: the read version, or "must not
    /// exist" for a document read as missing.
    fn precondition(&self, key: &DocumentKey) -> Precondition {
        match self.read_versions.get(key) {
            Some(version) if !self.written_docs.contains(key) => {
                if version.is_min() {
                    Precondition::Exists(false)
                } else {
                    Precondition::UpdateTime(*version)
                }
            }
            _ => Precondition::None,
        }
    }

    fn precondition_for_update(&self, key: &DocumentKey) -> FirestoreResult<Precondition> {
        match self.read_versions.get(key) {
            Some(version) if !self.written_docs.contains(key) => {
                if version.is_min() {
                    Err(invalid_argument("Can't update a document that doesn't exist."))
                } else {
                    Ok(Precondition::UpdateTime(*version))
                }
            }
            _ => Ok(Precondition::Exists(true)),
        }
    }

    fn write(&mut self, mutation: Mutation) {
        self.written_docs.insert(mutation.key().clone());
        self.mutations.push(mutation);
    }
}
