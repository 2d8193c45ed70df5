use std::collections::BTreeMap;

use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::model::{
    DocumentKey, FieldMask, FieldPath, FieldTransform, MutableDocument, ObjectValue,
    SnapshotVersion, Timestamp,
};
use crate::firestore::value::FirestoreValue;

/// Condition the stored document must satisfy for a mutation to apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precondition {
    #[default]
    None,
    Exists(bool),
    UpdateTime(SnapshotVersion),
}

impl Precondition {
    pub fn is_none(&self) -> bool {
        matches!(self, Precondition::None)
    }

    pub fn is_valid_for(&self, document: &MutableDocument) -> bool {
        match self {
            Precondition::None => true,
            Precondition::Exists(exists) => *exists == document.is_found_document(),
            Precondition::UpdateTime(version) => {
                document.is_found_document() && document.version() == *version
            }
        }
    }
}

/// Outcome of one mutation as reported by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationResult {
    /// Update time of the write, or the commit time for deletes.
    pub version: SnapshotVersion,
    /// One entry per field transform of the mutation, in order.
    pub transform_results: Vec<FirestoreValue>,
}

impl MutationResult {
    pub fn new(version: SnapshotVersion, transform_results: Vec<FirestoreValue>) -> Self {
        Self {
            version,
            transform_results,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MutationKind {
    /// Replaces the whole document.
    Set { value: ObjectValue },
    /// Writes the masked fields; masked fields missing from `data` are deleted.
    Patch {
        data: ObjectValue,
        field_mask: FieldMask,
    },
    Delete,
    /// Only checks the precondition on commit.
    Verify,
}

/// A change to one document.
///
/// Local application never fails: an unmet precondition leaves the document
/// untouched. Remote application trusts that the backend already checked the
/// precondition, except for patches, which turn the document into an
/// unknown document when the cached copy no longer matches.
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    key: DocumentKey,
    precondition: Precondition,
    field_transforms: Vec<FieldTransform>,
    kind: MutationKind,
}

impl Mutation {
    pub fn set(key: DocumentKey, value: ObjectValue, precondition: Precondition) -> Self {
        Self::with_kind(key, precondition, MutationKind::Set { value })
    }

    pub fn patch(
        key: DocumentKey,
        data: ObjectValue,
        field_mask: FieldMask,
        precondition: Precondition,
    ) -> Self {
        Self::with_kind(key, precondition, MutationKind::Patch { data, field_mask })
    }

    pub fn delete(key: DocumentKey, precondition: Precondition) -> Self {
        Self::with_kind(key, precondition, MutationKind::Delete)
    }

    pub fn verify(key: DocumentKey, precondition: Precondition) -> Self {
        Self::with_kind(key, precondition, MutationKind::Verify)
    }

    fn with_kind(key: DocumentKey, precondition: Precondition, kind: MutationKind) -> Self {
        Self {
            key,
            precondition,
            field_transforms: Vec::new(),
            kind,
        }
    }

    /// Attaches transforms to a set or patch. Deletes and verifies never
    /// carry transforms, so they are returned unchanged.
    pub fn with_transforms(mut self, field_transforms: Vec<FieldTransform>) -> Self {
        if matches!(self.kind, MutationKind::Set { .. } | MutationKind::Patch { .. }) {
            self.field_transforms = field_transforms;
        }
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn precondition(&self) -> Precondition {
        self.precondition
    }

    pub fn field_transforms(&self) -> &[FieldTransform] {
        &self.field_transforms
    }

    pub fn kind(&self) -> &MutationKind {
        &self.kind
    }

    /// Applies the acknowledged write to the cached document.
    pub fn apply_to_remote_document(
        &self,
        document: &mut MutableDocument,
        result: &MutationResult,
    ) -> FirestoreResult<()> {
        if document.key() != &self.key {
            return Err(internal_error(format!(
                "Can only apply a mutation to a document with the same key: {} vs {}",
                self.key,
                document.key()
            )));
        }

        match &self.kind {
            MutationKind::Set { value } => {
                let transform_results = self.server_transform_results(document, result)?;
                let mut data = value.clone();
                data.set_all(transform_results);
                document
                    .convert_to_found_document(result.version, data)
                    .set_has_committed_mutations();
            }
            MutationKind::Patch { data, field_mask } => {
                if !self.precondition.is_valid_for(document) {
                    // The backend accepted the write, so our cached copy is stale.
                    document.convert_to_unknown_document(result.version);
                    return Ok(());
                }
                let transform_results = self.server_transform_results(document, result)?;
                let mut new_data = document.data().clone();
                new_data.set_all(patch_entries(data, field_mask));
                new_data.set_all(transform_results);
                document
                    .convert_to_found_document(result.version, new_data)
                    .set_has_committed_mutations();
            }
            MutationKind::Delete => {
                document
                    .convert_to_no_document(result.version)
                    .set_has_committed_mutations();
            }
            MutationKind::Verify => {}
        }
        Ok(())
    }

    /// Applies the pending write to the local view of `document`.
    ///
    /// `previous_mask` holds the fields touched by earlier mutations of the
    /// same view; `None` means the whole document was already replaced. The
    /// returned mask adds the fields this mutation touched.
    pub fn apply_to_local_view(
        &self,
        document: &mut MutableDocument,
        previous_mask: Option<FieldMask>,
        local_write_time: Timestamp,
    ) -> Option<FieldMask> {
        if document.key() != &self.key {
            log::warn!(
                "ignoring mutation for {} applied to document {}",
                self.key,
                document.key()
            );
            return previous_mask;
        }
        if !self.precondition.is_valid_for(document) {
            return previous_mask;
        }

        match &self.kind {
            MutationKind::Set { value } => {
                let transform_results = self.local_transform_results(document, local_write_time);
                let mut data = value.clone();
                data.set_all(transform_results);
                let version = post_mutation_version(document);
                document
                    .convert_to_found_document(version, data)
                    .set_has_local_mutations();
                None
            }
            MutationKind::Patch { data, field_mask } => {
                let transform_results = self.local_transform_results(document, local_write_time);
                let mut new_data = document.data().clone();
                new_data.set_all(patch_entries(data, field_mask));
                new_data.set_all(transform_results);
                let version = post_mutation_version(document);
                document
                    .convert_to_found_document(version, new_data)
                    .set_has_local_mutations();
                previous_mask.map(|mask| {
                    mask.union_with(field_mask.fields().cloned())
                        .union_with(self.field_transforms.iter().map(|t| t.field().clone()))
                })
            }
            MutationKind::Delete => {
                document
                    .convert_to_no_document(SnapshotVersion::min())
                    .set_has_local_mutations();
                None
            }
            MutationKind::Verify => previous_mask,
        }
    }

    /// Sparse object holding the values non-idempotent transforms build on,
    /// or `None` when the mutation can be replayed as is.
    pub fn extract_transform_base_value(&self, document: &MutableDocument) -> Option<ObjectValue> {
        let mut base: Option<ObjectValue> = None;
        for field_transform in &self.field_transforms {
            let existing = document.field(field_transform.field());
            if let Some(value) = field_transform.transform().compute_base_value(existing) {
                base.get_or_insert_with(ObjectValue::empty)
                    .set(field_transform.field(), value);
            }
        }
        base
    }

    fn local_transform_results(
        &self,
        document: &MutableDocument,
        local_write_time: Timestamp,
    ) -> BTreeMap<FieldPath, Option<FirestoreValue>> {
        self.field_transforms
            .iter()
            .map(|field_transform| {
                let previous = document.field(field_transform.field());
                let value = field_transform
                    .transform()
                    .apply_to_local_view(previous, local_write_time);
                (field_transform.field().clone(), Some(value))
            })
            .collect()
    }

    fn server_transform_results(
        &self,
        document: &MutableDocument,
        result: &MutationResult,
    ) -> FirestoreResult<BTreeMap<FieldPath, Option<FirestoreValue>>> {
        if result.transform_results.len() != self.field_transforms.len() {
            return Err(internal_error(format!(
                "server transform result count ({}) should match field transform count ({})",
                result.transform_results.len(),
                self.field_transforms.len()
            )));
        }

        Ok(self
            .field_transforms
            .iter()
            .zip(result.transform_results.iter())
            .map(|(field_transform, server_value)| {
                let previous = document.field(field_transform.field());
                let value = field_transform
                    .transform()
                    .apply_to_remote_document(previous, Some(server_value));
                (field_transform.field().clone(), Some(value))
            })
            .collect())
    }
}

/// Version a local write keeps: the cached version for existing documents,
/// zero otherwise.
fn post_mutation_version(document: &MutableDocument) -> SnapshotVersion {
    if document.is_found_document() {
        document.version()
    } else {
        SnapshotVersion::min()
    }
}

fn patch_entries(
    data: &ObjectValue,
    field_mask: &FieldMask,
) -> BTreeMap<FieldPath, Option<FirestoreValue>> {
    field_mask
        .fields()
        .filter(|path| !path.is_empty())
        .map(|path| (path.clone(), data.field(path).cloned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::TransformOperation;
    use crate::firestore::test_support::{array, doc, doc_key, field_path, map, ts, wrap_object};
    use crate::firestore::value::is_server_timestamp;

    fn s(value: &str) -> FirestoreValue {
        FirestoreValue::from_string(value)
    }

    fn int(value: i64) -> FirestoreValue {
        FirestoreValue::from_integer(value)
    }

    fn version(seconds: i64) -> SnapshotVersion {
        SnapshotVersion::new(ts(seconds))
    }

    fn result(seconds: i64) -> MutationResult {
        MutationResult::new(version(seconds), Vec::new())
    }

    #[test]
    fn set_local_keeps_found_version() {
        let mut document = doc("coll/a", 3, vec![("foo", s("bar"))]);
        let set = Mutation::set(
            doc_key("coll/a"),
            wrap_object(vec![("bar", s("baz"))]),
            Precondition::None,
        );
        let mask = set.apply_to_local_view(&mut document, Some(FieldMask::empty()), ts(10));
        assert_eq!(mask, None);
        assert!(document.is_found_document());
        assert!(document.has_local_mutations());
        assert_eq!(document.version(), version(3));
        assert_eq!(document.data(), &wrap_object(vec![("bar", s("baz"))]));
    }

    #[test]
    fn set_local_on_deleted_document_resets_version() {
        let mut document = MutableDocument::new_no_document(doc_key("coll/a"), version(3));
        let set = Mutation::set(doc_key("coll/a"), wrap_object(vec![]), Precondition::None);
        set.apply_to_local_view(&mut document, None, ts(10));
        assert!(document.is_found_document());
        assert!(document.version().is_min());
    }

    #[test]
    fn set_remote_uses_server_version() {
        let mut document = MutableDocument::new_no_document(doc_key("coll/a"), version(3));
        let set = Mutation::set(
            doc_key("coll/a"),
            wrap_object(vec![("a", int(1))]),
            Precondition::None,
        );
        set.apply_to_remote_document(&mut document, &result(7)).unwrap();
        assert!(document.is_found_document());
        assert_eq!(document.version(), version(7));
        assert!(document.has_committed_mutations());
    }

    #[test]
    fn patch_local_merges_masked_fields() {
        let mut document = doc(
            "coll/a",
            1,
            vec![("foo", map(vec![("bar", s("old")), ("keep", s("k"))])), ("gone", s("x"))],
        );
        let patch = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![("foo", map(vec![("bar", s("new"))]))]),
            FieldMask::new(vec![field_path("foo.bar"), field_path("gone")]),
            Precondition::Exists(true),
        );
        let mask = patch.apply_to_local_view(&mut document, Some(FieldMask::empty()), ts(5));
        assert_eq!(
            document.data(),
            &wrap_object(vec![("foo", map(vec![("bar", s("new")), ("keep", s("k"))]))])
        );
        assert_eq!(
            mask,
            Some(FieldMask::new(vec![field_path("foo.bar"), field_path("gone")]))
        );
        assert_eq!(document.version(), version(1));
    }

    #[test]
    fn patch_local_requires_existing_document() {
        let mut document = MutableDocument::new_invalid_document(doc_key("coll/a"));
        let patch = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![("a", int(1))]),
            FieldMask::new(vec![field_path("a")]),
            Precondition::Exists(true),
        );
        let mask = patch.apply_to_local_view(&mut document, Some(FieldMask::empty()), ts(5));
        assert_eq!(mask, Some(FieldMask::empty()));
        assert!(!document.is_valid_document());
        assert!(!document.has_local_mutations());
    }

    #[test]
    fn patch_remote_with_stale_cache_becomes_unknown() {
        let mut document = MutableDocument::new_no_document(doc_key("coll/a"), version(2));
        let patch = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![("a", int(1))]),
            FieldMask::new(vec![field_path("a")]),
            Precondition::Exists(true),
        );
        patch.apply_to_remote_document(&mut document, &result(7)).unwrap();
        assert!(document.is_unknown_document());
        assert_eq!(document.version(), version(7));
        assert!(document.has_committed_mutations());
    }

    #[test]
    fn delete_local_and_remote() {
        let mut local = doc("coll/a", 3, vec![("a", int(1))]);
        let delete = Mutation::delete(doc_key("coll/a"), Precondition::None);
        delete.apply_to_local_view(&mut local, None, ts(1));
        assert!(local.is_no_document());
        assert!(local.version().is_min());
        assert!(local.has_local_mutations());

        let mut remote = MutableDocument::new_invalid_document(doc_key("coll/a"));
        delete.apply_to_remote_document(&mut remote, &result(0)).unwrap();
        assert!(remote.is_no_document());
        assert!(remote.version().is_min());
        assert!(remote.has_committed_mutations());
    }

    #[test]
    fn update_time_precondition() {
        let mut document = doc("coll/a", 3, vec![]);
        let delete = Mutation::delete(doc_key("coll/a"), Precondition::UpdateTime(version(4)));
        delete.apply_to_local_view(&mut document, None, ts(1));
        assert!(document.is_found_document());
        let delete = delete.with_precondition(Precondition::UpdateTime(version(3)));
        delete.apply_to_local_view(&mut document, None, ts(1));
        assert!(document.is_no_document());
    }

    #[test]
    fn transforms_apply_locally_and_remotely() {
        let mut document = doc("coll/a", 1, vec![("count", int(1)), ("tags", array(vec![s("a")]))]);
        let patch = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![]),
            FieldMask::empty(),
            Precondition::Exists(true),
        )
        .with_transforms(vec![
            FieldTransform::new(field_path("count"), TransformOperation::NumericIncrement(int(2))),
            FieldTransform::new(field_path("when"), TransformOperation::ServerTimestamp),
            FieldTransform::new(
                field_path("tags"),
                TransformOperation::ArrayUnion(vec![s("b")]),
            ),
        ]);

        let mut local = document.clone();
        let mask = patch.apply_to_local_view(&mut local, Some(FieldMask::empty()), ts(9));
        assert_eq!(local.field(&field_path("count")), Some(&int(3)));
        assert!(is_server_timestamp(local.field(&field_path("when")).unwrap()));
        assert_eq!(local.field(&field_path("tags")), Some(&array(vec![s("a"), s("b")])));
        assert_eq!(
            mask,
            Some(FieldMask::new(vec![
                field_path("count"),
                field_path("when"),
                field_path("tags")
            ]))
        );

        let server_time = FirestoreValue::from_timestamp(ts(10));
        let ack = MutationResult::new(
            version(10),
            vec![int(7), server_time.clone(), FirestoreValue::null()],
        );
        patch.apply_to_remote_document(&mut document, &ack).unwrap();
        assert_eq!(document.field(&field_path("count")), Some(&int(7)));
        assert_eq!(document.field(&field_path("when")), Some(&server_time));
        assert_eq!(
            document.field(&field_path("tags")),
            Some(&array(vec![s("a"), s("b")]))
        );
    }

    #[test]
    fn transform_result_count_mismatch_is_fatal() {
        let mut document = doc("coll/a", 1, vec![]);
        let set = Mutation::set(doc_key("coll/a"), wrap_object(vec![]), Precondition::None)
            .with_transforms(vec![FieldTransform::new(
                field_path("t"),
                TransformOperation::ServerTimestamp,
            )]);
        let err = set
            .apply_to_remote_document(&mut document, &result(2))
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/internal");
    }

    #[test]
    fn key_mismatch_is_ignored_locally() {
        let mut document = doc("coll/b", 1, vec![]);
        let delete = Mutation::delete(doc_key("coll/a"), Precondition::None);
        let mask = delete.apply_to_local_view(&mut document, Some(FieldMask::empty()), ts(1));
        assert_eq!(mask, Some(FieldMask::empty()));
        assert!(document.is_found_document());
    }

    #[test]
    fn extracts_increment_base_values() {
        let document = doc("coll/a", 1, vec![("count", s("text"))]);
        let set = Mutation::set(doc_key("coll/a"), wrap_object(vec![]), Precondition::None)
            .with_transforms(vec![
                FieldTransform::new(field_path("count"), TransformOperation::NumericIncrement(int(1))),
                FieldTransform::new(field_path("when"), TransformOperation::ServerTimestamp),
            ]);
        assert_eq!(
            set.extract_transform_base_value(&document),
            Some(wrap_object(vec![("count", int(0))]))
        );
        let no_transforms = Mutation::set(doc_key("coll/a"), wrap_object(vec![]), Precondition::None);
        assert_eq!(no_transforms.extract_transform_base_value(&document), None);
    }

    #[test]
    fn delete_never_carries_transforms() {
        let delete = Mutation::delete(doc_key("coll/a"), Precondition::None).with_transforms(vec![
            FieldTransform::new(field_path("t"), TransformOperation::ServerTimestamp),
        ]);
        assert!(delete.field_transforms().is_empty());
    }

    #[test]
    fn equality_includes_mask_and_transforms() {
        let base = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![("a", int(1))]),
            FieldMask::new(vec![field_path("a")]),
            Precondition::None,
        );
        let other_mask = Mutation::patch(
            doc_key("coll/a"),
            wrap_object(vec![("a", int(1))]),
            FieldMask::new(vec![field_path("b")]),
            Precondition::None,
        );
        assert_ne!(base, other_mask);
        assert_eq!(base.clone(), base);
        let with_transform = base.clone().with_transforms(vec![FieldTransform::new(
            field_path("t"),
            TransformOperation::ServerTimestamp,
        )]);
        assert_ne!(base, with_transform);
    }
}
