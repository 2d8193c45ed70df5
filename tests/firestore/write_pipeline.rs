use firebase_firestore_model::firestore::api::{FieldValue, SetOptions, UserData, UserDataReader};
use firebase_firestore_model::firestore::model::{
    FieldMask, MutableDocument, MutationBatch, ObjectValue, Precondition, SnapshotVersion,
    Timestamp,
};
use firebase_firestore_model::firestore::remote::{Datastore, InMemoryDatastore, JsonProtoSerializer};
use firebase_firestore_model::firestore::value::{
    is_server_timestamp, resolve_server_timestamps, FirestoreValue, ServerTimestampBehavior,
};
use serde_json::json;

use crate::common::{db, field, key};

fn counter_document() -> ObjectValue {
    let mut data = ObjectValue::empty();
    data.set(&field("count"), FirestoreValue::from_integer(1));
    data
}

#[tokio::test]
async fn update_flows_from_user_data_to_committed_document() {
    let reader = UserDataReader::new(db());
    let update = reader
        .parse_update_data(
            "updateDoc",
            &UserData::map([
                ("name", UserData::from("Ada")),
                ("count", UserData::from(FieldValue::increment(2_i64))),
                ("updated", UserData::from(FieldValue::server_timestamp())),
            ]),
        )
        .expect("valid update");
    let mutation = update.to_mutation(key("rooms/eros"), Precondition::Exists(true));

    let store = InMemoryDatastore::new();
    let seeded_at = store.seed(key("rooms/eros"), counter_document()).await;

    // Local view: the increment applies at once and the timestamp stays pending.
    let mut local = MutableDocument::new_found_document(key("rooms/eros"), seeded_at, counter_document());
    let batch = MutationBatch::new(1, Timestamp::new(500, 0), Vec::new(), vec![mutation.clone()]);
    let touched = batch
        .apply_to_local_view(&mut local, Some(FieldMask::empty()))
        .expect("patch keeps a field mask");
    assert!(touched.contains(&field("name")));
    assert!(touched.contains(&field("count")));
    assert!(touched.contains(&field("updated")));
    assert!(local.has_local_mutations());
    assert_eq!(local.field(&field("count")), Some(&FirestoreValue::from_integer(3)));
    let pending = local.field(&field("updated")).expect("pending field");
    assert!(is_server_timestamp(pending));
    assert_eq!(
        resolve_server_timestamps(pending, ServerTimestampBehavior::Estimate),
        FirestoreValue::from_timestamp(Timestamp::new(500, 0))
    );
    assert!(resolve_server_timestamps(pending, ServerTimestampBehavior::Previous).is_null());

    // Remote acknowledgement replaces the pending timestamp.
    let results = store.commit(vec![mutation.clone()]).await.expect("commit succeeds");
    let mut remote = MutableDocument::new_found_document(key("rooms/eros"), seeded_at, counter_document());
    mutation
        .apply_to_remote_document(&mut remote, &results[0])
        .expect("same key");
    assert!(remote.has_committed_mutations());
    assert_eq!(remote.version(), results[0].version);
    assert_eq!(
        remote.field(&field("updated")),
        Some(&FirestoreValue::from_timestamp(results[0].version.timestamp()))
    );

    let stored = store.document(&key("rooms/eros")).await.expect("document exists");
    assert_eq!(stored.data(), remote.data());
}

#[test]
fn parsed_writes_survive_the_wire_format() {
    let reader = UserDataReader::new(db());
    let serializer = JsonProtoSerializer::new(db());

    let merge = reader
        .parse_set_data(
            "setDoc",
            &UserData::map([
                ("tags", UserData::from(FieldValue::array_union(vec!["a", "b"]))),
                ("stale", UserData::from(FieldValue::delete())),
                ("nested", UserData::map([("x", UserData::from(1.5))])),
            ]),
            &SetOptions::merge_all(),
        )
        .expect("valid merge");
    let mutation = merge.to_mutation(key("rooms/eros"), Precondition::None);

    let body = serializer.encode_commit_request(std::slice::from_ref(&mutation));
    let write = &body["writes"][0];
    assert_eq!(write["updateMask"]["fieldPaths"], json!(["nested.x", "stale"]));
    assert_eq!(write["update"]["fields"]["nested"]["mapValue"]["fields"]["x"], json!({ "doubleValue": 1.5 }));
    assert_eq!(write["updateTransforms"][0]["fieldPath"], json!("tags"));
    assert!(write.get("currentDocument").is_none());

    assert_eq!(serializer.decode_mutation(write).expect("decodes"), mutation);
}

#[test]
fn commit_responses_decode_into_results() {
    let serializer = JsonProtoSerializer::new(db());
    let response = json!({
        "commitTime": "2024-03-01T10:00:00.5Z",
        "writeResults": [
            { "updateTime": "2024-03-01T10:00:00.25Z", "transformResults": [{ "integerValue": "7" }] },
            {}
        ]
    });
    let (commit_version, results) = serializer
        .decode_commit_response(&response)
        .expect("well formed response");
    assert_eq!(commit_version.timestamp().nanos, 500_000_000);
    assert_eq!(results[0].version.timestamp().nanos, 250_000_000);
    assert_eq!(results[0].transform_results, vec![FirestoreValue::from_integer(7)]);
    assert_eq!(results[1].version, commit_version);
    assert!(commit_version > SnapshotVersion::min());
}
