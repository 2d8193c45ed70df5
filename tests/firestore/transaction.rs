use std::sync::Arc;

use firebase_firestore_model::firestore::api::{SetOptions, UserData, UserDataReader};
use firebase_firestore_model::firestore::core::{Transaction, TransactionOptions};
use firebase_firestore_model::firestore::model::{ObjectValue, Precondition};
use firebase_firestore_model::firestore::remote::InMemoryDatastore;
use firebase_firestore_model::firestore::value::FirestoreValue;

use crate::common::{db, field, key};

fn balance(amount: i64) -> UserData {
    UserData::map([("balance", UserData::from(amount))])
}

fn seeded(amount: i64) -> ObjectValue {
    let mut data = ObjectValue::empty();
    data.set(&field("balance"), FirestoreValue::from_integer(amount));
    data
}

#[tokio::test]
async fn concurrent_writer_makes_stale_transaction_fail() {
    let store = Arc::new(InMemoryDatastore::new());
    store.seed(key("accounts/a"), seeded(10)).await;
    let reader = UserDataReader::new(db());

    let mut first = Transaction::new(store.clone());
    let mut second = Transaction::new(store.clone());
    first.lookup(&[key("accounts/a")]).await.expect("lookup");
    second.lookup(&[key("accounts/a")]).await.expect("lookup");

    let data = reader
        .parse_set_data("Transaction.set", &balance(20), &SetOptions::default())
        .expect("valid data");
    second.set(key("accounts/a"), &data).expect("queued");
    second.commit().await.expect("first committer wins");

    let data = reader
        .parse_set_data("Transaction.set", &balance(30), &SetOptions::default())
        .expect("valid data");
    first.set(key("accounts/a"), &data).expect("queued");
    let err = first.commit().await.expect_err("stale read");
    assert_eq!(err.code_str(), "firestore/failed-precondition");

    let stored = store.document(&key("accounts/a")).await.expect("exists");
    assert_eq!(stored.field(&field("balance")), Some(&FirestoreValue::from_integer(20)));
    assert_eq!(store.commit_count().await, 2);
}

#[tokio::test]
async fn create_if_missing_only_succeeds_once() {
    let store = Arc::new(InMemoryDatastore::new());
    let reader = UserDataReader::new(db());
    let data = reader
        .parse_set_data("Transaction.set", &balance(1), &SetOptions::default())
        .expect("valid data");

    let mut first = Transaction::new(store.clone());
    let mut second = Transaction::new(store.clone());
    let docs = first.lookup(&[key("accounts/new")]).await.expect("lookup");
    assert!(docs[0].is_no_document());
    second.lookup(&[key("accounts/new")]).await.expect("lookup");

    first.set(key("accounts/new"), &data).expect("queued");
    assert_eq!(first.mutations()[0].precondition(), Precondition::Exists(false));
    first.commit().await.expect("created");

    second.set(key("accounts/new"), &data).expect("queued");
    assert!(second.commit().await.is_err());
}

#[tokio::test]
async fn read_only_transaction_can_verify_its_reads() {
    let store = Arc::new(InMemoryDatastore::new());
    store.seed(key("accounts/a"), seeded(5)).await;

    let mut transaction = Transaction::with_options(
        store.clone(),
        TransactionOptions {
            verify_unwritten_reads: true,
        },
    );
    transaction.lookup(&[key("accounts/a")]).await.expect("lookup");
    let results = transaction.commit().await.expect("verify passes");
    assert_eq!(results.len(), 1);
    assert!(transaction.is_committed());

    let stored = store.document(&key("accounts/a")).await.expect("exists");
    assert_eq!(stored.field(&field("balance")), Some(&FirestoreValue::from_integer(5)));
}
