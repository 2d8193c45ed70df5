use std::cmp::Ordering;

use firebase_firestore_model::firestore::model::{DocumentKey, ResourcePath};

fn resource_path(path: &str) -> ResourcePath {
    ResourcePath::from_string(path).expect("valid path")
}

#[test]
fn indexes_into_segments() {
    let path = ResourcePath::from_segments(["rooms", "Eros", "messages"]);
    assert_eq!(path.get(0), Some("rooms"));
    assert_eq!(path.get(2), Some("messages"));
    assert_eq!(path.get(3), None);
}

#[test]
fn parses_slash_separated_strings() {
    assert_eq!(resource_path("/rooms/Eros/"), ResourcePath::from_segments(["rooms", "Eros"]));
    assert!(resource_path("").is_empty());
    assert!(ResourcePath::from_string("rooms//Eros").is_err());
}

#[test]
fn pops_leading_segments() {
    let path = ResourcePath::from_segments(["rooms", "Eros", "messages"]);
    assert_eq!(path.pop_first_n(0), path);
    assert_eq!(path.pop_first_n(2), ResourcePath::from_segments(["messages"]));
    assert!(path.pop_first_n(3).is_empty());
    assert!(path.pop_first_n(7).is_empty());
}

#[test]
fn creates_child_and_parent_paths() {
    let base = resource_path("rooms");
    assert_eq!(base.child(["eros"]).child(["1"]), resource_path("rooms/eros/1"));
    assert_eq!(resource_path("rooms/eros/1").without_last(), resource_path("rooms/eros"));
    assert_eq!(base.last_segment(), Some("rooms"));
}

#[test]
fn compares_segment_by_segment() {
    let cmp = |a: &str, b: &str| ResourcePath::comparator(&resource_path(a), &resource_path(b));
    assert_eq!(cmp("", ""), Ordering::Equal);
    assert_eq!(cmp("a/b/c", "a/b/c"), Ordering::Equal);
    assert_eq!(cmp("", "a"), Ordering::Less);
    assert_eq!(cmp("a", "b"), Ordering::Less);
    assert_eq!(cmp("a", "a/b"), Ordering::Less);
    assert_eq!(cmp("b", "a/b"), Ordering::Greater);
}

#[test]
fn determines_prefix() {
    let empty = ResourcePath::root();
    let a = resource_path("a");
    let ab = resource_path("a/b");
    let ba = resource_path("b/a");

    assert!(empty.is_prefix_of(&a));
    assert!(empty.is_prefix_of(&empty));
    assert!(a.is_prefix_of(&ab));
    assert!(ab.is_prefix_of(&ab));
    assert!(!ab.is_prefix_of(&a));
    assert!(!a.is_prefix_of(&ba));
}

#[test]
fn document_keys_need_an_even_number_of_segments() {
    let key = DocumentKey::from_string("rooms/Eros/messages/1").expect("document path");
    assert_eq!(key.id(), "1");
    assert_eq!(key.collection_path(), resource_path("rooms/Eros/messages"));
    assert!(DocumentKey::from_string("rooms/Eros/messages").is_err());
}
