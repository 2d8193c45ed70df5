use firebase_firestore_model::firestore::model::FieldPath;

#[test]
fn dotted_paths_split_into_segments() {
    let path = FieldPath::from_dot_separated("address.city").expect("valid path");
    assert_eq!(path.segments(), ["address", "city"]);
    assert_eq!(path.canonical_string(), "address.city");
}

#[test]
fn rejects_malformed_dotted_paths() {
    for bad in ["", ".a", "a.", "a..b", "a~b", "a*b", "a/b", "a[0]"] {
        let err = FieldPath::from_dot_separated(bad).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument", "{bad}");
    }
}

#[test]
fn server_format_round_trips_special_segments() {
    let path = FieldPath::new(["plain", "with.dot", "back`tick", "1st"]).expect("valid path");
    let encoded = path.server_format();
    assert_eq!(FieldPath::from_server_format(&encoded).expect("parses"), path);
    assert!(encoded.starts_with("plain."));
}

#[test]
fn prefixes_follow_segments() {
    let a = FieldPath::from_dot_separated("a").expect("valid path");
    let ab = FieldPath::from_dot_separated("a.b").expect("valid path");
    let abc = FieldPath::from_dot_separated("a.bc").expect("valid path");
    assert!(a.is_prefix_of(&ab));
    assert!(a.is_prefix_of(&abc));
    assert!(!ab.is_prefix_of(&abc));
    assert!(a < ab);
}
