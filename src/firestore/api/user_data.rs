use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::firestore::api::{DocumentReference, FieldValue};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{GeoPoint, Timestamp};
use crate::firestore::value::BytesValue;

/// Caller supplied data before validation.
///
/// Build it with the `From` conversions, [`UserData::from_serializable`] or
/// the variants directly, then hand it to a
/// [`UserDataReader`](crate::firestore::api::UserDataReader).
#[derive(Clone, Debug, PartialEq)]
pub enum UserData {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Bytes(BytesValue),
    Timestamp(Timestamp),
    GeoPoint(GeoPoint),
    Reference(DocumentReference),
    Array(Vec<UserData>),
    Map(BTreeMap<String, UserData>),
    FieldValue(FieldValue),
}

impl UserData {
    /// Converts any `serde` serializable value through its JSON form.
    ///
    /// Structs and maps become maps, sequences become arrays, integers that
    /// fit in `i64` stay integers and every other number becomes a double.
    pub fn from_serializable<T>(value: &T) -> FirestoreResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_value(value).map_err(|err| {
            invalid_argument(format!("Unable to convert value into document data: {err}"))
        })?;
        Ok(Self::from(json))
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UserData>,
    {
        UserData::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Short description used in validation errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            UserData::Null => "null".to_string(),
            UserData::Boolean(value) => format!("a boolean ({value})"),
            UserData::Integer(value) => format!("a number ({value})"),
            UserData::Double(value) => format!("a number ({value})"),
            UserData::String(value) => format!("a string (\"{value}\")"),
            UserData::Bytes(_) => "a custom Bytes object".to_string(),
            UserData::Timestamp(_) => "a custom Timestamp object".to_string(),
            UserData::GeoPoint(_) => "a custom GeoPoint object".to_string(),
            UserData::Reference(_) => "a custom DocumentReference object".to_string(),
            UserData::Array(_) => "an array".to_string(),
            UserData::Map(_) => "an object".to_string(),
            UserData::FieldValue(value) => format!("{}()", value.method_name()),
        }
    }
}

impl From<bool> for UserData {
    fn from(value: bool) -> Self {
        UserData::Boolean(value)
    }
}

impl From<i64> for UserData {
    fn from(value: i64) -> Self {
        UserData::Integer(value)
    }
}

impl From<i32> for UserData {
    fn from(value: i32) -> Self {
        UserData::Integer(i64::from(value))
    }
}

impl From<f64> for UserData {
    fn from(value: f64) -> Self {
        UserData::Double(value)
    }
}

impl From<&str> for UserData {
    fn from(value: &str) -> Self {
        UserData::String(value.to_string())
    }
}

impl From<String> for UserData {
    fn from(value: String) -> Self {
        UserData::String(value)
    }
}

impl From<BytesValue> for UserData {
    fn from(value: BytesValue) -> Self {
        UserData::Bytes(value)
    }
}

impl From<Timestamp> for UserData {
    fn from(value: Timestamp) -> Self {
        UserData::Timestamp(value)
    }
}

impl From<GeoPoint> for UserData {
    fn from(value: GeoPoint) -> Self {
        UserData::GeoPoint(value)
    }
}

impl From<DocumentReference> for UserData {
    fn from(value: DocumentReference) -> Self {
        UserData::Reference(value)
    }
}

impl From<FieldValue> for UserData {
    fn from(value: FieldValue) -> Self {
        UserData::FieldValue(value)
    }
}

impl<T: Into<UserData>> From<Vec<T>> for UserData {
    fn from(values: Vec<T>) -> Self {
        UserData::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<UserData>> From<Option<T>> for UserData {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(UserData::Null)
    }
}

impl From<BTreeMap<String, UserData>> for UserData {
    fn from(value: BTreeMap<String, UserData>) -> Self {
        UserData::Map(value)
    }
}

impl From<JsonValue> for UserData {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => UserData::Null,
            JsonValue::Bool(value) => UserData::Boolean(value),
            JsonValue::Number(number) => match number.as_i64() {
                Some(integer) => UserData::Integer(integer),
                None => UserData::Double(number.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(value) => UserData::String(value),
            JsonValue::Array(values) => {
                UserData::Array(values.into_iter().map(UserData::from).collect())
            }
            JsonValue::Object(map) => UserData::Map(
                map.into_iter()
                    .map(|(key, value)| (key, UserData::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct City {
        name: String,
        population: u32,
        area: f64,
        tags: Vec<String>,
        mayor: Option<String>,
    }

    #[test]
    fn converts_serializable_structs() {
        let city = City {
            name: "SF".into(),
            population: 860_000,
            area: 121.4,
            tags: vec!["west".into()],
            mayor: None,
        };
        let data = UserData::from_serializable(&city).unwrap();
        let UserData::Map(fields) = data else {
            panic!("expected a map");
        };
        assert_eq!(fields.get("name"), Some(&UserData::from("SF")));
        assert_eq!(fields.get("population"), Some(&UserData::Integer(860_000)));
        assert_eq!(fields.get("area"), Some(&UserData::Double(121.4)));
        assert_eq!(fields.get("tags"), Some(&UserData::from(vec!["west"])));
        assert_eq!(fields.get("mayor"), Some(&UserData::Null));
    }

    #[test]
    fn json_numbers_beyond_i64_become_doubles() {
        let data = UserData::from(json!({ "big": u64::MAX, "small": -3 }));
        let UserData::Map(fields) = data else {
            panic!("expected a map");
        };
        assert_eq!(fields.get("big"), Some(&UserData::Double(u64::MAX as f64)));
        assert_eq!(fields.get("small"), Some(&UserData::Integer(-3)));
    }

    #[test]
    fn map_builder() {
        let data = UserData::map([("a", UserData::from(1_i64)), ("b", UserData::Null)]);
        assert!(matches!(data, UserData::Map(ref fields) if fields.len() == 2));
    }
}
