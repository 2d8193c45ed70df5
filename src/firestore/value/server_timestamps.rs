//! Local stand-in for a server timestamp that has not been acknowledged yet.
//!
//! The pending value is a reserved map:
//! `{__type__: "server_timestamp", __local_write_time__: <timestamp>, __previous_value__?: <value>}`.
//! It sorts after every timestamp and before every string.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::firestore::constants::{
    LOCAL_WRITE_TIME_KEY, PREVIOUS_VALUE_KEY, SERVER_TIMESTAMP_SENTINEL, TYPE_KEY,
};
use crate::firestore::error::{invalid_argument, FirestoreError};
use crate::firestore::model::Timestamp;
use crate::firestore::value::{FirestoreValue, ValueKind};

pub fn server_timestamp(
    local_write_time: Timestamp,
    previous_value: Option<&FirestoreValue>,
) -> FirestoreValue {
    let mut fields = BTreeMap::new();
    fields.insert(
        TYPE_KEY.to_string(),
        FirestoreValue::from_string(SERVER_TIMESTAMP_SENTINEL),
    );
    fields.insert(
        LOCAL_WRITE_TIME_KEY.to_string(),
        FirestoreValue::from_timestamp(local_write_time),
    );

    // Only keep one level: a pending value never wraps another pending value.
    let previous_value = match previous_value {
        Some(value) if is_server_timestamp(value) => get_previous_value(value),
        other => other,
    };
    if let Some(previous) = previous_value {
        fields.insert(PREVIOUS_VALUE_KEY.to_string(), previous.clone());
    }
    FirestoreValue::from_map(fields)
}

pub fn is_server_timestamp(value: &FirestoreValue) -> bool {
    match value.kind() {
        ValueKind::Map(map) => matches!(
            map.get(TYPE_KEY).map(FirestoreValue::kind),
            Some(ValueKind::String(kind)) if kind == SERVER_TIMESTAMP_SENTINEL
        ),
        _ => false,
    }
}

/// Value the field held before the pending write, if any.
pub fn get_previous_value(value: &FirestoreValue) -> Option<&FirestoreValue> {
    let previous = value.as_map()?.get(PREVIOUS_VALUE_KEY)?;
    if is_server_timestamp(previous) {
        return get_previous_value(previous);
    }
    Some(previous)
}

pub fn get_local_write_time(value: &FirestoreValue) -> Timestamp {
    value
        .as_map()
        .and_then(|map| map.get(LOCAL_WRITE_TIME_KEY))
        .and_then(FirestoreValue::as_timestamp)
        .unwrap_or_else(|| Timestamp::new(0, 0))
}

/// How pending server timestamps read back before the write is acknowledged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServerTimestampBehavior {
    /// Pending timestamps read as null.
    #[default]
    None,
    /// Pending timestamps read as the local write time.
    Estimate,
    /// Pending timestamps read as the value they replaced, or null.
    Previous,
}

impl FromStr for ServerTimestampBehavior {
    type Err = FirestoreError;

    /// Parses the `serverTimestamps` snapshot option.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "estimate" => Ok(Self::Estimate),
            "previous" => Ok(Self::Previous),
            other => Err(invalid_argument(format!(
                "Unknown serverTimestamps option: {other}. Expected 'none', 'estimate' or 'previous'"
            ))),
        }
    }
}

/// Replaces every pending server timestamp in `value`, at any depth, with
/// what `behavior` asks for. Other values come back unchanged.
pub fn resolve_server_timestamps(
    value: &FirestoreValue,
    behavior: ServerTimestampBehavior,
) -> FirestoreValue {
    if is_server_timestamp(value) {
        return match behavior {
            ServerTimestampBehavior::None => FirestoreValue::null(),
            ServerTimestampBehavior::Estimate => {
                FirestoreValue::from_timestamp(get_local_write_time(value))
            }
            ServerTimestampBehavior::Previous => get_previous_value(value)
                .map(|previous| resolve_server_timestamps(previous, behavior))
                .unwrap_or_else(FirestoreValue::null),
        };
    }
    match value.kind() {
        ValueKind::Array(array) => FirestoreValue::from_array(
            array
                .iter()
                .map(|element| resolve_server_timestamps(element, behavior))
                .collect(),
        ),
        ValueKind::Map(map) => FirestoreValue::from_map(
            map.fields()
                .iter()
                .map(|(key, field)| (key.clone(), resolve_server_timestamps(field, behavior)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
