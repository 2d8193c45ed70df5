mod array_value;
mod bytes_value;
mod map_value;
mod ordering;
mod server_timestamps;
mod value;

pub use array_value::ArrayValue;
pub use bytes_value::BytesValue;
pub use map_value::MapValue;
pub use ordering::TypeOrder;
pub use server_timestamps::{
    get_local_write_time, get_previous_value, is_server_timestamp, resolve_server_timestamps,
    server_timestamp, ServerTimestampBehavior,
};
pub use value::{FirestoreValue, ReferenceValue, ValueKind};

/// True when `haystack` holds an element equal to `needle`.
pub fn array_value_contains(haystack: &ArrayValue, needle: &FirestoreValue) -> bool {
    haystack.contains(needle)
}
