pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Field name the backend uses to address the document id.
pub const DOCUMENT_KEY_NAME: &str = "__name__";

pub(crate) const SERVER_TIMESTAMP_SENTINEL: &str = "server_timestamp";
pub(crate) const TYPE_KEY: &str = "__type__";
pub(crate) const PREVIOUS_VALUE_KEY: &str = "__previous_value__";
pub(crate) const LOCAL_WRITE_TIME_KEY: &str = "__local_write_time__";

pub(crate) const NANOS_PER_SECOND: i32 = 1_000_000_000;
