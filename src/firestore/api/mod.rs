pub(crate) mod field_value;
mod reference;
mod user_data;
mod user_data_reader;

pub use field_value::FieldValue;
pub use reference::DocumentReference;
pub use user_data::UserData;
pub use user_data_reader::{
    ParsedSetData, ParsedUpdateData, SetOptions, UserDataReader, UserDataSource,
};
