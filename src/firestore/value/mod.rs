mod array_value;
mod json;
mod map_value;
mod value;

pub use array_value::ArrayValue;
pub use json::{data_from_json, data_to_json};
pub use map_value::MapValue;
pub use value::{DocumentData, FirestoreValue, ValueKind};
