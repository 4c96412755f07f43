//! Column types the codec accepts.

use arrow::datatypes::{DataType, Schema};
use cinemetrics_core::CodecError;

/// Whether a column type is accepted: booleans, integers, floats, strings
/// and dictionary-encoded (categorical) strings. All-null columns are
/// accepted too, since an outer join can produce them.
pub fn is_supported(data_type: &DataType) -> bool {
    match data_type {
        DataType::Null
        | DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8 => true,
        DataType::Dictionary(key, value) => {
            key.is_dictionary_key_type()
                && matches!(value.as_ref(), DataType::Utf8 | DataType::LargeUtf8)
        }
        _ => false,
    }
}

/// Reject the first column whose type is not supported.
pub fn check_supported(schema: &Schema) -> Result<(), CodecError> {
    match schema
        .fields()
        .iter()
        .find(|field| !is_supported(field.data_type()))
    {
        Some(field) => Err(CodecError::UnsupportedColumn {
            column: field.name().clone(),
            data_type: field.data_type().to_string(),
        }),
        None => Ok(()),
    }
}
