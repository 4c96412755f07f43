//! Cinemetrics Codec - Columnar Payloads
//!
//! Moves query results from the fetch stage to the render stage through
//! text-only client storage. A table is written as an Arrow IPC stream
//! (schema first, then column buffers), framed with a versioned header and
//! checksum, and wrapped in base64.
//!
//! ```ignore
//! let payload = cinemetrics_codec::encode(&table)?;
//! let back = cinemetrics_codec::decode(payload.as_str())?;
//! assert_eq!(back, table);
//! ```

pub mod envelope;
pub mod schema;

pub use envelope::FORMAT_VERSION;

use arrow::compute::concat_batches;
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use cinemetrics_core::{CodecError, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// An encoded table in its transport form.
///
/// Opaque base64 text; stable for a given format version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedTable(String);

impl EncodedTable {
    /// Wrap text received from storage. Validity is only checked by
    /// [`decode`].
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode back into a table.
    pub fn decode(&self) -> Result<Table, CodecError> {
        decode(&self.0)
    }
}

impl fmt::Display for EncodedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedTable({} chars)", self.0.len())
    }
}

fn ipc_error(e: ArrowError) -> CodecError {
    CodecError::Ipc {
        reason: e.to_string(),
    }
}

/// Encode a table into its transport form.
///
/// Fails with [`CodecError::UnsupportedColumn`] if any column has a type
/// outside the supported set.
pub fn encode(table: &Table) -> Result<EncodedTable, CodecError> {
    let schema = table.schema();
    schema::check_supported(&schema)?;

    let mut body = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut body, &schema).map_err(ipc_error)?;
        writer.write(table).map_err(ipc_error)?;
        writer.finish().map_err(ipc_error)?;
    }
    Ok(EncodedTable(envelope::seal(&body)))
}

/// Decode a transport payload back into a table.
///
/// Never returns partial data: a bad envelope, an unknown format version,
/// a checksum mismatch or an unreadable IPC stream are all errors.
pub fn decode(text: &str) -> Result<Table, CodecError> {
    let body = envelope::open(text)?;
    let mut reader = StreamReader::try_new(Cursor::new(body), None).map_err(ipc_error)?;
    let schema = reader.schema();
    schema::check_supported(&schema)?;

    let mut batches = reader
        .by_ref()
        .collect::<Result<Vec<RecordBatch>, ArrowError>>()
        .map_err(ipc_error)?;

    match batches.len() {
        0 => Ok(RecordBatch::new_empty(schema)),
        1 => Ok(batches.remove(0)),
        _ => concat_batches(&schema, &batches).map_err(ipc_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        ArrayRef, BooleanArray, DictionaryArray, Float64Array, Int64Array, StringArray,
    };
    use arrow::datatypes::{DataType, Field, Int32Type, Schema};
    use std::sync::Arc;

    fn mixed_table() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("movie_title", DataType::Utf8, true),
            Field::new("release_year", DataType::Int64, false),
            Field::new("average_rating", DataType::Float64, true),
            Field::new("is_adult", DataType::Boolean, true),
            Field::new(
                "genre",
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                true,
            ),
        ]));
        let genre: DictionaryArray<Int32Type> =
            vec![Some("Drama"), None, Some("Drama")].into_iter().collect();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![Some("Heat"), None, Some("Ran")])),
            Arc::new(Int64Array::from(vec![1995, 2001, 1985])),
            Arc::new(Float64Array::from(vec![Some(8.3), Some(6.1), None])),
            Arc::new(BooleanArray::from(vec![Some(false), None, Some(false)])),
            Arc::new(genre),
        ];
        RecordBatch::try_new(schema, columns).unwrap()
    }

    #[test]
    fn test_mixed_table_round_trips() {
        let table = mixed_table();
        let encoded = encode(&table).unwrap();
        let decoded = decode(encoded.as_str()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.schema(), table.schema());
    }

    #[test]
    fn test_empty_table_keeps_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("movie_title", DataType::Utf8, true),
            Field::new("average_rating", DataType::Float64, true),
        ]));
        let table = RecordBatch::new_empty(schema.clone());
        let decoded = encode(&table).unwrap().decode().unwrap();
        assert_eq!(decoded.num_rows(), 0);
        assert_eq!(decoded.schema(), schema);
    }

    #[test]
    fn test_unsupported_column_is_an_encode_error() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "released",
            DataType::Date32,
            false,
        )]));
        let table = RecordBatch::new_empty(schema);
        assert!(matches!(
            encode(&table),
            Err(CodecError::UnsupportedColumn { column, .. }) if column == "released"
        ));
    }

    #[test]
    fn test_malformed_payloads_are_distinguishable_errors() {
        assert!(matches!(decode(""), Err(CodecError::Envelope { .. })));
        assert!(matches!(decode("%%%"), Err(CodecError::Envelope { .. })));

        // Valid frame around an 8-byte message that is not a flatbuffer.
        let garbage = envelope::seal(&[8, 0, 0, 0, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(decode(&garbage), Err(CodecError::Ipc { .. })));
    }

    #[test]
    fn test_encoded_table_serializes_as_plain_string() {
        let encoded = EncodedTable::from_text("QUJD");
        assert_eq!(serde_json::to_string(&encoded).unwrap(), "\"QUJD\"");
        assert_eq!(encoded.to_string(), "EncodedTable(4 chars)");
    }
}
