//! The warehouse seam.
//!
//! The warehouse client and its SQL live outside this workspace; everything
//! here only needs something that turns a [`QueryRequest`] into a table.

use crate::error::FetchError;
use crate::query::QueryRequest;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Tabular query result. Arrow record batches are columnar and cheap to
/// clone (columns are reference counted).
pub type Table = RecordBatch;

/// External data source executing dashboard queries.
///
/// Implementations may be slow and may fail. Callers make exactly one
/// attempt per triggering event; retries are not part of the contract.
pub trait DataSource: Send + Sync {
    /// Run one query and return its full result.
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError>;
}

impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        (**self).fetch_query(request)
    }
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        (**self).fetch_query(request)
    }
}
