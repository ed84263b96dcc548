//! Collaborator adapter traits.
//!
//! The engine never performs I/O. Hosts implement these traits and inject
//! them; inside the core, only the query loop touches a `RecordSet`, and
//! every failure crossing the boundary becomes
//! `EvalErrorKind::External`.

use thiserror::Error;

use crate::Value;

/// Failure reported by a host collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        ExternalError {
            message: message.into(),
        }
    }
}

/// Tabular data iterated by the query loop form.
///
/// Rows are addressed by index; the loop binds each row as an object keyed
/// by column name.
pub trait RecordSet: Send + Sync {
    fn record_count(&self) -> usize;
    fn columns(&self) -> Vec<String>;
    /// Values of one row, in `columns()` order. Out-of-range rows return
    /// an empty vector.
    fn row(&self, index: usize) -> Vec<Value>;
}

/// Executes a statement against a host datasource.
pub trait QueryExecutor: Send + Sync {
    fn run(
        &self,
        statement: &str,
        params: &[Value],
    ) -> Result<Box<dyn RecordSet>, ExternalError>;
}

/// An outbound HTTP call, as the host chooses to interpret it.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

pub trait HttpInvoker: Send + Sync {
    fn call(&self, request: HttpRequest) -> Result<HttpResponse, ExternalError>;
}

/// In-memory `RecordSet`, convenient for hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryRecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        MemoryRecordSet { columns, rows }
    }
}

impl RecordSet for MemoryRecordSet {
    fn record_count(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn row(&self, index: usize) -> Vec<Value> {
        self.rows.get(index).cloned().unwrap_or_default()
    }
}
