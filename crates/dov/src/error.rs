//! Error types for the DOV client.
//!
//! [`DovError`] is the single error returned by search operations. Transport,
//! coercion, registry and output failures have their own enums and are
//! wrapped transparently, so callers can match on the category first and on
//! the details second.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use helios_ows::OwsError;
use thiserror::Error;

use crate::value::ValueType;

/// The primary error type for all DOV operations.
#[derive(Error, Debug)]
pub enum DovError {
    /// Both or neither of query and location were given.
    #[error("invalid search parameters: {message}")]
    InvalidSearchParameter { message: String },

    /// A return field or query field is not known for the record type.
    #[error("unknown field '{field}' for record type '{record_type}'")]
    UnknownField { record_type: String, field: String },

    /// The query expression does not parse.
    #[error("malformed query '{query}': {message}")]
    MalformedQuery { query: String, message: String },

    /// Listing or detail retrieval failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A detail document could not be parsed or lacks a required value.
    #[error("cannot resolve detail document of '{identity}': {message}")]
    DetailFetch { identity: String, message: String },

    /// Raw text could not be converted to the field type
    #[error(transparent)]
    TypeCoercion(#[from] CoercionError),

    /// Invalid record type definition
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Table materialization failed
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Configuration did not validate.
    #[error("invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),
}

impl DovError {
    pub fn invalid_search(message: impl Into<String>) -> Self {
        DovError::InvalidSearchParameter {
            message: message.into(),
        }
    }

    pub fn unknown_field(record_type: impl Into<String>, field: impl Into<String>) -> Self {
        DovError::UnknownField {
            record_type: record_type.into(),
            field: field.into(),
        }
    }

    pub fn malformed_query(query: impl Into<String>, message: impl Into<String>) -> Self {
        DovError::MalformedQuery {
            query: query.into(),
            message: message.into(),
        }
    }

    pub fn detail_fetch(identity: impl Into<String>, message: impl Into<String>) -> Self {
        DovError::DetailFetch {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's input rather than the
    /// service or the data.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DovError::InvalidSearchParameter { .. }
                | DovError::UnknownField { .. }
                | DovError::MalformedQuery { .. }
        )
    }
}

/// Errors raised by a [`Transport`](crate::transport::Transport) or
/// [`SchemaService`](crate::transport::SchemaService).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with an error status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The service returned an exception report.
    #[error("service exception: {message}")]
    Service { message: String },

    /// The response is not the expected document.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// The transport has no answer for this request.
    #[error("not found: {what}")]
    NotFound { what: String },
}

impl From<OwsError> for TransportError {
    fn from(err: OwsError) -> Self {
        match err {
            OwsError::ServiceException { message } => TransportError::Service { message },
            other => TransportError::InvalidResponse {
                message: other.to_string(),
            },
        }
    }
}

/// A raw value that cannot be converted to its declared type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "cannot convert '{raw}' to {target}{}: {message}",
    .field.as_ref().map(|f| format!(" for field '{}'", f)).unwrap_or_default()
)]
pub struct CoercionError {
    pub field: Option<String>,
    pub raw: String,
    pub target: ValueType,
    pub message: String,
}

impl CoercionError {
    pub fn new(raw: impl Into<String>, target: ValueType, message: impl Into<String>) -> Self {
        Self {
            field: None,
            raw: raw.into(),
            target,
            message: message.into(),
        }
    }

    /// Attaches the name of the field being converted.
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Errors in record type definitions and registry lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A field name is used twice within one record type.
    #[error("duplicate field '{field}' in record type '{record_type}'")]
    DuplicateField { record_type: String, field: String },

    /// A value type tag is not one of the supported types.
    #[error("unknown value type '{tag}'")]
    UnknownValueType { tag: String },

    /// A record type definition is inconsistent.
    #[error("invalid definition of record type '{record_type}': {message}")]
    InvalidDefinition { record_type: String, message: String },

    /// A field locator does not parse.
    #[error("invalid locator for field '{field}': {message}")]
    InvalidLocator { field: String, message: String },

    /// The record type is not registered.
    #[error("unknown record type '{name}'")]
    UnknownRecordType { name: String },

    /// A record type with this name is already registered.
    #[error("record type '{name}' is already registered")]
    DuplicateRecordType { name: String },
}

/// Errors while materializing a result table.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow conversion failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet output failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for DOV operations.
pub type Result<T> = std::result::Result<T, DovError>;
