//! Error types for OWS parsing and encoding.

use thiserror::Error;

/// Errors raised while reading or writing OWS documents.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OwsError {
    /// The document is not well-formed XML.
    #[error("XML parse error: {message}")]
    Parse { message: String },

    /// Writing an XML document failed.
    #[error("XML write error: {message}")]
    Write { message: String },

    /// A locator expression could not be parsed.
    #[error("invalid locator '{locator}': {message}")]
    InvalidLocator { locator: String, message: String },

    /// The service answered with an OWS exception report.
    #[error("service exception: {message}")]
    ServiceException { message: String },

    /// An expected element is missing from a service response.
    #[error("missing element '{element}' in {document}")]
    MissingElement { element: String, document: String },
}

impl OwsError {
    pub(crate) fn parse(err: impl std::fmt::Display) -> Self {
        OwsError::Parse {
            message: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        OwsError::Write {
            message: err.to_string(),
        }
    }
}

/// Result alias for OWS operations.
pub type Result<T> = std::result::Result<T, OwsError>;
