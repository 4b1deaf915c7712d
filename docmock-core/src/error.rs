//! Error types and result types for document store operations.
//!
//! Every fallible call in the workspace returns [`DocumentStoreResult<T>`]. The variants
//! separate the four kinds of failure callers care about: a filter that matched nothing,
//! an expression that is wrong, an expression this engine does not implement, and a
//! record that cannot be mapped into the value model.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// No document in the collection satisfied the filter of a targeted operation.
    /// The argument is the collection name.
    #[error("No document matched the filter in collection {0}")]
    DocumentNotFound(String),
    /// A filter uses an operator with an operand of the wrong shape, or an unknown operator.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),
    /// An update directive has the wrong shape or cannot be applied to the target document.
    #[error("Malformed update: {0}")]
    MalformedUpdate(String),
    /// The operator is part of the query language but this engine does not implement it.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// A native record could not be converted to or from the value model.
    #[error("Conversion error: {0}")]
    Conversion(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

impl DocumentStoreError {
    /// Returns `true` for the expected, non-fatal "nothing matched" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(_))
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Conversion(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Conversion(err.to_string())
    }
}
