//! Storage backend abstraction for the document store.
//!
//! The [`StoreBackend`] trait is the seam between the collection facades and a concrete
//! storage implementation. Every method is synchronous and runs to completion: a backend
//! holds whatever lock guards the collection for the whole scan, match and rewrite.
//!
//! Filters arrive as raw [`Document`]s and updates as raw [`Value`]s. Backends parse them
//! with [`Expr::parse`](crate::query::Expr::parse) and
//! [`UpdateDirective::parse`](crate::update::UpdateDirective::parse) before touching any
//! stored document, so a rejected expression never leaves a collection half-modified.
//!
//! # Example
//!
//! ```ignore
//! use docmock::{backend::{StoreBackend, Target}, doc};
//!
//! backend.insert_documents("users", vec![doc! { "name": "Alice", "age": 30 }])?;
//! let removed = backend.delete_documents("users", &doc! { "age": { "$lt": 18 } }, Target::All)?;
//! ```

use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::Query,
    value::{Document, Value},
};

/// How many matching documents a mutation affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Only the first match in collection order.
    First,
    /// Every match.
    All,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be shareable across threads. Operations on one collection are
/// serialized; operations on different collections must not contend.
///
/// # Errors
///
/// Mutations that match nothing return
/// [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound), and a failed
/// mutation leaves the collection unchanged.
pub trait StoreBackend: Send + Sync + Debug {
    /// Lazy, single-pass iterator over the documents matching a filter.
    type Cursor: Iterator<Item = DocumentStoreResult<Document>>;

    /// Appends documents to a collection, creating it on first access.
    fn insert_documents(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<()>;

    /// Returns the documents matching the query in collection order, after `offset` and `limit`.
    fn find_documents(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first document matching the filter.
    fn find_one(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Option<Document>>;

    /// Opens a cursor over the documents matching the filter.
    ///
    /// The filter is validated immediately; documents are matched as the cursor advances.
    fn cursor(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Self::Cursor>;

    /// Counts the documents matching the filter.
    fn count_documents(&self, collection: &str, filter: &Document) -> DocumentStoreResult<usize>;

    /// Removes matching documents, keeping the relative order of the survivors.
    ///
    /// Returns the number removed.
    fn delete_documents(
        &self,
        collection: &str,
        filter: &Document,
        target: Target,
    ) -> DocumentStoreResult<usize>;

    /// Substitutes the first matching document with `replacement`.
    ///
    /// A replacement without `_id` keeps the identifier of the document it replaces.
    fn replace_document(
        &self,
        collection: &str,
        filter: &Document,
        replacement: Document,
    ) -> DocumentStoreResult<()>;

    /// Applies an update directive to matching documents.
    ///
    /// Returns the number of documents updated.
    fn update_documents(
        &self,
        collection: &str,
        filter: &Document,
        update: &Value,
        target: Target,
    ) -> DocumentStoreResult<usize>;

    /// Creates an empty collection. Creating an existing collection is a no-op.
    fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all of its documents.
    fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists collection names in lexicographic order.
    fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
}

/// Factory trait for creating backend instances.
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    fn build(self) -> DocumentStoreResult<Self::Backend>;
}
