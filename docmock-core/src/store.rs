//! Main document store interface.
//!
//! [`DocumentStore`] owns a backend and hands out collection handles. There is no global
//! registry: callers create a store and pass it to whatever needs it.
//!
//! # Example
//!
//! ```ignore
//! use docmock::{store::DocumentStore, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.typed_collection::<User>();
//! let audit = store.collection("audit");
//!
//! println!("{}", store.dump()?);
//! ```

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
    record::Record,
    value::Document,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed collection named after the record type's `collection_name()`.
    pub fn typed_collection<'a, R: Record>(&'a self) -> TypedCollection<'a, B, R> {
        TypedCollection::new(R::collection_name().to_string(), &self.backend)
    }

    /// Gets an untyped collection with the given name. The collection is created on first use.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Creates an empty collection. Creating an existing collection is a no-op.
    pub fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.create_collection(name)
    }

    /// Drops a collection and its documents.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if no such collection exists.
    pub fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name)
    }

    /// Lists collection names in lexicographic order.
    pub fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections()
    }

    /// Renders every collection as pretty-printed JSON, keyed by collection name.
    ///
    /// Identifiers render as `{"$oid": ...}` and timestamps as `{"$date": ...}`. Each
    /// collection is read under its own lock, so the dump is not a cross-collection snapshot.
    pub fn dump(&self) -> DocumentStoreResult<String> {
        let mut snapshot = Document::new();

        for name in self.backend.list_collections()? {
            let documents = self.backend.find_documents(&name, &Query::new())?;
            snapshot.insert(name, documents);
        }

        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Renders one collection as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if no such collection exists.
    pub fn dump_collection(&self, name: &str) -> DocumentStoreResult<String> {
        if !self.backend.list_collections()?.iter().any(|existing| existing == name) {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        let documents = self.backend.find_documents(name, &Query::new())?;
        Ok(serde_json::to_string_pretty(&documents)?)
    }
}
