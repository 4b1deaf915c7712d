//! In-memory storage implementation for document stores.
//!
//! Each collection is an ordered `Vec` of documents behind its own mutex. The registry
//! mapping names to collections has a separate mutex that is only held to create or fetch
//! a handle, never while a collection lock is held.

use std::{collections::HashMap, sync::Arc};

use bson::oid::ObjectId;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use docmock_core::{
    backend::{StoreBackend, StoreBackendBuilder, Target},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    update::UpdateDirective,
    value::{Document, Value},
};

use crate::{cursor::InMemoryCursor, evaluator::DocumentEvaluator, updater::apply_directive};

type Registry = HashMap<String, Arc<CollectionHandle>>;

/// One named collection: documents in insertion order.
#[derive(Debug)]
pub(crate) struct CollectionHandle {
    pub(crate) name: String,
    pub(crate) documents: Mutex<Vec<Document>>,
}

impl CollectionHandle {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), documents: Mutex::new(Vec::new()) }
    }
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cheap to clone; clones share the same collections. Every operation
/// holds the collection's lock for its whole scan, so operations on one collection are
/// serialized while different collections never contend.
///
/// # Example
///
/// ```ignore
/// use docmock_memory::InMemoryStore;
/// use docmock::{backend::StoreBackend, doc};
///
/// let store = InMemoryStore::new();
/// store.insert_documents("users", vec![doc! { "name": "Alice", "age": 30 }])?;
///
/// let found = store.find_one("users", &doc! { "age": { "$gte": 18 } })?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    collections: Arc<Mutex<Registry>>,
    /// Assign a fresh ObjectId `_id` to inserted documents that lack one.
    generate_ids: bool,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// ```ignore
    /// let store = InMemoryStore::builder()
    ///     .generate_ids(true)
    ///     .with_collection("users")
    ///     .build()?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Fetches a collection handle, creating the collection on first access.
    fn handle(&self, name: &str) -> Arc<CollectionHandle> {
        let mut collections = self.collections.lock();

        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!(collection = name, "created collection");
                Arc::new(CollectionHandle::new(name))
            })
            .clone()
    }
}

fn parse_filter(collection: &str, filter: &Document) -> DocumentStoreResult<Expr> {
    Expr::parse(filter).inspect_err(|err| warn!(collection, error = %err, "rejected filter"))
}

fn not_found(collection: &str) -> DocumentStoreError {
    DocumentStoreError::DocumentNotFound(collection.to_string())
}

/// Positions of the matching documents, in collection order.
fn matching_positions(documents: &[Document], expr: &Expr, target: Target) -> DocumentStoreResult<Vec<usize>> {
    let mut positions = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if DocumentEvaluator::new(document).evaluate(expr)? {
            positions.push(position);

            if target == Target::First {
                break;
            }
        }
    }

    Ok(positions)
}

impl StoreBackend for InMemoryStore {
    type Cursor = InMemoryCursor;

    fn insert_documents(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<()> {
        let documents = if self.generate_ids {
            documents
                .into_iter()
                .map(|mut document| {
                    if !document.contains_key("_id") {
                        document.insert("_id", ObjectId::new());
                    }
                    document
                })
                .collect()
        } else {
            documents
        };

        let count = documents.len();
        self.handle(collection).documents.lock().extend(documents);

        debug!(collection, count, "inserted documents");
        Ok(())
    }

    fn find_documents(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Document>> {
        let expr = parse_filter(collection, &query.filter)?;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        let handle = self.handle(collection);
        let documents = handle.documents.lock();

        let mut found = Vec::new();
        let mut matched = 0;

        for document in documents.iter() {
            if found.len() >= limit {
                break;
            }

            if DocumentEvaluator::new(document).evaluate(&expr)? {
                if matched >= offset {
                    found.push(document.clone());
                }
                matched += 1;
            }
        }

        Ok(found)
    }

    fn find_one(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Option<Document>> {
        let expr = parse_filter(collection, filter)?;
        let handle = self.handle(collection);
        let documents = handle.documents.lock();

        Ok(matching_positions(&documents, &expr, Target::First)?
            .first()
            .map(|position| documents[*position].clone()))
    }

    fn cursor(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Self::Cursor> {
        let expr = parse_filter(collection, filter)?;
        Ok(InMemoryCursor::new(self.handle(collection), expr))
    }

    fn count_documents(&self, collection: &str, filter: &Document) -> DocumentStoreResult<usize> {
        let expr = parse_filter(collection, filter)?;
        let handle = self.handle(collection);
        let documents = handle.documents.lock();

        Ok(matching_positions(&documents, &expr, Target::All)?.len())
    }

    fn delete_documents(&self, collection: &str, filter: &Document, target: Target) -> DocumentStoreResult<usize> {
        let expr = parse_filter(collection, filter)?;
        let handle = self.handle(collection);
        let mut documents = handle.documents.lock();

        let positions = matching_positions(&documents, &expr, target)?;
        if positions.is_empty() {
            debug!(collection, "delete matched no documents");
            return Err(not_found(collection));
        }

        for position in positions.iter().rev() {
            documents.remove(*position);
        }

        debug!(collection, count = positions.len(), "deleted documents");
        Ok(positions.len())
    }

    fn replace_document(&self, collection: &str, filter: &Document, replacement: Document) -> DocumentStoreResult<()> {
        let expr = parse_filter(collection, filter)?;
        let handle = self.handle(collection);
        let mut documents = handle.documents.lock();

        let Some(position) = matching_positions(&documents, &expr, Target::First)?.first().copied() else {
            debug!(collection, "replace matched no documents");
            return Err(not_found(collection));
        };

        let mut replacement = replacement;
        if !replacement.contains_key("_id") {
            if let Some(id) = documents[position].id() {
                replacement.insert("_id", id.clone());
            }
        }
        documents[position] = replacement;

        debug!(collection, position, "replaced document");
        Ok(())
    }

    fn update_documents(
        &self,
        collection: &str,
        filter: &Document,
        update: &Value,
        target: Target,
    ) -> DocumentStoreResult<usize> {
        let expr = parse_filter(collection, filter)?;
        let directive = UpdateDirective::parse(update)
            .inspect_err(|err| warn!(collection, error = %err, "rejected update"))?;

        let handle = self.handle(collection);
        let mut documents = handle.documents.lock();

        let positions = matching_positions(&documents, &expr, target)?;
        if positions.is_empty() {
            debug!(collection, "update matched no documents");
            return Err(not_found(collection));
        }

        // Build every replacement before swapping any in.
        let updated = positions
            .iter()
            .map(|position| apply_directive(&documents[*position], &directive))
            .collect::<DocumentStoreResult<Vec<_>>>()
            .inspect_err(|err| warn!(collection, error = %err, "update failed, collection unchanged"))?;

        let count = updated.len();
        for (position, document) in positions.into_iter().zip(updated) {
            documents[position] = document;
        }

        debug!(collection, count, "updated documents");
        Ok(count)
    }

    fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.handle(name);
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if self.collections.lock().remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        debug!(collection = name, "dropped collection");
        Ok(())
    }

    fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.collections.lock().keys().cloned().collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmock_memory::InMemoryStore;
/// use docmock::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .generate_ids(true)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    generate_ids: bool,
    collections: Vec<String>,
}

impl InMemoryStoreBuilder {
    /// Assign a fresh ObjectId `_id` to inserted documents that lack one. Off by default.
    pub fn generate_ids(mut self, enabled: bool) -> Self {
        self.generate_ids = enabled;
        self
    }

    /// Creates the named collection when the store is built.
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collections.push(name.into());
        self
    }
}

impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore { generate_ids: self.generate_ids, ..InMemoryStore::default() };

        for name in &self.collections {
            store.create_collection(name)?;
        }

        Ok(store)
    }
}
