//! Collection handles for document store operations.
//!
//! - [`Collection`] works on raw [`Document`]s.
//! - [`TypedCollection`] converts to and from a [`Record`] type at the boundary.
//!
//! Both borrow the backend and hold only the collection name; creating one is free.
//!
//! # Example
//!
//! ```ignore
//! use docmock::{doc, query::Filter, update::Update};
//!
//! let users = store.typed_collection::<User>();
//! users.insert(vec![alice.clone(), bob.clone()])?;
//!
//! let adults = users.find(Filter::gte("age", 18))?;
//! users.update_first(Filter::id(alice.id), Update::new().set("age", 31))?;
//! users.delete_all(doc! { "age": { "$lt": 18 } })?;
//! ```

use std::marker::PhantomData;

use crate::{
    backend::{StoreBackend, Target},
    error::DocumentStoreResult,
    query::{Filter, Query},
    record::{Record, RecordExt},
    value::{Document, Value},
};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends documents to the collection in order.
    pub fn insert(&self, documents: Vec<Document>) -> DocumentStoreResult<()> {
        self.backend.insert_documents(&self.name, documents)
    }

    /// Returns every document matching the query, in collection order.
    ///
    /// Accepts a [`Query`] or a bare filter [`Document`].
    pub fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<Vec<Document>> {
        self.backend.find_documents(&self.name, &query.into())
    }

    /// Returns the first document matching the filter, if any.
    pub fn find_one(&self, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.backend.find_one(&self.name, &filter)
    }

    /// Returns the document whose `_id` equals `id`.
    pub fn find_by_id(&self, id: impl Into<Value>) -> DocumentStoreResult<Option<Document>> {
        self.find_one(Filter::id(id))
    }

    /// Opens a lazy, single-pass cursor over the matching documents.
    ///
    /// Iterating again requires opening a new cursor.
    pub fn cursor(&self, filter: Document) -> DocumentStoreResult<B::Cursor> {
        self.backend.cursor(&self.name, &filter)
    }

    /// Counts the documents matching the filter.
    pub fn count(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.backend.count_documents(&self.name, &filter)
    }

    /// Removes the first document matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) when
    /// nothing matches.
    pub fn delete_first(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.backend.delete_documents(&self.name, &filter, Target::First)
    }

    /// Removes every document matching the filter and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) when
    /// nothing matches.
    pub fn delete_all(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.backend.delete_documents(&self.name, &filter, Target::All)
    }

    /// Removes every document whose `_id` is one of `ids`.
    pub fn delete_by_id<I, V>(&self, ids: I) -> DocumentStoreResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.delete_all(Filter::in_("_id", ids))
    }

    /// Replaces the first document matching the filter.
    pub fn replace_first(&self, filter: Document, replacement: Document) -> DocumentStoreResult<()> {
        self.backend.replace_document(&self.name, &filter, replacement)
    }

    /// Replaces the document whose `_id` equals `id`.
    pub fn replace_by_id(&self, id: impl Into<Value>, replacement: Document) -> DocumentStoreResult<()> {
        self.replace_first(Filter::id(id), replacement)
    }

    /// Applies an update directive to the first matching document.
    ///
    /// Accepts an [`Update`](crate::update::Update), a directive [`Document`] or `Value::Null`.
    pub fn update_first(&self, filter: Document, update: impl Into<Value>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(&self.name, &filter, &update.into(), Target::First)
            .map(|_| ())
    }

    /// Applies an update directive to every matching document.
    ///
    /// Either every matching document is updated or, on error, none is.
    pub fn update_all(&self, filter: Document, update: impl Into<Value>) -> DocumentStoreResult<usize> {
        self.backend
            .update_documents(&self.name, &filter, &update.into(), Target::All)
    }
}

/// A collection bound to a record type.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, R: Record> {
    inner: Collection<'a, B>,
    _marker: PhantomData<R>,
}

impl<'a, B: StoreBackend, R: Record> TypedCollection<'a, B, R> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { inner: Collection::new(name, backend), _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped view of the same collection.
    pub fn untyped(&self) -> &Collection<'a, B> {
        &self.inner
    }

    /// Converts and appends records in order.
    ///
    /// Every record is converted before anything is inserted, so a conversion failure
    /// inserts nothing.
    pub fn insert(&self, records: Vec<R>) -> DocumentStoreResult<()> {
        let documents = records
            .iter()
            .map(|record| record.to_document())
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        self.inner.insert(documents)
    }

    pub fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<Vec<R>> {
        self.inner
            .find(query)?
            .into_iter()
            .map(R::from_document)
            .collect()
    }

    pub fn find_one(&self, filter: Document) -> DocumentStoreResult<Option<R>> {
        self.inner.find_one(filter)?.map(R::from_document).transpose()
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> DocumentStoreResult<Option<R>> {
        self.find_one(Filter::id(id))
    }

    /// Opens a lazy cursor that yields records.
    pub fn cursor(&self, filter: Document) -> DocumentStoreResult<TypedCursor<B::Cursor, R>> {
        Ok(TypedCursor { inner: self.inner.cursor(filter)?, _marker: PhantomData })
    }

    pub fn count(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.inner.count(filter)
    }

    pub fn delete_first(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.inner.delete_first(filter)
    }

    pub fn delete_all(&self, filter: Document) -> DocumentStoreResult<usize> {
        self.inner.delete_all(filter)
    }

    pub fn delete_by_id<I, V>(&self, ids: I) -> DocumentStoreResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.inner.delete_by_id(ids)
    }

    /// Replaces the first matching document with the converted record.
    pub fn replace_first(&self, filter: Document, record: &R) -> DocumentStoreResult<()> {
        self.inner.replace_first(filter, record.to_document()?)
    }

    pub fn replace_by_id(&self, id: impl Into<Value>, record: &R) -> DocumentStoreResult<()> {
        self.inner.replace_by_id(id, record.to_document()?)
    }

    pub fn update_first(&self, filter: Document, update: impl Into<Value>) -> DocumentStoreResult<()> {
        self.inner.update_first(filter, update)
    }

    pub fn update_all(&self, filter: Document, update: impl Into<Value>) -> DocumentStoreResult<usize> {
        self.inner.update_all(filter, update)
    }
}

/// Cursor adapter that converts each document into a record.
#[derive(Debug)]
pub struct TypedCursor<C, R> {
    inner: C,
    _marker: PhantomData<R>,
}

impl<C, R> Iterator for TypedCursor<C, R>
where
    C: Iterator<Item = DocumentStoreResult<Document>>,
    R: Record,
{
    type Item = DocumentStoreResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|document| document.and_then(R::from_document))
    }
}
