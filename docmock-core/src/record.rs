//! Conversion between native application records and the document value model.
//!
//! Any `serde` type can be stored. Field names follow serde: `#[serde(rename = "...")]`
//! overrides a member's name, `#[serde(rename_all = "...")]` changes the convention for a
//! whole record, and `#[serde(flatten)]` inlines a nested record's members at the parent
//! level. When two flattened members produce the same name the later one wins.
//!
//! The member mapped to `_id` is the document's primary identifier.
//!
//! # Example
//!
//! ```ignore
//! use docmock::record::{Record, RecordExt};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//!     #[serde(flatten)]
//!     pub audit: Audit,
//! }
//!
//! impl Record for User {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! let document = user.to_document()?;
//! let back = User::from_document(document)?;
//! ```

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DocumentStoreError, DocumentStoreResult};
use crate::value::{Document, Value};

/// A native record that belongs to a named collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the name of the collection this record type is stored in.
    fn collection_name() -> &'static str;
}

/// Conversion helpers implemented for every [`Record`].
pub trait RecordExt: Record {
    /// Converts this record into a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Conversion`] if the record does not serialize to a
    /// document or contains a value the model cannot hold.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Rebuilds a record from a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Conversion`] if the document does not have the
    /// record's shape.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        to_document(self)
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        from_document(document)
    }
}

/// Converts any serializable value into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<Value> {
    Value::try_from(serialize_to_bson(value)?)
}

/// Converts a serializable value into a [`Document`].
///
/// Fails when the value does not serialize to a document, which covers unit values,
/// `None` and bare scalars.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<Document> {
    match to_value(value)? {
        Value::Document(document) => Ok(document),
        other => Err(DocumentStoreError::Conversion(format!(
            "expected a record that serializes to a document, got {}",
            other.kind()
        ))),
    }
}

/// Rebuilds a deserializable value from a [`Document`].
pub fn from_document<T: DeserializeOwned>(document: Document) -> DocumentStoreResult<T> {
    let bson = Bson::Document(bson::Document::try_from(document)?);
    Ok(deserialize_from_bson(bson)?)
}
