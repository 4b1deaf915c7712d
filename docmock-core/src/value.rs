//! The dynamically-typed value model every stored document, filter and update is made of.
//!
//! [`Value`] is a closed set of variants; the matching and update engines are exhaustive
//! matches over it. [`Document`] is an insertion-ordered map whose equality ignores key
//! order. The [`doc!`](crate::doc) macro builds documents literally:
//!
//! ```ignore
//! use docmock_core::doc;
//!
//! let filter = doc! {
//!     "age": { "$gte": 18 },
//!     "tags": ["admin", "ops"],
//!     "deleted_at": null,
//! };
//! ```
//!
//! Negative numbers and other multi-token expressions must be wrapped in parentheses
//! (`"delta": (-5)`).

use std::fmt;

use bson::{Bson, oid::ObjectId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Any document, array or scalar held by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    /// 12-byte identifier, compared by exact byte equality.
    ObjectId(ObjectId),
    Timestamp(DateTime<Utc>),
    /// Elements are heterogeneous; writing a differently-typed element never fails.
    Array(Vec<Value>),
    Document(Document),
}

/// The runtime kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int64,
    UInt64,
    Float64,
    String,
    ObjectId,
    Timestamp,
    Array,
    Document,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int64 => "int64",
            ValueKind::UInt64 => "uint64",
            ValueKind::Float64 => "double",
            ValueKind::String => "string",
            ValueKind::ObjectId => "objectId",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Array => "array",
            ValueKind::Document => "object",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Float64(_) => ValueKind::Float64,
            Value::String(_) => ValueKind::String,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Array(_) => ValueKind::Array,
            Value::Document(_) => ValueKind::Document,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for `Int64`, `UInt64` and `Float64`.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int64(_) | Value::UInt64(_) | Value::Float64(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the value as an `i64` when it holds an integer, including a float whose
    /// fractional part is exactly zero.
    pub fn as_i64_exact(&self) -> Option<i64> {
        match self {
            Value::Int64(value) => Some(*value),
            Value::UInt64(value) => i64::try_from(*value).ok(),
            Value::Float64(value)
                if value.is_finite()
                    && value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64 =>
            {
                Some(*value as i64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// An insertion-ordered mapping of unique string keys to values.
///
/// Key order is kept for display; two documents with the same entries in a different
/// order compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// Inserts or overwrites a key. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Removes a key, keeping the relative order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    /// Returns the primary identifier stored under `_id`.
    pub fn id(&self) -> Option<&Value> {
        self.get("_id")
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int64(value) => serializer.serialize_i64(*value),
            Value::UInt64(value) => serializer.serialize_u64(*value),
            Value::Float64(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::ObjectId(oid) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$oid", &oid.to_hex())?;
                map.end()
            }
            Value::Timestamp(ts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$date", &ts.to_rfc3339())?;
                map.end()
            }
            Value::Array(items) => serializer.collect_seq(items),
            Value::Document(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int64(value as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::UInt64(value as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl TryFrom<Bson> for Value {
    type Error = DocumentStoreError;

    fn try_from(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(match bson {
            Bson::Null => Value::Null,
            Bson::Boolean(value) => Value::Bool(value),
            Bson::Int32(value) => Value::Int64(value as i64),
            Bson::Int64(value) => Value::Int64(value),
            Bson::Double(value) => Value::Float64(value),
            Bson::String(value) => Value::String(value),
            Bson::ObjectId(oid) => Value::ObjectId(oid),
            Bson::DateTime(dt) => Value::Timestamp(dt.to_chrono()),
            Bson::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            ),
            Bson::Document(doc) => Value::Document(Document::try_from(doc)?),
            other => {
                return Err(DocumentStoreError::Conversion(format!(
                    "BSON type {:?} has no counterpart in the value model",
                    other.element_type()
                )));
            }
        })
    }
}

impl TryFrom<bson::Document> for Document {
    type Error = DocumentStoreError;

    fn try_from(doc: bson::Document) -> DocumentStoreResult<Self> {
        let mut document = Document::new();
        for (key, value) in doc {
            document.insert(key, Value::try_from(value)?);
        }

        Ok(document)
    }
}

impl TryFrom<Value> for Bson {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> DocumentStoreResult<Self> {
        Ok(match value {
            Value::Null => Bson::Null,
            Value::Bool(value) => Bson::Boolean(value),
            Value::Int64(value) => Bson::Int64(value),
            Value::UInt64(value) => Bson::Int64(i64::try_from(value).map_err(|_| {
                DocumentStoreError::Conversion(format!(
                    "unsigned value {value} does not fit in a BSON int64"
                ))
            })?),
            Value::Float64(value) => Bson::Double(value),
            Value::String(value) => Bson::String(value),
            Value::ObjectId(oid) => Bson::ObjectId(oid),
            Value::Timestamp(ts) => Bson::DateTime(bson::DateTime::from_chrono(ts)),
            Value::Array(items) => Bson::Array(
                items
                    .into_iter()
                    .map(Bson::try_from)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            ),
            Value::Document(doc) => Bson::Document(bson::Document::try_from(doc)?),
        })
    }
}

impl TryFrom<Document> for bson::Document {
    type Error = DocumentStoreError;

    fn try_from(document: Document) -> DocumentStoreResult<Self> {
        let mut doc = bson::Document::new();
        for (key, value) in document {
            doc.insert(key, Bson::try_from(value)?);
        }

        Ok(doc)
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys in [`doc!`](crate::doc).
#[doc(hidden)]
pub fn normalize_key(raw: &str) -> String {
    raw.strip_prefix('"')
        .and_then(|key| key.strip_suffix('"'))
        .unwrap_or(raw)
        .to_string()
}

/// Builds a [`Document`] from `key: value` pairs.
///
/// Keys are string literals or identifiers. Values are `null`, nested `{ ... }` documents,
/// `[ ... ]` arrays, or any single-token expression convertible into a [`Value`].
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };

    ($($key:tt : $value:tt),+ $(,)?) => {{
        let mut document = $crate::value::Document::new();
        $(
            document.insert(
                $crate::value::normalize_key(stringify!($key)),
                $crate::doc_value!($value),
            );
        )+
        document
    }};
}

/// Converts a single [`doc!`](crate::doc) value token into a [`Value`].
#[macro_export]
macro_rules! doc_value {
    (null) => {
        $crate::value::Value::Null
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::value::Value::Document($crate::doc! { $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::value::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::value::Value::from($value)
    };
}
