//! Update directives.
//!
//! An update is a document restricted to the top-level keys `$set` and `$unset`:
//!
//! ```ignore
//! use docmock::{doc, update::Update};
//!
//! let literal = doc! {
//!     "$set": { "profile.name": "Alice", "tags.2": "ops" },
//!     "$unset": ["legacy", "scores.0"],
//! };
//!
//! let built = Update::new()
//!     .set("profile.name", "Alice")
//!     .set("tags.2", "ops")
//!     .unset("legacy")
//!     .unset("scores.0");
//! ```
//!
//! Directives are parsed into an [`UpdateDirective`] before any document is touched.

use crate::error::{DocumentStoreError, DocumentStoreResult};
use crate::value::{Document, Value};

/// A parsed update: the `$set` assignments and `$unset` paths, in directive order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDirective {
    pub set: Vec<(String, Value)>,
    pub unset: Vec<String>,
}

impl UpdateDirective {
    /// Parses an update directive.
    ///
    /// `Null` parses to an empty directive. Missing `$set` or `$unset` keys are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MalformedUpdate`] for a directive that is not a document,
    /// a top-level key that is not an operator, or an operand of the wrong shape, and
    /// [`DocumentStoreError::UnsupportedOperator`] for update operators other than
    /// `$set` and `$unset`.
    pub fn parse(update: &Value) -> DocumentStoreResult<Self> {
        match update {
            Value::Null => Ok(UpdateDirective::default()),
            Value::Document(doc) => Self::from_document(doc),
            other => Err(DocumentStoreError::MalformedUpdate(format!(
                "expected an update document, got {}",
                other.kind()
            ))),
        }
    }

    pub fn from_document(update: &Document) -> DocumentStoreResult<Self> {
        let mut directive = UpdateDirective::default();

        for (key, operand) in update {
            match key.as_str() {
                "$set" => match operand {
                    Value::Document(assignments) => directive.set.extend(
                        assignments
                            .iter()
                            .map(|(path, value)| (path.clone(), value.clone())),
                    ),
                    other => {
                        return Err(DocumentStoreError::MalformedUpdate(format!(
                            "$set expects a document of paths, got {}",
                            other.kind()
                        )));
                    }
                },
                "$unset" => directive.unset.extend(unset_paths(operand)?),
                op if op.starts_with('$') => {
                    return Err(DocumentStoreError::UnsupportedOperator(op.to_string()));
                }
                field => {
                    return Err(DocumentStoreError::MalformedUpdate(format!(
                        "top-level key {field} is not an update operator"
                    )));
                }
            }
        }

        Ok(directive)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}

fn unset_paths(operand: &Value) -> DocumentStoreResult<Vec<String>> {
    match operand {
        Value::Null => Ok(Vec::new()),
        Value::String(path) => Ok(vec![path.clone()]),
        Value::Document(paths) => Ok(paths.keys().cloned().collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(path) => Ok(path.clone()),
                other => Err(DocumentStoreError::MalformedUpdate(format!(
                    "$unset paths must be strings, got {}",
                    other.kind()
                ))),
            })
            .collect(),
        other => Err(DocumentStoreError::MalformedUpdate(format!(
            "$unset expects a path, an array of paths or a document, got {}",
            other.kind()
        ))),
    }
}

/// Builder for update directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
    unset: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    /// Assigns `value` at the dotted `path`, creating intermediate documents as needed.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(path, value);
        self
    }

    /// Removes the field at the dotted `path`. Array slots are cleared to null.
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.unset.push(path.into());
        self
    }

    pub fn into_document(self) -> Document {
        let mut update = Document::new();

        if !self.set.is_empty() {
            update.insert("$set", self.set);
        }
        if !self.unset.is_empty() {
            update.insert("$unset", self.unset);
        }

        update
    }
}

impl From<Update> for Document {
    fn from(update: Update) -> Self {
        update.into_document()
    }
}

impl From<Update> for Value {
    fn from(update: Update) -> Self {
        Value::Document(update.into_document())
    }
}
