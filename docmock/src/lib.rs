//! An in-memory document database for exercising MongoDB-style application code in tests.
//!
//! This crate is the entry point of the docmock project. It re-exports the core types from
//! `docmock-core` and the in-memory backend from `docmock-memory`.
//!
//! # Features
//!
//! - **Schema-less documents** - A dynamically-typed [`value::Value`] model with the [`doc!`] literal macro
//! - **Typed records** - Store any `serde` type; field names follow serde renames and flattening
//! - **MongoDB filter subset** - `$eq`, `$ne`, `$gt`…`$lte`, `$in`, `$nin`, `$exists`, `$type`,
//!   `$all`, `$size`, `$bitsAllSet`, `$and`, `$or`, `$nor`, `$not`
//! - **Updates** - `$set` and `$unset` with dotted paths, path creation and array growth
//!
//! # Quick Start
//!
//! ```ignore
//! use docmock::{prelude::*, doc, memory::InMemoryStore};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl Record for User {
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.typed_collection::<User>();
//!
//! let alice = User { id: ObjectId::new(), name: "Alice".into(), age: 30 };
//! users.insert(vec![alice.clone()])?;
//!
//! users.update_first(Filter::id(alice.id), Update::new().set("age", 31))?;
//! let adults = users.find(Filter::gte("age", 18))?;
//!
//! println!("{}", store.dump()?);
//! ```
//!
//! # Errors
//!
//! Every call returns a [`error::DocumentStoreResult`]. A mutation that matches nothing
//! fails with `DocumentNotFound`; a filter or update of the wrong shape fails with
//! `MalformedQuery` / `MalformedUpdate`; an operator the engine does not implement fails
//! with `UnsupportedOperator`.

pub mod prelude;

pub use docmock_core::{backend, collection, doc, doc_value, error, query, record, store, update, value};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend and its engines.
pub mod memory {
    pub use docmock_memory::{
        InMemoryCursor, InMemoryStore, InMemoryStoreBuilder, apply_update, matches,
    };
}
