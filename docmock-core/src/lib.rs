//! An in-memory document database for tests, speaking a subset of the MongoDB query and
//! update language.
//!
//! This crate is the core of the docmock project and provides:
//!
//! - **Value model** ([`value`]) - The dynamically-typed document value and the [`doc!`] macro
//! - **Record conversion** ([`record`]) - Mapping native `serde` records to documents and back
//! - **Filter language** ([`query`]) - Filter builders, queries and the parsed filter tree
//! - **Update language** ([`update`]) - `$set` / `$unset` directives
//! - **Store backend abstraction** ([`backend`]) - The trait storage implementations provide
//! - **Collections interface** ([`collection`]) - Typed and untyped collection handles
//! - **Document store** ([`store`]) - The entry point owning a backend
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
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
//! }
//!
//! impl Record for User {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.typed_collection::<User>();
//! users.insert(vec![User { id: ObjectId::new(), name: "Alice".into() }])?;
//! let alice = users.find_one(doc! { "name": "Alice" })?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmock_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod query;
pub mod record;
pub mod store;
pub mod update;
pub mod value;
