//! In-memory document storage backend for docmock.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait
//! together with the engines that give the query language its meaning.
//!
//! # Features
//!
//! - **Per-collection locking** - Every operation holds its collection's lock for the whole
//!   scan; different collections never contend
//! - **Filter matching** ([`evaluator`]) - Dotted paths, array traversal and exact numeric
//!   comparison across integer and float representations
//! - **Update application** ([`updater`]) - `$set` / `$unset` with path creation and array growth
//! - **Lazy cursors** ([`cursor`]) - Single-pass iteration that locks per step
//!
//! # Quick Start
//!
//! ```ignore
//! use docmock::{prelude::*, doc, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::builder().generate_ids(true).build()?);
//! let users = store.collection("users");
//!
//! users.insert(vec![doc! { "name": "Alice", "tags": ["admin"] }])?;
//! assert_eq!(users.count(doc! { "tags": "admin" })?, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmock_memory;

pub mod compare;
pub mod cursor;
pub mod evaluator;
pub mod store;
pub mod updater;

pub use cursor::InMemoryCursor;
pub use evaluator::{DocumentEvaluator, matches};
pub use store::{InMemoryStore, InMemoryStoreBuilder};
pub use updater::apply_update;
