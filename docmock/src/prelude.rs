//! Convenient re-exports of commonly used types from docmock.
//!
//! ```ignore
//! use docmock::prelude::*;
//! ```

pub use docmock_core::{
    backend::{StoreBackend, StoreBackendBuilder, Target},
    collection::{Collection, TypedCollection, TypedCursor},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter, Operand, Operator, Query, QueryBuilder, QueryVisitor},
    record::{Record, RecordExt},
    store::DocumentStore,
    update::{Update, UpdateDirective},
    value::{Document, Value, ValueKind},
};
