//! Lazy cursor over an in-memory collection.

use std::sync::Arc;

use tracing::trace;

use docmock_core::{error::DocumentStoreResult, query::Expr, value::Document};

use crate::{evaluator::DocumentEvaluator, store::CollectionHandle};

/// Single-pass iterator over the documents of one collection that match a filter.
///
/// The collection lock is taken for each step and released between steps, so other
/// operations may interleave with iteration. The cursor tracks a position in the
/// collection; documents removed ahead of it shift what it sees next.
#[derive(Debug)]
pub struct InMemoryCursor {
    handle: Arc<CollectionHandle>,
    expr: Expr,
    position: usize,
    exhausted: bool,
}

impl InMemoryCursor {
    pub(crate) fn new(handle: Arc<CollectionHandle>, expr: Expr) -> Self {
        Self { handle, expr, position: 0, exhausted: false }
    }
}

impl Iterator for InMemoryCursor {
    type Item = DocumentStoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let documents = self.handle.documents.lock();
        while let Some(document) = documents.get(self.position) {
            self.position += 1;

            match DocumentEvaluator::new(document).evaluate(&self.expr) {
                Ok(true) => return Some(Ok(document.clone())),
                Ok(false) => continue,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }

        self.exhausted = true;
        trace!(collection = %self.handle.name, position = self.position, "cursor exhausted");
        None
    }
}
