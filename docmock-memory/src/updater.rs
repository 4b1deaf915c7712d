//! Application of `$set` / `$unset` directives.
//!
//! The engine never touches the stored document: it works on a copy and returns it, and
//! the store swaps the copy in only after every assignment succeeded.

use docmock_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    update::UpdateDirective,
    value::{Document, Value},
};

/// Parses `update` and applies it to a copy of `document`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::MalformedUpdate`] for a malformed directive or a `$set`
/// path that runs through a scalar, and [`DocumentStoreError::UnsupportedOperator`] for
/// update operators other than `$set` and `$unset`.
pub fn apply_update(document: &Document, update: &Value) -> DocumentStoreResult<Document> {
    let directive = UpdateDirective::parse(update)?;
    apply_directive(document, &directive)
}

/// Applies an already-parsed directive to a copy of `document`. `$set` runs before `$unset`.
pub fn apply_directive(document: &Document, directive: &UpdateDirective) -> DocumentStoreResult<Document> {
    let mut updated = document.clone();

    for (path, value) in &directive.set {
        let segments = path.split('.').collect::<Vec<_>>();
        set_path(&mut updated, &segments, value.clone(), path)?;
    }

    for path in &directive.unset {
        let segments = path.split('.').collect::<Vec<_>>();
        unset_path(&mut updated, &segments);
    }

    Ok(updated)
}

/// Largest number of null slots a single `$set` may add in front of the assigned index.
pub const MAX_ARRAY_PADDING: usize = 1_500_000;

fn set_path(document: &mut Document, segments: &[&str], value: Value, path: &str) -> DocumentStoreResult<()> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    if rest.is_empty() {
        document.insert(*segment, value);
        return Ok(());
    }

    match document.get_mut(segment) {
        Some(Value::Document(child)) => set_path(child, rest, value, path),
        Some(Value::Array(items)) => set_in_array(items, rest, value, path),
        Some(Value::Null) | None => {
            document.insert(*segment, nested(rest, value));
            Ok(())
        }
        Some(scalar) => Err(DocumentStoreError::MalformedUpdate(format!(
            "cannot set {path}: {segment} holds a {} value",
            scalar.kind()
        ))),
    }
}

/// Assigns below an array; the first segment must be an index. Missing slots are filled
/// with null.
fn set_in_array(items: &mut Vec<Value>, segments: &[&str], value: Value, path: &str) -> DocumentStoreResult<()> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    let index = segment.parse::<usize>().map_err(|_| {
        DocumentStoreError::MalformedUpdate(format!(
            "cannot set {path}: {segment} is not an array index"
        ))
    })?;

    if index >= items.len() {
        let padding = index - items.len();
        let len = index
            .checked_add(1)
            .filter(|_| padding <= MAX_ARRAY_PADDING)
            .ok_or_else(|| {
                DocumentStoreError::MalformedUpdate(format!(
                    "cannot set {path}: index {index} would pad the array by more than {MAX_ARRAY_PADDING} elements"
                ))
            })?;
        items.resize(len, Value::Null);
    }

    let slot = &mut items[index];
    if rest.is_empty() {
        *slot = value;
        return Ok(());
    }

    match slot {
        Value::Document(child) => set_path(child, rest, value, path),
        Value::Array(inner) => set_in_array(inner, rest, value, path),
        other => {
            *other = nested(rest, value);
            Ok(())
        }
    }
}

/// Wraps `value` in one fresh document per segment.
fn nested(segments: &[&str], value: Value) -> Value {
    segments.iter().rev().fold(value, |inner, segment| {
        let mut document = Document::new();
        document.insert(*segment, inner);
        Value::Document(document)
    })
}

fn unset_path(document: &mut Document, segments: &[&str]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        document.remove(segment);
        return;
    }

    match document.get_mut(segment) {
        Some(Value::Document(child)) => unset_path(child, rest),
        Some(Value::Array(items)) => unset_in_array(items, rest),
        _ => {}
    }
}

/// Clears an array slot to null, keeping the array's length.
fn unset_in_array(items: &mut [Value], segments: &[&str]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let Some(slot) = segment.parse::<usize>().ok().and_then(|index| items.get_mut(index)) else {
        return;
    };

    if rest.is_empty() {
        *slot = Value::Null;
        return;
    }

    match slot {
        Value::Document(child) => unset_path(child, rest),
        Value::Array(inner) => unset_in_array(inner, rest),
        _ => {}
    }
}
