//! Filter evaluation against in-memory documents.
//!
//! [`DocumentEvaluator`] walks a parsed [`Expr`] for one context value. Field paths are
//! resolved segment by segment: documents are looked up by key, arrays are indexed when
//! the segment is an in-range index and otherwise matched existentially against every
//! element, and anything else resolves to absent.

use std::cmp::Ordering;

use docmock_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Operand, Operator, QueryVisitor},
    value::{Document, Value, ValueKind},
};

use crate::compare::{compare_values, scalar_eq};

/// Returns `true` if `document` satisfies `filter`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::MalformedQuery`] or
/// [`DocumentStoreError::UnsupportedOperator`] if the filter does not parse.
pub fn matches(document: &Value, filter: &Document) -> DocumentStoreResult<bool> {
    let expr = Expr::parse(filter)?;
    DocumentEvaluator::for_value(document).evaluate(&expr)
}

/// A borrowed view of whatever a filter is being matched against.
///
/// Stored documents are evaluated in place; only nested values live inside a [`Value`].
#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    Document(&'a Document),
    Value(&'a Value),
}

impl<'a> Node<'a> {
    fn as_value(self) -> Option<&'a Value> {
        match self {
            Node::Value(value) => Some(value),
            Node::Document(_) => None,
        }
    }

    fn as_document(self) -> Option<&'a Document> {
        match self {
            Node::Document(document) | Node::Value(Value::Document(document)) => Some(document),
            Node::Value(_) => None,
        }
    }

    fn as_array(self) -> Option<&'a [Value]> {
        match self {
            Node::Value(Value::Array(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    fn is_null(self) -> bool {
        matches!(self, Node::Value(Value::Null))
    }

    fn kind(self) -> ValueKind {
        match self {
            Node::Document(_) => ValueKind::Document,
            Node::Value(value) => value.kind(),
        }
    }
}

/// Evaluates filter expressions against a single document or value.
#[derive(Debug)]
pub struct DocumentEvaluator<'a> {
    context: Node<'a>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { context: Node::Document(document) }
    }

    pub fn for_value(value: &'a Value) -> Self {
        Self { context: Node::Value(value) }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_nor(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_or(exprs)?)
    }

    fn visit_field(&mut self, path: &str, operand: &Operand) -> Result<Self::Output, Self::Error> {
        let segments = path.split('.').collect::<Vec<_>>();

        match (self.context, segments.split_first()) {
            (Node::Document(document), Some((first, rest))) => {
                match_path(document.get(first), rest, operand)
            }
            (Node::Document(_), None) => compare(Some(self.context), operand),
            (Node::Value(value), _) => match_path(Some(value), &segments, operand),
        }
    }

    fn visit_context(&mut self, op: &Operator) -> Result<Self::Output, Self::Error> {
        apply(Some(self.context), op)
    }
}

/// Resolves the remaining path below `value` and compares whatever it reaches.
fn match_path(value: Option<&Value>, segments: &[&str], operand: &Operand) -> DocumentStoreResult<bool> {
    let Some((segment, rest)) = segments.split_first() else {
        return compare(value.map(Node::Value), operand);
    };

    match value {
        Some(Value::Document(document)) => match_path(document.get(segment), rest, operand),
        // Nothing below an empty array, same as below a scalar.
        Some(Value::Array(items)) if items.is_empty() => match_path(None, rest, operand),
        Some(Value::Array(items)) => {
            if let Some(item) = segment.parse::<usize>().ok().and_then(|index| items.get(index)) {
                return match_path(Some(item), rest, operand);
            }

            for item in items {
                if match_path(Some(item), segments, operand)? {
                    return Ok(true);
                }
            }

            Ok(false)
        }
        _ => match_path(None, rest, operand),
    }
}

/// Compares a resolved node, `None` when absent, against an operand.
fn compare(node: Option<Node<'_>>, operand: &Operand) -> DocumentStoreResult<bool> {
    if let Operand::Operators(operators) = operand {
        for op in operators {
            if !apply(node, op)? {
                return Ok(false);
            }
        }

        return Ok(true);
    }

    let Some(node) = node else {
        return Ok(matches!(operand, Operand::Null));
    };

    if let Some(items) = node.as_array() {
        for item in items {
            if compare(Some(Node::Value(item)), operand)? {
                return Ok(true);
            }
        }

        return match operand {
            Operand::Array(expected) if expected.len() == items.len() => {
                for (item, expected) in items.iter().zip(expected) {
                    if !compare(Some(Node::Value(item)), expected)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            _ => Ok(false),
        };
    }

    Ok(match operand {
        Operand::Filter(expr) => match node.as_document() {
            Some(document) => DocumentEvaluator::new(document).evaluate(expr)?,
            None => false,
        },
        Operand::Null => node.is_null(),
        Operand::Literal(expected) => node.as_value().is_some_and(|value| scalar_eq(value, expected)),
        Operand::Array(_) | Operand::Operators(_) => false,
    })
}

fn apply(node: Option<Node<'_>>, op: &Operator) -> DocumentStoreResult<bool> {
    let value = node.and_then(Node::as_value);

    Ok(match op {
        Operator::Eq(operand) => compare(node, operand)?,
        Operator::Ne(operand) => !compare(node, operand)?,
        Operator::Gt(bound) => ordered(value, bound, |ordering| ordering == Ordering::Greater),
        Operator::Gte(bound) => ordered(value, bound, |ordering| ordering != Ordering::Less),
        Operator::Lt(bound) => ordered(value, bound, |ordering| ordering == Ordering::Less),
        Operator::Lte(bound) => ordered(value, bound, |ordering| ordering != Ordering::Greater),
        Operator::In(candidates) => any_matches(node, candidates)?,
        Operator::Nin(candidates) => !any_matches(node, candidates)?,
        Operator::Exists(expected) => node.is_some() == *expected,
        Operator::Type(types) => node.is_some_and(|node| {
            types.iter().any(|type_name| type_name.matches(node.kind()))
        }),
        Operator::All(required) => {
            if node.and_then(Node::as_array).is_none() {
                return Ok(false);
            }

            for operand in required {
                if !compare(node, operand)? {
                    return Ok(false);
                }
            }

            true
        }
        Operator::Size(size) => node.and_then(Node::as_array).is_some_and(|items| items.len() == *size),
        Operator::BitsAllSet(mask) => value.is_some_and(|value| bits_all_set(value, *mask)),
    })
}

fn any_matches(node: Option<Node<'_>>, candidates: &[Operand]) -> DocumentStoreResult<bool> {
    for candidate in candidates {
        if compare(node, candidate)? {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Applies an ordering test; an array satisfies it if any element does.
fn ordered(value: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool + Copy) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(|item| ordered(Some(item), bound, accept)),
        Some(value) => compare_values(value, bound).is_some_and(accept),
        None => false,
    }
}

fn bits_all_set(value: &Value, mask: u64) -> bool {
    let bits = match value {
        Value::Array(items) => return items.iter().any(|item| bits_all_set(item, mask)),
        Value::UInt64(bits) => *bits,
        other => match other.as_i64_exact() {
            Some(bits) => bits as u64,
            None => return false,
        },
    };

    (bits & mask) == mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use chrono::{TimeZone, Utc};
    use docmock_core::doc;
    use proptest::prelude::*;

    fn check(document: Document, filter: Document) -> bool {
        matches(&Value::Document(document), &filter).unwrap()
    }

    #[test]
    fn matching_and_non_matching_filters() {
        let oid = ObjectId::parse_str("5a0e7f6c0f291d0f1f2d3e4f").unwrap();
        let zero = ObjectId::parse_str("000000000000000000000000").unwrap();

        let cases = vec![
            ("simple", doc! { "foo": "bar" }, doc! { "foo": "bar" }, doc! { "bar": "foo" }),
            (
                "multiple fields",
                doc! { "foo": "bar", "bar": "baz" },
                doc! { "foo": "bar" },
                doc! { "foo": "bar", "bar": "foo" },
            ),
            (
                "nested dotted path",
                doc! { "foo": { "bar": "baz" } },
                doc! { "foo.bar": "baz" },
                doc! { "foo.bar": "foo" },
            ),
            (
                "nested document",
                doc! { "foo": { "bar": "baz" } },
                doc! { "foo": { "bar": "baz" } },
                doc! { "foo": { "bar": "foo" } },
            ),
            (
                "array contains",
                doc! { "foo": ["bar", "baz"] },
                doc! { "foo": "bar" },
                doc! { "foo": "foo" },
            ),
            (
                "array matches",
                doc! { "foo": ["bar", "baz"] },
                doc! { "foo": ["bar", "baz"] },
                doc! { "foo": ["bar", "foo"] },
            ),
            ("object ids", doc! { "_id": oid }, doc! { "_id": oid }, doc! { "_id": zero }),
            (
                "$eq",
                doc! { "foo": "bar" },
                doc! { "foo": { "$eq": "bar" } },
                doc! { "foo": { "$eq": "baz" } },
            ),
            (
                "$ne",
                doc! { "foo": "bar" },
                doc! { "foo": { "$ne": "baz" } },
                doc! { "foo": { "$ne": "bar" } },
            ),
            ("$gt", doc! { "foo": 4 }, doc! { "foo": { "$gt": 2 } }, doc! { "foo": { "$gt": 4 } }),
            ("$gte", doc! { "foo": 4 }, doc! { "foo": { "$gte": 4 } }, doc! { "foo": { "$gte": 5 } }),
            ("$lt", doc! { "foo": 4 }, doc! { "foo": { "$lt": 6 } }, doc! { "foo": { "$lt": 4 } }),
            ("$lte", doc! { "foo": 4 }, doc! { "foo": { "$lte": 4 } }, doc! { "foo": { "$lte": 3 } }),
            (
                "$gt unsigned",
                doc! { "foo": 7u64 },
                doc! { "foo": { "$gt": 5 } },
                doc! { "foo": { "$gt": 10 } },
            ),
            (
                "$gte unsigned",
                doc! { "foo": 7u64 },
                doc! { "foo": { "$gte": 7 } },
                doc! { "foo": { "$gte": 7.5 } },
            ),
            (
                "$and",
                doc! { "foo": 4, "bar": 5 },
                doc! { "$and": [{ "foo": 4 }, { "bar": 5 }] },
                doc! { "$and": [{ "foo": 4 }, { "bar": 6 }] },
            ),
            (
                "$or",
                doc! { "foo": 4, "bar": 5 },
                doc! { "$or": [{ "foo": 5 }, { "bar": 5 }] },
                doc! { "$or": [{ "foo": 5 }, { "bar": 6 }] },
            ),
            (
                "$nor",
                doc! { "foo": 4 },
                doc! { "$nor": [{ "foo": 5 }, { "foo": 6 }] },
                doc! { "$nor": [{ "foo": 4 }] },
            ),
            (
                "$size",
                doc! { "foo": ["bar", "baz"] },
                doc! { "foo": { "$size": 2 } },
                doc! { "foo": { "$size": 3 } },
            ),
            (
                "$type",
                doc! { "foo": "bar" },
                doc! { "foo": { "$type": "string" } },
                doc! { "foo": { "$type": "int" } },
            ),
            (
                "$all",
                doc! { "foo": ["foo", "bar", "baz"] },
                doc! { "foo": { "$all": ["foo", "baz"] } },
                doc! { "foo": { "$all": ["foo", "bar", "baz", "qux"] } },
            ),
            (
                "$all with mixed types",
                doc! { "foo": ["foo", 2, 1.0] },
                doc! { "foo": { "$all": ["foo", 1.0] } },
                doc! { "foo": { "$all": ["foo", 3] } },
            ),
            (
                "$in",
                doc! { "foo": "b" },
                doc! { "foo": { "$in": ["a", "b"] } },
                doc! { "foo": { "$in": ["c"] } },
            ),
            (
                "$nin",
                doc! { "foo": "b" },
                doc! { "foo": { "$nin": ["a", "c"] } },
                doc! { "foo": { "$nin": ["b"] } },
            ),
            (
                "$exists",
                doc! { "foo": null },
                doc! { "foo": { "$exists": true } },
                doc! { "bar": { "$exists": true } },
            ),
            (
                "$not",
                doc! { "foo": 4 },
                doc! { "foo": { "$not": { "$gt": 5 } } },
                doc! { "foo": { "$not": { "$gt": 3 } } },
            ),
            (
                "$bitsAllSet",
                doc! { "foo": 0b1011 },
                doc! { "foo": { "$bitsAllSet": 0b0011 } },
                doc! { "foo": { "$bitsAllSet": 0b0100 } },
            ),
        ];

        for (name, document, matching, not_matching) in cases {
            assert!(check(document.clone(), matching.clone()), "{name}: {matching} should match {document}");
            assert!(!check(document.clone(), not_matching.clone()), "{name}: {not_matching} should not match {document}");
        }
    }

    #[test]
    fn array_contains_versus_exact() {
        let document = doc! { "foo": [1, 2, 3] };

        assert!(check(document.clone(), doc! { "foo": 2 }));
        assert!(check(document.clone(), doc! { "foo": [1, 2, 3] }));
        assert!(!check(document.clone(), doc! { "foo": [1, 2] }));
        assert!(!check(document.clone(), doc! { "foo": [3, 2, 1] }));
        assert!(check(document, doc! { "foo": 2.0 }));
    }

    #[test]
    fn null_matches_absent_and_null() {
        assert!(check(doc! { "foo": null }, doc! { "foo": null }));
        assert!(check(doc! { "bar": 1 }, doc! { "foo": null }));
        assert!(!check(doc! { "foo": 0 }, doc! { "foo": null }));
        assert!(check(doc! { "foo": [1, null] }, doc! { "foo": null }));
    }

    #[test]
    fn array_paths_index_and_traverse() {
        let document = doc! {
            "items": [
                { "name": "pen", "qty": 3 },
                { "name": "ink", "qty": 0 },
            ],
            "grid": [[1, 2], [3, 4]],
        };

        assert!(check(document.clone(), doc! { "items.name": "ink" }));
        assert!(check(document.clone(), doc! { "items.0.name": "pen" }));
        assert!(!check(document.clone(), doc! { "items.1.name": "pen" }));
        assert!(check(document.clone(), doc! { "items.qty": { "$gt": 2 } }));
        assert!(check(document.clone(), doc! { "items": { "name": "ink" } }));
        assert!(check(document.clone(), doc! { "grid.1.0": 3 }));
        assert!(check(document.clone(), doc! { "grid": [3, 4] }));
        assert!(!check(document, doc! { "items.missing.deeper": { "$exists": true } }));
    }

    #[test]
    fn scalars_along_a_path_resolve_to_absent() {
        let document = doc! { "foo": 5 };

        assert!(!check(document.clone(), doc! { "foo.bar": 5 }));
        assert!(check(document.clone(), doc! { "foo.bar": { "$exists": false } }));
        assert!(check(document, doc! { "foo.bar": null }));
    }

    #[test]
    fn paths_below_empty_arrays_resolve_to_absent() {
        for document in [doc! { "foo": [] }, doc! { "foo": 5 }] {
            assert!(check(document.clone(), doc! { "foo.bar": { "$exists": false } }), "{document}");
            assert!(check(document.clone(), doc! { "foo.bar": null }), "{document}");
            assert!(!check(document.clone(), doc! { "foo.bar": { "$exists": true } }), "{document}");
        }

        assert!(check(doc! { "foo": [] }, doc! { "foo": { "$size": 0 } }));
    }

    #[test]
    fn all_requires_an_array() {
        assert!(!check(doc! { "foo": "x" }, doc! { "foo": { "$all": ["x"] } }));
        assert!(!check(doc! { "foo": { "x": 1 } }, doc! { "foo": { "$all": [{ "x": 1 }] } }));
        assert!(check(doc! { "foo": ["x", "y"] }, doc! { "foo": { "$all": ["y"] } }));
        assert!(check(doc! { "foo": [["x", "y"]] }, doc! { "foo": { "$all": [["x", "y"]] } }));
    }

    #[test]
    fn empty_all_matches_only_arrays() {
        assert!(check(doc! { "foo": [] }, doc! { "foo": { "$all": [] } }));
        assert!(check(doc! { "foo": [1] }, doc! { "foo": { "$all": [] } }));
        assert!(!check(doc! { "foo": 1 }, doc! { "foo": { "$all": [] } }));
        assert!(!check(doc! { "bar": 1 }, doc! { "foo": { "$all": [] } }));
    }

    #[test]
    fn context_operators_on_stored_documents() {
        let document = doc! { "a": 1, "tags": ["x"] };
        let evaluate = |filter: Document| {
            let expr = Expr::parse(&filter).unwrap();
            DocumentEvaluator::new(&document).evaluate(&expr).unwrap()
        };

        assert!(evaluate(doc! { "$type": "object" }));
        assert!(evaluate(doc! { "$exists": true }));
        assert!(evaluate(doc! { "$eq": { "a": 1 } }));
        assert!(evaluate(doc! { "$in": [5, { "tags": "x" }] }));
        assert!(evaluate(doc! { "$ne": null }));
        assert!(!evaluate(doc! { "$gt": 0 }));
        assert!(!evaluate(doc! { "$size": 2 }));
        assert!(!evaluate(doc! { "$all": [1] }));
        assert!(!evaluate(doc! { "$bitsAllSet": 1 }));
    }

    #[test]
    fn nested_filters_require_documents() {
        assert!(!check(doc! { "foo": "bar" }, doc! { "foo": { "bar": "baz" } }));
        assert!(check(doc! { "foo": { "a": 1 } }, doc! { "foo": {} }));
        assert!(!check(doc! { "foo": 1 }, doc! { "foo": {} }));
    }

    #[test]
    fn type_names_and_codes_on_integers() {
        for value in [Value::Int64(-2), Value::UInt64(9)] {
            let document = doc! { "foo": (value.clone()) };
            assert!(check(document.clone(), doc! { "foo": { "$type": "int" } }));
            assert!(check(document.clone(), doc! { "foo": { "$type": 16 } }));
            assert!(check(document.clone(), doc! { "foo": { "$type": "number" } }));
            assert!(!check(document, doc! { "foo": { "$type": "double" } }));
        }

        assert!(check(doc! { "foo": 1.5 }, doc! { "foo": { "$type": 1 } }));
        assert!(check(doc! { "foo": [1] }, doc! { "foo": { "$type": "array" } }));
        assert!(check(doc! { "foo": {} }, doc! { "foo": { "$type": 3 } }));
        assert!(check(doc! { "foo": null }, doc! { "foo": { "$type": 10 } }));
        assert!(check(doc! { "foo": true }, doc! { "foo": { "$type": ["string", "bool"] } }));
        assert!(!check(doc! { "bar": 1 }, doc! { "foo": { "$type": "null" } }));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let document = doc! { "created": at };

        assert!(check(document.clone(), doc! { "created": { "$gt": before } }));
        assert!(!check(document.clone(), doc! { "created": { "$lt": before } }));
        assert!(check(document, doc! { "created": at }));
    }

    #[test]
    fn context_operators_apply_to_the_whole_value() {
        assert!(matches(&Value::Int64(5), &doc! { "$gt": 3 }).unwrap());
        assert!(!matches(&Value::Int64(5), &doc! { "$in": [1, 2] }).unwrap());
        assert!(check(doc! { "a": 1 }, doc! { "$type": "object" }));
    }

    #[test]
    fn malformed_and_unsupported_filters_are_errors() {
        let document = Value::Document(doc! { "foo": [1] });

        assert!(matches!(
            matches(&document, &doc! { "$and": { "foo": 1 } }),
            Err(DocumentStoreError::MalformedQuery(_))
        ));
        assert!(matches!(
            matches(&document, &doc! { "foo": { "$elemMatch": { "$gt": 0 } } }),
            Err(DocumentStoreError::UnsupportedOperator(_))
        ));
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int64),
            any::<u64>().prop_map(Value::UInt64),
            any::<f64>().prop_map(Value::Float64),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4)
                    .prop_map(|entries| Value::Document(entries.into_iter().collect())),
            ]
        })
    }

    fn document() -> impl Strategy<Value = Document> {
        prop::collection::vec(("[a-z]{1,4}", value()), 0..6)
            .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        #[test]
        fn empty_filter_matches_every_document(document in document()) {
            prop_assert!(check(document, Document::new()));
        }

        #[test]
        fn type_name_and_code_agree_for_integers(n in any::<i64>(), unsigned in any::<bool>()) {
            let value = if unsigned { Value::UInt64(n as u64) } else { Value::Int64(n) };
            let document = doc! { "foo": (value) };

            prop_assert_eq!(
                check(document.clone(), doc! { "foo": { "$type": "int" } }),
                check(document, doc! { "foo": { "$type": 16 } })
            );
        }

        #[test]
        fn type_name_and_code_agree_for_any_value(value in value()) {
            let document = doc! { "foo": (value) };

            for (name, code) in [("double", 1), ("string", 2), ("object", 3), ("array", 4), ("bool", 8), ("null", 10), ("int", 16), ("decimal", 19)] {
                prop_assert_eq!(
                    check(document.clone(), doc! { "foo": { "$type": name } }),
                    check(document.clone(), doc! { "foo": { "$type": code } })
                );
            }
        }

        #[test]
        fn ne_is_the_negation_of_eq(value in value(), probe in scalar()) {
            let document = doc! { "foo": (value) };

            prop_assert_ne!(
                check(document.clone(), doc! { "foo": { "$eq": (probe.clone()) } }),
                check(document, doc! { "foo": { "$ne": (probe) } })
            );
        }
    }
}
