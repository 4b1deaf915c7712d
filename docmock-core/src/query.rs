//! Query construction and the parsed filter language.
//!
//! A filter is a [`Document`] interpreted as a predicate. Keys beginning with `$` are
//! logical operators (`$and`, `$or`, `$nor`) or comparison operators applied to the whole
//! context; every other key is a dotted field path whose operand is a literal, a nested
//! filter, or a document of comparison operators.
//!
//! Filters are parsed into an [`Expr`] tree before any document is inspected, so a
//! malformed filter or an unsupported operator is reported even when the collection is
//! empty. Backends evaluate the tree through a [`QueryVisitor`].
//!
//! # Query Building
//!
//! ```ignore
//! use docmock::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::and([
//!         Filter::eq("status", "active"),
//!         Filter::gte("age", 18),
//!     ]))
//!     .limit(10)
//!     .offset(20)
//!     .build();
//! ```
//!
//! Literal filters written with [`doc!`](crate::doc) work the same way:
//!
//! ```ignore
//! let query = Query::from(doc! { "tags": "admin", "age": { "$lt": 65 } });
//! ```

use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};
use crate::value::{Document, Value, ValueKind};

/// Operators that belong to the query language but are not evaluated by this engine.
pub const UNSUPPORTED_OPERATORS: &[&str] = &[
    "$elemMatch",
    "$bitsAllClear",
    "$bitsAnySet",
    "$bitsAnyClear",
    "$regex",
    "$options",
    "$mod",
    "$where",
    "$expr",
    "$text",
    "$jsonSchema",
    "$geoWithin",
    "$geoIntersects",
    "$near",
    "$nearSphere",
    "$comment",
];

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Every clause must hold. A filter document parses to this; an empty one matches anything.
    And(Vec<Expr>),
    /// At least one clause must hold.
    Or(Vec<Expr>),
    /// No clause may hold.
    Nor(Vec<Expr>),
    /// A dotted field path compared against an operand.
    Field {
        path: String,
        operand: Operand,
    },
    /// A comparison operator written at filter level, applied to the whole context value.
    Context(Operator),
}

impl Expr {
    /// An expression that matches every document.
    pub fn match_all() -> Self {
        Expr::And(Vec::new())
    }

    /// Parses a filter document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MalformedQuery`] when an operator has an operand of the
    /// wrong shape or is unknown, and [`DocumentStoreError::UnsupportedOperator`] for
    /// operators listed in [`UNSUPPORTED_OPERATORS`].
    pub fn parse(filter: &Document) -> DocumentStoreResult<Self> {
        let mut clauses = Vec::with_capacity(filter.len());

        for (key, operand) in filter {
            let clause = match key.as_str() {
                "$and" => Expr::And(parse_clauses(key, operand)?),
                "$or" => Expr::Or(parse_clauses(key, operand)?),
                "$nor" => Expr::Nor(parse_clauses(key, operand)?),
                op if op.starts_with('$') => Expr::Context(Operator::parse(op, operand)?),
                path => Expr::Field {
                    path: path.to_string(),
                    operand: Operand::parse(operand)?,
                },
            };
            clauses.push(clause);
        }

        Ok(Expr::And(clauses))
    }
}

fn parse_clauses(op: &str, operand: &Value) -> DocumentStoreResult<Vec<Expr>> {
    let Value::Array(items) = operand else {
        return Err(malformed(op, "expected an array of filters", operand));
    };

    // Elements that are not documents are skipped.
    items
        .iter()
        .filter_map(Value::as_document)
        .map(Expr::parse)
        .collect()
}

/// The right-hand side of a field clause or of `$eq`, `$ne`, `$in`, `$nin` and `$all`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A document whose keys all begin with `$`.
    Operators(Vec<Operator>),
    /// A document with ordinary keys, matched as a filter against the value. The empty
    /// document also lands here and matches any document.
    Filter(Box<Expr>),
    /// Matches an absent or null value.
    Null,
    /// Matched element-wise by the array comparison rules.
    Array(Vec<Operand>),
    /// A scalar compared by value.
    Literal(Value),
}

impl Operand {
    pub fn parse(value: &Value) -> DocumentStoreResult<Self> {
        match value {
            Value::Document(doc) if !doc.is_empty() && doc.keys().all(|key| key.starts_with('$')) => {
                Ok(Operand::Operators(
                    doc.iter()
                        .map(|(op, operand)| Operator::parse(op, operand))
                        .collect::<DocumentStoreResult<_>>()?,
                ))
            }
            Value::Document(doc) => Ok(Operand::Filter(Box::new(Expr::parse(doc)?))),
            Value::Array(items) => Ok(Operand::Array(
                items
                    .iter()
                    .map(Operand::parse)
                    .collect::<DocumentStoreResult<_>>()?,
            )),
            Value::Null => Ok(Operand::Null),
            scalar => Ok(Operand::Literal(scalar.clone())),
        }
    }
}

/// A single comparison operator with its parsed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Operand),
    /// `$ne` and `$not`.
    Ne(Operand),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Operand>),
    Nin(Vec<Operand>),
    Exists(bool),
    Type(Vec<TypeName>),
    All(Vec<Operand>),
    Size(usize),
    /// Mask of the bits that must all be set, as a two's-complement bit pattern.
    BitsAllSet(u64),
}

impl Operator {
    pub fn parse(op: &str, operand: &Value) -> DocumentStoreResult<Self> {
        Ok(match op {
            "$eq" => Operator::Eq(Operand::parse(operand)?),
            "$ne" | "$not" => Operator::Ne(Operand::parse(operand)?),
            "$gt" => Operator::Gt(operand.clone()),
            "$gte" => Operator::Gte(operand.clone()),
            "$lt" => Operator::Lt(operand.clone()),
            "$lte" => Operator::Lte(operand.clone()),
            "$in" => Operator::In(parse_operand_list(op, operand)?),
            "$nin" => Operator::Nin(parse_operand_list(op, operand)?),
            "$all" => Operator::All(parse_operand_list(op, operand)?),
            "$exists" => Operator::Exists(parse_flag(op, operand)?),
            "$type" => Operator::Type(TypeName::parse_set(operand)?),
            "$size" => Operator::Size(
                operand
                    .as_i64_exact()
                    .and_then(|size| usize::try_from(size).ok())
                    .ok_or_else(|| malformed(op, "expected a non-negative integer", operand))?,
            ),
            "$bitsAllSet" => Operator::BitsAllSet(parse_bitmask(op, operand)?),
            "$and" | "$or" | "$nor" => {
                return Err(DocumentStoreError::MalformedQuery(format!(
                    "{op} is only valid at filter level"
                )));
            }
            op if UNSUPPORTED_OPERATORS.contains(&op) => {
                return Err(DocumentStoreError::UnsupportedOperator(op.to_string()));
            }
            op => {
                return Err(DocumentStoreError::MalformedQuery(format!("unknown operator {op}")));
            }
        })
    }
}

fn parse_operand_list(op: &str, operand: &Value) -> DocumentStoreResult<Vec<Operand>> {
    match operand {
        Value::Array(items) => items.iter().map(Operand::parse).collect(),
        other => Err(malformed(op, "expected an array", other)),
    }
}

fn parse_flag(op: &str, operand: &Value) -> DocumentStoreResult<bool> {
    match operand {
        Value::Bool(flag) => Ok(*flag),
        Value::Int64(n) => Ok(*n != 0),
        Value::UInt64(n) => Ok(*n != 0),
        Value::Float64(n) => Ok(*n != 0.0),
        other => Err(malformed(op, "expected a boolean", other)),
    }
}

fn parse_bitmask(op: &str, operand: &Value) -> DocumentStoreResult<u64> {
    match operand {
        Value::UInt64(mask) => Ok(*mask),
        Value::Array(positions) => positions.iter().try_fold(0u64, |mask, position| {
            match position.as_i64_exact() {
                Some(bit @ 0..=63) => Ok(mask | (1u64 << bit)),
                _ => Err(malformed(op, "expected bit positions between 0 and 63", position)),
            }
        }),
        other => other
            .as_i64_exact()
            .map(|mask| mask as u64)
            .ok_or_else(|| malformed(op, "expected an integer bitmask", other)),
    }
}

fn malformed(op: &str, expected: &str, got: &Value) -> DocumentStoreError {
    DocumentStoreError::MalformedQuery(format!("{op}: {expected}, got {} {got}", got.kind()))
}

/// A type accepted by `$type`, by name or numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Double,
    String,
    Object,
    Array,
    BinData,
    Undefined,
    ObjectId,
    Bool,
    Date,
    Null,
    Regex,
    DbPointer,
    JavaScript,
    Symbol,
    JavaScriptWithScope,
    Int,
    Timestamp,
    Long,
    Decimal,
    MinKey,
    MaxKey,
    /// Alias matching every numeric kind. Has no code.
    Number,
}

const TYPE_TABLE: &[(TypeName, &str, Option<i64>)] = &[
    (TypeName::Double, "double", Some(1)),
    (TypeName::String, "string", Some(2)),
    (TypeName::Object, "object", Some(3)),
    (TypeName::Array, "array", Some(4)),
    (TypeName::BinData, "binData", Some(5)),
    (TypeName::Undefined, "undefined", Some(6)),
    (TypeName::ObjectId, "objectId", Some(7)),
    (TypeName::Bool, "bool", Some(8)),
    (TypeName::Date, "date", Some(9)),
    (TypeName::Null, "null", Some(10)),
    (TypeName::Regex, "regex", Some(11)),
    (TypeName::DbPointer, "dbPointer", Some(12)),
    (TypeName::JavaScript, "javascript", Some(13)),
    (TypeName::Symbol, "symbol", Some(14)),
    (TypeName::JavaScriptWithScope, "javascriptWithScope", Some(15)),
    (TypeName::Int, "int", Some(16)),
    (TypeName::Timestamp, "timestamp", Some(17)),
    (TypeName::Long, "long", Some(18)),
    (TypeName::Decimal, "decimal", Some(19)),
    (TypeName::MinKey, "minKey", Some(-1)),
    (TypeName::MaxKey, "maxKey", Some(127)),
    (TypeName::Number, "number", None),
];

impl TypeName {
    pub fn from_name(name: &str) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(_, candidate, _)| *candidate == name)
            .map(|(type_name, _, _)| *type_name)
    }

    pub fn from_code(code: i64) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(_, _, candidate)| *candidate == Some(code))
            .map(|(type_name, _, _)| *type_name)
    }

    pub fn name(self) -> &'static str {
        TYPE_TABLE
            .iter()
            .find(|(type_name, _, _)| *type_name == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Returns `true` if a value of the given kind has this type.
    ///
    /// Types with no counterpart in the value model never match.
    pub fn matches(self, kind: ValueKind) -> bool {
        match self {
            TypeName::Double | TypeName::Decimal => kind == ValueKind::Float64,
            TypeName::Int | TypeName::Long => {
                matches!(kind, ValueKind::Int64 | ValueKind::UInt64)
            }
            TypeName::Number => matches!(
                kind,
                ValueKind::Int64 | ValueKind::UInt64 | ValueKind::Float64
            ),
            TypeName::String => kind == ValueKind::String,
            TypeName::Object => kind == ValueKind::Document,
            TypeName::Array => kind == ValueKind::Array,
            TypeName::Bool => kind == ValueKind::Bool,
            TypeName::Null => kind == ValueKind::Null,
            TypeName::ObjectId => kind == ValueKind::ObjectId,
            TypeName::Date | TypeName::Timestamp => kind == ValueKind::Timestamp,
            TypeName::BinData
            | TypeName::Undefined
            | TypeName::Regex
            | TypeName::DbPointer
            | TypeName::JavaScript
            | TypeName::Symbol
            | TypeName::JavaScriptWithScope
            | TypeName::MinKey
            | TypeName::MaxKey => false,
        }
    }

    /// Parses a `$type` operand: a name, a code, or an array of them.
    pub fn parse_set(operand: &Value) -> DocumentStoreResult<Vec<Self>> {
        match operand {
            Value::Array(items) if !items.is_empty() => items.iter().map(Self::parse_one).collect(),
            Value::Array(_) => Err(malformed("$type", "expected at least one type", operand)),
            single => Ok(vec![Self::parse_one(single)?]),
        }
    }

    fn parse_one(operand: &Value) -> DocumentStoreResult<Self> {
        let parsed = match operand {
            Value::String(name) => Self::from_name(name),
            number if number.is_number() => number.as_i64_exact().and_then(Self::from_code),
            _ => None,
        };

        parsed.ok_or_else(|| malformed("$type", "expected a known type name or code", operand))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured query: a filter document plus pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// The filter document; an empty document matches everything.
    pub filter: Document,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of matching documents to skip.
    pub offset: Option<usize>,
}

impl Query {
    /// Creates a query that matches every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

impl From<Document> for Query {
    fn from(filter: Document) -> Self {
        Query { filter, ..Query::default() }
    }
}

/// Helper for constructing filter documents.
///
/// Each method returns a plain [`Document`], so the results can be combined with
/// [`Filter::and`], [`Filter::or`] and [`Filter::nor`] or passed anywhere a filter is accepted.
///
/// # Example
///
/// ```ignore
/// use docmock::query::Filter;
///
/// let filter = Filter::or([
///     Filter::eq("role", "admin"),
///     Filter::all("groups", ["ops", "oncall"]),
/// ]);
/// ```
pub struct Filter;

impl Filter {
    fn op(field: impl Into<String>, op: &str, value: impl Into<Value>) -> Document {
        let mut operators = Document::new();
        operators.insert(op, value);

        let mut filter = Document::new();
        filter.insert(field, operators);
        filter
    }

    fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Value {
        Value::Array(values.into_iter().map(Into::into).collect())
    }

    /// Matches documents whose `_id` equals `id`.
    pub fn id(id: impl Into<Value>) -> Document {
        Filter::eq("_id", id)
    }

    /// Matches documents where the field equals the value, or, for an array field, contains it.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$eq", value)
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$ne", value)
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$gt", value)
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$gte", value)
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$lt", value)
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Document {
        Filter::op(field, "$lte", value)
    }

    /// Matches documents where the field equals at least one of the values.
    pub fn in_<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Filter::op(field, "$in", Filter::list(values))
    }

    /// Matches documents where the field equals none of the values.
    pub fn nin<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Filter::op(field, "$nin", Filter::list(values))
    }

    /// Matches documents where the field is present (`true`) or absent (`false`).
    pub fn exists(field: impl Into<String>, exists: bool) -> Document {
        Filter::op(field, "$exists", exists)
    }

    /// Matches documents where the field has the given type, by name (`"int"`) or code (`16`).
    pub fn type_of(field: impl Into<String>, type_name: impl Into<Value>) -> Document {
        Filter::op(field, "$type", type_name)
    }

    /// Matches documents where the array field contains every one of the values.
    pub fn all<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Filter::op(field, "$all", Filter::list(values))
    }

    /// Matches documents where the array field has exactly `size` elements.
    pub fn size(field: impl Into<String>, size: usize) -> Document {
        Filter::op(field, "$size", size)
    }

    /// Matches documents where every bit set in `mask` is set in the integer field.
    pub fn bits_all_set(field: impl Into<String>, mask: impl Into<Value>) -> Document {
        Filter::op(field, "$bitsAllSet", mask)
    }

    /// Matches documents that satisfy every filter.
    pub fn and(filters: impl IntoIterator<Item = Document>) -> Document {
        Filter::logical("$and", filters)
    }

    /// Matches documents that satisfy at least one filter.
    pub fn or(filters: impl IntoIterator<Item = Document>) -> Document {
        Filter::logical("$or", filters)
    }

    /// Matches documents that satisfy none of the filters.
    pub fn nor(filters: impl IntoIterator<Item = Document>) -> Document {
        Filter::logical("$nor", filters)
    }

    fn logical(op: &str, filters: impl IntoIterator<Item = Document>) -> Document {
        let mut filter = Document::new();
        filter.insert(op, Filter::list(filters));
        filter
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter document for this query.
    pub fn filter(mut self, filter: Document) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of matching documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a parsed filter.
///
/// `visit_expr` dispatches on the expression kind; implementors provide the per-kind
/// behaviour.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_nor(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, path: &str, operand: &Operand) -> Result<Self::Output, Self::Error>;
    fn visit_context(&mut self, op: &Operator) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Nor(exprs) => self.visit_nor(exprs),
            Expr::Field { path, operand } => self.visit_field(path, operand),
            Expr::Context(op) => self.visit_context(op),
        }
    }
}
