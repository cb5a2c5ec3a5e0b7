//! Document, query and write primitives shared by every backend.

use std::cmp::Ordering;

use barbcut_core::types::DocId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DbError;

/// A stored document: a JSON object keyed by top-level field name.
pub type Document = serde_json::Map<String, Value>;

/// A document read from the store together with its optimistic version.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub id: DocId,
    pub data: Document,
    /// Changes on every write; used as the transaction precondition.
    pub version: u64,
}

impl Snapshot {
    /// Deserialize the document body into a model type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| DbError::Decode {
            collection: self.collection.clone(),
            id: self.id.clone(),
            message: e.to_string(),
        })
    }

    /// Top-level field value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Serialize a model into a document. The value must serialize to an object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DbError> {
    match serde_json::to_value(value).map_err(|e| DbError::Encode(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(DbError::Encode(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

/// Build a document from a `json!` object literal.
///
/// Anything other than an object yields an empty document.
pub fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Comparison operator of a `where` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    /// SQL operator used by the PostgreSQL backend on `jsonb` operands.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// One `field <op> value` clause on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Documents missing the field never match.
    pub fn matches(&self, doc: &Document) -> bool {
        match doc.get(&self.field) {
            Some(actual) => {
                same_kind(actual, &self.value) && self.op.accepts(compare_values(actual, &self.value))
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordered range query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every document of `collection`, in id order.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Order by a top-level field. Documents without the field are excluded.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply filters, ordering and limit to an id-ordered list of snapshots.
    ///
    /// Shared by in-process backends so their semantics cannot drift.
    pub fn apply(&self, snapshots: impl IntoIterator<Item = Snapshot>) -> Vec<Snapshot> {
        let mut matched: Vec<Snapshot> = snapshots
            .into_iter()
            .filter(|s| self.filters.iter().all(|f| f.matches(&s.data)))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            matched.retain(|s| s.data.contains_key(field));
            // Stable sort keeps id order for ties.
            matched.sort_by(|a, b| {
                let ordering = compare_values(&a.data[field], &b.data[field]);
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    kind_rank(a) == kind_rank(b)
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ordering = compare_values(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// A buffered write, applied atomically with the rest of its commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace. With `merge`, top-level fields are merged into the
    /// existing document instead.
    Set {
        collection: String,
        id: DocId,
        data: Document,
        merge: bool,
    },
    /// Merge top-level fields into an existing document; fails if missing.
    Update {
        collection: String,
        id: DocId,
        fields: Document,
    },
    Delete { collection: String, id: DocId },
}

impl Write {
    pub fn target(&self) -> (&str, &str) {
        match self {
            Self::Set { collection, id, .. }
            | Self::Update { collection, id, .. }
            | Self::Delete { collection, id } => (collection.as_str(), id.as_str()),
        }
    }
}

/// Version a document must still have at commit time (`None` = absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub collection: String,
    pub id: DocId,
    pub expected_version: Option<u64>,
}
